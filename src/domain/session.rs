//! Play sessions.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Opaque, server-assigned session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One continuous play connection by a participant.
///
/// `ended_at` is present exactly when `is_finished` is true.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Session {
    pub(crate) id: SessionId,
    pub(crate) player_id: Option<String>,
    pub(crate) device: Option<String>,
    pub(crate) is_finished: bool,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Marks the session finished at `at`. A finished session keeps its
    /// original end timestamp.
    #[instrument(skip(self), fields(session_id = %self.id))]
    pub(crate) fn finish(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_finished {
            return false;
        }
        self.is_finished = true;
        self.ended_at = Some(at);
        true
    }

    /// Checks the finished/ended_at pairing.
    pub fn is_consistent(&self) -> bool {
        self.is_finished == self.ended_at.is_some()
    }
}

/// Input for creating a session. Blank strings count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Getters)]
pub struct NewSession {
    player_id: Option<String>,
    device: Option<String>,
}

impl NewSession {
    /// Creates session input, dropping empty player ids and device labels.
    pub fn new(player_id: Option<String>, device: Option<String>) -> Self {
        Self {
            player_id: player_id.filter(|s| !s.trim().is_empty()),
            device: device.filter(|s| !s.trim().is_empty()),
        }
    }
}
