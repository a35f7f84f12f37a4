//! Matches: one round of play at a given difficulty and level.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::domain::{DifficultyId, SessionId};

/// Opaque, server-assigned match identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MatchId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lifecycle state of a match. `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    /// In progress; at most one per session.
    Active,
    /// Ended with `ended_at` set.
    Finished,
}

/// A match bound to one session and one difficulty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Match {
    pub(crate) id: MatchId,
    pub(crate) session_id: SessionId,
    pub(crate) difficulty_id: DifficultyId,
    pub(crate) level_n: i32,
    pub(crate) is_active: bool,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) ended_at: Option<DateTime<Utc>>,
    pub(crate) outcome: Option<String>,
    pub(crate) meta: Option<serde_json::Value>,
}

impl Match {
    /// Current lifecycle state.
    pub fn status(&self) -> MatchStatus {
        if self.is_active {
            MatchStatus::Active
        } else {
            MatchStatus::Finished
        }
    }

    /// Moves the match to `Finished`. The outcome is only overwritten when
    /// one is given.
    #[instrument(skip(self), fields(match_id = %self.id))]
    pub(crate) fn finish(&mut self, at: DateTime<Utc>, outcome: Option<String>) {
        self.is_active = false;
        self.ended_at = Some(at);
        if outcome.is_some() {
            self.outcome = outcome;
        }
    }
}

/// Input for creating a match.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct NewMatch {
    session_id: SessionId,
    difficulty_id: DifficultyId,
    level_n: i32,
    meta: Option<serde_json::Value>,
}

impl NewMatch {
    /// Creates match input.
    pub fn new(
        session_id: SessionId,
        difficulty_id: DifficultyId,
        level_n: i32,
        meta: Option<serde_json::Value>,
    ) -> Self {
        Self {
            session_id,
            difficulty_id,
            level_n,
            meta,
        }
    }
}
