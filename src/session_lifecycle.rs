//! Session lifecycle: open, look up and close play sessions.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::TelemetryError;
use crate::domain::{NewSession, Session, SessionId};
use crate::ports::SessionStore;

/// Creates, reads and finishes sessions.
#[derive(Clone)]
pub struct SessionLifecycle {
    sessions: Arc<dyn SessionStore>,
}

impl SessionLifecycle {
    /// Creates the lifecycle over a session store.
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }

    /// Opens a new, unfinished session.
    ///
    /// # Errors
    ///
    /// Returns a storage [`TelemetryError`] if the session cannot be saved.
    #[instrument(skip(self))]
    pub async fn create_session(
        &self,
        player_id: Option<String>,
        device: Option<String>,
    ) -> Result<Session, TelemetryError> {
        let session = self
            .sessions
            .create(NewSession::new(player_id, device))
            .await?;
        info!(session_id = %session.id(), "Session opened");
        Ok(session)
    }

    /// Loads a session.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] for unknown ids.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn get_session(&self, id: &SessionId) -> Result<Session, TelemetryError> {
        self.sessions.get(id).await
    }

    /// Marks a session finished. Finishing an already finished session
    /// returns it unchanged.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] for unknown ids.
    #[instrument(skip(self), fields(session_id = %id))]
    pub async fn finish_session(&self, id: &SessionId) -> Result<Session, TelemetryError> {
        let mut session = self.sessions.get(id).await?;
        if !session.finish(Utc::now()) {
            debug!("Session already finished");
            return Ok(session);
        }

        let session = self.sessions.update(session).await?;
        info!(ended_at = ?session.ended_at(), "Session finished");
        Ok(session)
    }
}

impl std::fmt::Debug for SessionLifecycle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("SessionLifecycle").finish_non_exhaustive()
    }
}
