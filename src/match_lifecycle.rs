//! Match lifecycle: start, look up and finish matches while keeping at most
//! one active match per session.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::TelemetryError;
use crate::domain::{DifficultyId, Match, MatchId, NewMatch, SessionId};
use crate::ports::{DifficultyStore, MatchStore, SessionStore};

/// Starts and finishes matches.
///
/// The one-active-match rule lives in the store; this type only turns the
/// store's conflicts into the behavior callers expect.
#[derive(Clone)]
pub struct MatchLifecycle {
    sessions: Arc<dyn SessionStore>,
    matches: Arc<dyn MatchStore>,
    difficulties: Arc<dyn DifficultyStore>,
}

impl MatchLifecycle {
    /// Creates the lifecycle over its stores.
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        matches: Arc<dyn MatchStore>,
        difficulties: Arc<dyn DifficultyStore>,
    ) -> Self {
        Self {
            sessions,
            matches,
            difficulties,
        }
    }

    /// Starts a new active match.
    ///
    /// # Errors
    ///
    /// - validation when `level_n < 1`
    /// - not-found when the session or difficulty does not exist
    /// - conflict when the session is finished or already has an active match
    #[instrument(skip(self, meta), fields(session_id = %session_id))]
    pub async fn create_match(
        &self,
        session_id: &SessionId,
        difficulty_id: DifficultyId,
        level_n: i32,
        meta: Option<serde_json::Value>,
    ) -> Result<Match, TelemetryError> {
        if level_n < 1 {
            return Err(TelemetryError::validation(format!(
                "level_n must be at least 1, got {}",
                level_n
            )));
        }
        let session = self.sessions.get(session_id).await?;
        if *session.is_finished() {
            return Err(TelemetryError::conflict(format!(
                "session {} is already finished",
                session_id
            )));
        }
        self.difficulties.get_by_id(difficulty_id).await?;

        let game = self
            .matches
            .create(NewMatch::new(session_id.clone(), difficulty_id, level_n, meta))
            .await?;
        info!(match_id = %game.id(), "Match started");
        Ok(game)
    }

    /// Returns the session's active match, starting one if there is none.
    ///
    /// When another request starts a match first, that match is returned.
    ///
    /// # Errors
    ///
    /// Same as [`create_match`](Self::create_match), minus conflicts.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn ensure_active_match(
        &self,
        session_id: &SessionId,
        difficulty_id: DifficultyId,
        level_n: i32,
    ) -> Result<Match, TelemetryError> {
        match self.matches.get_active_by_session(session_id).await {
            Ok(game) => return Ok(game),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self
            .create_match(session_id, difficulty_id, level_n, None)
            .await
        {
            Err(e) if e.is_conflict() => {
                debug!("Lost the race to start a match; reading the winner");
                self.matches.get_active_by_session(session_id).await
            }
            other => other,
        }
    }

    /// Loads the session's active match.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] when no match is active.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn get_active_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Match, TelemetryError> {
        self.matches.get_active_by_session(session_id).await
    }

    /// Finishes the session's active match, recording `outcome` if given.
    ///
    /// # Errors
    ///
    /// - not-found when the session has no active match
    /// - conflict when a concurrent call finished it first
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn finish_active(
        &self,
        session_id: &SessionId,
        outcome: Option<String>,
    ) -> Result<Match, TelemetryError> {
        let mut game = self.matches.get_active_by_session(session_id).await?;
        game.finish(Utc::now(), outcome);

        let game = self.matches.update(game).await?;
        info!(match_id = %game.id(), outcome = ?game.outcome(), "Match finished");
        Ok(game)
    }

    /// Loads a match.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] for unknown ids.
    #[instrument(skip(self), fields(match_id = %id))]
    pub async fn get_match(&self, id: &MatchId) -> Result<Match, TelemetryError> {
        self.matches.get(id).await
    }
}

impl std::fmt::Debug for MatchLifecycle {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("MatchLifecycle").finish_non_exhaustive()
    }
}
