//! Shared handler state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use derive_getters::Getters;
use tracing::warn;

use crate::config::SequencerConfig;
use crate::{
    DifficultyCatalog, MatchLifecycle, MoveSequencer, SessionLifecycle, TelemetryError,
    TelemetryRepository,
};

/// Services shared by every request, plus the per-request deadline.
#[derive(Debug, Clone, Getters)]
pub struct AppState {
    sessions: SessionLifecycle,
    matches: MatchLifecycle,
    moves: MoveSequencer,
    difficulties: DifficultyCatalog,
    request_timeout: Duration,
}

impl AppState {
    /// Assembles state from already constructed services.
    pub fn new(
        sessions: SessionLifecycle,
        matches: MatchLifecycle,
        moves: MoveSequencer,
        difficulties: DifficultyCatalog,
        request_timeout: Duration,
    ) -> Self {
        Self {
            sessions,
            matches,
            moves,
            difficulties,
            request_timeout,
        }
    }

    /// Wires every service to one repository.
    pub fn from_repository(
        repository: TelemetryRepository,
        sequencer: SequencerConfig,
        request_timeout: Duration,
    ) -> Self {
        let repository = Arc::new(repository);
        Self::new(
            SessionLifecycle::new(repository.clone()),
            MatchLifecycle::new(repository.clone(), repository.clone(), repository.clone()),
            MoveSequencer::new(repository.clone(), repository.clone(), sequencer),
            DifficultyCatalog::new(repository),
            request_timeout,
        )
    }

    /// Runs `operation` under the request deadline.
    ///
    /// An expired deadline is a storage error. Storage work already handed
    /// to a blocking thread still commits or rolls back as a unit.
    pub async fn deadline<T, F>(&self, operation: F) -> Result<T, TelemetryError>
    where
        F: Future<Output = Result<T, TelemetryError>>,
    {
        match tokio::time::timeout(self.request_timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.request_timeout.as_millis() as u64, "Request deadline exceeded");
                Err(TelemetryError::storage("request deadline exceeded"))
            }
        }
    }
}
