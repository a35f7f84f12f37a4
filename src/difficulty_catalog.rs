//! Read-only access to difficulty reference data.

use std::sync::Arc;

use tracing::instrument;

use crate::TelemetryError;
use crate::domain::{Difficulty, DifficultyId};
use crate::ports::DifficultyStore;

/// Difficulty lookups.
#[derive(Clone)]
pub struct DifficultyCatalog {
    difficulties: Arc<dyn DifficultyStore>,
}

impl DifficultyCatalog {
    /// Creates the catalog over a difficulty store.
    pub fn new(difficulties: Arc<dyn DifficultyStore>) -> Self {
        Self { difficulties }
    }

    /// Loads one difficulty.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] for unknown ids.
    #[instrument(skip(self))]
    pub async fn get_by_id(&self, id: DifficultyId) -> Result<Difficulty, TelemetryError> {
        self.difficulties.get_by_id(id).await
    }

    /// Every difficulty, ordered by id.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Difficulty>, TelemetryError> {
        self.difficulties.get_all().await
    }
}

impl std::fmt::Debug for DifficultyCatalog {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("DifficultyCatalog").finish_non_exhaustive()
    }
}
