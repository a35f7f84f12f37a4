//! Shared setup for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use frogjump_telemetry::{
    AppState, DatabasePool, DifficultyCatalog, MatchLifecycle, MoveDraft, MoveSequencer,
    SequencerConfig, SessionLifecycle, StoreConfig, TelemetryRepository,
};
use tempfile::TempDir;

/// Services over a fresh, migrated database in a temporary directory.
///
/// The directory must stay in scope to keep the database alive.
pub struct TestContext {
    pub dir: TempDir,
    pub pool: DatabasePool,
    pub repository: Arc<TelemetryRepository>,
    pub sessions: SessionLifecycle,
    pub matches: MatchLifecycle,
    pub moves: MoveSequencer,
    pub difficulties: DifficultyCatalog,
}

/// Generous retry budget so heavily contended tests never run out.
pub fn test_sequencer_config() -> SequencerConfig {
    SequencerConfig::default()
        .with_max_attempts(64)
        .with_backoff_ms(1)
}

pub fn setup() -> TestContext {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir
        .path()
        .join("telemetry.db")
        .to_str()
        .expect("Invalid path")
        .to_string();

    let pool = DatabasePool::open(&StoreConfig::for_path(db_path).with_max_connections(8))
        .expect("Failed to open pool");
    let repository = Arc::new(TelemetryRepository::new(pool.clone()));

    TestContext {
        sessions: SessionLifecycle::new(repository.clone()),
        matches: MatchLifecycle::new(repository.clone(), repository.clone(), repository.clone()),
        moves: MoveSequencer::new(repository.clone(), repository.clone(), test_sequencer_config()),
        difficulties: DifficultyCatalog::new(repository.clone()),
        repository,
        pool,
        dir,
    }
}

impl TestContext {
    /// Router state over the same database.
    pub fn app_state(&self) -> AppState {
        AppState::from_repository(
            (*self.repository).clone(),
            test_sequencer_config(),
            Duration::from_secs(10),
        )
    }
}

/// A legal slide by a left frog.
pub fn slide(elapsed_ms: i64, from_idx: i32) -> MoveDraft {
    MoveDraft {
        elapsed_ms,
        from_idx,
        to_idx: from_idx + 1,
        move_kind: 0,
        frog_side: 0,
        is_correct: true,
        ..MoveDraft::default()
    }
}
