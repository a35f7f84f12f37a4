//! Frog-jump telemetry library - session, match and move recording
//!
//! Records what happens while a participant plays the frog-jump VR puzzle:
//! the play session, each match at a difficulty and level, and every board
//! move with its derived metrics.
//!
//! # Architecture
//!
//! - **Domain**: sessions, matches, moves, difficulties
//! - **Ports**: async store traits the lifecycle services depend on
//! - **Lifecycles**: session and match state transitions, move sequencing
//! - **Storage**: diesel over pooled SQLite, enforcing one active match per
//!   session and gapless move numbers per match
//! - **API**: axum routes over the lifecycle services
//!
//! # Example
//!
//! ```no_run
//! use frogjump_telemetry::{AppState, DatabasePool, StoreConfig, SequencerConfig, TelemetryRepository};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), frogjump_telemetry::TelemetryError> {
//! let pool = DatabasePool::open(&StoreConfig::for_path("telemetry.db"))?;
//! let state = AppState::from_repository(
//!     TelemetryRepository::new(pool),
//!     SequencerConfig::default(),
//!     Duration::from_secs(5),
//! );
//! let router = frogjump_telemetry::create_router(state);
//! # let _ = router;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod api;
mod config;
mod db;
mod difficulty_catalog;
mod domain;
mod error;
mod match_lifecycle;
mod move_sequencer;
mod ports;
mod session_lifecycle;

// Crate-level exports - Errors
pub use error::{ErrorKind, TelemetryError};

// Crate-level exports - Configuration
pub use config::{ConfigError, SequencerConfig, ServerConfig, StoreConfig, TelemetryConfig};

// Crate-level exports - Domain types
pub use domain::{
    Difficulty, DifficultyId, FrogSide, Match, MatchId, MatchStatus, Move, MoveDraft, MoveId,
    MoveKind, NewMatch, NewMove, NewSession, Session, SessionId,
};

// Crate-level exports - Persistence ports
pub use ports::{DifficultyStore, MatchStore, MoveStore, SessionStore};

// Crate-level exports - Lifecycle services
pub use difficulty_catalog::DifficultyCatalog;
pub use match_lifecycle::MatchLifecycle;
pub use move_sequencer::MoveSequencer;
pub use session_lifecycle::SessionLifecycle;

// Crate-level exports - Storage
pub use db::{DatabasePool, MIGRATIONS, PoolState, TelemetryRepository};

// Crate-level exports - HTTP
pub use api::{ApiError, AppState, create_router};
