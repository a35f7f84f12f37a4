//! Error taxonomy shared by the core, the storage adapter and the HTTP layer.

use derive_more::{Display, Error};
use tracing::instrument;

/// Classification of a [`TelemetryError`].
///
/// The kind decides how a caller reacts: validation and not-found errors are
/// reported immediately, conflicts may be retried against fresh state, and
/// storage errors may be retried with backoff when transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing required input.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// An invariant rejected the write (duplicate active match, duplicate seq).
    Conflict,
    /// Transport, pool or transaction failure.
    Storage,
}

/// Error with kind and caller location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} error: {} at {}:{}", kind, message, file, line)]
pub struct TelemetryError {
    /// What went wrong, coarsely.
    pub kind: ErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TelemetryError {
    /// Creates a new error of the given kind with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Malformed or missing input.
    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Referenced entity absent.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Invariant violation; state is unchanged.
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Storage or transport failure.
    #[track_caller]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true for [`ErrorKind::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns true for [`ErrorKind::Conflict`].
    pub fn is_conflict(&self) -> bool {
        self.kind == ErrorKind::Conflict
    }

    /// Whether retrying the same call against fresh state can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Conflict | ErrorKind::Storage)
    }
}

impl From<tokio::task::JoinError> for TelemetryError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        Self::storage(format!("Storage task failed: {}", err))
    }
}

impl From<serde_json::Error> for TelemetryError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("Stored JSON is unreadable: {}", err))
    }
}
