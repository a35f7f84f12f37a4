//! Persistence port: the storage contracts the lifecycle engine depends on.
//!
//! Every operation returns the full post-operation record or a
//! [`TelemetryError`]. Implementations must enforce two invariants
//! transactionally, not by read-then-write in application code:
//!
//! - at most one active match per session ([`MatchStore::create`] and
//!   [`MatchStore::update`] fail with a conflict otherwise);
//! - move sequence numbers per match are unique and gapless
//!   ([`MoveStore::create`] fails with a conflict for any `seq` other than
//!   the current maximum plus one).

use async_trait::async_trait;

use crate::TelemetryError;
use crate::domain::{
    Difficulty, DifficultyId, Match, MatchId, Move, NewMatch, NewMove, NewSession, Session,
    SessionId,
};

/// Session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Inserts a session; the store assigns `id` and `started_at`.
    async fn create(&self, session: NewSession) -> Result<Session, TelemetryError>;

    /// Loads a session by id.
    async fn get(&self, id: &SessionId) -> Result<Session, TelemetryError>;

    /// Replaces every mutable field of an existing session.
    async fn update(&self, session: Session) -> Result<Session, TelemetryError>;
}

/// Match persistence.
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Inserts an active match; the store assigns `id` and `started_at`.
    async fn create(&self, game: NewMatch) -> Result<Match, TelemetryError>;

    /// Loads a match by id.
    async fn get(&self, id: &MatchId) -> Result<Match, TelemetryError>;

    /// Full-record update (last write wins on every field). Finished matches
    /// cannot be reactivated or finished a second time.
    async fn update(&self, game: Match) -> Result<Match, TelemetryError>;

    /// Loads the single active match of a session.
    async fn get_active_by_session(&self, session_id: &SessionId)
    -> Result<Match, TelemetryError>;
}

/// Move persistence.
#[async_trait]
pub trait MoveStore: Send + Sync {
    /// Inserts a move with a caller-assigned sequence number.
    async fn create(&self, new_move: NewMove) -> Result<Move, TelemetryError>;

    /// All moves of a match, ascending by `seq`.
    async fn get_by_match(&self, match_id: &MatchId) -> Result<Vec<Move>, TelemetryError>;

    /// Up to `limit` moves with `seq > after_seq`, ascending.
    async fn get_page_after(
        &self,
        match_id: &MatchId,
        after_seq: i32,
        limit: i64,
    ) -> Result<Vec<Move>, TelemetryError>;

    /// The move with the highest `seq`; not-found when the match has none.
    async fn get_last_by_match(&self, match_id: &MatchId) -> Result<Move, TelemetryError>;
}

/// Read-only difficulty reference data.
#[async_trait]
pub trait DifficultyStore: Send + Sync {
    /// Loads one difficulty.
    async fn get_by_id(&self, id: DifficultyId) -> Result<Difficulty, TelemetryError>;

    /// Every difficulty, ascending by id.
    async fn get_all(&self) -> Result<Vec<Difficulty>, TelemetryError>;
}
