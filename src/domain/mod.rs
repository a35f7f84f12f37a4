//! Entity model: sessions, matches, moves and difficulty reference data.

mod difficulty;
mod matches;
mod moves;
mod session;

pub use difficulty::{Difficulty, DifficultyId};
pub use matches::{Match, MatchId, MatchStatus, NewMatch};
pub use moves::{FrogSide, Move, MoveDraft, MoveId, MoveKind, NewMove};
pub use session::{NewSession, Session, SessionId};
