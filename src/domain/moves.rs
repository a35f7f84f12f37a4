//! Board moves and their per-match sequence.

use chrono::{DateTime, Utc};
use derive_getters::Getters;
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::TelemetryError;
use crate::domain::MatchId;

/// Opaque, server-assigned move identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoveId(String);

impl MoveId {
    /// Wraps an identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// How a frog travelled. Stored and serialized as a small integer code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(try_from = "i16", into = "i16")]
#[strum(serialize_all = "snake_case")]
pub enum MoveKind {
    /// Step into the adjacent empty cell.
    Slide,
    /// Hop over one frog into the empty cell behind it.
    Jump,
}

impl TryFrom<i16> for MoveKind {
    type Error = TelemetryError;

    #[track_caller]
    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Slide),
            1 => Ok(Self::Jump),
            other => Err(TelemetryError::validation(format!(
                "Unknown move_kind code: {}",
                other
            ))),
        }
    }
}

impl From<MoveKind> for i16 {
    fn from(kind: MoveKind) -> Self {
        match kind {
            MoveKind::Slide => 0,
            MoveKind::Jump => 1,
        }
    }
}

/// Which group of frogs the moved frog belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(try_from = "i16", into = "i16")]
#[strum(serialize_all = "snake_case")]
pub enum FrogSide {
    /// Frogs starting on the left, moving right.
    Left,
    /// Frogs starting on the right, moving left.
    Right,
}

impl TryFrom<i16> for FrogSide {
    type Error = TelemetryError;

    #[track_caller]
    fn try_from(code: i16) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Left),
            1 => Ok(Self::Right),
            other => Err(TelemetryError::validation(format!(
                "Unknown frog_side code: {}",
                other
            ))),
        }
    }
}

impl From<FrogSide> for i16 {
    fn from(side: FrogSide) -> Self {
        match side {
            FrogSide::Left => 0,
            FrogSide::Right => 1,
        }
    }
}

/// A persisted move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Getters)]
pub struct Move {
    pub(crate) id: MoveId,
    pub(crate) match_id: MatchId,
    pub(crate) seq: i32,
    pub(crate) occurred_at: DateTime<Utc>,
    pub(crate) elapsed_ms: i64,
    pub(crate) from_idx: i32,
    pub(crate) to_idx: i32,
    pub(crate) move_kind: MoveKind,
    pub(crate) frog_side: FrogSide,
    pub(crate) is_correct: bool,
    pub(crate) interruption: bool,
    pub(crate) board_before: Option<serde_json::Value>,
    pub(crate) board_after: Option<serde_json::Value>,
    pub(crate) branching_factor: Option<i32>,
    pub(crate) loopiness: Option<f64>,
}

/// Move fields as reported by the client, before a sequence number exists.
///
/// Kind and side arrive as raw codes so unknown values surface as
/// validation errors rather than decode failures. `occurred_at` defaults to
/// the time the server receives the move.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveDraft {
    /// When the move happened on the client.
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Milliseconds since the match started.
    pub elapsed_ms: i64,
    /// Board cell the frog left.
    pub from_idx: i32,
    /// Board cell the frog landed on.
    pub to_idx: i32,
    /// Raw [`MoveKind`] code.
    pub move_kind: i16,
    /// Raw [`FrogSide`] code.
    pub frog_side: i16,
    /// Whether the move was legal.
    pub is_correct: bool,
    /// Whether play was interrupted around this move.
    #[serde(default)]
    pub interruption: bool,
    /// Board snapshot before the move.
    #[serde(default)]
    pub board_before: Option<serde_json::Value>,
    /// Board snapshot after the move.
    #[serde(default)]
    pub board_after: Option<serde_json::Value>,
    /// Legal alternatives available at this point.
    #[serde(default)]
    pub branching_factor: Option<i32>,
    /// Path repetition score.
    #[serde(default)]
    pub loopiness: Option<f64>,
}

impl MoveDraft {
    /// Checks every field that can be judged without storage.
    ///
    /// # Errors
    ///
    /// Returns a validation [`TelemetryError`] naming the first bad field.
    #[instrument(skip(self))]
    pub fn validate(&self) -> Result<(), TelemetryError> {
        if self.elapsed_ms < 0 {
            return Err(TelemetryError::validation("elapsed_ms must not be negative"));
        }
        if self.from_idx < 0 {
            return Err(TelemetryError::validation("from_idx must not be negative"));
        }
        if self.to_idx < 0 {
            return Err(TelemetryError::validation("to_idx must not be negative"));
        }
        MoveKind::try_from(self.move_kind)?;
        FrogSide::try_from(self.frog_side)?;
        if matches!(self.branching_factor, Some(n) if n < 0) {
            return Err(TelemetryError::validation(
                "branching_factor must not be negative",
            ));
        }
        if matches!(self.loopiness, Some(score) if !score.is_finite()) {
            return Err(TelemetryError::validation("loopiness must be a finite number"));
        }
        Ok(())
    }
}

/// A validated move with its assigned sequence number, ready to insert.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct NewMove {
    match_id: MatchId,
    seq: i32,
    occurred_at: DateTime<Utc>,
    elapsed_ms: i64,
    from_idx: i32,
    to_idx: i32,
    move_kind: MoveKind,
    frog_side: FrogSide,
    is_correct: bool,
    interruption: bool,
    board_before: Option<serde_json::Value>,
    board_after: Option<serde_json::Value>,
    branching_factor: Option<i32>,
    loopiness: Option<f64>,
}

impl NewMove {
    /// Builds an insertable move from a draft and a sequence number.
    ///
    /// # Errors
    ///
    /// Returns a validation [`TelemetryError`] if the draft is invalid or
    /// `seq` is not positive.
    #[instrument(skip(match_id, draft), fields(match_id = %match_id))]
    pub fn from_draft(
        match_id: MatchId,
        seq: i32,
        draft: &MoveDraft,
        received_at: DateTime<Utc>,
    ) -> Result<Self, TelemetryError> {
        draft.validate()?;
        if seq < 1 {
            return Err(TelemetryError::validation("seq starts at 1"));
        }
        Ok(Self {
            match_id,
            seq,
            occurred_at: draft.occurred_at.unwrap_or(received_at),
            elapsed_ms: draft.elapsed_ms,
            from_idx: draft.from_idx,
            to_idx: draft.to_idx,
            move_kind: MoveKind::try_from(draft.move_kind)?,
            frog_side: FrogSide::try_from(draft.frog_side)?,
            is_correct: draft.is_correct,
            interruption: draft.interruption,
            board_before: draft.board_before.clone(),
            board_after: draft.board_after.clone(),
            branching_factor: draft.branching_factor,
            loopiness: draft.loopiness,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn draft() -> MoveDraft {
        MoveDraft {
            elapsed_ms: 1200,
            from_idx: 2,
            to_idx: 3,
            move_kind: 0,
            frog_side: 1,
            is_correct: true,
            ..MoveDraft::default()
        }
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn rejects_negative_fields_and_unknown_codes() {
        let cases = [
            MoveDraft { elapsed_ms: -1, ..draft() },
            MoveDraft { from_idx: -1, ..draft() },
            MoveDraft { to_idx: -4, ..draft() },
            MoveDraft { move_kind: 7, ..draft() },
            MoveDraft { frog_side: -1, ..draft() },
            MoveDraft { branching_factor: Some(-2), ..draft() },
            MoveDraft { loopiness: Some(f64::NAN), ..draft() },
        ];
        for case in cases {
            let err = case.validate().expect_err("draft should be rejected");
            assert_eq!(err.kind(), ErrorKind::Validation, "{:?}", case);
        }
    }

    #[test]
    fn codes_map_both_ways() {
        assert_eq!(MoveKind::try_from(1).expect("jump"), MoveKind::Jump);
        assert_eq!(i16::from(FrogSide::Right), 1);
        assert!(FrogSide::try_from(2).is_err());
    }

    #[test]
    fn from_draft_defaults_occurred_at_and_keeps_optionals_absent() {
        let received = Utc::now();
        let new_move =
            NewMove::from_draft(MatchId::new("m-1"), 1, &draft(), received).expect("valid");
        assert_eq!(*new_move.occurred_at(), received);
        assert_eq!(*new_move.move_kind(), MoveKind::Slide);
        assert_eq!(*new_move.frog_side(), FrogSide::Right);
        assert!(new_move.branching_factor().is_none());
        assert!(new_move.loopiness().is_none());
        assert!(new_move.board_before().is_none());
    }

    #[test]
    fn from_draft_rejects_zero_seq() {
        let err = NewMove::from_draft(MatchId::new("m-1"), 0, &draft(), Utc::now())
            .expect_err("seq 0");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn move_kind_serializes_as_code() {
        let json = serde_json::to_string(&MoveKind::Jump).expect("serialize");
        assert_eq!(json, "1");
        let side: FrogSide = serde_json::from_str("0").expect("deserialize");
        assert_eq!(side, FrogSide::Left);
    }
}
