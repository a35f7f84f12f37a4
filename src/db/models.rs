//! Database row models and their mapping to domain entities.
//!
//! Rows mirror the tables one-to-one. Timestamps are stored as UTC
//! `NaiveDateTime`; JSON blobs (`meta`, board snapshots) as text. `None`
//! always maps to SQL `NULL`, including on update.

use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;

use crate::TelemetryError;
use crate::db::schema;
use crate::domain::{
    Difficulty, FrogSide, Match, MatchId, Move, MoveId, MoveKind, NewMove, Session, SessionId,
};

/// Session table row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset, Identifiable)]
#[diesel(table_name = schema::sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct SessionRow {
    pub id: String,
    pub player_id: Option<String>,
    pub device: Option<String>,
    pub is_finished: bool,
    pub started_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: SessionId::new(row.id),
            player_id: row.player_id,
            device: row.device,
            is_finished: row.is_finished,
            started_at: row.started_at.and_utc(),
            ended_at: row.ended_at.map(|t| t.and_utc()),
        }
    }
}

impl From<&Session> for SessionRow {
    fn from(session: &Session) -> Self {
        SessionRow {
            id: session.id.as_str().to_string(),
            player_id: session.player_id.clone(),
            device: session.device.clone(),
            is_finished: session.is_finished,
            started_at: session.started_at.naive_utc(),
            ended_at: session.ended_at.map(|t| t.naive_utc()),
        }
    }
}

/// Difficulty table row.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = schema::difficulty)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct DifficultyRow {
    pub id: i32,
    pub name: String,
    pub number_of_blocks: i32,
}

impl From<DifficultyRow> for Difficulty {
    fn from(row: DifficultyRow) -> Self {
        Difficulty::new(row.id, row.name, row.number_of_blocks)
    }
}

/// Match table row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset, Identifiable)]
#[diesel(table_name = schema::matches)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[diesel(treat_none_as_null = true)]
pub(crate) struct MatchRow {
    pub id: String,
    pub session_id: String,
    pub difficulty_id: i32,
    pub level_n: i32,
    pub is_active: bool,
    pub started_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
    pub outcome: Option<String>,
    pub meta: Option<String>,
}

impl TryFrom<MatchRow> for Match {
    type Error = TelemetryError;

    fn try_from(row: MatchRow) -> Result<Self, Self::Error> {
        Ok(Match {
            id: MatchId::new(row.id),
            session_id: SessionId::new(row.session_id),
            difficulty_id: row.difficulty_id,
            level_n: row.level_n,
            is_active: row.is_active,
            started_at: row.started_at.and_utc(),
            ended_at: row.ended_at.map(|t| t.and_utc()),
            outcome: row.outcome,
            meta: decode_json(row.meta)?,
        })
    }
}

impl TryFrom<&Match> for MatchRow {
    type Error = TelemetryError;

    fn try_from(game: &Match) -> Result<Self, Self::Error> {
        Ok(MatchRow {
            id: game.id.as_str().to_string(),
            session_id: game.session_id.as_str().to_string(),
            difficulty_id: game.difficulty_id,
            level_n: game.level_n,
            is_active: game.is_active,
            started_at: game.started_at.naive_utc(),
            ended_at: game.ended_at.map(|t| t.naive_utc()),
            outcome: game.outcome.clone(),
            meta: encode_json(game.meta.as_ref())?,
        })
    }
}

/// Move table row.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable)]
#[diesel(table_name = schema::moves)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub(crate) struct MoveRow {
    pub id: String,
    pub match_id: String,
    pub seq: i32,
    pub occurred_at: NaiveDateTime,
    pub elapsed_ms: i64,
    pub from_idx: i32,
    pub to_idx: i32,
    pub move_kind: i16,
    pub frog_side: i16,
    pub is_correct: bool,
    pub interruption: bool,
    pub board_before: Option<String>,
    pub board_after: Option<String>,
    pub branching_factor: Option<i32>,
    pub loopiness: Option<f64>,
}

impl MoveRow {
    /// Builds the row to insert for a new move under the given id.
    pub(crate) fn from_new(id: String, new_move: &NewMove) -> Result<Self, TelemetryError> {
        Ok(MoveRow {
            id,
            match_id: new_move.match_id().as_str().to_string(),
            seq: *new_move.seq(),
            occurred_at: new_move.occurred_at().naive_utc(),
            elapsed_ms: *new_move.elapsed_ms(),
            from_idx: *new_move.from_idx(),
            to_idx: *new_move.to_idx(),
            move_kind: (*new_move.move_kind()).into(),
            frog_side: (*new_move.frog_side()).into(),
            is_correct: *new_move.is_correct(),
            interruption: *new_move.interruption(),
            board_before: encode_json(new_move.board_before().as_ref())?,
            board_after: encode_json(new_move.board_after().as_ref())?,
            branching_factor: *new_move.branching_factor(),
            loopiness: *new_move.loopiness(),
        })
    }
}

impl TryFrom<MoveRow> for Move {
    type Error = TelemetryError;

    fn try_from(row: MoveRow) -> Result<Self, Self::Error> {
        Ok(Move {
            id: MoveId::new(row.id),
            match_id: MatchId::new(row.match_id),
            seq: row.seq,
            occurred_at: row.occurred_at.and_utc(),
            elapsed_ms: row.elapsed_ms,
            from_idx: row.from_idx,
            to_idx: row.to_idx,
            move_kind: MoveKind::try_from(row.move_kind)
                .map_err(|e| TelemetryError::storage(format!("Corrupt move row: {}", e.message)))?,
            frog_side: FrogSide::try_from(row.frog_side)
                .map_err(|e| TelemetryError::storage(format!("Corrupt move row: {}", e.message)))?,
            is_correct: row.is_correct,
            interruption: row.interruption,
            board_before: decode_json(row.board_before)?,
            board_after: decode_json(row.board_after)?,
            branching_factor: row.branching_factor,
            loopiness: row.loopiness,
        })
    }
}

/// Current time as stored in timestamp columns.
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub(crate) fn encode_json(value: Option<&serde_json::Value>) -> Result<Option<String>, TelemetryError> {
    value
        .map(serde_json::to_string)
        .transpose()
        .map_err(TelemetryError::from)
}

fn decode_json(text: Option<String>) -> Result<Option<serde_json::Value>, TelemetryError> {
    text.as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(TelemetryError::from)
}
