//! Diesel-backed repository implementing every persistence port.

use async_trait::async_trait;
use diesel::dsl::max;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::{Instrument, Span, debug, info, instrument};
use uuid::Uuid;

use crate::TelemetryError;
use crate::db::models::{DifficultyRow, MatchRow, MoveRow, SessionRow, encode_json, now_utc};
use crate::db::{DatabasePool, schema};
use crate::domain::{
    Difficulty, DifficultyId, Match, MatchId, Move, NewMatch, NewMove, NewSession, Session,
    SessionId,
};
use crate::ports::{DifficultyStore, MatchStore, MoveStore, SessionStore};

/// Storage adapter for sessions, matches, moves and difficulties.
///
/// Diesel is synchronous, so each call checks out a pooled connection on a
/// blocking thread. The caller's span is entered on that thread so storage
/// events nest under the request that caused them.
#[derive(Debug, Clone)]
pub struct TelemetryRepository {
    pool: DatabasePool,
}

impl TelemetryRepository {
    /// Creates a repository on an opened pool.
    #[instrument(skip(pool), fields(database_url = %pool.database_url()))]
    pub fn new(pool: DatabasePool) -> Self {
        info!("Creating TelemetryRepository");
        Self { pool }
    }

    /// Returns the underlying pool.
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Runs `op` with a pooled connection on the blocking thread pool.
    ///
    /// Dropping the returned future does not interrupt `op`; whatever
    /// transaction it runs still commits or rolls back as a whole.
    pub(crate) async fn interact<T, F>(&self, op: &'static str, f: F) -> Result<T, TelemetryError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, TelemetryError> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let span = Span::current();
        let task = tokio::task::spawn_blocking(move || {
            span.in_scope(|| {
                debug!(op, "Running storage operation");
                let mut conn = pool.get()?;
                f(&mut conn)
            })
        });
        task.instrument(tracing::debug_span!("storage", op)).await?
    }
}

#[async_trait]
impl SessionStore for TelemetryRepository {
    #[instrument(skip(self, session))]
    async fn create(&self, session: NewSession) -> Result<Session, TelemetryError> {
        let row = SessionRow {
            id: Uuid::new_v4().to_string(),
            player_id: session.player_id().clone(),
            device: session.device().clone(),
            is_finished: false,
            started_at: now_utc().naive_utc(),
            ended_at: None,
        };
        let created = self
            .interact("session.create", move |conn| {
                Ok(diesel::insert_into(schema::sessions::table)
                    .values(&row)
                    .returning(SessionRow::as_returning())
                    .get_result::<SessionRow>(conn)?)
            })
            .await?;

        info!(session_id = %created.id, "Session created");
        Ok(created.into())
    }

    #[instrument(skip(self), fields(session_id = %id))]
    async fn get(&self, id: &SessionId) -> Result<Session, TelemetryError> {
        let key = id.as_str().to_string();
        let row = self
            .interact("session.get", move |conn| {
                Ok(schema::sessions::table
                    .find(&key)
                    .select(SessionRow::as_select())
                    .first::<SessionRow>(conn)
                    .optional()?)
            })
            .await?;

        row.map(Session::from)
            .ok_or_else(|| TelemetryError::not_found(format!("session {} not found", id)))
    }

    #[instrument(skip(self, session), fields(session_id = %session.id()))]
    async fn update(&self, session: Session) -> Result<Session, TelemetryError> {
        let row = SessionRow::from(&session);
        let updated = self
            .interact("session.update", move |conn| {
                Ok(diesel::update(schema::sessions::table.find(row.id.clone()))
                    .set(&row)
                    .returning(SessionRow::as_returning())
                    .get_result::<SessionRow>(conn)
                    .optional()?)
            })
            .await?;

        let updated = updated.ok_or_else(|| {
            TelemetryError::not_found(format!("session {} not found", session.id()))
        })?;
        debug!(is_finished = updated.is_finished, "Session updated");
        Ok(updated.into())
    }
}

#[async_trait]
impl MatchStore for TelemetryRepository {
    #[instrument(skip(self, game), fields(session_id = %game.session_id()))]
    async fn create(&self, game: NewMatch) -> Result<Match, TelemetryError> {
        let row = MatchRow {
            id: Uuid::new_v4().to_string(),
            session_id: game.session_id().as_str().to_string(),
            difficulty_id: *game.difficulty_id(),
            level_n: *game.level_n(),
            is_active: true,
            started_at: now_utc().naive_utc(),
            ended_at: None,
            outcome: None,
            meta: encode_json(game.meta().as_ref())?,
        };
        let created = self
            .interact("match.create", move |conn| {
                conn.immediate_transaction(|conn| {
                    Ok(diesel::insert_into(schema::matches::table)
                        .values(&row)
                        .returning(MatchRow::as_returning())
                        .get_result::<MatchRow>(conn)?)
                })
            })
            .await
            .map_err(|e| {
                if e.is_conflict() {
                    TelemetryError::conflict(format!(
                        "session {} already has an active match",
                        game.session_id()
                    ))
                } else {
                    e
                }
            })?;

        info!(match_id = %created.id, level_n = created.level_n, "Match created");
        Match::try_from(created)
    }

    #[instrument(skip(self), fields(match_id = %id))]
    async fn get(&self, id: &MatchId) -> Result<Match, TelemetryError> {
        let key = id.as_str().to_string();
        let row = self
            .interact("match.get", move |conn| {
                Ok(schema::matches::table
                    .find(&key)
                    .select(MatchRow::as_select())
                    .first::<MatchRow>(conn)
                    .optional()?)
            })
            .await?;

        row.ok_or_else(|| TelemetryError::not_found(format!("match {} not found", id)))
            .and_then(Match::try_from)
    }

    #[instrument(skip(self, game), fields(match_id = %game.id(), is_active = game.is_active()))]
    async fn update(&self, game: Match) -> Result<Match, TelemetryError> {
        let row = MatchRow::try_from(&game)?;
        let updated = self
            .interact("match.update", move |conn| {
                conn.immediate_transaction(|conn| {
                    let current = schema::matches::table
                        .find(&row.id)
                        .select(MatchRow::as_select())
                        .first::<MatchRow>(conn)
                        .optional()?
                        .ok_or_else(|| {
                            TelemetryError::not_found(format!("match {} not found", row.id))
                        })?;

                    if !current.is_active {
                        return Err(TelemetryError::conflict(format!(
                            "match {} is already finished",
                            row.id
                        )));
                    }

                    Ok(diesel::update(schema::matches::table.find(row.id.clone()))
                        .set(&row)
                        .returning(MatchRow::as_returning())
                        .get_result::<MatchRow>(conn)?)
                })
            })
            .await?;

        debug!(is_active = updated.is_active, "Match updated");
        Match::try_from(updated)
    }

    #[instrument(skip(self), fields(session_id = %session_id))]
    async fn get_active_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Match, TelemetryError> {
        let key = session_id.as_str().to_string();
        let row = self
            .interact("match.get_active_by_session", move |conn| {
                Ok(schema::matches::table
                    .filter(schema::matches::session_id.eq(&key))
                    .filter(schema::matches::is_active.eq(true))
                    .select(MatchRow::as_select())
                    .first::<MatchRow>(conn)
                    .optional()?)
            })
            .await?;

        row.ok_or_else(|| {
            TelemetryError::not_found(format!("session {} has no active match", session_id))
        })
        .and_then(Match::try_from)
    }
}

#[async_trait]
impl MoveStore for TelemetryRepository {
    #[instrument(skip(self, new_move), fields(match_id = %new_move.match_id(), seq = new_move.seq()))]
    async fn create(&self, new_move: NewMove) -> Result<Move, TelemetryError> {
        let row = MoveRow::from_new(Uuid::new_v4().to_string(), &new_move)?;
        let created = self
            .interact("move.create", move |conn| {
                conn.immediate_transaction(|conn| {
                    let last: Option<i32> = schema::moves::table
                        .filter(schema::moves::match_id.eq(&row.match_id))
                        .select(max(schema::moves::seq))
                        .first(conn)?;
                    let expected = last.unwrap_or(0) + 1;
                    if row.seq != expected {
                        return Err(TelemetryError::conflict(format!(
                            "seq {} for match {} is taken; next is {}",
                            row.seq, row.match_id, expected
                        )));
                    }

                    Ok(diesel::insert_into(schema::moves::table)
                        .values(&row)
                        .returning(MoveRow::as_returning())
                        .get_result::<MoveRow>(conn)?)
                })
            })
            .await?;

        debug!(move_id = %created.id, "Move stored");
        Move::try_from(created)
    }

    #[instrument(skip(self), fields(match_id = %match_id))]
    async fn get_by_match(&self, match_id: &MatchId) -> Result<Vec<Move>, TelemetryError> {
        let key = match_id.as_str().to_string();
        let rows = self
            .interact("move.get_by_match", move |conn| {
                Ok(schema::moves::table
                    .filter(schema::moves::match_id.eq(&key))
                    .order(schema::moves::seq.asc())
                    .select(MoveRow::as_select())
                    .load::<MoveRow>(conn)?)
            })
            .await?;

        debug!(count = rows.len(), "Moves loaded");
        rows.into_iter().map(Move::try_from).collect()
    }

    #[instrument(skip(self), fields(match_id = %match_id))]
    async fn get_page_after(
        &self,
        match_id: &MatchId,
        after_seq: i32,
        limit: i64,
    ) -> Result<Vec<Move>, TelemetryError> {
        let key = match_id.as_str().to_string();
        let rows = self
            .interact("move.get_page_after", move |conn| {
                Ok(schema::moves::table
                    .filter(schema::moves::match_id.eq(&key))
                    .filter(schema::moves::seq.gt(after_seq))
                    .order(schema::moves::seq.asc())
                    .limit(limit)
                    .select(MoveRow::as_select())
                    .load::<MoveRow>(conn)?)
            })
            .await?;

        rows.into_iter().map(Move::try_from).collect()
    }

    #[instrument(skip(self), fields(match_id = %match_id))]
    async fn get_last_by_match(&self, match_id: &MatchId) -> Result<Move, TelemetryError> {
        let key = match_id.as_str().to_string();
        let row = self
            .interact("move.get_last_by_match", move |conn| {
                Ok(schema::moves::table
                    .filter(schema::moves::match_id.eq(&key))
                    .order(schema::moves::seq.desc())
                    .select(MoveRow::as_select())
                    .first::<MoveRow>(conn)
                    .optional()?)
            })
            .await?;

        row.ok_or_else(|| TelemetryError::not_found(format!("match {} has no moves", match_id)))
            .and_then(Move::try_from)
    }
}

#[async_trait]
impl DifficultyStore for TelemetryRepository {
    #[instrument(skip(self))]
    async fn get_by_id(&self, id: DifficultyId) -> Result<Difficulty, TelemetryError> {
        let row = self
            .interact("difficulty.get_by_id", move |conn| {
                Ok(schema::difficulty::table
                    .find(id)
                    .select(DifficultyRow::as_select())
                    .first::<DifficultyRow>(conn)
                    .optional()?)
            })
            .await?;

        row.map(Difficulty::from)
            .ok_or_else(|| TelemetryError::not_found(format!("difficulty {} not found", id)))
    }

    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<Difficulty>, TelemetryError> {
        let rows = self
            .interact("difficulty.get_all", |conn| {
                Ok(schema::difficulty::table
                    .order(schema::difficulty::id.asc())
                    .select(DifficultyRow::as_select())
                    .load::<DifficultyRow>(conn)?)
            })
            .await?;

        info!(count = rows.len(), "Difficulties loaded");
        Ok(rows.into_iter().map(Difficulty::from).collect())
    }
}
