//! Move sequencer: appends moves with gapless per-match sequence numbers and
//! reads them back in order.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use tracing::{debug, info, instrument, warn};

use crate::TelemetryError;
use crate::config::SequencerConfig;
use crate::domain::{MatchId, Move, MoveDraft, NewMove};
use crate::ports::{MatchStore, MoveStore};

/// Assigns sequence numbers and persists moves.
///
/// The next number is read as last + 1 and the insert is retried when the
/// store reports that another writer took it. Validation happens before any
/// storage access, so a rejected draft never consumes a number.
#[derive(Clone)]
pub struct MoveSequencer {
    matches: Arc<dyn MatchStore>,
    moves: Arc<dyn MoveStore>,
    config: SequencerConfig,
}

impl MoveSequencer {
    /// Creates a sequencer with the given retry policy.
    pub fn new(
        matches: Arc<dyn MatchStore>,
        moves: Arc<dyn MoveStore>,
        config: SequencerConfig,
    ) -> Self {
        Self {
            matches,
            moves,
            config,
        }
    }

    /// Appends a move to the end of the match's sequence.
    ///
    /// Finished matches still accept moves so late client flushes are kept.
    ///
    /// # Errors
    ///
    /// - validation when the draft is malformed
    /// - not-found when the match does not exist
    /// - conflict when the retry budget runs out under contention
    #[instrument(skip(self, draft), fields(match_id = %match_id))]
    pub async fn append_move(
        &self,
        match_id: &MatchId,
        draft: MoveDraft,
    ) -> Result<Move, TelemetryError> {
        draft.validate()?;
        self.matches.get(match_id).await?;

        let received_at = Utc::now();
        let max_attempts = *self.config.max_attempts();
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let seq = match self.moves.get_last_by_match(match_id).await {
                Ok(last) => *last.seq() + 1,
                Err(e) if e.is_not_found() => 1,
                Err(e) => return Err(e),
            };
            let new_move = NewMove::from_draft(match_id.clone(), seq, &draft, received_at)?;

            match self.moves.create(new_move).await {
                Ok(stored) => {
                    info!(seq, attempt, "Move appended");
                    return Ok(stored);
                }
                Err(e) if e.is_conflict() && attempt < max_attempts => {
                    debug!(seq, attempt, "Sequence number taken, retrying");
                    let backoff = self.config.backoff_ms().saturating_mul(u64::from(attempt));
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                Err(e) if e.is_conflict() => {
                    warn!(attempt, "Sequence retry budget exhausted");
                    return Err(TelemetryError::conflict(format!(
                        "could not assign a sequence number for match {} after {} attempts",
                        match_id, max_attempts
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// All moves of a match in sequence order.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] when the match does not exist.
    #[instrument(skip(self), fields(match_id = %match_id))]
    pub async fn list_moves(&self, match_id: &MatchId) -> Result<Vec<Move>, TelemetryError> {
        self.matches.get(match_id).await?;
        self.moves.get_by_match(match_id).await
    }

    /// Streams a match's moves in sequence order, `page_size` rows per
    /// storage round trip.
    ///
    /// The stream is lazy and ends after the last stored move. Each call
    /// starts again from the first move. An unknown match yields nothing.
    pub fn stream_moves(
        &self,
        match_id: MatchId,
        page_size: i64,
    ) -> BoxStream<'static, Result<Move, TelemetryError>> {
        if page_size < 1 {
            let err = TelemetryError::validation("page_size must be at least 1");
            return stream::once(async move { Err(err) }).boxed();
        }

        let moves = Arc::clone(&self.moves);
        stream::try_unfold(Some(0), move |cursor| {
            next_page(Arc::clone(&moves), match_id.clone(), cursor, page_size)
        })
        .map_ok(|page| stream::iter(page.into_iter().map(Ok)))
        .try_flatten()
        .boxed()
    }

    /// The most recent move of a match.
    ///
    /// # Errors
    ///
    /// Returns a not-found [`TelemetryError`] when the match has no moves.
    #[instrument(skip(self), fields(match_id = %match_id))]
    pub async fn get_last_move(&self, match_id: &MatchId) -> Result<Move, TelemetryError> {
        self.moves.get_last_by_match(match_id).await
    }
}

/// Fetches the page after `cursor`; `None` as cursor means the previous
/// page was the last one.
async fn next_page(
    moves: Arc<dyn MoveStore>,
    match_id: MatchId,
    cursor: Option<i32>,
    page_size: i64,
) -> Result<Option<(Vec<Move>, Option<i32>)>, TelemetryError> {
    let Some(after_seq) = cursor else {
        return Ok(None);
    };
    let page = moves.get_page_after(&match_id, after_seq, page_size).await?;
    debug!(match_id = %match_id, after_seq, rows = page.len(), "Fetched move page");
    if page.is_empty() {
        return Ok(None);
    }
    let next = if (page.len() as i64) < page_size {
        None
    } else {
        page.last().map(|last| last.seq)
    };
    Ok(Some((page, next)))
}

impl std::fmt::Debug for MoveSequencer {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MoveSequencer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
