//! Request handlers. Each one decodes its input, calls one service under the
//! request deadline and encodes the result.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::api::{ApiError, AppState};
use crate::domain::{
    Difficulty, DifficultyId, Match, MatchId, Move, MoveDraft, Session, SessionId,
};

/// Body of `POST /sessions`.
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default)]
    player_id: Option<String>,
    #[serde(default)]
    device: Option<String>,
}

/// Body of `POST /game`.
#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    game_id: String,
}

/// Body of `POST /matches`.
#[derive(Debug, Deserialize)]
pub struct CreateMatchRequest {
    session_id: String,
    difficulty_id: DifficultyId,
    #[serde(default = "first_level")]
    level_n: i32,
    #[serde(default)]
    meta: Option<Value>,
}

fn first_level() -> i32 {
    1
}

/// Body of `POST /sessions/{id}/active-match/finish`.
#[derive(Debug, Default, Deserialize)]
pub struct FinishMatchRequest {
    #[serde(default)]
    outcome: Option<String>,
}

/// Liveness probe.
pub async fn ping() -> Json<Value> {
    Json(json!({ "message": "pong" }))
}

/// Opens a session. The body is optional.
#[instrument(skip_all)]
pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Option<Json<CreateSessionRequest>>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let request = payload?.map(|Json(body)| body).unwrap_or_default();
    let session = state
        .deadline(
            state
                .sessions()
                .create_session(request.player_id, request.device),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Opens a session for a client-generated game id.
#[instrument(skip_all)]
pub async fn create_game(
    State(state): State<AppState>,
    payload: Result<Json<CreateGameRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let Json(request) = payload?;
    if uuid::Uuid::parse_str(&request.game_id).is_err() {
        return Err(ApiError::bad_request("game_id must be a valid UUID"));
    }
    debug!(game_id = %request.game_id, "Opening session for game");

    let session = state
        .deadline(state.sessions().create_session(Some(request.game_id), None))
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// Loads a session.
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let id = SessionId::new(id);
    let session = state.deadline(state.sessions().get_session(&id)).await?;
    Ok(Json(session))
}

/// Finishes a session.
#[instrument(skip(state))]
pub async fn finish_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    let id = SessionId::new(id);
    let session = state.deadline(state.sessions().finish_session(&id)).await?;
    Ok(Json(session))
}

/// Loads the session's active match.
#[instrument(skip(state))]
pub async fn get_active_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Match>, ApiError> {
    let id = SessionId::new(id);
    let game = state
        .deadline(state.matches().get_active_by_session(&id))
        .await?;
    Ok(Json(game))
}

/// Finishes the session's active match. The body is optional.
#[instrument(skip(state, payload))]
pub async fn finish_active_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Option<Json<FinishMatchRequest>>, JsonRejection>,
) -> Result<Json<Match>, ApiError> {
    let request = payload?.map(|Json(body)| body).unwrap_or_default();
    let id = SessionId::new(id);
    let game = state
        .deadline(state.matches().finish_active(&id, request.outcome))
        .await?;
    Ok(Json(game))
}

/// Starts a match.
#[instrument(skip_all)]
pub async fn create_match(
    State(state): State<AppState>,
    payload: Result<Json<CreateMatchRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Match>), ApiError> {
    let Json(request) = payload?;
    if request.session_id.trim().is_empty() {
        return Err(ApiError::bad_request("session_id is required"));
    }
    let session_id = SessionId::new(request.session_id);
    let game = state
        .deadline(state.matches().create_match(
            &session_id,
            request.difficulty_id,
            request.level_n,
            request.meta,
        ))
        .await?;
    Ok((StatusCode::CREATED, Json(game)))
}

/// Loads a match.
#[instrument(skip(state))]
pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Match>, ApiError> {
    let id = MatchId::new(id);
    let game = state.deadline(state.matches().get_match(&id)).await?;
    Ok(Json(game))
}

/// Appends a move to a match.
#[instrument(skip(state, payload))]
pub async fn append_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MoveDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Move>), ApiError> {
    let Json(draft) = payload?;
    let id = MatchId::new(id);
    let stored = state
        .deadline(state.moves().append_move(&id, draft))
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Lists a match's moves in order.
#[instrument(skip(state))]
pub async fn list_moves(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Move>>, ApiError> {
    let id = MatchId::new(id);
    let moves = state.deadline(state.moves().list_moves(&id)).await?;
    Ok(Json(moves))
}

/// Loads a match's most recent move.
#[instrument(skip(state))]
pub async fn get_last_move(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Move>, ApiError> {
    let id = MatchId::new(id);
    let last = state.deadline(state.moves().get_last_move(&id)).await?;
    Ok(Json(last))
}

/// Lists every difficulty.
#[instrument(skip(state))]
pub async fn list_difficulties(
    State(state): State<AppState>,
) -> Result<Json<Vec<Difficulty>>, ApiError> {
    let difficulties = state.deadline(state.difficulties().list_all()).await?;
    Ok(Json(difficulties))
}

/// Loads one difficulty.
#[instrument(skip(state, id))]
pub async fn get_difficulty(
    State(state): State<AppState>,
    id: Result<Path<DifficultyId>, PathRejection>,
) -> Result<Json<Difficulty>, ApiError> {
    let Path(id) = id?;
    let difficulty = state.deadline(state.difficulties().get_by_id(id)).await?;
    Ok(Json(difficulty))
}
