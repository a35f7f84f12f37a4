//! Router assembly.

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tracing::info;

use crate::api::{AppState, handlers};

/// Builds the telemetry router with request logging.
///
/// ```ignore
/// let state = AppState::from_repository(repository, sequencer, timeout);
/// let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
/// axum::serve(listener, create_router(state)).await?;
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ping", get(handlers::ping))
        .route("/game", post(handlers::create_game))
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/{id}", get(handlers::get_session))
        .route("/sessions/{id}/finish", post(handlers::finish_session))
        .route("/sessions/{id}/active-match", get(handlers::get_active_match))
        .route(
            "/sessions/{id}/active-match/finish",
            post(handlers::finish_active_match),
        )
        .route("/matches", post(handlers::create_match))
        .route("/matches/{id}", get(handlers::get_match))
        .route(
            "/matches/{id}/moves",
            get(handlers::list_moves).post(handlers::append_move),
        )
        .route("/matches/{id}/moves/last", get(handlers::get_last_move))
        .route("/difficulties", get(handlers::list_difficulties))
        .route("/difficulties/{id}", get(handlers::get_difficulty))
        .layer(ServiceBuilder::new().map_request(|req: Request<Body>| {
            info!(method = %req.method(), uri = %req.uri(), "Incoming HTTP request");
            req
        }))
        .with_state(state)
}
