//! Tests for the HTTP routes, exercised in-process.

mod common;

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{setup, test_sequencer_config};
use diesel::connection::SimpleConnection;
use frogjump_telemetry::{AppState, ErrorKind, TelemetryError, create_router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Request builds");

    let response = app.clone().oneshot(request).await.expect("Router responds");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Body reads")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, value)
}

#[tokio::test]
async fn test_ping() {
    let ctx = setup();
    let app = create_router(ctx.app_state());
    let (status, body) = send(&app, "GET", "/ping", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"message": "pong"}));
}

#[tokio::test]
async fn test_full_flow_over_http() {
    let ctx = setup();
    let app = create_router(ctx.app_state());

    let (status, session) = send(
        &app,
        "POST",
        "/sessions",
        Some(json!({"player_id": "p-1", "device": "Quest 3"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let session_id = session["id"].as_str().expect("session id").to_string();
    assert_eq!(session["is_finished"], json!(false));
    assert!(session["ended_at"].is_null());

    let (status, game) = send(
        &app,
        "POST",
        "/matches",
        Some(json!({"session_id": session_id, "difficulty_id": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(game["level_n"], json!(1));
    assert_eq!(game["is_active"], json!(true));
    let match_id = game["id"].as_str().expect("match id").to_string();

    for i in 0..3 {
        let (status, stored) = send(
            &app,
            "POST",
            &format!("/matches/{}/moves", match_id),
            Some(json!({
                "elapsed_ms": 500 * (i + 1),
                "from_idx": i,
                "to_idx": i + 1,
                "move_kind": 0,
                "frog_side": 0,
                "is_correct": true,
                "loopiness": 0.5
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(stored["seq"], json!(i + 1));
        assert!(stored["branching_factor"].is_null());
    }

    let (status, moves) = send(&app, "GET", &format!("/matches/{}/moves", match_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let seqs: Vec<i64> = moves
        .as_array()
        .expect("array")
        .iter()
        .map(|m| m["seq"].as_i64().expect("seq"))
        .collect();
    assert_eq!(seqs, vec![1, 2, 3]);

    let (status, last) = send(&app, "GET", &format!("/matches/{}/moves/last", match_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(last["seq"], json!(3));

    let (status, active) = send(
        &app,
        "GET",
        &format!("/sessions/{}/active-match", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["id"], json!(match_id));

    let (status, finished) = send(
        &app,
        "POST",
        &format!("/sessions/{}/active-match/finish", session_id),
        Some(json!({"outcome": "won"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finished["is_active"], json!(false));
    assert_eq!(finished["outcome"], json!("won"));
    assert!(!finished["ended_at"].is_null());

    let (status, closed) = send(
        &app,
        "POST",
        &format!("/sessions/{}/finish", session_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["is_finished"], json!(true));
}

#[tokio::test]
async fn test_create_session_without_body() {
    let ctx = setup();
    let app = create_router(ctx.app_state());
    let (status, session) = send(&app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(session["player_id"].is_null());
}

#[tokio::test]
async fn test_game_requires_uuid() {
    let ctx = setup();
    let app = create_router(ctx.app_state());

    let (status, body) = send(&app, "POST", "/game", Some(json!({"game_id": "not-a-uuid"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "game_id must be a valid UUID"}));

    let game_id = uuid::Uuid::new_v4().to_string();
    let (status, session) = send(&app, "POST", "/game", Some(json!({"game_id": game_id}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(session["player_id"], json!(game_id));
    assert!(session["device"].is_null());
}

#[tokio::test]
async fn test_error_statuses() {
    let ctx = setup();
    let app = create_router(ctx.app_state());

    let (status, body) = send(
        &app,
        "POST",
        "/matches",
        Some(json!({"session_id": "ghost", "difficulty_id": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(
        &app,
        "POST",
        "/matches/ghost/moves",
        Some(json!({
            "elapsed_ms": 0, "from_idx": 0, "to_idx": 1,
            "move_kind": 0, "frog_side": 0, "is_correct": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/matches", Some(json!({"difficulty_id": "hard"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, "GET", "/difficulties/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/sessions/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_second_active_match_is_conflict() {
    let ctx = setup();
    let app = create_router(ctx.app_state());
    let (_, session) = send(&app, "POST", "/sessions", Some(json!({}))).await;
    let body = json!({"session_id": session["id"], "difficulty_id": 1});

    let (status, _) = send(&app, "POST", "/matches", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/matches", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().expect("message").contains("active match"));
}

#[tokio::test]
async fn test_match_on_finished_session_is_conflict() {
    let ctx = setup();
    let app = create_router(ctx.app_state());
    let (_, session) = send(&app, "POST", "/sessions", Some(json!({}))).await;
    let session_id = session["id"].as_str().expect("id").to_string();
    let (status, _) = send(&app, "POST", &format!("/sessions/{}/finish", session_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let body = json!({"session_id": session_id, "difficulty_id": 1});
    let (status, body) = send(&app, "POST", "/matches", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().expect("message").contains("finished"));
}

#[tokio::test]
async fn test_deadline_expiry_is_storage_error() {
    let ctx = setup();
    let state = AppState::from_repository(
        (*ctx.repository).clone(),
        test_sequencer_config(),
        Duration::from_millis(1),
    );

    let err = state
        .deadline(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, TelemetryError>(())
        })
        .await
        .expect_err("Slow operation should miss the deadline");
    assert_eq!(err.kind(), ErrorKind::Storage);

    let value = state
        .deadline(async { Ok::<_, TelemetryError>(7) })
        .await
        .expect("Fast operation finishes in time");
    assert_eq!(value, 7);
}

#[tokio::test]
async fn test_route_past_deadline_is_internal_error() {
    let ctx = setup();
    let state = AppState::from_repository(
        (*ctx.repository).clone(),
        test_sequencer_config(),
        Duration::from_millis(50),
    );
    let app = create_router(state);

    // Hold the write lock so the insert waits on busy_timeout.
    let mut blocker = ctx.pool.get().expect("Connection");
    blocker.batch_execute("BEGIN IMMEDIATE").expect("Take write lock");

    let (status, body) = send(&app, "POST", "/sessions", Some(json!({}))).await;

    blocker.batch_execute("ROLLBACK").expect("Release write lock");
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "request deadline exceeded"}));
}

#[tokio::test]
async fn test_invalid_move_is_bad_request() {
    let ctx = setup();
    let app = create_router(ctx.app_state());
    let (_, session) = send(&app, "POST", "/sessions", Some(json!({}))).await;
    let (_, game) = send(
        &app,
        "POST",
        "/matches",
        Some(json!({"session_id": session["id"], "difficulty_id": 3, "level_n": 2})),
    )
    .await;

    let (status, body) = send(
        &app,
        "POST",
        &format!("/matches/{}/moves", game["id"].as_str().expect("id")),
        Some(json!({
            "elapsed_ms": 10, "from_idx": -1, "to_idx": 1,
            "move_kind": 0, "frog_side": 0, "is_correct": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!("from_idx must not be negative"));
}

#[tokio::test]
async fn test_difficulties_routes() {
    let ctx = setup();
    let app = create_router(ctx.app_state());

    let (status, list) = send(&app, "GET", "/difficulties", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().expect("array").len(), 3);

    let (status, easy) = send(&app, "GET", "/difficulties/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(easy, json!({"id": 1, "name": "easy", "number_of_blocks": 7}));

    let (status, _) = send(&app, "GET", "/difficulties/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
