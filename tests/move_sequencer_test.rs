//! Tests for move appends, sequence numbering and ordered reads.

mod common;

use common::{setup, slide};
use frogjump_telemetry::{ErrorKind, FrogSide, MatchId, MoveDraft, MoveKind};
use futures::TryStreamExt;
use serde_json::json;

async fn open_match(ctx: &common::TestContext) -> MatchId {
    let session = ctx.sessions.create_session(None, None).await.expect("Session");
    let game = ctx
        .matches
        .create_match(session.id(), 2, 1, None)
        .await
        .expect("Match");
    game.id().clone()
}

#[tokio::test]
async fn test_three_appends_list_in_order() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;

    for i in 0..3 {
        let stored = ctx
            .moves
            .append_move(&match_id, slide(1000 * (i + 1), i as i32))
            .await
            .expect("Append failed");
        assert_eq!(*stored.seq(), i as i32 + 1);
    }

    let moves = ctx.moves.list_moves(&match_id).await.expect("List failed");
    let seqs: Vec<i32> = moves.iter().map(|m| *m.seq()).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert_eq!(*moves[2].elapsed_ms(), 3000);

    let last = ctx.moves.get_last_move(&match_id).await.expect("Last failed");
    assert_eq!(*last.seq(), 3);
    assert_eq!(last.id(), moves[2].id());
}

#[tokio::test]
async fn test_append_to_missing_match_is_not_found() {
    let ctx = setup();
    let err = ctx
        .moves
        .append_move(&MatchId::new("no-such-match"), slide(10, 0))
        .await
        .expect_err("Should be missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_invalid_draft_is_rejected_without_writing() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;

    let bad = MoveDraft {
        move_kind: 5,
        ..slide(10, 0)
    };
    let err = ctx
        .moves
        .append_move(&match_id, bad)
        .await
        .expect_err("Unknown kind");
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = ctx
        .moves
        .append_move(&MatchId::new("missing"), MoveDraft { elapsed_ms: -5, ..slide(0, 0) })
        .await
        .expect_err("Validation comes before lookup");
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(ctx.moves.list_moves(&match_id).await.expect("List").is_empty());
    let first = ctx
        .moves
        .append_move(&match_id, slide(10, 0))
        .await
        .expect("Append failed");
    assert_eq!(*first.seq(), 1);
}

#[tokio::test]
async fn test_last_move_of_empty_match_is_not_found() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;
    let err = ctx
        .moves
        .get_last_move(&match_id)
        .await
        .expect_err("No moves yet");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_list_moves_of_missing_match_is_not_found() {
    let ctx = setup();
    let err = ctx
        .moves
        .list_moves(&MatchId::new("missing"))
        .await
        .expect_err("Should be missing");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_optional_fields_read_back_absent() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;
    ctx.moves
        .append_move(&match_id, slide(250, 3))
        .await
        .expect("Append failed");

    let stored = ctx.moves.get_last_move(&match_id).await.expect("Last");
    assert!(stored.branching_factor().is_none());
    assert!(stored.loopiness().is_none());
    assert!(stored.board_before().is_none());
    assert!(stored.board_after().is_none());
    assert!(!*stored.interruption());

    let as_json = serde_json::to_value(&stored).expect("Serialize");
    assert!(as_json["branching_factor"].is_null());
    assert!(as_json["loopiness"].is_null());
}

#[tokio::test]
async fn test_metrics_and_boards_pass_through() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;
    let draft = MoveDraft {
        move_kind: 1,
        frog_side: 1,
        is_correct: false,
        interruption: true,
        board_before: Some(json!([1, 1, 0, 2, 2])),
        board_after: Some(json!([1, 0, 1, 2, 2])),
        branching_factor: Some(0),
        loopiness: Some(0.375),
        ..slide(4200, 1)
    };
    let stored = ctx
        .moves
        .append_move(&match_id, draft)
        .await
        .expect("Append failed");

    assert_eq!(*stored.move_kind(), MoveKind::Jump);
    assert_eq!(*stored.frog_side(), FrogSide::Right);
    assert!(!*stored.is_correct());
    assert!(*stored.interruption());
    assert_eq!(*stored.branching_factor(), Some(0));
    assert_eq!(*stored.loopiness(), Some(0.375));
    assert_eq!(stored.board_after(), &Some(json!([1, 0, 1, 2, 2])));
}

#[tokio::test]
async fn test_finished_match_still_accepts_moves() {
    let ctx = setup();
    let session = ctx.sessions.create_session(None, None).await.expect("Session");
    let game = ctx
        .matches
        .create_match(session.id(), 1, 1, None)
        .await
        .expect("Match");
    ctx.matches
        .finish_active(session.id(), Some("won".to_string()))
        .await
        .expect("Finish");

    let late = ctx
        .moves
        .append_move(game.id(), slide(9000, 4))
        .await
        .expect("Late flush failed");
    assert_eq!(*late.seq(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_concurrent_appends_get_one_and_two() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;

    let a = {
        let moves = ctx.moves.clone();
        let match_id = match_id.clone();
        tokio::spawn(async move { moves.append_move(&match_id, slide(100, 0)).await })
    };
    let b = {
        let moves = ctx.moves.clone();
        let match_id = match_id.clone();
        tokio::spawn(async move { moves.append_move(&match_id, slide(200, 1)).await })
    };

    let mut seqs = vec![
        *a.await.expect("Task panicked").expect("Append a").seq(),
        *b.await.expect("Task panicked").expect("Append b").seq(),
    ];
    seqs.sort();
    assert_eq!(seqs, vec![1, 2]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_many_concurrent_appends_are_gapless() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;
    let total = 24;

    let tasks: Vec<_> = (0..total)
        .map(|i| {
            let moves = ctx.moves.clone();
            let match_id = match_id.clone();
            tokio::spawn(async move { moves.append_move(&match_id, slide(i * 10, 0)).await })
        })
        .collect();
    for task in tasks {
        task.await.expect("Task panicked").expect("Append failed");
    }

    let seqs: Vec<i32> = ctx
        .moves
        .list_moves(&match_id)
        .await
        .expect("List failed")
        .iter()
        .map(|m| *m.seq())
        .collect();
    assert_eq!(seqs, (1..=total as i32).collect::<Vec<_>>());

    let last = ctx.moves.get_last_move(&match_id).await.expect("Last");
    assert_eq!(*last.seq(), total as i32);
}

#[tokio::test]
async fn test_stream_matches_list_for_any_page_size() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;
    for i in 0..7 {
        ctx.moves
            .append_move(&match_id, slide(i * 100, 0))
            .await
            .expect("Append failed");
    }
    let listed = ctx.moves.list_moves(&match_id).await.expect("List");

    for page_size in [1, 2, 3, 7, 50] {
        let streamed: Vec<_> = ctx
            .moves
            .stream_moves(match_id.clone(), page_size)
            .try_collect()
            .await
            .expect("Stream failed");
        assert_eq!(streamed, listed, "page_size {}", page_size);
    }
}

#[tokio::test]
async fn test_stream_rejects_empty_pages() {
    let ctx = setup();
    let match_id = open_match(&ctx).await;
    let result: Result<Vec<_>, _> = ctx.moves.stream_moves(match_id, 0).try_collect().await;
    assert_eq!(result.expect_err("page_size 0").kind(), ErrorKind::Validation);
}
