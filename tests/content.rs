mod common;

use agora::{
    content::{self, NewComment, NewPost},
    error::AppError,
};
use common::*;

#[tokio::test]
async fn creating_posts_moves_the_board_counter() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "general").await;

    seed_post(&pool, &config, board, author, "first").await;
    seed_post(&pool, &config, board, author, "second").await;

    let row = content::fetch_board(&pool, board).await.unwrap();
    assert_eq!(row.post_count, 2);
}

#[tokio::test]
async fn new_posts_start_with_their_age_score() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "general").await;

    let post = seed_post(&pool, &config, board, author, "fresh").await;
    let row = content::fetch_post(&pool, post).await.unwrap();

    assert_eq!(row.vote_total, 0);
    let expected = agora::rank::popularity(0, row.created_at, config.rank_epoch);
    assert!((row.score - expected).abs() < 1e-9);
}

#[tokio::test]
async fn posting_to_a_missing_or_deleted_board_fails() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "doomed").await;

    let err = content::create_post(
        &pool,
        config.rank_epoch,
        NewPost { board_id: 999, author_id: author, title: "nope", body: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    sqlx::query("UPDATE boards SET deleted = 1 WHERE id = ?")
        .bind(board)
        .execute(&pool)
        .await
        .unwrap();

    let err = content::create_post(
        &pool,
        config.rank_epoch,
        NewPost { board_id: board, author_id: author, title: "nope", body: None },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn comment_counters_split_roots_from_replies() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "general").await;
    let post = seed_post(&pool, &config, board, author, "hello").await;

    let root = seed_comment(&pool, post, None, author, "root").await;
    seed_comment(&pool, post, None, author, "another root").await;
    seed_comment(&pool, post, Some(root), author, "reply").await;
    seed_comment(&pool, post, Some(root), author, "reply again").await;

    let row = content::fetch_post(&pool, post).await.unwrap();
    assert_eq!(row.comment_count, 4);
    assert_eq!(row.root_comment_count, 2);

    let root_row = content::fetch_comment(&pool, root).await.unwrap();
    assert_eq!(root_row.reply_count, 2);
}

#[tokio::test]
async fn replying_under_a_tombstone_is_allowed() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "general").await;
    let post = seed_post(&pool, &config, board, author, "hello").await;

    let root = seed_comment(&pool, post, None, author, "root").await;
    content::delete_comment(&pool, root).await.unwrap();

    let reply = seed_comment(&pool, post, Some(root), author, "still here").await;
    let row = content::fetch_comment(&pool, reply).await.unwrap();
    assert_eq!(row.parent_id, Some(root));

    let root_row = content::fetch_comment(&pool, root).await.unwrap();
    assert_eq!(root_row.reply_count, 1);
}

#[tokio::test]
async fn cross_post_replies_are_rejected() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "general").await;
    let post = seed_post(&pool, &config, board, author, "hello").await;
    let other_post = seed_post(&pool, &config, board, author, "elsewhere").await;
    let foreign = seed_comment(&pool, other_post, None, author, "wrong thread").await;

    let err = content::create_comment(
        &pool,
        NewComment { post_id: post, parent_id: Some(foreign), author_id: author, body: "nope" },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));

    let row = content::fetch_post(&pool, post).await.unwrap();
    assert_eq!(row.comment_count, 0);
}

#[tokio::test]
async fn subscriptions_move_the_counter_once() {
    let (pool, _config) = setup().await;
    let user = seed_user(&pool, "user").await;
    let board = seed_board(&pool, "general").await;

    assert!(content::subscribe(&pool, user, board).await.unwrap());
    assert!(!content::subscribe(&pool, user, board).await.unwrap());

    let row = content::fetch_board(&pool, board).await.unwrap();
    assert_eq!(row.num_subscribers, 1);

    assert!(content::unsubscribe(&pool, user, board).await.unwrap());
    assert!(!content::unsubscribe(&pool, user, board).await.unwrap());

    let row = content::fetch_board(&pool, board).await.unwrap();
    assert_eq!(row.num_subscribers, 0);
}

#[tokio::test]
async fn tombstoning_keeps_rows_and_counters() {
    let (pool, config) = setup().await;
    let author = seed_user(&pool, "author").await;
    let board = seed_board(&pool, "general").await;
    let post = seed_post(&pool, &config, board, author, "hello").await;
    seed_comment(&pool, post, None, author, "root").await;

    content::delete_post(&pool, post).await.unwrap();

    // The row survives as a tombstone and its aggregates are not rewound.
    let row = content::fetch_post(&pool, post).await.unwrap();
    assert!(row.deleted);
    assert_eq!(row.comment_count, 1);

    let board_row = content::fetch_board(&pool, board).await.unwrap();
    assert_eq!(board_row.post_count, 1);

    let err = content::delete_post(&pool, 999).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
