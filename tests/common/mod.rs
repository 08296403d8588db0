#![allow(dead_code)]

use agora::{
    config::Config,
    content::{self, NewComment, NewPost},
    database::init_pool,
};
use sqlx::SqlitePool;

pub async fn setup() -> (SqlitePool, Config) {
    let config = Config::default();
    let pool = init_pool(&config.database_url)
        .await
        .expect("in-memory database");

    (pool, config)
}

pub async fn seed_user(pool: &SqlitePool, username: &str) -> i64 {
    content::create_user(pool, username).await.unwrap().id
}

pub async fn seed_board(pool: &SqlitePool, title: &str) -> i64 {
    content::create_board(pool, title).await.unwrap().id
}

pub async fn seed_post(
    pool: &SqlitePool,
    config: &Config,
    board_id: i64,
    author_id: i64,
    title: &str,
) -> i64 {
    content::create_post(
        pool,
        config.rank_epoch,
        NewPost {
            board_id,
            author_id,
            title,
            body: Some("body"),
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn seed_comment(
    pool: &SqlitePool,
    post_id: i64,
    parent_id: Option<i64>,
    author_id: i64,
    body: &str,
) -> i64 {
    content::create_comment(
        pool,
        NewComment {
            post_id,
            parent_id,
            author_id,
            body,
        },
    )
    .await
    .unwrap()
    .id
}

pub async fn vote_total(pool: &SqlitePool, table: &str, id: i64) -> i64 {
    sqlx::query_scalar(&format!("SELECT vote_total FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn stored_direction(
    pool: &SqlitePool,
    voter_id: i64,
    target_type: &str,
    target_id: i64,
) -> Option<i64> {
    sqlx::query_scalar(
        "SELECT direction FROM votes WHERE voter_id = ? AND target_type = ? AND target_id = ?",
    )
    .bind(voter_id)
    .bind(target_type)
    .bind(target_id)
    .fetch_optional(pool)
    .await
    .unwrap()
}

/// Backdate a row so time-window filters have something to exclude.
pub async fn set_created_at(
    pool: &SqlitePool,
    table: &str,
    id: i64,
    created_at: chrono::DateTime<chrono::Utc>,
) {
    sqlx::query(&format!("UPDATE {table} SET created_at = ? WHERE id = ?"))
        .bind(created_at)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

/// Pin a vote total directly, bypassing the ledger, for ordering tests that
/// would otherwise need a seeded voter per point of score.
pub async fn set_vote_total(pool: &SqlitePool, table: &str, id: i64, total: i64) {
    sqlx::query(&format!("UPDATE {table} SET vote_total = ? WHERE id = ?"))
        .bind(total)
        .bind(id)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn reputation(pool: &SqlitePool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT reputation FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
