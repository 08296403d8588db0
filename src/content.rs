//! Writes that carry denormalized counters with them.
//!
//! Every aggregate here (`post_count`, `comment_count`, `reply_count`,
//! `num_subscribers`) moves by a relative update inside the same
//! transaction as the insert it mirrors; nothing is ever recomputed by
//! scanning. Text arrives already sanitized and length-checked upstream.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    database::is_unique_violation,
    error::AppError,
    models::{Board, Comment, Post, User},
    rank::popularity,
};

pub async fn create_user(pool: &SqlitePool, username: &str) -> Result<User, AppError> {
    let id = sqlx::query("INSERT INTO users (username, created_at) VALUES (?, ?)")
        .bind(username)
        .bind(Utc::now())
        .execute(pool)
        .await?
        .last_insert_rowid();

    fetch_user(pool, id).await
}

pub async fn create_board(pool: &SqlitePool, title: &str) -> Result<Board, AppError> {
    let id = sqlx::query("INSERT INTO boards (title, created_at) VALUES (?, ?)")
        .bind(title)
        .bind(Utc::now())
        .execute(pool)
        .await?
        .last_insert_rowid();

    fetch_board(pool, id).await
}

#[derive(Debug)]
pub struct NewPost<'a> {
    pub board_id: i64,
    pub author_id: i64,
    pub title: &'a str,
    pub body: Option<&'a str>,
}

pub async fn create_post(
    pool: &SqlitePool,
    rank_epoch: chrono::DateTime<Utc>,
    new_post: NewPost<'_>,
) -> Result<Post, AppError> {
    let board_exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM boards WHERE id = ? AND deleted = 0")
            .bind(new_post.board_id)
            .fetch_optional(pool)
            .await?;
    if board_exists.is_none() {
        return Err(AppError::NotFound("board"));
    }

    let created_at = Utc::now();
    let score = popularity(0, created_at, rank_epoch);

    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        "INSERT INTO posts (board_id, author_id, title, body, created_at, score) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(new_post.board_id)
    .bind(new_post.author_id)
    .bind(new_post.title)
    .bind(new_post.body)
    .bind(created_at)
    .bind(score)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query("UPDATE boards SET post_count = post_count + 1 WHERE id = ?")
        .bind(new_post.board_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    fetch_post(pool, id).await
}

#[derive(Debug)]
pub struct NewComment<'a> {
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub body: &'a str,
}

pub async fn create_comment(
    pool: &SqlitePool,
    new_comment: NewComment<'_>,
) -> Result<Comment, AppError> {
    let post_exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM posts WHERE id = ? AND deleted = 0")
            .bind(new_comment.post_id)
            .fetch_optional(pool)
            .await?;
    if post_exists.is_none() {
        return Err(AppError::NotFound("post"));
    }

    // Replying under a tombstoned parent is allowed; the parent just has to
    // exist and belong to the same post.
    if let Some(parent_id) = new_comment.parent_id {
        let parent_post: Option<i64> =
            sqlx::query_scalar("SELECT post_id FROM comments WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(pool)
                .await?;

        match parent_post {
            None => return Err(AppError::NotFound("comment")),
            Some(post_id) if post_id != new_comment.post_id => {
                return Err(AppError::InvalidInput(format!(
                    "comment {parent_id} does not belong to post {}",
                    new_comment.post_id
                )));
            }
            Some(_) => {}
        }
    }

    let mut tx = pool.begin().await?;

    let id = sqlx::query(
        "INSERT INTO comments (post_id, parent_id, author_id, body, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(new_comment.post_id)
    .bind(new_comment.parent_id)
    .bind(new_comment.author_id)
    .bind(new_comment.body)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query("UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?")
        .bind(new_comment.post_id)
        .execute(&mut *tx)
        .await?;

    match new_comment.parent_id {
        None => {
            sqlx::query("UPDATE posts SET root_comment_count = root_comment_count + 1 WHERE id = ?")
                .bind(new_comment.post_id)
                .execute(&mut *tx)
                .await?;
        }
        Some(parent_id) => {
            sqlx::query("UPDATE comments SET reply_count = reply_count + 1 WHERE id = ?")
                .bind(parent_id)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;

    fetch_comment(pool, id).await
}

/// Tombstone a post. The row stays so its comment tree remains reachable;
/// feeds exclude it at the query boundary.
pub async fn delete_post(pool: &SqlitePool, post_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE posts SET deleted = 1 WHERE id = ?")
        .bind(post_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("post"));
    }
    Ok(())
}

/// Tombstone a comment. Descendants stay attached; views null the author
/// and content.
pub async fn delete_comment(pool: &SqlitePool, comment_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("UPDATE comments SET deleted = 1 WHERE id = ?")
        .bind(comment_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("comment"));
    }
    Ok(())
}

/// Returns false when the subscription already existed; the counter only
/// moves when a row actually lands.
pub async fn subscribe(pool: &SqlitePool, user_id: i64, board_id: i64) -> Result<bool, AppError> {
    let board_exists: Option<i64> =
        sqlx::query_scalar("SELECT id FROM boards WHERE id = ? AND deleted = 0")
            .bind(board_id)
            .fetch_optional(pool)
            .await?;
    if board_exists.is_none() {
        return Err(AppError::NotFound("board"));
    }

    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO subscriptions (user_id, board_id, created_at) VALUES (?, ?, ?)",
    )
    .bind(user_id)
    .bind(board_id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await;

    if let Err(err) = inserted {
        if is_unique_violation(&err) {
            return Ok(false);
        }
        return Err(err.into());
    }

    sqlx::query("UPDATE boards SET num_subscribers = num_subscribers + 1 WHERE id = ?")
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn unsubscribe(pool: &SqlitePool, user_id: i64, board_id: i64) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let removed = sqlx::query("DELETE FROM subscriptions WHERE user_id = ? AND board_id = ?")
        .bind(user_id)
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

    if removed.rows_affected() == 0 {
        return Ok(false);
    }

    sqlx::query("UPDATE boards SET num_subscribers = num_subscribers - 1 WHERE id = ?")
        .bind(board_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(true)
}

pub async fn fetch_user(pool: &SqlitePool, id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("user"))
}

pub async fn fetch_board(pool: &SqlitePool, id: i64) -> Result<Board, AppError> {
    sqlx::query_as::<_, Board>("SELECT * FROM boards WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("board"))
}

pub async fn fetch_post(pool: &SqlitePool, id: i64) -> Result<Post, AppError> {
    sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("post"))
}

pub async fn fetch_comment(pool: &SqlitePool, id: i64) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound("comment"))
}
