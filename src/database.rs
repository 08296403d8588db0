//! # SQLite
//!
//! All persistent state lives here: boards, posts, comments, the vote
//! ledger, and subscriptions.
//!
//! ## Requirements
//!
//! - Ordered, filterable feed queries (score / creation / vote total) with
//!   offset and id-keyset windows
//! - Atomic relative counter updates (`SET x = x + ?`) so concurrent voters
//!   never clobber each other
//! - At most one vote row per (voter, target kind, target id), enforced by
//!   the primary key; a duplicate insert from the same voter surfaces as a
//!   unique violation and is retried by the ledger
//!
//! ## Implementation
//!
//! - `AUTOINCREMENT` keeps ids monotonic with creation order, which is what
//!   makes id-keyset pagination equivalent to chronological pagination
//! - Deletion is a tombstone flag everywhere; rows are never removed
//! - Counters (`post_count`, `comment_count`, `reply_count`,
//!   `num_subscribers`, `reputation`) are denormalized and moved only by
//!   relative updates alongside the write that changes them

use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    reputation  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS boards (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    title           TEXT NOT NULL UNIQUE,
    num_subscribers INTEGER NOT NULL DEFAULT 0,
    post_count      INTEGER NOT NULL DEFAULT 0,
    deleted         INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    board_id           INTEGER NOT NULL REFERENCES boards(id),
    author_id          INTEGER NOT NULL REFERENCES users(id),
    title              TEXT NOT NULL,
    body               TEXT,
    created_at         TEXT NOT NULL,
    vote_total         INTEGER NOT NULL DEFAULT 0,
    score              REAL NOT NULL DEFAULT 0,
    comment_count      INTEGER NOT NULL DEFAULT 0,
    root_comment_count INTEGER NOT NULL DEFAULT 0,
    deleted            INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_posts_board_score ON posts(board_id, deleted, score DESC);
CREATE INDEX IF NOT EXISTS idx_posts_board_votes ON posts(board_id, deleted, vote_total DESC);

CREATE TABLE IF NOT EXISTS comments (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id     INTEGER NOT NULL REFERENCES posts(id),
    parent_id   INTEGER REFERENCES comments(id),
    author_id   INTEGER NOT NULL REFERENCES users(id),
    body        TEXT,
    created_at  TEXT NOT NULL,
    vote_total  INTEGER NOT NULL DEFAULT 0,
    reply_count INTEGER NOT NULL DEFAULT 0,
    deleted     INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_comments_post_parent ON comments(post_id, parent_id);
CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

CREATE TABLE IF NOT EXISTS votes (
    voter_id    INTEGER NOT NULL REFERENCES users(id),
    target_type TEXT NOT NULL,
    target_id   INTEGER NOT NULL,
    direction   INTEGER NOT NULL,
    created_at  TEXT NOT NULL,
    PRIMARY KEY (voter_id, target_type, target_id)
);

CREATE TABLE IF NOT EXISTS subscriptions (
    user_id    INTEGER NOT NULL REFERENCES users(id),
    board_id   INTEGER NOT NULL REFERENCES boards(id),
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, board_id)
);
"#;

pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    // A `:memory:` database exists per connection, so the pool must not
    // fan out or each connection would see an empty schema.
    let max_connections = if database_url.contains(":memory:") { 1 } else { 8 };

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::raw_sql(SCHEMA).execute(&pool).await?;

    Ok(pool)
}

/// Same-voter duplicate inserts and subscription replays land here.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
