//! # Vote ledger
//!
//! One row per (voter, target kind, target id); absence of a row is the
//! neutral state, a direction of 0 is never stored. Clicking the same
//! direction twice is the undo gesture.
//!
//! | stored | requested | action | Δ total |
//! |--------|-----------|--------|---------|
//! | none   | +1 / −1   | insert | ±1      |
//! | d      | d         | delete | −d      |
//! | d      | −d        | update | −2d     |
//! | d      | 0         | delete | −d      |
//! | none   | 0         | no-op  | 0       |
//!
//! Applying a vote mutates the row, the target's vote total, and the
//! author's reputation in one transaction, with the counters moved by
//! relative updates. Votes from different voters commute; two in-flight
//! votes from the *same* voter are caught by the primary key (insert) or a
//! stored-direction guard (update/delete) and retried once from a fresh
//! read before surfacing as a conflict.
//!
//! A post's score is rewritten after the vote lands, from a re-read of the
//! just-updated total so a slow recompute can never revert a fresher value.
//! Score rewrite failure is logged and swallowed: the count is the source
//! of truth, rank freshness is best effort.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::warn;

use crate::{
    database::is_unique_violation,
    error::AppError,
    models::TargetKind,
    rank::popularity,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteAction {
    Insert(i64),
    Update(i64),
    Remove,
}

/// Pure transition from (stored direction, requested direction) to the
/// ledger action and the resulting change in the target's vote total.
/// `None` action means nothing to do (undo with no stored vote).
pub fn transition(
    stored: Option<i64>,
    requested: i64,
) -> Result<(Option<VoteAction>, i64), AppError> {
    if !matches!(requested, -1 | 0 | 1) {
        return Err(AppError::InvalidInput(format!(
            "vote direction must be -1, 0 or 1, got {requested}"
        )));
    }

    Ok(match (stored, requested) {
        (None, 0) => (None, 0),
        (None, requested) => (Some(VoteAction::Insert(requested)), requested),
        (Some(stored), 0) => (Some(VoteAction::Remove), -stored),
        (Some(stored), requested) if stored == requested => (Some(VoteAction::Remove), -stored),
        (Some(stored), requested) => (Some(VoteAction::Update(requested)), requested - stored),
    })
}

/// Net change applied to the target's vote total and the direction now on
/// record, for the caller to patch optimistic client state.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VoteOutcome {
    pub delta: i64,
    pub direction: i64,
}

pub async fn apply_vote(
    pool: &SqlitePool,
    rank_epoch: DateTime<Utc>,
    voter_id: i64,
    kind: TargetKind,
    target_id: i64,
    requested: i64,
) -> Result<VoteOutcome, AppError> {
    let author_id = target_author(pool, kind, target_id).await?;

    for attempt in 0..2 {
        if attempt > 0 {
            warn!(
                "Retrying vote by user {voter_id} on {} {target_id} after a concurrent write",
                kind.as_str()
            );
        }

        match try_apply(pool, voter_id, kind, target_id, author_id, requested).await? {
            Some(outcome) => {
                if kind == TargetKind::Post && outcome.delta != 0 {
                    refresh_post_score(pool, rank_epoch, target_id).await;
                }
                return Ok(outcome);
            }
            // Stale read of the stored direction; take a fresh one.
            None => continue,
        }
    }

    Err(AppError::Conflict("concurrent vote on the same target"))
}

/// One attempt at the read-decide-write sequence. Returns `None` when the
/// stored direction moved underneath us and the whole attempt was rolled
/// back.
async fn try_apply(
    pool: &SqlitePool,
    voter_id: i64,
    kind: TargetKind,
    target_id: i64,
    author_id: i64,
    requested: i64,
) -> Result<Option<VoteOutcome>, AppError> {
    let mut tx = pool.begin().await?;

    let stored: Option<i64> = sqlx::query_scalar(
        "SELECT direction FROM votes WHERE voter_id = ? AND target_type = ? AND target_id = ?",
    )
    .bind(voter_id)
    .bind(kind.as_str())
    .bind(target_id)
    .fetch_optional(&mut *tx)
    .await?;

    let (action, delta) = transition(stored, requested)?;

    let direction = match action {
        Some(VoteAction::Insert(d)) | Some(VoteAction::Update(d)) => d,
        Some(VoteAction::Remove) | None => 0,
    };

    match action {
        None => return Ok(Some(VoteOutcome { delta: 0, direction: 0 })),
        Some(VoteAction::Insert(d)) => {
            let inserted = sqlx::query(
                "INSERT INTO votes (voter_id, target_type, target_id, direction, created_at) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(voter_id)
            .bind(kind.as_str())
            .bind(target_id)
            .bind(d)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await;

            if let Err(err) = inserted {
                if is_unique_violation(&err) {
                    return Ok(None);
                }
                return Err(err.into());
            }
        }
        Some(VoteAction::Update(d)) => {
            // The stored-direction guard turns a lost-update race into an
            // affected-row count of zero.
            let updated = sqlx::query(
                "UPDATE votes SET direction = ? \
                 WHERE voter_id = ? AND target_type = ? AND target_id = ? AND direction = ?",
            )
            .bind(d)
            .bind(voter_id)
            .bind(kind.as_str())
            .bind(target_id)
            .bind(stored)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Ok(None);
            }
        }
        Some(VoteAction::Remove) => {
            let removed = sqlx::query(
                "DELETE FROM votes \
                 WHERE voter_id = ? AND target_type = ? AND target_id = ? AND direction = ?",
            )
            .bind(voter_id)
            .bind(kind.as_str())
            .bind(target_id)
            .bind(stored)
            .execute(&mut *tx)
            .await?;

            if removed.rows_affected() == 0 {
                return Ok(None);
            }
        }
    }

    let total_update = match kind {
        TargetKind::Post => "UPDATE posts SET vote_total = vote_total + ? WHERE id = ?",
        TargetKind::Comment => "UPDATE comments SET vote_total = vote_total + ? WHERE id = ?",
    };
    sqlx::query(total_update)
        .bind(delta)
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("UPDATE users SET reputation = reputation + ? WHERE id = ?")
        .bind(delta)
        .bind(author_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Some(VoteOutcome { delta, direction }))
}

async fn target_author(
    pool: &SqlitePool,
    kind: TargetKind,
    target_id: i64,
) -> Result<i64, AppError> {
    let sql = match kind {
        TargetKind::Post => "SELECT author_id FROM posts WHERE id = ? AND deleted = 0",
        TargetKind::Comment => "SELECT author_id FROM comments WHERE id = ? AND deleted = 0",
    };

    sqlx::query_scalar::<_, i64>(sql)
        .bind(target_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::NotFound(kind.as_str()))
}

/// Rewrite a post's score from a fresh read of its vote total. Best effort:
/// the vote has already committed, so failure here only leaves the rank
/// briefly stale.
pub async fn refresh_post_score(pool: &SqlitePool, rank_epoch: DateTime<Utc>, post_id: i64) {
    if let Err(err) = try_refresh(pool, rank_epoch, post_id).await {
        warn!("Failed to refresh score for post {post_id}: {err}");
    }
}

async fn try_refresh(
    pool: &SqlitePool,
    rank_epoch: DateTime<Utc>,
    post_id: i64,
) -> Result<(), sqlx::Error> {
    let row: Option<(i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT vote_total, created_at FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_optional(pool)
            .await?;

    if let Some((vote_total, created_at)) = row {
        sqlx::query("UPDATE posts SET score = ? WHERE id = ?")
            .bind(popularity(vote_total, created_at, rank_epoch))
            .bind(post_id)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// The viewer's stored direction for each of `ids`, in a single lookup.
/// Targets the viewer never voted on are simply absent from the map.
pub async fn vote_directions(
    pool: &SqlitePool,
    voter_id: i64,
    kind: TargetKind,
    ids: &[i64],
) -> Result<HashMap<i64, i64>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query_builder =
        QueryBuilder::<Sqlite>::new("SELECT target_id, direction FROM votes WHERE voter_id = ");
    query_builder.push_bind(voter_id);
    query_builder.push(" AND target_type = ");
    query_builder.push_bind(kind.as_str());
    query_builder.push(" AND target_id IN (");
    {
        let mut separated = query_builder.separated(", ");
        for id in ids {
            separated.push_bind(*id);
        }
    }
    query_builder.push(")");

    let rows: Vec<(i64, i64)> = query_builder.build_query_as().fetch_all(pool).await?;

    Ok(rows.into_iter().collect())
}
