use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::HeaderMap,
};
use serde::Deserialize;

use crate::{
    comments::{CommentParams, get_comment_tree},
    error::AppError,
    feed::{FeedParams, get_feed},
    models::{CommentPage, FeedPage, TargetKind},
    state::AppState,
    votes::{VoteOutcome, apply_vote},
};

/// Identity is resolved upstream by the auth layer, which forwards the
/// authenticated user id in a trusted header. Absent or garbled means
/// anonymous.
fn viewer_from(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.parse::<i64>().ok())
}

pub async fn feed_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeedParams>,
    headers: HeaderMap,
) -> Result<Json<FeedPage>, AppError> {
    let viewer_id = viewer_from(&headers);
    let page = get_feed(&state.pool, &state.config, &params, viewer_id).await?;

    Ok(Json(page))
}

pub async fn comments_handler(
    State(state): State<Arc<AppState>>,
    Path(post_id): Path<i64>,
    Query(params): Query<CommentParams>,
    headers: HeaderMap,
) -> Result<Json<CommentPage>, AppError> {
    let viewer_id = viewer_from(&headers);
    let page = get_comment_tree(&state.pool, &state.config, post_id, &params, viewer_id).await?;

    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub target_type: TargetKind,
    pub target_id: i64,
    pub direction: i64,
}

pub async fn vote_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>, AppError> {
    let voter_id = viewer_from(&headers).ok_or(AppError::Unauthenticated)?;

    let outcome = apply_vote(
        &state.pool,
        state.config.rank_epoch,
        voter_id,
        payload.target_type,
        payload.target_id,
        payload.direction,
    )
    .await?;

    Ok(Json(outcome))
}
