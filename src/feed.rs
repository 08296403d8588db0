//! Paginated post feeds, board-scoped or global.
//!
//! Deleted posts never leave the query; the viewer's vote directions are
//! merged in with one batched lookup after the page is cut.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    config::Config,
    error::AppError,
    models::{FeedPage, PostView, TargetKind},
    pagination::{self, Cursor, PostSort, TimeRange},
    votes::vote_directions,
};

#[derive(Debug, Default, Deserialize)]
pub struct FeedParams {
    pub board: Option<i64>,
    pub sort: Option<String>,
    pub t: Option<String>,
    pub offset: Option<String>,
    pub after: Option<String>,
}

pub async fn get_feed(
    pool: &SqlitePool,
    config: &Config,
    params: &FeedParams,
    viewer_id: Option<i64>,
) -> Result<FeedPage, AppError> {
    let sort = PostSort::resolve(params.sort.as_deref(), config.post_sort());
    let range = TimeRange::resolve(params.t.as_deref(), config.time_range());
    let cursor = Cursor::parse(params.offset.as_deref(), params.after.as_deref());
    let window = pagination::window(sort.chronological(), cursor, config.page_size);

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT p.id, p.board_id, p.author_id, p.title, p.body, p.created_at, \
         p.vote_total, p.score, p.comment_count, \
         u.username AS author_name, b.title AS board_title \
         FROM posts p \
         JOIN users u ON u.id = p.author_id \
         JOIN boards b ON b.id = p.board_id \
         WHERE p.deleted = 0",
    );

    if let Some(board_id) = params.board {
        query_builder.push(" AND p.board_id = ");
        query_builder.push_bind(board_id);
    }

    if let Some(floor) = range.floor(Utc::now()) {
        query_builder.push(" AND p.created_at >= ");
        query_builder.push_bind(floor);
    }

    if let Some(last_seen) = window.last_seen {
        query_builder.push(" AND p.id < ");
        query_builder.push_bind(last_seen);
    }

    query_builder.push(" ORDER BY ");
    query_builder.push(sort.order_sql());
    query_builder.push(" LIMIT ");
    query_builder.push_bind(window.limit);

    if window.offset > 0 {
        query_builder.push(" OFFSET ");
        query_builder.push_bind(window.offset);
    }

    let rows: Vec<PostView> = query_builder.build_query_as().fetch_all(pool).await?;
    let (mut items, end_of_items) = pagination::trim_page(rows, config.page_size as usize);

    if let Some(viewer_id) = viewer_id {
        let ids: Vec<i64> = items.iter().map(|post| post.id).collect();
        let directions = vote_directions(pool, viewer_id, TargetKind::Post, &ids).await?;

        for item in &mut items {
            item.viewer_vote = directions.get(&item.id).copied().unwrap_or(0);
        }
    }

    Ok(FeedPage { items, end_of_items })
}
