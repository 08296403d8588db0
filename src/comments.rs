//! Comment trees with per-branch pagination.
//!
//! A tree request without a parent returns a page of root comments, each
//! annotated with a small fixed preview of its top replies so the client
//! can expand without a second round trip. A request with a parent
//! paginates strictly inside that comment's children ("load more replies").
//! Both levels go through the same paginator rules as the post feed.
//!
//! Tombstoned comments are structurally present at every level: their
//! descendants stay reachable, only author and content are nulled.

use std::collections::HashMap;

use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::{
    config::Config,
    error::AppError,
    models::{CommentNode, CommentPage, CommentRow, CommentView, TargetKind},
    pagination::{self, CommentSort, Cursor},
    votes::vote_directions,
};

#[derive(Debug, Default, Deserialize)]
pub struct CommentParams {
    pub sort: Option<String>,
    pub offset: Option<String>,
    pub after: Option<String>,
    pub parent: Option<i64>,
}

pub async fn get_comment_tree(
    pool: &SqlitePool,
    config: &Config,
    post_id: i64,
    params: &CommentParams,
    viewer_id: Option<i64>,
) -> Result<CommentPage, AppError> {
    let post_deleted: Option<bool> = sqlx::query_scalar("SELECT deleted FROM posts WHERE id = ?")
        .bind(post_id)
        .fetch_optional(pool)
        .await?;
    match post_deleted {
        None | Some(true) => return Err(AppError::NotFound("post")),
        Some(false) => {}
    }

    if let Some(parent_id) = params.parent {
        let parent_post: Option<i64> =
            sqlx::query_scalar("SELECT post_id FROM comments WHERE id = ?")
                .bind(parent_id)
                .fetch_optional(pool)
                .await?;

        match parent_post {
            None => return Err(AppError::NotFound("comment")),
            Some(other) if other != post_id => {
                return Err(AppError::InvalidInput(format!(
                    "comment {parent_id} does not belong to post {post_id}"
                )));
            }
            Some(_) => {}
        }
    }

    let sort = CommentSort::resolve(params.sort.as_deref(), config.comment_sort());
    let cursor = Cursor::parse(params.offset.as_deref(), params.after.as_deref());
    let window = pagination::window(sort.chronological(), cursor, config.page_size);

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT c.id, c.post_id, c.parent_id, c.author_id, c.body, c.created_at, \
         c.vote_total, c.reply_count, c.deleted, u.username AS author_name \
         FROM comments c \
         JOIN users u ON u.id = c.author_id \
         WHERE ",
    );

    match params.parent {
        Some(parent_id) => {
            query_builder.push("c.parent_id = ");
            query_builder.push_bind(parent_id);
        }
        None => {
            query_builder.push("c.post_id = ");
            query_builder.push_bind(post_id);
            query_builder.push(" AND c.parent_id IS NULL");
        }
    }

    if let Some(last_seen) = window.last_seen {
        query_builder.push(" AND c.id < ");
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

    let rows: Vec<CommentRow> = query_builder.build_query_as().fetch_all(pool).await?;
    let (page_rows, end_of_comments) = pagination::trim_page(rows, config.page_size as usize);

    let mut views: Vec<CommentView> = page_rows.into_iter().map(CommentView::from).collect();

    // Root pages carry reply previews; load-more pages are a single level.
    let mut previews: HashMap<i64, Vec<CommentView>> = if params.parent.is_none() {
        let parent_ids: Vec<i64> = views.iter().map(|view| view.id).collect();
        fetch_reply_previews(pool, &parent_ids, config.reply_preview_limit).await?
    } else {
        HashMap::new()
    };

    if let Some(viewer_id) = viewer_id {
        let mut ids: Vec<i64> = views.iter().map(|view| view.id).collect();
        ids.extend(previews.values().flatten().map(|view| view.id));

        let directions = vote_directions(pool, viewer_id, TargetKind::Comment, &ids).await?;

        for view in views.iter_mut().chain(previews.values_mut().flatten()) {
            view.viewer_vote = directions.get(&view.id).copied().unwrap_or(0);
        }
    }

    let comments = views
        .into_iter()
        .map(|view| {
            let reply_views = previews.remove(&view.id).unwrap_or_default();
            into_node(view, reply_views)
        })
        .collect();

    Ok(CommentPage { comments, end_of_comments })
}

/// Top replies for each of `parent_ids`, bounded per parent, in one query.
async fn fetch_reply_previews(
    pool: &SqlitePool,
    parent_ids: &[i64],
    preview_limit: i64,
) -> Result<HashMap<i64, Vec<CommentView>>, AppError> {
    if parent_ids.is_empty() || preview_limit <= 0 {
        return Ok(HashMap::new());
    }

    let mut query_builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, post_id, parent_id, author_id, body, created_at, \
         vote_total, reply_count, deleted, author_name FROM ( \
         SELECT c.id, c.post_id, c.parent_id, c.author_id, c.body, c.created_at, \
         c.vote_total, c.reply_count, c.deleted, u.username AS author_name, \
         ROW_NUMBER() OVER (PARTITION BY c.parent_id ORDER BY c.vote_total DESC, c.id DESC) AS rank \
         FROM comments c \
         JOIN users u ON u.id = c.author_id \
         WHERE c.parent_id IN (",
    );
    {
        let mut separated = query_builder.separated(", ");
        for parent_id in parent_ids {
            separated.push_bind(*parent_id);
        }
    }
    query_builder.push(")) WHERE rank <= ");
    query_builder.push_bind(preview_limit);
    query_builder.push(" ORDER BY parent_id, rank");

    let rows: Vec<CommentRow> = query_builder.build_query_as().fetch_all(pool).await?;

    let mut previews: HashMap<i64, Vec<CommentView>> = HashMap::new();
    for row in rows {
        let Some(parent_id) = row.parent_id else { continue };
        previews.entry(parent_id).or_default().push(row.into());
    }

    Ok(previews)
}

fn into_node(view: CommentView, reply_views: Vec<CommentView>) -> CommentNode {
    // Every reply is present once the loaded count reaches the counter;
    // with nothing loaded this collapses to "no replies exist".
    let end_of_replies = reply_views.len() as i64 >= view.reply_count;

    let replies = reply_views
        .into_iter()
        .map(|reply| {
            let end = reply.reply_count == 0;
            CommentNode {
                comment: reply,
                replies: Vec::new(),
                end_of_replies: end,
            }
        })
        .collect();

    CommentNode {
        comment: view,
        replies,
        end_of_replies,
    }
}
