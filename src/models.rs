use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// What a vote is attached to. Stored as lowercase text in the votes table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Post => "post",
            TargetKind::Comment => "comment",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub reputation: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Board {
    pub id: i64,
    pub title: String,
    pub num_subscribers: i64,
    pub post_count: i64,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: i64,
    pub board_id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vote_total: i64,
    pub score: f64,
    pub comment_count: i64,
    pub root_comment_count: i64,
    pub deleted: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vote_total: i64,
    pub reply_count: i64,
    pub deleted: bool,
}

/// A post as it appears in a feed page: board/author metadata joined in,
/// viewer vote direction merged after the query (0 when the viewer never
/// voted or is anonymous).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PostView {
    pub id: i64,
    pub board_id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vote_total: i64,
    pub score: f64,
    pub comment_count: i64,
    pub author_name: String,
    pub board_title: String,
    #[sqlx(default)]
    pub viewer_vote: i64,
}

/// Raw comment row with the author joined in. Converted to [`CommentView`]
/// before leaving the crate so tombstones get their fields nulled.
#[derive(Debug, Clone, FromRow)]
pub struct CommentRow {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vote_total: i64,
    pub reply_count: i64,
    pub deleted: bool,
    pub author_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: Option<i64>,
    pub author_name: Option<String>,
    pub body: Option<String>,
    pub created_at: DateTime<Utc>,
    pub vote_total: i64,
    pub reply_count: i64,
    pub deleted: bool,
    pub viewer_vote: i64,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        // Tombstones stay in the tree but carry no author or content.
        let (author_id, author_name, body) = if row.deleted {
            (None, None, None)
        } else {
            (Some(row.author_id), Some(row.author_name), row.body)
        };

        Self {
            id: row.id,
            post_id: row.post_id,
            parent_id: row.parent_id,
            author_id,
            author_name,
            body,
            created_at: row.created_at,
            vote_total: row.vote_total,
            reply_count: row.reply_count,
            deleted: row.deleted,
            viewer_vote: 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub items: Vec<PostView>,
    pub end_of_items: bool,
}

/// One node of the comment tree: the comment itself, the replies loaded so
/// far, and whether every reply is already present.
#[derive(Debug, Serialize)]
pub struct CommentNode {
    pub comment: CommentView,
    pub replies: Vec<CommentNode>,
    pub end_of_replies: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentPage {
    pub comments: Vec<CommentNode>,
    pub end_of_comments: bool,
}
