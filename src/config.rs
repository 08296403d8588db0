use std::{env, fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::pagination::{CommentSort, PostSort, TimeRange};

/// Reference point for the popularity score, fixed at deploy time so that
/// recomputing a score for the same inputs always lands on the same value.
const DEFAULT_RANK_EPOCH: &str = "1704067200";

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub page_size: i64,
    pub default_sort: String,
    pub default_comment_sort: String,
    pub default_time_range: String,
    pub reply_preview_limit: i64,
    pub rank_epoch: DateTime<Utc>,
}

impl Config {
    pub fn load() -> Self {
        Self {
            port: try_load("RUST_PORT", "1111"),
            database_url: var("DATABASE_URL").unwrap_or_else(|_| "sqlite:agora.db".to_string()),
            page_size: try_load("PAGE_SIZE", "20"),
            default_sort: try_load("DEFAULT_SORT", "hot"),
            default_comment_sort: try_load("DEFAULT_COMMENT_SORT", "top"),
            default_time_range: try_load("DEFAULT_TIME_RANGE", "all"),
            reply_preview_limit: try_load("REPLY_PREVIEW_LIMIT", "3"),
            rank_epoch: DateTime::from_timestamp(try_load("RANK_EPOCH", DEFAULT_RANK_EPOCH), 0)
                .expect("Environment misconfigured!"),
        }
    }

    pub fn post_sort(&self) -> PostSort {
        PostSort::resolve(Some(&self.default_sort), PostSort::Hot)
    }

    pub fn comment_sort(&self) -> CommentSort {
        CommentSort::resolve(Some(&self.default_comment_sort), CommentSort::Top)
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange::resolve(Some(&self.default_time_range), TimeRange::All)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 1111,
            database_url: "sqlite::memory:".to_string(),
            page_size: 20,
            default_sort: "hot".to_string(),
            default_comment_sort: "top".to_string(),
            default_time_range: "all".to_string(),
            reply_preview_limit: 3,
            rank_epoch: DateTime::from_timestamp(DEFAULT_RANK_EPOCH.parse().unwrap(), 0).unwrap(),
        }
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        warn!("Environment variable {key} not found, using default");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
