//! Sort/time filter resolution and page windowing.
//!
//! Filters arrive as free-form strings; anything unrecognized falls back to
//! the configured default instead of erroring, so feed browsing never breaks
//! on a stale or mistyped query. Pages are fetched one row past the page
//! size, and the extra row's presence decides `end_of_items` without a
//! second count query.
//!
//! Chronological ordering paginates by id (`id < last_seen`, exclusive)
//! rather than offset: ids are assigned monotonically with creation, so the
//! boundary stays put while new rows arrive. Every other ordering uses
//! offset windows, which can skip or duplicate rows when the ranking shifts
//! between fetches; that drift is accepted.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostSort {
    Hot,
    New,
    Top,
}

impl PostSort {
    pub fn resolve(raw: Option<&str>, default: PostSort) -> PostSort {
        match raw {
            Some("hot") => PostSort::Hot,
            Some("new") => PostSort::New,
            Some("top") => PostSort::Top,
            _ => default,
        }
    }

    /// ORDER BY clause for feed queries, which alias the posts table as `p`.
    /// Ties break on descending id so repeated identical queries never
    /// reorder.
    pub fn order_sql(self) -> &'static str {
        match self {
            PostSort::Hot => "p.score DESC, p.id DESC",
            PostSort::New => "p.id DESC",
            PostSort::Top => "p.vote_total DESC, p.id DESC",
        }
    }

    pub fn chronological(self) -> bool {
        matches!(self, PostSort::New)
    }
}

/// Comments rank on the raw vote total; there is no decayed score at the
/// comment level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSort {
    Top,
    New,
}

impl CommentSort {
    pub fn resolve(raw: Option<&str>, default: CommentSort) -> CommentSort {
        match raw {
            Some("top") => CommentSort::Top,
            Some("new") => CommentSort::New,
            _ => default,
        }
    }

    /// ORDER BY clause for comment queries, which alias the comments table
    /// as `c`.
    pub fn order_sql(self) -> &'static str {
        match self {
            CommentSort::Top => "c.vote_total DESC, c.id DESC",
            CommentSort::New => "c.id DESC",
        }
    }

    pub fn chronological(self) -> bool {
        matches!(self, CommentSort::New)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeRange {
    pub fn resolve(raw: Option<&str>, default: TimeRange) -> TimeRange {
        match raw {
            Some("hour") => TimeRange::Hour,
            Some("day") => TimeRange::Day,
            Some("week") => TimeRange::Week,
            Some("month") => TimeRange::Month,
            Some("year") => TimeRange::Year,
            Some("all") => TimeRange::All,
            _ => default,
        }
    }

    /// Oldest creation time admitted into the window, or `None` for no
    /// restriction.
    pub fn floor(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let span = match self {
            TimeRange::Hour => Duration::hours(1),
            TimeRange::Day => Duration::days(1),
            TimeRange::Week => Duration::weeks(1),
            TimeRange::Month => Duration::days(30),
            TimeRange::Year => Duration::days(365),
            TimeRange::All => return None,
        };
        Some(now - span)
    }
}

/// Pagination position as supplied by the client. Both fields parse
/// leniently: garbage degrades to the first page rather than failing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub offset: i64,
    pub last_seen: Option<i64>,
}

impl Cursor {
    pub fn parse(offset: Option<&str>, after: Option<&str>) -> Cursor {
        Cursor {
            offset: offset
                .and_then(|raw| raw.parse::<i64>().ok())
                .filter(|n| *n >= 0)
                .unwrap_or(0),
            last_seen: after
                .and_then(|raw| raw.parse::<i64>().ok())
                .filter(|n| *n > 0),
        }
    }
}

/// Resolved query window: either an id keyset boundary or a plain offset,
/// never both. `limit` already includes the one-row lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub last_seen: Option<i64>,
    pub offset: i64,
    pub limit: i64,
}

/// Id-keyset pagination applies only when the ordering is chronological and
/// the client supplied a boundary; the offset is ignored on that path.
pub fn window(chronological: bool, cursor: Cursor, page_size: i64) -> Window {
    match cursor.last_seen {
        Some(last_seen) if chronological => Window {
            last_seen: Some(last_seen),
            offset: 0,
            limit: page_size + 1,
        },
        _ => Window {
            last_seen: None,
            offset: cursor.offset,
            limit: page_size + 1,
        },
    }
}

/// Strip the lookahead row. Returns the page and whether the result set is
/// exhausted.
pub fn trim_page<T>(mut rows: Vec<T>, page_size: usize) -> (Vec<T>, bool) {
    if rows.len() > page_size {
        rows.truncate(page_size);
        (rows, false)
    } else {
        (rows, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_sort_falls_back_to_default() {
        assert_eq!(PostSort::resolve(Some("hot"), PostSort::New), PostSort::Hot);
        assert_eq!(PostSort::resolve(Some("rising"), PostSort::Hot), PostSort::Hot);
        assert_eq!(PostSort::resolve(None, PostSort::Top), PostSort::Top);
        assert_eq!(
            CommentSort::resolve(Some("hot"), CommentSort::Top),
            CommentSort::Top
        );
    }

    #[test]
    fn unknown_time_range_falls_back_to_default() {
        assert_eq!(TimeRange::resolve(Some("week"), TimeRange::All), TimeRange::Week);
        assert_eq!(TimeRange::resolve(Some("decade"), TimeRange::All), TimeRange::All);
        assert_eq!(TimeRange::resolve(None, TimeRange::Day), TimeRange::Day);
    }

    #[test]
    fn all_time_has_no_floor() {
        assert_eq!(TimeRange::All.floor(Utc::now()), None);
        assert!(TimeRange::Hour.floor(Utc::now()).is_some());
    }

    #[test]
    fn cursor_parses_leniently() {
        assert_eq!(
            Cursor::parse(Some("40"), None),
            Cursor { offset: 40, last_seen: None }
        );
        assert_eq!(
            Cursor::parse(None, Some("128")),
            Cursor { offset: 0, last_seen: Some(128) }
        );
        // Garbage and negatives degrade to the first page.
        assert_eq!(Cursor::parse(Some("banana"), Some("-5")), Cursor::default());
        assert_eq!(Cursor::parse(Some("-1"), Some("0")), Cursor::default());
        assert_eq!(Cursor::parse(None, None), Cursor::default());
    }

    #[test]
    fn keyset_applies_only_to_chronological_order() {
        let cursor = Cursor { offset: 40, last_seen: Some(99) };

        let keyset = window(true, cursor, 20);
        assert_eq!(keyset.last_seen, Some(99));
        assert_eq!(keyset.offset, 0);
        assert_eq!(keyset.limit, 21);

        let offset = window(false, cursor, 20);
        assert_eq!(offset.last_seen, None);
        assert_eq!(offset.offset, 40);
        assert_eq!(offset.limit, 21);
    }

    #[test]
    fn trim_detects_end_of_items() {
        let (page, end) = trim_page(vec![1, 2, 3], 2);
        assert_eq!(page, vec![1, 2]);
        assert!(!end);

        let (page, end) = trim_page(vec![1, 2], 2);
        assert_eq!(page, vec![1, 2]);
        assert!(end);

        let (page, end) = trim_page(Vec::<i32>::new(), 2);
        assert!(page.is_empty());
        assert!(end);
    }
}
