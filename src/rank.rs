//! Popularity score for posts.
//!
//! `sign(votes) * log10(max(|votes|, 1)) + age / 45000` where age is the
//! post's creation time in seconds relative to a fixed reference epoch.
//! Anchoring to a configured epoch instead of wall-clock now keeps relative
//! ordering reproducible for identical inputs. A unit of score is worth
//! 45000 seconds (~12.5 hours) of recency.
//!
//! The score only moves when a vote lands; nothing decays on a timer, so
//! items of equal age keep a stable relative order between votes.

use chrono::{DateTime, Utc};

const SECONDS_PER_SCORE_UNIT: f64 = 45_000.0;

pub fn popularity(vote_total: i64, created_at: DateTime<Utc>, epoch: DateTime<Utc>) -> f64 {
    let order = (vote_total.unsigned_abs().max(1) as f64).log10();
    let sign = vote_total.signum() as f64;
    let age_seconds = (created_at.timestamp() - epoch.timestamp()) as f64;

    sign * order + age_seconds / SECONDS_PER_SCORE_UNIT
}
