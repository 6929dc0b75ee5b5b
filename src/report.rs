// src/report.rs
//! Output shape of one aggregation run.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorKind;
use crate::rank::Criterion;

/// Trimmed projection of an item for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub title: String,
    pub url: String,
    pub score: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upvote_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_comments: Option<u64>,
    pub subreddit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controversy_score: Option<f64>,
}

/// One value per criterion, serialized under the criterion's name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ByCriterion<T> {
    pub hottest: T,
    pub most_voted: T,
    pub most_commented: T,
    pub most_controversial: T,
}

impl<T> ByCriterion<T> {
    pub fn get(&self, c: Criterion) -> &T {
        match c {
            Criterion::Hottest => &self.hottest,
            Criterion::MostVoted => &self.most_voted,
            Criterion::MostCommented => &self.most_commented,
            Criterion::MostControversial => &self.most_controversial,
        }
    }

    pub fn get_mut(&mut self, c: Criterion) -> &mut T {
        match c {
            Criterion::Hottest => &mut self.hottest,
            Criterion::MostVoted => &mut self.most_voted,
            Criterion::MostCommented => &mut self.most_commented,
            Criterion::MostControversial => &mut self.most_controversial,
        }
    }
}

/// A (source, sort mode) pair that contributed nothing because its fetch failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DegradedSource {
    pub source: String,
    pub sort_mode: String,
    pub kind: ErrorKind,
    pub cause: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub pairs_attempted: usize,
    pub pairs_failed: usize,
    pub items_fetched: usize,
    pub items_kept: usize,
    pub items_combined: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub timestamp: DateTime<Utc>,
    pub time_window: String,
    pub window_seconds: u64,
    pub top_posts: ByCriterion<Option<PostSummary>>,
    pub related_posts: ByCriterion<Vec<PostSummary>>,
    pub degraded_sources: Vec<DegradedSource>,
    pub stats: RunStats,
}

impl Report {
    pub fn top(&self, c: Criterion) -> Option<&PostSummary> {
        self.top_posts.get(c).as_ref()
    }

    pub fn related(&self, c: Criterion) -> &[PostSummary] {
        self.related_posts.get(c)
    }

    /// True when no criterion produced a single post.
    pub fn is_empty(&self) -> bool {
        Criterion::ALL.iter().all(|c| self.related(*c).is_empty())
    }
}

/// Human form of a window length, e.g. `"24 hours"`.
pub fn describe_window(secs: u64) -> String {
    fn unit(n: u64, name: &str) -> String {
        if n == 1 {
            format!("1 {name}")
        } else {
            format!("{n} {name}s")
        }
    }
    if secs > 0 && secs % 3600 == 0 {
        unit(secs / 3600, "hour")
    } else if secs > 0 && secs % 60 == 0 {
        unit(secs / 60, "minute")
    } else {
        unit(secs, "second")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_descriptions() {
        assert_eq!(describe_window(86_400), "24 hours");
        assert_eq!(describe_window(3_600), "1 hour");
        assert_eq!(describe_window(5_400), "90 minutes");
        assert_eq!(describe_window(61), "61 seconds");
        assert_eq!(describe_window(0), "0 seconds");
    }

    #[test]
    fn summary_omits_absent_fields() {
        let p = PostSummary {
            title: "t".into(),
            url: "u".into(),
            score: 3,
            upvote_ratio: None,
            num_comments: Some(4),
            subreddit: "s".into(),
            controversy_score: None,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["numComments"], 4);
        assert!(v.get("upvoteRatio").is_none());
        assert!(v.get("controversyScore").is_none());
    }
}
