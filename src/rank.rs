// src/rank.rs
//! # Ranking
//! Four fixed criteria, each bound to the pool it ranks and to a numeric key.
//! Sorting is stable, so exact ties keep the pool's (configuration-derived)
//! order and repeated runs over the same data give the same result.

use crate::ingest::types::{Item, SortKind};
use crate::report::PostSummary;

/// Default number of related posts returned per criterion.
pub const DEFAULT_TOP_N: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criterion {
    Hottest,
    MostVoted,
    MostCommented,
    MostControversial,
}

/// Which collection of items a criterion ranks over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pool {
    /// Every source's items fetched under one sort kind.
    Mode(SortKind),
    /// All items across modes, deduplicated by id.
    Combined,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::Hottest,
        Criterion::MostVoted,
        Criterion::MostCommented,
        Criterion::MostControversial,
    ];

    pub fn pool(&self) -> Pool {
        match self {
            Criterion::Hottest => Pool::Mode(SortKind::Hot),
            Criterion::MostVoted => Pool::Mode(SortKind::Top),
            // discussion volume doesn't depend on how the item was found
            Criterion::MostCommented => Pool::Combined,
            Criterion::MostControversial => Pool::Mode(SortKind::Controversial),
        }
    }

    /// Ranking key; larger is better.
    pub fn key(&self, it: &Item) -> f64 {
        match self {
            Criterion::Hottest => it.popularity as f64 * it.approval_ratio,
            Criterion::MostVoted => it.popularity as f64,
            Criterion::MostCommented => it.discussion_count as f64,
            Criterion::MostControversial => it.controversy_score(),
        }
    }

    /// Display projection with the fields relevant to this criterion.
    pub fn project(&self, it: &Item) -> PostSummary {
        let mut p = PostSummary {
            title: it.title.clone(),
            url: it.permalink.clone(),
            score: it.popularity,
            upvote_ratio: None,
            num_comments: None,
            subreddit: it.source_name.clone(),
            controversy_score: None,
        };
        match self {
            Criterion::Hottest | Criterion::MostVoted => {
                p.upvote_ratio = Some(it.approval_ratio);
                p.num_comments = Some(it.discussion_count);
            }
            Criterion::MostCommented => {
                p.num_comments = Some(it.discussion_count);
            }
            Criterion::MostControversial => {
                p.upvote_ratio = Some(it.approval_ratio);
                p.controversy_score = Some(it.controversy_score());
            }
        }
        p
    }

    /// Report key for this criterion.
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Hottest => "hottest",
            Criterion::MostVoted => "mostVoted",
            Criterion::MostCommented => "mostCommented",
            Criterion::MostControversial => "mostControversial",
        }
    }
}

/// Sort `pool` best-first under `criterion`. Stable on equal keys.
pub fn rank(mut pool: Vec<Item>, criterion: Criterion) -> Vec<Item> {
    pool.sort_by(|a, b| criterion.key(b).total_cmp(&criterion.key(a)));
    pool
}

/// Prefix take; returns fewer than `n` when the pool is short.
pub fn top_n(ranked: &[Item], n: usize) -> &[Item] {
    &ranked[..n.min(ranked.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk(id: &str, popularity: i64, ratio: f64, comments: u64) -> Item {
        Item {
            id: id.into(),
            title: id.into(),
            source_name: "sub".into(),
            created_at: 0,
            popularity,
            approval_ratio: ratio,
            discussion_count: comments,
            permalink: format!("https://www.reddit.com/r/sub/comments/{id}/"),
            author: String::new(),
        }
    }

    fn ids(v: &[Item]) -> Vec<&str> {
        v.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn hottest_weighs_votes_by_ratio() {
        let pool = vec![mk("a", 100, 0.5, 0), mk("b", 80, 0.9, 0), mk("c", 10, 1.0, 0)];
        assert_eq!(ids(&rank(pool, Criterion::Hottest)), vec!["b", "a", "c"]);
    }

    #[test]
    fn most_voted_and_most_commented() {
        let pool = vec![mk("a", 5, 1.0, 90), mk("b", 50, 1.0, 3), mk("c", -4, 0.2, 10)];
        assert_eq!(
            ids(&rank(pool.clone(), Criterion::MostVoted)),
            vec!["b", "a", "c"]
        );
        assert_eq!(
            ids(&rank(pool, Criterion::MostCommented)),
            vec!["a", "c", "b"]
        );
    }

    #[test]
    fn controversy_ranks_divisive_above_unanimous() {
        let pool = vec![mk("unanimous", 100, 1.0, 0), mk("split", 100, 0.5, 0)];
        let ranked = rank(pool, Criterion::MostControversial);
        assert_eq!(ids(&ranked), vec!["split", "unanimous"]);
        assert_eq!(Criterion::MostControversial.key(&ranked[0]), 50.0);
        assert_eq!(Criterion::MostControversial.key(&ranked[1]), 0.0);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let pool = vec![
            mk("first", 10, 1.0, 0),
            mk("big", 20, 1.0, 0),
            mk("second", 10, 1.0, 0),
            mk("third", 10, 1.0, 0),
        ];
        assert_eq!(
            ids(&rank(pool, Criterion::MostVoted)),
            vec!["big", "first", "second", "third"]
        );
    }

    #[test]
    fn top_n_truncates_without_padding() {
        let ranked = vec![mk("a", 2, 1.0, 0), mk("b", 1, 1.0, 0)];
        assert_eq!(top_n(&ranked, 3).len(), 2);
        assert_eq!(top_n(&ranked, 1).len(), 1);
        assert!(top_n(&[], 3).is_empty());
    }

    #[test]
    fn projection_fields_follow_criterion() {
        let it = mk("a", 100, 0.5, 7);
        let p = Criterion::MostCommented.project(&it);
        assert_eq!(p.num_comments, Some(7));
        assert!(p.upvote_ratio.is_none() && p.controversy_score.is_none());

        let p = Criterion::MostControversial.project(&it);
        assert_eq!(p.controversy_score, Some(50.0));
        assert!(p.num_comments.is_none());
    }
}
