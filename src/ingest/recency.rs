// src/ingest/recency.rs
use crate::ingest::types::Item;

/// Default recency window: 24 hours.
pub const DEFAULT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// Keep items created within `window_secs` of `now` (inclusive boundary).
/// Items stamped in the future are kept; their age is negative.
pub fn filter_recent(items: Vec<Item>, window_secs: u64, now: i64) -> Vec<Item> {
    let window = i64::try_from(window_secs).unwrap_or(i64::MAX);
    items
        .into_iter()
        .filter(|it| now.saturating_sub(it.created_at) <= window)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str, created_at: i64) -> Item {
        Item {
            id: id.into(),
            title: id.into(),
            source_name: "test".into(),
            created_at,
            popularity: 1,
            approval_ratio: 1.0,
            discussion_count: 0,
            permalink: String::new(),
            author: String::new(),
        }
    }

    #[test]
    fn boundary_is_inclusive() {
        let now = 1_700_000_000;
        let w = DEFAULT_WINDOW_SECS;
        let items = vec![
            at("edge", now - w as i64),
            at("stale", now - w as i64 - 1),
            at("fresh", now - 10),
        ];
        let kept = filter_recent(items, w, now);
        let ids: Vec<_> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["edge", "fresh"]);
    }

    #[test]
    fn future_items_are_kept_and_order_preserved() {
        let now = 1_000;
        let items = vec![at("b", now + 500), at("a", now), at("c", now - 1)];
        let kept = filter_recent(items, 60, now);
        let ids: Vec<_> = kept.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
