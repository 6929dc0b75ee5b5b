// src/ingest/dedup.rs
use std::collections::HashSet;

use crate::ingest::types::Item;

/// Concatenate `lists` in the order given and drop every later occurrence of
/// an `id` already seen. The first occurrence is kept as-is.
///
/// Output order is first-seen order; callers re-sort before ranking.
pub fn merge<I>(lists: I) -> Vec<Item>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = Item>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for it in list {
            if seen.insert(it.id.clone()) {
                out.push(it);
            }
        }
    }
    out
}
