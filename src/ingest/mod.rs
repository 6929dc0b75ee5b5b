// src/ingest/mod.rs
//! Everything that happens to items before ranking: fetching, recency
//! windowing and identity dedup.

pub mod dedup;
pub mod providers;
pub mod recency;
pub mod types;

pub use dedup::merge;
pub use recency::{filter_recent, DEFAULT_WINDOW_SECS};
pub use types::{FetchRequest, Item, SortKind, SortMode, SourceFetcher, TimeRange};
