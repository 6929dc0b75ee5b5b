// tests/common/mod.rs
//! Scripted in-process fetcher shared by integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use trend_aggregator::config::SourceSpec;
use trend_aggregator::error::FetchError;
use trend_aggregator::ingest::types::{FetchRequest, Item, SortMode, SourceFetcher};
use trend_aggregator::AggregateConfig;

pub const NOW: i64 = 1_700_000_000;

#[derive(Clone)]
pub enum Scripted {
    Items(Vec<Item>),
    Fail,
    Malformed,
    Hang,
}

/// Answers each (source, sort) pair from a script, after an optional delay.
#[derive(Default)]
pub struct ScriptedFetcher {
    script: HashMap<(String, String), (Scripted, Duration)>,
    pub calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, source: &str, sort: &str, answer: Scripted) -> Self {
        self.script
            .insert((source.into(), sort.into()), (answer, Duration::ZERO));
        self
    }

    pub fn on_after(mut self, source: &str, sort: &str, delay_ms: u64, answer: Scripted) -> Self {
        self.script.insert(
            (source.into(), sort.into()),
            (answer, Duration::from_millis(delay_ms)),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceFetcher for ScriptedFetcher {
    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<Item>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let key = (req.source.to_string(), req.sort.to_string());
        let (answer, delay) = self
            .script
            .get(&key)
            .cloned()
            .unwrap_or((Scripted::Items(Vec::new()), Duration::ZERO));

        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match answer {
            Scripted::Items(items) => Ok(items),
            Scripted::Fail => Err(FetchError::unavailable(req.source, req.sort, "HTTP 503")),
            Scripted::Malformed => Err(FetchError::malformed(req.source, req.sort, "not a listing")),
            Scripted::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &'static str {
        "Scripted"
    }
}

pub fn item(id: &str, source: &str, popularity: i64, ratio: f64, comments: u64) -> Item {
    Item {
        id: id.into(),
        title: format!("post {id}"),
        source_name: source.into(),
        created_at: NOW - 60,
        popularity,
        approval_ratio: ratio,
        discussion_count: comments,
        permalink: format!("https://www.reddit.com/r/{source}/comments/{id}/"),
        author: "someone".into(),
    }
}

pub fn modes(list: &[&str]) -> Vec<SortMode> {
    list.iter().map(|m| m.parse().expect("sort mode")).collect()
}

pub fn config(sources: &[&str], sort_modes: &[&str]) -> AggregateConfig {
    AggregateConfig {
        sources: sources
            .iter()
            .map(|s| SourceSpec {
                name: s.to_string(),
                sort_modes: modes(sort_modes),
                limit: 50,
            })
            .collect(),
        window_secs: 86_400,
        top_n: 3,
        max_concurrency: None,
        fetch_timeout: Duration::from_secs(2),
    }
}

pub fn shared(f: ScriptedFetcher) -> Arc<ScriptedFetcher> {
    Arc::new(f)
}
