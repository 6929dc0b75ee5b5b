// src/aggregate.rs
//! # Aggregation
//! Fan out one fetch per (source, sort mode) pair, wait for all of them, then
//! filter, pool, dedup and rank on the calling task.
//!
//! Fetch completion order is arbitrary; every result is put back into its
//! configuration slot before anything else happens, so the report only
//! depends on the data returned, never on network timing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SourceSpec;
use crate::error::{AggregateError, FetchError};
use crate::ingest::dedup::merge;
use crate::ingest::recency::filter_recent;
use crate::ingest::types::{FetchRequest, Item, SortMode, SourceFetcher};
use crate::rank::{rank, top_n, Criterion, Pool};
use crate::report::{describe_window, ByCriterion, DegradedSource, Report, RunStats};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("trends_runs_total", "Aggregation runs completed.");
        describe_counter!("trends_fetch_total", "Listing fetches dispatched.");
        describe_counter!(
            "trends_fetch_errors_total",
            "Listing fetches that failed or timed out."
        );
        describe_counter!(
            "trends_items_fetched_total",
            "Items returned by listing fetches."
        );
        describe_counter!(
            "trends_items_kept_total",
            "Items kept after the recency filter."
        );
        describe_counter!(
            "trends_dedup_total",
            "Items collapsed when building the combined pool."
        );
        describe_histogram!("trends_fetch_ms", "Listing fetch time in milliseconds.");
        describe_gauge!("trends_last_run_ts", "Unix ts when aggregation last ran.");
    });
}

#[derive(Debug, Clone)]
pub struct AggregateConfig {
    pub sources: Vec<SourceSpec>,
    pub window_secs: u64,
    pub top_n: usize,
    /// `None` runs every pair at once.
    pub max_concurrency: Option<usize>,
    pub fetch_timeout: Duration,
}

impl AggregateConfig {
    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), AggregateError> {
        let invalid =
            |msg: String| -> Result<(), AggregateError> { Err(AggregateError::InvalidConfiguration(msg)) };
        if self.sources.is_empty() {
            return invalid("no sources configured".into());
        }
        for (i, s) in self.sources.iter().enumerate() {
            if s.name.trim().is_empty() {
                return invalid(format!("source #{i} has an empty name"));
            }
            if s.sort_modes.is_empty() {
                return invalid(format!("source '{}' has no sort modes", s.name));
            }
        }
        if self.top_n == 0 {
            return invalid("top_n must be at least 1".into());
        }
        if self.max_concurrency == Some(0) {
            return invalid("max_concurrency must be at least 1".into());
        }
        Ok(())
    }

    /// Every (source, sort mode) pair; the index is the pair's slot.
    fn pairs(&self) -> Vec<Pair<'_>> {
        self.sources
            .iter()
            .flat_map(|s| {
                s.sort_modes.iter().map(move |m| Pair {
                    source: s.name.as_str(),
                    sort: *m,
                    limit: s.limit,
                })
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Pair<'a> {
    source: &'a str,
    sort: SortMode,
    limit: u32,
}

type Outcome = Result<Vec<Item>, FetchError>;

/// Drives one aggregation per `run`; holds no state between runs.
pub struct Aggregator {
    fetcher: Arc<dyn SourceFetcher>,
    cfg: AggregateConfig,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn SourceFetcher>, cfg: AggregateConfig) -> Self {
        Self { fetcher, cfg }
    }

    pub async fn run(&self, cancel: &CancellationToken) -> Result<Report, AggregateError> {
        self.run_at(Utc::now(), cancel).await
    }

    /// Same as [`run`](Self::run) with an explicit clock; `now` stamps the
    /// report and anchors the recency window.
    pub async fn run_at(
        &self,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<Report, AggregateError> {
        ensure_metrics_described();
        self.cfg.validate()?;

        let pairs = self.cfg.pairs();
        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(pairs = pairs.len(), fetcher = self.fetcher.name(), "aggregation cancelled");
                return Err(AggregateError::Cancelled);
            }
            out = self.fetch_all(&pairs) => out,
        };

        let report = self.assemble(now, &pairs, outcomes)?;

        counter!("trends_runs_total").increment(1);
        gauge!("trends_last_run_ts").set(now.timestamp() as f64);
        Ok(report)
    }

    /// Join barrier: returns one outcome per pair, in slot order.
    async fn fetch_all(&self, pairs: &[Pair<'_>]) -> Vec<Outcome> {
        let width = self.cfg.max_concurrency.unwrap_or(pairs.len()).max(1);

        let futs: Vec<_> = pairs
            .iter()
            .enumerate()
            .map(|(slot, pair)| async move { (slot, self.fetch_one(pair).await) })
            .collect();
        let mut done: Vec<(usize, Outcome)> =
            stream::iter(futs).buffer_unordered(width).collect().await;

        done.sort_by_key(|(slot, _)| *slot);
        done.into_iter().map(|(_, out)| out).collect()
    }

    async fn fetch_one(&self, pair: &Pair<'_>) -> Outcome {
        let req = FetchRequest {
            source: pair.source,
            sort: pair.sort,
            window_secs: self.cfg.window_secs,
            limit: pair.limit,
        };
        counter!("trends_fetch_total").increment(1);

        let res = match tokio::time::timeout(self.cfg.fetch_timeout, self.fetcher.fetch(&req)).await
        {
            Ok(r) => r,
            Err(_) => Err(FetchError::unavailable(
                pair.source,
                pair.sort,
                format!("timed out after {}ms", self.cfg.fetch_timeout.as_millis()),
            )),
        };

        if let Ok(items) = &res {
            debug!(source = pair.source, sort = %pair.sort, items = items.len(), "fetch ok");
        }
        res
    }

    fn assemble(
        &self,
        now: DateTime<Utc>,
        pairs: &[Pair<'_>],
        outcomes: Vec<Outcome>,
    ) -> Result<Report, AggregateError> {
        let now_ts = now.timestamp();
        let mut stats = RunStats {
            pairs_attempted: pairs.len(),
            ..RunStats::default()
        };
        let mut degraded = Vec::new();
        let mut filtered: Vec<(SortMode, Vec<Item>)> = Vec::with_capacity(pairs.len());

        for (pair, out) in pairs.iter().zip(outcomes) {
            let items = match out {
                Ok(items) => items,
                Err(e) => {
                    warn!(source = pair.source, sort = %pair.sort, error = %e, "source degraded");
                    counter!("trends_fetch_errors_total").increment(1);
                    degraded.push(DegradedSource {
                        source: pair.source.to_string(),
                        sort_mode: pair.sort.to_string(),
                        kind: e.kind(),
                        cause: e.cause().to_string(),
                    });
                    stats.pairs_failed += 1;
                    Vec::new()
                }
            };
            stats.items_fetched += items.len();
            let kept = filter_recent(items, self.cfg.window_secs, now_ts);
            stats.items_kept += kept.len();
            filtered.push((pair.sort, kept));
        }

        if stats.pairs_failed == stats.pairs_attempted {
            warn!(attempted = stats.pairs_attempted, "every source fetch failed");
            return Err(AggregateError::NoData {
                attempted: stats.pairs_attempted,
            });
        }

        let combined = merge(filtered.iter().map(|(_, items)| items.iter().cloned()));
        stats.items_combined = combined.len();
        counter!("trends_items_kept_total").increment(stats.items_kept as u64);
        counter!("trends_dedup_total").increment((stats.items_kept - combined.len()) as u64);

        let mut top_posts = ByCriterion::default();
        let mut related_posts = ByCriterion::default();
        for c in Criterion::ALL {
            let pool: Vec<Item> = match c.pool() {
                Pool::Combined => combined.clone(),
                Pool::Mode(kind) => merge(
                    filtered
                        .iter()
                        .filter(|(sort, _)| sort.kind() == kind)
                        .map(|(_, items)| items.iter().cloned()),
                ),
            };
            debug!(criterion = c.as_str(), pool = pool.len(), "ranking");
            let ranked = rank(pool, c);
            *top_posts.get_mut(c) = ranked.first().map(|it| c.project(it));
            *related_posts.get_mut(c) = top_n(&ranked, self.cfg.top_n)
                .iter()
                .map(|it| c.project(it))
                .collect();
        }

        info!(
            attempted = stats.pairs_attempted,
            failed = stats.pairs_failed,
            fetched = stats.items_fetched,
            kept = stats.items_kept,
            combined = stats.items_combined,
            "aggregation finished"
        );

        Ok(Report {
            timestamp: now,
            time_window: describe_window(self.cfg.window_secs),
            window_seconds: self.cfg.window_secs,
            top_posts,
            related_posts,
            degraded_sources: degraded,
            stats,
        })
    }
}
