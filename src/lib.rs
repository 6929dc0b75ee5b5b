// src/lib.rs
// Public library surface for integration tests and the binaries.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod rate_limit;
pub mod rank;
pub mod report;
pub mod thread;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub use crate::aggregate::{AggregateConfig, Aggregator};
pub use crate::api::{router, AppState};
pub use crate::config::TrendsConfig;
pub use crate::error::{AggregateError, FetchError};
pub use crate::report::Report;

use crate::ingest::providers::reddit::RedditFetcher;
use crate::rate_limit::RateLimiter;

/// Install a compact `tracing` subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("trend_aggregator=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

/// Build the shared app state from config: one Reddit client serves both
/// the aggregator and single-thread lookups.
pub fn build_state(cfg: &TrendsConfig) -> Result<AppState> {
    let fetcher = Arc::new(RedditFetcher::new(&cfg.reddit_config())?);
    let aggregator = Aggregator::new(fetcher.clone(), cfg.aggregate_config());
    Ok(AppState {
        aggregator: Arc::new(aggregator),
        threads: fetcher,
        limiter: Arc::new(RateLimiter::new(
            cfg.rate_limit_max,
            Duration::from_secs(cfg.rate_limit_window_secs),
        )),
    })
}
