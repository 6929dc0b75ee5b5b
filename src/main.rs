//! Trend aggregation service: binary entrypoint.
//! Boots the Axum HTTP server, wiring config, shared state, and metrics.

use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};

use trend_aggregator::{build_state, init_tracing, metrics::Metrics, router, TrendsConfig};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = TrendsConfig::load_default()?;
    info!(
        sources = cfg.sources.len(),
        window_secs = cfg.window_secs,
        top_n = cfg.top_n,
        "trend config loaded"
    );

    let state = build_state(&cfg)?;
    let mut app = router(state);

    match Metrics::init(cfg.window_secs) {
        Ok(m) => app = app.merge(m.router()),
        Err(e) => warn!(error = ?e, "metrics disabled"),
    }

    Ok(app.into())
}
