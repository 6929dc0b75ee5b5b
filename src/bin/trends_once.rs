// src/bin/trends_once.rs
//! Run one aggregation against the configured sources and print the report
//! as JSON. Ctrl-C cancels the run.
//!
//! Usage: `cargo run --bin trends_once [config-path]`

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use trend_aggregator::{build_state, init_tracing, TrendsConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = match std::env::args().nth(1) {
        Some(p) => {
            let mut cfg = TrendsConfig::load_from(&PathBuf::from(p))?;
            cfg.apply_env_overrides();
            cfg
        }
        None => TrendsConfig::load_default()?,
    };
    let state = build_state(&cfg)?;

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let report = state
        .aggregator
        .run(&cancel)
        .await
        .context("trend aggregation failed")?;

    if report.is_empty() {
        eprintln!("No trending topics found");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
