// src/rate_limit.rs
//! Per-client sliding-window request limit, mounted on every route.
//!
//! Each `/trends` call fans out to every configured (source, sort mode)
//! pair upstream, so inbound traffic is capped per client before it
//! reaches a handler.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use serde_json::json;
use tokio::sync::Mutex;

pub const DEFAULT_MAX_REQUESTS: usize = 100;
pub const DEFAULT_WINDOW_SECS: u64 = 15 * 60;

/// Above this many tracked clients, idle entries are dropped on the next hit.
const PRUNE_THRESHOLD: usize = 1000;

/// Returns true if the request is allowed. Drops timestamps older than
/// `window` and records `now` when allowed.
pub fn check_rate_limit(entries: &mut Vec<Instant>, now: Instant, window: Duration, max: usize) -> bool {
    if let Some(cutoff) = now.checked_sub(window) {
        entries.retain(|t| *t > cutoff);
    }
    if entries.len() >= max {
        return false;
    }
    entries.push(now);
    true
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    /// `max_requests == 0` disables limiting.
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    pub async fn allow(&self, client: &str) -> bool {
        self.allow_at(client, Instant::now()).await
    }

    pub async fn allow_at(&self, client: &str, now: Instant) -> bool {
        if self.max_requests == 0 {
            return true;
        }
        let mut hits = self.hits.lock().await;
        if hits.len() > PRUNE_THRESHOLD {
            prune_idle(&mut hits, now, self.window);
        }
        let entries = hits.entry(client.to_string()).or_default();
        check_rate_limit(entries, now, self.window, self.max_requests)
    }

    #[cfg(test)]
    async fn tracked_clients(&self) -> usize {
        self.hits.lock().await.len()
    }
}

fn prune_idle(hits: &mut HashMap<String, Vec<Instant>>, now: Instant, window: Duration) {
    let Some(cutoff) = now.checked_sub(window) else {
        return;
    };
    hits.retain(|_, entries| {
        entries.retain(|t| *t > cutoff);
        !entries.is_empty()
    });
}

/// First `X-Forwarded-For` hop, else the peer address, else a shared bucket.
pub fn client_key(req: &Request) -> String {
    if let Some(first) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
    {
        return first.to_string();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn limit_requests(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    if !limiter.allow(&client).await {
        tracing::warn!(%client, path = %req.uri().path(), "rate limit exceeded");
        counter!("trends_rate_limited_total").increment(1);
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": format!(
                    "Too many requests, max {} per {} seconds",
                    limiter.max_requests, limiter.window.as_secs()
                )
            })),
        )
            .into_response();
    }
    next.run(req).await
}
