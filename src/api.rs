// src/api.rs
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::aggregate::Aggregator;
use crate::error::AggregateError;
use crate::ingest::providers::reddit::RedditFetcher;
use crate::rate_limit::{limit_requests, RateLimiter};
use crate::thread::{load_thread, ThreadError};

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub threads: Arc<RedditFetcher>,
    pub limiter: Arc<RateLimiter>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/trends", get(trends))
        .route("/post", post(thread_by_url))
        .layer(middleware::from_fn_with_state(
            state.limiter.clone(),
            limit_requests,
        ))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

fn error_body(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "error": msg.into() }))).into_response()
}

async fn trends(State(state): State<AppState>) -> Response {
    // dropping this handler (client gone) drops the run and its in-flight fetches
    let cancel = CancellationToken::new();
    match state.aggregator.run(&cancel).await {
        Ok(report) if report.is_empty() => {
            error_body(StatusCode::NOT_FOUND, "No trending topics found")
        }
        Ok(report) => Json(report).into_response(),
        Err(AggregateError::Cancelled) => {
            error_body(StatusCode::SERVICE_UNAVAILABLE, "Trend aggregation cancelled")
        }
        Err(e) => {
            tracing::error!(error = %e, "trend aggregation failed");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch trending topics",
            )
        }
    }
}

#[derive(serde::Deserialize)]
struct ThreadReq {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

async fn thread_by_url(State(state): State<AppState>, Json(body): Json<ThreadReq>) -> Response {
    let Some(url) = body.url.filter(|u| !u.trim().is_empty()) else {
        tracing::warn!("thread request rejected: missing url");
        return error_body(StatusCode::BAD_REQUEST, "URL is required");
    };

    match load_thread(&state.threads, &url).await {
        Ok(thread) => Json(json!({
            "post": thread.post,
            "comments": thread.comments,
            "providedContext": body.context.unwrap_or_default(),
        }))
        .into_response(),
        Err(ThreadError::InvalidUrl) => error_body(StatusCode::BAD_REQUEST, "Invalid Reddit URL"),
        Err(e) => {
            tracing::warn!(error = %e, %url, "thread lookup failed");
            error_body(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}
