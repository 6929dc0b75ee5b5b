// src/ingest/providers/reddit.rs
//! Reddit listing provider.
//!
//! One `fetch` is one GET against `/r/{source}/{sort}.json`. Records are
//! read field by field so a single odd value never sinks the record or the page.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use serde::Deserialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::ingest::types::{FetchRequest, Item, SortMode, SourceFetcher};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
pub const DEFAULT_USER_AGENT: &str = "trend-aggregator/0.1 (AI trend crawler)";

/// Page size cap accepted by listing endpoints.
pub const MAX_PAGE_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct RedditConfig {
    pub base_url: String,
    /// Descriptive client identifier sent as `User-Agent` on every request.
    pub user_agent: String,
    /// Optional session cookie for restricted sources.
    pub cookie: Option<String>,
    pub timeout: Duration,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Value>,
}

fn str_field<'v>(post: &'v Value, key: &str) -> Option<&'v str> {
    post.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn num_field(post: &Value, key: &str) -> Option<f64> {
    post.get(key).and_then(Value::as_f64)
}

/// Build an item from one listing child. Each field is read on its own:
/// a missing or mistyped field falls back to its zero value. Only a missing
/// id drops the record.
fn item_from_child(child: &Value, source: &str, base_url: &str) -> Option<Item> {
    let post = child.get("data")?;
    let id = str_field(post, "id")?.to_string();
    let permalink = match str_field(post, "permalink") {
        Some(p) if p.starts_with("http") => p.to_string(),
        Some(p) => format!("{}{}", base_url.trim_end_matches('/'), p),
        None => String::new(),
    };
    Some(Item {
        id,
        title: html_escape::decode_html_entities(str_field(post, "title").unwrap_or_default())
            .to_string(),
        source_name: str_field(post, "subreddit").unwrap_or(source).to_string(),
        created_at: num_field(post, "created_utc").unwrap_or(0.0).floor() as i64,
        popularity: post
            .get("score")
            .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .unwrap_or(0),
        approval_ratio: num_field(post, "upvote_ratio").unwrap_or(0.0).clamp(0.0, 1.0),
        discussion_count: num_field(post, "num_comments")
            .map(|n| n.max(0.0) as u64)
            .unwrap_or(0),
        permalink,
        author: str_field(post, "author").unwrap_or_default().to_string(),
    })
}

/// Map a listing body into items. Records without an id are skipped.
pub fn parse_listing(
    source: &str,
    sort: SortMode,
    permalink_base: &str,
    body: &str,
) -> Result<Vec<Item>, FetchError> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| FetchError::malformed(source, sort, e))?;

    let mut out = Vec::with_capacity(listing.data.children.len());
    for child in &listing.data.children {
        match item_from_child(child, source, permalink_base) {
            Some(it) => out.push(it),
            None => tracing::debug!(source, %sort, "skipping listing child without id"),
        }
    }
    Ok(out)
}

pub struct RedditFetcher {
    client: reqwest::Client,
    base_url: String,
    cookie: Option<String>,
}

impl RedditFetcher {
    pub fn new(cfg: &RedditConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()
            .context("building reddit http client")?;
        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            cookie: cfg.cookie.clone().filter(|c| !c.trim().is_empty()),
        })
    }

    pub fn listing_url(&self, req: &FetchRequest<'_>) -> String {
        let mut url = format!(
            "{}/r/{}/{}.json?limit={}",
            self.base_url,
            req.source,
            req.sort.path(),
            req.limit.clamp(1, MAX_PAGE_LIMIT)
        );
        if let Some(t) = req.sort.time_range(req.window_secs) {
            url.push_str("&t=");
            url.push_str(t.as_str());
        }
        url
    }

    /// GET `url` and return the body text; `label` names the request in errors.
    async fn get_text(&self, url: &str, source: &str, label: &str) -> Result<String, FetchError> {
        let mut rb = self.client.get(url);
        if let Some(c) = &self.cookie {
            rb = rb.header(reqwest::header::COOKIE, c);
        }

        let resp = rb
            .send()
            .await
            .map_err(|e| FetchError::unavailable(source, label, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::unavailable(
                source,
                label,
                format!("HTTP {}", status),
            ));
        }

        resp.text()
            .await
            .map_err(|e| FetchError::unavailable(source, label, e))
    }

    /// Fetch a single thread (post + comment tree) as raw JSON.
    pub async fn fetch_thread(&self, subreddit: &str, post_id: &str) -> Result<Value, FetchError> {
        let url = format!(
            "{}/r/{}/comments/{}.json?sort=top",
            self.base_url, subreddit, post_id
        );
        tracing::debug!(%url, "fetching thread");
        let body = self.get_text(&url, subreddit, "comments").await?;
        serde_json::from_str(&body).map_err(|e| FetchError::malformed(subreddit, "comments", e))
    }
}

#[async_trait]
impl SourceFetcher for RedditFetcher {
    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<Item>, FetchError> {
        let t0 = Instant::now();
        let url = self.listing_url(req);
        tracing::debug!(%url, source = req.source, sort = %req.sort, "fetching listing");

        let label = req.sort.to_string();
        let body = self.get_text(&url, req.source, &label).await?;
        let items = parse_listing(req.source, req.sort, DEFAULT_BASE_URL, &body)?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("trends_fetch_ms").record(ms);
        counter!("trends_items_fetched_total").increment(items.len() as u64);

        Ok(items)
    }

    fn name(&self) -> &'static str {
        "Reddit"
    }
}
