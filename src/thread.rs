// src/thread.rs
//! Single-thread lookup: resolve a post URL, fetch the thread and reduce it
//! to the post body plus a handful of substantial top-level comments.

use chrono::{DateTime, SecondsFormat};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::error::FetchError;
use crate::ingest::providers::reddit::RedditFetcher;

/// Top-level comments kept per thread.
pub const MAX_TOP_COMMENTS: usize = 5;
/// A comment needs strictly more upvotes than this to be kept.
pub const MIN_COMMENT_UPVOTES: i64 = 100;

const BOT_AUTHOR: &str = "AutoModerator";

static RE_POST_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"reddit\.com/r/([^/?#]+)/comments/([^/?#]+)").expect("post url regex")
});

#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("Invalid Reddit URL")]
    InvalidUrl,
    #[error("Failed to extract post content")]
    MissingPost,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRef {
    pub subreddit: String,
    pub post_id: String,
}

pub fn parse_post_url(url: &str) -> Result<PostRef, ThreadError> {
    let caps = RE_POST_URL.captures(url).ok_or(ThreadError::InvalidUrl)?;
    Ok(PostRef {
        subreddit: caps[1].to_string(),
        post_id: caps[2].to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostContent {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub author: String,
    pub upvotes: i64,
    pub upvote_ratio: f64,
    pub url: String,
    pub thumbnail: String,
    pub created: Option<String>,
    pub subreddit: String,
    pub subreddit_subscribers: u64,
    /// Gallery metadata when present, otherwise the embedded media object.
    pub media: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub user_id: String,
    pub comment: String,
    pub upvotes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    pub comment: String,
    pub upvotes: i64,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thread {
    pub post: PostContent,
    pub comments: Vec<Comment>,
}

fn str_at(v: &Value, key: &str) -> String {
    v.get(key).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn flag(v: &Value, key: &str) -> bool {
    v.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn children(listing: &Value) -> &[Value] {
    listing
        .pointer("/data/children")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

fn extract_post(listing: &Value) -> Option<PostContent> {
    let post = children(listing).first()?.get("data")?;
    if !post.is_object() {
        return None;
    }
    let kind = if flag(post, "is_self") {
        "text"
    } else if flag(post, "is_video") {
        "video"
    } else if flag(post, "is_gallery") {
        "gallery"
    } else {
        "link"
    };
    let created = post
        .get("created_utc")
        .and_then(Value::as_f64)
        .and_then(|ts| DateTime::from_timestamp(ts.floor() as i64, 0))
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true));

    Some(PostContent {
        title: html_escape::decode_html_entities(&str_at(post, "title")).to_string(),
        content: str_at(post, "selftext"),
        kind,
        author: str_at(post, "author"),
        upvotes: post.get("ups").and_then(Value::as_i64).unwrap_or(0),
        upvote_ratio: post.get("upvote_ratio").and_then(Value::as_f64).unwrap_or(0.0),
        url: str_at(post, "url"),
        thumbnail: str_at(post, "thumbnail"),
        created,
        subreddit: str_at(post, "subreddit"),
        subreddit_subscribers: post
            .get("subreddit_subscribers")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        media: ["media_metadata", "media"]
            .iter()
            .filter_map(|k| post.get(*k))
            .find(|v| !v.is_null())
            .cloned(),
    })
}

fn to_reply(data: &Value) -> Reply {
    Reply {
        user_id: str_at(data, "author"),
        comment: str_at(data, "body"),
        upvotes: data.get("ups").and_then(Value::as_i64).unwrap_or(0),
    }
}

fn extract_comments(listing: Option<&Value>) -> Vec<Comment> {
    let Some(listing) = listing else {
        return Vec::new();
    };
    children(listing)
        .iter()
        .filter_map(|c| c.get("data"))
        .map(|data| {
            let head = to_reply(data);
            let replies = data
                .get("replies")
                .map(children)
                .unwrap_or_default()
                .iter()
                .filter_map(|r| r.get("data"))
                .map(to_reply)
                // "more" stubs carry no body
                .filter(|r| !r.comment.is_empty())
                .collect();
            Comment {
                user_id: head.user_id,
                comment: head.comment,
                upvotes: head.upvotes,
                replies,
            }
        })
        .filter(|c| {
            !c.comment.is_empty()
                && c.user_id != BOT_AUTHOR
                && c.upvotes > MIN_COMMENT_UPVOTES
                && !c.comment.contains('>')
        })
        .take(MAX_TOP_COMMENTS)
        .collect()
}

/// Reduce a raw thread payload (`[post listing, comment listing]`).
pub fn extract_thread(raw: &Value) -> Result<Thread, ThreadError> {
    let post = raw
        .get(0)
        .and_then(extract_post)
        .ok_or(ThreadError::MissingPost)?;
    let comments = extract_comments(raw.get(1));
    Ok(Thread { post, comments })
}

/// Resolve `url`, fetch the thread, and extract it.
pub async fn load_thread(fetcher: &RedditFetcher, url: &str) -> Result<Thread, ThreadError> {
    let r = parse_post_url(url)?;
    tracing::info!(subreddit = %r.subreddit, post_id = %r.post_id, "loading thread");
    let raw = fetcher.fetch_thread(&r.subreddit, &r.post_id).await?;
    extract_thread(&raw)
}
