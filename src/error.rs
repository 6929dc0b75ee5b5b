// src/error.rs
//! Error taxonomy for fetching and aggregation.
//!
//! Per-pair failures (`FetchError`) are absorbed by the aggregator and turned
//! into degraded-source notes; only `AggregateError` ever reaches a caller.

use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a per-pair failure, surfaced on the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    SourceUnavailable,
    MalformedPayload,
}

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("source unavailable: r/{source_name} ({sort}): {cause}")]
    SourceUnavailable {
        source_name: String,
        sort: String,
        cause: String,
    },

    #[error("malformed payload from r/{source_name} ({sort}): {cause}")]
    MalformedPayload {
        source_name: String,
        sort: String,
        cause: String,
    },
}

impl FetchError {
    pub fn unavailable(source: &str, sort: impl ToString, cause: impl ToString) -> Self {
        FetchError::SourceUnavailable {
            source_name: source.to_string(),
            sort: sort.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn malformed(source: &str, sort: impl ToString, cause: impl ToString) -> Self {
        FetchError::MalformedPayload {
            source_name: source.to_string(),
            sort: sort.to_string(),
            cause: cause.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            FetchError::MalformedPayload { .. } => ErrorKind::MalformedPayload,
        }
    }

    pub fn cause(&self) -> &str {
        match self {
            FetchError::SourceUnavailable { cause, .. } | FetchError::MalformedPayload { cause, .. } => {
                cause
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Every dispatched fetch failed; there is nothing to aggregate.
    #[error("no data: all {attempted} source fetches failed")]
    NoData { attempted: usize },

    #[error("aggregation cancelled")]
    Cancelled,
}
