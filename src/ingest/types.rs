// src/ingest/types.rs
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FetchError;

/// One candidate post, normalized from a source listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    pub id: String,                // stable across sort modes; dedup key
    pub title: String,
    pub source_name: String,       // e.g., "MachineLearning"
    pub created_at: i64,           // unix seconds
    pub popularity: i64,           // net votes
    pub approval_ratio: f64,       // 0.0..=1.0
    pub discussion_count: u64,     // comment count
    pub permalink: String,
    pub author: String,
}

impl Item {
    /// `popularity * (1 - approval_ratio)`; high for well-voted but divisive posts.
    pub fn controversy_score(&self) -> f64 {
        self.popularity as f64 * (1.0 - self.approval_ratio)
    }
}

/// Upstream time-range token for time-bounded sort modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRange {
    Hour,
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeRange {
    /// Smallest range that still covers a recency window of `window_secs`.
    pub fn covering(window_secs: u64) -> Self {
        const HOUR: u64 = 3_600;
        const DAY: u64 = 24 * HOUR;
        match window_secs {
            0..=HOUR => TimeRange::Hour,
            s if s <= DAY => TimeRange::Day,
            s if s <= 7 * DAY => TimeRange::Week,
            s if s <= 31 * DAY => TimeRange::Month,
            s if s <= 366 * DAY => TimeRange::Year,
            _ => TimeRange::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Hour => "hour",
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::Year => "year",
            TimeRange::All => "all",
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hour" => Ok(TimeRange::Hour),
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            "year" => Ok(TimeRange::Year),
            "all" => Ok(TimeRange::All),
            other => Err(format!("unknown time range '{other}'")),
        }
    }
}

/// Sort mode without its period; what ranking criteria bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortKind {
    Hot,
    New,
    Top,
    Controversial,
}

/// A fetch variant determining source-side ordering.
///
/// Written in config as `"hot"`, `"new"`, `"top"`, `"top:day"`,
/// `"controversial:week"` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SortMode {
    Hot,
    New,
    Top(Option<TimeRange>),
    Controversial(Option<TimeRange>),
}

impl SortMode {
    pub fn kind(&self) -> SortKind {
        match self {
            SortMode::Hot => SortKind::Hot,
            SortMode::New => SortKind::New,
            SortMode::Top(_) => SortKind::Top,
            SortMode::Controversial(_) => SortKind::Controversial,
        }
    }

    /// Path segment used by listing endpoints.
    pub fn path(&self) -> &'static str {
        match self.kind() {
            SortKind::Hot => "hot",
            SortKind::New => "new",
            SortKind::Top => "top",
            SortKind::Controversial => "controversial",
        }
    }

    /// Time-range token to send, if this mode supports one.
    /// An explicit period wins; otherwise the range covering the window is used.
    pub fn time_range(&self, window_secs: u64) -> Option<TimeRange> {
        match self {
            SortMode::Hot | SortMode::New => None,
            SortMode::Top(p) | SortMode::Controversial(p) => {
                Some(p.unwrap_or_else(|| TimeRange::covering(window_secs)))
            }
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Top(Some(p)) | SortMode::Controversial(Some(p)) => {
                write!(f, "{}:{}", self.path(), p.as_str())
            }
            _ => f.write_str(self.path()),
        }
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let (mode, period) = match s.split_once(':') {
            Some((m, p)) => (m, Some(p.parse::<TimeRange>()?)),
            None => (s.as_str(), None),
        };
        match (mode, period) {
            ("hot", None) => Ok(SortMode::Hot),
            ("new", None) => Ok(SortMode::New),
            ("top", p) => Ok(SortMode::Top(p)),
            ("controversial", p) => Ok(SortMode::Controversial(p)),
            ("hot" | "new", Some(_)) => Err(format!("sort mode '{mode}' takes no time range")),
            (other, _) => Err(format!("unknown sort mode '{other}'")),
        }
    }
}

impl TryFrom<String> for SortMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SortMode> for String {
    fn from(value: SortMode) -> Self {
        value.to_string()
    }
}

/// Parameters of one listing fetch.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub source: &'a str,
    pub sort: SortMode,
    pub window_secs: u64,
    pub limit: u32,
}

#[async_trait::async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetch one page of items for `req`. Never filters, ranks or dedups.
    async fn fetch(&self, req: &FetchRequest<'_>) -> Result<Vec<Item>, FetchError>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_mode_parses_and_displays() {
        assert_eq!("hot".parse::<SortMode>().unwrap(), SortMode::Hot);
        assert_eq!(
            "Top:Day".parse::<SortMode>().unwrap(),
            SortMode::Top(Some(TimeRange::Day))
        );
        assert_eq!(
            "controversial".parse::<SortMode>().unwrap(),
            SortMode::Controversial(None)
        );
        assert!("hot:day".parse::<SortMode>().is_err());
        assert!("rising".parse::<SortMode>().is_err());
        assert!("top:fortnight".parse::<SortMode>().is_err());

        assert_eq!(SortMode::Top(Some(TimeRange::Week)).to_string(), "top:week");
        assert_eq!(SortMode::Controversial(None).to_string(), "controversial");
    }

    #[test]
    fn time_range_only_for_bounded_modes() {
        assert_eq!(SortMode::Hot.time_range(86_400), None);
        assert_eq!(
            SortMode::Top(None).time_range(86_400),
            Some(TimeRange::Day)
        );
        assert_eq!(
            SortMode::Top(None).time_range(86_401),
            Some(TimeRange::Week)
        );
        assert_eq!(
            SortMode::Controversial(Some(TimeRange::Hour)).time_range(86_400),
            Some(TimeRange::Hour)
        );
    }

    #[test]
    fn controversy_score_is_derived() {
        let mut it = Item {
            id: "a".into(),
            title: "t".into(),
            source_name: "s".into(),
            created_at: 0,
            popularity: 100,
            approval_ratio: 0.5,
            discussion_count: 0,
            permalink: String::new(),
            author: String::new(),
        };
        assert_eq!(it.controversy_score(), 50.0);
        it.approval_ratio = 1.0;
        assert_eq!(it.controversy_score(), 0.0);
    }
}
