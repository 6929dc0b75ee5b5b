// src/config/mod.rs
//! Service configuration: which sources to query, how, and how to rank.
//!
//! Lookup order:
//! 1) `$TRENDS_CONFIG_PATH`
//! 2) `config/trends.toml`
//! 3) `config/trends.json`
//! 4) built-in defaults
//!
//! Env overrides (`TRENDS_USER_AGENT`, `REDDIT_COOKIE`, `TRENDS_WINDOW_SECS`,
//! `TRENDS_TOP_N`, `TRENDS_RATE_LIMIT`) are applied after the file is read.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregate::AggregateConfig;
use crate::ingest::providers::reddit::{RedditConfig, DEFAULT_BASE_URL, DEFAULT_USER_AGENT};
use crate::ingest::recency::DEFAULT_WINDOW_SECS;
use crate::ingest::types::{SortMode, TimeRange};
use crate::rank::DEFAULT_TOP_N;
use crate::rate_limit::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS as DEFAULT_RATE_WINDOW_SECS};

pub const ENV_CONFIG_PATH: &str = "TRENDS_CONFIG_PATH";
pub const ENV_USER_AGENT: &str = "TRENDS_USER_AGENT";
pub const ENV_COOKIE: &str = "REDDIT_COOKIE";
pub const ENV_WINDOW_SECS: &str = "TRENDS_WINDOW_SECS";
pub const ENV_TOP_N: &str = "TRENDS_TOP_N";
pub const ENV_RATE_LIMIT: &str = "TRENDS_RATE_LIMIT";

const DEFAULT_LIMIT: u32 = 50;
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

const DEFAULT_SOURCES: [&str; 10] = [
    "artificial",
    "MachineLearning",
    "singularity",
    "LocalLLaMA",
    "ChatGPT",
    "OpenAI",
    "Bard",
    "MistralAI",
    "LLMDevs",
    "hardwareai",
];

/// Static configuration of one source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    pub sort_modes: Vec<SortMode>,
    pub limit: u32,
}

/// A source entry as written in config: a bare name or a full table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Name(String),
    Spec {
        name: String,
        #[serde(default)]
        sort_modes: Option<Vec<SortMode>>,
        #[serde(default)]
        limit: Option<u32>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendsConfig {
    pub window_secs: u64,
    pub top_n: usize,
    /// `None` means one slot per (source, sort mode) pair.
    pub max_concurrency: Option<usize>,
    pub fetch_timeout_ms: u64,
    pub base_url: String,
    pub user_agent: String,
    pub cookie: Option<String>,
    pub default_limit: u32,
    pub sort_modes: Vec<SortMode>,
    pub sources: Vec<SourceEntry>,
    /// Requests allowed per client per window; 0 disables the limit.
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            window_secs: DEFAULT_WINDOW_SECS,
            top_n: DEFAULT_TOP_N,
            max_concurrency: None,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie: None,
            default_limit: DEFAULT_LIMIT,
            sort_modes: vec![
                SortMode::Hot,
                SortMode::Top(Some(TimeRange::Day)),
                SortMode::Controversial(Some(TimeRange::Day)),
            ],
            sources: DEFAULT_SOURCES
                .iter()
                .map(|s| SourceEntry::Name(s.to_string()))
                .collect(),
            rate_limit_max: DEFAULT_MAX_REQUESTS,
            rate_limit_window_secs: DEFAULT_RATE_WINDOW_SECS,
        }
    }
}

impl TrendsConfig {
    /// Load from an explicit path. Supports TOML or JSON.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading trends config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing trends config {}", path.display()))
    }

    /// Load using env var + fallbacks, then apply env overrides.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from(&pb)?
        } else {
            let toml_p = PathBuf::from("config/trends.toml");
            let json_p = PathBuf::from("config/trends.json");
            if toml_p.exists() {
                Self::load_from(&toml_p)?
            } else if json_p.exists() {
                Self::load_from(&json_p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(ua) = env_nonempty(ENV_USER_AGENT) {
            self.user_agent = ua;
        }
        if let Some(c) = env_nonempty(ENV_COOKIE) {
            self.cookie = Some(c);
        }
        if let Some(w) = env_nonempty(ENV_WINDOW_SECS).and_then(|s| s.parse().ok()) {
            self.window_secs = w;
        }
        if let Some(n) = env_nonempty(ENV_TOP_N).and_then(|s| s.parse().ok()) {
            self.top_n = n;
        }
        if let Some(n) = env_nonempty(ENV_RATE_LIMIT).and_then(|s| s.parse().ok()) {
            self.rate_limit_max = n;
        }
    }

    /// Resolve source entries against the global sort modes and page limit.
    pub fn source_specs(&self) -> Vec<SourceSpec> {
        self.sources
            .iter()
            .map(|e| match e {
                SourceEntry::Name(name) => SourceSpec {
                    name: name.trim().to_string(),
                    sort_modes: self.sort_modes.clone(),
                    limit: self.default_limit,
                },
                SourceEntry::Spec {
                    name,
                    sort_modes,
                    limit,
                } => SourceSpec {
                    name: name.trim().to_string(),
                    sort_modes: sort_modes.clone().unwrap_or_else(|| self.sort_modes.clone()),
                    limit: limit.unwrap_or(self.default_limit),
                },
            })
            .collect()
    }

    pub fn aggregate_config(&self) -> AggregateConfig {
        AggregateConfig {
            sources: self.source_specs(),
            window_secs: self.window_secs,
            top_n: self.top_n,
            max_concurrency: self.max_concurrency,
            fetch_timeout: Duration::from_millis(self.fetch_timeout_ms),
        }
    }

    pub fn reddit_config(&self) -> RedditConfig {
        RedditConfig {
            base_url: self.base_url.clone(),
            user_agent: self.user_agent.clone(),
            cookie: self.cookie.clone(),
            // the aggregator enforces the per-fetch deadline; this only bounds stray calls
            timeout: Duration::from_millis(self.fetch_timeout_ms.saturating_mul(2)),
        }
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<TrendsConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    match toml::from_str::<TrendsConfig>(s) {
        Ok(cfg) => Ok(cfg),
        Err(toml_err) if hint_ext != "toml" => {
            serde_json::from_str(s).map_err(|_| anyhow!("unsupported config format: {toml_err}"))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs};

    #[test]
    fn defaults_cover_ten_sources_and_three_modes() {
        let cfg = TrendsConfig::default();
        let specs = cfg.source_specs();
        assert_eq!(specs.len(), 10);
        assert!(specs.iter().all(|s| s.sort_modes.len() == 3 && s.limit == 50));
        assert_eq!(cfg.window_secs, 86_400);
        assert_eq!(cfg.top_n, 3);
        assert_eq!(cfg.rate_limit_max, 100);
        assert_eq!(cfg.rate_limit_window_secs, 900);
    }

    #[test]
    fn toml_mixes_names_and_tables() {
        let toml = r#"
            window_secs = 3600
            sort_modes = ["hot", "top"]
            sources = [
                "rust",
                { name = " golang ", sort_modes = ["controversial:week"], limit = 10 },
            ]
        "#;
        let cfg = parse_config(toml, "toml").unwrap();
        assert_eq!(cfg.window_secs, 3600);
        assert_eq!(cfg.top_n, 3);

        let specs = cfg.source_specs();
        assert_eq!(specs[0].name, "rust");
        assert_eq!(specs[0].sort_modes, vec![SortMode::Hot, SortMode::Top(None)]);
        assert_eq!(specs[1].name, "golang");
        assert_eq!(
            specs[1].sort_modes,
            vec![SortMode::Controversial(Some(TimeRange::Week))]
        );
        assert_eq!(specs[1].limit, 10);
    }

    #[test]
    fn json_and_bad_modes() {
        let json = r#"{"top_n": 5, "sources": ["a"]}"#;
        let cfg = parse_config(json, "json").unwrap();
        assert_eq!(cfg.top_n, 5);

        let bad = r#"sort_modes = ["sideways"]"#;
        assert!(parse_config(bad, "toml").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_TOP_N);
        env::remove_var(ENV_RATE_LIMIT);

        // no files → defaults
        let v = TrendsConfig::load_default().unwrap();
        assert_eq!(v.source_specs().len(), 10);

        // env path wins
        let p = tmp.path().join("custom.json");
        fs::write(&p, r#"{"sources": ["X"]}"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_TOP_N, "7");
        env::set_var(ENV_RATE_LIMIT, "0");
        let v2 = TrendsConfig::load_default().unwrap();
        assert_eq!(v2.source_specs()[0].name, "X");
        assert_eq!(v2.top_n, 7);
        assert_eq!(v2.rate_limit_max, 0);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(TrendsConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_TOP_N);
        env::remove_var(ENV_RATE_LIMIT);
        env::set_current_dir(&old).unwrap();
    }
}
