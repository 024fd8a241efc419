//! Configuration loading for websearch-mcp
//!
//! Configuration is loaded from:
//! 1. The `--config` flag or environment variable WEBSEARCH_CONFIG_PATH
//! 2. ~/.websearch-mcp/config.toml
//! 3. Default values
//!
//! `WEBSEARCH_*` environment variables override individual settings on top
//! of whichever source was used.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{ResultFormat, DEFAULT_MAX_RESULTS};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,
    /// Outbound HTTP configuration
    #[serde(default)]
    pub http: HttpConfig,
    /// DuckDuckGo endpoints
    #[serde(default)]
    pub duckduckgo: DuckDuckGoConfig,
    /// Protocol server limits
    #[serde(default)]
    pub server: ServerConfig,
}

/// General search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Results returned when the caller does not ask for a number
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Output format when the caller does not ask for one
    #[serde(default)]
    pub format: ResultFormat,
    /// Enable result caching
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Cache TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_seconds: u64,
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for a whole upstream exchange
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Minimum spacing between upstream requests, 0 disables
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
}

/// DuckDuckGo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuckDuckGoConfig {
    /// Base URL of the HTML search endpoint
    #[serde(default = "default_html_base_url")]
    pub html_base_url: String,
    /// Base URL of the Instant Answer API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Region code such as `us-en` (empty = engine default)
    #[serde(default)]
    pub region: String,
}

/// Protocol server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Maximum number of tool calls running at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Per-call deadline; defaults to the HTTP timeout plus 5 seconds
    #[serde(default)]
    pub call_timeout_seconds: Option<u64>,
}

// Default value functions
fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

fn default_true() -> bool {
    true
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("websearch-mcp/{}", env!("CARGO_PKG_VERSION"))
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_html_base_url() -> String {
    "https://html.duckduckgo.com".to_string()
}

fn default_api_base_url() -> String {
    "https://api.duckduckgo.com".to_string()
}

fn default_max_concurrency() -> usize {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            format: ResultFormat::default(),
            cache_enabled: default_true(),
            cache_ttl_seconds: default_cache_ttl(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
            rate_limit_ms: default_rate_limit_ms(),
        }
    }
}

impl HttpConfig {
    /// Per-request upstream timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Minimum spacing between upstream requests
    pub fn rate_limit(&self) -> Duration {
        Duration::from_millis(self.rate_limit_ms)
    }
}

impl Default for DuckDuckGoConfig {
    fn default() -> Self {
        Self {
            html_base_url: default_html_base_url(),
            api_base_url: default_api_base_url(),
            region: String::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            call_timeout_seconds: None,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults, then apply env overrides
    ///
    /// An explicitly requested file must exist; the home-directory file is
    /// optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::home_config_path() {
                Some(path) if path.exists() => Self::from_file(&path)?,
                _ => {
                    tracing::info!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        tracing::info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    fn home_config_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".websearch-mcp").join("config.toml"))
    }

    /// Apply `WEBSEARCH_*` overrides read through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_override(&lookup, "WEBSEARCH_MAX_RESULTS") {
            self.search.max_results = v;
        }
        if let Some(v) = parse_override(&lookup, "WEBSEARCH_TIMEOUT_SECS") {
            self.http.timeout_seconds = v;
        }
        if let Some(v) = lookup("WEBSEARCH_USER_AGENT").filter(|v| !v.trim().is_empty()) {
            self.http.user_agent = v;
        }
        if let Some(v) = parse_override(&lookup, "WEBSEARCH_CACHE_TTL_SECS") {
            self.search.cache_ttl_seconds = v;
        }
        if let Some(v) = parse_override(&lookup, "WEBSEARCH_RATE_LIMIT_MS") {
            self.http.rate_limit_ms = v;
        }
    }

    /// Check values that would make the server unusable
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.search.max_results > 0, "search.max_results must be at least 1");
        anyhow::ensure!(self.http.timeout_seconds > 0, "http.timeout_seconds must be at least 1");
        anyhow::ensure!(
            self.server.max_concurrency > 0,
            "server.max_concurrency must be at least 1"
        );
        url::Url::parse(&self.duckduckgo.html_base_url)
            .with_context(|| format!("invalid duckduckgo.html_base_url '{}'", self.duckduckgo.html_base_url))?;
        url::Url::parse(&self.duckduckgo.api_base_url)
            .with_context(|| format!("invalid duckduckgo.api_base_url '{}'", self.duckduckgo.api_base_url))?;
        Ok(())
    }

    /// Upstream request timeout
    pub fn timeout(&self) -> Duration {
        self.http.timeout()
    }

    /// Deadline for a whole tool call, rate-limit wait included
    pub fn call_timeout(&self) -> Duration {
        match self.server.call_timeout_seconds {
            Some(secs) => Duration::from_secs(secs),
            None => self.timeout() + Duration::from_secs(5),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.search.cache_ttl_seconds)
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}
