//! Installation configuration file.
//!
//! One JSON file describes one installation:
//!
//! ```json
//! {
//!   "feed": "editorial",
//!   "install_id": "42",
//!   "api_key": "…",
//!   "state_dir": "/var/lib/feedsync/42/state",
//!   "store_dir": "/var/lib/feedsync/42/articles",
//!   "log_file": "/var/log/feedsync/42.jsonl"
//! }
//! ```
//!
//! `endpoint` and `page_limit` default per feed; `max_pages` and `log_file`
//! are optional.

use feedsync_engine::{HttpFetcherConfig, SyncConfig};
use feedsync_protocol::FeedKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the cursor slot inside `state_dir`.
pub const CURSOR_FILE: &str = "last-id";

/// Errors raised while loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid JSON for this schema.
    #[error("cannot parse config {}: {source}", path.display())]
    Parse {
        /// Config path.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// A field has an unusable value.
    #[error("invalid config field `{field}`: {reason}")]
    Invalid {
        /// Field name.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

/// The on-disk shape of a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Feed type.
    pub feed: FeedKind,
    /// Stream endpoint; defaults per feed.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Installation ID.
    pub install_id: String,
    /// API key.
    pub api_key: String,
    /// Events requested per page; defaults per feed.
    #[serde(default)]
    pub page_limit: Option<u32>,
    /// Optional bound on pages per run.
    #[serde(default)]
    pub max_pages: Option<u32>,
    /// Directory holding the cursor slot and the installation lock.
    pub state_dir: PathBuf,
    /// Directory holding stored records.
    pub store_dir: PathBuf,
    /// JSON-lines progress log.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Page size.
    pub page_limit: Option<u32>,
    /// Page bound.
    pub max_pages: Option<u32>,
}

/// A validated configuration with all defaults filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Feed type.
    pub feed: FeedKind,
    /// Stream endpoint.
    pub endpoint: String,
    /// Installation ID.
    pub install_id: String,
    /// API key.
    pub api_key: String,
    /// Events requested per page.
    pub page_limit: u32,
    /// Optional bound on pages per run.
    pub max_pages: Option<u32>,
    /// Cursor slot and lock directory.
    pub state_dir: PathBuf,
    /// Record directory.
    pub store_dir: PathBuf,
    /// JSON-lines progress log.
    pub log_file: Option<PathBuf>,
}

impl ConfigFile {
    /// Reads a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Applies overrides and defaults, then validates the result.
    pub fn resolve(self, overrides: &Overrides) -> Result<Settings, ConfigError> {
        let settings = Settings {
            endpoint: self
                .endpoint
                .unwrap_or_else(|| self.feed.default_endpoint().to_string()),
            page_limit: overrides
                .page_limit
                .or(self.page_limit)
                .unwrap_or_else(|| self.feed.default_page_limit()),
            max_pages: overrides.max_pages.or(self.max_pages),
            feed: self.feed,
            install_id: self.install_id,
            api_key: self.api_key,
            state_dir: self.state_dir,
            store_dir: self.store_dir,
            log_file: self.log_file,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl Settings {
    /// Loads, resolves and validates a configuration file.
    pub fn load(path: &Path, overrides: &Overrides) -> Result<Self, ConfigError> {
        ConfigFile::load(path)?.resolve(overrides)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.install_id.trim().is_empty() {
            return Err(invalid("install_id", "must not be empty"));
        }
        if self.api_key.trim().is_empty() {
            return Err(invalid("api_key", "must not be empty"));
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(invalid(
                "endpoint",
                format!("{:?} is not an http(s) URL", self.endpoint),
            ));
        }
        if self.page_limit == 0 {
            return Err(invalid("page_limit", "must be at least 1"));
        }
        if self.max_pages == Some(0) {
            return Err(invalid("max_pages", "must be at least 1"));
        }
        if self.state_dir == self.store_dir {
            return Err(invalid(
                "store_dir",
                "must differ from state_dir",
            ));
        }
        Ok(())
    }

    /// Path of the cursor slot.
    pub fn cursor_path(&self) -> PathBuf {
        self.state_dir.join(CURSOR_FILE)
    }

    /// Engine configuration.
    pub fn sync_config(&self) -> SyncConfig {
        let config = SyncConfig::new(self.page_limit);
        match self.max_pages {
            Some(max_pages) => config.with_max_pages(max_pages),
            None => config,
        }
    }

    /// HTTP fetcher configuration.
    pub fn fetcher_config(&self) -> HttpFetcherConfig {
        HttpFetcherConfig::new(&self.endpoint, &self.install_id, &self.api_key)
    }
}
