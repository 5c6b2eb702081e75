//! Application configuration, loaded from an optional YAML file

use crate::Result;
use anyhow::{anyhow, bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the config file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Concurrent lookups per check
    pub pool_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { pool_size: 5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisConfig {
    pub timeout_secs: u64,
    pub cache_ttl_hours: i64,
    /// MaxMind City database; when set, lookups stay offline
    pub mmdb_path: Option<PathBuf>,
}

impl Default for WhoisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            cache_ttl_hours: 24,
            mmdb_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub timeout_secs: u64,
    pub user_agents: Vec<String>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub connection_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            connection_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub cache_enabled: bool,
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            db_path: PathBuf::from("./data/cache.db"),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub worker: WorkerConfig,
    pub whois: WhoisConfig,
    pub quality: QualityConfig,
    pub proxy: ProxyConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load from `path`, or `config.yml` when `None`.
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_yaml(&contents)
                .with_context(|| format!("Failed to parse config {:?}", path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("Failed to read config {:?}", path)),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        // an empty document deserializes as unit, not as a map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.worker.pool_size = pool_size.max(1);
        self
    }

    pub fn with_mmdb_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.whois.mmdb_path = path;
        }
        self
    }

    pub fn with_db_path(mut self, path: PathBuf) -> Self {
        self.storage.db_path = path;
        self
    }

    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.storage.cache_enabled = enabled;
        self
    }

    pub fn whois_timeout(&self) -> Duration {
        Duration::from_secs(self.whois.timeout_secs)
    }

    /// Budget for a whole quality check, proxy connection included
    pub fn quality_timeout(&self) -> Duration {
        Duration::from_secs(self.quality.timeout_secs)
    }

    /// Budget for establishing the connection to a proxy
    pub fn proxy_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy.connection_timeout_secs)
    }

    /// Whois cache lifetime; must be non-negative and representable
    pub fn cache_ttl(&self) -> Result<chrono::Duration> {
        let hours = self.whois.cache_ttl_hours;
        if hours < 0 {
            bail!("whois.cache_ttl_hours must not be negative, got {}", hours);
        }
        chrono::Duration::try_hours(hours)
            .ok_or_else(|| anyhow!("whois.cache_ttl_hours is out of range: {}", hours))
    }

    /// Reject values that would misbehave at lookup time
    pub fn validate(&self) -> Result<()> {
        self.cache_ttl()?;
        Ok(())
    }
}
