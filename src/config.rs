//! Configuration management for shmupfetch
//!
//! This module provides unified configuration management with automatic
//! first-run initialization, multi-source loading, and zero-config defaults.
//! Catalog policy (developers, denylist, skip list, display names) lives here
//! as data so it can be edited without touching the pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::{
    CatalogConfig, CatalogFilter, ClientConfig, DownloadConfig, OrientationPolicy, RetryPolicy,
};
use crate::constants::{defaults, files, http, limits, mdk, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Destination and cache locations
    pub paths: PathsConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Retry settings shared by pages, probes and parts
    pub retry: RetryConfigToml,
    /// Download settings
    pub download: DownloadConfigToml,
    /// Catalog policy
    pub catalog: CatalogConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfigToml {
    /// Directory holding the ROM collection
    pub destination: PathBuf,
    /// Catalog store file (None = user cache directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_file: Option<PathBuf>,
}

impl Default for PathsConfigToml {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("./roms"),
            catalog_file: None,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Catalog site root
    pub base_url: String,
    /// User agent sent with every request
    pub user_agent: String,
    /// TCP keep-alive timeout in seconds (None = disabled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_keepalive_secs: Option<u64>,
    /// Connection pool idle timeout in seconds (None = no timeout)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_idle_timeout_secs: Option<u64>,
    /// Maximum idle connections per host
    pub pool_max_per_host: usize,
    /// Page and probe request timeout in seconds
    pub request_timeout_secs: u64,
    /// Single part download attempt timeout in seconds
    pub download_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            base_url: mdk::BASE_URL.to_string(),
            user_agent: http::USER_AGENT.to_string(),
            tcp_keepalive_secs: Some(30),
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            download_timeout_secs: (http::DEFAULT_TIMEOUT * 20).as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// TOML-friendly retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfigToml {
    /// Total attempts per request, including the first
    pub max_attempts: u32,
    /// Delay before the second attempt in milliseconds
    pub initial_delay_ms: u64,
    /// Cap on any single delay in seconds
    pub max_delay_secs: u64,
    /// Growth factor between delays
    pub multiplier: f64,
}

impl Default for RetryConfigToml {
    fn default() -> Self {
        Self {
            max_attempts: limits::MAX_ATTEMPTS,
            initial_delay_ms: limits::RETRY_BASE_DELAY_MS,
            max_delay_secs: limits::MAX_BACKOFF_SECS,
            multiplier: limits::BACKOFF_MULTIPLIER,
        }
    }
}

/// TOML-friendly download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfigToml {
    /// Entries downloaded concurrently
    pub workers: usize,
    /// Extension of assembled archives, without the dot
    pub archive_extension: String,
}

impl Default for DownloadConfigToml {
    fn default() -> Self {
        Self {
            workers: workers::DEFAULT_WORKER_COUNT,
            archive_extension: files::ARCHIVE_EXTENSION.to_string(),
        }
    }
}

/// TOML-friendly catalog policy
///
/// Map-valued fields come last: they render as TOML tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfigToml {
    /// How long a cached entry is trusted, e.g. "7days" or "12h"
    #[serde(with = "humantime_serde")]
    pub freshness: Duration,
    /// Upper bound on listing pages followed per manufacturer path
    pub max_listing_pages: usize,
    /// Title keywords marking non-shmup games
    pub denylist: Vec<String>,
    /// Identifiers always dropped from listings
    pub skip_identifiers: Vec<String>,
    /// Horizontally scrolling games
    pub horizontal: Vec<String>,
    /// Display-name overrides keyed by identifier
    pub display_names: BTreeMap<String, String>,
    /// Developer name -> manufacturer listing paths
    pub developers: BTreeMap<String, Vec<String>>,
}

impl Default for CatalogConfigToml {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            freshness: defaults::FRESHNESS_WINDOW,
            max_listing_pages: limits::MAX_LISTING_PAGES,
            denylist: owned(defaults::DENYLIST_KEYWORDS),
            skip_identifiers: owned(defaults::SKIP_IDENTIFIERS),
            horizontal: owned(defaults::HORIZONTAL_GAMES),
            display_names: defaults::DISPLAY_NAMES
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
            developers: defaults::DEVELOPERS
                .iter()
                .map(|(name, paths)| (name.to_string(), owned(paths)))
                .collect(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Everything the pipeline needs, resolved from an [`AppConfig`]
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub client: ClientConfig,
    pub catalog: CatalogConfig,
    pub download: DownloadConfig,
    /// Retry policy for pages and probes
    pub retry: RetryPolicy,
    pub destination: PathBuf,
    pub catalog_file: PathBuf,
    pub workers: usize,
    pub orientation: OrientationPolicy,
}

impl AppConfig {
    /// Validate and convert to runtime configuration
    pub fn to_runtime_config(&self) -> ConfigResult<RuntimeConfig> {
        self.validate()?;

        let client = self.client.to_runtime_config()?;
        let retry = self
            .retry
            .to_runtime_config()
            .with_attempt_timeout(client.request_timeout);
        let download = DownloadConfig {
            archive_extension: self.download.archive_extension.clone(),
            retry: retry.clone(),
        }
        .with_attempt_timeout(client.download_timeout);

        Ok(RuntimeConfig {
            catalog: self.catalog.to_runtime_config(client.base_url.clone()),
            client,
            download,
            retry,
            destination: self.paths.destination.clone(),
            catalog_file: self.paths.catalog_file(),
            workers: self.download.workers,
            orientation: OrientationPolicy::new(self.catalog.horizontal.iter()),
        })
    }

    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> ConfigResult<()> {
        if self.download.workers == 0 || self.download.workers > workers::MAX_WORKER_COUNT {
            return Err(invalid(
                "download.workers",
                self.download.workers,
                format!("Must be between 1 and {}", workers::MAX_WORKER_COUNT),
            ));
        }
        let extension = &self.download.archive_extension;
        if extension.is_empty() || extension.contains('.') || extension.contains('/') {
            return Err(invalid(
                "download.archive_extension",
                extension,
                "Must be a bare extension such as \"zip\"",
            ));
        }
        if self.client.rate_limit_rps == 0 {
            return Err(invalid("client.rate_limit_rps", 0, "Must be at least 1"));
        }
        if self.retry.max_attempts == 0 {
            return Err(invalid("retry.max_attempts", 0, "Must be at least 1"));
        }
        if self.retry.multiplier < 1.0 {
            return Err(invalid(
                "retry.multiplier",
                self.retry.multiplier,
                "Must be at least 1.0",
            ));
        }
        if self.catalog.developers.is_empty() {
            return Err(invalid(
                "catalog.developers",
                "{}",
                "At least one developer is required",
            ));
        }
        if let Some((name, _)) = self
            .catalog
            .developers
            .iter()
            .find(|(_, paths)| paths.is_empty())
        {
            return Err(invalid(
                &format!("catalog.developers.{}", name),
                "[]",
                "List at least one manufacturer path",
            ));
        }
        Ok(())
    }

    /// Load configuration with multi-source precedence:
    /// 1. Explicit `--config` file
    /// 2. `./shmupfetch.toml`
    /// 3. User config directory
    /// 4. Built-in defaults
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Initialize configuration on first run
    ///
    /// Creates a default config file in the user config directory if none
    /// exists. Returns the path when a file was written.
    pub async fn initialize_first_run() -> ConfigResult<Option<PathBuf>> {
        let Some(config_path) = Self::get_default_config_path() else {
            debug!("No user config directory, skipping first-run config");
            return Ok(None);
        };
        if config_path.exists() || PathBuf::from(files::LOCAL_CONFIG_FILE).exists() {
            return Ok(None);
        }

        info!("Creating default configuration file...");
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| ConfigError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let content = Self::generate_default_config_content()?;
        tokio::fs::write(&config_path, content)
            .await
            .map_err(|source| ConfigError::Io {
                path: config_path.clone(),
                source,
            })?;

        Ok(Some(config_path))
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let local = PathBuf::from(files::LOCAL_CONFIG_FILE);
        std::iter::once(local)
            .chain(Self::get_default_config_path())
            .find(|path| {
                let found = path.exists();
                if found {
                    debug!("Found config file: {}", path.display());
                }
                found
            })
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::APP_DIR).join("config.toml"))
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig =
            toml::from_str(&content).map_err(|source| ConfigError::InvalidFormat {
                path: path.to_path_buf(),
                source,
            })?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Render the default configuration with a short header
    pub fn generate_default_config_content() -> ConfigResult<String> {
        let body = toml::to_string_pretty(&Self::default())?;
        Ok(format!(
            "# shmupfetch configuration\n\
             # Generated on first run. Every field is optional; removed fields\n\
             # fall back to their defaults.\n\n{}",
            body
        ))
    }
}

impl PathsConfigToml {
    /// Resolved catalog store location
    pub fn catalog_file(&self) -> PathBuf {
        self.catalog_file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .map(|dir| dir.join(files::APP_DIR))
                .unwrap_or_else(|| PathBuf::from("."))
                .join(files::CATALOG_FILE)
        })
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ConfigResult<ClientConfig> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| invalid("client.base_url", &self.base_url, e.to_string()))?;

        Ok(ClientConfig {
            base_url,
            user_agent: self.user_agent.clone(),
            tcp_keepalive: self.tcp_keepalive_secs.map(Duration::from_secs),
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            pool_max_per_host: self.pool_max_per_host,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            download_timeout: Duration::from_secs(self.download_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
        })
    }
}

impl RetryConfigToml {
    /// Convert to runtime RetryPolicy
    pub fn to_runtime_config(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_secs(self.max_delay_secs),
            multiplier: self.multiplier,
            ..Default::default()
        }
    }
}

impl CatalogConfigToml {
    /// Convert to runtime CatalogConfig
    pub fn to_runtime_config(&self, base_url: Url) -> CatalogConfig {
        CatalogConfig {
            base_url,
            developers: self.developers.clone(),
            filter: CatalogFilter::new(&self.denylist, &self.skip_identifiers),
            display_names: self
                .display_names
                .iter()
                .map(|(id, name)| (id.to_lowercase(), name.clone()))
                .collect(),
            freshness_window: self.freshness,
            max_listing_pages: self.max_listing_pages,
        }
    }
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}
