//! Layered configuration.
//!
//! Sources are merged in order, later ones winning:
//! 1. Built-in defaults
//! 2. `./twixter.toml` (or an explicit path)
//! 3. Environment variables prefixed with `TWIXTER_`, nested keys joined by
//!    a double underscore (`TWIXTER_SOURCE__BEARER_TOKEN` -> `source.bearer_token`)
//!
//! Example file:
//! ```toml
//! [database]
//! url = "sqlite://twixter.db?mode=rwc"
//!
//! # Used when database.url is unset.
//! [postgres]
//! user = "twixter"
//! password = "secret"
//! host = "localhost"
//! port = 5432
//! db = "twixter"
//! sslmode = "disable"
//!
//! [source]
//! base_url = "https://api.twitter.com"
//! bearer_token = "AAAA..."
//! requests_per_second = 1
//! timeout_secs = 30
//!
//! [sync]
//! page_size = 200
//! max_retries = 3
//! page_timeout_secs = 30
//! concurrency = 4
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::retry::RetryConfig;
use crate::source::{ApiRateLimiter, DEFAULT_BASE_URL, FetchOptions, MAX_PAGE_SIZE};
use crate::source::rate_limit::DEFAULT_RPS;
use crate::sync::{DEFAULT_CONCURRENCY, SyncOptions};

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "twixter.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TWIXTER";

/// Database used when nothing is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://twixter.db?mode=rwc";

const DEFAULT_POSTGRES_PORT: i64 = 5432;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required setting `{key}`")]
    Missing { key: &'static str },

    #[error("invalid setting `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Key/value lookups over a configuration source.
pub trait ConfigGetter {
    /// A string setting, or `None` when absent.
    fn get_string(&self, key: &str) -> Option<String>;

    /// An integer setting, or `None` when absent or not an integer.
    fn get_int(&self, key: &str) -> Option<i64>;
}

impl ConfigGetter for Config {
    fn get_string(&self, key: &str) -> Option<String> {
        Config::get_string(self, key).ok()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        Config::get_int(self, key).ok()
    }
}

impl ConfigGetter for HashMap<String, String> {
    fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }

    fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.trim().parse().ok())
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Resolved from `database.url` or the `postgres.*` keys.
    #[serde(skip)]
    pub database: DatabaseSettings,
    pub source: SourceSettings,
    pub sync: SyncSettings,
}

impl Settings {
    /// Load from `./twixter.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load from an explicit file (or the default one) and the environment.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading config file");
        }

        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(&config)
    }

    /// Deserialize settings from an already-built config.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let mut settings: Settings = config.clone().try_deserialize()?;
        settings.database = DatabaseSettings::from_getter(config)?;
        Ok(settings)
    }
}

/// Database settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// Connection URL (`sqlite://...` or `postgres://...`).
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

impl DatabaseSettings {
    /// Resolve the database URL.
    ///
    /// `database.url` wins when set. Otherwise a Postgres URL is assembled
    /// from `postgres.{user,password,host,port,db,sslmode}` when
    /// `postgres.host` is set. Otherwise the SQLite default is used.
    pub fn from_getter(getter: &impl ConfigGetter) -> Result<Self, ConfigError> {
        if let Some(url) = non_empty(getter.get_string("database.url")) {
            return Ok(Self { url });
        }

        let Some(host) = non_empty(getter.get_string("postgres.host")) else {
            return Ok(Self::default());
        };

        let invalid = |message: String| ConfigError::Invalid {
            key: "postgres",
            message,
        };

        let mut url = Url::parse(&format!("postgres://{host}"))
            .map_err(|e| invalid(format!("bad host {host:?}: {e}")))?;

        let user = non_empty(getter.get_string("postgres.user")).unwrap_or_else(|| "postgres".into());
        url.set_username(&user)
            .map_err(|_| invalid(format!("cannot set user {user:?}")))?;

        if let Some(password) = non_empty(getter.get_string("postgres.password")) {
            url.set_password(Some(&password))
                .map_err(|_| invalid("cannot set password".to_string()))?;
        }

        let port = getter.get_int("postgres.port").unwrap_or(DEFAULT_POSTGRES_PORT);
        let port = u16::try_from(port).map_err(|_| ConfigError::Invalid {
            key: "postgres.port",
            message: format!("{port} is not a valid port"),
        })?;
        url.set_port(Some(port))
            .map_err(|_| invalid(format!("cannot set port {port}")))?;

        let db = non_empty(getter.get_string("postgres.db")).ok_or(ConfigError::Missing {
            key: "postgres.db",
        })?;
        url.set_path(&db);

        if let Some(sslmode) = non_empty(getter.get_string("postgres.sslmode")) {
            url.query_pairs_mut().append_pair("sslmode", &sslmode);
        }

        Ok(Self { url: url.into() })
    }
}

/// Source API settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub base_url: String,
    /// App bearer token. Required to build a client.
    pub bearer_token: Option<String>,
    /// Proactive pacing; 0 disables the limiter.
    pub requests_per_second: u32,
    /// Per-request HTTP timeout.
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bearer_token: None,
            requests_per_second: DEFAULT_RPS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl SourceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Build the configured rate limiter, if pacing is enabled.
    pub fn rate_limiter(&self) -> Option<ApiRateLimiter> {
        (self.requests_per_second > 0).then(|| ApiRateLimiter::new(self.requests_per_second))
    }

    /// The bearer token, or an error when it is unset.
    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.bearer_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key: "source.bearer_token",
            })
    }

    /// Build an HTTP client from these settings.
    #[cfg(feature = "twitter")]
    pub fn build_client(&self) -> Result<crate::source::TwitterClient, ConfigError> {
        let token = self.require_token()?;
        crate::source::TwitterClient::new(
            &self.base_url,
            token,
            self.timeout(),
            self.rate_limiter(),
        )
        .map_err(|e| ConfigError::Invalid {
            key: "source",
            message: e.to_string(),
        })
    }
}

/// Sync defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    pub page_size: u32,
    /// Retries per page after the first attempt.
    pub max_retries: usize,
    pub page_timeout_secs: u64,
    /// Users synced at once by `sync_users`.
    pub concurrency: usize,
    pub followings: bool,
    pub followers: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            max_retries: crate::retry::MAX_RETRIES,
            page_timeout_secs: DEFAULT_TIMEOUT_SECS,
            concurrency: DEFAULT_CONCURRENCY,
            followings: true,
            followers: true,
        }
    }
}

impl SyncSettings {
    /// Convert into engine options.
    pub fn to_options(&self) -> SyncOptions {
        let retry = RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        };

        SyncOptions {
            followings: self.followings,
            followers: self.followers,
            fetch: FetchOptions {
                page_size: self.page_size,
                retry,
                page_timeout: Duration::from_secs(self.page_timeout_secs),
            },
            concurrency: self.concurrency,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
