use core_types::DataMode;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// The root configuration structure for the entire application.
///
/// Every section has defaults, so an empty `config.toml` (or none at all) yields
/// a working mock-mode setup.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub etsy: EtsyConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Where the HTTP API listens and who may call it from a browser.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:3001".to_string(),
            ],
        }
    }
}

/// Settings for talking to the Etsy Open API, or for standing in for it.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EtsyConfig {
    pub mode: DataMode,
    pub base_url: String,
    /// OAuth2 token endpoint used for the `refresh_token` grant.
    pub token_url: String,
    pub client_id: Option<String>,
    /// Read from `ETSY_CLIENT_SECRET` / `ETSY_REDIRECT_URI` for the OAuth login
    /// flow that issues the tokens below. The `refresh_token` grant needs
    /// neither, so nothing in this service reads them.
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Retries after the first attempt. Total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// One unit of backoff. 5xx and network errors wait one unit,
    /// 429s wait `unit * 2^attempt`.
    pub backoff_unit_ms: u64,
    /// Directories searched, in order, for `<fixture>.json` in mock mode.
    pub fixture_dirs: Vec<PathBuf>,
}

impl Default for EtsyConfig {
    fn default() -> Self {
        Self {
            mode: DataMode::Mock,
            base_url: "https://openapi.etsy.com/v3/application".to_string(),
            token_url: "https://api.etsy.com/v3/public/oauth/token".to_string(),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            access_token: None,
            refresh_token: None,
            timeout_secs: 30,
            max_retries: 3,
            backoff_unit_ms: 1000,
            fixture_dirs: vec![PathBuf::from("fixtures"), PathBuf::from("api/fixtures")],
        }
    }
}

impl EtsyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_unit(&self) -> Duration {
        Duration::from_millis(self.backoff_unit_ms)
    }
}

/// Which store backs the response cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub redis_url: String,
    /// Lifetime of a cached upstream response.
    pub ttl_secs: u64,
    /// How often the server sweeps expired entries out of the memory cache.
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            ttl_secs: 60,
            sweep_interval_secs: 300,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter directive when `RUST_LOG` is not set.
    pub level: String,
    /// When set, logs are also written to a daily-rolling file in this directory.
    pub directory: Option<PathBuf>,
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
            file_prefix: "etsynova.log".to_string(),
        }
    }
}
