use crate::error::ConfigError;
use config::builder::{ConfigBuilder, DefaultState};
use std::collections::HashMap;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{CacheBackend, CacheConfig, Config, EtsyConfig, LoggingConfig, ServerConfig};

/// The file read by [`load_config`] when present.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix for structured environment overrides, e.g. `ETSYNOVA__SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "ETSYNOVA";

/// Loads the application configuration.
///
/// Sources, lowest to highest precedence: built-in defaults, `config.toml`
/// (optional), `ETSYNOVA__*` environment variables, then the legacy variable
/// names (`MOCK_MODE`, `ETSY_CLIENT_ID`, `USE_REDIS_CACHE`, ...). A `.env` file
/// in the working directory is loaded first if one exists.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    load_config_from(Path::new(DEFAULT_CONFIG_FILE), std::env::vars().collect())
}

/// Same as [`load_config`] but with an explicit file and environment snapshot.
pub fn load_config_from(path: &Path, env: HashMap<String, String>) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("server.cors_origins")
                .with_list_parse_key("etsy.fixture_dirs")
                .source(Some(env.clone())),
        );
    let builder = apply_legacy_overrides(builder, &env)?;

    let config = builder.build()?.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}

/// Maps the environment variable names used by earlier deployments onto config keys.
fn apply_legacy_overrides(
    mut builder: ConfigBuilder<DefaultState>,
    env: &HashMap<String, String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    if let Some(flag) = env.get("MOCK_MODE") {
        let mode = if flag == "true" { "mock" } else { "live" };
        builder = builder.set_override("etsy.mode", mode)?;
    }
    if let Some(flag) = env.get("USE_REDIS_CACHE") {
        let backend = if flag == "true" { "redis" } else { "memory" };
        builder = builder.set_override("cache.backend", backend)?;
    }

    let passthrough = [
        ("ETSY_CLIENT_ID", "etsy.client_id"),
        ("ETSY_CLIENT_SECRET", "etsy.client_secret"),
        ("ETSY_REDIRECT_URI", "etsy.redirect_uri"),
        ("ETSY_ACCESS_TOKEN", "etsy.access_token"),
        ("ETSY_REFRESH_TOKEN", "etsy.refresh_token"),
        ("REDIS_URL", "cache.redis_url"),
    ];
    for (var, key) in passthrough {
        builder = builder.set_override_option(key, env.get(var).cloned())?;
    }

    Ok(builder)
}

impl Config {
    /// Rejects settings that would only fail later, at request time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server.port must be non-zero".to_string(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.ttl_secs must be at least 1".to_string(),
            ));
        }
        if self.cache.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if !self.etsy.mode.is_mock() && self.etsy.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "etsy.base_url is required in live mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::DataMode;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config_from(Path::new("does-not-exist.toml"), HashMap::new()).unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.etsy.mode, DataMode::Mock);
        assert_eq!(config.etsy.max_retries, 3);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
        assert_eq!(config.cache.ttl_secs, 60);
    }

    #[test]
    fn file_values_override_defaults() {
        let file = toml_file(
            r#"
            [server]
            port = 9100

            [etsy]
            mode = "live"
            client_id = "abc"
            max_retries = 5

            [cache]
            ttl_secs = 15
            "#,
        );
        let config = load_config_from(file.path(), HashMap::new()).unwrap();
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.etsy.mode, DataMode::Live);
        assert_eq!(config.etsy.client_id.as_deref(), Some("abc"));
        assert_eq!(config.etsy.max_retries, 5);
        assert_eq!(config.cache.ttl_secs, 15);
    }

    #[test]
    fn prefixed_env_overrides_file() {
        let file = toml_file("[server]\nport = 9100\n");
        let config = load_config_from(
            file.path(),
            env(&[
                ("ETSYNOVA__SERVER__PORT", "9200"),
                ("ETSYNOVA__SERVER__CORS_ORIGINS", "http://a.test,http://b.test"),
            ]),
        )
        .unwrap();
        assert_eq!(config.server.port, 9200);
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
    }

    #[test]
    fn legacy_variables_are_honoured() {
        let config = load_config_from(
            Path::new("does-not-exist.toml"),
            env(&[
                ("MOCK_MODE", "false"),
                ("ETSY_CLIENT_ID", "client-123"),
                ("USE_REDIS_CACHE", "true"),
                ("REDIS_URL", "redis://cache:6379"),
            ]),
        )
        .unwrap();
        assert_eq!(config.etsy.mode, DataMode::Live);
        assert_eq!(config.etsy.client_id.as_deref(), Some("client-123"));
        assert_eq!(config.cache.backend, CacheBackend::Redis);
        assert_eq!(config.cache.redis_url, "redis://cache:6379");
    }

    #[test]
    fn login_flow_settings_parse_from_legacy_names() {
        let config = load_config_from(
            Path::new("does-not-exist.toml"),
            env(&[
                ("ETSY_CLIENT_SECRET", "shh"),
                ("ETSY_REDIRECT_URI", "http://localhost:8000/auth/callback"),
            ]),
        )
        .unwrap();
        assert_eq!(config.etsy.client_secret.as_deref(), Some("shh"));
        assert_eq!(
            config.etsy.redirect_uri.as_deref(),
            Some("http://localhost:8000/auth/callback")
        );
    }

    #[test]
    fn mock_mode_true_selects_fixtures() {
        let config = load_config_from(
            Path::new("does-not-exist.toml"),
            env(&[("MOCK_MODE", "true")]),
        )
        .unwrap();
        assert!(config.etsy.mode.is_mock());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let file = toml_file("[cache]\nttl_secs = 0\n");
        let err = load_config_from(file.path(), HashMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn live_mode_needs_a_base_url() {
        let mut config = Config::default();
        config.etsy.mode = DataMode::Live;
        config.etsy.base_url = String::new();
        assert!(config.validate().is_err());
    }
}
