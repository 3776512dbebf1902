use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Remote settings API; offline mode when the base URL is empty
    pub remote: RemoteApiConfig,
    pub cache: CacheConfig,
    pub autosave: AutoSaveConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteApiConfig {
    /// Base URL of the settings API, e.g. https://settings.example.com/api
    #[serde(default)]
    pub base_url: String,

    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory for the local fallback cache
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "default_quiet_period_ms")]
    pub quiet_period_ms: u64,

    /// Snapshot the document before each single-field edit
    #[serde(default = "default_true")]
    pub snapshot_on_edit: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationsConfig {
    /// Send emitted notifications to the remote endpoint instead of logging them
    #[serde(default)]
    pub dispatch_enabled: bool,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            dispatch_enabled: false,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_body_size() -> usize {
    1_048_576
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_remote_timeout() -> u64 {
    10
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/cache")
}
fn default_quiet_period_ms() -> u64 {
    5000
}
fn default_true() -> bool {
    true
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with SA__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("SA").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults and overrides only, without
    /// touching config files.
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "127.0.0.1"
            port = 8080
            request_timeout_secs = 30
            max_body_size = 1048576

            [logging]
            level = "info"
            format = "pretty"

            [remote]
            base_url = ""
            timeout_secs = 10

            [cache]
            dir = "data/cache"

            [autosave]
            quiet_period_ms = 5000
            snapshot_on_edit = true

            [notifications]
            dispatch_enabled = false
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(ConfigValidationError::InvalidValue(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            )));
        }

        let base_url = self.remote.base_url.as_str();
        if !base_url.is_empty()
            && !(base_url.starts_with("http://") || base_url.starts_with("https://"))
        {
            return Err(ConfigValidationError::InvalidValue(format!(
                "remote.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        if self.notifications.dispatch_enabled && base_url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "SA__REMOTE__BASE_URL must be set when notification dispatch is enabled"
                    .to_string(),
            ));
        }

        if self.cache.dir.as_os_str().is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "cache.dir cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn autosave_quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave.quiet_period_ms)
    }

    /// Whether a remote settings API is configured.
    pub fn remote_enabled(&self) -> bool {
        !self.remote.base_url.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_load_with_defaults() {
        let config = Config::load_for_test(&[]).expect("Failed to load config");

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.autosave_quiet_period(), Duration::from_secs(5));
        assert!(!config.remote_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_env_override() {
        let config = Config::load_for_test(&[
            ("server.port", "9000"),
            ("logging.level", "debug"),
            ("remote.base_url", "https://settings.example.com/api"),
            ("autosave.quiet_period_ms", "250"),
        ])
        .expect("Failed to load config");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert!(config.remote_enabled());
        assert_eq!(config.autosave_quiet_period(), Duration::from_millis(250));
    }

    #[test]
    fn test_config_validation_bad_remote_url() {
        let config = Config::load_for_test(&[("remote.base_url", "settings.example.com")])
            .expect("Failed to load config");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("remote.base_url"));
    }

    #[test]
    fn test_config_validation_dispatch_requires_remote() {
        let config = Config::load_for_test(&[("notifications.dispatch_enabled", "true")])
            .expect("Failed to load config");
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("SA__REMOTE__BASE_URL"));
    }

    #[test]
    fn test_config_validation_log_format() {
        let config = Config::load_for_test(&[("logging.format", "xml")])
            .expect("Failed to load config");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config::load_for_test(&[("server.host", "127.0.0.1"), ("server.port", "3000")])
            .expect("Failed to load config");

        let addr = config.socket_addr().unwrap();
        assert_eq!(addr.to_string(), "127.0.0.1:3000");
    }
}
