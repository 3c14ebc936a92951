//! Configuration settings structures for tmdb-addon
//!
//! This module defines all configuration structures that can be loaded from
//! TOML files and environment variables.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cache::CachePolicies;
use crate::config::error::ConfigError;
use crate::logger::{ConsoleConfig, FileConfig, LogFormat, LoggerConfig};

// ============================================================================
// Default value functions
// ============================================================================

fn default_app_name() -> String {
    "tmdb-addon".to_string()
}

fn default_app_version() -> String {
    crate::pkg_version().to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    1337
}

fn default_request_timeout() -> u64 {
    30
}

fn default_configure_dir() -> String {
    "configure".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_path() -> String {
    "logs/tmdb-addon.log".to_string()
}

fn default_console_format() -> String {
    "full".to_string()
}

fn default_file_format() -> String {
    "json".to_string()
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_rpdb_base_url() -> String {
    "https://api.ratingposterdb.com".to_string()
}

fn default_rpdb_timeout() -> u64 {
    3
}

// ============================================================================
// Application Configuration
// ============================================================================

/// Application basic information configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Application version
    #[serde(default = "default_app_version")]
    pub version: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_app_version(),
        }
    }
}

// ============================================================================
// Server Configuration
// ============================================================================

/// Axum HTTP server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Directory holding the static configuration page
    #[serde(default = "default_configure_dir")]
    pub configure_dir: String,
}

impl ServerConfig {
    /// Get the full server address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            configure_dir: default_configure_dir(),
        }
    }
}

// ============================================================================
// Upstream Configuration
// ============================================================================

/// TMDB API access
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmdbConfig {
    /// API key (v3). Keep it out of committed files; use TMDB_ADDON_TMDB__API_KEY.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_tmdb_base_url")]
    pub base_url: String,

    #[serde(default = "default_tmdb_image_base_url")]
    pub image_base_url: String,

    /// Language used when the add-on configuration names none
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_upstream_timeout")]
    pub request_timeout: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_tmdb_base_url(),
            image_base_url: default_tmdb_image_base_url(),
            default_language: default_language(),
            request_timeout: default_upstream_timeout(),
        }
    }
}

/// Rating poster (RPDB) lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpdbConfig {
    #[serde(default = "default_rpdb_base_url")]
    pub base_url: String,

    /// Timeout in seconds for the poster availability check
    #[serde(default = "default_rpdb_timeout")]
    pub request_timeout: u64,
}

impl Default for RpdbConfig {
    fn default() -> Self {
        Self {
            base_url: default_rpdb_base_url(),
            request_timeout: default_rpdb_timeout(),
        }
    }
}

// ============================================================================
// Logger Settings
// ============================================================================

/// Console output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleSettings {
    /// Whether console output is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether to use colored output
    #[serde(default = "default_true")]
    pub colored: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_console_format")]
    pub format: String,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            colored: default_true(),
            format: default_console_format(),
        }
    }
}

/// File output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSettings {
    /// Whether file output is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Path to the log file
    #[serde(default = "default_log_path")]
    pub path: String,

    /// Whether to append to existing file
    #[serde(default = "default_true")]
    pub append: bool,

    /// Log format: "full", "compact", or "json"
    #[serde(default = "default_file_format")]
    pub format: String,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: default_log_path(),
            append: default_true(),
            format: default_file_format(),
        }
    }
}

/// Logger configuration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output settings
    #[serde(default)]
    pub console: ConsoleSettings,

    /// File output settings
    #[serde(default)]
    pub file: FileSettings,
}

impl Default for LoggerSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            console: ConsoleSettings::default(),
            file: FileSettings::default(),
        }
    }
}

fn parse_format(field: &str, format: &str) -> Result<LogFormat, ConfigError> {
    format
        .parse::<LogFormat>()
        .map_err(|e| ConfigError::ValidationError {
            field: field.to_string(),
            message: e.to_string(),
        })
}

impl LoggerSettings {
    /// Convert the file representation into the runtime LoggerConfig
    pub fn into_logger_config(self) -> Result<LoggerConfig, ConfigError> {
        let console_config = self.console.into_console_config()?;
        let file_config = self.file.into_file_config()?;

        LoggerConfig::new(console_config, file_config, self.level).map_err(|e| {
            ConfigError::ValidationError {
                field: "logger".to_string(),
                message: e.to_string(),
            }
        })
    }
}

impl ConsoleSettings {
    pub fn into_console_config(self) -> Result<ConsoleConfig, ConfigError> {
        let format = parse_format("logger.console.format", &self.format)?;
        Ok(ConsoleConfig::new(self.enabled, self.colored, format))
    }
}

impl FileSettings {
    pub fn into_file_config(self) -> Result<FileConfig, ConfigError> {
        let format = parse_format("logger.file.format", &self.format)?;

        FileConfig::new(self.enabled, PathBuf::from(self.path), self.append, format).map_err(
            |e| ConfigError::ValidationError {
                field: "logger.file".to_string(),
                message: e.to_string(),
            },
        )
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

fn default_cache_max_size() -> usize {
    10_000
}

fn default_cache_directory() -> String {
    "cache".to_string()
}

fn default_cache_retention() -> u64 {
    60 * 24 * 60 * 60
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_redis_pool_size() -> u32 {
    4
}

fn default_redis_connection_timeout() -> u64 {
    5
}

fn default_redis_key_prefix() -> String {
    "tmdb-addon".to_string()
}

fn default_wait_budget_ms() -> u64 {
    2000
}

fn default_fetch_timeout_seconds() -> u64 {
    15
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_fetch_lease_seconds() -> u64 {
    60
}

/// Cache backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Disk,
    Redis,
}

/// Memory cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries held before least-recently-used eviction
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
        }
    }
}

/// Disk cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskCacheConfig {
    /// Directory to store cache files
    #[serde(default = "default_cache_directory")]
    pub directory: String,

    /// Seconds an entry is kept on disk; must cover the longest stale window
    #[serde(default = "default_cache_retention")]
    pub retention_seconds: u64,
}

impl Default for DiskCacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            retention_seconds: default_cache_retention(),
        }
    }
}

/// Redis cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedisCacheConfig {
    /// Redis connection URL (`rediss://` for TLS)
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_redis_connection_timeout")]
    pub connection_timeout: u64,

    /// Key prefix for all cache entries
    #[serde(default = "default_redis_key_prefix")]
    pub key_prefix: String,

    /// Seconds an entry is kept; must cover the longest stale window
    #[serde(default = "default_cache_retention")]
    pub retention_seconds: u64,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            connection_timeout: default_redis_connection_timeout(),
            key_prefix: default_redis_key_prefix(),
            retention_seconds: default_cache_retention(),
        }
    }
}

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend type
    #[serde(default)]
    pub backend: CacheBackend,

    /// Memory cache settings
    #[serde(default)]
    pub memory: MemoryCacheConfig,

    /// Disk cache settings
    #[serde(default)]
    pub disk: DiskCacheConfig,

    /// Redis cache settings
    #[serde(default)]
    pub redis: RedisCacheConfig,

    /// Milliseconds a caller holding a stale value waits for a refresh
    #[serde(default = "default_wait_budget_ms")]
    pub wait_budget_ms: u64,

    /// Bound in seconds on each upstream fetch
    #[serde(default = "default_fetch_timeout_seconds")]
    pub fetch_timeout_seconds: u64,

    /// Milliseconds between checks of a fetch marker held by another process
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Seconds after which an unreleased fetch marker counts as abandoned
    #[serde(default = "default_fetch_lease_seconds")]
    pub fetch_lease_seconds: u64,

    /// Freshness windows per call site
    #[serde(default)]
    pub policies: CachePolicies,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            memory: MemoryCacheConfig::default(),
            disk: DiskCacheConfig::default(),
            redis: RedisCacheConfig::default(),
            wait_budget_ms: default_wait_budget_ms(),
            fetch_timeout_seconds: default_fetch_timeout_seconds(),
            poll_interval_ms: default_poll_interval_ms(),
            fetch_lease_seconds: default_fetch_lease_seconds(),
            policies: CachePolicies::default(),
        }
    }
}

// ============================================================================
// Main Settings Structure
// ============================================================================

/// Complete application settings
///
/// This structure represents the entire configuration that can be loaded
/// from TOML files and environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application information
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// TMDB access
    #[serde(default)]
    pub tmdb: TmdbConfig,

    /// Rating poster lookups
    #[serde(default)]
    pub rpdb: RpdbConfig,

    /// Logger configuration
    #[serde(default)]
    pub logger: LoggerSettings,

    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FreshnessWindow;
    use proptest::prelude::*;

    fn arb_server_config() -> impl Strategy<Value = ServerConfig> {
        (
            prop_oneof![
                Just("127.0.0.1".to_string()),
                Just("0.0.0.0".to_string()),
                Just("localhost".to_string()),
            ],
            1u16..=65535u16,
            1u64..=300u64,
            "[a-z]{1,12}",
        )
            .prop_map(|(host, port, request_timeout, configure_dir)| ServerConfig {
                host,
                port,
                request_timeout,
                configure_dir,
            })
    }

    fn arb_window() -> impl Strategy<Value = FreshnessWindow> {
        (
            proptest::option::of(1u64..10_000_000),
            proptest::option::of(1u64..10_000_000),
            proptest::option::of(1u64..10_000_000),
        )
            .prop_map(|(max_age, swr, sie)| FreshnessWindow::new(max_age, swr, sie))
    }

    fn arb_cache_config() -> impl Strategy<Value = CacheConfig> {
        (
            prop_oneof![
                Just(CacheBackend::Memory),
                Just(CacheBackend::Disk),
                Just(CacheBackend::Redis),
            ],
            1usize..100_000,
            1u64..10_000,
            1u64..120,
            arb_window(),
            arb_window(),
        )
            .prop_map(
                |(backend, max_size, wait_budget_ms, fetch_timeout_seconds, manifest, catalog)| {
                    CacheConfig {
                        backend,
                        memory: MemoryCacheConfig { max_size },
                        wait_budget_ms,
                        fetch_timeout_seconds,
                        policies: CachePolicies {
                            manifest,
                            catalog,
                            ..Default::default()
                        },
                        ..Default::default()
                    }
                },
            )
    }

    fn arb_settings() -> impl Strategy<Value = Settings> {
        (arb_server_config(), arb_cache_config(), "[a-z]{2}-[A-Z]{2}").prop_map(
            |(server, cache, language)| Settings {
                server,
                cache,
                tmdb: TmdbConfig {
                    default_language: language,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_settings_round_trip_serialization(settings in arb_settings()) {
            let toml_str = toml::to_string(&settings)
                .expect("Settings should serialize to TOML");
            let deserialized: Settings = toml::from_str(&toml_str)
                .expect("Serialized settings should deserialize");
            prop_assert_eq!(settings, deserialized);
        }
    }

    #[test]
    fn test_server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 1337);
        assert_eq!(config.request_timeout, 30);
        assert_eq!(config.configure_dir, "configure");
        assert_eq!(config.address(), "127.0.0.1:1337");
    }

    #[test]
    fn test_tmdb_config_defaults() {
        let config = TmdbConfig::default();
        assert!(config.api_key.is_empty());
        assert_eq!(config.base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.default_language, "en-US");
    }

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.wait_budget_ms, 2000);
        assert_eq!(config.fetch_timeout_seconds, 15);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.fetch_lease_seconds, 60);
        assert_eq!(config.disk.retention_seconds, 60 * 86_400);
    }

    #[test]
    fn test_settings_deserialize_partial() {
        let toml_str = r#"
[server]
port = 8080

[tmdb]
api_key = "abc"
"#;
        let settings: Settings = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.tmdb.api_key, "abc");
        assert_eq!(settings.cache, CacheConfig::default());
        assert_eq!(settings.logger, LoggerSettings::default());
    }

    #[test]
    fn test_cache_policies_from_toml() {
        let toml_str = r#"
[cache]
backend = "redis"

[cache.policies.catalog]
max_age = 3600
stale_while_revalidate = 7200

[cache.policies.meta]
series_ongoing_max_age = 43200
"#;
        let settings: Settings = toml::from_str(toml_str).expect("Failed to deserialize");
        let policies = settings.cache.policies;
        assert_eq!(settings.cache.backend, CacheBackend::Redis);
        assert_eq!(policies.catalog, FreshnessWindow::new(Some(3600), Some(7200), None));
        assert_eq!(policies.meta.series_ongoing_max_age, Some(43_200));
        assert_eq!(policies.meta.movie_max_age, Some(14 * 86_400));
        assert_eq!(policies.manifest, CachePolicies::default().manifest);
    }

    #[test]
    fn test_cache_policy_aliases() {
        let toml_str = r#"
[cache.policies.catalog]
cacheMaxAge = 60
staleRevalidate = 120
staleError = 240
"#;
        let settings: Settings = toml::from_str(toml_str).expect("Failed to deserialize");
        assert_eq!(
            settings.cache.policies.catalog,
            FreshnessWindow::new(Some(60), Some(120), Some(240))
        );
    }

    #[test]
    fn test_logger_settings_into_logger_config() {
        let settings = LoggerSettings {
            level: "debug".to_string(),
            console: ConsoleSettings {
                enabled: true,
                colored: false,
                format: "compact".to_string(),
            },
            file: FileSettings::default(),
        };
        let config = settings.into_logger_config().unwrap();
        assert_eq!(config.level, "debug");
        assert_eq!(config.console.format, LogFormat::Compact);
        assert!(!config.file.enabled);
    }

    #[test]
    fn test_logger_settings_invalid_format() {
        let settings = LoggerSettings {
            file: FileSettings {
                format: "xml".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        match settings.into_logger_config() {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "logger.file.format")
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    #[test]
    fn test_logger_settings_both_disabled() {
        let settings = LoggerSettings {
            console: ConsoleSettings {
                enabled: false,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(settings.into_logger_config().is_err());
    }
}
