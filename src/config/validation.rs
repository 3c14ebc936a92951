//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    CacheBackend, CacheConfig, ConsoleSettings, FileSettings, LoggerSettings, RpdbConfig,
    ServerConfig, Settings, TmdbConfig,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

impl ServerConfig {
    /// Validate server configuration
    ///
    /// # Validation Rules
    /// - Port must be between 1 and 65535
    /// - Request timeout must be greater than 0
    /// - Configure directory must not be empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        if self.configure_dir.trim().is_empty() {
            return Err(ConfigError::validation(
                "server.configure_dir",
                "Configure directory cannot be empty.",
            ));
        }

        Ok(())
    }
}

impl TmdbConfig {
    /// Validate TMDB access configuration
    ///
    /// # Validation Rules
    /// - API key is required
    /// - Base URLs must be http(s)
    /// - Request timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::validation(
                "tmdb.api_key",
                "TMDB API key is required. Set it in the config file or TMDB_ADDON_TMDB__API_KEY.",
            ));
        }

        if !is_http_url(&self.base_url) {
            return Err(ConfigError::ValidationError {
                field: "tmdb.base_url".to_string(),
                message: format!("Invalid base URL '{}'. Expected http(s)://...", self.base_url),
            });
        }

        if !is_http_url(&self.image_base_url) {
            return Err(ConfigError::ValidationError {
                field: "tmdb.image_base_url".to_string(),
                message: format!(
                    "Invalid image base URL '{}'. Expected http(s)://...",
                    self.image_base_url
                ),
            });
        }

        if self.default_language.trim().is_empty() {
            return Err(ConfigError::validation(
                "tmdb.default_language",
                "Default language cannot be empty.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "tmdb.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl RpdbConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_http_url(&self.base_url) {
            return Err(ConfigError::ValidationError {
                field: "rpdb.base_url".to_string(),
                message: format!("Invalid base URL '{}'. Expected http(s)://...", self.base_url),
            });
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "rpdb.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

fn validate_format(field: &str, format: &str) -> Result<(), ConfigError> {
    if !VALID_LOG_FORMATS.contains(&format.to_lowercase().as_str()) {
        return Err(ConfigError::ValidationError {
            field: field.to_string(),
            message: format!(
                "Invalid log format '{}'. Valid formats are: {}",
                format,
                VALID_LOG_FORMATS.join(", ")
            ),
        });
    }
    Ok(())
}

impl ConsoleSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        validate_format("logger.console.format", &self.format)
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        validate_format("logger.file.format", &self.format)
    }
}

impl LoggerSettings {
    /// Validate logger settings
    ///
    /// # Validation Rules
    /// - Log level must be one of: trace, debug, info, warn, error
    /// - Formats must be one of: full, compact, json
    /// - If file logging is enabled, path must not be empty
    /// - At least one output must be enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.console.validate()?;
        self.file.validate()?;

        if !self.console.enabled && !self.file.enabled {
            return Err(ConfigError::validation(
                "logger",
                "At least one output (console or file) must be enabled.",
            ));
        }

        Ok(())
    }
}

impl CacheConfig {
    /// Validate cache configuration
    ///
    /// # Validation Rules
    /// - Fetch timeout, poll interval and lease must be greater than 0
    /// - The lease must not be shorter than the fetch timeout
    /// - Backend-specific sizes and retention must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fetch_timeout_seconds == 0 {
            return Err(ConfigError::validation(
                "cache.fetch_timeout_seconds",
                "Fetch timeout must be greater than 0 seconds.",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(ConfigError::validation(
                "cache.poll_interval_ms",
                "Poll interval must be greater than 0 milliseconds.",
            ));
        }

        if self.fetch_lease_seconds < self.fetch_timeout_seconds {
            return Err(ConfigError::ValidationError {
                field: "cache.fetch_lease_seconds".to_string(),
                message: format!(
                    "Fetch lease ({}s) cannot be shorter than the fetch timeout ({}s).",
                    self.fetch_lease_seconds, self.fetch_timeout_seconds
                ),
            });
        }

        match self.backend {
            CacheBackend::Memory => {
                if self.memory.max_size == 0 {
                    return Err(ConfigError::validation(
                        "cache.memory.max_size",
                        "Memory cache size must be greater than 0.",
                    ));
                }
            }
            CacheBackend::Disk => {
                if self.disk.directory.trim().is_empty() {
                    return Err(ConfigError::validation(
                        "cache.disk.directory",
                        "Disk cache directory cannot be empty.",
                    ));
                }
                if self.disk.retention_seconds == 0 {
                    return Err(ConfigError::validation(
                        "cache.disk.retention_seconds",
                        "Retention must be greater than 0 seconds.",
                    ));
                }
            }
            CacheBackend::Redis => {
                if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://")
                {
                    return Err(ConfigError::ValidationError {
                        field: "cache.redis.url".to_string(),
                        message: format!(
                            "Invalid Redis URL '{}'. Expected redis:// or rediss://",
                            self.redis.url
                        ),
                    });
                }
                if self.redis.pool_size == 0 {
                    return Err(ConfigError::validation(
                        "cache.redis.pool_size",
                        "Pool size must be greater than 0.",
                    ));
                }
                if self.redis.retention_seconds == 0 {
                    return Err(ConfigError::validation(
                        "cache.redis.retention_seconds",
                        "Retention must be greater than 0 seconds.",
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// This method validates all sub-configurations and returns the first
    /// validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.tmdb.validate()?;
        self.rpdb.validate()?;
        self.logger.validate()?;
        self.cache.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: ConfigError) -> String {
        match err {
            ConfigError::ValidationError { field, .. } => field,
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }

    fn tmdb() -> TmdbConfig {
        TmdbConfig {
            api_key: "0123456789abcdef".to_string(),
            ..Default::default()
        }
    }

    // ========================================================================
    // ServerConfig validation tests
    // ========================================================================

    #[test]
    fn test_server_config_valid() {
        assert!(ServerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_server_config_invalid_port_zero() {
        let config = ServerConfig {
            port: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "server.port");
    }

    #[test]
    fn test_server_config_invalid_request_timeout() {
        let config = ServerConfig {
            request_timeout: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "server.request_timeout");
    }

    // ========================================================================
    // Upstream validation tests
    // ========================================================================

    #[test]
    fn test_tmdb_config_requires_api_key() {
        let err = TmdbConfig::default().validate().unwrap_err();
        assert_eq!(field_of(err), "tmdb.api_key");
        assert!(tmdb().validate().is_ok());
    }

    #[test]
    fn test_tmdb_config_invalid_base_url() {
        let config = TmdbConfig {
            base_url: "api.themoviedb.org/3".to_string(),
            ..tmdb()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "tmdb.base_url");
    }

    #[test]
    fn test_rpdb_config_invalid_timeout() {
        let config = RpdbConfig {
            request_timeout: 0,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "rpdb.request_timeout");
    }

    // ========================================================================
    // LoggerSettings validation tests
    // ========================================================================

    #[test]
    fn test_logger_settings_invalid_level() {
        let settings = LoggerSettings {
            level: "loud".to_string(),
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.level");
    }

    #[test]
    fn test_logger_settings_invalid_console_format() {
        let mut settings = LoggerSettings::default();
        settings.console.format = "xml".to_string();
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.console.format");
    }

    #[test]
    fn test_logger_settings_file_path_required() {
        let mut settings = LoggerSettings::default();
        settings.file.enabled = true;
        settings.file.path = "  ".to_string();
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger.file.path");
    }

    #[test]
    fn test_logger_settings_needs_an_output() {
        let mut settings = LoggerSettings::default();
        settings.console.enabled = false;
        assert_eq!(field_of(settings.validate().unwrap_err()), "logger");
    }

    // ========================================================================
    // CacheConfig validation tests
    // ========================================================================

    #[test]
    fn test_cache_config_defaults_valid() {
        assert!(CacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_cache_config_lease_shorter_than_timeout() {
        let config = CacheConfig {
            fetch_timeout_seconds: 30,
            fetch_lease_seconds: 10,
            ..Default::default()
        };
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.fetch_lease_seconds");
    }

    #[test]
    fn test_cache_config_redis_url_scheme() {
        let mut config = CacheConfig {
            backend: CacheBackend::Redis,
            ..Default::default()
        };
        config.redis.url = "http://localhost:6379".to_string();
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.redis.url");

        config.redis.url = "rediss://cache.internal:6380".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cache_config_backend_specific_checks_only_apply_to_selected_backend() {
        let mut config = CacheConfig::default();
        config.redis.pool_size = 0;
        assert!(config.validate().is_ok());

        config.backend = CacheBackend::Redis;
        assert_eq!(field_of(config.validate().unwrap_err()), "cache.redis.pool_size");
    }

    // ========================================================================
    // Settings validation tests
    // ========================================================================

    #[test]
    fn test_settings_validate_reports_first_error() {
        let settings = Settings {
            tmdb: tmdb(),
            ..Default::default()
        };
        assert!(settings.validate().is_ok());

        let settings = Settings {
            server: ServerConfig {
                port: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(field_of(settings.validate().unwrap_err()), "server.port");
    }
}
