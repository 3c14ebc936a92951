//! Serve command handler
//!
//! Handles the serve command's dry-run validation. Server startup itself is
//! driven from main.rs.

use std::path::Path;

use crate::config::settings::{CacheBackend, Settings};
use crate::error::{AppError, AppResult};
use crate::server::Server;

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    /// Create a new serve command handler
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Execute the serve command with optional dry-run support
    ///
    /// # Errors
    /// - Configuration validation errors
    /// - Cache backend errors (dry-run opens the configured backend)
    pub async fn execute(&self, dry_run: bool) -> AppResult<()> {
        if dry_run {
            self.validate_only().await
        } else {
            Ok(())
        }
    }

    /// Validate configuration and open the cache backend without binding
    pub async fn validate_only(&self) -> AppResult<()> {
        self.config.validate()?;

        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        println!("✓ TMDB API key is configured ({})", self.tmdb_endpoint());
        println!("✓ Default language: {}", self.config.tmdb.default_language);

        Server::build_state(&self.config)
            .await
            .map_err(|source| AppError::Configuration {
                key: "cache".to_string(),
                source,
            })?;
        println!("✓ Cache backend is reachable: {}", self.cache_description());

        if !Path::new(&self.config.server.configure_dir).is_dir() {
            println!(
                "! Configure page directory not found: {} (/configure will return 404)",
                self.config.server.configure_dir
            );
        }

        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    fn tmdb_endpoint(&self) -> &str {
        self.config.tmdb.base_url.trim_end_matches('/')
    }

    fn cache_description(&self) -> String {
        let cache = &self.config.cache;
        match cache.backend {
            CacheBackend::Memory => format!("memory (max {} entries)", cache.memory.max_size),
            CacheBackend::Disk => format!("disk ({})", cache.disk.directory),
            CacheBackend::Redis => format!("redis (prefix {})", cache.redis.key_prefix),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.tmdb.api_key = "test-key".to_string();
        config
    }

    #[tokio::test]
    async fn test_serve_handler_new() {
        let config = create_valid_config();
        let handler = ServeCommandHandler::new(config.clone());
        assert_eq!(handler.config(), &config);
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run() {
        let handler = ServeCommandHandler::new(create_valid_config());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run_with_disk_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = create_valid_config();
        config.cache.backend = CacheBackend::Disk;
        config.cache.disk.directory = dir.path().to_string_lossy().into_owned();

        let handler = ServeCommandHandler::new(config);
        assert!(handler.execute(true).await.is_ok());
        assert_eq!(
            handler.cache_description(),
            format!("disk ({})", dir.path().to_string_lossy())
        );
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run_invalid_config() {
        let mut config = create_valid_config();
        config.server.port = 0;
        let handler = ServeCommandHandler::new(config);

        match handler.execute(true).await {
            Err(AppError::Configuration { key, .. }) => assert_eq!(key, "server.port"),
            other => panic!("Expected Configuration error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_serve_handler_without_dry_run_is_noop() {
        let handler = ServeCommandHandler::new(Settings::default());
        assert!(handler.execute(false).await.is_ok());
    }
}
