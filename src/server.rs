//! Server module for managing HTTP server lifecycle
//!
//! This module handles server initialization, startup, and graceful shutdown.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;

use crate::api::routes::create_router;
use crate::cache::CacheManager;
use crate::config::{Environment, settings::Settings};
use crate::external::{RpdbClient, TmdbClient};
use crate::services::{AddonService, Services};
use crate::state::AppState;

/// Name of the response cache, used as the disk directory and redis key namespace.
pub const RESPONSE_CACHE: &str = "responses";

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    /// Create a new server with the given settings
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Builds application state from settings: cache store, upstream
    /// clients and services.
    pub async fn build_state(settings: &Settings) -> anyhow::Result<AppState> {
        let cache = CacheManager::new(&settings.cache, RESPONSE_CACHE)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, backend = ?settings.cache.backend, "Failed to initialize cache store");
                anyhow::anyhow!("Failed to initialize cache store: {}", e)
            })?;
        tracing::info!(backend = cache.backend(), "Cache store initialized");

        let addon = AddonService::new(
            Arc::new(TmdbClient::new(&settings.tmdb)),
            Arc::new(RpdbClient::new(&settings.rpdb)),
            cache,
            settings.cache.policies,
            settings.tmdb.default_language.clone(),
        );

        Ok(AppState::new(Services::new(addon)))
    }

    /// Start the server and run until shutdown signal
    ///
    /// # Errors
    /// - Cache store initialization errors
    /// - Address binding errors
    /// - Server runtime errors
    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!(
            app_name = %self.settings.application.name,
            app_version = %self.settings.application.version,
            environment = %Environment::from_env().as_str(),
            "Application starting"
        );

        tracing::info!(
            host = %self.settings.server.host,
            port = %self.settings.server.port,
            request_timeout = %self.settings.server.request_timeout,
            configure_dir = %self.settings.server.configure_dir,
            "Server configuration loaded"
        );

        // Never log the API key itself
        tracing::info!(
            base_url = %self.settings.tmdb.base_url,
            default_language = %self.settings.tmdb.default_language,
            api_key_configured = %(!self.settings.tmdb.api_key.is_empty()),
            "TMDB configuration loaded"
        );

        tracing::info!(
            backend = ?self.settings.cache.backend,
            wait_budget_ms = self.settings.cache.wait_budget_ms,
            fetch_timeout_seconds = self.settings.cache.fetch_timeout_seconds,
            "Cache configuration loaded"
        );

        tracing::info!(
            level = %self.settings.logger.level,
            console_enabled = %self.settings.logger.console.enabled,
            file_enabled = %self.settings.logger.file.enabled,
            "Logger configuration loaded"
        );

        let state = Self::build_state(&self.settings).await?;
        tracing::info!("Application state created");

        let router = create_router(state, Path::new(&self.settings.server.configure_dir))
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                Duration::from_secs(self.settings.server.request_timeout),
            ));
        tracing::info!("Router configured");

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;

        tracing::info!(address = %address, "Server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
