use std::sync::Arc;

use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;

/// Application-wide error type that represents all possible errors in the system.
///
/// Upstream failures keep the HTTP status reported by the provider so the
/// route layer can tell "the provider has no such title" apart from "the
/// provider is unavailable".
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found error with entity, field, and value information
    #[error("Resource not found: {entity} with {field}={value}")]
    NotFound {
        entity: String,
        field: String,
        value: String,
    },

    /// Validation error with field-specific details
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Bad request error with descriptive message
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Upstream provider call failed
    #[error("Upstream {provider} error: {message}")]
    Upstream {
        provider: String,
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// An operation did not complete within its time bound
    #[error("Timed out after {timeout_ms}ms: {operation}")]
    Timeout { operation: String, timeout_ms: u64 },

    /// Cache backend failure
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Configuration error with key information
    #[error("Configuration error: {key}")]
    Configuration {
        key: String,
        #[source]
        source: anyhow::Error,
    },

    /// Internal error for unexpected failures
    #[error("Internal error")]
    Internal {
        #[source]
        source: anyhow::Error,
    },

    /// One failure observed by every caller that joined the same fetch
    #[error(transparent)]
    Shared(Arc<AppError>),
}

impl AppError {
    /// Returns the error a shared failure stands for.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Unwraps a shared failure back into an owned error when this is the
    /// last reference to it.
    pub fn from_shared(shared: Arc<AppError>) -> Self {
        Arc::try_unwrap(shared).unwrap_or_else(AppError::Shared)
    }

    pub fn upstream_status(&self) -> Option<u16> {
        match self.root() {
            AppError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Internal { source: error }
    }
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        AppError::Configuration {
            key: error.field().unwrap_or("settings").to_string(),
            source: error.into(),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Internal {
            source: error.into(),
        }
    }
}

/// Type alias for Result with AppError to simplify function signatures
pub type AppResult<T> = Result<T, AppError>;
