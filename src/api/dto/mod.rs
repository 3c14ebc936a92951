//! Data Transfer Objects for API requests and responses.

mod error;
mod health;

pub use error::ErrorResponse;
pub use health::{ComponentHealth, HealthResponse, HealthStatus};
