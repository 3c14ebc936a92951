//! HTTP request handlers for API endpoints.

pub mod addon;
pub mod health;
pub mod session;
