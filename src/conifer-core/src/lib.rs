//! Conifer Core Library
//!
//! Shared types for the Conifer vector-database client:
//! - Wire models for collections, points and queries
//! - Client, polling and telemetry configuration

pub mod config;
pub mod models;

// Re-export commonly used types
pub use config::{ClientConfig, ConfigError, PollConfig, TelemetryConfig};
pub use models::*;
