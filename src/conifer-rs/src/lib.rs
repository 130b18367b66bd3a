//! Conifer Client Library
//!
//! Async HTTP client for a hosted vector-database service: collection
//! lifecycle on the control plane, point upsert and search on each
//! collection's data plane.

mod client;
pub mod response;
pub mod telemetry;
pub mod transport;

use std::time::Duration;

pub use client::Client;
pub use conifer_core::{ClientConfig, ConfigError, PollConfig, TelemetryConfig};
pub use conifer_core::{
    CollectionDescriptor, CollectionEntry, CollectionSpec, CollectionStatus, Metric, Point,
    QueryRequest, QueryResponse, ScoredMatch, UpsertResponse, DEFAULT_TOP_K,
};
pub use response::ApiResponse;
pub use transport::{HttpTransport, Payload, Transport};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: {status} - {body}")]
    Http { status: u16, body: String },

    #[error("Invalid JSON in response: {source}")]
    Parse {
        /// Response text as received, or the parsed body re-encoded when a typed decode fails
        raw: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("Collection \"{0}\" already exists")]
    AlreadyExists(String),

    #[error("Collection \"{0}\" did not report a data-plane host")]
    HostUnavailable(String),

    #[error("Timed out waiting on collection \"{name}\" after {attempts} attempts")]
    TimedOut { name: String, attempts: u32 },

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid response from server")]
    InvalidResponse,
}

impl ClientError {
    /// HTTP status of the failed request, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server said the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Http { status: 404, .. })
    }

    /// Response text attached to HTTP and parse failures.
    /// For a typed decode mismatch this is the parsed JSON re-encoded, not the server's bytes.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            ClientError::Http { body, .. } => Some(body),
            ClientError::Parse { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Default pause used by [`sleep`]
pub const DEFAULT_SLEEP: Duration = Duration::from_millis(100);

/// Give the service time to settle without blocking the runtime
pub async fn sleep(duration: Option<Duration>) {
    tokio::time::sleep(duration.unwrap_or(DEFAULT_SLEEP)).await;
}
