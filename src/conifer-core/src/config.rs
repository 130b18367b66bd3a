use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "CONIFER_API_KEY";
/// Environment variable holding the control-plane base URL
pub const ENV_CONTROL_URL: &str = "CONIFER_CONTROL_URL";
/// Optional override for the polling interval, in milliseconds
pub const ENV_POLL_INTERVAL_MS: &str = "CONIFER_POLL_INTERVAL_MS";
/// Optional override for the polling deadline, in seconds
pub const ENV_POLL_TIMEOUT_SECS: &str = "CONIFER_POLL_TIMEOUT_SECS";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api_key is required")]
    MissingApiKey,

    #[error("control_plane_url is required")]
    MissingControlUrl,

    #[error("control_plane_url must start with http:// or https://, got {0:?}")]
    InvalidControlUrl(String),

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("environment variable {name} is not valid: {value:?}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    pub api_key: String,
    /// Management endpoint, e.g. `https://controller.<region>.<provider>/`; no default
    pub control_plane_url: String,

    #[serde(default)]
    pub poll: PollConfig,

    /// Whole-request timeout; unset means requests may wait indefinitely
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default)]
    pub insecure_skip_verify: bool,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

// Keep the key out of logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("control_plane_url", &self.control_plane_url)
            .field("poll", &self.poll)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("insecure_skip_verify", &self.insecure_skip_verify)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

/// Policy for the wait-until-ready / wait-until-deleted loops
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct PollConfig {
    /// Fixed delay between lookups
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,

    /// Give up after this many lookups (None = no attempt limit)
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up once this much time has passed (None = no deadline)
    #[serde(default = "default_poll_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_poll_timeout_secs() -> Option<u64> {
    Some(300) // pod provisioning usually finishes well within 5 minutes
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval_ms(),
            max_attempts: None,
            timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// True once `attempts` lookups have been made and the attempt budget is spent
    pub fn attempts_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub filter: String,

    /// Directory for rotated JSON log files; unset disables file logging
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotate the log file once it reaches this many bytes
    #[serde(default = "default_max_log_bytes")]
    pub max_file_bytes: u64,
}

fn default_log_filter() -> String {
    "conifer_rs=info,conifer_core=info".to_string()
}

fn default_max_log_bytes() -> u64 {
    10 * 1024 * 1024
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            log_dir: None,
            max_file_bytes: default_max_log_bytes(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, control_plane_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            control_plane_url: control_plane_url.into(),
            poll: PollConfig::default(),
            request_timeout_secs: None,
            insecure_skip_verify: false,
            telemetry: TelemetryConfig::default(),
        }
    }

    pub fn load(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::debug!(path, control_plane_url = %config.control_plane_url, "Loaded client config");
        Ok(config)
    }

    /// Build a config from `CONIFER_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(ENV_API_KEY).ok_or(ConfigError::MissingApiKey)?;
        let control_url = lookup(ENV_CONTROL_URL).ok_or(ConfigError::MissingControlUrl)?;
        let mut config = Self::new(api_key, control_url);

        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            config.poll.interval_ms = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_POLL_INTERVAL_MS,
                value: raw.clone(),
            })?;
        }
        if let Some(raw) = lookup(ENV_POLL_TIMEOUT_SECS) {
            let secs = raw.parse().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_POLL_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config.poll.timeout_secs = Some(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let url = self.control_plane_url.trim();
        if url.is_empty() {
            return Err(ConfigError::MissingControlUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidControlUrl(url.to_string()));
        }
        if self.poll.interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Control-plane URL with exactly one trailing slash, ready for `{base}databases`
    pub fn control_base(&self) -> String {
        format!("{}/", self.control_plane_url.trim().trim_end_matches('/'))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
