//! Configuration for the directory client.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable holding the API endpoint.
pub const ENV_API_ENDPOINT: &str = "SYSDIG_API_ENDPOINT";
/// Environment variable holding the API token.
pub const ENV_TOKEN: &str = "SYSDIG_TOKEN";
/// Environment variable holding the dashboard API endpoint.
pub const ENV_DASHBOARD_ENDPOINT: &str = "SYSDIG_DASHBOARD_API_ENDPOINT";
/// Environment variable holding the per-request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT: &str = "SYSDIG_REQUEST_TIMEOUT_SECS";

/// Endpoint and token used for every remote call.
///
/// Both values may be empty here; the controller checks completeness each
/// cycle and reports missing credentials through status.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "sysdig_api_endpoint", default)]
    pub api_endpoint: String,
    #[serde(rename = "sysdig_token", default)]
    pub token: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(api_endpoint: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            token: token.into(),
        }
    }

    /// Whether both endpoint and token are set.
    pub fn is_complete(&self) -> bool {
        !self.api_endpoint.trim().is_empty() && !self.token.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_endpoint", &self.api_endpoint)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

/// Configuration for the [`DirectoryClient`](crate::DirectoryClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(flatten)]
    pub credentials: Credentials,

    /// Dashboard API endpoint; falls back to the API endpoint.
    #[serde(rename = "sysdig_dashboard_api_endpoint", default)]
    pub dashboard_endpoint: Option<String>,

    /// Timeout applied to every request.
    #[serde(
        rename = "request_timeout_secs",
        with = "duration_secs",
        default = "default_timeout"
    )]
    pub timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::new(Credentials::default())
    }
}

impl DirectoryConfig {
    /// Create a config with the given credentials.
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            dashboard_endpoint: None,
            timeout: default_timeout(),
        }
    }

    /// Set the dashboard endpoint.
    #[must_use]
    pub fn dashboard_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.dashboard_endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint used for dashboard provisioning.
    pub fn resolved_dashboard_endpoint(&self) -> &str {
        self.dashboard_endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(&self.credentials.api_endpoint)
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials::new(
            lookup(ENV_API_ENDPOINT).unwrap_or_default(),
            lookup(ENV_TOKEN).unwrap_or_default(),
        );
        let mut config = Self::new(credentials);

        config.dashboard_endpoint = lookup(ENV_DASHBOARD_ENDPOINT).filter(|v| !v.is_empty());

        if let Some(secs) = lookup(ENV_REQUEST_TIMEOUT).and_then(|v| v.parse::<u64>().ok()) {
            config.timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Fill empty fields from `other`.
    #[must_use]
    pub fn or(mut self, other: Self) -> Self {
        if self.credentials.api_endpoint.is_empty() {
            self.credentials.api_endpoint = other.credentials.api_endpoint;
        }
        if self.credentials.token.is_empty() {
            self.credentials.token = other.credentials.token;
        }
        if self.dashboard_endpoint.is_none() {
            self.dashboard_endpoint = other.dashboard_endpoint;
        }
        self
    }
}

const fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Serialization helper for Duration as seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
