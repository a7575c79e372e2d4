use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::constants::DEFAULT_DIAL_TIMEOUT_MS;
use crate::constants::DEFAULT_ENDPOINT;
use crate::constants::DEFAULT_RECONCILE_INTERVAL_MS;
use crate::constants::DEFAULT_REQUEST_TIMEOUT_MS;
use crate::Error;
use crate::Result;

/// Store connection parameters
///
/// Controls how the client reaches the cluster and how long each
/// synchronous call may block.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientConfig {
    /// Bootstrap endpoints, e.g. `http://127.0.0.1:2379`
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Maximum time to establish the connection
    /// Default: 5 seconds
    #[serde(default = "default_dial_timeout_ms")]
    pub dial_timeout_ms: u64,

    /// Bound applied to every read-through and membership query
    /// Default: 5 seconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Interval between endpoint reconciliation passes
    /// Default: 5 seconds
    #[serde(default = "default_reconcile_interval_ms")]
    pub reconcile_interval_ms: u64,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            dial_timeout_ms: default_dial_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            reconcile_interval_ms: default_reconcile_interval_ms(),
            username: None,
            password: None,
        }
    }
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::Config(ConfigError::Message(
                "client.endpoints must contain at least one endpoint".into(),
            )));
        }

        if let Some(blank) = self.endpoints.iter().position(|e| e.trim().is_empty()) {
            return Err(Error::Config(ConfigError::Message(format!(
                "client.endpoints[{blank}] is empty"
            ))));
        }

        if self.dial_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client.dial_timeout_ms must be greater than 0".into(),
            )));
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client.request_timeout_ms must be greater than 0".into(),
            )));
        }

        if self.reconcile_interval_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "client.reconcile_interval_ms must be greater than 0".into(),
            )));
        }

        if self.username.is_some() != self.password.is_some() {
            warn!("client.username and client.password should be set together, credentials ignored");
        }

        Ok(())
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_millis(self.reconcile_interval_ms)
    }

    /// Username/password pair, only when both are present
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => Some((user.as_str(), password.as_str())),
            _ => None,
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec![DEFAULT_ENDPOINT.to_string()]
}
fn default_dial_timeout_ms() -> u64 {
    DEFAULT_DIAL_TIMEOUT_MS
}
fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}
fn default_reconcile_interval_ms() -> u64 {
    DEFAULT_RECONCILE_INTERVAL_MS
}
