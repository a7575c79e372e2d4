//! Error hierarchy for the configuration watch client
//!
//! Errors are grouped by the component that raises them. Only the two
//! bootstrap paths (initial connection and initial watch subscription)
//! are expected to reach the embedding application; everything else is
//! logged and degraded at the call site.

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures reported by the backing key-value store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Connection bootstrap and endpoint management failures
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Watch subscription and watcher lifecycle failures
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A single store call exceeded its deadline
    #[error("{op} timed out after {duration:?}")]
    Timeout { op: &'static str, duration: Duration },

    /// Errors surfaced by the etcd client
    #[error(transparent)]
    Etcd(#[from] etcd_client::Error),

    /// Stored bytes are not valid UTF-8
    #[error("Value of key {key} is not valid UTF-8")]
    InvalidUtf8 { key: String },

    /// Watch subscriber fell behind and missed events
    #[error("Watch stream lagged, {0} events skipped")]
    StreamLagged(u64),

    /// Generic backend failure
    #[error("Store backend error: {0}")]
    Backend(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Initial connection failed on every attempt
    #[error("Failed to connect after {attempts} attempts: {source}")]
    RetryExhausted {
        attempts: usize,
        #[source]
        source: Box<Error>,
    },

    /// Endpoint URL could not be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection manager has been shut down
    #[error("Connection manager closed")]
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Opening the prefix subscription failed
    #[error("Failed to open watch on prefix {prefix}: {source}")]
    Subscribe {
        prefix: String,
        #[source]
        source: Box<Error>,
    },

    /// The watcher has been closed
    #[error("Watcher closed")]
    Closed,
}

impl Error {
    /// Whether the error was caused by an elapsed per-call deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Store(StoreError::Timeout { .. }))
    }
}
