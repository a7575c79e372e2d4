//! Configuration management for the watch client.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support (`CONFIG_PATH`)
//! - Environment variable overrides (`CONFWATCH__` prefix)
//! - Component-wise validation
mod client;
mod retry;
mod watcher;
pub use client::*;
pub use retry::*;
pub use watcher::*;

#[cfg(test)]
mod config_test;

use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::ENV_PREFIX;
use crate::Result;

/// Top-level configuration container
///
/// Merges, from lowest to highest priority:
/// 1. Default values from code
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables (`CONFWATCH__CLIENT__REQUEST_TIMEOUT_MS=...`)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ConfWatchConfig {
    /// Store connection parameters
    #[serde(default)]
    pub client: ClientConfig,
    /// Per-watcher tuning
    #[serde(default)]
    pub watcher: WatcherConfig,
    /// Initial connection retry policy
    #[serde(default)]
    pub retry: BackoffPolicy,
}

impl Debug for ConfWatchConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConfWatchConfig")
            .field("client", &self.client)
            .field("watcher", &self.watcher)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ConfWatchConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call [`validate()`](Self::validate) before using the result.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONFWATCH__CLIENT__ENDPOINTS", "http://10.0.0.1:2379");
    /// let cfg = ConfWatchConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(Self::environment());

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional overrides from a file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(Self::environment())
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates every section and returns the validated instance.
    pub fn validate(self) -> Result<Self> {
        self.client.validate()?;
        self.watcher.validate()?;
        self.retry.validate()?;
        Ok(self)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .ignore_empty(true)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("client.endpoints")
    }
}
