use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::constants::DEFAULT_HOOK_QUEUE_SIZE;
use crate::Error;
use crate::Result;

/// Per-watcher configuration
///
/// ```toml
/// [watcher]
/// hook_queue_size = 64
/// ```
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WatcherConfig {
    /// Capacity of the hook registration queue drained by the watch loop
    ///
    /// Registrations block once the queue is full, until the loop catches up.
    ///
    /// **Default**: 64
    #[serde(default = "default_hook_queue_size")]
    pub hook_queue_size: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            hook_queue_size: default_hook_queue_size(),
        }
    }
}

impl WatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hook_queue_size == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watcher.hook_queue_size must be greater than 0".into(),
            )));
        }

        if self.hook_queue_size > 10_000 {
            warn!(
                "watcher.hook_queue_size ({}) is unusually large for registration traffic",
                self.hook_queue_size
            );
        }

        Ok(())
    }
}

fn default_hook_queue_size() -> usize {
    DEFAULT_HOOK_QUEUE_SIZE
}
