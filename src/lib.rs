//! # confwatch
//!
//! Watch-driven configuration client for a distributed key-value store.
//!
//! - [`ConnectionManager`] owns the store connection and keeps its endpoint
//!   set aligned with cluster membership.
//! - [`ConfigWatcher`] caches one key namespace locally, keeps it current
//!   from the store's change stream and notifies registered hooks.
//!
//! ```ignore
//! let config = ConfWatchConfig::new()?.validate()?;
//! let manager = ConnectionManager::connect(config, &EtcdConnector).await?;
//!
//! let watcher = manager.new_watcher("config").await?;
//! let workers = watcher.get("workers").await.map(|v| v.as_int()).unwrap_or(4);
//!
//! // on shutdown
//! manager.close_all();
//! ```

mod closer;
mod config;
mod connection;
mod constants;
mod errors;
mod store;
mod utils;
mod watcher;

pub use closer::*;
pub use config::*;
pub use connection::*;
pub use errors::*;
pub use store::*;
pub use watcher::*;
