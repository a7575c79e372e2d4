//! Prefix-scoped configuration watcher
//!
//! A [`ConfigWatcher`] keeps a local cache of one key namespace and runs a
//! single watch loop per instance:
//!
//! ```text
//!  store watch stream ──┐
//!                       ├─► watch loop ──► cache update ──► hooks (in order)
//!  add_hook() queue ────┘
//! ```
//!
//! - Reads hit the cache first and fall through to the store on a miss.
//! - Watch events update keys that are already cached; keys never read are
//!   not cached but still reported to hooks on PUT.
//! - Hook registrations travel through the same loop as events, so a hook
//!   never observes an event that was being processed before it was added.

mod cache;
mod config_watcher;
mod hook;
mod item;

pub(crate) use cache::*;
pub use config_watcher::*;
pub use hook::*;
pub use item::*;
