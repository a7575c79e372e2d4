//! Store connection ownership
//!
//! [`ConnectionManager`] establishes the store connection with bounded
//! retries, keeps the client's endpoint list aligned with cluster
//! membership and tears down registered resources on shutdown.

mod endpoint;
mod manager;
pub use endpoint::*;
pub use manager::*;
