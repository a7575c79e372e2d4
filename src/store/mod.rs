//! Key-value store collaborator
//!
//! The watch client never talks to a cluster directly; it goes through
//! [`StoreClient`], which exposes the handful of primitives the cache and
//! connection manager need:
//! - point reads and writes (`get`, `put`, `delete`)
//! - prefix watch subscriptions delivering batches of [`StoreEvent`]
//! - cluster membership queries and endpoint replacement
//!
//! Two adapters ship with the crate:
//! - [`EtcdStore`] backed by `etcd-client`
//! - [`MemStore`], an in-process store for tests and single-process setups

mod etcd;
mod mem;
pub use etcd::*;
pub use mem::*;


use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
#[cfg(test)]
use mockall::automock;

use crate::ClientConfig;
use crate::Result;
use crate::StoreError;

/// Change type carried by a watch event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEventType {
    /// Key was inserted or updated
    Put,
    /// Key was deleted
    Delete,
}

/// A single change observed on a watched prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub event_type: StoreEventType,
    /// Full key as stored
    pub key: String,
    /// New value, empty for deletes
    pub value: String,
}

impl StoreEvent {
    pub fn put(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            event_type: StoreEventType::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            event_type: StoreEventType::Delete,
            key: key.into(),
            value: String::new(),
        }
    }
}

/// Cluster member as reported by the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Member {
    pub id: u64,
    pub name: String,
    /// Advertised client URLs, e.g. `http://10.0.0.1:2379`
    pub client_urls: Vec<String>,
}

/// Ordered stream of watch response batches
///
/// Ends when the subscription is torn down.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Vec<StoreEvent>>> + Send>>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait StoreClient: Send + Sync + 'static {
    /// Reads a key, `Ok(None)` when it does not exist
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>>;

    async fn put(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()>;

    async fn delete(
        &self,
        key: &str,
    ) -> Result<()>;

    /// Opens a subscription for every key starting with `prefix`
    async fn watch(
        &self,
        prefix: &str,
    ) -> Result<EventStream>;

    async fn list_members(&self) -> Result<Vec<Member>>;

    /// Replaces the set of endpoints the client balances across
    async fn set_endpoints(
        &self,
        endpoints: Vec<String>,
    ) -> Result<()>;
}

/// Establishes a [`StoreClient`] connection
///
/// Implementations make exactly one attempt; retry policy belongs to the
/// connection manager.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(
        &self,
        config: &ClientConfig,
    ) -> Result<Arc<dyn StoreClient>>;
}

/// Bounds a store call by `duration`
///
/// An elapsed deadline is reported as [`StoreError::Timeout`] tagged with `op`.
pub async fn with_timeout<T, F>(
    op: &'static str,
    duration: Duration,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout { op, duration }.into()),
    }
}
