use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::trace;

use super::EventStream;
use super::Member;
use super::StoreClient;
use super::StoreEvent;
use crate::Result;
use crate::StoreError;

const DEFAULT_EVENT_BUFFER: usize = 1024;

/// In-process [`StoreClient`]
///
/// Keeps data in an ordered map and fans every change out to watch
/// subscribers through a broadcast channel. Changes are published while
/// the write lock is held, so subscribers observe them in commit order.
pub struct MemStore {
    data: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
    members: RwLock<Vec<Member>>,
    endpoint_updates: Mutex<Vec<Vec<String>>>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::with_event_buffer(DEFAULT_EVENT_BUFFER)
    }

    /// Create a store whose subscribers lag after `size` undelivered events
    pub fn with_event_buffer(size: usize) -> Self {
        let (events, _) = broadcast::channel(size.max(1));
        Self {
            data: RwLock::new(BTreeMap::new()),
            events,
            members: RwLock::new(Vec::new()),
            endpoint_updates: Mutex::new(Vec::new()),
        }
    }

    /// Replace the member list served by `list_members`
    pub fn set_members(
        &self,
        members: Vec<Member>,
    ) {
        *self.members.write() = members;
    }

    /// Every endpoint set applied through `set_endpoints`, oldest first
    pub fn endpoint_updates(&self) -> Vec<Vec<String>> {
        self.endpoint_updates.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Number of live watch subscriptions
    pub fn watcher_count(&self) -> usize {
        self.events.receiver_count()
    }

    fn publish(
        &self,
        event: StoreEvent,
    ) {
        // No subscribers is not an error for a store.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl StoreClient for MemStore {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        Ok(self.data.read().get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut data = self.data.write();
        data.insert(key.to_string(), value.to_string());
        self.publish(StoreEvent::put(key, value));
        trace!(key, "mem store put");
        Ok(())
    }

    async fn delete(
        &self,
        key: &str,
    ) -> Result<()> {
        let mut data = self.data.write();
        if data.remove(key).is_some() {
            self.publish(StoreEvent::delete(key));
            trace!(key, "mem store delete");
        }
        Ok(())
    }

    async fn watch(
        &self,
        prefix: &str,
    ) -> Result<EventStream> {
        let prefix = prefix.to_string();
        let stream = BroadcastStream::new(self.events.subscribe()).filter_map(move |item| match item {
            Ok(event) if event.key.starts_with(&prefix) => Some(Ok(vec![event])),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(skipped)) => Some(Err(StoreError::StreamLagged(skipped).into())),
        });
        Ok(Box::pin(stream))
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        Ok(self.members.read().clone())
    }

    async fn set_endpoints(
        &self,
        endpoints: Vec<String>,
    ) -> Result<()> {
        self.endpoint_updates.lock().push(endpoints);
        Ok(())
    }
}
