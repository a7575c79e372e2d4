use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use etcd_client::Client;
use etcd_client::ConnectOptions;
use etcd_client::EventType;
use etcd_client::KeyValue;
use etcd_client::WatchOptions;
use futures::stream;
use parking_lot::Mutex;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::EventStream;
use super::Member;
use super::StoreClient;
use super::StoreConnector;
use super::StoreEvent;
use crate::ClientConfig;
use crate::Result;
use crate::StoreError;

/// [`StoreClient`] backed by an etcd v3 cluster
pub struct EtcdStore {
    client: Client,
    /// Endpoints currently registered with the balanced channel
    endpoints: Mutex<Vec<String>>,
}

impl EtcdStore {
    /// Connect to the cluster with a single attempt
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let mut options = ConnectOptions::new()
            .with_connect_timeout(config.dial_timeout())
            .with_timeout(config.request_timeout());
        if let Some((user, password)) = config.credentials() {
            options = options.with_user(user, password);
        }

        let endpoints: Vec<String> = config.endpoints.iter().map(|e| normalize_endpoint(e)).collect();
        let client = Client::connect(&endpoints, Some(options)).await.map_err(StoreError::from)?;
        info!("Connected to etcd cluster at {:?}", endpoints);

        Ok(Self {
            client,
            endpoints: Mutex::new(endpoints),
        })
    }

    fn kv_to_string(kv: &KeyValue) -> Result<(String, String)> {
        let key = std::str::from_utf8(kv.key()).map_err(|_| StoreError::InvalidUtf8 {
            key: String::from_utf8_lossy(kv.key()).into_owned(),
        })?;
        let value = std::str::from_utf8(kv.value()).map_err(|_| StoreError::InvalidUtf8 { key: key.to_string() })?;
        Ok((key.to_string(), value.to_string()))
    }
}

#[async_trait]
impl StoreClient for EtcdStore {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        let mut client = self.client.clone();
        let resp = client.get(key, None).await.map_err(StoreError::from)?;
        match resp.kvs().first() {
            Some(kv) => Ok(Some(Self::kv_to_string(kv)?.1)),
            None => Ok(None),
        }
    }

    async fn put(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let mut client = self.client.clone();
        client.put(key, value, None).await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn delete(
        &self,
        key: &str,
    ) -> Result<()> {
        let mut client = self.client.clone();
        client.delete(key, None).await.map_err(StoreError::from)?;
        Ok(())
    }

    async fn watch(
        &self,
        prefix: &str,
    ) -> Result<EventStream> {
        let mut client = self.client.clone();
        let (watcher, watch_stream) = client
            .watch(prefix, Some(WatchOptions::new().with_prefix()))
            .await
            .map_err(StoreError::from)?;
        debug!(prefix, watch_id = watcher.watch_id(), "etcd watch opened");

        // The watcher is kept in the stream state: dropping it tears the subscription down.
        let events = stream::unfold(Some((watcher, watch_stream)), |state| async move {
            let (watcher, mut watch_stream) = state?;
            match watch_stream.message().await {
                Ok(Some(resp)) => {
                    if resp.canceled() {
                        warn!(watch_id = resp.watch_id(), "etcd watch canceled by server");
                        return None;
                    }
                    let mut batch = Vec::with_capacity(resp.events().len());
                    for event in resp.events() {
                        let Some(kv) = event.kv() else { continue };
                        match Self::kv_to_string(kv) {
                            Ok((key, value)) => batch.push(match event.event_type() {
                                EventType::Put => StoreEvent::put(key, value),
                                EventType::Delete => StoreEvent::delete(key),
                            }),
                            Err(e) => warn!("skipping watch event: {}", e),
                        }
                    }
                    Some((Ok(batch), Some((watcher, watch_stream))))
                }
                Ok(None) => None,
                Err(e) => Some((Err(StoreError::from(e).into()), None)),
            }
        });

        Ok(Box::pin(events))
    }

    async fn list_members(&self) -> Result<Vec<Member>> {
        let mut client = self.client.clone();
        let resp = client.member_list().await.map_err(StoreError::from)?;
        Ok(resp
            .members()
            .iter()
            .map(|m| Member {
                id: m.id(),
                name: m.name().to_string(),
                client_urls: m.client_urls().to_vec(),
            })
            .collect())
    }

    async fn set_endpoints(
        &self,
        endpoints: Vec<String>,
    ) -> Result<()> {
        // Blank entries stand for members without an advertised URL.
        let wanted: Vec<String> = endpoints
            .iter()
            .filter(|e| !e.is_empty())
            .map(|e| normalize_endpoint(e))
            .collect();
        if wanted.is_empty() {
            warn!("refusing to replace etcd endpoints with an empty set");
            return Ok(());
        }

        let current = self.endpoints.lock().clone();
        let wanted_set: HashSet<&String> = wanted.iter().collect();
        let current_set: HashSet<&String> = current.iter().collect();

        for endpoint in wanted.iter().filter(|e| !current_set.contains(e)) {
            self.client.add_endpoint(endpoint).await.map_err(StoreError::from)?;
        }
        for endpoint in current.iter().filter(|e| !wanted_set.contains(e)) {
            self.client.remove_endpoint(endpoint).await.map_err(StoreError::from)?;
        }

        *self.endpoints.lock() = wanted;
        Ok(())
    }
}

/// Connects [`EtcdStore`] instances
#[derive(Debug, Default, Clone, Copy)]
pub struct EtcdConnector;

#[async_trait]
impl StoreConnector for EtcdConnector {
    async fn connect(
        &self,
        config: &ClientConfig,
    ) -> Result<Arc<dyn StoreClient>> {
        let store = EtcdStore::connect(config).await?;
        Ok(Arc::new(store))
    }
}

/// etcd expects URLs; bare `host:port` pairs are given an http scheme
pub(crate) fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}
