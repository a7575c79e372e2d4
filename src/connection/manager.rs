use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

use arc_swap::ArcSwapOption;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use super::derive_endpoints;
use crate::store::with_timeout;
use crate::utils::async_task::task_with_timeout_and_exponential_backoff;
use crate::Closer;
use crate::CloserRegistry;
use crate::ConfWatchConfig;
use crate::ConfigWatcher;
use crate::ConnectionError;
use crate::Result;
use crate::StoreClient;
use crate::StoreConnector;

/// Owner of the store connection and its endpoint set
///
/// Created once at startup through [`connect()`](Self::connect) and shared
/// as `Arc<ConnectionManager>`. While alive it periodically reconciles the
/// client's endpoints with cluster membership.
///
/// The connection is established once. A connection that dies later is
/// not detected or rebuilt here.
pub struct ConnectionManager {
    store: Arc<dyn StoreClient>,
    config: ConfWatchConfig,
    /// Last endpoint set applied to the client, `None` before the first pass
    endpoints: ArcSwapOption<Vec<String>>,
    /// Serializes reconciliation passes
    reconcile_lock: Mutex<()>,
    closers: CloserRegistry,
    closed: AtomicBool,
    shutdown: CancellationToken,
}

impl ConnectionManager {
    /// Validate `config`, connect through `connector` and start endpoint
    /// reconciliation
    ///
    /// One attempt is made plus up to `config.retry.max_retries` retries.
    ///
    /// # Errors
    /// - [`crate::Error::Config`] when the configuration is invalid
    /// - [`ConnectionError::RetryExhausted`] when every attempt failed.
    ///   There is no degraded mode without a connection; callers should
    ///   abort startup.
    pub async fn connect(
        config: ConfWatchConfig,
        connector: &dyn StoreConnector,
    ) -> Result<Arc<Self>> {
        let config = config.validate()?;

        let client_config = &config.client;
        let store = task_with_timeout_and_exponential_backoff(
            "connect",
            move || connector.connect(client_config),
            config.retry,
        )
        .await?;

        let manager = Arc::new(Self::with_store(store, config));
        Self::spawn_reconcile_loop(&manager);
        info!("connection manager ready");
        Ok(manager)
    }

    /// Wrap an established store without starting background work
    pub(crate) fn with_store(
        store: Arc<dyn StoreClient>,
        config: ConfWatchConfig,
    ) -> Self {
        Self {
            store,
            config,
            endpoints: ArcSwapOption::empty(),
            reconcile_lock: Mutex::new(()),
            closers: CloserRegistry::new(),
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    fn spawn_reconcile_loop(manager: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(manager);
        let shutdown = manager.shutdown.clone();
        let period = manager.config.client.reconcile_interval();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(manager) = weak.upgrade() else { break };
                        if let Err(e) = manager.reconcile_endpoints().await {
                            error!("endpoint reconciliation failed: {}", e);
                        }
                    }
                }
            }
            debug!("endpoint reconciliation stopped");
        });
    }

    /// Shared store handle, never reconnected
    pub fn store(&self) -> Arc<dyn StoreClient> {
        self.store.clone()
    }

    pub fn config(&self) -> &ConfWatchConfig {
        &self.config
    }

    /// Last endpoint set applied to the client, empty before the first pass
    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.load().as_deref().cloned().unwrap_or_default()
    }

    /// Run one reconciliation pass
    ///
    /// Queries membership, derives the positional endpoint list and applies
    /// it only when it differs element-wise from the last applied set.
    /// Returns whether the set was replaced.
    ///
    /// # Errors
    /// Membership query or endpoint update failures, including timeouts.
    /// The stored set is left untouched so the next pass tries again.
    pub async fn reconcile_endpoints(&self) -> Result<bool> {
        let _guard = self.reconcile_lock.lock().await;
        let timeout = self.config.client.request_timeout();

        let members = with_timeout("list_members", timeout, self.store.list_members()).await?;
        let derived = derive_endpoints(&members);

        if self.endpoints.load().as_deref() == Some(&derived) {
            debug!("endpoints unchanged: {:?}", derived);
            return Ok(false);
        }

        with_timeout("set_endpoints", timeout, self.store.set_endpoints(derived.clone())).await?;
        info!("store endpoints changed to {:?}", derived);
        self.endpoints.store(Some(Arc::new(derived)));
        Ok(true)
    }

    /// Track a resource closed by [`close_all()`](Self::close_all)
    pub fn register_closer(
        &self,
        closer: Arc<dyn Closer>,
    ) {
        self.closers.register(closer);
    }

    /// Create a watcher over `prefix` and register it for shutdown
    ///
    /// The manager holds the watcher weakly: dropping every handle still
    /// stops its loop, and the dead registration is pruned.
    ///
    /// # Errors
    /// - [`ConnectionError::Closed`] after [`close_all()`](Self::close_all)
    /// - [`crate::WatchError::Subscribe`] when the subscription fails
    pub async fn new_watcher(
        &self,
        prefix: &str,
    ) -> Result<ConfigWatcher> {
        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }

        let watcher = ConfigWatcher::new(prefix, self.store.clone(), &self.config).await?;
        self.register_closer(watcher.weak_closer());

        // close_all ran while the subscription was being opened
        if self.is_closed() {
            watcher.close();
            return Err(ConnectionError::Closed.into());
        }
        Ok(watcher)
    }

    /// Close every registered resource in registration order and stop
    /// reconciliation
    ///
    /// Returns how many resources were closed; repeated calls return 0.
    pub fn close_all(&self) -> usize {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.shutdown.cancel();
        }
        let closed = self.closers.close_all();
        if closed > 0 {
            warn!("store connection closed.");
        }
        closed
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub async fn put(
        &self,
        key: &str,
        value: &str,
    ) -> Result<()> {
        with_timeout("put", self.config.client.request_timeout(), self.store.put(key, value)).await
    }

    /// Reads a key straight from the store, bypassing every watcher cache
    pub async fn get(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        with_timeout("get", self.config.client.request_timeout(), self.store.get(key)).await
    }

    pub async fn delete(
        &self,
        key: &str,
    ) -> Result<()> {
        with_timeout("delete", self.config.client.request_timeout(), self.store.delete(key)).await
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
