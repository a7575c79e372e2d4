use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::trace;
use tracing::warn;

use super::ConfigCache;
use super::ConfigItem;
use super::Hook;
use super::HookMode;
use super::HookRegistry;
use crate::store::with_timeout;
use crate::Closer;
use crate::ConfWatchConfig;
use crate::EventStream;
use crate::Result;
use crate::StoreClient;
use crate::StoreEvent;
use crate::StoreEventType;
use crate::WatchError;

/// State shared between watcher handles and the watch loop
struct Shared {
    cache: ConfigCache,
    closed: AtomicBool,
    /// Cancelled by `close()` or when the last handle goes away
    shutdown: CancellationToken,
    /// Cancelled by the loop once it has exited
    exited: CancellationToken,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

struct WatcherInner {
    shared: Arc<Shared>,
    store: Arc<dyn StoreClient>,
    request_timeout: Duration,
    hook_tx: mpsc::Sender<Hook>,
}

impl Drop for WatcherInner {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

/// Locally cached, continuously synchronized view of one key namespace
///
/// A watcher owns a prefix subscription on the store and a background loop
/// that applies change events to the cache and fires registered hooks.
/// Handles are cheap to clone; the loop stops on [`close()`](Self::close)
/// or once every handle has been dropped.
///
/// # Example
/// ```ignore
/// let watcher = manager.new_watcher("config").await?;
/// watcher
///     .add_hook("feature/", HookMode::Prefix, |new, old| {
///         println!("{} changed: {} -> {}", new.key(), old, new);
///     })
///     .await;
///
/// let limit = watcher.get("rate_limit").await.map(|v| v.as_int()).unwrap_or(100);
/// ```
#[derive(Clone)]
pub struct ConfigWatcher {
    inner: Arc<WatcherInner>,
}

impl ConfigWatcher {
    /// Open the namespace subscription and start the watch loop
    ///
    /// The prefix is upper-cased; the subscription covers every key under
    /// `PREFIX/`.
    ///
    /// # Errors
    /// [`WatchError::Subscribe`] when the subscription cannot be opened.
    /// The watcher is unusable in that case and startup should abort.
    pub async fn new(
        prefix: &str,
        store: Arc<dyn StoreClient>,
        config: &ConfWatchConfig,
    ) -> Result<Self> {
        let cache = ConfigCache::new(prefix);
        let request_timeout = config.client.request_timeout();

        let events = with_timeout("watch", request_timeout, store.watch(cache.namespace()))
            .await
            .map_err(|e| {
                error!(prefix = cache.prefix(), "failed to open watch: {}", e);
                WatchError::Subscribe {
                    prefix: cache.prefix().to_string(),
                    source: Box::new(e),
                }
            })?;

        let (hook_tx, hook_rx) = mpsc::channel(config.watcher.hook_queue_size.max(1));
        let shared = Arc::new(Shared {
            cache,
            closed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
            exited: CancellationToken::new(),
        });

        let watch_loop = WatchLoop {
            hooks: HookRegistry::new(shared.cache.namespace().to_string()),
            shared: shared.clone(),
            events,
            hook_rx,
        };
        tokio::spawn(watch_loop.run());

        info!(prefix = shared.cache.prefix(), "config watcher started");
        Ok(Self {
            inner: Arc::new(WatcherInner {
                shared,
                store,
                request_timeout,
                hook_tx,
            }),
        })
    }

    /// Upper-cased namespace prefix
    pub fn prefix(&self) -> &str {
        self.inner.shared.cache.prefix()
    }

    /// Read a key, populating the cache from the store on a miss
    pub async fn get(
        &self,
        key: &str,
    ) -> Option<ConfigItem> {
        self.get_with(key, true).await
    }

    /// Read a key from the cache
    ///
    /// With `create_if_absent` a miss falls through to the store, bounded
    /// by the request timeout. Store failures and missing keys both read
    /// as `None`; failures are logged.
    pub async fn get_with(
        &self,
        key: &str,
        create_if_absent: bool,
    ) -> Option<ConfigItem> {
        let cache = &self.inner.shared.cache;
        let full_key = cache.full_key(key);

        if let Some(item) = cache.lookup(&full_key) {
            return Some(item);
        }
        if !create_if_absent {
            return None;
        }

        match with_timeout("get", self.inner.request_timeout, self.inner.store.get(&full_key)).await {
            Ok(Some(value)) => Some(cache.insert_if_absent(ConfigItem::new(full_key, value))),
            Ok(None) => {
                debug!(key = %full_key, "key not found in store");
                None
            }
            Err(e) => {
                error!(key = %full_key, "read-through failed: {}", e);
                None
            }
        }
    }

    /// Whether the key is currently cached. Never reads the store.
    pub fn exists(
        &self,
        key: &str,
    ) -> bool {
        let cache = &self.inner.shared.cache;
        cache.contains(&cache.full_key(key))
    }

    /// Number of cached entries
    pub fn cached_len(&self) -> usize {
        self.inner.shared.cache.len()
    }

    /// Register a change callback
    ///
    /// The registration is queued to the watch loop, which appends it
    /// between two events: the hook observes every event processed after
    /// that point and none before. Waits while the queue is full.
    ///
    /// `true` means the registration was queued, not that it was applied:
    /// if the loop exits before draining the queue (close or stream end),
    /// the hook never fires. Returns `false` when the watcher is already
    /// closed or its loop has gone.
    pub async fn add_hook<F>(
        &self,
        key: &str,
        mode: HookMode,
        callback: F,
    ) -> bool
    where
        F: Fn(ConfigItem, ConfigItem) + Send + Sync + 'static,
    {
        if self.is_closed() {
            return false;
        }

        let hook = Hook::new(self.inner.shared.cache.full_key(key), mode, Arc::new(callback));
        match self.inner.hook_tx.send(hook).await {
            Ok(()) => true,
            Err(_) => {
                debug!(prefix = self.prefix(), "hook rejected, watch loop has exited");
                false
            }
        }
    }

    /// Stop the watch loop
    ///
    /// The loop exits before processing any further event; events already
    /// buffered are dropped. The cache keeps serving its last state.
    pub fn close(&self) {
        let shared = &self.inner.shared;
        if !shared.closed.swap(true, Ordering::AcqRel) {
            warn!("Config watcher {} exit", shared.cache.prefix());
        }
        shared.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.shared.is_closed()
    }

    /// Resolves once the watch loop has exited
    pub async fn closed(&self) {
        self.inner.shared.exited.cancelled().await
    }
}

impl Closer for ConfigWatcher {
    fn close(&self) {
        ConfigWatcher::close(self)
    }

    fn name(&self) -> String {
        format!("config watcher {}", self.prefix())
    }
}

impl ConfigWatcher {
    /// Closer that does not keep the watcher alive
    ///
    /// Once every handle is dropped the loop stops on its own and the
    /// closer reports itself dead.
    pub(crate) fn weak_closer(&self) -> Arc<dyn Closer> {
        Arc::new(WeakWatcherCloser {
            inner: Arc::downgrade(&self.inner),
            name: Closer::name(self),
        })
    }
}

struct WeakWatcherCloser {
    inner: Weak<WatcherInner>,
    name: String,
}

impl Closer for WeakWatcherCloser {
    fn close(&self) {
        if let Some(inner) = self.inner.upgrade() {
            ConfigWatcher { inner }.close();
        }
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Single consumer of the event stream and the hook registration queue
struct WatchLoop {
    shared: Arc<Shared>,
    events: EventStream,
    hook_rx: mpsc::Receiver<Hook>,
    hooks: HookRegistry,
}

impl WatchLoop {
    async fn run(mut self) {
        let prefix = self.shared.cache.prefix().to_string();
        debug!(%prefix, "watch loop started");

        loop {
            if self.shared.is_closed() {
                break;
            }

            // Pending registrations are drained before the next event batch.
            tokio::select! {
                biased;
                _ = self.shared.shutdown.cancelled() => break,
                Some(hook) = self.hook_rx.recv() => self.hooks.register(hook),
                batch = self.events.next() => match batch {
                    Some(Ok(events)) => self.apply_batch(events),
                    Some(Err(e)) => {
                        // Events may have been skipped; cached values can no
                        // longer be trusted and are re-read from the store.
                        let dropped = self.shared.cache.clear();
                        warn!(%prefix, dropped, "watch stream error, cache invalidated: {}", e);
                    }
                    None => {
                        warn!(%prefix, "watch stream ended");
                        break;
                    }
                },
            }
        }
        // Teardown runs in `Drop`, on every exit path.
    }

    fn apply_batch(
        &mut self,
        events: Vec<StoreEvent>,
    ) {
        for event in events {
            if self.shared.is_closed() {
                return;
            }
            self.apply(event);
        }
    }

    fn apply(
        &mut self,
        event: StoreEvent,
    ) {
        let cache = &self.shared.cache;
        trace!(
            prefix = cache.prefix(),
            key = cache.strip_prefix(&event.key),
            event_type = ?event.event_type,
            "applying watch event"
        );

        match event.event_type {
            StoreEventType::Delete => {
                // Deletes of keys this process never read are not reported.
                if let Some(old) = cache.remove(&event.key) {
                    let new = ConfigItem::empty(event.key.as_str());
                    self.hooks.dispatch(&event.key, &new, &old);
                }
            }
            StoreEventType::Put => match cache.replace_value(&event.key, &event.value) {
                Some((new, old)) => {
                    self.hooks.dispatch(&event.key, &new, &old);
                }
                None => {
                    let new = ConfigItem::new(event.key.as_str(), event.value.as_str());
                    let old = ConfigItem::empty(event.key.as_str());
                    self.hooks.dispatch(&event.key, &new, &old);
                }
            },
        }
    }
}

impl Drop for WatchLoop {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.hook_rx.close();
        debug!(prefix = self.shared.cache.prefix(), hooks = self.hooks.len(), "watch loop stopped");

        // The subscription is released before waiters on `closed()` wake up.
        self.events = Box::pin(futures::stream::empty());
        self.shared.exited.cancel();
    }
}
