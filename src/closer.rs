use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

/// A resource torn down by [`CloserRegistry::close_all`]
pub trait Closer: Send + Sync {
    fn close(&self);

    /// Label used in shutdown logs
    fn name(&self) -> String;

    /// Whether the resource still exists; dead entries are pruned
    fn is_alive(&self) -> bool {
        true
    }
}

/// Ordered set of resources closed together on shutdown
#[derive(Default)]
pub struct CloserRegistry {
    closers: Mutex<Vec<Arc<dyn Closer>>>,
}

impl CloserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        closer: Arc<dyn Closer>,
    ) {
        debug!(name = %closer.name(), "closer registered");
        let mut closers = self.closers.lock();
        closers.retain(|c| c.is_alive());
        closers.push(closer);
    }

    /// Close every registered resource in registration order
    ///
    /// The registry is emptied first, so a second call is a no-op and
    /// closers may register new resources without deadlocking.
    pub fn close_all(&self) -> usize {
        let mut closers = std::mem::take(&mut *self.closers.lock());
        closers.retain(|c| c.is_alive());
        for closer in &closers {
            debug!(name = %closer.name(), "closing");
            closer.close();
        }
        if !closers.is_empty() {
            warn!("{} resources closed", closers.len());
        }
        closers.len()
    }

    /// Number of live registered resources
    pub fn len(&self) -> usize {
        self.closers.lock().iter().filter(|c| c.is_alive()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
