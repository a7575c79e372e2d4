use std::fmt;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tracing::error;
use tracing::trace;

use super::ConfigItem;

/// Callback invoked with `(new, old)` snapshots of a changed key
///
/// Keys passed to the callback are relative to the watcher's namespace.
pub type HookFn = Arc<dyn Fn(ConfigItem, ConfigItem) + Send + Sync>;

/// How a hook key is compared to changed keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    /// Fires when the changed key equals the hook key
    Exact,
    /// Fires when the changed key starts with the hook key
    ///
    /// Matching is a plain string prefix test: `"test1"` also matches
    /// `"test10"`. Register `"test1/"` to stay within a key segment.
    Prefix,
}

/// A registered change callback
#[derive(Clone)]
pub struct Hook {
    /// Namespaced key the hook is registered for
    pub(crate) match_key: String,
    pub(crate) mode: HookMode,
    pub(crate) callback: HookFn,
}

impl fmt::Debug for Hook {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Hook")
            .field("match_key", &self.match_key)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Hook {
    pub(crate) fn new(
        match_key: String,
        mode: HookMode,
        callback: HookFn,
    ) -> Self {
        Self {
            match_key,
            mode,
            callback,
        }
    }

    pub(crate) fn matches(
        &self,
        full_key: &str,
    ) -> bool {
        match self.mode {
            HookMode::Exact => full_key == self.match_key,
            HookMode::Prefix => full_key.starts_with(&self.match_key),
        }
    }
}

/// Ordered hook list owned by a single watch loop
///
/// Only the loop task appends to or reads from the registry, so no locking
/// is involved and dispatch order equals registration order.
pub(crate) struct HookRegistry {
    /// Namespace prefix including the trailing separator, e.g. `CONFIG/`
    namespace: String,
    hooks: Vec<Hook>,
}

impl HookRegistry {
    pub(crate) fn new(namespace: String) -> Self {
        Self {
            namespace,
            hooks: Vec::new(),
        }
    }

    pub(crate) fn register(
        &mut self,
        hook: Hook,
    ) {
        trace!(key = %hook.match_key, mode = ?hook.mode, "hook registered");
        self.hooks.push(hook);
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Invoke every hook matching `full_key`, in registration order
    ///
    /// Both snapshots have the namespace stripped from their keys before
    /// they are handed to callbacks. A panicking callback is logged and the
    /// remaining hooks still run. Returns the number of hooks fired.
    pub(crate) fn dispatch(
        &self,
        full_key: &str,
        new: &ConfigItem,
        old: &ConfigItem,
    ) -> usize {
        let mut fired = 0;
        let mut relative: Option<(ConfigItem, ConfigItem)> = None;

        for hook in self.hooks.iter().filter(|h| h.matches(full_key)) {
            let (new, old) = relative.get_or_insert_with(|| (self.strip(new), self.strip(old)));
            // A panicking callback must not take the watch loop down with it.
            if catch_unwind(AssertUnwindSafe(|| (hook.callback)(new.clone(), old.clone()))).is_err() {
                error!(key = full_key, hook = %hook.match_key, "hook callback panicked");
            }
            fired += 1;
        }

        if fired > 0 {
            trace!(key = full_key, fired, "hooks dispatched");
        }
        fired
    }

    fn strip(
        &self,
        item: &ConfigItem,
    ) -> ConfigItem {
        let key = item.key().strip_prefix(&self.namespace).unwrap_or(item.key()).to_string();
        item.clone().with_key(key)
    }
}
