use std::collections::HashMap;

use parking_lot::RwLock;

use super::ConfigItem;
use crate::constants::KEY_SEPARATOR;

/// Prefix-scoped map from namespaced key to cached item
///
/// Callers address entries with keys relative to the namespace; the cache
/// stores them under `PREFIX/key` with the prefix upper-cased.
pub(crate) struct ConfigCache {
    prefix: String,
    /// `prefix` followed by the key separator
    namespace: String,
    items: RwLock<HashMap<String, ConfigItem>>,
}

impl ConfigCache {
    pub(crate) fn new(prefix: &str) -> Self {
        let prefix = prefix.to_uppercase();
        let namespace = format!("{prefix}{KEY_SEPARATOR}");
        Self {
            prefix,
            namespace,
            items: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    pub(crate) fn namespace(&self) -> &str {
        &self.namespace
    }

    pub(crate) fn full_key(
        &self,
        key: &str,
    ) -> String {
        format!("{}{}", self.namespace, key)
    }

    pub(crate) fn strip_prefix<'a>(
        &self,
        full_key: &'a str,
    ) -> &'a str {
        full_key.strip_prefix(&self.namespace).unwrap_or(full_key)
    }

    pub(crate) fn lookup(
        &self,
        full_key: &str,
    ) -> Option<ConfigItem> {
        self.items.read().get(full_key).cloned()
    }

    pub(crate) fn contains(
        &self,
        full_key: &str,
    ) -> bool {
        self.items.read().contains_key(full_key)
    }

    /// Insert a read-through result unless the key got cached meanwhile
    ///
    /// Returns the entry that ends up cached.
    pub(crate) fn insert_if_absent(
        &self,
        item: ConfigItem,
    ) -> ConfigItem {
        self.items.write().entry(item.key().to_string()).or_insert(item).clone()
    }

    /// Update the value of an already cached key
    ///
    /// Returns `(new, old)` snapshots, or `None` if the key is not cached.
    pub(crate) fn replace_value(
        &self,
        full_key: &str,
        value: &str,
    ) -> Option<(ConfigItem, ConfigItem)> {
        let mut items = self.items.write();
        let entry = items.get_mut(full_key)?;
        let old = entry.clone();
        entry.set_value(value);
        Some((entry.clone(), old))
    }

    pub(crate) fn remove(
        &self,
        full_key: &str,
    ) -> Option<ConfigItem> {
        self.items.write().remove(full_key)
    }

    /// Drop every entry, returning how many were cached
    pub(crate) fn clear(&self) -> usize {
        let mut items = self.items.write();
        let dropped = items.len();
        items.clear();
        dropped
    }

    pub(crate) fn len(&self) -> usize {
        self.items.read().len()
    }
}
