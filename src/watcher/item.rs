use std::fmt;

/// Snapshot of a cached configuration value
///
/// Values are kept as the raw string stored in the cluster; typed views are
/// parsed on demand. A value that does not parse as the requested numeric
/// type reads as `0` (or `0.0`) instead of failing, so callers can read
/// optional numeric settings without error plumbing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigItem {
    key: String,
    value: String,
}

impl ConfigItem {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Item carrying only a key, used as the "new" side of a delete
    pub fn empty(key: impl Into<String>) -> Self {
        Self::new(key, String::new())
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Value as `i32`, `0` when it does not parse
    pub fn as_int(&self) -> i32 {
        self.value.parse().unwrap_or_default()
    }

    /// Value as `i64`, `0` when it does not parse
    pub fn as_i64(&self) -> i64 {
        self.value.parse().unwrap_or_default()
    }

    /// Value as `f64`, `0.0` when it does not parse
    pub fn as_f64(&self) -> f64 {
        self.value.parse().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub(crate) fn set_value(
        &mut self,
        value: impl Into<String>,
    ) {
        self.value = value.into();
    }

    pub(crate) fn with_key(
        mut self,
        key: impl Into<String>,
    ) -> Self {
        self.key = key.into();
        self
    }
}

impl fmt::Display for ConfigItem {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.value)
    }
}
