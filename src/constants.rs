// -
// Defaults

/// Default store endpoint used when none is configured
pub(crate) const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:2379";

/// Dial timeout for a single connection attempt
pub(crate) const DEFAULT_DIAL_TIMEOUT_MS: u64 = 5000;

/// Bound for every synchronous store call (read-through, member list)
pub(crate) const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Interval between endpoint reconciliation passes
pub(crate) const DEFAULT_RECONCILE_INTERVAL_MS: u64 = 5000;

/// Retries after the first failed connection attempt
pub(crate) const DEFAULT_CONNECT_RETRIES: usize = 5;

/// Capacity of the per-watcher hook registration queue
pub(crate) const DEFAULT_HOOK_QUEUE_SIZE: usize = 64;

// -
// Key layout

/// Separator placed between the namespace prefix and the key
pub(crate) const KEY_SEPARATOR: char = '/';

/// Environment variable prefix for configuration overrides
pub(crate) const ENV_PREFIX: &str = "CONFWATCH";
