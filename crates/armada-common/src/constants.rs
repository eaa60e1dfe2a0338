//! Shared constants for Armada components.

/// Default Redis connection URL
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// Default Helmsman HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8880";

/// Default per-node dispatch timeout (seconds)
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 15;

/// Default maximum concurrent units of work per dispatch
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

/// Default health probe interval (seconds)
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 30;

/// Environment variable holding the base64-encoded 32-byte vault key
pub const VAULT_KEY_ENV: &str = "ARMADA_VAULT_KEY";

/// Redis key prefixes
pub mod redis_keys {
    /// Node record: node:{name}
    pub const NODE_PREFIX: &str = "node:";

    /// Set of all registered node names
    pub const NODE_INDEX: &str = "nodes";
}
