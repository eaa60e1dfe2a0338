//! Core types shared across Armada components.

use serde::{Deserialize, Serialize};

/// Node reachability status.
///
/// Every node starts `offline` and only becomes `online` after a successful
/// contact (probe or dispatched operation). There is no automatic transition
/// back to `online` without a fresh successful contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// Last contact attempt succeeded
    Online,
    /// Never contacted, or last contact attempt failed
    Offline,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::Offline
    }
}

/// A managed remote appliance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Cluster-unique node name
    pub name: String,

    /// Hostname or IP of the management API
    pub host: String,

    /// Management API port
    pub port: u16,

    /// Use TLS when talking to the management API
    #[serde(default)]
    pub use_tls: bool,

    /// API username
    pub username: String,

    /// Credential at rest: vault ciphertext blob, never plaintext.
    /// `None` means no credential configured yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,

    /// Current reachability status
    #[serde(default)]
    pub status: NodeStatus,

    /// Timestamp of the last successful contact (Unix epoch seconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<i64>,

    /// Timestamp of registration (Unix epoch seconds)
    pub created_at: i64,
}

impl Node {
    pub fn new(name: String, host: String, port: u16, username: String) -> Self {
        Self {
            name,
            host,
            port,
            use_tls: false,
            username,
            encrypted_password: None,
            status: NodeStatus::Offline,
            last_seen_at: None,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Active nodes are the default dispatch target set
    pub fn is_active(&self) -> bool {
        self.status != NodeStatus::Offline
    }

    /// Base URL of the node's management API
    pub fn base_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// Why a single node's unit of work failed.
///
/// Per-node failures are always captured in the dispatch report, never
/// raised to the caller. Timeouts are tagged distinctly from connectivity
/// errors so callers can tell "slow" from "broken".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    /// Stored credential could not be decrypted for this node
    Credential { detail: String },
    /// Network failure or device-side error
    Connectivity { detail: String },
    /// The node's unit of work exceeded its per-node timeout
    Timeout { after_secs: u64 },
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Credential { detail } => write!(f, "credential error: {}", detail),
            Self::Connectivity { detail } => write!(f, "connectivity error: {}", detail),
            Self::Timeout { after_secs } => write!(f, "timed out after {}s", after_secs),
        }
    }
}

/// Overall outcome of one cluster-wide dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Every targeted node succeeded (includes the empty target set)
    AllSucceeded,
    /// Some nodes succeeded, some failed ("multi-status")
    Partial,
    /// Every targeted node failed
    AllFailed,
}

/// Resource metrics reported by a node's identity endpoint.
///
/// Fields are optional: devices report what they know, the prober keeps
/// whatever parses.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,

    /// CPU load percentage (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_load: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_memory: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_memory: Option<u64>,
}

/// Health of a single node as of the last probe cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeHealthEntry {
    pub name: String,

    pub healthy: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen_at: Option<i64>,

    /// Metrics from this cycle's probe; `None` when the probe failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<NodeMetrics>,

    /// Failure reason when unhealthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

/// Cluster-wide health as of the last completed probe cycle.
///
/// Recomputed fresh on every cycle; never accumulates stale entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterHealthSummary {
    /// Total nodes probed
    pub total: usize,

    /// Nodes that answered the probe
    pub healthy: usize,

    /// Nodes that failed the probe (timeout, connectivity, credential)
    pub unhealthy: usize,

    /// When the probe cycle completed (Unix epoch seconds)
    pub probed_at: i64,

    /// Per-node detail
    pub nodes: Vec<NodeHealthEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_starts_offline() {
        let node = Node::new(
            "edge-1".to_string(),
            "10.0.0.1".to_string(),
            8728,
            "admin".to_string(),
        );
        assert_eq!(node.status, NodeStatus::Offline);
        assert!(!node.is_active());
        assert!(node.last_seen_at.is_none());
    }

    #[test]
    fn base_url_respects_tls_flag() {
        let mut node = Node::new(
            "edge-1".to_string(),
            "router.lan".to_string(),
            443,
            "admin".to_string(),
        );
        assert_eq!(node.base_url(), "http://router.lan:443");
        node.use_tls = true;
        assert_eq!(node.base_url(), "https://router.lan:443");
    }

    #[test]
    fn failure_reason_serializes_with_kind_tag() {
        let reason = FailureReason::Timeout { after_secs: 15 };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["after_secs"], 15);
    }
}
