//! Node registry service.
//!
//! All credential mutation goes through the vault, so plaintext never reaches
//! the store. Status transitions (`touch_online`/`set_offline`) are
//! field-level patches: idempotent, last-writer-wins on status and timestamp,
//! and never touching identity or credential fields, so overlapping
//! dispatches can race administrative edits safely.

use std::sync::Arc;

use serde::Deserialize;

use armada_common::{FleetError, Node, NodeStatus};

use crate::registry::NodeStore;
use crate::vault::CredentialVault;

/// Parameters for registering a new node.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub use_tls: bool,
    pub username: String,
    /// Plaintext credential; encrypted before it touches the store
    #[serde(default)]
    pub password: Option<String>,
}

/// Partial update of an existing node. `None` fields are left unchanged;
/// a present `password` is re-encrypted through the vault.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeUpdate {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub use_tls: Option<bool>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Registry of managed nodes.
#[derive(Clone)]
pub struct NodeRegistry {
    store: Arc<dyn NodeStore>,
    vault: CredentialVault,
}

impl NodeRegistry {
    pub fn new(store: Arc<dyn NodeStore>, vault: CredentialVault) -> Self {
        Self { store, vault }
    }

    /// The vault sealing this registry's credentials. Exposed to the
    /// dispatcher so credential resolution stays inside each unit of work.
    pub(crate) fn vault(&self) -> &CredentialVault {
        &self.vault
    }

    /// Is the backing store reachable?
    pub async fn ping(&self) -> bool {
        self.store.ping().await
    }

    /// Register a new node. Starts `offline` until the first successful
    /// contact. Deleting it later leaves remote device state untouched.
    pub async fn create(&self, spec: NodeSpec) -> Result<Node, FleetError> {
        if spec.name.trim().is_empty() {
            return Err(FleetError::Validation("node name must not be empty".into()));
        }
        if spec.host.trim().is_empty() {
            return Err(FleetError::Validation("node host must not be empty".into()));
        }
        if self.store.get(&spec.name).await?.is_some() {
            return Err(FleetError::Validation(format!(
                "node '{}' already exists",
                spec.name
            )));
        }

        let mut node = Node::new(spec.name, spec.host, spec.port, spec.username);
        node.use_tls = spec.use_tls;
        node.encrypted_password = self
            .vault
            .encrypt_opt(spec.password.as_deref())
            .map_err(|e| FleetError::Internal(e.to_string()))?;

        self.store.put(&node).await?;

        tracing::info!(node = %node.name, host = %node.host, "Node registered");

        Ok(node)
    }

    /// Apply administrative edits to identity or credentials.
    pub async fn update(&self, name: &str, changes: NodeUpdate) -> Result<Node, FleetError> {
        let mut node = self.get_node(name).await?;

        if let Some(host) = changes.host {
            node.host = host;
        }
        if let Some(port) = changes.port {
            node.port = port;
        }
        if let Some(use_tls) = changes.use_tls {
            node.use_tls = use_tls;
        }
        if let Some(username) = changes.username {
            node.username = username;
        }
        if let Some(ref password) = changes.password {
            node.encrypted_password = self
                .vault
                .encrypt_opt(Some(password))
                .map_err(|e| FleetError::Internal(e.to_string()))?;
        }

        self.store.put(&node).await?;

        tracing::info!(node = %node.name, "Node updated");

        Ok(node)
    }

    /// Remove a node from the registry. No cascading cleanup on the remote
    /// device.
    pub async fn delete(&self, name: &str) -> Result<(), FleetError> {
        if !self.store.delete(name).await? {
            return Err(FleetError::NodeNotFound(name.to_string()));
        }

        tracing::info!(node = %name, "Node deleted");

        Ok(())
    }

    pub async fn get_node(&self, name: &str) -> Result<Node, FleetError> {
        self.store
            .get(name)
            .await?
            .ok_or_else(|| FleetError::NodeNotFound(name.to_string()))
    }

    /// All registered nodes, offline included.
    pub async fn list_nodes(&self) -> Result<Vec<Node>, FleetError> {
        self.store.list().await
    }

    /// Default dispatch target set: every node whose status is not `offline`.
    pub async fn list_active_nodes(&self) -> Result<Vec<Node>, FleetError> {
        Ok(self
            .store
            .list()
            .await?
            .into_iter()
            .filter(Node::is_active)
            .collect())
    }

    /// Record a successful contact: status `online`, `last_seen_at` now.
    /// A field-level patch, so a touch racing an administrative edit never
    /// writes identity or credential fields back from a stale read.
    /// Idempotent; a node deleted by a concurrent administrative action is
    /// silently skipped rather than resurrected.
    pub async fn touch_online(&self, name: &str) -> Result<(), FleetError> {
        let now = chrono::Utc::now().timestamp();
        if !self
            .store
            .set_status(name, NodeStatus::Online, Some(now))
            .await?
        {
            tracing::debug!(node = %name, "touch_online on unknown node, skipping");
        }
        Ok(())
    }

    /// Record a failed contact: status `offline`, `last_seen_at` untouched
    /// (it marks the last *successful* contact only). Idempotent, same
    /// field-level patch as `touch_online`.
    pub async fn set_offline(&self, name: &str) -> Result<(), FleetError> {
        if !self.store.set_status(name, NodeStatus::Offline, None).await? {
            tracing::debug!(node = %name, "set_offline on unknown node, skipping");
        }
        Ok(())
    }
}
