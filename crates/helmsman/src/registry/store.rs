//! Node persistence backends.
//!
//! The registry only needs keyed CRUD plus a full listing, so the store is a
//! small trait with a Redis implementation for deployments and an in-memory
//! implementation for tests and standalone mode.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use armada_common::constants::redis_keys;
use armada_common::{FleetError, Node, NodeStatus};

/// Durable store for node records, keyed by cluster-unique name.
#[async_trait]
pub trait NodeStore: Send + Sync {
    async fn get(&self, name: &str) -> Result<Option<Node>, FleetError>;

    /// Insert or overwrite a node record (last-writer-wins)
    async fn put(&self, node: &Node) -> Result<(), FleetError>;

    /// Patch only the contact-status fields of a record, leaving identity
    /// and credential fields untouched. `last_seen_at` of `None` keeps the
    /// stored timestamp. Returns false if the node does not exist.
    async fn set_status(
        &self,
        name: &str,
        status: NodeStatus,
        last_seen_at: Option<i64>,
    ) -> Result<bool, FleetError>;

    /// Remove a node record; returns false if it did not exist
    async fn delete(&self, name: &str) -> Result<bool, FleetError>;

    async fn list(&self) -> Result<Vec<Node>, FleetError>;

    /// Is the backing store reachable?
    async fn ping(&self) -> bool;
}

// Runs server-side so the patch never writes back a stale copy of the whole
// record over a concurrent full-record write.
const SET_STATUS_SCRIPT: &str = r#"
local raw = redis.call('GET', KEYS[1])
if not raw then return 0 end
local node = cjson.decode(raw)
node.status = ARGV[1]
if ARGV[2] ~= '' then node.last_seen_at = tonumber(ARGV[2]) end
redis.call('SET', KEYS[1], cjson.encode(node))
return 1
"#;

/// Redis-backed node store.
///
/// Records live as JSON under `node:{name}`, with a `nodes` set as the
/// listing index.
pub struct RedisNodeStore {
    redis: redis::aio::ConnectionManager,
}

impl RedisNodeStore {
    pub fn new(redis: redis::aio::ConnectionManager) -> Self {
        Self { redis }
    }

    fn key(name: &str) -> String {
        format!("{}{}", redis_keys::NODE_PREFIX, name)
    }
}

#[async_trait]
impl NodeStore for RedisNodeStore {
    async fn get(&self, name: &str) -> Result<Option<Node>, FleetError> {
        let mut conn = self.redis.clone();
        let data: Option<String> = conn
            .get(Self::key(name))
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;

        match data {
            Some(d) => {
                let node = serde_json::from_str(&d)
                    .map_err(|e| FleetError::Store(format!("corrupt node record: {}", e)))?;
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, node: &Node) -> Result<(), FleetError> {
        let mut conn = self.redis.clone();
        let data = serde_json::to_string(node)
            .map_err(|e| FleetError::Internal(e.to_string()))?;

        let _: () = conn
            .set(Self::key(&node.name), data)
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;
        let _: () = conn
            .sadd(redis_keys::NODE_INDEX, &node.name)
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;

        Ok(())
    }

    async fn set_status(
        &self,
        name: &str,
        status: NodeStatus,
        last_seen_at: Option<i64>,
    ) -> Result<bool, FleetError> {
        let mut conn = self.redis.clone();
        let status = match status {
            NodeStatus::Online => "online",
            NodeStatus::Offline => "offline",
        };
        let seen = last_seen_at.map(|t| t.to_string()).unwrap_or_default();

        let updated: i32 = redis::Script::new(SET_STATUS_SCRIPT)
            .key(Self::key(name))
            .arg(status)
            .arg(seen)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;

        Ok(updated > 0)
    }

    async fn delete(&self, name: &str) -> Result<bool, FleetError> {
        let mut conn = self.redis.clone();
        let removed: u32 = conn
            .del(Self::key(name))
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;
        let _: () = conn
            .srem(redis_keys::NODE_INDEX, name)
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;

        Ok(removed > 0)
    }

    async fn list(&self) -> Result<Vec<Node>, FleetError> {
        let mut conn = self.redis.clone();
        let names: Vec<String> = conn
            .smembers(redis_keys::NODE_INDEX)
            .await
            .map_err(|e| FleetError::Store(e.to_string()))?;

        let mut nodes = Vec::with_capacity(names.len());
        for name in names {
            // A name can linger in the index briefly after a concurrent
            // delete; skip missing records instead of failing the listing.
            if let Some(node) = self.get(&name).await? {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    async fn ping(&self) -> bool {
        let mut conn = self.redis.clone();
        let result: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        result.is_ok()
    }
}

/// In-memory node store for tests and standalone (single-process) mode.
#[derive(Default)]
pub struct MemoryNodeStore {
    nodes: RwLock<HashMap<String, Node>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NodeStore for MemoryNodeStore {
    async fn get(&self, name: &str) -> Result<Option<Node>, FleetError> {
        Ok(self.nodes.read().await.get(name).cloned())
    }

    async fn put(&self, node: &Node) -> Result<(), FleetError> {
        self.nodes
            .write()
            .await
            .insert(node.name.clone(), node.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<bool, FleetError> {
        Ok(self.nodes.write().await.remove(name).is_some())
    }

    async fn set_status(
        &self,
        name: &str,
        status: NodeStatus,
        last_seen_at: Option<i64>,
    ) -> Result<bool, FleetError> {
        let mut nodes = self.nodes.write().await;
        let Some(node) = nodes.get_mut(name) else {
            return Ok(false);
        };

        node.status = status;
        if let Some(seen) = last_seen_at {
            node.last_seen_at = Some(seen);
        }

        Ok(true)
    }

    async fn list(&self) -> Result<Vec<Node>, FleetError> {
        Ok(self.nodes.read().await.values().cloned().collect())
    }

    async fn ping(&self) -> bool {
        true
    }
}
