//! Application state and shared resources.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::adapter::RestAdapter;
use crate::config::AppConfig;
use crate::dispatch::{ClusterDispatcher, DispatchOptions};
use crate::prober::HealthProber;
use crate::registry::{MemoryNodeStore, NodeRegistry, NodeStore, RedisNodeStore};
use crate::vault::CredentialVault;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Node registry (vault-backed credential storage)
    pub registry: NodeRegistry,

    /// Cluster fan-out engine
    pub dispatcher: ClusterDispatcher,

    /// Periodic health prober
    pub prober: Arc<HealthProber>,
}

impl AppState {
    /// Create new application state, connecting the node store.
    ///
    /// The vault key must already be loaded; a missing key never gets this
    /// far (fatal at startup).
    pub async fn new(config: AppConfig, vault: CredentialVault) -> Result<Self> {
        let store: Arc<dyn NodeStore> = if config.standalone {
            tracing::warn!("Standalone mode: node registry is in-memory only");
            Arc::new(MemoryNodeStore::new())
        } else {
            let client = redis::Client::open(config.redis_url.as_str())
                .context("Failed to create Redis client")?;
            let redis = redis::aio::ConnectionManager::new(client)
                .await
                .context("Failed to connect to Redis")?;
            Arc::new(RedisNodeStore::new(redis))
        };

        let registry = NodeRegistry::new(store, vault);

        let dispatcher = ClusterDispatcher::new(
            registry.clone(),
            DispatchOptions {
                timeout: std::time::Duration::from_secs(config.dispatch.timeout_secs),
                max_concurrency: config.dispatch.max_concurrency,
            },
        );

        let prober = Arc::new(HealthProber::new(
            dispatcher.clone(),
            registry.clone(),
            Arc::new(RestAdapter::new()),
            &config.probe.path,
        ));

        Ok(Self {
            config,
            registry,
            dispatcher,
            prober,
        })
    }
}
