//! Periodic cluster health probing.
//!
//! Every cycle dispatches a "fetch system resource" operation against all
//! registered nodes - offline ones included, so they can recover - and
//! recomputes the cluster health summary from scratch. Status transitions
//! ride on the dispatcher's contact recording (`touch_online`/`set_offline`).

use std::sync::Arc;

use tokio::sync::RwLock;

use armada_common::{ClusterHealthSummary, NodeHealthEntry, NodeMetrics};

use crate::adapter::{NodeAdapter, OperationDescriptor};
use crate::audit;
use crate::dispatch::ClusterDispatcher;
use crate::registry::NodeRegistry;

/// Default identity/resource endpoint probed on every cycle
pub const DEFAULT_PROBE_PATH: &str = "/rest/system/resource";

/// Health prober: a periodic consumer of the dispatcher.
pub struct HealthProber {
    dispatcher: ClusterDispatcher,
    registry: NodeRegistry,
    adapter: Arc<dyn NodeAdapter>,
    probe_op: OperationDescriptor,
    summary: RwLock<ClusterHealthSummary>,
}

impl HealthProber {
    pub fn new(
        dispatcher: ClusterDispatcher,
        registry: NodeRegistry,
        adapter: Arc<dyn NodeAdapter>,
        probe_path: &str,
    ) -> Self {
        Self {
            dispatcher,
            registry,
            adapter,
            probe_op: OperationDescriptor::get(probe_path),
            summary: RwLock::new(ClusterHealthSummary::default()),
        }
    }

    /// Summary of the last completed probe cycle.
    pub async fn summary(&self) -> ClusterHealthSummary {
        self.summary.read().await.clone()
    }

    /// Run one probe cycle across the whole fleet, record it in the audit
    /// trail, and publish the fresh summary. A store error leaves the
    /// previous summary in place.
    pub async fn run_cycle(&self) -> ClusterHealthSummary {
        let nodes = match self.registry.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                tracing::error!(error = %e, "Probe cycle skipped: node listing failed");
                return self.summary().await;
            }
        };

        let adapter = self.adapter.clone();
        let probe_op = self.probe_op.clone();
        let report = self
            .dispatcher
            .dispatch(nodes, move |session| {
                let adapter = adapter.clone();
                let op = probe_op.clone();
                async move { adapter.perform(&session, &op).await }
            })
            .await;

        audit::correlate("probe", "system_resource", "prober", &report).emit();

        let now = chrono::Utc::now().timestamp();
        let mut entries = Vec::with_capacity(report.len());

        for success in &report.successes {
            // Devices report what they know; keep whatever parses.
            let metrics: NodeMetrics =
                serde_json::from_value(success.data.clone()).unwrap_or_default();
            entries.push(NodeHealthEntry {
                name: success.node.clone(),
                healthy: true,
                last_seen_at: Some(now),
                metrics: Some(metrics),
                failure: None,
            });
        }

        for failure in &report.failures {
            let last_seen_at = match self.registry.get_node(&failure.node).await {
                Ok(node) => node.last_seen_at,
                Err(_) => None,
            };
            entries.push(NodeHealthEntry {
                name: failure.node.clone(),
                healthy: false,
                last_seen_at,
                metrics: None,
                failure: Some(failure.reason.clone()),
            });
        }

        let fresh = ClusterHealthSummary {
            total: entries.len(),
            healthy: report.successes.len(),
            unhealthy: report.failures.len(),
            probed_at: now,
            nodes: entries,
        };

        tracing::info!(
            total = fresh.total,
            healthy = fresh.healthy,
            unhealthy = fresh.unhealthy,
            "Probe cycle complete"
        );

        *self.summary.write().await = fresh.clone();
        fresh
    }
}

/// Background worker driving the prober on a fixed interval.
pub async fn prober_worker(
    prober: Arc<HealthProber>,
    interval_secs: u64,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = interval_secs, "🩺 Health prober started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(interval_secs)) => {
                prober.run_cycle().await;
            }
            _ = shutdown.recv() => {
                tracing::info!("🩺 Health prober shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterError, NodeSession};
    use crate::dispatch::DispatchOptions;
    use crate::registry::{MemoryNodeStore, NodeSpec};
    use crate::vault::CredentialVault;
    use armada_common::NodeStatus;
    use async_trait::async_trait;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde_json::json;

    /// Adapter answering from a fixed table keyed by node name.
    struct ScriptedAdapter;

    #[async_trait]
    impl NodeAdapter for ScriptedAdapter {
        async fn perform(
            &self,
            session: &NodeSession,
            _op: &OperationDescriptor,
        ) -> Result<serde_json::Value, AdapterError> {
            match session.node.name.as_str() {
                "dead" => Err(AdapterError::Transport("no route to host".into())),
                name => Ok(json!({
                    "version": format!("7.14 ({})", name),
                    "uptime_secs": 86400,
                    "cpu_load": 12,
                })),
            }
        }
    }

    async fn fixture() -> (NodeRegistry, Arc<HealthProber>) {
        let vault = CredentialVault::from_base64_key(&STANDARD.encode([5u8; 32])).unwrap();
        let registry = NodeRegistry::new(Arc::new(MemoryNodeStore::new()), vault);
        for name in ["alive", "dead"] {
            registry
                .create(NodeSpec {
                    name: name.to_string(),
                    host: "10.0.0.1".to_string(),
                    port: 443,
                    use_tls: false,
                    username: "admin".to_string(),
                    password: None,
                })
                .await
                .unwrap();
        }
        let dispatcher = ClusterDispatcher::new(registry.clone(), DispatchOptions::default());
        let prober = Arc::new(HealthProber::new(
            dispatcher,
            registry.clone(),
            Arc::new(ScriptedAdapter),
            DEFAULT_PROBE_PATH,
        ));
        (registry, prober)
    }

    #[tokio::test]
    async fn probe_cycle_updates_status_and_summary() {
        let (registry, prober) = fixture().await;

        let summary = prober.run_cycle().await;
        assert_eq!(summary.total, 2);
        assert_eq!(summary.healthy, 1);
        assert_eq!(summary.unhealthy, 1);

        let alive = registry.get_node("alive").await.unwrap();
        assert_eq!(alive.status, NodeStatus::Online);
        assert!(alive.last_seen_at.is_some());

        let dead = registry.get_node("dead").await.unwrap();
        assert_eq!(dead.status, NodeStatus::Offline);

        let entry = summary.nodes.iter().find(|n| n.name == "alive").unwrap();
        let metrics = entry.metrics.as_ref().unwrap();
        assert_eq!(metrics.uptime_secs, Some(86400));
        assert_eq!(metrics.cpu_load, Some(12));
    }

    #[tokio::test]
    async fn offline_nodes_are_still_probed_and_can_recover() {
        let (registry, prober) = fixture().await;
        registry.set_offline("alive").await.unwrap();

        let summary = prober.run_cycle().await;
        // Probes target all nodes, not just active ones.
        assert_eq!(summary.total, 2);
        assert_eq!(
            registry.get_node("alive").await.unwrap().status,
            NodeStatus::Online
        );
    }

    #[tokio::test]
    async fn probe_cycle_lands_in_the_audit_trail() {
        let (_registry, prober) = fixture().await;

        let sink: Arc<std::sync::Mutex<Vec<u8>>> = Arc::new(std::sync::Mutex::new(Vec::new()));
        let writer = sink.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || SharedSink(writer.clone()))
            .with_ansi(false)
            .finish();

        let guard = tracing::subscriber::set_default(subscriber);
        prober.run_cycle().await;
        drop(guard);

        let logs = String::from_utf8(sink.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("armada::audit"), "no audit record emitted");
        assert!(logs.contains(r#""action":"probe""#));
        assert!(logs.contains(r#""outcome":"partial""#));
        assert!(logs.contains(r#""node":"dead""#));
    }

    struct SharedSink(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn summary_is_recomputed_fresh_each_cycle() {
        let (registry, prober) = fixture().await;
        prober.run_cycle().await;

        registry.delete("dead").await.unwrap();
        let summary = prober.run_cycle().await;

        assert_eq!(summary.total, 1);
        assert_eq!(summary.unhealthy, 0);
        assert!(summary.nodes.iter().all(|n| n.name != "dead"));
    }
}
