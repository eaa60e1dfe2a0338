//! Cluster-wide operation dispatcher.
//!
//! Takes a single logical operation, fans it out concurrently to every node
//! in the target set, bounds each node's execution independently, and drains
//! every unit before returning. Partial failure is a valid terminal outcome:
//! failed nodes land in the failure list with an isolated reason, they never
//! abort sibling units or the dispatch itself. No retries, no rollback.

use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use armada_common::constants::{DEFAULT_DISPATCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENCY};
use armada_common::{FailureReason, FleetError, Node};

use crate::adapter::{AdapterError, NodeSession};
use crate::dispatch::{ClusterReport, NodeFailure, NodeSuccess};
use crate::registry::NodeRegistry;

/// Tunables for one dispatcher instance.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Per-node execution budget, measured from dispatch start
    pub timeout: Duration,

    /// Maximum concurrent units of work, regardless of target-set size
    pub max_concurrency: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// The fan-out/fan-in engine.
#[derive(Clone)]
pub struct ClusterDispatcher {
    registry: NodeRegistry,
    options: DispatchOptions,
}

impl ClusterDispatcher {
    pub fn new(registry: NodeRegistry, options: DispatchOptions) -> Self {
        Self { registry, options }
    }

    /// Resolve the target set before any dispatch begins.
    ///
    /// `None` selects the default: every active node. An explicit list is
    /// validated eagerly - unknown or repeated names reject the whole
    /// operation up front and never produce per-node report entries.
    pub async fn resolve_targets(
        &self,
        names: Option<&[String]>,
    ) -> Result<Vec<Node>, FleetError> {
        let Some(names) = names else {
            return self.registry.list_active_nodes().await;
        };

        let mut seen = std::collections::HashSet::new();
        let mut targets = Vec::with_capacity(names.len());
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(FleetError::Validation(format!(
                    "node '{}' listed more than once",
                    name
                )));
            }
            targets.push(self.registry.get_node(name).await?);
        }

        Ok(targets)
    }

    /// Fan an operation out to every target node and collect a complete
    /// partition of the target set.
    ///
    /// Each node runs as its own unit of work under the bounded pool, with
    /// its credential decrypted inside the unit and a deadline of
    /// `options.timeout` from dispatch start. A unit that times out or fails
    /// is recorded and the rest keep running; the report always satisfies
    /// `successes.len() + failures.len() == targets.len()`.
    ///
    /// Contact outcomes feed the registry status lifecycle: success touches
    /// the node online, any failure marks it offline.
    pub async fn dispatch<T, F, Fut>(&self, targets: Vec<Node>, op: F) -> ClusterReport<T>
    where
        T: Send,
        F: Fn(NodeSession) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AdapterError>> + Send,
    {
        let total = targets.len();
        if total == 0 {
            return ClusterReport::default();
        }

        // One shared deadline keeps "returns within ~timeout" true even when
        // the target set is larger than the pool.
        let deadline = tokio::time::Instant::now() + self.options.timeout;
        let op = &op;

        let outcomes: Vec<(String, Result<T, FailureReason>)> = stream::iter(targets)
            .map(|node| self.run_unit(node, op, deadline))
            .buffer_unordered(self.options.max_concurrency.max(1))
            .collect()
            .await;

        let mut report = ClusterReport::default();
        for (node, outcome) in outcomes {
            match outcome {
                Ok(data) => {
                    if let Err(e) = self.registry.touch_online(&node).await {
                        tracing::warn!(node = %node, error = %e, "Failed to record contact");
                    }
                    report.successes.push(NodeSuccess { node, data });
                }
                Err(reason) => {
                    tracing::warn!(node = %node, reason = %reason, "Unit of work failed");
                    if let Err(e) = self.registry.set_offline(&node).await {
                        tracing::warn!(node = %node, error = %e, "Failed to record contact");
                    }
                    report.failures.push(NodeFailure { node, reason });
                }
            }
        }

        debug_assert_eq!(report.len(), total);

        tracing::debug!(
            total = total,
            succeeded = report.successes.len(),
            failed = report.failures.len(),
            "Dispatch complete"
        );

        report
    }

    /// One node's unit of work: decrypt the credential, run the operation,
    /// enforce the deadline. Every failure path is captured here; nothing
    /// propagates to siblings or to the dispatch caller.
    async fn run_unit<T, F, Fut>(
        &self,
        node: Node,
        op: &F,
        deadline: tokio::time::Instant,
    ) -> (String, Result<T, FailureReason>)
    where
        T: Send,
        F: Fn(NodeSession) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, AdapterError>> + Send,
    {
        let name = node.name.clone();

        let password = match self
            .registry
            .vault()
            .decrypt_opt(node.encrypted_password.as_deref())
        {
            Ok(p) => p,
            Err(e) => {
                return (
                    name,
                    Err(FailureReason::Credential {
                        detail: e.to_string(),
                    }),
                );
            }
        };

        let session = NodeSession { node, password };

        let outcome = match tokio::time::timeout_at(deadline, op(session)).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) => Err(FailureReason::Connectivity {
                detail: e.to_string(),
            }),
            Err(_) => Err(FailureReason::Timeout {
                after_secs: self.options.timeout.as_secs(),
            }),
        };

        (name, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MemoryNodeStore, NodeRegistry, NodeSpec};
    use crate::vault::CredentialVault;
    use armada_common::NodeStatus;
    use base64::{Engine, engine::general_purpose::STANDARD};
    use std::sync::Arc;

    fn test_vault() -> CredentialVault {
        CredentialVault::from_base64_key(&STANDARD.encode([9u8; 32])).unwrap()
    }

    async fn fixture(node_names: &[&str], options: DispatchOptions) -> (NodeRegistry, ClusterDispatcher) {
        let registry = NodeRegistry::new(Arc::new(MemoryNodeStore::new()), test_vault());
        for name in node_names {
            registry
                .create(NodeSpec {
                    name: name.to_string(),
                    host: "10.0.0.1".to_string(),
                    port: 443,
                    use_tls: false,
                    username: "admin".to_string(),
                    password: Some("hunter2".to_string()),
                })
                .await
                .unwrap();
        }
        let dispatcher = ClusterDispatcher::new(registry.clone(), options);
        (registry, dispatcher)
    }

    #[tokio::test]
    async fn empty_target_set_returns_immediately() {
        let (_, dispatcher) = fixture(&[], DispatchOptions::default()).await;

        let started = std::time::Instant::now();
        let report: ClusterReport<u32> = dispatcher
            .dispatch(vec![], |_session| async move { Ok(0) })
            .await;

        assert!(report.is_empty());
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn report_partitions_target_set_for_all_sizes() {
        for count in [1usize, 25] {
            let names: Vec<String> = (0..count).map(|i| format!("node-{}", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let (_, dispatcher) = fixture(
                &refs,
                DispatchOptions {
                    timeout: Duration::from_secs(5),
                    max_concurrency: 10,
                },
            )
            .await;

            let targets = dispatcher.resolve_targets(Some(&names)).await.unwrap();
            // Odd-numbered nodes fail, even ones succeed.
            let report = dispatcher
                .dispatch(targets, |session| async move {
                    let idx: usize = session.node.name["node-".len()..].parse().unwrap();
                    if idx % 2 == 1 {
                        Err(AdapterError::Transport("connection refused".into()))
                    } else {
                        Ok(idx)
                    }
                })
                .await;

            assert_eq!(report.len(), count, "partition invariant at n={}", count);
            assert_eq!(report.successes.len(), count.div_ceil(2));
            assert_eq!(report.failures.len(), count / 2);
        }
    }

    #[tokio::test]
    async fn three_nodes_all_succeed() {
        let (_, dispatcher) = fixture(&["a", "b", "c"], DispatchOptions::default()).await;
        let targets = dispatcher
            .resolve_targets(Some(&["a".into(), "b".into(), "c".into()]))
            .await
            .unwrap();

        let report = dispatcher
            .dispatch(targets, |session| async move { Ok(session.node.name) })
            .await;

        assert_eq!(report.successes.len(), 3);
        assert!(report.failures.is_empty());
        assert_eq!(report.outcome(), armada_common::DispatchOutcome::AllSucceeded);
    }

    #[tokio::test]
    async fn hanging_units_are_bounded_by_the_timeout_regardless_of_fleet_size() {
        let names: Vec<String> = (0..25).map(|i| format!("node-{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (_, dispatcher) = fixture(
            &refs,
            DispatchOptions {
                timeout: Duration::from_millis(200),
                max_concurrency: 5,
            },
        )
        .await;
        let targets = dispatcher.resolve_targets(Some(&names)).await.unwrap();

        let started = std::time::Instant::now();
        let report: ClusterReport<u32> = dispatcher
            .dispatch(targets, |_session| async move {
                futures::future::pending::<()>().await;
                unreachable!()
            })
            .await;
        let elapsed = started.elapsed();

        assert_eq!(report.failures.len(), 25);
        assert!(report.successes.is_empty());
        assert!(
            report
                .failures
                .iter()
                .all(|f| matches!(f.reason, FailureReason::Timeout { .. }))
        );
        // 25 hanging nodes through a pool of 5 must still finish in ~one
        // timeout, not five.
        assert!(
            elapsed < Duration::from_secs(2),
            "dispatch took {:?}, expected ~200ms",
            elapsed
        );
    }

    #[tokio::test]
    async fn single_slow_node_times_out_without_delaying_siblings() {
        let (registry, dispatcher) = fixture(
            &["a", "b", "c"],
            DispatchOptions {
                timeout: Duration::from_millis(200),
                max_concurrency: 10,
            },
        )
        .await;
        let targets = dispatcher
            .resolve_targets(Some(&["a".into(), "b".into(), "c".into()]))
            .await
            .unwrap();

        let report = dispatcher
            .dispatch(targets, |session| async move {
                if session.node.name == "b" {
                    futures::future::pending::<()>().await;
                }
                Ok(session.node.name)
            })
            .await;

        assert_eq!(report.successes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        let failure = report.failure_of("b").unwrap();
        assert!(matches!(failure.reason, FailureReason::Timeout { .. }));

        // Contact outcomes feed the status lifecycle.
        assert_eq!(
            registry.get_node("a").await.unwrap().status,
            NodeStatus::Online
        );
        assert_eq!(
            registry.get_node("b").await.unwrap().status,
            NodeStatus::Offline
        );
    }

    #[tokio::test]
    async fn corrupted_ciphertext_isolates_to_one_node() {
        use crate::registry::NodeStore;
        use armada_common::Node;

        let store = Arc::new(MemoryNodeStore::new());
        let registry = NodeRegistry::new(store.clone(), test_vault());
        for name in ["a", "c"] {
            registry
                .create(NodeSpec {
                    name: name.to_string(),
                    host: "10.0.0.1".to_string(),
                    port: 443,
                    use_tls: false,
                    username: "admin".to_string(),
                    password: Some("hunter2".to_string()),
                })
                .await
                .unwrap();
        }

        // Slip a node with a corrupt credential blob in behind the vault.
        let mut broken = Node::new(
            "b".to_string(),
            "10.0.0.2".to_string(),
            443,
            "admin".to_string(),
        );
        broken.encrypted_password = Some(STANDARD.encode([0u8; 40]));
        store.put(&broken).await.unwrap();

        let dispatcher = ClusterDispatcher::new(registry.clone(), DispatchOptions::default());
        let targets = dispatcher
            .resolve_targets(Some(&["a".into(), "b".into(), "c".into()]))
            .await
            .unwrap();

        let report = dispatcher
            .dispatch(targets, |session| async move {
                // Siblings see their decrypted credential as usual.
                assert_eq!(session.password.as_deref(), Some("hunter2"));
                Ok(session.node.name)
            })
            .await;

        assert_eq!(report.successes.len(), 2);
        let failure = report.failure_of("b").unwrap();
        assert!(matches!(failure.reason, FailureReason::Credential { .. }));
        assert_eq!(
            registry.get_node("b").await.unwrap().status,
            NodeStatus::Offline
        );
    }

    #[tokio::test]
    async fn unknown_target_is_rejected_before_dispatch() {
        let (_, dispatcher) = fixture(&["a"], DispatchOptions::default()).await;

        let err = dispatcher
            .resolve_targets(Some(&["a".into(), "ghost".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::NodeNotFound(_)));

        let err = dispatcher
            .resolve_targets(Some(&["a".into(), "a".into()]))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::Validation(_)));
    }

    #[tokio::test]
    async fn default_targets_are_active_nodes_only() {
        let (registry, dispatcher) = fixture(&["a", "b"], DispatchOptions::default()).await;
        registry.touch_online("a").await.unwrap();

        let targets = dispatcher.resolve_targets(None).await.unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].name, "a");
    }
}
