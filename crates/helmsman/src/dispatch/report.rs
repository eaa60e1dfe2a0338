//! Aggregate report of one cluster-wide dispatch.

use serde::Serialize;

use armada_common::{DispatchOutcome, FailureReason};

/// A node whose unit of work completed successfully.
#[derive(Debug, Clone, Serialize)]
pub struct NodeSuccess<T> {
    pub node: String,
    pub data: T,
}

/// A node whose unit of work failed, with the isolated reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeFailure {
    pub node: String,
    pub reason: FailureReason,
}

/// The dispatcher's output for one invocation.
///
/// Every node submitted to the dispatch appears in exactly one of the two
/// lists exactly once, even under timeouts or crashed units:
/// `successes.len() + failures.len() == targets.len()`. Entries carry no
/// ordering guarantee; they are keyed by node name.
#[derive(Debug, Clone, Serialize)]
pub struct ClusterReport<T> {
    pub successes: Vec<NodeSuccess<T>>,
    pub failures: Vec<NodeFailure>,
}

impl<T> Default for ClusterReport<T> {
    fn default() -> Self {
        Self {
            successes: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> ClusterReport<T> {
    /// Total nodes covered by this report
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successes.is_empty() && self.failures.is_empty()
    }

    /// Classify the report for the "write" dispatch profile: a non-empty
    /// failure list is a degraded multi-status outcome, distinct from total
    /// success or total failure. Probe callers may ignore this.
    pub fn outcome(&self) -> DispatchOutcome {
        if self.failures.is_empty() {
            DispatchOutcome::AllSucceeded
        } else if self.successes.is_empty() {
            DispatchOutcome::AllFailed
        } else {
            DispatchOutcome::Partial
        }
    }

    /// Failure entry for a given node, if it failed
    pub fn failure_of(&self, node: &str) -> Option<&NodeFailure> {
        self.failures.iter().find(|f| f.node == node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(node: &str) -> NodeSuccess<u32> {
        NodeSuccess {
            node: node.to_string(),
            data: 0,
        }
    }

    fn failure(node: &str) -> NodeFailure {
        NodeFailure {
            node: node.to_string(),
            reason: FailureReason::Timeout { after_secs: 15 },
        }
    }

    #[test]
    fn outcome_classification() {
        let all_ok: ClusterReport<u32> = ClusterReport {
            successes: vec![success("a"), success("b")],
            failures: vec![],
        };
        assert_eq!(all_ok.outcome(), DispatchOutcome::AllSucceeded);

        let partial: ClusterReport<u32> = ClusterReport {
            successes: vec![success("a")],
            failures: vec![failure("b")],
        };
        assert_eq!(partial.outcome(), DispatchOutcome::Partial);

        let all_failed: ClusterReport<u32> = ClusterReport {
            successes: vec![],
            failures: vec![failure("a")],
        };
        assert_eq!(all_failed.outcome(), DispatchOutcome::AllFailed);

        let empty: ClusterReport<u32> = ClusterReport::default();
        assert_eq!(empty.outcome(), DispatchOutcome::AllSucceeded);
        assert!(empty.is_empty());
    }
}
