//! Audit correlation at the dispatch boundary.
//!
//! Folds a cluster report plus operation metadata into one structured record
//! for the external audit sink. No business logic lives here; partial failure
//! is reported with both the successful nodes and each failure reason, never
//! silently dropped.

use serde::Serialize;

use armada_common::{DispatchOutcome, FailureReason};

use crate::dispatch::ClusterReport;

/// Per-node line item in an audit record.
#[derive(Debug, Clone, Serialize)]
pub struct AuditNodeDetail {
    pub node: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

/// One audit record describing a cluster-wide operation.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecord {
    /// Action name, e.g. "create"
    pub action: String,

    /// Resource type the action applied to, e.g. "dns_record"
    pub resource: String,

    /// Initiating actor
    pub actor: String,

    pub outcome: DispatchOutcome,

    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,

    pub nodes: Vec<AuditNodeDetail>,

    /// Unix epoch seconds
    pub recorded_at: i64,
}

/// Build an audit record from a dispatch report.
pub fn correlate<T>(
    action: &str,
    resource: &str,
    actor: &str,
    report: &ClusterReport<T>,
) -> AuditRecord {
    let mut nodes = Vec::with_capacity(report.len());

    for success in &report.successes {
        nodes.push(AuditNodeDetail {
            node: success.node.clone(),
            success: true,
            failure: None,
        });
    }
    for failure in &report.failures {
        nodes.push(AuditNodeDetail {
            node: failure.node.clone(),
            success: false,
            failure: Some(failure.reason.clone()),
        });
    }

    AuditRecord {
        action: action.to_string(),
        resource: resource.to_string(),
        actor: actor.to_string(),
        outcome: report.outcome(),
        total: report.len(),
        succeeded: report.successes.len(),
        failed: report.failures.len(),
        nodes,
        recorded_at: chrono::Utc::now().timestamp(),
    }
}

impl AuditRecord {
    /// Hand the record to the audit sink. The sink itself is external; here
    /// it is a dedicated structured log target.
    pub fn emit(&self) {
        match serde_json::to_string(self) {
            Ok(json) => tracing::info!(target: "armada::audit", record = %json),
            Err(e) => tracing::error!(error = %e, "Failed to serialize audit record"),
        }
    }
}
