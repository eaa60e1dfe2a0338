//! Cluster dispatch module.
//!
//! Fan-out/fan-in engine: one bounded, independently timed unit of work per
//! node, aggregated into a complete partition of the target set.

mod dispatcher;
mod report;

pub use dispatcher::{ClusterDispatcher, DispatchOptions};
pub use report::{ClusterReport, NodeFailure, NodeSuccess};
