//! # Armada Common
//!
//! Shared types, errors, and constants used across Armada components.
//!
//! ## Modules
//! - `types` - Core data structures (Node, NodeStatus, ClusterHealthSummary, etc.)
//! - `error` - Common error types
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::FleetError;
pub use types::*;
