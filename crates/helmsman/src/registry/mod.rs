//! Node registry module.
//!
//! Holds node identity, connection parameters, encrypted credentials, and
//! the online/offline status lifecycle.

mod service;
mod store;

pub use service::{NodeRegistry, NodeSpec, NodeUpdate};
pub use store::{MemoryNodeStore, NodeStore, RedisNodeStore};
