//! Common error types for Armada components.

use thiserror::Error;

/// Common errors across Armada components.
///
/// Per-node dispatch failures are deliberately *not* represented here: they
/// live in the dispatch report (`FailureReason`) and are never raised to the
/// caller. Only errors that reject an operation before any dispatch begins
/// belong in this enum.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Configuration error (vault key missing/invalid, bad config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed operation input, rejected before dispatch
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced node does not exist in the registry
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Registry store connection/operation error
    #[error("Store error: {0}")]
    Store(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FleetError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Validation(_) => 400,
            Self::NodeNotFound(_) => 404,
            Self::Store(_) => 503,
            Self::Internal(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(FleetError::Validation("bad".into()).status_code(), 400);
        assert_eq!(FleetError::NodeNotFound("x".into()).status_code(), 404);
        assert_eq!(FleetError::Store("down".into()).status_code(), 503);
    }
}
