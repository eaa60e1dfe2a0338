//! Resource operation adapter boundary.
//!
//! The dispatcher treats a device call as an opaque two-outcome RPC: perform
//! operation O against node N, get data or an error. `RestAdapter` is the
//! thin JSON-over-HTTP implementation of that contract; device-specific
//! schemas and field validation stay outside this crate.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use armada_common::Node;

/// A node together with its transiently decrypted credential.
///
/// Only constructed inside a dispatch unit of work; the plaintext is dropped
/// when the unit completes.
#[derive(Debug, Clone)]
pub struct NodeSession {
    pub node: Node,
    pub password: Option<String>,
}

/// HTTP method of a device operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl From<OperationMethod> for reqwest::Method {
    fn from(method: OperationMethod) -> Self {
        match method {
            OperationMethod::Get => reqwest::Method::GET,
            OperationMethod::Post => reqwest::Method::POST,
            OperationMethod::Put => reqwest::Method::PUT,
            OperationMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One logical operation against a node's management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDescriptor {
    pub method: OperationMethod,

    /// Path under the node's base URL, e.g. `/rest/system/resource`
    pub path: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl OperationDescriptor {
    pub fn get(path: &str) -> Self {
        Self {
            method: OperationMethod::Get,
            path: path.to_string(),
            body: None,
        }
    }
}

/// Errors crossing the adapter boundary.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Network-level failure reaching the node
    #[error("transport error: {0}")]
    Transport(String),

    /// The device answered with a non-success status
    #[error("device returned {status}: {detail}")]
    Device { status: u16, detail: String },
}

/// Performs one operation against one node. Supplied by device-specific
/// client code; the dispatcher imposes nothing beyond this contract.
#[async_trait]
pub trait NodeAdapter: Send + Sync {
    async fn perform(
        &self,
        session: &NodeSession,
        op: &OperationDescriptor,
    ) -> Result<Value, AdapterError>;
}

/// JSON-over-HTTP adapter with basic auth.
pub struct RestAdapter {
    client: reqwest::Client,
}

impl RestAdapter {
    /// The client carries no global timeout; per-node deadlines belong to
    /// the dispatcher.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for RestAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeAdapter for RestAdapter {
    async fn perform(
        &self,
        session: &NodeSession,
        op: &OperationDescriptor,
    ) -> Result<Value, AdapterError> {
        let url = format!("{}{}", session.node.base_url(), op.path);

        let mut request = self
            .client
            .request(op.method.into(), &url)
            .basic_auth(&session.node.username, session.password.as_deref());

        if let Some(ref body) = op.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AdapterError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AdapterError::Device {
                status: status.as_u16(),
                detail: text,
            });
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }

        // Some appliances answer non-JSON bodies on success; pass them
        // through as a string rather than failing the operation.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}
