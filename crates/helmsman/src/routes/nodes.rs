//! Node registry administration endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Serialize;

use armada_common::{Node, NodeStatus};

use crate::registry::{NodeSpec, NodeUpdate};
use crate::routes::error_status;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_nodes).post(create_node))
        .route(
            "/{name}",
            get(get_node).patch(update_node).delete(delete_node),
        )
}

/// Node as exposed over HTTP. Ciphertext never leaves the registry; callers
/// only learn whether a credential is configured.
#[derive(Serialize)]
pub struct NodeView {
    name: String,
    host: String,
    port: u16,
    use_tls: bool,
    username: String,
    has_credential: bool,
    status: NodeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_seen_at: Option<i64>,
    created_at: i64,
}

impl From<Node> for NodeView {
    fn from(node: Node) -> Self {
        Self {
            name: node.name,
            host: node.host,
            port: node.port,
            use_tls: node.use_tls,
            username: node.username,
            has_credential: node.encrypted_password.is_some(),
            status: node.status,
            last_seen_at: node.last_seen_at,
            created_at: node.created_at,
        }
    }
}

async fn list_nodes(State(state): State<AppState>) -> Result<Json<Vec<NodeView>>, StatusCode> {
    let nodes = state
        .registry
        .list_nodes()
        .await
        .map_err(|e| error_status(&e))?;

    Ok(Json(nodes.into_iter().map(NodeView::from).collect()))
}

async fn create_node(
    State(state): State<AppState>,
    Json(spec): Json<NodeSpec>,
) -> Result<(StatusCode, Json<NodeView>), StatusCode> {
    let node = state
        .registry
        .create(spec)
        .await
        .map_err(|e| error_status(&e))?;

    Ok((StatusCode::CREATED, Json(node.into())))
}

async fn get_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<NodeView>, StatusCode> {
    let node = state
        .registry
        .get_node(&name)
        .await
        .map_err(|e| error_status(&e))?;

    Ok(Json(node.into()))
}

async fn update_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(changes): Json<NodeUpdate>,
) -> Result<Json<NodeView>, StatusCode> {
    let node = state
        .registry
        .update(&name, changes)
        .await
        .map_err(|e| error_status(&e))?;

    Ok(Json(node.into()))
}

async fn delete_node(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<StatusCode, StatusCode> {
    state
        .registry
        .delete(&name)
        .await
        .map_err(|e| error_status(&e))?;

    Ok(StatusCode::NO_CONTENT)
}
