use crate::node::NodeHandle;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::Block;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

#[derive(Serialize, Deserialize)]
pub struct Head {
    pub height: u64,
    pub hash: String,
}

#[derive(Deserialize)]
pub struct MineRequest {
    pub data: String,
}

#[derive(Deserialize)]
pub struct AddPeerRequest {
    pub peer: String,
}

/// Control-plane failure. Callers only ever see a generic message.
struct ApiError {
    status: StatusCode,
    message: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

pub fn router(node: NodeHandle) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/chain/head", get(head))
        .route("/blocks", get(blocks))
        .route("/mineBlock", post(mine_block))
        .route("/peers", get(peers))
        .route("/addPeer", post(add_peer))
        .layer(TraceLayer::new_for_http())
        .with_state(node)
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn head(State(node): State<NodeHandle>) -> Result<Json<Head>, ApiError> {
    let tip = node.latest().ok_or(ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "chain unavailable",
    })?;
    Ok(Json(Head {
        height: tip.index,
        hash: tip.hash,
    }))
}

async fn blocks(State(node): State<NodeHandle>) -> Json<Vec<Block>> {
    Json(node.blocks().to_vec())
}

async fn mine_block(
    State(node): State<NodeHandle>,
    Json(req): Json<MineRequest>,
) -> Result<Json<Block>, ApiError> {
    match node.mine(req.data).await {
        Ok(block) => {
            info!(index = block.index, "block added via control plane");
            Ok(Json(block))
        }
        Err(e) => {
            warn!(error = %e, "mine request failed");
            Err(ApiError {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "could not mine block",
            })
        }
    }
}

async fn peers(State(node): State<NodeHandle>) -> Json<Vec<String>> {
    Json(node.peers().to_vec())
}

async fn add_peer(
    State(node): State<NodeHandle>,
    Json(req): Json<AddPeerRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match node.add_peer(&req.peer).await {
        Ok(peer) => {
            info!(%peer, address = %req.peer, "peer added via control plane");
            Ok(Json(serde_json::json!({ "connected": true })))
        }
        Err(e) => {
            warn!(address = %req.peer, error = %e, "add peer failed");
            Err(ApiError {
                status: StatusCode::BAD_GATEWAY,
                message: "could not connect to peer",
            })
        }
    }
}
