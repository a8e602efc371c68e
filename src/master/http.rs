//! HTTP API for the master
//!
//! The public surface clients talk to. Handlers hold no coordination
//! logic: they translate queries and JSON bodies into coordinator calls
//! and coordinator errors into status codes, so the transport could be
//! swapped without touching placement or fan-out.

use crate::master::coordinator::Coordinator;
use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared master state for HTTP handlers.
#[derive(Clone)]
pub struct MasterState {
    pub coordinator: Arc<Coordinator>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: String,
}

#[derive(Debug, Deserialize)]
struct JoinParams {
    id: String,
    port: u16,
}

#[derive(Debug, Deserialize)]
struct LeaveParams {
    id: String,
}

/// Creates the HTTP router with all public endpoints.
pub fn create_router(state: MasterState) -> Router {
    Router::new()
        // Key operations
        .route("/get", get(get_key))
        .route("/set", post(set_key))
        .route("/update", post(update_key))
        .route("/delete", delete(delete_key))
        // Membership
        .route("/join", post(join_cluster))
        .route("/leave", post(leave_cluster))
        // Health check
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_key(
    State(state): State<MasterState>,
    Query(params): Query<KeyParams>,
) -> Response {
    match state.coordinator.get(&params.key).await {
        Ok(value) => (
            StatusCode::OK,
            Json(KeyValue {
                key: params.key,
                value: String::from_utf8_lossy(&value).into_owned(),
            }),
        )
            .into_response(),
        Err(e) => e.to_http_status().into_response(),
    }
}

async fn set_key(
    State(state): State<MasterState>,
    payload: Result<Json<KeyValue>, JsonRejection>,
) -> Response {
    let Json(kv) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("SET rejected: {}", rejection);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match state.coordinator.set(&kv.key, kv.value.as_bytes()).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.to_http_status().into_response(),
    }
}

async fn update_key(
    State(state): State<MasterState>,
    payload: Result<Json<KeyValue>, JsonRejection>,
) -> Response {
    let Json(kv) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!("UPDATE rejected: {}", rejection);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match state.coordinator.update(&kv.key, kv.value.as_bytes()).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.to_http_status().into_response(),
    }
}

async fn delete_key(
    State(state): State<MasterState>,
    Query(params): Query<KeyParams>,
) -> Response {
    match state.coordinator.delete(&params.key).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => e.to_http_status().into_response(),
    }
}

/// The joining node supplies its ID and RPC port; its IP is whatever the
/// connection came from. The ID is trusted as-is — membership carries no
/// authentication, a documented gap.
async fn join_cluster(
    State(state): State<MasterState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<JoinParams>,
) -> StatusCode {
    state.coordinator.join(&params.id, peer.ip(), params.port);
    StatusCode::OK
}

async fn leave_cluster(
    State(state): State<MasterState>,
    Query(params): Query<LeaveParams>,
) -> StatusCode {
    state.coordinator.leave(&params.id);
    StatusCode::OK
}

/// Health check endpoint for cluster status.
async fn health(State(state): State<MasterState>) -> Response {
    let cluster = state.coordinator.cluster();
    Json(json!({
        "status": "healthy",
        "members": cluster.len(),
        "replication": cluster.is_replicated(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
    .into_response()
}
