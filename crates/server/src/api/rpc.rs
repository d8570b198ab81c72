//! Transmission RPC endpoint.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{debug, warn};
use transfer_relay_core::{RpcError, RpcRequest};

use crate::state::AppState;

/// Decode the envelope and hand it to the adapter.
///
/// A body that is not a valid envelope is answered with 500 and the error
/// text; everything else is answered with 200 and a JSON response.
pub async fn handle_rpc(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            let err = RpcError::MalformedRequest(e.to_string());
            warn!("Rejecting RPC request: {}", err);
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    debug!(method = %request.method, tag = ?request.tag, "RPC request");
    let response = state.adapter().handle(request).await;
    debug!(result = %response.result, "RPC response");

    Json(response).into_response()
}
