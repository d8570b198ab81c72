//! Session handshake middleware.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;
use transfer_relay_core::SESSION_ID_HEADER;

use crate::state::AppState;

/// Require the session id header on every RPC request.
///
/// Requests without it get 409 Conflict carrying the process's session id,
/// which clients then resend. The value itself is not checked.
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let has_session = request
        .headers()
        .get(SESSION_ID_HEADER)
        .is_some_and(|value| !value.is_empty());

    if !has_session {
        debug!("Request without session id, sending handshake");
        return (
            StatusCode::CONFLICT,
            [(SESSION_ID_HEADER, state.session_id().to_string())],
        )
            .into_response();
    }

    next.run(request).await
}
