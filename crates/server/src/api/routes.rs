use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{handlers, middleware::session_middleware, rpc};
use crate::state::AppState;

/// Endpoint Transmission clients talk to.
pub const RPC_PATH: &str = "/transmission/rpc";

pub fn create_router(state: Arc<AppState>) -> Router {
    let rpc_routes = Router::new()
        .route(RPC_PATH, post(rpc::handle_rpc))
        .layer(middleware::from_fn_with_state(state.clone(), session_middleware));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .merge(rpc_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
