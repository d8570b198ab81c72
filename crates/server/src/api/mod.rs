pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod rpc;

pub use routes::{create_router, RPC_PATH};
