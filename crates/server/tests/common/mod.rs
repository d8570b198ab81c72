//! Common test utilities for in-process RPC testing with mocks.
//!
//! Builds the real router over a [`MockRemoteService`] so requests can be
//! driven with `oneshot` without network access.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use transfer_relay_core::testing::MockRemoteService;
use transfer_relay_core::{
    load_config_from_str, FetchResult, HttpMetainfoFetcher, InfoHashResolver,
    ResultHandle, RpcAdapter, SanitizedConfig, TransferOrchestrator, SESSION_ID_HEADER,
};
use transfer_relay_server::api::{create_router, RPC_PATH};
use transfer_relay_server::state::AppState;

/// Re-export fixtures for test convenience
pub use transfer_relay_core::testing::fixtures;

/// In-process server with a controllable remote service.
pub struct TestFixture {
    pub router: Router,
    pub remote: Arc<MockRemoteService>,
    /// Results reported by submissions started through the router.
    pub results: tokio::sync::mpsc::Receiver<FetchResult>,
    /// Default download directory (inside `temp_dir`).
    pub download_dir: PathBuf,
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let download_dir = temp_dir.path().join("download");

        let config = load_config_from_str(
            r#"
[putio]
oauth_token = "test-token"
"#,
        )
        .expect("Failed to parse test config");

        let remote = Arc::new(MockRemoteService::new());
        let fetcher = Arc::new(
            HttpMetainfoFetcher::new(Duration::from_secs(1)).expect("Failed to create fetcher"),
        );
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let orchestrator = TransferOrchestrator::new(
            config.orchestrator.clone(),
            remote.clone(),
            Arc::new(InfoHashResolver::new(fetcher)),
            ResultHandle::new(tx),
        );

        let adapter = RpcAdapter::new(remote.clone(), orchestrator, download_dir.clone());
        let state = Arc::new(AppState::new(SanitizedConfig::from(&config), adapter));

        Self {
            router: create_router(state),
            remote,
            results: rx,
            download_dir,
            temp_dir,
        }
    }

    /// Fetch the session id through the handshake.
    pub async fn session_id(&self) -> String {
        let response = self.send("POST", None, "{}").await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        response
            .headers
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .expect("Handshake without session id")
            .to_string()
    }

    /// Send an RPC envelope after completing the handshake.
    pub async fn rpc(&self, envelope: Value) -> TestResponse {
        let session = self.session_id().await;
        self.send("POST", Some(&session), &envelope.to_string()).await
    }

    /// Send a raw request to the RPC endpoint.
    pub async fn send(&self, method: &str, session: Option<&str>, body: &str) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(RPC_PATH)
            .header("Content-Type", "application/json");
        if let Some(session) = session {
            builder = builder.header(SESSION_ID_HEADER, session);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }
}
