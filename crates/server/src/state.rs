use transfer_relay_core::{RpcAdapter, SanitizedConfig, SessionId};

/// Shared application state
pub struct AppState {
    config: SanitizedConfig,
    session_id: SessionId,
    adapter: RpcAdapter,
}

impl AppState {
    pub fn new(config: SanitizedConfig, adapter: RpcAdapter) -> Self {
        Self {
            config,
            session_id: SessionId::generate(),
            adapter,
        }
    }

    pub fn sanitized_config(&self) -> &SanitizedConfig {
        &self.config
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn adapter(&self) -> &RpcAdapter {
        &self.adapter
    }
}
