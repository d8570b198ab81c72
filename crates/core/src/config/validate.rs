use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - put.io token is present
/// - Backoff divisor and result buffer are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.putio.oauth_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "putio.oauth_token must be set".to_string(),
        ));
    }

    if config.orchestrator.backoff.eta_divisor == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.eta_divisor cannot be 0".to_string(),
        ));
    }

    if config.orchestrator.result_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.result_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
