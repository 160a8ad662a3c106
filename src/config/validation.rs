//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (buffer > 0, timeouts > 0, address parses)
//! - Detect conflicting endpoint paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    InvalidBindAddress(String),
    #[error("listener.receive_buffer_bytes must be greater than zero")]
    ZeroReceiveBuffer,
    #[error("listener.max_connections must be greater than zero")]
    ZeroMaxConnections,
    #[error("route path `{0}` must start with `/`")]
    RelativePath(String),
    #[error("health and mcp routes share the path `{0}`")]
    DuplicatePath(String),
    #[error("timeouts.{0} must be greater than zero when set")]
    ZeroTimeout(&'static str),
    #[error("observability.metrics_address `{0}` is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.listener.receive_buffer_bytes == 0 {
        errors.push(ValidationError::ZeroReceiveBuffer);
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }

    for path in [&config.routes.health_path, &config.routes.mcp_path] {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativePath(path.clone()));
        }
    }
    if config.routes.health_path == config.routes.mcp_path {
        errors.push(ValidationError::DuplicatePath(config.routes.health_path.clone()));
    }

    if config.timeouts.read_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("read_secs"));
    }
    if config.timeouts.reply_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("reply_secs"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
