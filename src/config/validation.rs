//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities and timeouts > 0, port 1-65535)
//! - Parse addresses and credentials once, before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;

use crate::config::schema::DaemonConfig;
use crate::security::Credentials;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.port must be between 1 and 65535")]
    InvalidPort,

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("listener.bind_ip {value:?} is not an IP address")]
    InvalidBindIp { value: String },

    #[error("observability.metrics_address {value:?} is not a socket address")]
    InvalidMetricsAddress { value: String },

    #[error("auth.users: {0}")]
    Credentials(String),
}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port == 0 {
        errors.push(ValidationError::InvalidPort);
    }

    let positive = [
        ("listener.max_connections", config.listener.max_connections as u64),
        ("connection.idle_timeout_secs", config.connection.idle_timeout_secs),
        ("connection.keepalive_idle_secs", config.connection.keepalive_idle_secs),
        ("connection.keepalive_interval_secs", config.connection.keepalive_interval_secs),
        ("connection.keepalive_count", u64::from(config.connection.keepalive_count)),
        ("resolver.cache_size", config.resolver.cache_size as u64),
        ("resolver.ttl_secs", config.resolver.ttl_secs),
        ("resolver.lookup_timeout_secs", config.resolver.lookup_timeout_secs),
        ("dial.connect_timeout_secs", config.dial.connect_timeout_secs),
    ];
    for (field, value) in positive {
        if value == 0 {
            errors.push(ValidationError::Zero { field });
        }
    }

    if let Some(bind_ip) = &config.listener.bind_ip {
        if bind_ip.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidBindIp {
                value: bind_ip.clone(),
            });
        }
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidMetricsAddress {
                value: addr.clone(),
            });
        }
    }

    if let Err(e) = Credentials::parse(&config.auth.users) {
        errors.push(ValidationError::Credentials(e.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
