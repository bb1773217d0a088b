//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the SOCKS daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// Listener configuration (address, BIND support, limits).
    pub listener: ListenerConfig,

    /// Per-connection socket policy.
    pub connection: ConnectionConfig,

    /// DNS cache settings.
    pub resolver: ResolverConfig,

    /// Outbound connection settings.
    pub dial: DialConfig,

    /// Client authentication.
    pub auth: AuthConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host to listen on; empty means all interfaces.
    pub host: String,

    /// Port to listen on (1-65535).
    pub port: u16,

    /// Address used for SOCKS BIND listeners. BIND is disabled when unset.
    pub bind_ip: Option<String>,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl ListenerConfig {
    /// The `host:port` string to listen on.
    pub fn address(&self) -> String {
        let host = if self.host.is_empty() {
            "0.0.0.0"
        } else {
            self.host.as_str()
        };

        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 1080,
            bind_ip: None,
            max_connections: crate::net::listener::DEFAULT_MAX_CONNECTIONS,
        }
    }
}

/// Socket policy applied to every accepted connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Idle window in seconds; I/O pending longer than this fails.
    pub idle_timeout_secs: u64,

    /// Keep-alive idle time before the first probe, in seconds.
    pub keepalive_idle_secs: u64,

    /// Interval between keep-alive probes, in seconds.
    pub keepalive_interval_secs: u64,

    /// Unanswered probes before the peer is considered dead.
    pub keepalive_count: u32,

    /// Delay before retrying after a transient accept error, in milliseconds.
    pub accept_retry_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 180,
            keepalive_idle_secs: 20,
            keepalive_interval_secs: 5,
            keepalive_count: 5,
            accept_retry_delay_ms: 200,
        }
    }
}

/// DNS cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Maximum cached host entries.
    pub cache_size: usize,

    /// Lifetime of a cached entry in seconds.
    pub ttl_secs: u64,

    /// Upper bound on a single underlying lookup, in seconds.
    pub lookup_timeout_secs: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_size: 3000,
            ttl_secs: 24 * 60 * 60,
            lookup_timeout_secs: 10,
        }
    }
}

/// Outbound connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DialConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for DialConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 30,
        }
    }
}

/// Client authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Accept clients that offer no authentication.
    pub allow_no_auth: bool,

    /// Username/password pairs: `user:pass,user2:pass2`.
    pub users: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive).
    pub log_level: String,

    /// Metrics endpoint bind address. Metrics are disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_address: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listener_address() {
        let mut listener = ListenerConfig::default();
        assert_eq!(listener.address(), "0.0.0.0:1080");

        listener.host = "127.0.0.1".into();
        listener.port = 9999;
        assert_eq!(listener.address(), "127.0.0.1:9999");

        listener.host = "::1".into();
        assert_eq!(listener.address(), "[::1]:9999");
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.port, 1080);
        assert_eq!(config.resolver.cache_size, 3000);
        assert_eq!(config.resolver.ttl_secs, 86_400);
        assert_eq!(config.connection.idle_timeout_secs, 180);
        assert!(!config.auth.allow_no_auth);
        assert!(config.observability.metrics_address.is_none());
    }

    #[test]
    fn partial_sections() {
        let config: DaemonConfig = toml::from_str(
            r#"
            [listener]
            port = 1081
            bind_ip = "192.0.2.10"

            [resolver]
            cache_size = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.port, 1081);
        assert_eq!(config.listener.bind_ip.as_deref(), Some("192.0.2.10"));
        assert_eq!(config.listener.max_connections, 10_000);
        assert_eq!(config.resolver.cache_size, 10);
        assert_eq!(config.resolver.lookup_timeout_secs, 10);
    }
}
