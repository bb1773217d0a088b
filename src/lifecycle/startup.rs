//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the protocol options (credentials, dialer, BIND factory)
//! - Start the metrics endpoint when configured
//! - Bind the listener and serve until shutdown, then drain
//! - Stop the metrics endpoint once the drain is done

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;

use crate::config::{validate_config, ConfigError, DaemonConfig};
use crate::lifecycle::{signals, Shutdown, ShutdownSignal};
use crate::net::{bind_factory, Dialer, ListenerError, Server};
use crate::observability::metrics::{self, MetricsError};
use crate::observability::logging;
use crate::protocol::{Authenticator, BoxError, ProtocolHandler, ProtocolOptions};
use crate::resolver::{CachedResolver, SystemLookup};
use crate::security::{CredentialError, Credentials};

/// Errors that stop the daemon.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("invalid bind ip {0:?}")]
    BindIp(String),

    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),

    #[error("failed to build protocol handler: {0}")]
    Protocol(#[source] BoxError),

    #[error("failed to start metrics endpoint: {0}")]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Server(#[from] ListenerError),
}

/// Run the daemon until SIGINT or SIGTERM, then drain and return.
///
/// Installs the global log subscriber unless one is already set.
pub async fn run<H, F>(config: DaemonConfig, make_protocol: F) -> Result<(), DaemonError>
where
    H: ProtocolHandler,
    F: FnOnce(ProtocolOptions) -> Result<H, BoxError>,
{
    logging::init(&config.observability.log_level);

    let shutdown = Shutdown::new();
    let signals = signals::spawn_signal_handler(shutdown.clone());

    let result = run_until(config, make_protocol, shutdown.subscribe()).await;
    signals.abort();
    result
}

/// Same as [`run`] with an explicit shutdown signal and no global logging setup.
pub async fn run_until<H, F>(
    config: DaemonConfig,
    make_protocol: F,
    shutdown: ShutdownSignal,
) -> Result<(), DaemonError>
where
    H: ProtocolHandler,
    F: FnOnce(ProtocolOptions) -> Result<H, BoxError>,
{
    validate_config(&config).map_err(ConfigError::Validation)?;

    let options = build_options(&config)?;
    tracing::info!(
        allow_no_auth = options.allow_no_auth,
        password_auth = options.authenticate.is_some(),
        bind_enabled = options.bind.is_some(),
        "Protocol options ready"
    );
    let handler = make_protocol(options).map_err(DaemonError::Protocol)?;

    let metrics_endpoint = match &config.observability.metrics_address {
        Some(address) => {
            let addr: SocketAddr = address
                .parse()
                .map_err(|_| DaemonError::MetricsAddress(address.clone()))?;
            Some(metrics::init_metrics(addr)?)
        }
        None => None,
    };

    let server = Server::new(handler, &config.connection)
        .with_max_connections(config.listener.max_connections);

    let address = config.listener.address();
    tracing::info!(address = %address, "socksd starting");
    let served = server.listen_and_serve(shutdown, &address).await;

    if let Some(endpoint) = metrics_endpoint {
        endpoint.shutdown().await;
    }
    served?;

    Ok(())
}

/// Build the options a protocol implementation is constructed from.
pub fn build_options(config: &DaemonConfig) -> Result<ProtocolOptions, DaemonError> {
    let credentials = Credentials::parse(&config.auth.users)?;
    let authenticate = if credentials.is_empty() {
        None
    } else {
        tracing::debug!(users = credentials.len(), "Password authentication enabled");
        let credentials = Arc::new(credentials);
        let check: Authenticator =
            Arc::new(move |user: &[u8], pass: &[u8]| credentials.authenticate(user, pass));
        Some(check)
    };

    let resolver = Arc::new(CachedResolver::new(SystemLookup, &config.resolver));
    let dialer = Dialer::new(resolver, &config.dial);

    let bind = match config.listener.bind_ip.as_deref() {
        Some(ip) => {
            let ip: IpAddr = ip.parse().map_err(|_| DaemonError::BindIp(ip.to_string()))?;
            Some(bind_factory(ip))
        }
        None => None,
    };

    Ok(ProtocolOptions {
        allow_no_auth: config.auth.allow_no_auth,
        authenticate,
        connect: Some(dialer.connector()),
        bind,
        outbound_filter: None,
    })
}
