//! Outbound connections for CONNECT and listeners for BIND.
//!
//! Targets are resolved through the shared [`CachedResolver`] and dial
//! failures are folded into the handful of outcomes a proxy reports back to
//! its client.

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use super::socket::set_linger_zero;
use crate::config::DialConfig;
use crate::observability::metrics;
use crate::protocol::{BindFactory, BoxError, Connector};
use crate::resolver::{CachedResolver, NameLookup, ResolveError};

/// Why an outbound connection could not be made.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("host unreachable: {0}")]
    HostUnreachable(#[source] BoxError),

    #[error("connection refused: {0}")]
    ConnectionRefused(#[source] io::Error),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(#[source] io::Error),

    #[error("ttl expired: {0}")]
    TtlExpired(#[source] io::Error),

    #[error("address type {0:#04x} not supported")]
    AddressTypeNotSupported(u8),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DialError {
    fn classify(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::HostUnreachable => DialError::HostUnreachable(Box::new(err)),
            io::ErrorKind::ConnectionRefused => DialError::ConnectionRefused(err),
            io::ErrorKind::NetworkUnreachable => DialError::NetworkUnreachable(err),
            io::ErrorKind::TimedOut => DialError::TtlExpired(err),
            _ => DialError::Io(err),
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            DialError::HostUnreachable(_) => "host_unreachable",
            DialError::ConnectionRefused(_) => "refused",
            DialError::NetworkUnreachable(_) => "network_unreachable",
            DialError::TtlExpired(_) => "timeout",
            DialError::AddressTypeNotSupported(_) => "unsupported",
            DialError::Io(_) => "error",
        }
    }
}

impl From<ResolveError> for DialError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::UnsupportedAddressType(code) => DialError::AddressTypeNotSupported(code),
            other => DialError::HostUnreachable(Box::new(other)),
        }
    }
}

/// Resolves and connects to client-requested targets.
pub struct Dialer<L> {
    resolver: Arc<CachedResolver<L>>,
    connect_timeout: Duration,
}

impl<L> Clone for Dialer<L> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            connect_timeout: self.connect_timeout,
        }
    }
}

impl<L: NameLookup> Dialer<L> {
    pub fn new(resolver: Arc<CachedResolver<L>>, config: &DialConfig) -> Self {
        Self {
            resolver,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
        }
    }

    /// Resolve the raw target and connect to it.
    pub async fn connect(
        &self,
        address_type: u8,
        raw: &[u8],
        port: u16,
    ) -> Result<TcpStream, DialError> {
        let addr = match self.resolver.resolve_target(address_type, raw, port).await {
            Ok(addr) => addr,
            Err(e) => {
                let err = DialError::from(e);
                metrics::record_dial(err.outcome());
                return Err(err);
            }
        };
        self.connect_addr(addr).await
    }

    /// Connect to an already resolved address.
    pub async fn connect_addr(&self, addr: SocketAddr) -> Result<TcpStream, DialError> {
        let result = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr)).await
        {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(DialError::classify(e)),
            Err(_) => Err(DialError::TtlExpired(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect to {addr} timed out after {:?}", self.connect_timeout),
            ))),
        };

        let stream = match result {
            Ok(stream) => stream,
            Err(err) => {
                tracing::debug!(target_addr = %addr, error = %err, "Dial failed");
                metrics::record_dial(err.outcome());
                return Err(err);
            }
        };

        if let Err(e) = set_linger_zero(&stream) {
            tracing::debug!(target_addr = %addr, error = %e, "Failed to set linger");
        }
        metrics::record_dial("ok");
        Ok(stream)
    }

    /// The dialer as a protocol-facing connect closure.
    pub fn connector(&self) -> Connector {
        let dialer = self.clone();
        Arc::new(move |address_type: u8, raw: Vec<u8>, port: u16| {
            let dialer = dialer.clone();
            async move { dialer.connect(address_type, &raw, port).await }.boxed()
        })
    }
}

/// Listen on an ephemeral port of `ip` for a BIND request.
pub async fn bind_listener(ip: IpAddr) -> io::Result<TcpListener> {
    TcpListener::bind(SocketAddr::new(ip, 0)).await
}

/// BIND listener factory for `ip`.
pub fn bind_factory(ip: IpAddr) -> BindFactory {
    Arc::new(move || bind_listener(ip).boxed())
}
