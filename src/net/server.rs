//! The accept loop and per-connection tasks.
//!
//! # Lifecycle
//! ```text
//! Listening ──shutdown──▶ Draining ──last connection done──▶ Stopped
//!     │                       ▲
//!     └──fatal accept error───┘
//! ```
//!
//! Connections are never force-closed on shutdown; each one ends on its own
//! or through its idle deadline.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::watch;
use tracing::Instrument;

use super::connection::{ConnectionId, ConnectionTracker, ServerState};
use super::idle::IdleTimeoutStream;
use super::listener::{Accept, ConnectionPermit, Listener, ListenerError, DEFAULT_MAX_CONNECTIONS};
use super::socket::SocketPolicy;
use crate::config::ConnectionConfig;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::protocol::{ErrorCallback, ProtocolHandler, Session};

/// Connection server driving a [`ProtocolHandler`].
pub struct Server<H> {
    handler: Arc<H>,
    policy: SocketPolicy,
    accept_retry_delay: Duration,
    max_connections: usize,
    on_error: ErrorCallback,
    tracker: ConnectionTracker,
    state: watch::Sender<ServerState>,
}

impl<H: ProtocolHandler> Server<H> {
    pub fn new(handler: H, config: &ConnectionConfig) -> Self {
        Self {
            handler: Arc::new(handler),
            policy: SocketPolicy::from(config),
            accept_retry_delay: Duration::from_millis(config.accept_retry_delay_ms),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            on_error: log_connection_error(),
            tracker: ConnectionTracker::new(),
            state: watch::channel(ServerState::Listening).0,
        }
    }

    /// Replace the default (warn-level log) per-connection error sink.
    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = on_error;
        self
    }

    /// Connection cap for [`listen_and_serve`](Self::listen_and_serve).
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn state(&self) -> ServerState {
        *self.state.borrow()
    }

    /// Number of connection tasks still running.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Bind `address` and serve until `shutdown` fires, then drain.
    pub async fn listen_and_serve(
        &self,
        shutdown: ShutdownSignal,
        address: &str,
    ) -> Result<(), ListenerError> {
        let listener = Listener::bind(address, self.max_connections).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve an already bound listener until `shutdown` fires, then drain.
    ///
    /// Returns the fatal accept error, if one ended the loop, once every
    /// connection task has finished.
    pub async fn serve<A: Accept>(
        &self,
        listener: A,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), ListenerError> {
        self.state.send_replace(ServerState::Listening);

        let result = loop {
            let accepted = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break Ok(()),
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer, permit)) => self.spawn_connection(stream, peer, permit),
                Err(e) if e.is_transient() => {
                    metrics::record_accept_error(true);
                    tracing::warn!(
                        error = %e,
                        retry_in = ?self.accept_retry_delay,
                        "Transient accept error"
                    );
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break Ok(()),
                        _ = tokio::time::sleep(self.accept_retry_delay) => {}
                    }
                }
                Err(e) => {
                    metrics::record_accept_error(false);
                    tracing::error!(error = %e, "Accept failed, no longer listening");
                    break Err(e);
                }
            }
        };

        drop(listener);
        self.state.send_replace(ServerState::Draining);
        tracing::info!(
            active_connections = self.tracker.active_count(),
            "Waiting for connections to drain"
        );

        self.tracker.wait_idle().await;
        self.state.send_replace(ServerState::Stopped);
        tracing::info!("Server stopped");

        result
    }

    fn spawn_connection(&self, stream: TcpStream, peer: SocketAddr, permit: ConnectionPermit) {
        // counted before the task exists so a drain can never miss it
        let guard = self.tracker.track();
        let id = guard.id();
        metrics::record_connection_accepted();

        let handler = Arc::clone(&self.handler);
        let on_error = Arc::clone(&self.on_error);
        let policy = self.policy;
        let span = tracing::info_span!("connection", connection_id = %id, peer = %peer);

        tokio::spawn(
            async move {
                let _guard = guard;
                let _permit = permit;

                if let Err(e) = policy.apply(&stream) {
                    tracing::debug!(error = %e, "Failed to apply socket policy");
                }

                let conn = IdleTimeoutStream::new(stream, policy.idle_timeout);
                let session = Session::new(id, peer, Arc::clone(&on_error));

                if let Err(e) = handler.handle(conn, session).await {
                    metrics::record_handler_error();
                    let err: &(dyn Error + 'static) = &*e;
                    on_error(id, err);
                }
            }
            .instrument(span),
        );
    }
}

fn log_connection_error() -> ErrorCallback {
    Arc::new(|id: ConnectionId, err: &(dyn Error + 'static)| {
        tracing::warn!(connection_id = %id, error = %err, "Connection error");
    })
}
