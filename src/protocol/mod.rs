//! The seam between the connection server and a proxy protocol.
//!
//! # Data Flow
//! ```text
//! daemon startup
//!     → ProtocolOptions (authenticator, connector, bind factory, filter)
//!     → make_protocol(options) → H: ProtocolHandler
//!
//! per accepted connection
//!     → H::handle(idle-wrapped stream, Session)
//!     → Err(..) or Session::report(..) → error callback
//! ```
//!
//! # Design Decisions
//! - The protocol state machine lives outside this crate; it only sees
//!   closures, so it never depends on resolver or dialer types directly
//! - Handler errors are per-connection and never stop the server

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::net::{TcpListener, TcpStream};

use crate::net::{ConnectionId, DialError, IdleTimeoutStream};
use crate::security::AuthError;

/// Error type crossing the protocol seam.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Receives per-connection errors.
pub type ErrorCallback = Arc<dyn Fn(ConnectionId, &(dyn Error + 'static)) + Send + Sync>;

/// Checks a username/password pair.
pub type Authenticator = Arc<dyn Fn(&[u8], &[u8]) -> Result<(), AuthError> + Send + Sync>;

/// Opens an outbound connection: address type, raw address bytes, port.
pub type Connector =
    Arc<dyn Fn(u8, Vec<u8>, u16) -> BoxFuture<'static, Result<TcpStream, DialError>> + Send + Sync>;

/// Opens a listener for a BIND request.
pub type BindFactory = Arc<dyn Fn() -> BoxFuture<'static, io::Result<TcpListener>> + Send + Sync>;

/// Decides whether an outbound address may be dialed.
pub type OutboundFilter = Arc<dyn Fn(&SocketAddr) -> bool + Send + Sync>;

/// Serves one client connection.
pub trait ProtocolHandler: Send + Sync + 'static {
    fn handle(
        &self,
        conn: IdleTimeoutStream<TcpStream>,
        session: Session,
    ) -> impl Future<Output = Result<(), BoxError>> + Send;
}

/// What a protocol implementation is built from.
#[derive(Clone, Default)]
pub struct ProtocolOptions {
    /// Accept clients that offer no authentication method.
    pub allow_no_auth: bool,
    /// Username/password check; `None` disables that method.
    pub authenticate: Option<Authenticator>,
    /// Outbound connect; `None` means the protocol dials on its own.
    pub connect: Option<Connector>,
    /// BIND listener factory; `None` disables BIND.
    pub bind: Option<BindFactory>,
    pub outbound_filter: Option<OutboundFilter>,
}

impl fmt::Debug for ProtocolOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolOptions")
            .field("allow_no_auth", &self.allow_no_auth)
            .field("authenticate", &self.authenticate.is_some())
            .field("connect", &self.connect.is_some())
            .field("bind", &self.bind.is_some())
            .field("outbound_filter", &self.outbound_filter.is_some())
            .finish()
    }
}

impl ProtocolOptions {
    /// Whether `addr` passes the outbound filter. No filter admits everything.
    pub fn allows(&self, addr: &SocketAddr) -> bool {
        self.outbound_filter.as_ref().map_or(true, |filter| filter(addr))
    }
}

/// Per-connection context handed to the protocol handler.
#[derive(Clone)]
pub struct Session {
    id: ConnectionId,
    peer: SocketAddr,
    reporter: ErrorCallback,
}

impl Session {
    pub fn new(id: ConnectionId, peer: SocketAddr, reporter: ErrorCallback) -> Self {
        Self { id, peer, reporter }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Report a non-fatal error without ending the connection.
    pub fn report(&self, err: &(dyn Error + 'static)) {
        (self.reporter)(self.id, err);
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
