//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → socket.rs (linger zero, keep-alive)
//!     → idle.rs (idle deadline wrapper)
//!     → connection.rs (lifecycle tracking, drain)
//!     → server.rs hands off to the protocol handler
//!
//! Outbound (protocol CONNECT / BIND)
//!     → dial.rs (resolve, connect, classify failures)
//!
//! Server States:
//!     Listening → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Transient accept errors are retried, anything else stops the listener

pub mod connection;
pub mod dial;
pub mod idle;
pub mod listener;
pub mod server;
pub mod socket;

pub use connection::{ConnectionId, ConnectionTracker, ServerState};
pub use dial::{bind_factory, DialError, Dialer};
pub use idle::IdleTimeoutStream;
pub use listener::{Accept, Listener, ListenerError, DEFAULT_MAX_CONNECTIONS};
pub use server::Server;
pub use socket::SocketPolicy;
