//! socksd: connection and name-resolution substrate for a SOCKS5 proxy daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!     client ──▶ net::Server ──▶ ProtocolHandler (external)
//!                 │ accept, keep-alive,        │
//!                 │ idle deadline, drain       │ CONNECT
//!                 │                            ▼
//!                 │                      net::Dialer
//!                 │                            │
//!                 │                            ▼
//!                 │                  resolver::CachedResolver
//!                 │                   ├─ cache::SyncLru   (TTL entries)
//!                 │                   └─ singleflight::Group
//!                 │                            │
//!                 ▼                            ▼
//!        lifecycle (signals,          system resolver
//!        shutdown, startup)
//! ```
//!
//! The proxy protocol itself plugs in through [`protocol::ProtocolHandler`];
//! [`daemon::run`] wires everything else from a [`config::DaemonConfig`].

// Core
pub mod cache;
pub mod net;
pub mod resolver;
pub mod singleflight;

// Glue
pub mod config;
pub mod lifecycle;
pub mod protocol;
pub mod security;

// Cross-cutting concerns
pub mod observability;

pub use lifecycle::startup as daemon;

pub use cache::{Lru, SyncLru};
pub use config::DaemonConfig;
pub use lifecycle::{Shutdown, ShutdownSignal};
pub use net::Server;
pub use protocol::{BoxError, ProtocolHandler, ProtocolOptions, Session};
pub use resolver::CachedResolver;
pub use singleflight::Group;
