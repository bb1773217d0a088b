//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     PROXY_USERS / auth.users
//!         → credentials.rs (parse, bounded store, reject duplicates)
//!         → authenticator handed to the protocol handler
//!
//! Per connection (username/password method):
//!     → Credentials::authenticate(user, pass)
//! ```
//!
//! # Design Decisions
//! - Fail closed: empty or unknown credentials are denied
//! - The store is bounded so a config typo cannot grow it without limit
//! - Read-only after startup; shared by `Arc` without locking

pub mod credentials;

pub use credentials::{AuthError, CredentialError, CredentialStore, Credentials, StoreError};
