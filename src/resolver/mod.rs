//! Caching, deduplicating name resolution.
//!
//! # Data Flow
//! ```text
//! resolve_target(address type, raw bytes, port)
//!     → IPv4 / IPv6 literal: no lookup
//!     → domain: lookup_addresses("ip", host)
//!         → cache hit (fresh): return
//!         → miss: singleflight(key)
//!             → NameLookup (system resolver), bounded by lookup timeout
//!             → cache result for the TTL
//!     → select_address (IPv4 first, else random)
//! ```
//!
//! # Design Decisions
//! - One resolver instance is built at startup and shared by `Arc`
//! - Only successful, non-empty lookups are cached
//! - Concurrent misses for the same key cost one underlying lookup

pub mod cached;
pub mod lookup;
pub mod select;
pub mod target;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub use cached::CachedResolver;
pub use lookup::{NameLookup, Network, SystemLookup};
pub use select::select_address;
pub use target::AddressType;

/// Errors produced while turning a target into an address.
///
/// Cloneable so that every caller coalesced onto one lookup receives the
/// same error.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("failed to resolve {host:?}")]
    NoAddresses { host: String },

    #[error("lookup of {host:?} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: Arc<io::Error>,
    },

    #[error("lookup of {host:?} timed out after {timeout:?}")]
    Timeout { host: String, timeout: Duration },

    #[error("unsupported address type {0:#04x}")]
    UnsupportedAddressType(u8),

    #[error("malformed {address_type} address of {len} bytes")]
    MalformedAddress { address_type: AddressType, len: usize },

    #[error("domain name is not valid UTF-8")]
    InvalidDomain,
}
