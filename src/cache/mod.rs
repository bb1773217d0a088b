//! Fixed-capacity LRU cache.
//!
//! # Data Flow
//! ```text
//! SyncLru (one mutex, locked per operation)
//!     → Lru (single-threaded core)
//!         → map: key → slot index
//!         → slots: arena of entries linked front (newest) ⇄ rear (oldest)
//! ```
//!
//! # Design Decisions
//! - Entries are addressed by index, never by pointer
//! - Every operation is O(1); nothing walks the list on the hot path
//! - Capacity is fixed at construction and must be non-zero

pub mod lru;
pub mod sync;

pub use lru::Lru;
pub use sync::SyncLru;
