//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → cli.rs (flags and PROXY_* environment variables override the file)
//!     → validation.rs (semantic checks)
//!     → DaemonConfig (validated, immutable)
//!     → handed by reference to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod cli;
pub mod loader;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use loader::{load_config, load_from_cli, ConfigError};
pub use schema::{
    AuthConfig, ConnectionConfig, DaemonConfig, DialConfig, ListenerConfig, ObservabilityConfig,
    ResolverConfig,
};
pub use validation::{validate_config, ValidationError};
