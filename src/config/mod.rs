//! Static application configuration.
//!
//! # Data Flow
//! ```text
//! config file (YAML/TOML)
//!     → loader.rs (discover, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → store connection, logging, ConfigManager prefix
//! ```
//!
//! # Design Decisions
//! - Read once at startup; runtime changes live in the `dynamic` subsystem
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AppConfig;
pub use schema::LogConfig;
pub use schema::ObservabilityConfig;
pub use schema::StoreConfig;
pub use schema::TlsConfig;
