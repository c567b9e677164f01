//! Dynamic configuration groups kept in sync with a watchable key-value store.

pub mod config;
pub mod dynamic;
pub mod lifecycle;
pub mod observability;
pub mod schemas;
pub mod store;

pub use config::schema::AppConfig;
pub use dynamic::{ConfigGroup, ConfigManager, ConfigSchema};
pub use lifecycle::Shutdown;
pub use store::{ConfigStore, MemoryStore};
