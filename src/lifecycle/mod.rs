//! Lifecycle management.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load app config → Init logging/metrics → Connect store → Build ConfigManager
//!
//! Shutdown (shutdown.rs):
//!     Signal received → ConfigManager::shutdown → store closed → watch streams end
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT/Ctrl-C → resolve `wait_for_signal`
//! ```
//!
//! # Design Decisions
//! - Closing the store is the only cancellation path for group watches
//! - Shutdown is broadcast so any number of background tasks can observe it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
