//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! manager / groups / store backends produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (group count, refresh outcomes, callback panics)
//!
//! Consumers:
//!     → stdout (text or JSON), optional daily-rotated files
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metric updates are no-ops until an exporter is installed

pub mod logging;
pub mod metrics;
