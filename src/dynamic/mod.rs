//! Dynamic configuration groups backed by a watchable store.
//!
//! # Data Flow
//! ```text
//! caller
//!     → ConfigManager::get_group(app, env, group)
//!         → storage key "{prefix}/{app}/{env}/{group}/content.yaml"
//!         → existing group, or: initial read → ConfigGroup → watch "{key}/" → register
//!     → ConfigGroup::get_* / unmarshal / on_change
//!
//! background (one task per group):
//!     change batch → re-read whole document → swap snapshot → spawn callbacks
//!
//! ConfigManager::shutdown
//!     → store closed → every watch stream ends → groups Closed
//! ```
//!
//! # Design Decisions
//! - Available over consistent: reads never fail, refresh errors keep stale data
//! - Typed access maps a schema to its group through [`ConfigSchema`], not reflection
//! - Whole-document re-read per batch; fine for small documents, O(size) per change

pub mod group;
pub mod manager;
pub mod resolver;
pub mod types;
pub mod value;

pub use group::ConfigGroup;
pub use manager::{storage_key, ConfigManager};
pub use resolver::{group_name_for, ConfigSchema};
pub use types::{GroupError, GroupResult, GroupState, SubscriptionId};
