//! Group state and error definitions.

use thiserror::Error;

use crate::dynamic::value::DocumentError;
use crate::store::StoreError;

/// Lifecycle of a configuration group.
///
/// ```text
/// Created → Watching: watch stream opened, before the group is handed out
/// Watching → Closed:  store connection closed (manager shutdown)
/// Created → Closed:   watch stream could not be opened
/// ```
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupState {
    Created = 0,
    Watching = 1,
    Closed = 2,
}

impl From<u8> for GroupState {
    fn from(val: u8) -> Self {
        match val {
            1 => GroupState::Watching,
            2 => GroupState::Closed,
            _ => GroupState::Created,
        }
    }
}

/// Handle returned by `ConfigGroup::on_change`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Errors surfaced by configuration groups and the manager.
#[derive(Debug, Error)]
pub enum GroupError {
    /// Store read or watch failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored bytes are not a usable document.
    #[error("invalid document at {key}: {source}")]
    Document {
        key: String,
        #[source]
        source: DocumentError,
    },

    /// Snapshot could not be decoded into the requested type.
    #[error("failed to decode {key} into {target}: {source}")]
    Decode {
        key: String,
        target: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// Watch loops were still running when the shutdown deadline passed.
    #[error("watch tasks still running after {0:?}")]
    ShutdownTimeout(std::time::Duration),
}

/// Result type for group operations.
pub type GroupResult<T> = Result<T, GroupError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_conversion() {
        assert_eq!(GroupState::from(GroupState::Watching as u8), GroupState::Watching);
        assert_eq!(GroupState::from(2), GroupState::Closed);
        assert_eq!(GroupState::from(42), GroupState::Created);
    }

    #[test]
    fn test_error_display() {
        let err = GroupError::from(StoreError::Closed);
        assert_eq!(err.to_string(), "store error: store is closed");
    }
}
