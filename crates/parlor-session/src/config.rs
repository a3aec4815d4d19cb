//! Engine configuration and the session lifecycle status.

use std::fmt;

use parlor_player::DEFAULT_MAILBOX_CAPACITY;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Queue sizes used by every session the registry creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of each session's inbound event queue. Producers wait
    /// when it is full.
    pub inbound_capacity: usize,

    /// Capacity of each player's mailbox. Broadcasts skip a full mailbox.
    pub mailbox_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: 100,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// Where a session is in its life.
///
/// ```text
///   Running ──(stage returns End)──→ Ended
///      │
///      └──(stage error or panic)──→ Failed
/// ```
///
/// Both terminal states are final: the execution loop has exited and
/// the session accepts no more events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// A stage is active and consuming events.
    Running,
    /// The last stage handed off to nothing.
    Ended,
    /// A stage broke its contract.
    Failed,
}

impl SessionStatus {
    /// Returns `true` while the execution loop is alive.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Ended => write!(f, "Ended"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.inbound_capacity, 100);
        assert_eq!(config.mailbox_capacity, 100);
    }

    #[test]
    fn test_engine_config_deserializes_from_json() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"inbound_capacity": 8, "mailbox_capacity": 2}"#,
        )
        .unwrap();
        assert_eq!(config.inbound_capacity, 8);
        assert_eq!(config.mailbox_capacity, 2);
    }

    #[test]
    fn test_only_running_is_running() {
        assert!(SessionStatus::Running.is_running());
        assert!(!SessionStatus::Ended.is_running());
        assert!(!SessionStatus::Failed.is_running());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Failed.to_string(), "Failed");
    }
}
