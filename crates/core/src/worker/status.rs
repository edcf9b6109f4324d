//! Worker lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state shared by every worker.
///
/// `Pending -> Ready -> Running -> (Successful | Error)`. Terminal states are
/// never left once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Pending,
    Ready,
    Running,
    Successful,
    Error,
}

impl WorkerStatus {
    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Successful | Self::Error)
    }

    /// Status name as a static string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Successful => "successful",
            Self::Error => "error",
        }
    }

    pub(crate) fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Ready => 1,
            Self::Running => 2,
            Self::Successful => 3,
            Self::Error => 4,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Ready,
            2 => Self::Running,
            3 => Self::Successful,
            _ => Self::Error,
        }
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!WorkerStatus::Pending.is_terminal());
        assert!(!WorkerStatus::Ready.is_terminal());
        assert!(!WorkerStatus::Running.is_terminal());
        assert!(WorkerStatus::Successful.is_terminal());
        assert!(WorkerStatus::Error.is_terminal());
    }

    #[test]
    fn test_u8_conversion_is_stable() {
        for status in [
            WorkerStatus::Pending,
            WorkerStatus::Ready,
            WorkerStatus::Running,
            WorkerStatus::Successful,
            WorkerStatus::Error,
        ] {
            assert_eq!(WorkerStatus::from_u8(status.to_u8()), status);
        }
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&WorkerStatus::Successful).unwrap();
        assert_eq!(json, "\"successful\"");
    }
}
