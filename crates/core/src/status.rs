//! Task and worker lifecycle states.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lifecycle state shared by tasks and workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum Status {
    #[default]
    Idle,
    Queued,
    Running,
    Finished,
    Stopped,
    Terminated,
    Error,
}

impl Status {
    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Status::Finished | Status::Stopped | Status::Terminated | Status::Error
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Idle => "IDLE",
            Status::Queued => "QUEUED",
            Status::Running => "RUNNING",
            Status::Finished => "FINISHED",
            Status::Stopped => "STOPPED",
            Status::Terminated => "TERMINATED",
            Status::Error => "ERROR",
        };
        f.write_str(name)
    }
}
