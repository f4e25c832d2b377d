//! Task status for the lifecycle state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status.
///
/// State transitions:
/// - Queued -> Processing -> Done
/// - Queued -> Processing -> Failed
///
/// Done and Failed are terminal; nothing leaves them. There is no retry
/// loop: one downstream attempt decides the task.
///
/// Design note: Using an enum ensures exhaustive matching and prevents
/// invalid states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, waiting for the worker to pick it up.
    Queued,

    /// Picked up by the worker; the downstream call is (or is about to be)
    /// in flight.
    Processing,

    /// Downstream call succeeded; `response` holds the parsed JSON.
    Done,

    /// Downstream call failed; `error` holds the message.
    Failed,
}

impl TaskStatus {
    /// Is this a terminal state (no further transitions)?
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed)
    }

    /// Is this task eligible for worker pickup?
    pub fn is_queued(self) -> bool {
        matches!(self, TaskStatus::Queued)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}
