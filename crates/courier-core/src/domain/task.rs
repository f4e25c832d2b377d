//! Task record and the lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{StaleTransition, ValidationError};
use super::{TaskId, TaskStatus};

/// The persisted task record.
///
/// Design:
/// - This is the single source of truth for a task's state.
/// - `id`, `main_url` and `meme_url` are immutable after creation.
/// - All state transitions go through [`TaskRecord::apply`], which enforces
///   the queued -> processing -> {done, failed} table.
/// - Serialized form is also the wire form served by `/status`, so `id`
///   travels under the `task_id` key and response/error are explicit nulls
///   until a terminal state is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(rename = "task_id")]
    pub id: TaskId,

    pub main_url: String,
    pub meme_url: String,

    pub status: TaskStatus,

    /// Parsed downstream JSON; present iff status = done.
    pub response: Option<Value>,

    /// Human-readable downstream failure; present iff status = failed.
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The only mutations the store accepts for an existing record.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange {
    Processing,
    Done(Value),
    Failed(String),
}

impl StatusChange {
    /// The status this change moves the record to.
    pub fn target(&self) -> TaskStatus {
        match self {
            StatusChange::Processing => TaskStatus::Processing,
            StatusChange::Done(_) => TaskStatus::Done,
            StatusChange::Failed(_) => TaskStatus::Failed,
        }
    }
}

impl TaskRecord {
    /// Create a new queued record.
    ///
    /// Both URLs must be non-empty; the record is otherwise opaque to the
    /// core, so no further syntax checks happen here.
    pub fn new(
        id: TaskId,
        main_url: impl Into<String>,
        meme_url: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let main_url = main_url.into();
        let meme_url = meme_url.into();
        if main_url.is_empty() || meme_url.is_empty() {
            return Err(ValidationError);
        }
        Ok(Self {
            id,
            main_url,
            meme_url,
            status: TaskStatus::Queued,
            response: None,
            error: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a status change, enforcing the transition table.
    ///
    /// Legal moves:
    /// - Queued -> Processing
    /// - Processing -> Done(response)
    /// - Processing -> Failed(error)
    ///
    /// Re-applying a change the record already carries (same target state,
    /// same payload) is an idempotent no-op. Anything else is reported as
    /// [`StaleTransition`] and leaves the record untouched.
    pub fn apply(&mut self, change: StatusChange, now: DateTime<Utc>) -> Result<(), StaleTransition> {
        let legal = matches!(
            (self.status, &change),
            (TaskStatus::Queued, StatusChange::Processing)
                | (TaskStatus::Processing, StatusChange::Done(_))
                | (TaskStatus::Processing, StatusChange::Failed(_))
        );

        if !legal {
            if self.is_replay(&change) {
                return Ok(());
            }
            return Err(StaleTransition {
                id: self.id,
                from: self.status,
                attempted: change.target(),
            });
        }

        match change {
            StatusChange::Processing => {
                self.status = TaskStatus::Processing;
            }
            StatusChange::Done(response) => {
                self.status = TaskStatus::Done;
                self.response = Some(response);
            }
            StatusChange::Failed(error) => {
                self.status = TaskStatus::Failed;
                self.error = Some(error);
            }
        }
        self.updated_at = now;
        Ok(())
    }

    /// A retried update with the state the record already reached.
    fn is_replay(&self, change: &StatusChange) -> bool {
        match (self.status, change) {
            (TaskStatus::Processing, StatusChange::Processing) => true,
            (TaskStatus::Done, StatusChange::Done(response)) => {
                self.response.as_ref() == Some(response)
            }
            (TaskStatus::Failed, StatusChange::Failed(error)) => {
                self.error.as_deref() == Some(error.as_str())
            }
            _ => false,
        }
    }
}
