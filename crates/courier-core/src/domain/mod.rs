//! Domain model (IDs, status, task records, errors).

pub mod errors;
pub mod ids;
pub mod state;
pub mod task;

pub use self::errors::{DownstreamError, StaleTransition, StoreError, UpdateError, ValidationError};
pub use self::ids::TaskId;
pub use self::state::TaskStatus;
pub use self::task::{StatusChange, TaskRecord};
