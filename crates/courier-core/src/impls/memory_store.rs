//! In-memory task store implementation.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{StatusChange, StoreError, TaskId, TaskRecord, TaskStatus, UpdateError};
use crate::ports::{Clock, StatusCounts, SystemClock, TaskStore};

/// In-memory task store.
///
/// A plain `HashMap` behind a tokio `Mutex` is enough here: the worker is
/// the sole mutator of existing records and the API surface only appends
/// new ones, so there is no read-modify-write race to guard beyond the map
/// itself. Used for development and tests; production deployments point at
/// [`FsTaskStore`](crate::impls::FsTaskStore) instead.
pub struct InMemoryTaskStore<C = SystemClock> {
    records: Arc<Mutex<HashMap<TaskId, TaskRecord>>>,
    clock: C,
}

impl InMemoryTaskStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for InMemoryTaskStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> InMemoryTaskStore<C> {
    /// テスト用: Clock を差し替えて構築
    pub fn with_clock(clock: C) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }
}

#[async_trait]
impl<C: Clock> TaskStore for InMemoryTaskStore<C> {
    async fn create(&self, record: TaskRecord) -> Result<TaskId, StoreError> {
        let mut records = self.records.lock().await;
        let id = record.id;
        if records.contains_key(&id) {
            // ID collision means a generator bug; refuse to clobber.
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("task {id} already exists"),
            )));
        }
        records.insert(id, record);
        Ok(id)
    }

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.get(&id).cloned())
    }

    async fn list_queued(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|record| record.status.is_queued())
            .cloned()
            .collect())
    }

    async fn update(&self, id: TaskId, change: StatusChange) -> Result<(), UpdateError> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(&id).ok_or(UpdateError::Missing(id))?;
        record.apply(change, self.clock.now())?;
        Ok(())
    }

    async fn counts(&self) -> Result<StatusCounts, StoreError> {
        let records = self.records.lock().await;
        let mut counts = StatusCounts::default();
        for record in records.values() {
            match record.status {
                TaskStatus::Queued => counts.queued += 1,
                TaskStatus::Processing => counts.processing += 1,
                TaskStatus::Done => counts.done += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        Ok(counts)
    }
}
