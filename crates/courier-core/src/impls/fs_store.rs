//! File-backed task store: one JSON file per task.
//!
//! # レイアウト
//! - `<data_dir>/<task_id>.json` にレコードを JSON で保存
//! - `data_dir` は初回利用時に作成（存在しないディレクトリを許容）
//!
//! # 耐久性
//! `create` / `update` は `<id>.json.tmp` に書いてから rename します。
//! rename は同一ファイルシステム内で atomic なので、途中でクラッシュしても
//! 部分書き込みが `get` から見えることはありません。

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::domain::{StatusChange, StoreError, TaskId, TaskRecord, TaskStatus, UpdateError};
use crate::ports::{Clock, StatusCounts, SystemClock, TaskStore};

/// File-backed task store.
///
/// Read-modify-write on `update` is safe under the single-writer discipline:
/// only one worker mutates existing records, and creation never touches an
/// existing file.
pub struct FsTaskStore<C = SystemClock> {
    dir: PathBuf,
    clock: C,
}

impl FsTaskStore<SystemClock> {
    /// Open (creating if needed) the data directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with_clock(dir, SystemClock).await
    }
}

impl<C: Clock> FsTaskStore<C> {
    /// テスト用: Clock を差し替えて構築
    pub async fn open_with_clock(dir: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir, clock })
    }

    fn record_path(&self, id: TaskId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write_record(&self, record: &TaskRecord) -> Result<(), StoreError> {
        let path = self.record_path(record.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, &bytes).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_record(&self, path: &Path) -> Result<Option<TaskRecord>, StoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Scan every record in the directory. Entries that are not `.json` or
    /// fail to parse are skipped with a warning; one corrupt file must not
    /// take down the whole scan.
    async fn scan(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match self.read_record(&path).await {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {} // vanished between read_dir and read; fine
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable task record");
                }
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl<C: Clock> TaskStore for FsTaskStore<C> {
    async fn create(&self, record: TaskRecord) -> Result<TaskId, StoreError> {
        let id = record.id;
        let path = self.record_path(id);
        if fs::try_exists(&path).await? {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("task {id} already exists"),
            )));
        }
        self.write_record(&record).await?;
        Ok(id)
    }

    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError> {
        self.read_record(&self.record_path(id)).await
    }

    async fn list_queued(&self) -> Result<Vec<TaskRecord>, StoreError> {
        let mut records = self.scan().await?;
        records.retain(|record| record.status.is_queued());
        Ok(records)
    }

    async fn update(&self, id: TaskId, change: StatusChange) -> Result<(), UpdateError> {
        let mut record = self
            .get(id)
            .await
            .map_err(UpdateError::Store)?
            .ok_or(UpdateError::Missing(id))?;
        record.apply(change, self.clock.now())?;
        self.write_record(&record).await.map_err(UpdateError::Store)
    }

    async fn counts(&self) -> Result<StatusCounts, StoreError> {
        let mut counts = StatusCounts::default();
        for record in self.scan().await? {
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
