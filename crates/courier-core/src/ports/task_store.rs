//! TaskStore port - タスクレコードの正本（source of truth）
//!
//! # 設計原則
//! - `create` はレコードが durably retrievable になるまで成功を返さない
//!   （部分書き込みは `get` から決して見えない）
//! - 既存レコードの書き手は Worker のみ。API 層は create と read だけなので、
//!   作成と worker 処理の間にロックは不要（single-writer 規律）
//! - 未知の ID は通常の結果（`Ok(None)`）であってシステム障害ではない
//!
//! # 実装
//! - **InMemoryTaskStore**: HashMap ベース（開発・テスト用）
//! - **FsTaskStore**: 1 タスク 1 JSON ファイル（再起動を跨いで永続）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{StatusChange, StoreError, TaskId, TaskRecord, UpdateError};

/// Durable keyed storage for task records.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new record. Returns the ID once the record is durably
    /// retrievable by `get`.
    async fn create(&self, record: TaskRecord) -> Result<TaskId, StoreError>;

    /// Current record, or `Ok(None)` for an unknown ID.
    async fn get(&self, id: TaskId) -> Result<Option<TaskRecord>, StoreError>;

    /// Snapshot of all records in status queued at call time. Order is
    /// unspecified.
    async fn list_queued(&self) -> Result<Vec<TaskRecord>, StoreError>;

    /// Apply a status change through the lifecycle state machine and
    /// persist the result. Retrying an identical terminal change is a
    /// harmless no-op.
    async fn update(&self, id: TaskId, change: StatusChange) -> Result<(), UpdateError>;

    /// Observability hook: per-status totals.
    async fn counts(&self) -> Result<StatusCounts, StoreError>;
}

/// Per-status totals, logged by the worker after each non-empty tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub queued: usize,
    pub processing: usize,
    pub done: usize,
    pub failed: usize,
}
