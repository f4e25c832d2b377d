//! Error taxonomy.
//!
//! # 方針
//! - **ValidationError**: クライアント入力の不備。API 層がそのまま JSON で返す
//! - **StaleTransition**: 順序外の状態遷移。ログして無視する（防御的）
//! - **StoreError / UpdateError**: 永続化の失敗。リクエスト/tick は継続する
//! - **DownstreamError**: 外部 API の失敗。タスクの `error` に記録される
//!
//! None of these ever crash the worker loop or the server process.

use thiserror::Error;

use super::{TaskId, TaskStatus};

/// Bad client input at task creation. The message is part of the wire
/// contract, so it is fixed here rather than formatted at the edge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("main_url & meme_url required")]
pub struct ValidationError;

/// An out-of-order transition attempt (e.g. mutating a terminal task).
/// Callers log this and move on; it is never an abort.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stale transition for task {id}: {from} -> {attempted}")]
pub struct StaleTransition {
    pub id: TaskId,
    pub from: TaskStatus,
    pub attempted: TaskStatus,
}

/// Persistence failure in the backing store (disk full, permission denied,
/// corrupt record).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store record corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Outcome surface of `TaskStore::update`.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// Unknown task ID. Expected when a record vanished between the
    /// worker's snapshot and the update; logged, not escalated.
    #[error("task {0} not found")]
    Missing(TaskId),

    #[error(transparent)]
    Stale(#[from] StaleTransition),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of the downstream API call. The `Display` string is what gets
/// recorded in the task's `error` field.
#[derive(Debug, Error)]
pub enum DownstreamError {
    #[error("downstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("downstream returned status {0}")]
    Status(u16),

    #[error("invalid response")]
    InvalidBody,
}
