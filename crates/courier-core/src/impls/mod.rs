//! Implementations of the ports.
//!
//! - **InMemoryTaskStore**: HashMap ベース（開発・テスト用）
//! - **FsTaskStore**: 1 タスク 1 JSON ファイル（再起動を跨いで永続）
//! - **HttpDownstreamClient**: reqwest による下流 API 呼び出し

pub mod fs_store;
pub mod http_downstream;
pub mod memory_store;

pub use self::fs_store::FsTaskStore;
pub use self::http_downstream::HttpDownstreamClient;
pub use self::memory_store::InMemoryTaskStore;
