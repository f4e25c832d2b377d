//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **Worker / WorkerHandle**: 定期 tick でキューを排出するワーカーループ

pub mod worker_loop;

pub use self::worker_loop::{Worker, WorkerHandle};
