//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（ストレージ、下流 API、時刻、エントロピー）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - TaskStore が source of truth（正本）
//! - Worker が既存レコードの唯一の書き手（API 層は create と read のみ）
//! - 下流 API は不透明なリモート呼び出し（任意のレイテンシ、JSON か失敗）

pub mod clock;
pub mod downstream;
pub mod id_generator;
pub mod task_store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::downstream::DownstreamClient;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::task_store::{StatusCounts, TaskStore};
