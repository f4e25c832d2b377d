//! courier-core
//!
//! Core building blocks for the Courier task service.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, state, task, errors）
//! - **ports**: 抽象化レイヤー（TaskStore, DownstreamClient, IdGenerator, Clock）
//! - **impls**: 実装（InMemoryTaskStore, FsTaskStore, HttpDownstreamClient）
//! - **app**: アプリケーションロジック（worker_loop）
//!
//! The HTTP surface lives in `courier-server`; this crate owns the task
//! lifecycle: the persisted record, the queued→processing→{done,failed}
//! state machine, and the worker loop that drains queued work against the
//! downstream API.

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
