//! lineage-core
//!
//! 祖先グラフを深さ制限つきで辿る分散トラバーサルのコア。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（AncestorId, DiscoveryTask, AncestorRecord, StoreKey, Decision, errors）
//! - **ports**: 抽象化レイヤー（SourceReader, RecordStore, Queue, Throttle）
//! - **source**: ページ抽出と HTTP 実装
//! - **impls**: ports の実装（InMemoryRecordStore, FsRecordStore, InMemorySource, throttles）
//! - **queue**: at-least-once の InMemoryQueue（retry / dead letter）
//! - **traversal**: TraversalWorker（1 タスク分の状態機械）
//! - **worker**: WorkerGroup（Queue と TraversalWorker をつなぐ）
//! - **config**: 環境変数からの設定

pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod queue;
pub mod source;
pub mod traversal;
pub mod worker;

pub use config::Config;
pub use domain::{
    AncestorId, AncestorRecord, Completion, Decision, DiscoveryTask, LineageError, StoreKey,
};
pub use traversal::TraversalWorker;
pub use worker::WorkerGroup;
