//! Ports - 抽象化レイヤー
//!
//! TraversalWorker が触る外部システムはすべてここの trait 越しに注入します。
//! テストでは in-memory 実装（impls）に差し替えられます。
//!
//! # 設計原則
//! - 共有される可変状態は RecordStore だけ（ambient な global は持たない）
//! - Queue は at-least-once。ハンドラ側が再配送に耐える
//! - SourceReader は入力境界（深さ・再帰・保存を知らない）

pub mod queue;
pub mod record_store;
pub mod source;
pub mod throttle;

pub use self::queue::{Queue, QueueMessage, TaskLease};
pub use self::record_store::RecordStore;
pub use self::source::SourceReader;
pub use self::throttle::Throttle;

pub use crate::domain::Claim;
