//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryRecordStore**: テスト用の RecordStore
//! - **FsRecordStore**: 1 key = 1 JSON ファイルの RecordStore
//! - **InMemorySource**: 固定ページを返す SourceReader（テスト・オフライン用）
//! - **RandomThrottle / NoThrottle**: Throttle
//!
//! HTTP の SourceReader は `source::HttpSourceReader`、Queue は `queue::InMemoryQueue`。

pub mod fs_store;
pub mod inmem_source;
pub mod inmem_store;
pub mod throttle;

pub use self::fs_store::FsRecordStore;
pub use self::inmem_source::InMemorySource;
pub use self::inmem_store::InMemoryRecordStore;
pub use self::throttle::{NoThrottle, RandomThrottle};
