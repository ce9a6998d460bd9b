//! RecordStore port - 冪等なレコード保存（key-value）
//!
//! # 実装
//! - **InMemoryRecordStore**: テスト用
//! - **FsRecordStore**: ディレクトリに 1 key = 1 JSON ファイル

use async_trait::async_trait;

use crate::domain::{AncestorRecord, Claim, LineageError, StoreKey};

/// RecordStore は分散した branch 間の「訪問済み集合」の代わり
///
/// # 設計原則
/// - key が無いことはエラーではない（`exists` は `Ok(false)`）
/// - `write_if_absent` は既存レコードを上書きしない
/// - 障害は `LineageError::Storage` でタスクごと失敗させる
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn exists(&self, key: &StoreKey) -> Result<bool, LineageError>;

    /// Store `record` under `key` unless the key is already present.
    async fn write_if_absent(
        &self,
        key: &StoreKey,
        record: &AncestorRecord,
    ) -> Result<Claim, LineageError>;
}
