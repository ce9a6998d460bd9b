//! SourceReader port - 外部サイトからの人物ページ取得
//!
//! # 実装
//! - **HttpSourceReader**: 本番用（reqwest）
//! - **InMemorySource**: テスト・オフライン用

use async_trait::async_trait;

use crate::domain::{AncestorId, LineageError};

/// SourceReader は人物 ID からページの生データを取得する
///
/// 失敗は `LineageError::Transport` で返し、この層では retry しない。
#[async_trait]
pub trait SourceReader: Send + Sync {
    async fn fetch(&self, ancestor_id: AncestorId) -> Result<String, LineageError>;
}
