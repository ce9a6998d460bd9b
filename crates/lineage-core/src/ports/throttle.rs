//! Throttle port - bot 検知を避けるための待機

use async_trait::async_trait;

/// Throttle は各タスクの完了前に必ず 1 回呼ばれる
#[async_trait]
pub trait Throttle: Send + Sync {
    async fn pause(&self);
}
