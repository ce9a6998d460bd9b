//! Queue port - DiscoveryTask の配送キュー
//!
//! メッセージ本体は JSON 文字列のまま流し、decode はハンドラ側で行います
//! （壊れたメッセージも ack されずに再配送 → dead letter へ進む）。

use async_trait::async_trait;

use crate::domain::{DiscoveryTask, LineageError, MessageId};
use crate::observability::QueueCounts;

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub id: MessageId,
    pub body: String,
    /// How many times this message has been delivered, including this one.
    pub receive_count: u32,
}

/// A leased message.
/// The worker owns this lease and must either `ack` or `fail`.
#[async_trait]
pub trait TaskLease: Send {
    fn message(&self) -> &QueueMessage;

    /// Mark success; the message is not delivered again.
    async fn ack(self: Box<Self>) -> Result<(), LineageError>;

    /// Mark failure (queue decides redelivery / dead letter).
    async fn fail(self: Box<Self>, error: String) -> Result<(), LineageError>;
}

/// Queue は at-least-once の配送チャネル
///
/// # 設計原則
/// - 兄弟タスク間・branch 間の順序は保証しない
/// - ack されなかったメッセージは再配送される
#[async_trait]
pub trait Queue: Send + Sync {
    /// Durably admit one raw message body.
    async fn enqueue_raw(&self, body: String) -> Result<MessageId, LineageError>;

    async fn enqueue(&self, task: &DiscoveryTask) -> Result<MessageId, LineageError> {
        let body = task.to_body()?;
        self.enqueue_raw(body).await
    }

    /// Lease one ready message (waits until one is available).
    async fn lease(&self) -> Option<Box<dyn TaskLease>>;

    async fn counts_by_state(&self) -> Result<QueueCounts, LineageError>;
}
