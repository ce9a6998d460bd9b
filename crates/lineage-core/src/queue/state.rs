//! Message state machine for the queue.

use serde::{Deserialize, Serialize};

/// Message state.
///
/// State transitions:
/// - Queued -> Running -> Succeeded
/// - Queued -> Running -> RetryScheduled -> Queued (redelivery, until max_receives)
/// - Queued -> Running -> Dead (dead letter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageState {
    /// Ready to be delivered.
    Queued,

    /// Leased by a worker, not yet acknowledged.
    Running,

    /// Acknowledged.
    Succeeded,

    /// Waiting for redelivery (backoff).
    RetryScheduled,

    /// Dead-lettered (max_receives reached).
    Dead,
}

impl MessageState {
    /// Is this message eligible for lease?
    pub fn is_runnable(self) -> bool {
        matches!(self, MessageState::Queued)
    }
}
