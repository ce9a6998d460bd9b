//! Message record: body + delivery bookkeeping.

use super::MessageState;
use crate::domain::MessageId;
use crate::ports::QueueMessage;

/// Single source of truth for one message.
/// Queue structures (ready/scheduled) hold MessageId only.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: MessageId,

    /// Admission order within this queue.
    pub sequence: u64,

    pub body: String,
    pub state: MessageState,

    /// Deliveries so far (including the current one if Running).
    pub receive_count: u32,

    /// Why the latest delivery was not acknowledged.
    pub last_error: Option<String>,
}

/// A dead-lettered message, as reported to operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetter {
    pub id: MessageId,
    pub body: String,
    pub receive_count: u32,
    pub last_error: Option<String>,
}

impl MessageRecord {
    pub fn new(id: MessageId, sequence: u64, body: String) -> Self {
        Self {
            id,
            sequence,
            body,
            state: MessageState::Queued,
            receive_count: 0,
            last_error: None,
        }
    }

    /// Mark as running (increment receive count).
    pub fn start_delivery(&mut self) -> QueueMessage {
        self.state = MessageState::Running;
        self.receive_count += 1;
        QueueMessage {
            id: self.id,
            body: self.body.clone(),
            receive_count: self.receive_count,
        }
    }

    pub fn mark_succeeded(&mut self) {
        self.state = MessageState::Succeeded;
    }

    pub fn mark_dead(&mut self, error: String) {
        self.state = MessageState::Dead;
        self.last_error = Some(error);
    }

    pub fn schedule_retry(&mut self, error: String) {
        self.state = MessageState::RetryScheduled;
        self.last_error = Some(error);
    }

    /// Move from RetryScheduled back to Queued.
    pub fn requeue(&mut self) {
        self.state = MessageState::Queued;
    }

    pub fn dead_letter(&self) -> DeadLetter {
        DeadLetter {
            id: self.id,
            body: self.body.clone(),
            receive_count: self.receive_count,
            last_error: self.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_counts_receives() {
        let mut record = MessageRecord::new(MessageId::generate(), 1, "{}".into());
        let first = record.start_delivery();
        assert_eq!(first.receive_count, 1);
        assert_eq!(record.state, MessageState::Running);

        record.schedule_retry("boom".into());
        assert_eq!(record.state, MessageState::RetryScheduled);
        record.requeue();
        assert!(record.state.is_runnable());

        let second = record.start_delivery();
        assert_eq!(second.receive_count, 2);
        assert_eq!(second.body, "{}");
    }

    #[test]
    fn dead_letter_keeps_the_last_error() {
        let mut record = MessageRecord::new(MessageId::generate(), 1, "poison".into());
        record.start_delivery();
        record.mark_dead("parse error: no <h3>".into());

        let dead = record.dead_letter();
        assert_eq!(dead.body, "poison");
        assert_eq!(dead.receive_count, 1);
        assert_eq!(dead.last_error.as_deref(), Some("parse error: no <h3>"));
    }
}
