use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub queued: usize,
    pub running: usize,
    pub succeeded: usize,
    pub retry_scheduled: usize,
    pub dead: usize,
}

impl QueueCounts {
    /// Nothing left to deliver: no queued, running or scheduled messages.
    pub fn is_drained(&self) -> bool {
        self.queued == 0 && self.running == 0 && self.retry_scheduled == 0
    }
}
