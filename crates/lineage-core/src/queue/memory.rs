//! In-memory Work Queue (at-least-once, with redelivery backoff and dead letters).

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};

use super::{DeadLetter, MessageRecord, MessageState, RetryPolicy};
use crate::domain::{LineageError, MessageId};
use crate::observability::QueueCounts;
use crate::ports::{Queue, QueueMessage, TaskLease};

/// Scheduled redelivery entry for the priority queue.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledMessage {
    next_run_at: Instant,
    id: MessageId,
}

impl PartialOrd for ScheduledMessage {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledMessage {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.next_run_at.cmp(&self.next_run_at)
    }
}

struct InMemoryQueueState {
    /// All message records (single source of truth).
    records: HashMap<MessageId, MessageRecord>,

    /// Ready queue (ids only).
    ready: VecDeque<MessageId>,

    /// Redeliveries waiting for their backoff to elapse.
    scheduled: BinaryHeap<ScheduledMessage>,

    next_sequence: u64,

    retry_policy: RetryPolicy,
}

impl InMemoryQueueState {
    fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            records: HashMap::new(),
            ready: VecDeque::new(),
            scheduled: BinaryHeap::new(),
            next_sequence: 1,
            retry_policy,
        }
    }

    /// Move messages from scheduled to ready if their time has come.
    fn promote_scheduled(&mut self) {
        let now = Instant::now();
        while let Some(entry) = self.scheduled.peek() {
            if entry.next_run_at > now {
                break;
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if let Some(record) = self.records.get_mut(&entry.id)
                && record.state == MessageState::RetryScheduled
            {
                record.requeue();
                self.ready.push_back(entry.id);
            }
        }
    }

    fn counts_by_state(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in self.records.values() {
            match record.state {
                MessageState::Queued => counts.queued += 1,
                MessageState::Running => counts.running += 1,
                MessageState::Succeeded => counts.succeeded += 1,
                MessageState::RetryScheduled => counts.retry_scheduled += 1,
                MessageState::Dead => counts.dead += 1,
            }
        }
        counts
    }

    /// Settle a delivery that was not acknowledged: schedule a redelivery, or
    /// dead-letter the message once its receives are used up.
    ///
    /// Returns true when a redelivery was scheduled. A message that is no longer
    /// Running was settled already and is left alone.
    fn release(&mut self, id: MessageId, error: String) -> Result<bool, LineageError> {
        let record = self
            .records
            .get_mut(&id)
            .ok_or_else(|| LineageError::Queue(format!("unknown message {id}")))?;
        if record.state != MessageState::Running {
            return Ok(false);
        }

        if self.retry_policy.is_exhausted(record.receive_count) {
            warn!(
                message_id = %id,
                receives = record.receive_count,
                error = %error,
                "message dead-lettered"
            );
            record.mark_dead(error);
            return Ok(false);
        }

        let delay = self.retry_policy.next_delay(record.receive_count);
        debug!(
            message_id = %id,
            receives = record.receive_count,
            delay_ms = delay.as_millis() as u64,
            "redelivery scheduled"
        );
        record.schedule_retry(error);
        self.scheduled.push(ScheduledMessage {
            next_run_at: Instant::now() + delay,
            id,
        });
        Ok(true)
    }

    fn bodies_in(&self, wanted: impl Fn(MessageState) -> bool) -> Vec<String> {
        let mut records: Vec<_> = self
            .records
            .values()
            .filter(|r| wanted(r.state))
            .collect();
        records.sort_by_key(|r| r.sequence);
        records.into_iter().map(|r| r.body.clone()).collect()
    }
}

/// In-memory queue implementation.
///
/// Stands in for the durable queue service of a deployment: delivery is
/// at-least-once and a failed (or never acknowledged) message is redelivered
/// with exponential backoff until `max_receives`, then dead-lettered.
pub struct InMemoryQueue {
    state: Arc<Mutex<InMemoryQueueState>>,
    notify: Arc<Notify>,
}

impl InMemoryQueue {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self {
            state: Arc::new(Mutex::new(InMemoryQueueState::new(retry_policy))),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Dead-lettered messages with their last error, in enqueue order.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        let state = self.state.lock().await;
        let mut dead: Vec<_> = state
            .records
            .values()
            .filter(|r| r.state == MessageState::Dead)
            .collect();
        dead.sort_by_key(|r| r.sequence);
        dead.into_iter().map(MessageRecord::dead_letter).collect()
    }

    /// Bodies of every message ever admitted, in enqueue order.
    pub async fn all_bodies(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.bodies_in(|_| true)
    }

    /// Bodies of messages not yet delivered, in enqueue order.
    pub async fn pending_bodies(&self) -> Vec<String> {
        let state = self.state.lock().await;
        state.bodies_in(|s| s == MessageState::Queued)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

#[async_trait]
impl Queue for InMemoryQueue {
    async fn enqueue_raw(&self, body: String) -> Result<MessageId, LineageError> {
        let id = MessageId::generate();
        {
            let mut state = self.state.lock().await;
            let sequence = state.next_sequence;
            state.next_sequence += 1;
            state.records.insert(id, MessageRecord::new(id, sequence, body));
            state.ready.push_back(id);
        }
        debug!(message_id = %id, "message enqueued");
        self.notify.notify_one();
        Ok(id)
    }

    async fn lease(&self) -> Option<Box<dyn TaskLease>> {
        loop {
            let next_wake = {
                let mut state = self.state.lock().await;
                state.promote_scheduled();

                while let Some(id) = state.ready.pop_front() {
                    if let Some(record) = state.records.get_mut(&id)
                        && record.state.is_runnable()
                    {
                        let message = record.start_delivery();
                        let lease = InMemoryLease {
                            message,
                            queue: Arc::clone(&self.state),
                            notify: Arc::clone(&self.notify),
                            settled: false,
                        };
                        return Some(Box::new(lease));
                    }
                }

                state.scheduled.peek().map(|entry| entry.next_run_at)
            };

            // Wait for a push OR the next scheduled redelivery.
            if let Some(wake_time) = next_wake {
                tokio::select! {
                    _ = self.notify.notified() => {},
                    _ = tokio::time::sleep_until(wake_time.into()) => {},
                }
            } else {
                self.notify.notified().await;
            }
        }
    }

    async fn counts_by_state(&self) -> Result<QueueCounts, LineageError> {
        let state = self.state.lock().await;
        Ok(state.counts_by_state())
    }
}

/// Lease implementation for InMemoryQueue.
///
/// A lease dropped without `ack`/`fail` (a panicking or cancelled handler)
/// is released like a failed delivery, so the message is redelivered.
struct InMemoryLease {
    message: QueueMessage,
    queue: Arc<Mutex<InMemoryQueueState>>,
    notify: Arc<Notify>,
    settled: bool,
}

#[async_trait]
impl TaskLease for InMemoryLease {
    fn message(&self) -> &QueueMessage {
        &self.message
    }

    async fn ack(self: Box<Self>) -> Result<(), LineageError> {
        let mut lease = self;
        lease.settled = true;
        let mut state = lease.queue.lock().await;
        let record = state.records.get_mut(&lease.message.id).ok_or_else(|| {
            LineageError::Queue(format!("unknown message {}", lease.message.id))
        })?;
        record.mark_succeeded();
        Ok(())
    }

    async fn fail(self: Box<Self>, error: String) -> Result<(), LineageError> {
        let mut lease = self;
        lease.settled = true;
        let scheduled = lease.queue.lock().await.release(lease.message.id, error)?;

        // Notify outside the lock so a waiting lease() re-arms its timer.
        if scheduled {
            lease.notify.notify_one();
        }
        Ok(())
    }
}

impl Drop for InMemoryLease {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let id = self.message.id;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(message_id = %id, "lease dropped outside a runtime; message stays running");
            return;
        };

        let queue = Arc::clone(&self.queue);
        let notify = Arc::clone(&self.notify);
        runtime.spawn(async move {
            let released = queue
                .lock()
                .await
                .release(id, "lease dropped without acknowledgement".into());
            match released {
                Ok(true) => notify.notify_one(),
                Ok(false) => {}
                Err(e) => warn!(message_id = %id, error = %e, "abandoned lease not released"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AncestorId, DiscoveryTask};
    use std::time::Duration;

    fn fast_policy(max_receives: u32) -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(10), max_receives)
    }

    #[tokio::test]
    async fn enqueue_and_counts() {
        let queue = InMemoryQueue::new(fast_policy(3));
        queue
            .enqueue(&DiscoveryTask::seed(AncestorId::new(1), 2))
            .await
            .unwrap();

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.queued, 1);
        assert_eq!(counts.running, 0);
        assert!(!counts.is_drained());
    }

    #[tokio::test]
    async fn lease_transitions_to_running() {
        let queue = InMemoryQueue::new(fast_policy(3));
        let task = DiscoveryTask::seed(AncestorId::new(1640524), 2);
        queue.enqueue(&task).await.unwrap();

        let lease = tokio::time::timeout(Duration::from_millis(100), queue.lease())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            DiscoveryTask::from_body(&lease.message().body).unwrap(),
            task
        );
        assert_eq!(lease.message().receive_count, 1);

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.queued, 0);
        assert_eq!(counts.running, 1);
    }

    #[tokio::test]
    async fn ack_marks_succeeded() {
        let queue = InMemoryQueue::new(fast_policy(3));
        queue.enqueue_raw("{}".into()).await.unwrap();
        let lease = queue.lease().await.unwrap();
        lease.ack().await.unwrap();

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.running, 0);
        assert!(counts.is_drained());
    }

    #[tokio::test]
    async fn failed_message_is_redelivered() {
        let queue = InMemoryQueue::new(fast_policy(3));
        let id = queue.enqueue_raw("body".into()).await.unwrap();

        let lease = queue.lease().await.unwrap();
        lease.fail("fetch failed".into()).await.unwrap();
        assert_eq!(queue.counts_by_state().await.unwrap().retry_scheduled, 1);

        let again = tokio::time::timeout(Duration::from_secs(1), queue.lease())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.message().id, id);
        assert_eq!(again.message().body, "body");
        assert_eq!(again.message().receive_count, 2);
    }

    #[tokio::test]
    async fn message_is_dead_lettered_after_max_receives() {
        let queue = InMemoryQueue::new(fast_policy(2));
        queue.enqueue_raw("poison".into()).await.unwrap();

        for _ in 0..2 {
            let lease = tokio::time::timeout(Duration::from_secs(1), queue.lease())
                .await
                .unwrap()
                .unwrap();
            lease.fail("parse error".into()).await.unwrap();
        }

        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.dead, 1);
        assert!(counts.is_drained());
        let dead = queue.dead_letters().await;
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].body, "poison");
        assert_eq!(dead[0].receive_count, 2);
        assert_eq!(dead[0].last_error.as_deref(), Some("parse error"));
    }

    #[tokio::test]
    async fn dropped_lease_is_redelivered() {
        let queue = InMemoryQueue::new(fast_policy(3));
        let id = queue.enqueue_raw("crashed".into()).await.unwrap();

        let lease = queue.lease().await.unwrap();
        drop(lease);

        let again = tokio::time::timeout(Duration::from_secs(1), queue.lease())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.message().id, id);
        assert_eq!(again.message().receive_count, 2);
        again.ack().await.unwrap();
        assert!(queue.counts_by_state().await.unwrap().is_drained());
    }

    #[tokio::test]
    async fn dropped_lease_counts_towards_dead_letter() {
        let queue = InMemoryQueue::new(fast_policy(1));
        queue.enqueue_raw("crashed".into()).await.unwrap();

        drop(queue.lease().await.unwrap());

        let counts = tokio::time::timeout(
            Duration::from_secs(1),
            crate::worker::wait_drained(&queue, Duration::from_millis(5)),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(counts.dead, 1);
        let dead = queue.dead_letters().await;
        assert_eq!(
            dead[0].last_error.as_deref(),
            Some("lease dropped without acknowledgement")
        );
    }

    #[tokio::test]
    async fn acked_lease_is_not_released_on_drop() {
        let queue = InMemoryQueue::new(fast_policy(3));
        queue.enqueue_raw("done".into()).await.unwrap();
        queue.lease().await.unwrap().ack().await.unwrap();

        tokio::task::yield_now().await;
        let counts = queue.counts_by_state().await.unwrap();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.retry_scheduled, 0);
    }

    #[tokio::test]
    async fn enqueue_wakes_waiting_lease() {
        let queue = Arc::new(InMemoryQueue::new(fast_policy(3)));

        let waiter = tokio::spawn({
            let queue = queue.clone();
            async move { queue.lease().await.map(|l| l.message().body.clone()) }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        queue.enqueue_raw("late".into()).await.unwrap();

        let body = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(body.as_deref(), Some("late"));
    }
}
