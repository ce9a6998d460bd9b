use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::{Completion, LineageError};
use crate::observability::QueueCounts;
use crate::ports::{Queue, TaskLease};
use crate::traversal::TraversalWorker;

/// Worker group handle.
/// - `shutdown_tx` を drop するとワーカー全体が止まる
/// - `join()` で全ワーカーの終了を待てる
pub struct WorkerGroup {
    shutdown_tx: watch::Sender<bool>,
    joins: Vec<JoinHandle<()>>,
}

impl WorkerGroup {
    /// Spawn `n` workers.
    ///
    /// `task_timeout` は host 側のタイムアウト。超えたタスクは fail 扱いで再配送される。
    pub fn spawn(
        n: usize,
        queue: Arc<dyn Queue>,
        worker: TraversalWorker,
        task_timeout: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut joins = Vec::with_capacity(n);
        for worker_id in 0..n {
            let q = Arc::clone(&queue);
            let w = worker.clone();
            let mut rx = shutdown_rx.clone();

            let join = tokio::spawn(async move {
                worker_loop(worker_id, q, w, task_timeout, &mut rx).await;
            });
            joins.push(join);
        }

        Self { shutdown_tx, joins }
    }

    /// Request shutdown for all workers.
    /// In-flight tasks run to completion; workers just stop taking new leases.
    pub fn request_shutdown(&self) {
        // receivers may already be dropped
        let _ = self.shutdown_tx.send(true);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        for j in self.joins {
            let _ = j.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<dyn Queue>,
    worker: TraversalWorker,
    task_timeout: Duration,
    shutdown_rx: &mut watch::Receiver<bool>,
) {
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        // lease は待つ可能性があるので shutdown と競合させる
        let lease = tokio::select! {
            _ = shutdown_rx.changed() => continue,
            lease = queue.lease() => lease,
        };

        let Some(lease) = lease else {
            tokio::task::yield_now().await;
            continue;
        };

        let outcome = run_handler(&worker, lease.message().body.clone(), task_timeout).await;
        settle(worker_id, lease, outcome).await;
    }
}

/// Run one handler invocation in its own task, so a panic or the host timeout
/// ends that invocation only; the lease stays with the worker loop.
async fn run_handler(
    worker: &TraversalWorker,
    body: String,
    task_timeout: Duration,
) -> Result<Completion, LineageError> {
    let worker = worker.clone();
    let mut handle = tokio::spawn(async move { worker.handle_body(&body).await });

    match tokio::time::timeout(task_timeout, &mut handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_error)) if join_error.is_panic() => Err(LineageError::Queue(format!(
            "handler panicked: {}",
            panic_message(join_error.into_panic())
        ))),
        Ok(Err(join_error)) => Err(LineageError::Queue(format!(
            "handler cancelled: {join_error}"
        ))),
        Err(_) => {
            handle.abort();
            Err(LineageError::Queue(format!(
                "task exceeded the {}s host timeout",
                task_timeout.as_secs_f64()
            )))
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map_or_else(|| "non-string panic payload".to_string(), |msg| msg.to_string()),
    }
}

/// Acknowledge on any completion (rejections included); otherwise leave the
/// message to the queue's redelivery policy.
async fn settle(
    worker_id: usize,
    lease: Box<dyn TaskLease>,
    outcome: Result<Completion, LineageError>,
) {
    let message_id = lease.message().id;
    let receive_count = lease.message().receive_count;
    match outcome {
        Ok(completion) => {
            debug!(worker_id, %message_id, status = completion.status_code(), "task completed");
            if let Err(e) = lease.ack().await {
                error!(worker_id, %message_id, error = %e, "ack failed");
            }
        }
        Err(err) => {
            warn!(
                worker_id,
                %message_id,
                receive_count,
                kind = ?err.kind(),
                error = %err,
                "task failed; leaving it to redelivery"
            );
            if let Err(e) = lease.fail(err.to_string()).await {
                error!(worker_id, %message_id, error = %e, "fail report failed");
            }
        }
    }
}

/// Poll the queue until nothing is queued, running or waiting for redelivery.
pub async fn wait_drained(
    queue: &dyn Queue,
    poll_interval: Duration,
) -> Result<QueueCounts, LineageError> {
    loop {
        let counts = queue.counts_by_state().await?;
        if counts.is_drained() {
            return Ok(counts);
        }
        tokio::time::sleep(poll_interval).await;
    }
}
