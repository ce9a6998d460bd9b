//! TraversalWorker - 1 タスク分の状態機械
//!
//! # フロー
//! RECEIVED → FETCHED → EXTRACTED → STORE-CHECKED → {FANNED-OUT | TERMINAL} → ACKNOWLEDGED
//!
//! 1. 深さ上限チェック（超過なら外部呼び出しなしで Rejected）、level が予算外なら InvalidTask
//! 2. SourceReader::fetch
//! 3. extract → AncestorRecord（level = task.level + 1）
//! 4. StoreKey を導出して RecordStore::write_if_absent
//! 5. decide（純粋関数）→ FanOut なら親ごとに enqueue
//! 6. Throttle::pause（どの分岐でも必ず）
//!
//! ack は呼び出し側（WorkerGroup）が Completion を受けて行う。
//! 途中のエラーはそのまま返し、再配送は Queue に任せる。

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::{
    AncestorId, AncestorRecord, Completion, DiscoveryTask, LineageError, StoreKey, decide,
};
use crate::ports::{Queue, RecordStore, SourceReader, Throttle};
use crate::source::extract;

#[derive(Clone)]
pub struct TraversalWorker {
    source: Arc<dyn SourceReader>,
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn Queue>,
    throttle: Arc<dyn Throttle>,
}

impl TraversalWorker {
    pub fn new(
        source: Arc<dyn SourceReader>,
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn Queue>,
        throttle: Arc<dyn Throttle>,
    ) -> Self {
        Self {
            source,
            store,
            queue,
            throttle,
        }
    }

    /// Handle one raw message body as delivered by the queue.
    pub async fn handle_body(&self, body: &str) -> Result<Completion, LineageError> {
        let task = DiscoveryTask::from_body(body)?;
        self.handle(task).await
    }

    pub async fn handle(&self, task: DiscoveryTask) -> Result<Completion, LineageError> {
        if let Err(err) = task.check_ceiling() {
            warn!(ancestor_id = %task.ancestor_id, error = %err, "task rejected");
            return Ok(Completion::Rejected {
                requested: task.maximum_level,
            });
        }
        task.check_level()?;

        let page = self.source.fetch(task.ancestor_id).await?;
        let extraction = extract(&page)?;
        let record =
            AncestorRecord::from_extraction(task.ancestor_id, task.record_level(), page, extraction)?;
        debug!(
            ancestor_id = %record.id,
            level = record.level,
            first_name = %record.first_name,
            last_name = %record.last_name,
            has_parents = record.has_parents(),
            "record extracted"
        );

        let key = StoreKey::for_record(&record);
        let claim = self.store.write_if_absent(&key, &record).await?;

        let decision = decide(&task, &record, claim);
        for child in decision.children() {
            self.queue.enqueue(child).await?;
        }
        info!(
            ancestor_id = %record.id,
            level = record.level,
            key = %key,
            already_existed = claim.already_existed(),
            decision = decision.label(),
            children = decision.children().len(),
            "ancestor processed"
        );

        self.throttle.pause().await;
        Ok(Completion::Done(decision))
    }
}

/// Seed a new traversal tree.
pub async fn seed(
    queue: &dyn Queue,
    ancestor_id: AncestorId,
    maximum_level: u32,
) -> Result<DiscoveryTask, LineageError> {
    let task = DiscoveryTask::seed(ancestor_id, maximum_level);
    task.check_ceiling()?;
    let message_id = queue.enqueue(&task).await?;
    info!(%ancestor_id, maximum_level, %message_id, "traversal seeded");
    Ok(task)
}
