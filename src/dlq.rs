//! Dead-letter queue for domain replication tasks.
//!
//! A task the executor cannot apply is quarantined here so that one poison
//! message never blocks the rest of the stream. Operators inspect the queue
//! and either purge entries or merge them back (re-execute) once the
//! underlying problem is fixed.
//!
//! # Message Ids
//!
//! Every published task gets a queue-local, strictly increasing id. Reads
//! and deletes are expressed as half-open ranges `(after_id, last_id]`,
//! with [`EMPTY_MESSAGE_ID`] meaning "from the beginning".
//!
//! ```text
//! publish ──► [0][1][2][3] ──► merge(last=2) ──► [3]
//!                               (0..=2 re-executed, then deleted)
//! ```

use crate::error::{ReplicationError, Result};
use crate::executor::DomainTaskExecutor;
use crate::metrics;
use crate::types::{ReplicationTask, EMPTY_MESSAGE_ID};
use crate::BoxFuture;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// A quarantined task and its queue id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlqMessage {
    pub id: i64,
    pub task: ReplicationTask,
}

/// Storage for quarantined domain replication tasks.
pub trait DomainReplicationQueue: Send + Sync + 'static {
    /// Durably record a task that could not be applied.
    fn publish_to_dlq(&self, task: ReplicationTask) -> BoxFuture<'_, ()>;

    /// Messages with ids in `(after_id, last_id]`, ascending, at most `page_size`.
    fn get_messages_from_dlq(
        &self,
        after_id: i64,
        last_id: i64,
        page_size: usize,
    ) -> BoxFuture<'_, Vec<DlqMessage>>;

    /// Delete messages with ids in `(after_id, last_id]`.
    fn range_delete_from_dlq(&self, after_id: i64, last_id: i64) -> BoxFuture<'_, ()>;

    /// Number of messages currently quarantined.
    fn dlq_size(&self) -> BoxFuture<'_, u64>;
}

// =============================================================================
// In-memory queue
// =============================================================================

#[derive(Default)]
struct QueueState {
    messages: BTreeMap<i64, ReplicationTask>,
    next_id: i64,
}

/// Process-local DLQ. Contents are lost on restart.
#[derive(Default)]
pub struct InMemoryReplicationQueue {
    state: Mutex<QueueState>,
}

impl InMemoryReplicationQueue {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomainReplicationQueue for InMemoryReplicationQueue {
    fn publish_to_dlq(&self, task: ReplicationTask) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            let id = state.next_id;
            state.next_id += 1;
            state.messages.insert(id, task);
            Ok(())
        })
    }

    fn get_messages_from_dlq(
        &self,
        after_id: i64,
        last_id: i64,
        page_size: usize,
    ) -> BoxFuture<'_, Vec<DlqMessage>> {
        Box::pin(async move {
            if last_id <= after_id {
                return Ok(Vec::new());
            }
            let state = self.state.lock().await;
            Ok(state
                .messages
                .range((after_id + 1)..=last_id)
                .take(page_size)
                .map(|(id, task)| DlqMessage {
                    id: *id,
                    task: task.clone(),
                })
                .collect())
        })
    }

    fn range_delete_from_dlq(&self, after_id: i64, last_id: i64) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if last_id <= after_id {
                return Ok(());
            }
            let mut state = self.state.lock().await;
            state.messages.retain(|id, _| *id <= after_id || *id > last_id);
            Ok(())
        })
    }

    fn dlq_size(&self) -> BoxFuture<'_, u64> {
        Box::pin(async move { Ok(self.state.lock().await.messages.len() as u64) })
    }
}

// =============================================================================
// Operator actions
// =============================================================================

/// Outcome of [`DlqHandler::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeResult {
    /// Tasks re-executed successfully and removed from the queue.
    pub merged: usize,
    /// Entries removed without execution because they carried no domain attributes.
    pub discarded: usize,
}

/// Read, count, purge and merge quarantined domain tasks.
pub struct DlqHandler {
    queue: Arc<dyn DomainReplicationQueue>,
    executor: Arc<dyn DomainTaskExecutor>,
}

impl DlqHandler {
    pub fn new(queue: Arc<dyn DomainReplicationQueue>, executor: Arc<dyn DomainTaskExecutor>) -> Self {
        Self { queue, executor }
    }

    /// Up to `page_size` messages with id ≤ `last_message_id`, after `after_id`.
    pub async fn read(&self, after_id: i64, last_message_id: i64, page_size: usize) -> Result<Vec<DlqMessage>> {
        self.queue
            .get_messages_from_dlq(after_id, last_message_id, page_size)
            .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.queue.dlq_size().await
    }

    /// Delete every message with id ≤ `last_message_id`.
    pub async fn purge(&self, last_message_id: i64) -> Result<()> {
        self.queue
            .range_delete_from_dlq(EMPTY_MESSAGE_ID, last_message_id)
            .await?;
        info!(last_message_id, "Purged domain replication DLQ");
        Ok(())
    }

    /// Re-execute quarantined tasks with id ≤ `last_message_id`, in id order.
    ///
    /// The successfully merged prefix is deleted from the queue. The first
    /// execution failure stops the merge; its error is returned after the
    /// prefix before it has been deleted, so a retry resumes at the failing
    /// message.
    pub async fn merge(&self, last_message_id: i64, page_size: usize) -> Result<MergeResult> {
        if page_size == 0 {
            return Err(ReplicationError::Config("DLQ merge page_size must be at least 1".to_string()));
        }

        let mut result = MergeResult::default();
        let mut ack_level = EMPTY_MESSAGE_ID;
        let mut failure = None;

        'pages: loop {
            let page = self
                .queue
                .get_messages_from_dlq(ack_level, last_message_id, page_size)
                .await?;
            if page.is_empty() {
                break;
            }

            for message in page {
                match message.task.domain_task_attributes.as_ref() {
                    Some(attributes) if message.task.is_domain() => {
                        if let Err(e) = self.executor.execute(attributes).await {
                            warn!(
                                message_id = message.id,
                                domain_id = %attributes.id,
                                error = %e,
                                "Failed to merge DLQ message"
                            );
                            failure = Some(e);
                            break 'pages;
                        }
                        result.merged += 1;
                    }
                    _ => {
                        warn!(message_id = message.id, "Discarding DLQ message without domain attributes");
                        result.discarded += 1;
                    }
                }
                ack_level = message.id;
            }
        }

        if ack_level > EMPTY_MESSAGE_ID {
            self.queue
                .range_delete_from_dlq(EMPTY_MESSAGE_ID, ack_level)
                .await?;
        }
        metrics::record_dlq_merge(result.merged, failure.is_some());
        info!(
            merged = result.merged,
            discarded = result.discarded,
            ack_level,
            "Merged domain replication DLQ"
        );

        match failure {
            Some(e) => Err(e),
            None => Ok(result),
        }
    }
}
