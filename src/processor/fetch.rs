//! Fetch-and-dispatch cycle.
//!
//! One cycle: ownership check, one remote fetch after the current watermark,
//! sequential dispatch of the batch, then a single watermark update. Tasks
//! are applied in the order the source produced them; a task that fails to
//! apply is quarantined so the rest of the batch still flows.
//!
//! Every remote and local call runs under a deadline, so a cycle always
//! finishes and `stop()` never waits on a stuck collaborator.
//!
//! A cycle works on a private copy of [`Progress`] and publishes it in one
//! write when it ends.

use super::types::{CycleOutcome, CycleStats, SkipReason};
use super::{Progress, ProcessorInner};
use crate::error::{ReplicationError, Result};
use crate::membership::Service;
use crate::metrics;
use crate::types::{GetDomainReplicationMessagesRequest, ReplicationTask};
use std::future::Future;
use std::time::{Duration, Instant, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

/// How a single task was accounted for.
enum Dispatch {
    Applied,
    Quarantined,
    Skipped,
    /// Domain task without attributes; dropped.
    Malformed,
    /// Neither applied nor quarantined.
    Unhandled,
}

impl ProcessorInner {
    pub(crate) async fn fetch_domain_replication_tasks(&self) -> CycleOutcome {
        let _cycle = self.cycle_lock.lock().await;
        // Only the cycle-lock holder writes progress
        let mut progress = *self.progress.lock().await;
        let outcome = self.run_cycle(&mut progress).await;
        progress.last_cycle = Some(outcome);
        *self.progress.lock().await = progress;
        outcome
    }

    async fn run_cycle(&self, progress: &mut Progress) -> CycleOutcome {
        if let Some(reason) = self.check_ownership() {
            metrics::record_cycle_skipped(&self.source_cluster, match reason {
                SkipReason::NotOwner => "not_owner",
                SkipReason::LookupFailed => "lookup_failed",
            });
            return CycleOutcome::Skipped(reason);
        }

        let snapshot = progress.watermarks;
        let request = GetDomainReplicationMessagesRequest {
            last_retrieved_message_id: snapshot.last_retrieved_message_id,
            last_processed_message_id: snapshot.last_processed_message_id,
            cluster_name: self.current_cluster.clone(),
        };

        let start = Instant::now();
        let response = match self.fetch(request).await {
            Ok(response) => {
                metrics::record_fetch(&self.source_cluster, "success", start.elapsed());
                progress.last_fetch_success = Some(self.context.time_source.now());
                response
            }
            Err(e) => {
                metrics::record_fetch(&self.source_cluster, "failure", start.elapsed());
                warn!(
                    source_cluster = %self.source_cluster,
                    last_retrieved_message_id = snapshot.last_retrieved_message_id,
                    error = %e,
                    "Failed to get domain replication tasks"
                );
                return CycleOutcome::FetchFailed;
            }
        };

        let messages = response.messages;
        let from = snapshot.last_retrieved_message_id;
        let to = messages.last_retrieved_message_id;
        let tasks = messages.replication_tasks;
        metrics::record_tasks_fetched(&self.source_cluster, tasks.len());
        if to < from {
            warn!(
                source_cluster = %self.source_cluster,
                last_retrieved_message_id = from,
                response_message_id = to,
                "Stale replication response, watermark will not move"
            );
        }
        debug!(
            source_cluster = %self.source_cluster,
            count = tasks.len(),
            last_retrieved_message_id = to,
            has_more = messages.has_more,
            "Fetched domain replication tasks"
        );

        let mut stats = CycleStats {
            fetched: tasks.len(),
            ..CycleStats::default()
        };
        let mut last_accounted = None;
        let mut failed_task_id = None;

        for task in &tasks {
            match self.dispatch(task).await {
                Dispatch::Applied => stats.applied += 1,
                Dispatch::Quarantined => stats.quarantined += 1,
                Dispatch::Skipped => stats.skipped += 1,
                Dispatch::Malformed => stats.malformed += 1,
                Dispatch::Unhandled => {
                    failed_task_id = Some(task.source_task_id);
                    break;
                }
            }
            last_accounted = Some(task.source_task_id);
        }

        let target = match failed_task_id {
            None => Some(to),
            // Partial progress only, never past the failed task
            Some(_) => last_accounted.map(|id| id.clamp(from, to.max(from))),
        };

        if let Some(target) = target {
            progress.watermarks.advance_to(target);
        }
        metrics::set_watermarks(
            &self.source_cluster,
            progress.watermarks.last_retrieved_message_id,
            progress.watermarks.last_processed_message_id,
        );

        match failed_task_id {
            None => CycleOutcome::Completed(stats),
            Some(failed_task_id) => CycleOutcome::Halted {
                stats,
                failed_task_id,
            },
        }
    }

    /// `None` if this host owns the source cluster's stream.
    fn check_ownership(&self) -> Option<SkipReason> {
        match self
            .context
            .resolver
            .lookup(Service::Worker, &self.source_cluster)
        {
            Ok(owner) if owner.identity() == self.context.host_info.identity() => None,
            Ok(owner) => {
                debug!(
                    source_cluster = %self.source_cluster,
                    owner = owner.identity(),
                    "Not the owner of the replication stream, skipping"
                );
                Some(SkipReason::NotOwner)
            }
            Err(e) => {
                info!(
                    source_cluster = %self.source_cluster,
                    error = %e,
                    "Membership lookup failed, skipping"
                );
                Some(SkipReason::LookupFailed)
            }
        }
    }

    async fn fetch(
        &self,
        request: GetDomainReplicationMessagesRequest,
    ) -> Result<crate::types::GetDomainReplicationMessagesResponse> {
        let attempts = self.retry.retry("get_domain_replication_messages", || {
            self.remote.get_domain_replication_messages(request.clone())
        });
        match tokio::time::timeout(self.fetch_timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(ReplicationError::Timeout(self.fetch_timeout)),
        }
    }

    async fn dispatch(&self, task: &ReplicationTask) -> Dispatch {
        if !task.is_domain() {
            metrics::record_task_skipped(&self.source_cluster, &task.task_type.to_string());
            return Dispatch::Skipped;
        }
        if task.domain_task_attributes.is_none() {
            // Neither executor nor DLQ accepts it
            metrics::record_malformed_task(&self.source_cluster);
            error!(
                source_cluster = %self.source_cluster,
                source_task_id = task.source_task_id,
                "Dropping domain replication task without domain attributes"
            );
            return Dispatch::Malformed;
        }

        let start = Instant::now();
        let applied = self
            .within_task_timeout(
                self.retry
                    .retry("execute_domain_task", || self.handle_domain_replication_task(task)),
            )
            .await;
        let execute_error = match applied {
            Ok(()) => {
                metrics::record_task_applied(&self.source_cluster, start.elapsed());
                self.record_lag(task);
                return Dispatch::Applied;
            }
            Err(e) => e,
        };

        metrics::record_task_failure(&self.source_cluster);
        warn!(
            source_cluster = %self.source_cluster,
            source_task_id = task.source_task_id,
            error = %execute_error,
            "Failed to apply domain replication task, moving to DLQ"
        );

        let quarantined = self
            .within_task_timeout(self.retry.retry("put_domain_replication_task_to_dlq", || {
                self.put_domain_replication_task_to_dlq(task)
            }))
            .await;
        match quarantined {
            Ok(()) => Dispatch::Quarantined,
            Err(dlq_error) => {
                metrics::record_dlq_failure(&self.source_cluster);
                error!(
                    source_cluster = %self.source_cluster,
                    source_task_id = task.source_task_id,
                    execute_error = %execute_error,
                    error = %dlq_error,
                    "Failed to put domain replication task to DLQ"
                );
                Dispatch::Unhandled
            }
        }
    }

    /// Bound a retried executor or DLQ call by the task deadline.
    async fn within_task_timeout(&self, attempts: impl Future<Output = Result<()>>) -> Result<()> {
        match tokio::time::timeout(self.task_timeout, attempts).await {
            Ok(result) => result,
            Err(_) => Err(ReplicationError::Timeout(self.task_timeout)),
        }
    }

    pub(crate) async fn handle_domain_replication_task(&self, task: &ReplicationTask) -> Result<()> {
        let attributes = task.domain_task_attributes.as_ref().ok_or_else(|| {
            metrics::record_malformed_task(&self.source_cluster);
            ReplicationError::MalformedTask(format!(
                "domain task {} has no domain attributes",
                task.source_task_id
            ))
        })?;
        self.context.executor.execute(attributes).await
    }

    pub(crate) async fn put_domain_replication_task_to_dlq(&self, task: &ReplicationTask) -> Result<()> {
        let Some(attributes) = task.domain_task_attributes.as_ref() else {
            metrics::record_malformed_task(&self.source_cluster);
            warn!(
                source_cluster = %self.source_cluster,
                source_task_id = task.source_task_id,
                "Rejecting DLQ write for task without domain attributes"
            );
            return Err(ReplicationError::MalformedTask(format!(
                "domain task {} has no domain attributes",
                task.source_task_id
            )));
        };

        info!(
            source_cluster = %self.source_cluster,
            domain_id = %attributes.id,
            domain_name = attributes.domain_name(),
            source_task_id = task.source_task_id,
            "Put domain replication task to DLQ"
        );
        self.context.queue.publish_to_dlq(task.clone()).await?;
        metrics::record_task_quarantined(&self.source_cluster, attributes.domain_name());
        Ok(())
    }

    fn record_lag(&self, task: &ReplicationTask) {
        let Some(nanos) = task.creation_time.filter(|n| *n > 0) else {
            return;
        };
        let created = UNIX_EPOCH + Duration::from_nanos(nanos as u64);
        if let Ok(lag) = self.context.time_source.now().duration_since(created) {
            metrics::record_replication_lag(&self.source_cluster, lag);
        }
    }
}
