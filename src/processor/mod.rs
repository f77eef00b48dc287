// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Domain replication processor.
//!
//! One processor pulls domain configuration changes from one source cluster:
//! - Ownership gating via [`crate::membership::MembershipResolver`]
//! - Watermark-based fetch via [`crate::remote::RemoteAdminClient`]
//! - Local application via [`crate::executor::DomainTaskExecutor`]
//! - Poison-task quarantine via [`crate::dlq::DomainReplicationQueue`]
//!
//! # Architecture
//!
//! ```text
//!  start()
//!    │
//!    ▼
//!  poll loop ── tick ──► owner? ──no──► skip
//!    ▲                    │yes
//!    │                    ▼
//!    │            fetch(after last_retrieved) ──err──► abort cycle
//!    │                    │ok
//!    │                    ▼
//!    │            for task in batch: execute ──err──► DLQ ──err──► halt
//!    │                    │
//!    └─────────── advance watermarks
//! ```
//!
//! Exactly one tokio task runs the loop; cycles never overlap. [`stop()`]
//! signals the loop and awaits the task, so nothing keeps running once it
//! returns.
//!
//! [`stop()`]: DomainReplicationProcessor::stop

mod fetch;
mod types;

pub use types::{
    CycleOutcome, CycleStats, ProcessorState, ProcessorStatus, SkipReason, Watermarks,
};

use crate::clock::TimeSource;
use crate::config::ProcessorConfig;
use crate::dlq::DomainReplicationQueue;
use crate::error::Result;
use crate::executor::DomainTaskExecutor;
use crate::membership::{HostInfo, MembershipResolver};
use crate::metrics;
use crate::remote::RemoteAdminClient;
use crate::resilience::RetryPolicy;
use crate::types::ReplicationTask;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

/// Local collaborators shared by every processor on a host.
#[derive(Clone)]
pub struct ProcessorContext {
    pub executor: Arc<dyn DomainTaskExecutor>,
    pub queue: Arc<dyn DomainReplicationQueue>,
    pub resolver: Arc<dyn MembershipResolver>,
    pub time_source: Arc<dyn TimeSource>,
    /// This host, compared against the resolver's answer.
    pub host_info: HostInfo,
}

/// State shared between the processor handle and its poll loop.
pub(crate) struct ProcessorInner {
    source_cluster: String,
    current_cluster: String,
    poll_interval: Duration,
    fetch_timeout: Duration,
    task_timeout: Duration,
    remote: Arc<dyn RemoteAdminClient>,
    context: ProcessorContext,
    retry: RetryPolicy,
    progress: Mutex<Progress>,
    /// Held for the duration of a cycle so cycles never overlap.
    cycle_lock: Mutex<()>,
}

/// What a cycle publishes. Written once at the end of each cycle, so
/// readers see either all of a cycle's effects or none of them.
#[derive(Debug, Clone, Copy, Default)]
struct Progress {
    watermarks: Watermarks,
    last_cycle: Option<CycleOutcome>,
    last_fetch_success: Option<SystemTime>,
}

/// Parsed deadlines from [`ProcessorConfig`].
struct Timeouts {
    fetch: Duration,
    task: Duration,
}

/// Pulls domain replication tasks from one source cluster.
pub struct DomainReplicationProcessor {
    inner: Arc<ProcessorInner>,
    state: AtomicU8,
    shutdown_tx: watch::Sender<bool>,
    /// Poll loop handle. Locked across start/stop so they serialize.
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl DomainReplicationProcessor {
    /// Create a processor starting from empty watermarks.
    ///
    /// Fails fast with a `Config` error if `config` is invalid.
    pub fn new(
        config: ProcessorConfig,
        remote: Arc<dyn RemoteAdminClient>,
        context: ProcessorContext,
    ) -> Result<Self> {
        Self::with_watermarks(config, remote, context, Watermarks::default())
    }

    /// Create a processor resuming from `watermarks`.
    pub fn with_watermarks(
        config: ProcessorConfig,
        remote: Arc<dyn RemoteAdminClient>,
        context: ProcessorContext,
        watermarks: Watermarks,
    ) -> Result<Self> {
        config.validate()?;
        let poll_interval = config.poll_interval_duration()?;
        let timeouts = Timeouts {
            fetch: config.fetch_timeout_duration()?,
            task: config.task_timeout_duration()?,
        };
        let retry = RetryPolicy::new(config.retry.to_retry_config())
            .with_time_source(Arc::clone(&context.time_source));
        Ok(Self::from_parts(config, poll_interval, timeouts, remote, context, retry, watermarks))
    }

    /// Replace the retry policy (custom predicate or schedule).
    ///
    /// Backoff sleeps follow the context's time source. Only takes effect
    /// before [`start()`](Self::start).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        match Arc::get_mut(&mut self.inner) {
            Some(inner) => {
                inner.retry = retry.with_time_source(Arc::clone(&inner.context.time_source));
            }
            None => warn!("Retry policy not replaced: processor already started"),
        }
        self
    }

    fn from_parts(
        config: ProcessorConfig,
        poll_interval: Duration,
        timeouts: Timeouts,
        remote: Arc<dyn RemoteAdminClient>,
        context: ProcessorContext,
        retry: RetryPolicy,
        watermarks: Watermarks,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let inner = ProcessorInner {
            source_cluster: config.source_cluster,
            current_cluster: config.current_cluster,
            poll_interval,
            fetch_timeout: timeouts.fetch,
            task_timeout: timeouts.task,
            remote,
            context,
            retry,
            progress: Mutex::new(Progress { watermarks, ..Progress::default() }),
            cycle_lock: Mutex::new(()),
        };
        Self {
            inner: Arc::new(inner),
            state: AtomicU8::new(ProcessorState::Created as u8),
            shutdown_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn source_cluster(&self) -> &str {
        &self.inner.source_cluster
    }

    pub fn current_cluster(&self) -> &str {
        &self.inner.current_cluster
    }

    pub fn state(&self) -> ProcessorState {
        ProcessorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == ProcessorState::Running
    }

    /// Consistent snapshot of both watermarks.
    pub async fn watermarks(&self) -> Watermarks {
        self.inner.progress.lock().await.watermarks
    }

    /// Health snapshot. No I/O.
    ///
    /// Watermarks, last outcome and last fetch time always come from the
    /// same finished cycle.
    pub async fn status(&self) -> ProcessorStatus {
        let progress = *self.inner.progress.lock().await;
        ProcessorStatus {
            source_cluster: self.inner.source_cluster.clone(),
            state: self.state(),
            watermarks: progress.watermarks,
            last_cycle: progress.last_cycle,
            last_fetch_success: progress.last_fetch_success,
        }
    }

    /// Spawn the poll loop.
    ///
    /// No-op unless the processor is in `Created`; calling it twice, or
    /// after [`stop()`](Self::stop), leaves exactly zero or one loop running.
    pub async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if self
            .state
            .compare_exchange(
                ProcessorState::Created as u8,
                ProcessorState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            debug!(
                source_cluster = %self.inner.source_cluster,
                state = %self.state(),
                "Start ignored, processor not in Created state"
            );
            return;
        }

        let inner = Arc::clone(&self.inner);
        let shutdown_rx = self.shutdown_tx.subscribe();
        *handle = Some(tokio::spawn(run_loop(inner, shutdown_rx)));

        metrics::set_processor_state(&self.inner.source_cluster, "Running");
        info!(
            source_cluster = %self.inner.source_cluster,
            current_cluster = %self.inner.current_cluster,
            poll_interval_ms = self.inner.poll_interval.as_millis() as u64,
            "Domain replication processor started"
        );
    }

    /// Stop the poll loop and wait for it to exit.
    ///
    /// An in-flight cycle is allowed to finish. Safe to call more than once
    /// and before `start()`; concurrent callers all wait for the exit.
    pub async fn stop(&self) {
        let mut handle = self.handle.lock().await;
        let previous = ProcessorState::from_u8(
            self.state.swap(ProcessorState::Stopped as u8, Ordering::SeqCst),
        );
        if previous == ProcessorState::Stopped {
            return;
        }

        let _ = self.shutdown_tx.send(true);

        if let Some(task) = handle.take() {
            if let Err(e) = task.await {
                warn!(source_cluster = %self.inner.source_cluster, error = %e, "Poll loop panicked");
            }
        }

        metrics::set_processor_state(&self.inner.source_cluster, "Stopped");
        info!(source_cluster = %self.inner.source_cluster, "Domain replication processor stopped");
    }

    /// Run one fetch-and-dispatch cycle now.
    ///
    /// Waits for an in-flight loop cycle first; cycles never overlap.
    pub async fn fetch_domain_replication_tasks(&self) -> CycleOutcome {
        self.inner.fetch_domain_replication_tasks().await
    }

    /// Apply one domain task through the executor (no retry, no DLQ).
    pub async fn handle_domain_replication_task(&self, task: &ReplicationTask) -> Result<()> {
        self.inner.handle_domain_replication_task(task).await
    }

    /// Quarantine one task. Tasks without domain attributes are rejected
    /// locally and never reach the queue.
    pub async fn put_domain_replication_task_to_dlq(&self, task: &ReplicationTask) -> Result<()> {
        self.inner.put_domain_replication_task_to_dlq(task).await
    }
}

/// Poll loop: one cycle per tick until shutdown.
async fn run_loop(inner: Arc<ProcessorInner>, mut shutdown_rx: watch::Receiver<bool>) {
    let span = info_span!("domain_replication", source_cluster = %inner.source_cluster);

    async move {
        let mut ticker = inner.context.time_source.new_ticker(inner.poll_interval);
        debug!("Poll loop running");

        loop {
            tokio::select! {
                biased;

                // Priority: check shutdown first
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                    let outcome = inner.fetch_domain_replication_tasks().await;
                    debug!(outcome = outcome.label(), "Cycle finished");
                }
            }
        }

        debug!("Poll loop exited");
    }
    .instrument(span)
    .await
}
