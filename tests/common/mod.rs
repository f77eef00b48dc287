//! Shared test utilities for integration tests.
//!
//! This module provides:
//! - Recording fakes for the processor capabilities
//! - A harness wiring them into a processor on a mocked clock
//! - Task builders

#![allow(dead_code)]

pub mod mocks;

pub use mocks::*;

use domain_replicator::{
    DomainReplicationProcessor, DomainTaskAttributes, HostInfo, MockedTimeSource,
    ProcessorConfig, ProcessorContext, ReplicationTask, ReplicationTaskType, Watermarks,
};
use std::sync::Arc;
use std::time::Duration;

pub const SOURCE_CLUSTER: &str = "active";
pub const CURRENT_CLUSTER: &str = "standby";
pub const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub fn local_host() -> HostInfo {
    HostInfo::new("worker-local", "10.0.0.1:7933")
}

pub fn other_host() -> HostInfo {
    HostInfo::new("worker-other", "10.0.0.2:7933")
}

/// A processor wired to recording fakes.
pub struct Harness {
    pub processor: DomainReplicationProcessor,
    pub remote: Arc<ScriptedRemote>,
    pub executor: Arc<RecordingExecutor>,
    pub queue: Arc<RecordingQueue>,
    pub resolver: Arc<CountingResolver>,
    pub clock: Arc<MockedTimeSource>,
}

impl Harness {
    /// Processor owned by this host, starting from empty watermarks.
    pub fn new() -> Self {
        Self::build(local_host(), Watermarks::default())
    }

    /// Processor whose stream is owned by `owner`.
    pub fn owned_by(owner: HostInfo) -> Self {
        Self::build(owner, Watermarks::default())
    }

    pub fn build(owner: HostInfo, watermarks: Watermarks) -> Self {
        let remote = Arc::new(ScriptedRemote::new());
        let executor = Arc::new(RecordingExecutor::new());
        let queue = Arc::new(RecordingQueue::new());
        let resolver = Arc::new(CountingResolver::new(owner));
        let clock = Arc::new(MockedTimeSource::new());

        let context = ProcessorContext {
            executor: executor.clone(),
            queue: queue.clone(),
            resolver: resolver.clone(),
            time_source: clock.clone(),
            host_info: local_host(),
        };
        let processor = DomainReplicationProcessor::with_watermarks(
            ProcessorConfig::for_testing(SOURCE_CLUSTER, CURRENT_CLUSTER),
            remote.clone(),
            context,
            watermarks,
        )
        .expect("valid test config");

        Self {
            processor,
            remote,
            executor,
            queue,
            resolver,
            clock,
        }
    }

    /// Advance the mocked clock one period at a time until `remote` has
    /// seen at least `calls` requests. Panics after 2 seconds of real time.
    pub async fn tick_until_remote_calls(&self, calls: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while self.remote.call_count().await < calls {
            assert!(
                tokio::time::Instant::now() < deadline,
                "remote saw {} calls, wanted {}",
                self.remote.call_count().await,
                calls
            );
            self.clock.advance(POLL_INTERVAL);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

/// Domain task with a fresh random domain id.
pub fn domain_task(source_task_id: i64) -> ReplicationTask {
    ReplicationTask::domain(
        source_task_id,
        DomainTaskAttributes::update(uuid::Uuid::new_v4().to_string()),
    )
}

/// Domain-typed task with no attributes.
pub fn malformed_task(source_task_id: i64) -> ReplicationTask {
    ReplicationTask {
        task_type: ReplicationTaskType::Domain,
        source_task_id,
        domain_task_attributes: None,
        creation_time: None,
    }
}

pub fn history_task(source_task_id: i64) -> ReplicationTask {
    ReplicationTask {
        task_type: ReplicationTaskType::History,
        source_task_id,
        domain_task_attributes: None,
        creation_time: None,
    }
}

pub fn domain_id(task: &ReplicationTask) -> String {
    task.domain_task_attributes
        .as_ref()
        .map(|a| a.id.clone())
        .unwrap_or_default()
}
