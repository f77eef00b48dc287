//! # Domain Replicator
//!
//! Pull-based replication of domain (namespace) metadata between clusters.
//!
//! ## Architecture
//!
//! Each standby cluster runs one processor per remote cluster. A processor
//! periodically asks the remote cluster for domain change-events after its
//! watermark, applies them locally in order, and quarantines the ones it
//! cannot apply:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          domain-replicator                           │
//! │                                                                      │
//! │  ┌────────────┐   ┌──────────────────┐   ┌────────────────────────┐  │
//! │  │ Replicator │──►│ Processor        │──►│ DomainTaskExecutor     │  │
//! │  │ (per host) │   │ (per source)     │   │ (apply locally)        │  │
//! │  └────────────┘   └──────────────────┘   └────────────────────────┘  │
//! │                      │          │                   │ failure        │
//! │                      ▼          ▼                   ▼                │
//! │       ┌────────────────────┐ ┌──────────────┐ ┌──────────────────┐   │
//! │       │ MembershipResolver │ │ RemoteAdmin  │ │ ReplicationQueue │   │
//! │       │ (owner check)      │ │ (fetch)      │ │ (DLQ)            │   │
//! │       └────────────────────┘ └──────────────┘ └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every external collaborator is a trait injected as `Arc<dyn Trait>`, so
//! the crate carries no transport or storage of its own.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use domain_replicator::{
//!     DomainReplicationProcessor, HostInfo, InMemoryReplicationQueue, NoOpTaskExecutor,
//!     ProcessorConfig, ProcessorContext, RealTimeSource, RemoteAdminClient,
//!     StaticMembershipResolver,
//! };
//! use std::sync::Arc;
//!
//! # async fn example(remote: Arc<dyn RemoteAdminClient>) -> domain_replicator::Result<()> {
//! let host = HostInfo::new("worker-1", "10.0.0.1:7933");
//! let context = ProcessorContext {
//!     executor: Arc::new(NoOpTaskExecutor),
//!     queue: Arc::new(InMemoryReplicationQueue::new()),
//!     resolver: Arc::new(StaticMembershipResolver::single_host(host.clone())),
//!     time_source: Arc::new(RealTimeSource),
//!     host_info: host,
//! };
//!
//! let processor = DomainReplicationProcessor::new(
//!     ProcessorConfig::for_testing("active", "standby"),
//!     remote,
//!     context,
//! )?;
//! processor.start().await;
//! // ...
//! processor.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod dlq;
pub mod error;
pub mod executor;
pub mod membership;
pub mod metrics;
pub mod processor;
pub mod remote;
pub mod replicator;
pub mod resilience;
pub mod types;

use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by the capability traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

// Re-exports for convenience
pub use clock::{MockedTimeSource, RealTimeSource, Ticker, TimeSource};
pub use config::{ClusterConfig, ProcessorConfig, ReplicatorConfig, RetrySettings};
pub use dlq::{DlqHandler, DlqMessage, DomainReplicationQueue, InMemoryReplicationQueue, MergeResult};
pub use error::{ReplicationError, Result};
pub use executor::{DomainTaskExecutor, NoOpTaskExecutor};
pub use membership::{HostInfo, MembershipResolver, Service, StaticMembershipResolver};
pub use processor::{
    CycleOutcome, CycleStats, DomainReplicationProcessor, ProcessorContext, ProcessorState,
    ProcessorStatus, SkipReason, Watermarks,
};
pub use remote::RemoteAdminClient;
pub use replicator::Replicator;
pub use resilience::{RetryConfig, RetryPolicy};
pub use types::{
    DomainOperation, DomainTaskAttributes, GetDomainReplicationMessagesRequest,
    GetDomainReplicationMessagesResponse, ReplicationMessages, ReplicationTask,
    ReplicationTaskType, EMPTY_MESSAGE_ID,
};
