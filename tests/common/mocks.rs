//! Recording fakes for every processor capability.
//!
//! Each fake records the calls it receives and can be told to fail, so
//! tests can assert exactly what the processor did.

use domain_replicator::dlq::DlqMessage;
use domain_replicator::{
    BoxFuture, DomainReplicationQueue, DomainTaskAttributes, DomainTaskExecutor,
    GetDomainReplicationMessagesRequest, GetDomainReplicationMessagesResponse, HostInfo,
    MembershipResolver, RemoteAdminClient, ReplicationError, ReplicationMessages,
    ReplicationTask, Result, Service,
};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

// =============================================================================
// Remote admin client
// =============================================================================

/// Remote cluster that replays scripted responses.
///
/// Once the script runs out it answers with an empty batch at the
/// requested watermark.
///
/// # Example
/// ```rust,ignore
/// let remote = ScriptedRemote::new();
/// remote.push_messages(1000, vec![task_a, task_b]).await;
/// remote.push_error(ReplicationError::remote("get", "reset")).await;
///
/// // ... run cycles ...
///
/// let requests = remote.requests().await;
/// assert_eq!(requests[0].last_retrieved_message_id, -1);
/// ```
#[derive(Default)]
pub struct ScriptedRemote {
    script: Mutex<VecDeque<Result<ReplicationMessages>>>,
    requests: Mutex<Vec<GetDomainReplicationMessagesRequest>>,
    delay_ms: AtomicU64,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_messages(&self, last_retrieved_message_id: i64, tasks: Vec<ReplicationTask>) {
        self.script.lock().await.push_back(Ok(ReplicationMessages {
            replication_tasks: tasks,
            last_retrieved_message_id,
            has_more: false,
        }));
    }

    pub async fn push_error(&self, error: ReplicationError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Answer every request `delay` after recording it (real time).
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms.store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub async fn requests(&self) -> Vec<GetDomainReplicationMessagesRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl RemoteAdminClient for ScriptedRemote {
    fn get_domain_replication_messages(
        &self,
        request: GetDomainReplicationMessagesRequest,
    ) -> BoxFuture<'_, GetDomainReplicationMessagesResponse> {
        Box::pin(async move {
            self.requests.lock().await.push(request.clone());
            let delay = self.delay_ms.load(Ordering::SeqCst);
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            let next = self.script.lock().await.pop_front();
            match next {
                Some(Ok(messages)) => Ok(GetDomainReplicationMessagesResponse { messages }),
                Some(Err(e)) => Err(e),
                None => {
                    let mut response = GetDomainReplicationMessagesResponse::default();
                    response.messages.last_retrieved_message_id = request.last_retrieved_message_id;
                    Ok(response)
                }
            }
        })
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Executor that records every domain id it is asked to apply.
#[derive(Default)]
pub struct RecordingExecutor {
    executed: Mutex<Vec<String>>,
    fail_all: AtomicBool,
    hang: AtomicBool,
    failing: Mutex<HashSet<String>>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every execution fail.
    pub fn fail_all(&self) {
        self.fail_all.store(true, Ordering::SeqCst);
    }

    /// Record every execution, then never answer.
    pub fn hang_all(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    /// Make executions of `domain_id` fail.
    pub async fn fail_domain(&self, domain_id: &str) {
        self.failing.lock().await.insert(domain_id.to_string());
    }

    pub async fn executed(&self) -> Vec<String> {
        self.executed.lock().await.clone()
    }
}

impl DomainTaskExecutor for RecordingExecutor {
    fn execute(&self, attributes: &DomainTaskAttributes) -> BoxFuture<'_, ()> {
        let domain_id = attributes.id.clone();
        Box::pin(async move {
            self.executed.lock().await.push(domain_id.clone());
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail_all.load(Ordering::SeqCst) || self.failing.lock().await.contains(&domain_id) {
                return Err(ReplicationError::task_execution(domain_id, "simulated failure"));
            }
            Ok(())
        })
    }
}

// =============================================================================
// DLQ
// =============================================================================

/// DLQ that records publishes.
#[derive(Default)]
pub struct RecordingQueue {
    published: Mutex<Vec<ReplicationTask>>,
    fail: AtomicBool,
    hang: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every publish fail.
    pub fn fail_publishes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Record every publish, then never acknowledge it.
    pub fn hang_publishes(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }

    pub async fn published(&self) -> Vec<ReplicationTask> {
        self.published.lock().await.clone()
    }
}

impl DomainReplicationQueue for RecordingQueue {
    fn publish_to_dlq(&self, task: ReplicationTask) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            // Count attempts, successful or not
            self.published.lock().await.push(task);
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ReplicationError::Dlq("simulated failure".to_string()));
            }
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
            let published = self.published.lock().await;
            Ok(published
                .iter()
                .enumerate()
                .map(|(i, task)| DlqMessage { id: i as i64, task: task.clone() })
                .filter(|m| m.id > after_id && m.id <= last_id)
                .take(page_size)
                .collect())
        })
    }

    fn range_delete_from_dlq(&self, _after_id: i64, _last_id: i64) -> BoxFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn dlq_size(&self) -> BoxFuture<'_, u64> {
        Box::pin(async move { Ok(self.published.lock().await.len() as u64) })
    }
}

// =============================================================================
// Membership
// =============================================================================

/// Resolver that always answers with one owner and counts lookups.
pub struct CountingResolver {
    owner: HostInfo,
    lookups: AtomicUsize,
    fail: AtomicBool,
}

impl CountingResolver {
    pub fn new(owner: HostInfo) -> Self {
        Self {
            owner,
            lookups: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail_lookups(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl MembershipResolver for CountingResolver {
    fn lookup(&self, service: Service, key: &str) -> Result<HostInfo> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        assert_eq!(service, Service::Worker);
        if self.fail.load(Ordering::SeqCst) {
            return Err(ReplicationError::Membership {
                key: key.to_string(),
                message: "ring not ready".to_string(),
            });
        }
        Ok(self.owner.clone())
    }
}
