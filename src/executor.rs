// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Local application of domain replication tasks.
//!
//! The executor owns the business logic of turning a
//! [`DomainTaskAttributes`] into metadata-store writes. It must be
//! idempotent: the processor delivers at least once, so the same task can
//! arrive again after an aborted cycle or a DLQ merge.

use crate::types::DomainTaskAttributes;
use crate::BoxFuture;

/// Applies one domain change to local state.
pub trait DomainTaskExecutor: Send + Sync + 'static {
    fn execute(&self, attributes: &DomainTaskAttributes) -> BoxFuture<'_, ()>;
}

/// A no-op executor for standalone mode.
///
/// Logs the change but doesn't apply anything.
#[derive(Debug, Clone, Default)]
pub struct NoOpTaskExecutor;

impl DomainTaskExecutor for NoOpTaskExecutor {
    fn execute(&self, attributes: &DomainTaskAttributes) -> BoxFuture<'_, ()> {
        let domain_id = attributes.id.clone();
        let domain_name = attributes.domain_name().to_string();
        let operation = attributes.domain_operation;
        Box::pin(async move {
            tracing::debug!(
                domain_id = %domain_id,
                domain_name = %domain_name,
                operation = ?operation,
                "NoOp: would apply domain task"
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_executor_succeeds() {
        let executor = NoOpTaskExecutor;
        let attrs = DomainTaskAttributes::update("d-1");
        assert!(executor.execute(&attrs).await.is_ok());
    }

    #[tokio::test]
    async fn test_noop_executor_is_repeatable() {
        let executor = NoOpTaskExecutor;
        let attrs = DomainTaskAttributes::update("d-1");
        for _ in 0..3 {
            assert!(executor.execute(&attrs).await.is_ok());
        }
    }
}
