// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Remote cluster admin client.
//!
//! The transport (RPC framework, serialization, auth) is supplied by the
//! service embedding this crate. We only need one call from it.
//!
//! # Example
//!
//! ```rust,no_run
//! use domain_replicator::remote::RemoteAdminClient;
//! use domain_replicator::types::{
//!     GetDomainReplicationMessagesRequest, GetDomainReplicationMessagesResponse,
//! };
//! use domain_replicator::BoxFuture;
//!
//! struct EmptySource;
//!
//! impl RemoteAdminClient for EmptySource {
//!     fn get_domain_replication_messages(
//!         &self,
//!         request: GetDomainReplicationMessagesRequest,
//!     ) -> BoxFuture<'_, GetDomainReplicationMessagesResponse> {
//!         Box::pin(async move {
//!             let mut response = GetDomainReplicationMessagesResponse::default();
//!             response.messages.last_retrieved_message_id = request.last_retrieved_message_id;
//!             Ok(response)
//!         })
//!     }
//! }
//! ```

use crate::types::{GetDomainReplicationMessagesRequest, GetDomainReplicationMessagesResponse};
use crate::BoxFuture;

/// Admin API of a remote cluster, as far as domain replication needs it.
pub trait RemoteAdminClient: Send + Sync + 'static {
    /// Fetch domain replication tasks strictly after
    /// `request.last_retrieved_message_id`.
    ///
    /// Errors should be mapped onto [`ReplicationError`](crate::ReplicationError)
    /// so the retry policy can tell transient failures (`Remote { transient:
    /// true }`, `ServiceBusy`, `Timeout`) from permanent ones (`BadRequest`).
    fn get_domain_replication_messages(
        &self,
        request: GetDomainReplicationMessagesRequest,
    ) -> BoxFuture<'_, GetDomainReplicationMessagesResponse>;
}
