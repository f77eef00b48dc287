// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the domain replicator.
//!
//! Errors are categorized by where they came from (remote cluster, task
//! executor, dead-letter queue, membership) and carry enough context to
//! debug a stalled replication stream from the logs alone.
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `Remote` | Depends | Remote admin call failed (`transient` flag decides) |
//! | `ServiceBusy` | Yes | Remote cluster shed load |
//! | `Timeout` | Yes | Fetch, apply or DLQ write exceeded its deadline |
//! | `TaskExecution` | Yes | Applying a domain task locally failed |
//! | `Dlq` | Yes | Dead-letter queue write failed |
//! | `BadRequest` | No | Remote rejected the request as invalid |
//! | `MalformedTask` | No | Task is missing required attributes |
//! | `Membership` | No | Owner lookup failed (cycle is skipped instead) |
//! | `Config` | No | Configuration invalid |
//! | `InvalidState` | No | Lifecycle state machine violation |
//! | `Shutdown` | No | Processor is shutting down |
//! | `Internal` | No | Unexpected internal error |
//!
//! # Retry Behavior
//!
//! [`ReplicationError::is_retryable()`] is the default predicate of
//! [`RetryPolicy`](crate::resilience::RetryPolicy).

use std::time::Duration;
use thiserror::Error;

/// Result type alias for replication operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Errors that can occur during domain replication.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplicationError {
    /// Remote admin call failure.
    ///
    /// `transient` is set by the transport when it knows the failure was a
    /// network blip (connection reset, unavailable).
    #[error("Remote error ({operation}): {message}")]
    Remote {
        operation: String,
        message: String,
        transient: bool,
    },

    /// Remote cluster is overloaded.
    #[error("Remote service busy: {0}")]
    ServiceBusy(String),

    /// A fetch, task apply or DLQ write did not finish within its deadline.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Remote rejected the request; retrying the same request cannot help.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The task executor failed to apply a domain task.
    #[error("Task execution error (domain {domain_id}): {message}")]
    TaskExecution { domain_id: String, message: String },

    /// Writing to the dead-letter queue failed.
    #[error("DLQ error: {0}")]
    Dlq(String),

    /// The task does not carry the payload its type requires.
    ///
    /// Indicates a data-quality defect in the remote stream.
    #[error("Malformed replication task: {0}")]
    MalformedTask(String),

    /// Membership lookup failure.
    #[error("Membership lookup error ({key}): {message}")]
    Membership { key: String, message: String },

    /// Invalid or missing configuration.
    ///
    /// Raised during construction, before any background work starts.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lifecycle state machine violation.
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState { expected: String, actual: String },

    /// Shutdown in progress.
    #[error("Shutdown in progress")]
    Shutdown,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ReplicationError {
    /// Create a transient remote error.
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
            transient: true,
        }
    }

    /// Create a remote error that should not be retried.
    pub fn remote_permanent(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            operation: operation.into(),
            message: message.into(),
            transient: false,
        }
    }

    /// Create a task execution error for a domain.
    pub fn task_execution(domain_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TaskExecution {
            domain_id: domain_id.into(),
            message: message.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { transient, .. } => *transient,
            Self::ServiceBusy(_) => true,
            Self::Timeout(_) => true,
            Self::TaskExecution { .. } => true,
            Self::Dlq(_) => true,
            Self::BadRequest(_) => false,
            Self::MalformedTask(_) => false, // Data defect at the source
            Self::Membership { .. } => false,
            Self::Config(_) => false,
            Self::InvalidState { .. } => false,
            Self::Shutdown => false,
            Self::Internal(_) => false,
        }
    }

    /// Short label used for the `error_type` metric dimension.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Remote { .. } => "remote",
            Self::ServiceBusy(_) => "service_busy",
            Self::Timeout(_) => "timeout",
            Self::BadRequest(_) => "bad_request",
            Self::TaskExecution { .. } => "task_execution",
            Self::Dlq(_) => "dlq",
            Self::MalformedTask(_) => "malformed_task",
            Self::Membership { .. } => "membership",
            Self::Config(_) => "config",
            Self::InvalidState { .. } => "invalid_state",
            Self::Shutdown => "shutdown",
            Self::Internal(_) => "internal",
        }
    }
}
