//! Configuration for the domain replicator.
//!
//! Configuration can be constructed programmatically or deserialized from
//! YAML/JSON. Durations are humantime strings (`"1s"`, `"500ms"`, `"2m"`).
//!
//! # Quick Start
//!
//! ```rust
//! use domain_replicator::config::ProcessorConfig;
//!
//! let config = ProcessorConfig {
//!     source_cluster: "active".into(),
//!     current_cluster: "standby".into(),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicatorConfig
//! ├── current_cluster: String      # This cluster's name
//! ├── clusters: Vec<ClusterConfig> # Remote clusters to pull from
//! ├── poll_interval: "1s"
//! ├── fetch_timeout: "10s"
//! ├── task_timeout: "10s"
//! └── retry: RetrySettings         # Backoff for remote calls
//!
//! ProcessorConfig                  # One per source cluster, derived from above
//! ├── source_cluster / current_cluster
//! ├── poll_interval / fetch_timeout / task_timeout
//! └── retry: RetrySettings
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! current_cluster: "standby"
//! poll_interval: "1s"
//! clusters:
//!   - name: "active"
//!   - name: "archive"
//!     enabled: false
//! retry:
//!   max_attempts: 5
//!   initial_delay_ms: 50
//! ```

use crate::error::{ReplicationError, Result};
use crate::resilience::RetryConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// ProcessorConfig: one replication stream
// ═══════════════════════════════════════════════════════════════════════════════

/// Settings for a single source-cluster processor.
///
/// Immutable once handed to
/// [`DomainReplicationProcessor::new()`](crate::processor::DomainReplicationProcessor::new),
/// which validates it and fails fast on errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Cluster we pull domain changes from.
    pub source_cluster: String,

    /// Cluster this processor runs in. Sent to the source so it knows who is polling.
    pub current_cluster: String,

    /// How often to poll the source cluster.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Deadline for one fetch (all retry attempts included).
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,

    /// Deadline for applying one task, and separately for quarantining it
    /// (all retry attempts included).
    #[serde(default = "default_task_timeout")]
    pub task_timeout: String,

    #[serde(default)]
    pub retry: RetrySettings,
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_fetch_timeout() -> String {
    "10s".to_string()
}

fn default_task_timeout() -> String {
    "10s".to_string()
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            source_cluster: String::new(),
            current_cluster: String::new(),
            poll_interval: default_poll_interval(),
            fetch_timeout: default_fetch_timeout(),
            task_timeout: default_task_timeout(),
            retry: RetrySettings::default(),
        }
    }
}

impl ProcessorConfig {
    /// Config with tight timings for tests: 1ms polls, a single attempt.
    pub fn for_testing(source_cluster: &str, current_cluster: &str) -> Self {
        Self {
            source_cluster: source_cluster.to_string(),
            current_cluster: current_cluster.to_string(),
            poll_interval: "1ms".to_string(),
            fetch_timeout: "1s".to_string(),
            task_timeout: "1s".to_string(),
            retry: RetrySettings::single_attempt(),
        }
    }

    /// Parsed poll interval.
    pub fn poll_interval_duration(&self) -> Result<Duration> {
        parse_positive_duration("poll_interval", &self.poll_interval)
    }

    /// Parsed fetch deadline.
    pub fn fetch_timeout_duration(&self) -> Result<Duration> {
        parse_positive_duration("fetch_timeout", &self.fetch_timeout)
    }

    /// Parsed per-task deadline for the executor and DLQ calls.
    pub fn task_timeout_duration(&self) -> Result<Duration> {
        parse_positive_duration("task_timeout", &self.task_timeout)
    }

    /// Check every field. Called by the processor constructor.
    pub fn validate(&self) -> Result<()> {
        if self.source_cluster.trim().is_empty() {
            return Err(ReplicationError::Config("source_cluster is empty".to_string()));
        }
        if self.current_cluster.trim().is_empty() {
            return Err(ReplicationError::Config("current_cluster is empty".to_string()));
        }
        if self.source_cluster == self.current_cluster {
            return Err(ReplicationError::Config(format!(
                "source_cluster and current_cluster are both '{}'",
                self.source_cluster
            )));
        }
        self.poll_interval_duration()?;
        self.fetch_timeout_duration()?;
        self.task_timeout_duration()?;
        self.retry.validate()
    }
}

fn parse_positive_duration(field: &str, value: &str) -> Result<Duration> {
    let duration = humantime::parse_duration(value)
        .map_err(|e| ReplicationError::Config(format!("{} '{}': {}", field, value, e)))?;
    if duration.is_zero() {
        return Err(ReplicationError::Config(format!("{} must be greater than zero", field)));
    }
    Ok(duration)
}

// ═══════════════════════════════════════════════════════════════════════════════
// RetrySettings: serializable form of RetryConfig
// ═══════════════════════════════════════════════════════════════════════════════

/// Retry settings for calls to the remote cluster, executor and DLQ.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_max_attempts() -> usize {
    3
}

fn default_initial_delay_ms() -> u64 {
    50
}

fn default_max_delay_ms() -> u64 {
    1_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 1_000,
            backoff_factor: 2.0,
        }
    }
}

impl RetrySettings {
    /// One attempt, no backoff.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 0,
            max_delay_ms: 0,
            backoff_factor: 1.0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ReplicationError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ReplicationError::Config(format!(
                "retry.backoff_factor must be >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(ReplicationError::Config(
                "retry.initial_delay_ms exceeds retry.max_delay_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Convert to the runtime [`RetryConfig`].
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            backoff_factor: self.backoff_factor,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ReplicatorConfig: every remote cluster
// ═══════════════════════════════════════════════════════════════════════════════

/// A remote cluster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Top-level config for [`Replicator`](crate::replicator::Replicator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicatorConfig {
    pub current_cluster: String,

    /// Every cluster in the deployment. The current cluster may be listed; it is skipped.
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,

    #[serde(default = "default_task_timeout")]
    pub task_timeout: String,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl ReplicatorConfig {
    /// Enabled clusters other than the current one.
    pub fn remote_clusters(&self) -> impl Iterator<Item = &ClusterConfig> {
        self.clusters
            .iter()
            .filter(move |c| c.enabled && c.name != self.current_cluster)
    }

    /// Per-cluster processor config.
    pub fn processor_config(&self, source_cluster: &str) -> ProcessorConfig {
        ProcessorConfig {
            source_cluster: source_cluster.to_string(),
            current_cluster: self.current_cluster.clone(),
            poll_interval: self.poll_interval.clone(),
            fetch_timeout: self.fetch_timeout.clone(),
            task_timeout: self.task_timeout.clone(),
            retry: self.retry.clone(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
