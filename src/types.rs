// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Wire-level types exchanged with the remote cluster.
//!
//! A [`ReplicationTask`] is a tagged record: the `task_type` says which of
//! the optional attribute payloads is meaningful. The domain replicator only
//! ever looks at [`ReplicationTaskType::Domain`] tasks; every other type
//! belongs to history replication and is skipped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Watermark value meaning "nothing retrieved yet".
pub const EMPTY_MESSAGE_ID: i64 = -1;

/// Type tag of a replication task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationTaskType {
    Domain,
    History,
    SyncShardStatus,
    SyncActivity,
    HistoryMetadata,
    HistoryV2,
    FailoverMarker,
}

impl std::fmt::Display for ReplicationTaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Domain => "domain",
            Self::History => "history",
            Self::SyncShardStatus => "sync_shard_status",
            Self::SyncActivity => "sync_activity",
            Self::HistoryMetadata => "history_metadata",
            Self::HistoryV2 => "history_v2",
            Self::FailoverMarker => "failover_marker",
        };
        write!(f, "{}", name)
    }
}

/// Kind of change a domain task describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainOperation {
    Create,
    Update,
}

/// Registration status of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DomainStatus {
    #[default]
    Registered,
    Deprecated,
    Deleted,
}

/// Descriptive part of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DomainInfo {
    pub name: String,
    #[serde(default)]
    pub status: DomainStatus,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default)]
    pub data: HashMap<String, String>,
}

/// Tunables of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DomainConfiguration {
    pub retention_days: i32,
    #[serde(default)]
    pub emit_metric: bool,
}

/// Which clusters a domain lives in and which one is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DomainReplicationConfiguration {
    pub active_cluster_name: String,
    #[serde(default)]
    pub clusters: Vec<String>,
}

/// Payload of a domain replication task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTaskAttributes {
    pub domain_operation: DomainOperation,
    /// Domain id (UUID string).
    pub id: String,
    #[serde(default)]
    pub info: Option<DomainInfo>,
    #[serde(default)]
    pub config: Option<DomainConfiguration>,
    #[serde(default)]
    pub replication_config: Option<DomainReplicationConfiguration>,
    #[serde(default)]
    pub config_version: i64,
    #[serde(default)]
    pub failover_version: i64,
    #[serde(default)]
    pub previous_failover_version: i64,
}

impl DomainTaskAttributes {
    /// Minimal update attributes for a domain id.
    pub fn update(id: impl Into<String>) -> Self {
        Self {
            domain_operation: DomainOperation::Update,
            id: id.into(),
            info: None,
            config: None,
            replication_config: None,
            config_version: 0,
            failover_version: 0,
            previous_failover_version: 0,
        }
    }

    /// Domain name, or `""` when the task carries no info block.
    pub fn domain_name(&self) -> &str {
        self.info.as_ref().map(|i| i.name.as_str()).unwrap_or("")
    }
}

/// One ordered change-event from the remote cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationTask {
    pub task_type: ReplicationTaskType,
    /// Position of this task in the source cluster's replication queue.
    #[serde(default)]
    pub source_task_id: i64,
    #[serde(default)]
    pub domain_task_attributes: Option<DomainTaskAttributes>,
    /// Unix nanos when the source enqueued the task.
    #[serde(default)]
    pub creation_time: Option<i64>,
}

impl ReplicationTask {
    /// Build a domain task carrying `attributes`.
    pub fn domain(source_task_id: i64, attributes: DomainTaskAttributes) -> Self {
        Self {
            task_type: ReplicationTaskType::Domain,
            source_task_id,
            domain_task_attributes: Some(attributes),
            creation_time: None,
        }
    }

    pub fn is_domain(&self) -> bool {
        self.task_type == ReplicationTaskType::Domain
    }
}

/// Request for the next page of domain replication messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetDomainReplicationMessagesRequest {
    pub last_retrieved_message_id: i64,
    pub last_processed_message_id: i64,
    /// Name of the cluster doing the polling.
    pub cluster_name: String,
}

/// A batch of replication tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReplicationMessages {
    #[serde(default)]
    pub replication_tasks: Vec<ReplicationTask>,
    /// Position of the last task in the batch.
    #[serde(default)]
    pub last_retrieved_message_id: i64,
    #[serde(default)]
    pub has_more: bool,
}

/// Response to [`GetDomainReplicationMessagesRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GetDomainReplicationMessagesResponse {
    pub messages: ReplicationMessages,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_task_constructor() {
        let task = ReplicationTask::domain(7, DomainTaskAttributes::update("d-1"));
        assert!(task.is_domain());
        assert_eq!(task.source_task_id, 7);
        assert_eq!(task.domain_task_attributes.unwrap().id, "d-1");
    }

    #[test]
    fn test_domain_name_without_info() {
        let attrs = DomainTaskAttributes::update("d-1");
        assert_eq!(attrs.domain_name(), "");
    }

    #[test]
    fn test_task_type_display() {
        assert_eq!(ReplicationTaskType::Domain.to_string(), "domain");
        assert_eq!(ReplicationTaskType::HistoryV2.to_string(), "history_v2");
    }

    #[test]
    fn test_task_deserializes_with_defaults() {
        let json = r#"{"task_type": "history"}"#;
        let task: ReplicationTask = serde_json::from_str(json).unwrap();
        assert!(!task.is_domain());
        assert_eq!(task.source_task_id, 0);
        assert!(task.domain_task_attributes.is_none());
    }

    #[test]
    fn test_domain_attributes_from_json() {
        let json = r#"{
            "domain_operation": "create",
            "id": "5c5a0b3e",
            "info": {"name": "orders"},
            "replication_config": {"active_cluster_name": "active", "clusters": ["active", "standby"]},
            "failover_version": 10
        }"#;
        let attrs: DomainTaskAttributes = serde_json::from_str(json).unwrap();
        assert_eq!(attrs.domain_operation, DomainOperation::Create);
        assert_eq!(attrs.domain_name(), "orders");
        assert_eq!(attrs.info.unwrap().status, DomainStatus::Registered);
        assert_eq!(attrs.replication_config.unwrap().clusters.len(), 2);
        assert_eq!(attrs.failover_version, 10);
    }
}
