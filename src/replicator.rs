// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Multi-cluster domain replicator.
//!
//! Owns one [`DomainReplicationProcessor`] per enabled remote cluster and
//! fans lifecycle calls out to all of them.
//!
//! ```text
//!                     ┌──────────────────────────────┐
//!   ReplicatorConfig ─►          Replicator           │
//!                     │  ┌────────────────────────┐  │
//!                     │  │ processor: "cluster-a" │──┼──► remote a
//!                     │  ├────────────────────────┤  │
//!                     │  │ processor: "cluster-b" │──┼──► remote b
//!                     │  └────────────────────────┘  │
//!                     └──────────────────────────────┘
//! ```

use crate::config::ReplicatorConfig;
use crate::error::{ReplicationError, Result};
use crate::processor::{DomainReplicationProcessor, ProcessorContext, ProcessorStatus};
use crate::remote::RemoteAdminClient;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::info;

/// Domain replication against every remote cluster.
pub struct Replicator {
    current_cluster: String,
    processors: BTreeMap<String, DomainReplicationProcessor>,
}

impl Replicator {
    /// Build one processor per enabled remote cluster.
    ///
    /// Every remote cluster needs an entry in `clients`; a missing client is
    /// a `Config` error. Clients for unknown or disabled clusters are ignored.
    pub fn new(
        config: ReplicatorConfig,
        mut clients: HashMap<String, Arc<dyn RemoteAdminClient>>,
        context: ProcessorContext,
    ) -> Result<Self> {
        if config.current_cluster.is_empty() {
            return Err(ReplicationError::Config("current_cluster must not be empty".to_string()));
        }

        let mut processors = BTreeMap::new();
        for cluster in config.remote_clusters() {
            if processors.contains_key(&cluster.name) {
                return Err(ReplicationError::Config(format!(
                    "cluster '{}' listed more than once",
                    cluster.name
                )));
            }
            let remote = clients.remove(&cluster.name).ok_or_else(|| {
                ReplicationError::Config(format!("no admin client for cluster '{}'", cluster.name))
            })?;
            let processor = DomainReplicationProcessor::new(
                config.processor_config(&cluster.name),
                remote,
                context.clone(),
            )?;
            processors.insert(cluster.name.clone(), processor);
        }

        Ok(Self {
            current_cluster: config.current_cluster,
            processors,
        })
    }

    pub fn current_cluster(&self) -> &str {
        &self.current_cluster
    }

    /// Source clusters being replicated, sorted.
    pub fn source_clusters(&self) -> impl Iterator<Item = &str> {
        self.processors.keys().map(String::as_str)
    }

    pub fn processor(&self, source_cluster: &str) -> Option<&DomainReplicationProcessor> {
        self.processors.get(source_cluster)
    }

    pub async fn start(&self) {
        for processor in self.processors.values() {
            processor.start().await;
        }
        info!(
            current_cluster = %self.current_cluster,
            processor_count = self.processors.len(),
            "Domain replicator started"
        );
    }

    /// Stop every processor. Returns once all poll loops have exited.
    pub async fn stop(&self) {
        for processor in self.processors.values() {
            processor.stop().await;
        }
        info!(current_cluster = %self.current_cluster, "Domain replicator stopped");
    }

    /// Per-cluster status, sorted by source cluster.
    pub async fn status(&self) -> Vec<ProcessorStatus> {
        let mut statuses = Vec::with_capacity(self.processors.len());
        for processor in self.processors.values() {
            statuses.push(processor.status().await);
        }
        statuses
    }
}
