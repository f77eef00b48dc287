//! Cluster membership: who owns which replication stream.
//!
//! Every worker host runs a processor per source cluster, but only the host
//! the membership ring assigns to that source cluster actually polls. The
//! ring itself lives outside this crate; we only consume lookups through
//! [`MembershipResolver`].
//!
//! During ring reconfiguration two hosts may briefly both believe they own a
//! stream. That costs duplicate fetches, not correctness: the executor
//! applies domain changes behind a version check.

use crate::error::{ReplicationError, Result};
use std::collections::HashMap;

/// Services of the control plane that participate in membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Frontend,
    History,
    Matching,
    Worker,
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Service::Frontend => write!(f, "frontend"),
            Service::History => write!(f, "history"),
            Service::Matching => write!(f, "matching"),
            Service::Worker => write!(f, "worker"),
        }
    }
}

/// A member of the ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostInfo {
    identity: String,
    address: String,
}

impl HostInfo {
    pub fn new(identity: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            address: address.into(),
        }
    }

    /// Stable identity used for ownership comparison.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

/// Resolves the owner of a key within a service's ring.
pub trait MembershipResolver: Send + Sync + 'static {
    fn lookup(&self, service: Service, key: &str) -> Result<HostInfo>;
}

/// Fixed owner table.
///
/// Useful for single-host deployments (set a default owner) and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMembershipResolver {
    owners: HashMap<(Service, String), HostInfo>,
    default_owner: Option<HostInfo>,
}

impl StaticMembershipResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver that returns `host` for every lookup.
    pub fn single_host(host: HostInfo) -> Self {
        Self {
            owners: HashMap::new(),
            default_owner: Some(host),
        }
    }

    /// Assign `key` in `service` to `host`.
    pub fn with_owner(mut self, service: Service, key: impl Into<String>, host: HostInfo) -> Self {
        self.owners.insert((service, key.into()), host);
        self
    }
}

impl MembershipResolver for StaticMembershipResolver {
    fn lookup(&self, service: Service, key: &str) -> Result<HostInfo> {
        self.owners
            .get(&(service, key.to_string()))
            .or(self.default_owner.as_ref())
            .cloned()
            .ok_or_else(|| ReplicationError::Membership {
                key: key.to_string(),
                message: format!("no owner for key in {} ring", service),
            })
    }
}
