use dashmap::DashMap;
use fabric_remoting::ServicePartitionKey;
use rand::seq::IndexedRandom;
use std::fmt;

/// Name of a service, e.g. `fabric:/App/Store`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceUri(String);

impl ServiceUri {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceUri {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

impl From<String> for ServiceUri {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReplicaRole {
    Primary,
    ActiveSecondary,
    /// Instance of a stateless service.
    Stateless,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub role: ReplicaRole,
    pub address: String,
}

impl ResolvedEndpoint {
    pub fn new(role: ReplicaRole, address: impl Into<String>) -> Self {
        Self {
            role,
            address: address.into(),
        }
    }
}

/// Where one partition can currently be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPartition {
    pub service_uri: ServiceUri,
    pub partition_key: ServicePartitionKey,
    pub endpoints: Vec<ResolvedEndpoint>,
    /// Increases every time the partition's endpoints change.
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("service {service_uri} has no partition {partition_key}")]
    NotFound {
        service_uri: String,
        partition_key: String,
    },

    #[error("no endpoint of {service_uri} matches {selector:?}")]
    NoMatchingEndpoint {
        service_uri: String,
        selector: TargetReplicaSelector,
    },

    /// The resolver could not answer right now; worth retrying.
    #[error("transient resolution failure: {0}")]
    Transient(String),
}

/// Maps a service name and partition key to the partition's endpoints.
#[async_trait::async_trait]
pub trait PartitionResolver: Send + Sync {
    async fn resolve(
        &self,
        service_uri: &ServiceUri,
        partition_key: &ServicePartitionKey,
    ) -> Result<ResolvedPartition, ResolveError>;

    /// Resolves again after `previous` turned out to be stale.
    async fn re_resolve(
        &self,
        previous: &ResolvedPartition,
    ) -> Result<ResolvedPartition, ResolveError> {
        self.resolve(&previous.service_uri, &previous.partition_key)
            .await
    }
}

/// Which replica of a partition a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TargetReplicaSelector {
    /// The primary when there is one, otherwise any replica.
    #[default]
    Default,
    PrimaryReplica,
    RandomSecondaryReplica,
    RandomReplica,
}

impl TargetReplicaSelector {
    pub fn select<'p>(
        &self,
        partition: &'p ResolvedPartition,
    ) -> Result<&'p ResolvedEndpoint, ResolveError> {
        let endpoints = &partition.endpoints;
        let primary = || {
            endpoints
                .iter()
                .find(|endpoint| endpoint.role == ReplicaRole::Primary)
        };
        let mut rng = rand::rng();

        let selected = match self {
            TargetReplicaSelector::Default => primary().or_else(|| endpoints.choose(&mut rng)),
            TargetReplicaSelector::PrimaryReplica => primary(),
            TargetReplicaSelector::RandomSecondaryReplica => {
                let secondaries: Vec<&ResolvedEndpoint> = endpoints
                    .iter()
                    .filter(|endpoint| endpoint.role == ReplicaRole::ActiveSecondary)
                    .collect();
                secondaries.choose(&mut rng).copied()
            }
            TargetReplicaSelector::RandomReplica => endpoints.choose(&mut rng),
        };

        selected.ok_or_else(|| ResolveError::NoMatchingEndpoint {
            service_uri: partition.service_uri.to_string(),
            selector: *self,
        })
    }
}

/// Resolves partitions from a table kept up to date by the host.
#[derive(Default)]
pub struct StaticPartitionResolver {
    partitions: DashMap<(ServiceUri, ServicePartitionKey), ResolvedPartition>,
}

impl StaticPartitionResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes (or replaces) the endpoints of a partition.
    pub fn register(
        &self,
        service_uri: impl Into<ServiceUri>,
        partition_key: ServicePartitionKey,
        endpoints: Vec<ResolvedEndpoint>,
    ) {
        let service_uri = service_uri.into();
        let key = (service_uri.clone(), partition_key.clone());
        let mut entry = self.partitions.entry(key).or_insert_with(|| ResolvedPartition {
            service_uri,
            partition_key,
            endpoints: Vec::new(),
            version: 0,
        });
        entry.endpoints = endpoints;
        entry.version += 1;
    }

    pub fn unregister(&self, service_uri: &ServiceUri, partition_key: &ServicePartitionKey) -> bool {
        self.partitions
            .remove(&(service_uri.clone(), partition_key.clone()))
            .is_some()
    }
}

#[async_trait::async_trait]
impl PartitionResolver for StaticPartitionResolver {
    async fn resolve(
        &self,
        service_uri: &ServiceUri,
        partition_key: &ServicePartitionKey,
    ) -> Result<ResolvedPartition, ResolveError> {
        self.partitions
            .get(&(service_uri.clone(), partition_key.clone()))
            .map(|partition| partition.value().clone())
            .ok_or_else(|| ResolveError::NotFound {
                service_uri: service_uri.to_string(),
                partition_key: partition_key.to_string(),
            })
    }
}
