use serde::{Deserialize, Serialize};
use std::fmt;

/// Selects one partition of a partitioned service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServicePartitionKey {
    /// The service has exactly one partition.
    Singleton,
    /// Uniform int64 range partitioning.
    Int64(i64),
    /// Named partitioning.
    Named(String),
}

impl fmt::Display for ServicePartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServicePartitionKey::Singleton => write!(f, "singleton"),
            ServicePartitionKey::Int64(key) => write!(f, "int64:{key}"),
            ServicePartitionKey::Named(name) => write!(f, "named:{name}"),
        }
    }
}
