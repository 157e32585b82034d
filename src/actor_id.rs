use crate::ServicePartitionKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use xxhash_rust::xxh3::xxh3_64;

/// Identity of a single actor instance.
///
/// Actors are placed on int64-range partitions; the partition key is derived
/// from the id so that every proxy for the same actor lands on the same
/// partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActorId {
    Long(i64),
    Guid(Uuid),
    Str(String),
}

impl ActorId {
    pub fn new_long(id: i64) -> Self {
        ActorId::Long(id)
    }

    pub fn new_string(id: impl Into<String>) -> Self {
        ActorId::Str(id.into())
    }

    /// Creates a fresh random (v4) guid id.
    pub fn random() -> Self {
        ActorId::Guid(Uuid::new_v4())
    }

    pub fn partition_key(&self) -> ServicePartitionKey {
        let key = match self {
            ActorId::Long(id) => *id,
            ActorId::Guid(guid) => {
                let (high, low) = guid.as_u64_pair();
                (high ^ low) as i64
            }
            ActorId::Str(id) => xxh3_64(id.as_bytes()) as i64,
        };

        ServicePartitionKey::Int64(key)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorId::Long(id) => write!(f, "{id}"),
            ActorId::Guid(guid) => write!(f, "{guid}"),
            ActorId::Str(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for ActorId {
    fn from(id: i64) -> Self {
        ActorId::Long(id)
    }
}

impl From<Uuid> for ActorId {
    fn from(id: Uuid) -> Self {
        ActorId::Guid(id)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> Self {
        ActorId::Str(id.to_string())
    }
}
