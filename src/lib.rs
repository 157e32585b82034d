//! Wire-level building blocks shared by every fabric remoting crate: message
//! headers, request/response bodies, result statuses, the exception envelope,
//! codecs, actor/partition addressing, and the transport boundary traits.

pub mod actor_id;
pub mod codec;
pub mod constants;
pub mod message;
pub mod partition_key;
pub mod transport;
pub mod utils;

pub use actor_id::ActorId;
pub use codec::{CodecError, CodecKind, SerializationProvider};
pub use message::*;
pub use partition_key::ServicePartitionKey;
pub use transport::*;
