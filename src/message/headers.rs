use crate::{
    ActorId, CodecError, CodecKind, RemotingResultStatus,
    constants::{CANCELLATION_HEADER_NAME, SUBSCRIPTION_ID_HEADER_NAME},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("header '{0}' is already present")]
    Duplicate(String),
}

/// Addressing and metadata sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotingMessageHeaders {
    pub interface_id: i32,
    pub method_id: i32,

    /// Opaque logical call context propagated from the caller.
    pub call_context: Option<String>,

    /// Set only for calls that can be canceled; correlates a later
    /// cancellation request with the in-flight call.
    pub invocation_id: Option<String>,

    /// Target actor, for actor interfaces.
    pub actor_id: Option<ActorId>,

    headers: BTreeMap<String, Vec<u8>>,
}

impl RemotingMessageHeaders {
    pub fn new(interface_id: i32, method_id: i32) -> Self {
        Self {
            interface_id,
            method_id,
            call_context: None,
            invocation_id: None,
            actor_id: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_call_context(mut self, call_context: Option<String>) -> Self {
        self.call_context = call_context;
        self
    }

    pub fn with_invocation_id(mut self, invocation_id: Option<String>) -> Self {
        self.invocation_id = invocation_id;
        self
    }

    pub fn with_actor_id(mut self, actor_id: Option<ActorId>) -> Self {
        self.actor_id = actor_id;
        self
    }

    /// Marks the message as an event for the given subscription, replacing
    /// any subscription id already present.
    pub fn with_subscription_id(mut self, subscription_id: Uuid) -> Self {
        self.headers.insert(
            SUBSCRIPTION_ID_HEADER_NAME.to_string(),
            subscription_id.as_bytes().to_vec(),
        );
        self
    }

    /// The subscription an event message is addressed to, if the header is
    /// present and well formed.
    pub fn subscription_id(&self) -> Option<Uuid> {
        self.try_get_header(SUBSCRIPTION_ID_HEADER_NAME)
            .and_then(|bytes| Uuid::from_slice(bytes).ok())
    }

    pub fn add_header(&mut self, name: &str, value: Vec<u8>) -> Result<(), HeaderError> {
        if self.headers.contains_key(name) {
            return Err(HeaderError::Duplicate(name.to_string()));
        }
        self.headers.insert(name.to_string(), value);
        Ok(())
    }

    pub fn try_get_header(&self, name: &str) -> Option<&[u8]> {
        self.headers.get(name).map(Vec::as_slice)
    }

    pub fn remove_header(&mut self, name: &str) -> Option<Vec<u8>> {
        self.headers.remove(name)
    }

    pub fn header_names(&self) -> impl Iterator<Item = &str> {
        self.headers.keys().map(String::as_str)
    }

    /// Copies the addressing of a call and marks the copy as a cancellation
    /// signal for it.
    pub fn to_cancellation_request(&self) -> Self {
        let mut headers = Self::new(self.interface_id, self.method_id)
            .with_call_context(self.call_context.clone())
            .with_invocation_id(self.invocation_id.clone())
            .with_actor_id(self.actor_id.clone());
        headers
            .headers
            .insert(CANCELLATION_HEADER_NAME.to_string(), Vec::new());
        headers
    }

    #[inline]
    pub fn is_cancellation_request(&self) -> bool {
        self.headers.contains_key(CANCELLATION_HEADER_NAME)
    }

    pub fn encode(&self, codec: CodecKind) -> Result<Vec<u8>, CodecError> {
        codec.encode(self)
    }

    pub fn decode(bytes: &[u8], codec: CodecKind) -> Result<Self, CodecError> {
        codec.decode(bytes)
    }
}

/// Metadata sent back with every response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotingResponseHeaders {
    pub status: RemotingResultStatus,
    pub invocation_id: Option<String>,
}

impl RemotingResponseHeaders {
    pub fn new(status: RemotingResultStatus) -> Self {
        Self {
            status,
            invocation_id: None,
        }
    }

    pub fn encode(&self, codec: CodecKind) -> Result<Vec<u8>, CodecError> {
        codec.encode(self)
    }

    pub fn decode(bytes: &[u8], codec: CodecKind) -> Result<Self, CodecError> {
        codec.decode(bytes)
    }
}
