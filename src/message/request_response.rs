use crate::{RemotingMessageHeaders, RemotingResponseHeaders, RemotingResultStatus};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A request as it crosses the transport boundary: decoded headers plus the
/// still-encoded body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotingRequest {
    pub headers: RemotingMessageHeaders,
    pub body: Vec<u8>,
}

impl RemotingRequest {
    pub fn new(headers: RemotingMessageHeaders, body: Vec<u8>) -> Self {
        Self { headers, body }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotingResponse {
    pub headers: RemotingResponseHeaders,
    pub body: Vec<u8>,
}

impl RemotingResponse {
    pub fn new(status: RemotingResultStatus, body: Vec<u8>) -> Self {
        Self {
            headers: RemotingResponseHeaders::new(status),
            body,
        }
    }

    pub fn success(body: Vec<u8>) -> Self {
        Self::new(RemotingResultStatus::Success, body)
    }

    /// A non-application failure; the message travels as UTF-8 in the body.
    pub fn fault(status: RemotingResultStatus, message: impl Into<String>) -> Self {
        Self::new(status, message.into().into_bytes())
    }

    #[inline]
    pub fn status(&self) -> RemotingResultStatus {
        self.headers.status
    }

    /// Reads the body of a fault response as text.
    pub fn fault_message(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Body of a subscribe/unsubscribe control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSubscriptionRequest {
    pub event_interface_id: i32,
    pub subscription_id: Uuid,
}
