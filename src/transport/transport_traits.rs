use crate::{RemotingRequest, RemotingResponse, TransportError};
use std::sync::Arc;

/// Client half of a transport, bound to one resolved endpoint.
#[async_trait::async_trait]
pub trait RemotingTransportClient: Send + Sync {
    async fn request_response(
        &self,
        request: RemotingRequest,
    ) -> Result<RemotingResponse, TransportError>;

    async fn send_one_way(&self, request: RemotingRequest) -> Result<(), TransportError>;

    /// Address this client is connected to.
    fn endpoint(&self) -> &str;
}

/// Creates transport clients for resolved endpoint addresses.
#[async_trait::async_trait]
pub trait RemotingClientFactory: Send + Sync {
    async fn create_client(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn RemotingTransportClient>, TransportError>;
}

/// Server-to-client channel of one connection, used for one-way event
/// delivery.
#[async_trait::async_trait]
pub trait RemotingCallbackClient: Send + Sync {
    async fn send_one_way(&self, request: RemotingRequest) -> Result<(), TransportError>;

    fn is_connected(&self) -> bool;
}

/// Per-request information a transport hands to the message handler.
#[derive(Clone, Default)]
pub struct RequestContext {
    /// Channel back to the caller, when the transport supports callbacks.
    pub callback: Option<Arc<dyn RemotingCallbackClient>>,
    pub peer_address: Option<String>,
}

impl RequestContext {
    pub fn new(
        callback: Option<Arc<dyn RemotingCallbackClient>>,
        peer_address: Option<String>,
    ) -> Self {
        Self {
            callback,
            peer_address,
        }
    }
}

/// Receives requests from a transport. Implemented by server endpoints and by
/// the client-side event subscription manager.
#[async_trait::async_trait]
pub trait RemotingMessageHandler: Send + Sync {
    async fn handle_request_response(
        &self,
        context: RequestContext,
        request: RemotingRequest,
    ) -> RemotingResponse;

    async fn handle_one_way(&self, context: RequestContext, request: RemotingRequest);
}

/// Server lifecycle hooks invoked by the hosting runtime.
#[async_trait::async_trait]
pub trait RemotingListener: Send + Sync {
    /// Starts accepting connections and returns the published address.
    async fn open(&self) -> Result<String, TransportError>;

    /// Stops accepting connections and lets in-flight requests finish.
    async fn close(&self) -> Result<(), TransportError>;

    /// Drops every connection immediately.
    fn abort(&self);
}
