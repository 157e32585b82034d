mod transport_error;
mod transport_traits;

pub use transport_error::{TransportError, TransportErrorKind};
pub use transport_traits::{
    RemotingCallbackClient, RemotingClientFactory, RemotingListener, RemotingMessageHandler,
    RemotingTransportClient, RequestContext,
};
