use crate::ResolveError;
use fabric_remoting::{CodecError, ExceptionInformation, TransportError};
use fabric_remoting_service::ContractError;
use std::fmt;

/// Represents errors that can occur during a remoted call from the
/// perspective of the caller.
#[derive(Debug, thiserror::Error)]
pub enum RemotingError {
    /// The interface cannot be proxied.
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("partition resolution failed: {0}")]
    Resolution(#[from] ResolveError),

    /// The remote handler ran and failed. Never retried.
    #[error("remote exception: {0}")]
    Application(RemoteException),

    /// The remote endpoint failed outside of the handler.
    #[error("remote system fault: {0}")]
    SystemFault(String),

    #[error("interface {interface_id} is not implemented by the remote object")]
    InterfaceNotFound { interface_id: i32, message: String },

    #[error("method {method_id} of interface {interface_id} is not implemented by the remote object")]
    MethodNotFound {
        interface_id: i32,
        method_id: i32,
        message: String,
    },

    #[error("the call was canceled")]
    Canceled,

    /// Event subscriptions need an `EventSubscriptionManager` on the
    /// proxy factory.
    #[error("event subscriptions are not enabled on this proxy factory")]
    EventsUnavailable,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl RemotingError {
    #[inline]
    pub fn is_application_fault(&self) -> bool {
        matches!(self, RemotingError::Application(_))
    }

    #[inline]
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            RemotingError::Transport(_) | RemotingError::Resolution(_)
        )
    }

    /// The remote exception, when the call failed in the handler.
    pub fn remote_exception(&self) -> Option<&RemoteException> {
        match self {
            RemotingError::Application(exception) => Some(exception),
            _ => None,
        }
    }
}

/// An application fault raised by a remote handler.
///
/// When the fault's type was registered with the caller's
/// `ExceptionConverter`, the original typed error is available through
/// [`RemoteException::downcast_ref`]; otherwise only the name and message
/// are known.
pub struct RemoteException {
    information: ExceptionInformation,
    reconstructed: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RemoteException {
    pub fn new(
        information: ExceptionInformation,
        reconstructed: Option<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            information,
            reconstructed,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.information.type_name
    }

    pub fn message(&self) -> &str {
        &self.information.message
    }

    pub fn information(&self) -> &ExceptionInformation {
        &self.information
    }

    pub fn is_reconstructed(&self) -> bool {
        self.reconstructed.is_some()
    }

    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.reconstructed
            .as_deref()
            .and_then(|exception| exception.downcast_ref::<E>())
    }
}

impl fmt::Debug for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteException")
            .field("type_name", &self.information.type_name)
            .field("message", &self.information.message)
            .field("reconstructed", &self.reconstructed.is_some())
            .finish()
    }
}

impl fmt::Display for RemoteException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reconstructed {
            Some(exception) => write!(f, "{}: {}", self.information.type_name, exception),
            None => write!(f, "{}", self.information),
        }
    }
}

impl std::error::Error for RemoteException {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.reconstructed
            .as_deref()
            .map(|exception| exception as &(dyn std::error::Error + 'static))
    }
}
