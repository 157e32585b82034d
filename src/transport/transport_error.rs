use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Nothing is listening at the address.
    EndpointUnreachable,
    /// The connection broke while a call was in flight.
    ConnectionFaulted,
    /// The client or listener was closed locally.
    ObjectClosed,
    /// No response arrived within the request timeout.
    Timeout,
    /// The encoded message exceeds the transport's size limit.
    MessageTooLarge,
    /// A frame could not be encoded or decoded.
    Protocol,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransportErrorKind::EndpointUnreachable => "endpoint unreachable",
            TransportErrorKind::ConnectionFaulted => "connection faulted",
            TransportErrorKind::ObjectClosed => "object closed",
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::MessageTooLarge => "message too large",
            TransportErrorKind::Protocol => "protocol error",
        };
        f.write_str(label)
    }
}

/// Failure reported by a transport client, callback client or listener.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn endpoint_unreachable(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::EndpointUnreachable, message)
    }

    pub fn connection_faulted(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ConnectionFaulted, message)
    }

    pub fn object_closed(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::ObjectClosed, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.kind == TransportErrorKind::Timeout
    }
}
