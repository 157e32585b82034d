use crate::{CodecError, CodecKind};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fmt;

/// Codec used for exception payloads, independent of the body codec so that
/// faults stay readable across serialization settings.
pub const EXCEPTION_PAYLOAD_CODEC: CodecKind = CodecKind::Json;

/// An error type that can travel from a handler to a caller and be rebuilt
/// there as the same type.
pub trait RemoteExceptionType:
    std::error::Error + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Stable name used to find the reconstructor on the calling side.
    const TYPE_NAME: &'static str;
}

/// Serializable description of an application fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionInformation {
    pub type_name: String,
    pub message: String,
    /// The fault itself, encoded with [`EXCEPTION_PAYLOAD_CODEC`] when the
    /// type could be serialized.
    pub payload: Option<Vec<u8>>,
    pub inner: Option<Box<ExceptionInformation>>,
}

impl ExceptionInformation {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            payload: None,
            inner: None,
        }
    }

    pub fn from_exception<E: RemoteExceptionType>(exception: &E) -> Self {
        let mut information = Self::new(E::TYPE_NAME, exception.to_string());
        match EXCEPTION_PAYLOAD_CODEC.encode(exception) {
            Ok(payload) => information.payload = Some(payload),
            Err(err) => {
                tracing::debug!(
                    "Sending {} without payload; encoding failed: {}",
                    E::TYPE_NAME,
                    err
                );
            }
        }
        information
    }

    pub fn with_inner(mut self, inner: ExceptionInformation) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Rebuilds the typed exception from the payload, if there is one.
    pub fn decode_payload<E: RemoteExceptionType>(&self) -> Option<Result<E, CodecError>> {
        self.payload
            .as_deref()
            .map(|payload| EXCEPTION_PAYLOAD_CODEC.decode::<E>(payload))
    }

    pub fn encode(&self, codec: CodecKind) -> Result<Vec<u8>, CodecError> {
        codec.encode(self)
    }

    pub fn decode(bytes: &[u8], codec: CodecKind) -> Result<Self, CodecError> {
        codec.decode(bytes)
    }
}

impl fmt::Display for ExceptionInformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.message)
    }
}

/// Failure returned by a remoted method handler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplicationFault {
    #[error("{0}")]
    Exception(ExceptionInformation),

    /// The handler observed its cancellation token and gave up.
    #[error("operation was canceled")]
    Canceled,
}

impl ApplicationFault {
    /// A fault with no typed payload.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        ApplicationFault::Exception(ExceptionInformation::new(type_name, message))
    }

    pub fn from_exception<E: RemoteExceptionType>(exception: &E) -> Self {
        ApplicationFault::Exception(ExceptionInformation::from_exception(exception))
    }
}
