use crate::{CodecError, CodecKind};
use serde::{Deserialize, Serialize};

/// A single serialized argument of an unwrapped body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedArgument {
    pub name: String,
    pub value: Vec<u8>,
}

impl NamedArgument {
    pub fn new(name: impl Into<String>, value: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// The argument payload of a request.
///
/// Wrapped bodies carry the whole argument list as one envelope value; this
/// is the compact, newer format. Unwrapped bodies carry one named value per
/// argument, which is what the older wire generation speaks. Endpoints accept
/// either form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestBody {
    Empty,
    Wrapped(Vec<u8>),
    Unwrapped(Vec<NamedArgument>),
}

impl RequestBody {
    pub fn encode(&self, codec: CodecKind) -> Result<Vec<u8>, CodecError> {
        codec.encode(self)
    }

    pub fn decode(bytes: &[u8], codec: CodecKind) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Ok(RequestBody::Empty);
        }
        codec.decode(bytes)
    }

    /// Looks up an argument of an unwrapped body by name.
    pub fn argument(&self, name: &str) -> Option<&[u8]> {
        match self {
            RequestBody::Unwrapped(arguments) => arguments
                .iter()
                .find(|argument| argument.name == name)
                .map(|argument| argument.value.as_slice()),
            _ => None,
        }
    }
}

/// The return-value payload of a successful response, mirroring the request's
/// body form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseBody {
    Empty,
    Wrapped(Vec<u8>),
    Unwrapped(NamedArgument),
}

impl ResponseBody {
    pub fn encode(&self, codec: CodecKind) -> Result<Vec<u8>, CodecError> {
        codec.encode(self)
    }

    pub fn decode(bytes: &[u8], codec: CodecKind) -> Result<Self, CodecError> {
        if bytes.is_empty() {
            return Ok(ResponseBody::Empty);
        }
        codec.decode(bytes)
    }

    /// The serialized return value, regardless of body form.
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            ResponseBody::Empty => None,
            ResponseBody::Wrapped(bytes) => Some(bytes),
            ResponseBody::Unwrapped(argument) => Some(&argument.value),
        }
    }
}
