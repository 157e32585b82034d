use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Errors raised while turning typed values into bytes or back.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    #[error("failed to decode {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },

    #[error("expected {expected} argument names, found {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("argument '{name}' is missing from the request body")]
    MissingArgument { name: String },
}

/// A serialization format used for request bodies, response bodies or
/// message headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CodecKind {
    /// Compact binary encoding (`bitcode` over serde).
    #[default]
    Bitcode,
    /// Self-describing JSON; slower, but readable and tolerant of schema drift.
    Json,
}

impl CodecKind {
    pub fn encode<T>(self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = match self {
            CodecKind::Bitcode => bitcode::serialize(value).map_err(|e| e.to_string()),
            CodecKind::Json => serde_json::to_vec(value).map_err(|e| e.to_string()),
        };

        encoded.map_err(|reason| CodecError::Encode {
            type_name: std::any::type_name::<T>(),
            reason,
        })
    }

    pub fn decode<T>(self, bytes: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        let decoded = match self {
            CodecKind::Bitcode => bitcode::deserialize::<T>(bytes).map_err(|e| e.to_string()),
            CodecKind::Json => serde_json::from_slice::<T>(bytes).map_err(|e| e.to_string()),
        };

        decoded.map_err(|reason| CodecError::Decode {
            type_name: std::any::type_name::<T>(),
            reason,
        })
    }
}

/// Chooses a codec per message part.
///
/// Both sides of a connection must agree on the provider; the default uses
/// `bitcode` everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SerializationProvider {
    pub request: CodecKind,
    pub response: CodecKind,
    pub header: CodecKind,
}

impl SerializationProvider {
    /// Uses the same codec for every message part.
    pub fn uniform(codec: CodecKind) -> Self {
        Self {
            request: codec,
            response: codec,
            header: codec,
        }
    }
}
