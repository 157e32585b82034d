use crate::IdScheme;
use fabric_remoting::SerializationProvider;
use serde::{Deserialize, Serialize};

/// Whether request arguments travel as one envelope value or one named value
/// per argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyWrapMode {
    #[default]
    Wrapped,
    Unwrapped,
}

/// Wire-generation settings shared by proxies and endpoints.
///
/// The id scheme and the body wrap mode are independent; any combination is
/// valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemotingSettings {
    /// Scheme proxies use to address interfaces and methods.
    pub id_scheme: IdScheme,

    /// Schemes an endpoint registers every interface under. Listing both lets
    /// one endpoint serve clients of either wire generation.
    pub accepted_id_schemes: Vec<IdScheme>,

    pub body_wrap_mode: BodyWrapMode,

    pub serialization: SerializationProvider,
}

impl Default for RemotingSettings {
    fn default() -> Self {
        Self {
            id_scheme: IdScheme::Crc64,
            accepted_id_schemes: vec![IdScheme::Crc64],
            body_wrap_mode: BodyWrapMode::Wrapped,
            serialization: SerializationProvider::default(),
        }
    }
}

impl RemotingSettings {
    /// The older wire generation: legacy ids with unwrapped bodies.
    pub fn legacy() -> Self {
        Self {
            id_scheme: IdScheme::Legacy,
            accepted_id_schemes: vec![IdScheme::Legacy],
            body_wrap_mode: BodyWrapMode::Unwrapped,
            serialization: SerializationProvider::default(),
        }
    }

    pub fn with_id_scheme(mut self, id_scheme: IdScheme) -> Self {
        self.id_scheme = id_scheme;
        self
    }

    pub fn with_accepted_id_schemes(mut self, schemes: impl IntoIterator<Item = IdScheme>) -> Self {
        self.accepted_id_schemes = schemes.into_iter().collect();
        self
    }

    pub fn with_body_wrap_mode(mut self, body_wrap_mode: BodyWrapMode) -> Self {
        self.body_wrap_mode = body_wrap_mode;
        self
    }

    pub fn with_serialization(mut self, serialization: SerializationProvider) -> Self {
        self.serialization = serialization;
        self
    }

    /// Reads settings from JSON; missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// The schemes an endpoint registers under, never empty.
    pub fn endpoint_id_schemes(&self) -> Vec<IdScheme> {
        if self.accepted_id_schemes.is_empty() {
            return vec![self.id_scheme];
        }
        let mut schemes = Vec::with_capacity(self.accepted_id_schemes.len());
        for scheme in &self.accepted_id_schemes {
            if !schemes.contains(scheme) {
                schemes.push(*scheme);
            }
        }
        schemes
    }
}
