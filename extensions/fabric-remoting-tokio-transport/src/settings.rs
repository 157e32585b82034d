use fabric_remoting::{
    SerializationProvider,
    constants::{
        DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_TRANSPORT_CHANNEL_BUFFER_SIZE,
    },
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Route the listener serves WebSocket upgrades on.
pub const WS_ROUTE: &str = "/ws";

/// The interval at which the listener pings idle connections.
const DEFAULT_HEARTBEAT_INTERVAL_SECS: u64 = 5;

/// How long the listener waits for any message (including a pong) before it
/// drops a connection.
const DEFAULT_CLIENT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// How long a client waits for a response before failing the request
    /// with a timeout.
    pub request_timeout: Duration,

    /// Frames larger than this are rejected on send and dropped on receive.
    pub max_message_size: usize,

    /// Outbound frames queued per connection before senders wait.
    pub channel_buffer_size: usize,

    pub heartbeat_interval: Duration,

    pub client_timeout: Duration,

    /// Codec of the message headers inside each frame.
    pub serialization: SerializationProvider,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            channel_buffer_size: DEFAULT_TRANSPORT_CHANNEL_BUFFER_SIZE,
            heartbeat_interval: Duration::from_secs(DEFAULT_HEARTBEAT_INTERVAL_SECS),
            client_timeout: Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS),
            serialization: SerializationProvider::default(),
        }
    }
}

impl TransportSettings {
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn with_heartbeat(mut self, interval: Duration, client_timeout: Duration) -> Self {
        self.heartbeat_interval = interval;
        self.client_timeout = client_timeout;
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
}
