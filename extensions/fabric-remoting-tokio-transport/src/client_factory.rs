use crate::{TransportSettings, WsRemotingClient};
use dashmap::DashMap;
use fabric_remoting::{
    RemotingClientFactory, RemotingMessageHandler, RemotingTransportClient, TransportError,
};
use std::sync::Arc;

/// Creates [`WsRemotingClient`]s, keeping one open connection per endpoint.
pub struct WsClientFactory {
    settings: TransportSettings,
    callback: Option<Arc<dyn RemotingMessageHandler>>,
    clients: DashMap<String, Arc<WsRemotingClient>>,
}

impl WsClientFactory {
    pub fn new(settings: TransportSettings) -> Self {
        Self {
            settings,
            callback: None,
            clients: DashMap::new(),
        }
    }

    /// Receives the one-way messages listeners send back, such as actor
    /// events.
    pub fn with_callback_handler(mut self, handler: Arc<dyn RemotingMessageHandler>) -> Self {
        self.callback = Some(handler);
        self
    }

    pub fn connection_count(&self) -> usize {
        self.clients
            .iter()
            .filter(|client| client.value().is_connected())
            .count()
    }

    pub fn close_all(&self) {
        for client in self.clients.iter() {
            client.value().close();
        }
        self.clients.clear();
    }
}

#[async_trait::async_trait]
impl RemotingClientFactory for WsClientFactory {
    async fn create_client(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn RemotingTransportClient>, TransportError> {
        let cached = self
            .clients
            .get(endpoint)
            .map(|client| client.value().clone());
        if let Some(client) = cached {
            if client.is_connected() {
                return Ok(client);
            }
        }

        let client = Arc::new(
            WsRemotingClient::connect(endpoint, self.settings.clone(), self.callback.clone())
                .await?,
        );
        self.clients.insert(endpoint.to_string(), client.clone());
        Ok(client)
    }
}
