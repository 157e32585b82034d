use crate::{
    ExceptionHandler, OperationRetrySettings, PartitionResolver, RemotingError,
    ResolvedPartition, RetryDecision, ServiceUri, TargetReplicaSelector,
};
use fabric_remoting::{
    RemotingClientFactory, RemotingRequest, RemotingResponse, RemotingResultStatus,
    RemotingTransportClient, ServicePartitionKey,
};
use std::{future::Future, sync::Arc};
use tokio::sync::Mutex;

enum ClientState {
    Unresolved,
    Ready {
        partition: ResolvedPartition,
        client: Arc<dyn RemotingTransportClient>,
    },
    /// The last resolution led to a failing endpoint; resolve again before
    /// the next attempt.
    Stale { partition: ResolvedPartition },
}

/// Sends requests to one partition of a service, re-resolving the partition
/// and retrying when the exception handlers say so.
pub struct PartitionClient {
    service_uri: ServiceUri,
    partition_key: ServicePartitionKey,
    selector: TargetReplicaSelector,
    resolver: Arc<dyn PartitionResolver>,
    client_factory: Arc<dyn RemotingClientFactory>,
    retry_settings: OperationRetrySettings,
    handlers: Vec<Arc<dyn ExceptionHandler>>,
    state: Mutex<ClientState>,
}

impl PartitionClient {
    pub fn new(
        service_uri: ServiceUri,
        partition_key: ServicePartitionKey,
        resolver: Arc<dyn PartitionResolver>,
        client_factory: Arc<dyn RemotingClientFactory>,
    ) -> Self {
        Self {
            service_uri,
            partition_key,
            selector: TargetReplicaSelector::default(),
            resolver,
            client_factory,
            retry_settings: OperationRetrySettings::default(),
            handlers: Vec::new(),
            state: Mutex::new(ClientState::Unresolved),
        }
    }

    pub fn with_selector(mut self, selector: TargetReplicaSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_retry_settings(mut self, retry_settings: OperationRetrySettings) -> Self {
        self.retry_settings = retry_settings;
        self
    }

    /// Handlers are consulted in order; the first that claims an error decides.
    pub fn with_exception_handlers(mut self, handlers: Vec<Arc<dyn ExceptionHandler>>) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn service_uri(&self) -> &ServiceUri {
        &self.service_uri
    }

    pub fn partition_key(&self) -> &ServicePartitionKey {
        &self.partition_key
    }

    /// The partition the client is currently bound to, if any.
    pub async fn resolved_partition(&self) -> Option<ResolvedPartition> {
        match &*self.state.lock().await {
            ClientState::Ready { partition, .. } | ClientState::Stale { partition } => {
                Some(partition.clone())
            }
            ClientState::Unresolved => None,
        }
    }

    /// Sends `request` and waits for the response.
    ///
    /// System faults and dispatch misses are reported as errors so the
    /// handlers can classify them. Application faults and canceled calls
    /// come back as responses.
    pub async fn request_response(
        &self,
        request: RemotingRequest,
    ) -> Result<RemotingResponse, RemotingError> {
        let interface_id = request.headers.interface_id;
        let method_id = request.headers.method_id;
        self.invoke_with_retry(|client| {
            let request = request.clone();
            async move {
                let response = client.request_response(request).await?;
                check_response_status(interface_id, method_id, response)
            }
        })
        .await
    }

    pub async fn send_one_way(&self, request: RemotingRequest) -> Result<(), RemotingError> {
        self.invoke_with_retry(|client| {
            let request = request.clone();
            async move { Ok(client.send_one_way(request).await?) }
        })
        .await
    }

    async fn invoke_with_retry<T, F, Fut>(&self, operation: F) -> Result<T, RemotingError>
    where
        F: Fn(Arc<dyn RemotingTransportClient>) -> Fut,
        Fut: Future<Output = Result<T, RemotingError>>,
    {
        let mut retries = 0u32;
        loop {
            let (client, err) = match self.acquire_client().await {
                Ok(client) => match operation(client.clone()).await {
                    Ok(value) => return Ok(value),
                    Err(err) => (Some(client), err),
                },
                Err(err) => (None, err),
            };

            let decision = self.classify(&err);
            let RetryDecision::Retry { re_resolve, delay } = decision else {
                return Err(err);
            };

            if retries >= self.retry_settings.max_retry_count {
                tracing::warn!(
                    "Giving up on {} after {} retries: {}",
                    self.service_uri,
                    retries,
                    err
                );
                return Err(err);
            }
            retries += 1;

            tracing::warn!(
                "Call to {} failed, retry {} of {} in {:?}: {}",
                self.service_uri,
                retries,
                self.retry_settings.max_retry_count,
                delay,
                err
            );

            if re_resolve {
                self.invalidate(client.as_ref()).await;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    fn classify(&self, err: &RemotingError) -> RetryDecision {
        self.handlers
            .iter()
            .find_map(|handler| handler.handle(err, &self.retry_settings))
            .unwrap_or(RetryDecision::Throw)
    }

    async fn acquire_client(&self) -> Result<Arc<dyn RemotingTransportClient>, RemotingError> {
        let mut state = self.state.lock().await;

        let partition = match &*state {
            ClientState::Ready { client, .. } => return Ok(client.clone()),
            ClientState::Unresolved => {
                self.resolver
                    .resolve(&self.service_uri, &self.partition_key)
                    .await?
            }
            ClientState::Stale { partition } => self.resolver.re_resolve(partition).await?,
        };

        let endpoint = self.selector.select(&partition)?;
        tracing::debug!(
            "Resolved {} ({}) to {} (version {})",
            self.service_uri,
            self.partition_key,
            endpoint.address,
            partition.version
        );
        let client = self.client_factory.create_client(&endpoint.address).await?;

        *state = ClientState::Ready {
            partition,
            client: client.clone(),
        };
        Ok(client)
    }

    /// Marks the current resolution stale, unless another caller already
    /// replaced the client that failed.
    async fn invalidate(&self, failed: Option<&Arc<dyn RemotingTransportClient>>) {
        let mut state = self.state.lock().await;
        let ClientState::Ready { partition, client } = &*state else {
            return;
        };
        if let Some(failed) = failed {
            if !Arc::ptr_eq(client, failed) {
                return;
            }
        }
        let partition = partition.clone();
        *state = ClientState::Stale { partition };
    }
}

fn check_response_status(
    interface_id: i32,
    method_id: i32,
    response: RemotingResponse,
) -> Result<RemotingResponse, RemotingError> {
    match response.status() {
        RemotingResultStatus::Success
        | RemotingResultStatus::ApplicationFault
        | RemotingResultStatus::Canceled => Ok(response),
        RemotingResultStatus::SystemFault => {
            Err(RemotingError::SystemFault(response.fault_message()))
        }
        RemotingResultStatus::InterfaceNotFound => Err(RemotingError::InterfaceNotFound {
            interface_id,
            message: response.fault_message(),
        }),
        RemotingResultStatus::MethodNotFound => Err(RemotingError::MethodNotFound {
            interface_id,
            method_id,
            message: response.fault_message(),
        }),
    }
}
