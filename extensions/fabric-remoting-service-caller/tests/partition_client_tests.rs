use fabric_remoting::{
    ExceptionInformation, RemotingClientFactory, RemotingMessageHeaders, RemotingRequest,
    RemotingResponse, RemotingResultStatus, RemotingTransportClient, ServicePartitionKey,
    TransportError,
};
use fabric_remoting_service_caller::{
    DefaultExceptionHandler, ExceptionHandler, OperationRetrySettings, PartitionClient,
    PartitionResolver, RemotingError, ReplicaRole, ResolveError, ResolvedEndpoint,
    ResolvedPartition, RetryDecision, ServiceUri, StaticPartitionResolver,
};
use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

// --- Test Setup: Mock Implementations ---

type Outcome = Result<RemotingResponse, TransportError>;

/// A transport client that answers from a script, then with empty successes.
struct ScriptedClient {
    endpoint: String,
    script: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RemotingTransportClient for ScriptedClient {
    async fn request_response(&self, _request: RemotingRequest) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(RemotingResponse::success(Vec::new())))
    }

    async fn send_one_way(&self, _request: RemotingRequest) -> Result<(), TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Default)]
struct ScriptedFactory {
    clients: Mutex<HashMap<String, Arc<ScriptedClient>>>,
}

impl ScriptedFactory {
    fn script(&self, endpoint: &str, outcomes: Vec<Outcome>) -> Arc<ScriptedClient> {
        let client = Arc::new(ScriptedClient {
            endpoint: endpoint.to_string(),
            script: Mutex::new(outcomes.into()),
            calls: AtomicUsize::new(0),
        });
        self.clients
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), client.clone());
        client
    }
}

#[async_trait::async_trait]
impl RemotingClientFactory for ScriptedFactory {
    async fn create_client(
        &self,
        endpoint: &str,
    ) -> Result<Arc<dyn RemotingTransportClient>, TransportError> {
        match self.clients.lock().unwrap().get(endpoint) {
            Some(client) => Ok(client.clone()),
            None => Err(TransportError::endpoint_unreachable(endpoint.to_string())),
        }
    }
}

/// Moves to the next address of its list on every resolution.
struct RotatingResolver {
    addresses: Vec<&'static str>,
    resolutions: AtomicUsize,
}

impl RotatingResolver {
    fn new(addresses: Vec<&'static str>) -> Self {
        Self {
            addresses,
            resolutions: AtomicUsize::new(0),
        }
    }

    fn resolutions(&self) -> usize {
        self.resolutions.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PartitionResolver for RotatingResolver {
    async fn resolve(
        &self,
        service_uri: &ServiceUri,
        partition_key: &ServicePartitionKey,
    ) -> Result<ResolvedPartition, ResolveError> {
        let index = self.resolutions.fetch_add(1, Ordering::SeqCst);
        let address = self.addresses[index.min(self.addresses.len() - 1)];
        Ok(ResolvedPartition {
            service_uri: service_uri.clone(),
            partition_key: partition_key.clone(),
            endpoints: vec![ResolvedEndpoint::new(ReplicaRole::Primary, address)],
            version: index as u64 + 1,
        })
    }
}

/// Retries system faults once, without re-resolving.
struct RetrySystemFaultOnce {
    seen: AtomicUsize,
}

impl ExceptionHandler for RetrySystemFaultOnce {
    fn handle(
        &self,
        error: &RemotingError,
        _settings: &OperationRetrySettings,
    ) -> Option<RetryDecision> {
        match error {
            RemotingError::SystemFault(_) if self.seen.fetch_add(1, Ordering::SeqCst) == 0 => {
                Some(RetryDecision::Retry {
                    re_resolve: false,
                    delay: Duration::ZERO,
                })
            }
            _ => None,
        }
    }
}

fn no_backoff() -> OperationRetrySettings {
    OperationRetrySettings::default()
        .with_max_retry_backoff_on_transient(Duration::ZERO)
        .with_max_retry_backoff_on_non_transient(Duration::ZERO)
}

fn client(
    resolver: Arc<dyn PartitionResolver>,
    factory: Arc<ScriptedFactory>,
    retry_settings: OperationRetrySettings,
    handlers: Vec<Arc<dyn ExceptionHandler>>,
) -> PartitionClient {
    PartitionClient::new(
        ServiceUri::new("fabric:/App/Store"),
        ServicePartitionKey::Singleton,
        resolver,
        factory,
    )
    .with_retry_settings(retry_settings)
    .with_exception_handlers(handlers)
}

fn default_handlers() -> Vec<Arc<dyn ExceptionHandler>> {
    vec![Arc::new(DefaultExceptionHandler::new())]
}

fn request() -> RemotingRequest {
    RemotingRequest::new(RemotingMessageHeaders::new(1, 2), Vec::new())
}

// --- Tests ---

#[tokio::test]
async fn test_timeouts_are_retried_on_the_same_endpoint() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script(
        "a",
        vec![
            Err(TransportError::timeout("slow")),
            Err(TransportError::timeout("slow")),
        ],
    );

    let client = client(resolver.clone(), factory, no_backoff(), default_handlers());
    let response = client.request_response(request()).await.unwrap();

    assert_eq!(response.status(), RemotingResultStatus::Success);
    assert_eq!(a.calls(), 3);
    assert_eq!(resolver.resolutions(), 1);
}

#[tokio::test]
async fn test_retries_stop_at_the_configured_limit() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script(
        "a",
        (0..10).map(|_| Err(TransportError::timeout("slow"))).collect(),
    );

    let client = client(
        resolver,
        factory,
        no_backoff().with_max_retry_count(2),
        default_handlers(),
    );
    let err = client.request_response(request()).await.unwrap_err();

    assert!(matches!(err, RemotingError::Transport(ref e) if e.is_timeout()));
    assert_eq!(a.calls(), 3, "one attempt plus two retries");
}

#[tokio::test]
async fn test_zero_retry_count_makes_a_single_attempt() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script("a", vec![Err(TransportError::timeout("slow"))]);

    let client = client(
        resolver,
        factory,
        no_backoff().with_max_retry_count(0),
        default_handlers(),
    );
    assert!(client.request_response(request()).await.is_err());
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn test_connection_fault_moves_to_the_re_resolved_endpoint() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a", "b"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script(
        "a",
        vec![Err(TransportError::connection_faulted("reset"))],
    );
    let b = factory.script("b", Vec::new());

    let client = client(resolver.clone(), factory, no_backoff(), default_handlers());
    client.request_response(request()).await.unwrap();

    assert_eq!(a.calls(), 1);
    assert_eq!(b.calls(), 1);
    assert_eq!(resolver.resolutions(), 2);

    let partition = client.resolved_partition().await.unwrap();
    assert_eq!(partition.endpoints[0].address, "b");
    assert_eq!(partition.version, 2);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_re_resolved() {
    // "gone" has no client, so connecting to it fails.
    let resolver = Arc::new(RotatingResolver::new(vec!["gone", "b"]));
    let factory = Arc::new(ScriptedFactory::default());
    let b = factory.script("b", Vec::new());

    let client = client(resolver.clone(), factory, no_backoff(), default_handlers());
    client.request_response(request()).await.unwrap();

    assert_eq!(b.calls(), 1);
    assert_eq!(resolver.resolutions(), 2);
}

#[tokio::test]
async fn test_application_fault_is_returned_without_retry() {
    let information = ExceptionInformation::new("Example.Failure", "nope");
    let body = information
        .encode(fabric_remoting::CodecKind::Bitcode)
        .unwrap();

    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script(
        "a",
        vec![Ok(RemotingResponse::new(
            RemotingResultStatus::ApplicationFault,
            body,
        ))],
    );

    let client = client(resolver, factory, no_backoff(), default_handlers());
    let response = client.request_response(request()).await.unwrap();

    assert_eq!(response.status(), RemotingResultStatus::ApplicationFault);
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn test_system_fault_is_not_retried_by_default() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script(
        "a",
        vec![Ok(RemotingResponse::fault(
            RemotingResultStatus::SystemFault,
            "handler panicked",
        ))],
    );

    let client = client(resolver, factory, no_backoff(), default_handlers());
    let err = client.request_response(request()).await.unwrap_err();

    assert!(matches!(err, RemotingError::SystemFault(ref message) if message == "handler panicked"));
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn test_first_handler_in_the_chain_decides() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script(
        "a",
        vec![Ok(RemotingResponse::fault(
            RemotingResultStatus::SystemFault,
            "flaky",
        ))],
    );

    let handlers: Vec<Arc<dyn ExceptionHandler>> = vec![
        Arc::new(RetrySystemFaultOnce {
            seen: AtomicUsize::new(0),
        }),
        Arc::new(DefaultExceptionHandler::new()),
    ];
    let client = client(resolver, factory, no_backoff(), handlers);

    client.request_response(request()).await.unwrap();
    assert_eq!(a.calls(), 2);
}

#[tokio::test]
async fn test_dispatch_miss_retry_is_opt_in() {
    let miss = || {
        Ok(RemotingResponse::fault(
            RemotingResultStatus::MethodNotFound,
            "not yet deployed",
        ))
    };

    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script("a", vec![miss()]);
    let plain = client(
        Arc::new(RotatingResolver::new(vec!["a"])),
        factory,
        no_backoff(),
        default_handlers(),
    );
    let err = plain.request_response(request()).await.unwrap_err();
    assert!(matches!(
        err,
        RemotingError::MethodNotFound {
            interface_id: 1,
            method_id: 2,
            ..
        }
    ));
    assert_eq!(a.calls(), 1);

    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script("a", vec![miss()]);
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let patient = client(
        resolver.clone(),
        factory,
        no_backoff(),
        vec![Arc::new(DefaultExceptionHandler::new().with_retry_on_dispatch_miss(true))
            as Arc<dyn ExceptionHandler>],
    );
    patient.request_response(request()).await.unwrap();
    assert_eq!(a.calls(), 2);
    assert_eq!(resolver.resolutions(), 2);
}

#[tokio::test]
async fn test_unknown_partition_fails_fast() {
    let resolver = Arc::new(StaticPartitionResolver::new());
    let factory = Arc::new(ScriptedFactory::default());

    let client = client(resolver, factory, no_backoff(), default_handlers());
    let err = client.request_response(request()).await.unwrap_err();

    assert!(matches!(
        err,
        RemotingError::Resolution(ResolveError::NotFound { .. })
    ));
    assert!(client.resolved_partition().await.is_none());
}

#[tokio::test]
async fn test_without_handlers_nothing_is_retried() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script("a", vec![Err(TransportError::timeout("slow"))]);

    let client = client(resolver, factory, no_backoff(), Vec::new());
    assert!(client.request_response(request()).await.is_err());
    assert_eq!(a.calls(), 1);
}

#[tokio::test]
async fn test_one_way_sends_are_retried_too() {
    let resolver = Arc::new(RotatingResolver::new(vec!["a"]));
    let factory = Arc::new(ScriptedFactory::default());
    let a = factory.script("a", vec![Err(TransportError::timeout("slow"))]);

    let client = client(resolver, factory, no_backoff(), default_handlers());
    client.send_one_way(request()).await.unwrap();
    assert_eq!(a.calls(), 2);
}
