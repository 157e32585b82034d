use crate::{
    DefaultExceptionHandler, EventSubscriptionManager, ExceptionConverter, ExceptionHandler,
    OperationRetrySettings, PartitionClient, PartitionResolver, ProxyGenerator, ProxyMethodTable,
    RemotingError, ServiceUri, SubscriptionInfo, TargetReplicaSelector,
    cancellation::request_with_cancellation,
};
use fabric_remoting::{
    ActorId, CodecError, EventSubscriptionRequest, ExceptionInformation, RemotingClientFactory,
    RemotingMessageHeaders, RemotingRequest, RemotingResponse, RemotingResultStatus,
    ResponseBody, ServicePartitionKey,
    constants::{EVENT_SUBSCRIPTION_INTERFACE_ID, SUBSCRIBE_METHOD_ID, UNSUBSCRIBE_METHOD_ID},
    utils::generate_invocation_id,
};
use fabric_remoting_service::{
    RemotedInterface, RemotingKind, RemotingMethod, RemotingRegistry, RemotingSettings,
    encode_request_body,
};
use std::{marker::PhantomData, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Opaque caller context carried in the request headers.
    pub call_context: Option<String>,
    /// Cancels the call, locally and on the server, when it fires. Ignored
    /// for methods that take no cancellation token.
    pub cancellation: Option<CancellationToken>,
}

impl CallOptions {
    pub fn with_call_context(mut self, call_context: impl Into<String>) -> Self {
        self.call_context = Some(call_context.into());
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }
}

/// Creates typed proxies for remote services and actors.
///
/// Everything a proxy needs is injected here: the registry its method tables
/// come from, the wire settings, partition resolution, and the transport.
pub struct ProxyFactory {
    settings: RemotingSettings,
    generator: Arc<ProxyGenerator>,
    exception_converter: Arc<ExceptionConverter>,
    resolver: Arc<dyn PartitionResolver>,
    client_factory: Arc<dyn RemotingClientFactory>,
    selector: TargetReplicaSelector,
    retry_settings: OperationRetrySettings,
    exception_handlers: Vec<Arc<dyn ExceptionHandler>>,
    events: Option<Arc<EventSubscriptionManager>>,
    resubscription_interval: Option<Duration>,
}

impl ProxyFactory {
    pub fn new(
        registry: Arc<RemotingRegistry>,
        settings: RemotingSettings,
        resolver: Arc<dyn PartitionResolver>,
        client_factory: Arc<dyn RemotingClientFactory>,
    ) -> Self {
        Self {
            settings,
            generator: Arc::new(ProxyGenerator::new(registry)),
            exception_converter: Arc::new(ExceptionConverter::new()),
            resolver,
            client_factory,
            selector: TargetReplicaSelector::default(),
            retry_settings: OperationRetrySettings::default(),
            exception_handlers: vec![Arc::new(DefaultExceptionHandler::new())],
            events: None,
            resubscription_interval: None,
        }
    }

    pub fn with_exception_converter(mut self, converter: Arc<ExceptionConverter>) -> Self {
        self.exception_converter = converter;
        self
    }

    pub fn with_selector(mut self, selector: TargetReplicaSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_retry_settings(mut self, retry_settings: OperationRetrySettings) -> Self {
        self.retry_settings = retry_settings;
        self
    }

    /// Consults `handler` before the handlers already installed.
    pub fn with_exception_handler(mut self, handler: Arc<dyn ExceptionHandler>) -> Self {
        self.exception_handlers.insert(0, handler);
        self
    }

    /// Replaces the whole handler chain.
    pub fn with_exception_handlers(mut self, handlers: Vec<Arc<dyn ExceptionHandler>>) -> Self {
        self.exception_handlers = handlers;
        self
    }

    /// Enables actor event subscriptions. `events` must also be installed as
    /// the callback handler of the transport.
    pub fn with_event_subscriptions(mut self, events: Arc<EventSubscriptionManager>) -> Self {
        self.events = Some(events);
        self
    }

    /// Re-sends every active subscription at this interval so that
    /// subscriptions survive a failover of the actor's partition.
    pub fn with_resubscription_interval(mut self, interval: Duration) -> Self {
        self.resubscription_interval = Some(interval);
        self
    }

    pub fn settings(&self) -> &RemotingSettings {
        &self.settings
    }

    pub fn exception_converter(&self) -> &Arc<ExceptionConverter> {
        &self.exception_converter
    }

    pub fn generator(&self) -> &Arc<ProxyGenerator> {
        &self.generator
    }

    pub fn create_service_proxy<I: RemotedInterface>(
        &self,
        service_uri: impl Into<ServiceUri>,
        partition_key: ServicePartitionKey,
    ) -> Result<ServiceProxy<I>, RemotingError> {
        let core = self.proxy_core::<I>(
            RemotingKind::Service,
            service_uri.into(),
            partition_key,
            None,
        )?;
        Ok(ServiceProxy {
            core,
            _interface: PhantomData,
        })
    }

    /// Creates a proxy for one actor; the partition is derived from its id.
    pub fn create_actor_proxy<I: RemotedInterface>(
        &self,
        service_uri: impl Into<ServiceUri>,
        actor_id: ActorId,
    ) -> Result<ActorProxy<I>, RemotingError> {
        let partition_key = actor_id.partition_key();
        let core = self.proxy_core::<I>(
            RemotingKind::Actor,
            service_uri.into(),
            partition_key,
            Some(actor_id.clone()),
        )?;
        Ok(ActorProxy {
            core,
            actor_id,
            events: self.events.clone(),
            resubscription_interval: self.resubscription_interval,
            _interface: PhantomData,
        })
    }

    fn proxy_core<I: RemotedInterface>(
        &self,
        kind: RemotingKind,
        service_uri: ServiceUri,
        partition_key: ServicePartitionKey,
        actor_id: Option<ActorId>,
    ) -> Result<ProxyCore, RemotingError> {
        let table = self
            .generator
            .generate_of_kind::<I>(self.settings.id_scheme, kind)?;

        let partition = PartitionClient::new(
            service_uri,
            partition_key,
            self.resolver.clone(),
            self.client_factory.clone(),
        )
        .with_selector(self.selector)
        .with_retry_settings(self.retry_settings.clone())
        .with_exception_handlers(self.exception_handlers.clone());

        Ok(ProxyCore {
            table,
            partition: Arc::new(partition),
            settings: self.settings.clone(),
            exception_converter: self.exception_converter.clone(),
            actor_id,
        })
    }
}

/// The untyped half of a proxy, shared by service and actor proxies.
#[derive(Clone)]
struct ProxyCore {
    table: Arc<ProxyMethodTable>,
    partition: Arc<PartitionClient>,
    settings: RemotingSettings,
    exception_converter: Arc<ExceptionConverter>,
    actor_id: Option<ActorId>,
}

impl ProxyCore {
    fn build_request<M: RemotingMethod>(
        &self,
        args: &M::Args,
        call_context: Option<String>,
    ) -> Result<RemotingRequest, RemotingError> {
        let method = self.table.method(M::NAME)?;
        let codec = self.settings.serialization.request;
        let body = encode_request_body(
            args,
            &method.argument_names,
            self.settings.body_wrap_mode,
            codec,
        )?
        .encode(codec)?;

        // Only cancellable calls are tracked by the endpoint.
        let headers = RemotingMessageHeaders::new(self.table.interface_id(), method.method_id)
            .with_call_context(call_context)
            .with_invocation_id(method.cancellable.then(generate_invocation_id))
            .with_actor_id(self.actor_id.clone());

        Ok(RemotingRequest::new(headers, body))
    }

    async fn invoke<M: RemotingMethod>(
        &self,
        args: M::Args,
        options: CallOptions,
    ) -> Result<M::Output, RemotingError> {
        let cancellable = self.table.method(M::NAME)?.cancellable;
        let request = self.build_request::<M>(&args, options.call_context)?;
        let cancellation = options.cancellation.as_ref().filter(|_| cancellable);

        let response = request_with_cancellation(&self.partition, request, cancellation).await?;
        self.read_response::<M>(response)
    }

    async fn invoke_one_way<M: RemotingMethod>(&self, args: M::Args) -> Result<(), RemotingError> {
        let request = self.build_request::<M>(&args, None)?;
        self.partition.send_one_way(request).await
    }

    fn read_response<M: RemotingMethod>(
        &self,
        response: RemotingResponse,
    ) -> Result<M::Output, RemotingError> {
        let codec = self.settings.serialization.response;
        match response.status() {
            RemotingResultStatus::Success => {
                let body = ResponseBody::decode(&response.body, codec)?;
                let value = body.value().ok_or_else(|| CodecError::Decode {
                    type_name: std::any::type_name::<M::Output>(),
                    reason: "the response carries no return value".to_string(),
                })?;
                Ok(codec.decode::<M::Output>(value)?)
            }
            RemotingResultStatus::ApplicationFault => {
                let information = ExceptionInformation::decode(&response.body, codec)?;
                Err(RemotingError::Application(
                    self.exception_converter.convert(information),
                ))
            }
            RemotingResultStatus::Canceled => Err(RemotingError::Canceled),
            status => Err(RemotingError::SystemFault(format!(
                "unexpected {:?} response: {}",
                status,
                response.fault_message()
            ))),
        }
    }
}

/// Typed proxy of a service interface.
pub struct ServiceProxy<I: RemotedInterface> {
    core: ProxyCore,
    _interface: PhantomData<fn() -> I>,
}

impl<I: RemotedInterface> Clone for ServiceProxy<I> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            _interface: PhantomData,
        }
    }
}

impl<I: RemotedInterface> ServiceProxy<I> {
    pub fn interface_id(&self) -> i32 {
        self.core.table.interface_id()
    }

    pub fn partition_client(&self) -> &Arc<PartitionClient> {
        &self.core.partition
    }

    pub async fn invoke<M>(&self, args: M::Args) -> Result<M::Output, RemotingError>
    where
        M: RemotingMethod<Interface = I>,
    {
        self.core.invoke::<M>(args, CallOptions::default()).await
    }

    pub async fn invoke_with_cancellation<M>(
        &self,
        args: M::Args,
        cancellation: &CancellationToken,
    ) -> Result<M::Output, RemotingError>
    where
        M: RemotingMethod<Interface = I>,
    {
        let options = CallOptions::default().with_cancellation(cancellation.clone());
        self.core.invoke::<M>(args, options).await
    }

    pub async fn invoke_with_options<M>(
        &self,
        args: M::Args,
        options: CallOptions,
    ) -> Result<M::Output, RemotingError>
    where
        M: RemotingMethod<Interface = I>,
    {
        self.core.invoke::<M>(args, options).await
    }

    /// Sends the call without waiting for a response.
    pub async fn invoke_one_way<M>(&self, args: M::Args) -> Result<(), RemotingError>
    where
        M: RemotingMethod<Interface = I, Output = ()>,
    {
        self.core.invoke_one_way::<M>(args).await
    }
}

/// Typed proxy of one actor.
pub struct ActorProxy<I: RemotedInterface> {
    core: ProxyCore,
    actor_id: ActorId,
    events: Option<Arc<EventSubscriptionManager>>,
    resubscription_interval: Option<Duration>,
    _interface: PhantomData<fn() -> I>,
}

impl<I: RemotedInterface> Clone for ActorProxy<I> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
            actor_id: self.actor_id.clone(),
            events: self.events.clone(),
            resubscription_interval: self.resubscription_interval,
            _interface: PhantomData,
        }
    }
}

impl<I: RemotedInterface> ActorProxy<I> {
    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn interface_id(&self) -> i32 {
        self.core.table.interface_id()
    }

    pub fn partition_client(&self) -> &Arc<PartitionClient> {
        &self.core.partition
    }

    pub async fn invoke<M>(&self, args: M::Args) -> Result<M::Output, RemotingError>
    where
        M: RemotingMethod<Interface = I>,
    {
        self.core.invoke::<M>(args, CallOptions::default()).await
    }

    pub async fn invoke_with_cancellation<M>(
        &self,
        args: M::Args,
        cancellation: &CancellationToken,
    ) -> Result<M::Output, RemotingError>
    where
        M: RemotingMethod<Interface = I>,
    {
        let options = CallOptions::default().with_cancellation(cancellation.clone());
        self.core.invoke::<M>(args, options).await
    }

    pub async fn invoke_with_options<M>(
        &self,
        args: M::Args,
        options: CallOptions,
    ) -> Result<M::Output, RemotingError>
    where
        M: RemotingMethod<Interface = I>,
    {
        self.core.invoke::<M>(args, options).await
    }

    pub async fn invoke_one_way<M>(&self, args: M::Args) -> Result<(), RemotingError>
    where
        M: RemotingMethod<Interface = I, Output = ()>,
    {
        self.core.invoke_one_way::<M>(args).await
    }

    /// Subscribes `handler` to this actor's `E` events. Subscribing the same
    /// handler again refreshes the existing subscription.
    pub async fn subscribe<E: RemotedInterface>(
        &self,
        handler: Arc<E::Target>,
    ) -> Result<(), RemotingError> {
        let events = self.events.as_ref().ok_or(RemotingError::EventsUnavailable)?;
        let (info, created) =
            events.register_subscriber_entry::<E>(self.actor_id().clone(), handler.clone())?;

        if let Err(err) = send_subscription_control(&self.core, SUBSCRIBE_METHOD_ID, &info).await {
            // A failed refresh leaves the existing subscription in place.
            if created {
                events.try_unregister_subscriber::<E>(self.actor_id(), &handler);
            }
            return Err(err);
        }

        if let Some(interval) = self.resubscription_interval {
            if info.start_resubscription() {
                spawn_resubscription(self.core.clone(), info, interval);
            }
        }

        Ok(())
    }

    /// Removes the subscription of `handler`. Returns `false`, without
    /// contacting the actor, when there was none.
    pub async fn unsubscribe<E: RemotedInterface>(
        &self,
        handler: &Arc<E::Target>,
    ) -> Result<bool, RemotingError> {
        let events = self.events.as_ref().ok_or(RemotingError::EventsUnavailable)?;
        let Some(info) = events.try_unregister_subscriber::<E>(self.actor_id(), handler) else {
            return Ok(false);
        };

        send_subscription_control(&self.core, UNSUBSCRIBE_METHOD_ID, &info).await?;
        Ok(true)
    }
}

async fn send_subscription_control(
    core: &ProxyCore,
    method_id: i32,
    info: &SubscriptionInfo,
) -> Result<(), RemotingError> {
    let body = core
        .settings
        .serialization
        .request
        .encode(&EventSubscriptionRequest {
            event_interface_id: info.key().event_interface_id,
            subscription_id: info.subscription_id(),
        })?;
    let headers = RemotingMessageHeaders::new(EVENT_SUBSCRIPTION_INTERFACE_ID, method_id)
        .with_actor_id(core.actor_id.clone());

    let response = core
        .partition
        .request_response(RemotingRequest::new(headers, body))
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(RemotingError::SystemFault(response.fault_message()))
    }
}

fn spawn_resubscription(core: ProxyCore, info: Arc<SubscriptionInfo>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if !info.is_active() {
                break;
            }
            if let Err(err) = send_subscription_control(&core, SUBSCRIBE_METHOD_ID, &info).await {
                tracing::warn!(
                    "Resubscription {} to actor {:?} failed: {}",
                    info.subscription_id(),
                    core.actor_id,
                    err
                );
            }
        }
    });
}
