use crate::{
    ActorDispatcherHost, ActorEventPublisher, CancellationTracker, DispatchError, DispatcherMap,
    InterfaceDispatcher,
};
use fabric_remoting::{
    EventSubscriptionRequest, RemotingMessageHandler, RemotingMessageHeaders, RemotingRequest,
    RemotingResponse, RemotingResultStatus, RequestBody, RequestContext, ResponseBody,
    SerializationProvider,
    constants::{EVENT_SUBSCRIPTION_INTERFACE_ID, SUBSCRIBE_METHOD_ID, UNSUBSCRIBE_METHOD_ID},
};
use fabric_remoting_service::{DispatchFault, RemotingSettings};
use futures::FutureExt;
use std::{panic::AssertUnwindSafe, sync::Arc};
use tokio_util::sync::CancellationToken;

enum DispatchTarget {
    Service(Arc<DispatcherMap>),
    Actors(Arc<ActorDispatcherHost>),
}

/// Receives requests from a transport listener and dispatches them to the
/// registered implementations.
///
/// Dispatch misses, handler faults and handler panics are all answered with
/// a status; none of them stop the endpoint.
pub struct RemotingEndpoint {
    target: DispatchTarget,
    cancellation: CancellationTracker,
    events: Option<Arc<ActorEventPublisher>>,
    serialization: SerializationProvider,
}

impl RemotingEndpoint {
    /// Endpoint of a service replica; every request goes to `dispatchers`.
    pub fn for_service(dispatchers: DispatcherMap, settings: &RemotingSettings) -> Self {
        Self {
            target: DispatchTarget::Service(Arc::new(dispatchers)),
            cancellation: CancellationTracker::new(),
            events: None,
            serialization: settings.serialization,
        }
    }

    /// Endpoint of an actor service; requests are routed by their actor id
    /// and subscription control requests go to `events`.
    pub fn for_actors(
        host: Arc<ActorDispatcherHost>,
        events: Arc<ActorEventPublisher>,
        settings: &RemotingSettings,
    ) -> Self {
        Self {
            target: DispatchTarget::Actors(host),
            cancellation: CancellationTracker::new(),
            events: Some(events),
            serialization: settings.serialization,
        }
    }

    pub fn cancellation_tracker(&self) -> &CancellationTracker {
        &self.cancellation
    }

    fn find_dispatcher(
        &self,
        headers: &RemotingMessageHeaders,
    ) -> Result<Arc<dyn InterfaceDispatcher>, DispatchError> {
        match &self.target {
            DispatchTarget::Service(map) => map.get_dispatcher(headers.interface_id).cloned(),
            DispatchTarget::Actors(host) => {
                let actor_id =
                    headers
                        .actor_id
                        .as_ref()
                        .ok_or(DispatchError::MissingActorId {
                            interface_id: headers.interface_id,
                        })?;
                host.get_or_activate(actor_id)?
                    .get_dispatcher(headers.interface_id)
                    .cloned()
            }
        }
    }

    async fn dispatch(&self, request: RemotingRequest) -> RemotingResponse {
        let RemotingRequest { headers, body } = request;

        let dispatcher = match self.find_dispatcher(&headers) {
            Ok(dispatcher) => dispatcher,
            Err(err @ DispatchError::InterfaceNotFound { .. }) => {
                tracing::debug!("{}", err);
                return RemotingResponse::fault(RemotingResultStatus::InterfaceNotFound, err.to_string());
            }
            Err(err) => {
                tracing::warn!("{}", err);
                return RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string());
            }
        };

        if !dispatcher.contains_method(headers.method_id) {
            let message = format!(
                "method {} is not implemented by {}",
                headers.method_id,
                dispatcher.description().full_name()
            );
            tracing::debug!("{}", message);
            return RemotingResponse::fault(RemotingResultStatus::MethodNotFound, message);
        }

        let body = match RequestBody::decode(&body, self.serialization.request) {
            Ok(body) => body,
            Err(err) => {
                return RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string());
            }
        };

        let outcome = match headers.invocation_id.as_deref() {
            Some(call_id) => {
                let tracked =
                    self.cancellation
                        .track(headers.interface_id, headers.method_id, call_id);
                let call = dispatcher.dispatch(headers.method_id, body, tracked.token());
                AssertUnwindSafe(call).catch_unwind().await
            }
            None => {
                let call = dispatcher.dispatch(headers.method_id, body, CancellationToken::new());
                AssertUnwindSafe(call).catch_unwind().await
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "Handler of method {} on {} panicked",
                    headers.method_id,
                    dispatcher.description().full_name()
                );
                return RemotingResponse::fault(
                    RemotingResultStatus::SystemFault,
                    "the method handler panicked",
                );
            }
        };

        let mut response = self.to_response(result);
        response.headers.invocation_id = headers.invocation_id;
        response
    }

    fn to_response(&self, result: Result<ResponseBody, DispatchFault>) -> RemotingResponse {
        let codec = self.serialization.response;
        match result {
            Ok(body) => match body.encode(codec) {
                Ok(bytes) => RemotingResponse::success(bytes),
                Err(err) => RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string()),
            },
            Err(DispatchFault::Application(information)) => match information.encode(codec) {
                Ok(bytes) => RemotingResponse::new(RemotingResultStatus::ApplicationFault, bytes),
                Err(err) => RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string()),
            },
            Err(fault @ DispatchFault::Canceled) => {
                RemotingResponse::fault(RemotingResultStatus::Canceled, fault.to_string())
            }
            Err(fault @ DispatchFault::MethodNotFound { .. }) => {
                RemotingResponse::fault(RemotingResultStatus::MethodNotFound, fault.to_string())
            }
            Err(fault @ DispatchFault::Codec(_)) => {
                RemotingResponse::fault(RemotingResultStatus::SystemFault, fault.to_string())
            }
        }
    }

    fn cancel(&self, headers: &RemotingMessageHeaders) -> RemotingResponse {
        match headers.invocation_id.as_deref() {
            Some(call_id) => {
                self.cancellation
                    .cancel(headers.interface_id, headers.method_id, call_id);
                RemotingResponse::success(Vec::new())
            }
            None => RemotingResponse::fault(
                RemotingResultStatus::SystemFault,
                "cancellation request carries no invocation id",
            ),
        }
    }

    fn update_subscription(
        &self,
        context: &RequestContext,
        request: &RemotingRequest,
    ) -> RemotingResponse {
        let Some(events) = &self.events else {
            return RemotingResponse::fault(
                RemotingResultStatus::InterfaceNotFound,
                "this endpoint does not publish events",
            );
        };
        let Some(actor_id) = request.headers.actor_id.clone() else {
            return RemotingResponse::fault(
                RemotingResultStatus::SystemFault,
                "subscription request does not name an actor",
            );
        };
        let subscription = match self
            .serialization
            .request
            .decode::<EventSubscriptionRequest>(&request.body)
        {
            Ok(subscription) => subscription,
            Err(err) => {
                return RemotingResponse::fault(RemotingResultStatus::SystemFault, err.to_string());
            }
        };

        match request.headers.method_id {
            SUBSCRIBE_METHOD_ID => {
                let Some(callback) = context.callback.clone() else {
                    return RemotingResponse::fault(
                        RemotingResultStatus::SystemFault,
                        "the transport provides no callback channel",
                    );
                };
                match events.add_subscriber(
                    actor_id,
                    subscription.event_interface_id,
                    subscription.subscription_id,
                    callback,
                ) {
                    Ok(()) => RemotingResponse::success(Vec::new()),
                    Err(err) => RemotingResponse::fault(
                        RemotingResultStatus::InterfaceNotFound,
                        err.to_string(),
                    ),
                }
            }
            UNSUBSCRIBE_METHOD_ID => {
                events.remove_subscriber(
                    &actor_id,
                    subscription.event_interface_id,
                    &subscription.subscription_id,
                );
                RemotingResponse::success(Vec::new())
            }
            other => RemotingResponse::fault(
                RemotingResultStatus::MethodNotFound,
                format!("unknown subscription control method {other}"),
            ),
        }
    }
}

#[async_trait::async_trait]
impl RemotingMessageHandler for RemotingEndpoint {
    async fn handle_request_response(
        &self,
        context: RequestContext,
        request: RemotingRequest,
    ) -> RemotingResponse {
        if request.headers.is_cancellation_request() {
            return self.cancel(&request.headers);
        }

        if request.headers.interface_id == EVENT_SUBSCRIPTION_INTERFACE_ID {
            return self.update_subscription(&context, &request);
        }

        self.dispatch(request).await
    }

    async fn handle_one_way(&self, context: RequestContext, request: RemotingRequest) {
        let interface_id = request.headers.interface_id;
        let method_id = request.headers.method_id;
        let response = self.handle_request_response(context, request).await;
        if !response.status().is_success() {
            tracing::debug!(
                "One-way call of method {} on interface {} failed: {:?} {}",
                method_id,
                interface_id,
                response.status(),
                response.fault_message()
            );
        }
    }
}
