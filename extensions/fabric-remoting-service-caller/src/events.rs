use crate::proxy_generator::qualified_name;
use dashmap::{DashMap, mapref::entry::Entry};
use fabric_remoting::{
    ActorId, RemotingMessageHandler, RemotingRequest, RemotingResponse, RemotingResultStatus,
    RequestBody, RequestContext, SerializationProvider,
};
use fabric_remoting_service::{
    ContractError, DispatchFuture, InterfaceDescription, MethodDispatchTable, RemotedInterface,
    RemotingKind, RemotingRegistry, RemotingSettings,
};
use futures::FutureExt;
use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identifies one local subscriber: the same handler instance subscribed to
/// the same actor's events maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriberKey {
    pub actor_id: ActorId,
    pub event_interface_id: i32,
    /// Address of the handler instance.
    pub instance_address: usize,
}

pub struct SubscriptionInfo {
    key: SubscriberKey,
    subscription_id: Uuid,
    is_active: AtomicBool,
    resubscribing: AtomicBool,
    /// `Arc<E::Target>` of the subscribed event interface.
    instance: Arc<dyn Any + Send + Sync>,
}

impl SubscriptionInfo {
    pub fn key(&self) -> &SubscriberKey {
        &self.key
    }

    /// Correlation id carried by every event sent to this subscriber.
    pub fn subscription_id(&self) -> Uuid {
        self.subscription_id
    }

    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Acquire)
    }

    fn deactivate(&self) {
        self.is_active.store(false, Ordering::Release);
    }

    /// Claims the periodic resubscription of this subscription; only the
    /// first caller gets `true`.
    pub(crate) fn start_resubscription(&self) -> bool {
        !self.resubscribing.swap(true, Ordering::AcqRel)
    }
}

impl std::fmt::Debug for SubscriptionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionInfo")
            .field("key", &self.key)
            .field("subscription_id", &self.subscription_id)
            .field("is_active", &self.is_active())
            .finish()
    }
}

trait EventDispatcher: Send + Sync {
    fn description(&self) -> &InterfaceDescription;

    /// `None` when `instance` is not a handler of this interface.
    fn dispatch(
        &self,
        instance: &Arc<dyn Any + Send + Sync>,
        method_id: i32,
        body: RequestBody,
        serialization: SerializationProvider,
    ) -> Option<DispatchFuture>;
}

struct TypedEventDispatcher<E: RemotedInterface> {
    table: Arc<MethodDispatchTable<E>>,
}

impl<E: RemotedInterface> EventDispatcher for TypedEventDispatcher<E> {
    fn description(&self) -> &InterfaceDescription {
        self.table.description()
    }

    fn dispatch(
        &self,
        instance: &Arc<dyn Any + Send + Sync>,
        method_id: i32,
        body: RequestBody,
        serialization: SerializationProvider,
    ) -> Option<DispatchFuture> {
        let target = instance.downcast_ref::<Arc<E::Target>>()?.clone();
        Some(self.table.dispatch(
            target,
            method_id,
            body,
            serialization,
            CancellationToken::new(),
        ))
    }
}

/// Client side of actor events: remembers local subscribers and routes
/// inbound event messages to them.
///
/// Installed as the callback handler of the transport client factory.
pub struct EventSubscriptionManager {
    registry: Arc<RemotingRegistry>,
    settings: RemotingSettings,
    dispatchers: DashMap<i32, Arc<dyn EventDispatcher>>,
    subscriptions_by_key: DashMap<SubscriberKey, Arc<SubscriptionInfo>>,
    subscriptions_by_id: DashMap<Uuid, Arc<SubscriptionInfo>>,
}

impl EventSubscriptionManager {
    pub fn new(registry: Arc<RemotingRegistry>, settings: RemotingSettings) -> Self {
        Self {
            registry,
            settings,
            dispatchers: DashMap::new(),
            subscriptions_by_key: DashMap::new(),
            subscriptions_by_id: DashMap::new(),
        }
    }

    /// Registers the dispatch table of event interface `E`. Calling it again,
    /// or for an id that is already taken, keeps the first registration.
    pub fn register_event_dispatchers<E: RemotedInterface>(&self) -> Result<i32, ContractError> {
        if E::KIND != RemotingKind::Event {
            return Err(ContractError::UnexpectedKind {
                interface: qualified_name::<E>(),
                expected: RemotingKind::Event,
                found: E::KIND,
            });
        }

        let mut schemes = self.settings.endpoint_id_schemes();
        if !schemes.contains(&self.settings.id_scheme) {
            schemes.push(self.settings.id_scheme);
        }

        let mut primary_id = None;
        for scheme in schemes {
            let table = self.registry.dispatch_table::<E>(scheme)?;
            let id = table.interface_id();
            if scheme == self.settings.id_scheme {
                primary_id = Some(id);
            }
            if let Entry::Vacant(entry) = self.dispatchers.entry(id) {
                tracing::debug!(
                    "Registered event dispatcher for {} as {} ({:?})",
                    table.description().full_name(),
                    id,
                    scheme
                );
                entry.insert(Arc::new(TypedEventDispatcher::<E> { table }));
            }
        }

        match primary_id {
            Some(id) => Ok(id),
            None => Ok(self.registry.describe::<E>(self.settings.id_scheme)?.id()),
        }
    }

    pub fn is_dispatcher_registered(&self, event_interface_id: i32) -> bool {
        self.dispatchers.contains_key(&event_interface_id)
    }

    /// Returns the subscription of `instance` to `actor_id`'s `E` events,
    /// creating it with a fresh subscription id on first use.
    pub fn register_subscriber<E: RemotedInterface>(
        &self,
        actor_id: ActorId,
        instance: Arc<E::Target>,
    ) -> Result<Arc<SubscriptionInfo>, ContractError> {
        self.register_subscriber_entry::<E>(actor_id, instance)
            .map(|(info, _)| info)
    }

    /// Like [`Self::register_subscriber`]; the flag is `true` when this call
    /// created the subscription.
    pub(crate) fn register_subscriber_entry<E: RemotedInterface>(
        &self,
        actor_id: ActorId,
        instance: Arc<E::Target>,
    ) -> Result<(Arc<SubscriptionInfo>, bool), ContractError> {
        let event_interface_id = self.register_event_dispatchers::<E>()?;
        let key = SubscriberKey {
            actor_id,
            event_interface_id,
            instance_address: instance_address::<E>(&instance),
        };

        let entry = match self.subscriptions_by_key.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let info = Arc::new(SubscriptionInfo {
                    key: entry.key().clone(),
                    subscription_id: Uuid::new_v4(),
                    is_active: AtomicBool::new(true),
                    resubscribing: AtomicBool::new(false),
                    instance: Arc::new(instance),
                });
                self.subscriptions_by_id
                    .insert(info.subscription_id, info.clone());
                entry.insert(info.clone());
                (info, true)
            }
        };

        Ok(entry)
    }

    /// Removes the subscription of `instance`, if there is one. Removing an
    /// absent subscription is not an error.
    pub fn try_unregister_subscriber<E: RemotedInterface>(
        &self,
        actor_id: &ActorId,
        instance: &Arc<E::Target>,
    ) -> Option<Arc<SubscriptionInfo>> {
        let event_interface_id = self
            .registry
            .describe::<E>(self.settings.id_scheme)
            .ok()?
            .id();
        let key = SubscriberKey {
            actor_id: actor_id.clone(),
            event_interface_id,
            instance_address: instance_address::<E>(instance),
        };

        let (_, info) = self.subscriptions_by_key.remove(&key)?;
        info.deactivate();
        self.subscriptions_by_id.remove(&info.subscription_id);
        Some(info)
    }

    pub fn subscription(&self, subscription_id: &Uuid) -> Option<Arc<SubscriptionInfo>> {
        self.subscriptions_by_id
            .get(subscription_id)
            .map(|info| info.value().clone())
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions_by_key.len()
    }

    /// Delivers one inbound event. Events for unknown interfaces, unknown or
    /// inactive subscriptions, and failures of the subscriber's handler are
    /// dropped.
    pub async fn deliver(&self, request: RemotingRequest) {
        let interface_id = request.headers.interface_id;
        let method_id = request.headers.method_id;

        let Some(dispatcher) = self
            .dispatchers
            .get(&interface_id)
            .map(|dispatcher| dispatcher.value().clone())
        else {
            tracing::debug!("Dropping event of unknown interface {}", interface_id);
            return;
        };

        let Some(subscription_id) = request.headers.subscription_id() else {
            tracing::debug!("Dropping event of {} without subscription id", interface_id);
            return;
        };

        let Some(info) = self.subscription(&subscription_id) else {
            tracing::debug!("Dropping event for unknown subscription {}", subscription_id);
            return;
        };

        if info.key.event_interface_id != interface_id || !info.is_active() {
            tracing::debug!("Dropping event for subscription {}", subscription_id);
            return;
        }

        let body = match RequestBody::decode(&request.body, self.settings.serialization.request) {
            Ok(body) => body,
            Err(err) => {
                tracing::debug!("Dropping undecodable event: {}", err);
                return;
            }
        };

        let Some(call) =
            dispatcher.dispatch(&info.instance, method_id, body, self.settings.serialization)
        else {
            return;
        };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(_)) => {}
            Ok(Err(fault)) => {
                tracing::debug!(
                    "Event handler of {} failed: {}",
                    dispatcher.description().full_name(),
                    fault
                );
            }
            Err(_) => {
                tracing::warn!(
                    "Event handler of {} panicked",
                    dispatcher.description().full_name()
                );
            }
        }
    }
}

fn instance_address<E: RemotedInterface>(instance: &Arc<E::Target>) -> usize {
    Arc::as_ptr(instance).cast::<()>() as usize
}

#[async_trait::async_trait]
impl RemotingMessageHandler for EventSubscriptionManager {
    async fn handle_request_response(
        &self,
        _context: RequestContext,
        request: RemotingRequest,
    ) -> RemotingResponse {
        RemotingResponse::fault(
            RemotingResultStatus::MethodNotFound,
            format!(
                "events are one-way; interface {} does not answer requests",
                request.headers.interface_id
            ),
        )
    }

    async fn handle_one_way(&self, _context: RequestContext, request: RemotingRequest) {
        self.deliver(request).await;
    }
}
