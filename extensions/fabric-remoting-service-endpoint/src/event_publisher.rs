use crate::{DispatchError, EventError};
use dashmap::DashMap;
use fabric_remoting::{
    ActorId, RemotingCallbackClient, RemotingMessageHeaders, RemotingRequest, TransportErrorKind,
};
use fabric_remoting_service::{
    ContractError, InterfaceDescription, RemotedInterface, RemotingKind, RemotingMethod,
    RemotingRegistry, RemotingSettings, encode_request_body,
};
use futures::future::join_all;
use std::{collections::HashMap, marker::PhantomData, sync::Arc};
use uuid::Uuid;

type SubscriptionKey = (ActorId, i32);

/// Server side of actor events: tracks which clients subscribed to which
/// actor's events and fans raised events out to them.
pub struct ActorEventPublisher {
    registry: Arc<RemotingRegistry>,
    settings: RemotingSettings,
    event_interfaces: DashMap<i32, Arc<InterfaceDescription>>,
    subscriptions: DashMap<SubscriptionKey, HashMap<Uuid, Arc<dyn RemotingCallbackClient>>>,
}

impl ActorEventPublisher {
    pub fn new(registry: Arc<RemotingRegistry>, settings: RemotingSettings) -> Self {
        Self {
            registry,
            settings,
            event_interfaces: DashMap::new(),
            subscriptions: DashMap::new(),
        }
    }

    /// Makes event interface `E` subscribable under every accepted id scheme
    /// and returns its id under the primary scheme. Registering twice is a
    /// no-op; the first registration of an id wins.
    pub fn register_event_interface<E: RemotedInterface>(&self) -> Result<i32, ContractError> {
        ensure_event_interface::<E>()?;

        let mut primary_id = None;
        for scheme in self.settings.endpoint_id_schemes() {
            let description = self.registry.describe::<E>(scheme)?;
            if scheme == self.settings.id_scheme {
                primary_id = Some(description.id());
            }
            self.event_interfaces
                .entry(description.id())
                .or_insert(description);
        }

        match primary_id {
            Some(id) => Ok(id),
            None => Ok(self.registry.describe::<E>(self.settings.id_scheme)?.id()),
        }
    }

    pub fn is_event_interface_registered(&self, event_interface_id: i32) -> bool {
        self.event_interfaces.contains_key(&event_interface_id)
    }

    /// Adds (or refreshes) a subscription of `callback` to an actor's events.
    pub fn add_subscriber(
        &self,
        actor_id: ActorId,
        event_interface_id: i32,
        subscription_id: Uuid,
        callback: Arc<dyn RemotingCallbackClient>,
    ) -> Result<(), DispatchError> {
        if !self.is_event_interface_registered(event_interface_id) {
            return Err(DispatchError::InterfaceNotFound {
                interface_id: event_interface_id,
            });
        }

        self.subscriptions
            .entry((actor_id, event_interface_id))
            .or_default()
            .insert(subscription_id, callback);
        Ok(())
    }

    pub fn remove_subscriber(
        &self,
        actor_id: &ActorId,
        event_interface_id: i32,
        subscription_id: &Uuid,
    ) -> bool {
        let key = (actor_id.clone(), event_interface_id);
        let removed = self
            .subscriptions
            .get_mut(&key)
            .map(|mut subscribers| subscribers.remove(subscription_id).is_some())
            .unwrap_or(false);
        self.subscriptions
            .remove_if(&key, |_, subscribers| subscribers.is_empty());
        removed
    }

    pub fn subscriber_count(&self, actor_id: &ActorId, event_interface_id: i32) -> usize {
        self.subscriptions
            .get(&(actor_id.clone(), event_interface_id))
            .map(|subscribers| subscribers.len())
            .unwrap_or(0)
    }

    /// Returns a proxy raising events of interface `E` on behalf of `actor_id`.
    pub fn event_proxy<E: RemotedInterface>(
        self: &Arc<Self>,
        actor_id: ActorId,
    ) -> Result<ActorEventProxy<E>, ContractError> {
        ensure_event_interface::<E>()?;

        let descriptions = self
            .settings
            .endpoint_id_schemes()
            .into_iter()
            .map(|scheme| self.registry.describe::<E>(scheme))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ActorEventProxy {
            publisher: self.clone(),
            actor_id,
            descriptions,
            _event: PhantomData,
        })
    }

    fn snapshot(
        &self,
        actor_id: &ActorId,
        event_interface_id: i32,
    ) -> Vec<(Uuid, Arc<dyn RemotingCallbackClient>)> {
        self.subscriptions
            .get(&(actor_id.clone(), event_interface_id))
            .map(|subscribers| {
                subscribers
                    .iter()
                    .map(|(id, callback)| (*id, callback.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

fn ensure_event_interface<E: RemotedInterface>() -> Result<(), ContractError> {
    if E::KIND != RemotingKind::Event {
        return Err(ContractError::UnexpectedKind {
            interface: format!("{}.{}", E::NAMESPACE, E::NAME),
            expected: RemotingKind::Event,
            found: E::KIND,
        });
    }
    Ok(())
}

/// Raises the events of interface `E` for one actor.
pub struct ActorEventProxy<E: RemotedInterface> {
    publisher: Arc<ActorEventPublisher>,
    actor_id: ActorId,
    descriptions: Vec<Arc<InterfaceDescription>>,
    _event: PhantomData<fn() -> E>,
}

impl<E: RemotedInterface> ActorEventProxy<E> {
    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    /// Sends event `M` to every current subscriber and returns how many
    /// accepted it. Delivery is best effort; subscribers whose connection is
    /// gone are dropped.
    pub async fn raise<M>(&self, args: M::Args) -> Result<usize, EventError>
    where
        M: RemotingMethod<Interface = E>,
    {
        let settings = &self.publisher.settings;
        let mut sends = Vec::new();

        for description in &self.descriptions {
            let method = description.method_by_name(M::NAME).ok_or_else(|| {
                ContractError::UnknownMethod {
                    interface: description.full_name(),
                    method: M::NAME.to_string(),
                }
            })?;

            let subscribers = self.publisher.snapshot(&self.actor_id, description.id());
            if subscribers.is_empty() {
                continue;
            }

            let body = encode_request_body(
                &args,
                &method.argument_names(),
                settings.body_wrap_mode,
                settings.serialization.request,
            )?
            .encode(settings.serialization.request)?;

            for (subscription_id, callback) in subscribers {
                let headers = RemotingMessageHeaders::new(description.id(), method.id())
                    .with_actor_id(Some(self.actor_id.clone()))
                    .with_subscription_id(subscription_id);
                let request = RemotingRequest::new(headers, body.clone());
                let event_interface_id = description.id();
                sends.push(async move {
                    let result = callback.send_one_way(request).await;
                    (event_interface_id, subscription_id, result)
                });
            }
        }

        let mut delivered = 0;
        for (event_interface_id, subscription_id, result) in join_all(sends).await {
            match result {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::warn!(
                        "Event {} of actor {} not delivered to {}: {}",
                        M::NAME,
                        self.actor_id,
                        subscription_id,
                        err
                    );
                    if matches!(
                        err.kind,
                        TransportErrorKind::ObjectClosed
                            | TransportErrorKind::ConnectionFaulted
                            | TransportErrorKind::EndpointUnreachable
                    ) {
                        self.publisher.remove_subscriber(
                            &self.actor_id,
                            event_interface_id,
                            &subscription_id,
                        );
                    }
                }
            }
        }

        Ok(delivered)
    }
}
