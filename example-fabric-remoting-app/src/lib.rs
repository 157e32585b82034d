//! A small two-service cluster on localhost: a key/value store service and a
//! counter actor service, each behind its own WebSocket listener.

pub mod clients;

use example_fabric_remoting_service_definition::{
    counter::{CountChanged, Counter, CounterActorInterface, CounterEventsInterface},
    key_value_store::{InMemoryKeyValueStore, KeyNotFound, KeyValueStore, KeyValueStoreInterface},
};
use fabric_remoting::{ActorId, RemotingListener, RemotingMessageHandler, ServicePartitionKey};
use fabric_remoting_service::{RemotingRegistry, RemotingSettings};
use fabric_remoting_service_caller::{
    EventSubscriptionManager, ExceptionConverter, ProxyFactory, ReplicaRole, ResolvedEndpoint,
    StaticPartitionResolver,
};
use fabric_remoting_service_endpoint::{
    ActorDispatcherHost, ActorEventPublisher, DispatcherMap, RemotingEndpoint,
};
use fabric_remoting_tokio_transport::{TransportSettings, WsClientFactory, WsRemotingListener};
use std::{
    error::Error,
    sync::{
        Arc,
        atomic::{AtomicI64, Ordering},
    },
};

pub const STORE_SERVICE_URI: &str = "fabric:/Demo/Store";
pub const COUNTER_SERVICE_URI: &str = "fabric:/Demo/Counters";

pub type DemoResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// A counter actor that announces every change to its subscribers.
pub struct CounterActor {
    actor_id: ActorId,
    value: AtomicI64,
    publisher: Arc<ActorEventPublisher>,
}

#[async_trait::async_trait]
impl Counter for CounterActor {
    async fn increment(&self, by: i64) -> i64 {
        let value = self.value.fetch_add(by, Ordering::SeqCst) + by;

        match self
            .publisher
            .event_proxy::<CounterEventsInterface>(self.actor_id.clone())
        {
            Ok(events) => {
                if let Err(err) = events.raise::<CountChanged>((value,)).await {
                    tracing::warn!("Counter {} could not raise CountChanged: {}", self.actor_id, err);
                }
            }
            Err(err) => tracing::warn!("Counter events are not available: {}", err),
        }

        value
    }

    async fn get(&self) -> i64 {
        self.value.load(Ordering::SeqCst)
    }
}

pub struct DemoCluster {
    pub registry: Arc<RemotingRegistry>,
    pub resolver: Arc<StaticPartitionResolver>,
    settings: RemotingSettings,
    store_listener: WsRemotingListener,
    counter_listener: WsRemotingListener,
    counter_address: String,
}

impl DemoCluster {
    /// Opens both listeners on OS-assigned ports and publishes the store to
    /// the cluster's resolver.
    pub async fn start(settings: RemotingSettings) -> DemoResult<Self> {
        let registry = Arc::new(RemotingRegistry::new());

        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let store_map = DispatcherMap::builder(registry.clone(), &settings)
            .register::<KeyValueStoreInterface>(store)?
            .build();
        let store_endpoint: Arc<dyn RemotingMessageHandler> =
            Arc::new(RemotingEndpoint::for_service(store_map, &settings));

        let publisher = Arc::new(ActorEventPublisher::new(registry.clone(), settings.clone()));
        publisher.register_event_interface::<CounterEventsInterface>()?;
        let host = Arc::new(ActorDispatcherHost::new({
            let registry = registry.clone();
            let settings = settings.clone();
            let publisher = publisher.clone();
            move |actor_id: &ActorId| {
                let actor: Arc<dyn Counter> = Arc::new(CounterActor {
                    actor_id: actor_id.clone(),
                    value: AtomicI64::new(0),
                    publisher: publisher.clone(),
                });
                DispatcherMap::builder(registry.clone(), &settings)
                    .register::<CounterActorInterface>(actor)
                    .map(|builder| builder.build())
            }
        }));
        let counter_endpoint: Arc<dyn RemotingMessageHandler> =
            Arc::new(RemotingEndpoint::for_actors(host, publisher, &settings));

        let store_listener =
            WsRemotingListener::new("127.0.0.1:0", store_endpoint, TransportSettings::default());
        let counter_listener = WsRemotingListener::new(
            "127.0.0.1:0",
            counter_endpoint,
            TransportSettings::default(),
        );

        let store_address = store_listener.open().await?;
        let counter_address = counter_listener.open().await?;

        let resolver = Arc::new(StaticPartitionResolver::new());
        resolver.register(
            STORE_SERVICE_URI,
            ServicePartitionKey::Singleton,
            vec![ResolvedEndpoint::new(ReplicaRole::Stateless, store_address)],
        );

        Ok(Self {
            registry,
            resolver,
            settings,
            store_listener,
            counter_listener,
            counter_address,
        })
    }

    /// Publishes the partition of `actor_id` on the counter listener.
    pub fn place_actor(&self, actor_id: &ActorId) {
        self.resolver.register(
            COUNTER_SERVICE_URI,
            actor_id.partition_key(),
            vec![ResolvedEndpoint::new(
                ReplicaRole::Primary,
                self.counter_address.clone(),
            )],
        );
    }

    /// A proxy factory connected to this cluster, able to receive actor
    /// events and to rebuild `KeyNotFound` faults.
    pub fn proxy_factory(&self) -> ProxyFactory {
        let events = Arc::new(EventSubscriptionManager::new(
            self.registry.clone(),
            self.settings.clone(),
        ));
        let client_factory = Arc::new(
            WsClientFactory::new(TransportSettings::default())
                .with_callback_handler(events.clone() as Arc<dyn RemotingMessageHandler>),
        );

        let converter = Arc::new(ExceptionConverter::new());
        converter.register::<KeyNotFound>();

        ProxyFactory::new(
            self.registry.clone(),
            self.settings.clone(),
            self.resolver.clone(),
            client_factory,
        )
        .with_exception_converter(converter)
        .with_event_subscriptions(events)
    }

    pub async fn shutdown(&self) -> DemoResult<()> {
        self.store_listener.close().await?;
        self.counter_listener.close().await?;
        Ok(())
    }
}
