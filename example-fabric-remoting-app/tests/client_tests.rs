use example_fabric_remoting_app::{
    COUNTER_SERVICE_URI, DemoCluster, STORE_SERVICE_URI,
    clients::{CounterClient, KeyValueStoreClient, key_not_found},
};
use example_fabric_remoting_service_definition::{
    counter::{CounterActorInterface, CounterEvents},
    key_value_store::KeyValueStoreInterface,
};
use fabric_remoting::{ActorId, ServicePartitionKey};
use fabric_remoting_service::RemotingSettings;
use fabric_remoting_service_caller::RemotingError;
use std::{sync::Arc, time::Duration};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// --- Test Setup ---

struct ForwardingEvents {
    tx: mpsc::UnboundedSender<i64>,
}

impl CounterEvents for ForwardingEvents {
    fn count_changed(&self, value: i64) {
        let _ = self.tx.send(value);
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<i64>) -> i64 {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no event arrived")
        .expect("event channel closed")
}

// --- Tests ---

#[tokio::test]
async fn test_store_client_round_trip() {
    let cluster = DemoCluster::start(RemotingSettings::default()).await.unwrap();
    let store = cluster
        .proxy_factory()
        .create_service_proxy::<KeyValueStoreInterface>(
            STORE_SERVICE_URI,
            ServicePartitionKey::Singleton,
        )
        .unwrap();

    let (a, b) = tokio::join!(store.set_value("k1", "v1"), store.set_value("k2", "v2"));
    a.unwrap();
    b.unwrap();

    assert_eq!(store.get_value("k1").await.unwrap(), "v1");
    assert_eq!(store.count().await.unwrap(), 2);

    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_store_client_rebuilds_key_not_found() {
    let cluster = DemoCluster::start(RemotingSettings::default()).await.unwrap();
    let store = cluster
        .proxy_factory()
        .create_service_proxy::<KeyValueStoreInterface>(
            STORE_SERVICE_URI,
            ServicePartitionKey::Singleton,
        )
        .unwrap();

    let err = store.get_value("k1").await.unwrap_err();

    assert!(err.is_application_fault());
    assert_eq!(key_not_found(&err).map(|e| e.key.as_str()), Some("k1"));
    assert!(err.to_string().contains("k1"), "{}", err);

    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_store_client_slow_echo() {
    let cluster = DemoCluster::start(RemotingSettings::legacy()).await.unwrap();
    let store = cluster
        .proxy_factory()
        .create_service_proxy::<KeyValueStoreInterface>(
            STORE_SERVICE_URI,
            ServicePartitionKey::Singleton,
        )
        .unwrap();

    let token = CancellationToken::new();
    assert_eq!(
        store
            .slow_echo("quick", Duration::from_millis(1), &token)
            .await
            .unwrap(),
        "quick"
    );

    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        }
    });
    let result = tokio::time::timeout(
        Duration::from_secs(2),
        store.slow_echo("late", Duration::from_secs(30), &token),
    )
    .await
    .expect("cancellation was not observed");
    assert!(matches!(result, Err(RemotingError::Canceled)));

    cluster.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_counter_client_events_stop_after_unsubscribe() {
    let cluster = DemoCluster::start(RemotingSettings::default()).await.unwrap();
    let actor_id = ActorId::new_string("visits");
    cluster.place_actor(&actor_id);

    let counter = cluster
        .proxy_factory()
        .create_actor_proxy::<CounterActorInterface>(COUNTER_SERVICE_URI, actor_id)
        .unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler: Arc<dyn CounterEvents> = Arc::new(ForwardingEvents { tx });
    counter.subscribe_count_changed(handler.clone()).await.unwrap();

    assert_eq!(counter.increment(5).await.unwrap(), 5);
    assert_eq!(next_event(&mut rx).await, 5);

    assert!(counter.unsubscribe_count_changed(&handler).await.unwrap());
    assert!(!counter.unsubscribe_count_changed(&handler).await.unwrap());

    assert_eq!(counter.increment(1).await.unwrap(), 6);
    assert_eq!(counter.get().await.unwrap(), 6);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err());

    cluster.shutdown().await.unwrap();
}
