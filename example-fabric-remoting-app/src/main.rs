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
use std::{sync::Arc, time::Duration};
use tokio::join;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct PrintingCounterEvents {
    label: &'static str,
}

impl CounterEvents for PrintingCounterEvents {
    fn count_changed(&self, value: i64) {
        println!("[{}] count changed to {}", self.label, value);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cluster = DemoCluster::start(RemotingSettings::default()).await?;
    let proxies = cluster.proxy_factory();

    {
        let store = proxies.create_service_proxy::<KeyValueStoreInterface>(
            STORE_SERVICE_URI,
            ServicePartitionKey::Singleton,
        )?;

        // `join!` sends all writes before awaiting any response.
        let (a, b, c) = join!(
            store.set_value("alpha", "1"),
            store.set_value("beta", "2"),
            store.set_value("gamma", "3")
        );
        a?;
        b?;
        c?;

        println!("alpha = {}", store.get_value("alpha").await?);
        println!("entries = {}", store.count().await?);

        match store.get_value("delta").await {
            Ok(value) => println!("delta = {}", value),
            Err(err) => match key_not_found(&err) {
                Some(not_found) => println!("no entry for {:?}", not_found.key),
                None => return Err(err.into()),
            },
        }

        let token = CancellationToken::new();
        let canceler = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceler.cancel();
        });
        let echoed = store
            .slow_echo("too late", Duration::from_secs(5), &token)
            .await;
        println!("slow echo after cancel: {:?}", echoed.map_err(|err| err.to_string()));
    }

    {
        let actor_id = ActorId::new_string("visits");
        cluster.place_actor(&actor_id);

        let counter =
            proxies.create_actor_proxy::<CounterActorInterface>(COUNTER_SERVICE_URI, actor_id)?;
        let events: Arc<dyn CounterEvents> = Arc::new(PrintingCounterEvents { label: "visits" });
        counter.subscribe_count_changed(events.clone()).await?;

        for by in [1, 2, 3] {
            counter.increment(by).await?;
        }
        println!("visits = {}", counter.get().await?);

        // Give the last event time to arrive before unsubscribing.
        tokio::time::sleep(Duration::from_millis(100)).await;
        counter.unsubscribe_count_changed(&events).await?;
    }

    cluster.shutdown().await?;
    Ok(())
}
