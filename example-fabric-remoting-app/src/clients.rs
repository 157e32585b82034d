//! Typed client facades over the generic proxies, so callers write
//! `store.get_value("k")` instead of `store.invoke::<GetValue>(("k".into(),))`.

use example_fabric_remoting_service_definition::{
    counter::{CounterActorInterface, CounterEvents, CounterEventsInterface, Get, Increment},
    key_value_store::{Count, GetValue, KeyNotFound, KeyValueStoreInterface, SetValue, SlowEcho},
};
use fabric_remoting_service_caller::{ActorProxy, RemotingError, ServiceProxy};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

/// Client view of the key/value store service.
#[async_trait::async_trait]
pub trait KeyValueStoreClient: Send + Sync {
    async fn get_value(&self, key: &str) -> Result<String, RemotingError>;

    async fn set_value(&self, key: &str, value: &str) -> Result<(), RemotingError>;

    async fn count(&self) -> Result<u64, RemotingError>;

    /// Echoes `value` after `delay`. Canceling `cancellation` also cancels
    /// the call on the server.
    async fn slow_echo(
        &self,
        value: &str,
        delay: Duration,
        cancellation: &CancellationToken,
    ) -> Result<String, RemotingError>;
}

#[async_trait::async_trait]
impl KeyValueStoreClient for ServiceProxy<KeyValueStoreInterface> {
    async fn get_value(&self, key: &str) -> Result<String, RemotingError> {
        self.invoke::<GetValue>((key.to_string(),)).await
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<(), RemotingError> {
        self.invoke::<SetValue>((key.to_string(), value.to_string()))
            .await
    }

    async fn count(&self) -> Result<u64, RemotingError> {
        self.invoke::<Count>(()).await
    }

    async fn slow_echo(
        &self,
        value: &str,
        delay: Duration,
        cancellation: &CancellationToken,
    ) -> Result<String, RemotingError> {
        let delay_millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.invoke_with_cancellation::<SlowEcho>((value.to_string(), delay_millis), cancellation)
            .await
    }
}

/// The `KeyNotFound` a failed store call carries, when the proxy factory
/// rebuilt it.
pub fn key_not_found(err: &RemotingError) -> Option<&KeyNotFound> {
    err.remote_exception()
        .and_then(|exception| exception.downcast_ref::<KeyNotFound>())
}

/// Client view of one counter actor and its change notifications.
#[async_trait::async_trait]
pub trait CounterClient: Send + Sync {
    async fn increment(&self, by: i64) -> Result<i64, RemotingError>;

    async fn get(&self) -> Result<i64, RemotingError>;

    async fn subscribe_count_changed(
        &self,
        handler: Arc<dyn CounterEvents>,
    ) -> Result<(), RemotingError>;

    /// Returns `false` when `handler` was not subscribed.
    async fn unsubscribe_count_changed(
        &self,
        handler: &Arc<dyn CounterEvents>,
    ) -> Result<bool, RemotingError>;
}

#[async_trait::async_trait]
impl CounterClient for ActorProxy<CounterActorInterface> {
    async fn increment(&self, by: i64) -> Result<i64, RemotingError> {
        self.invoke::<Increment>((by,)).await
    }

    async fn get(&self) -> Result<i64, RemotingError> {
        self.invoke::<Get>(()).await
    }

    async fn subscribe_count_changed(
        &self,
        handler: Arc<dyn CounterEvents>,
    ) -> Result<(), RemotingError> {
        self.subscribe::<CounterEventsInterface>(handler).await
    }

    async fn unsubscribe_count_changed(
        &self,
        handler: &Arc<dyn CounterEvents>,
    ) -> Result<bool, RemotingError> {
        self.unsubscribe::<CounterEventsInterface>(handler).await
    }
}
