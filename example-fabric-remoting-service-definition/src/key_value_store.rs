use dashmap::DashMap;
use fabric_remoting::{ApplicationFault, RemoteExceptionType};
use fabric_remoting_service::{
    InterfaceSignature, MethodDispatchTableBuilder, ParameterSignature, RemotedInterface,
    RemotingKind, RemotingMethod, ReturnShape,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_value(&self, key: String) -> Result<String, KeyNotFound>;

    async fn set_value(&self, key: String, value: String);

    async fn count(&self) -> u64;

    /// Returns `value` after `delay_millis`, unless canceled first.
    async fn slow_echo(
        &self,
        value: String,
        delay_millis: u64,
        cancellation: CancellationToken,
    ) -> Result<String, ApplicationFault>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("key not found: {key}")]
pub struct KeyNotFound {
    pub key: String,
}

impl RemoteExceptionType for KeyNotFound {
    const TYPE_NAME: &'static str = "Example.Storage.KeyNotFound";
}

pub struct KeyValueStoreInterface;

pub struct GetValue;
pub struct SetValue;
pub struct Count;
pub struct SlowEcho;

impl RemotingMethod for GetValue {
    type Interface = KeyValueStoreInterface;
    type Args = (String,);
    type Output = String;
    const NAME: &'static str = "GetValue";
    const PARAMETERS: &'static [ParameterSignature] = &[ParameterSignature::value("key")];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotingMethod for SetValue {
    type Interface = KeyValueStoreInterface;
    type Args = (String, String);
    type Output = ();
    const NAME: &'static str = "SetValue";
    const PARAMETERS: &'static [ParameterSignature] = &[
        ParameterSignature::value("key"),
        ParameterSignature::value("value"),
    ];
    const RETURNS: ReturnShape = ReturnShape::Task;
}

impl RemotingMethod for Count {
    type Interface = KeyValueStoreInterface;
    type Args = ();
    type Output = u64;
    const NAME: &'static str = "Count";
    const PARAMETERS: &'static [ParameterSignature] = &[];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotingMethod for SlowEcho {
    type Interface = KeyValueStoreInterface;
    type Args = (String, u64);
    type Output = String;
    const NAME: &'static str = "SlowEcho";
    const PARAMETERS: &'static [ParameterSignature] = &[
        ParameterSignature::value("value"),
        ParameterSignature::value("delayMillis"),
        ParameterSignature::cancellation("cancellationToken"),
    ];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotedInterface for KeyValueStoreInterface {
    type Target = dyn KeyValueStore;
    const NAMESPACE: &'static str = "Example.Storage";
    const NAME: &'static str = "IKeyValueStore";
    const KIND: RemotingKind = RemotingKind::Service;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>()
            .method::<GetValue>()
            .method::<SetValue>()
            .method::<Count>()
            .method::<SlowEcho>()
    }

    fn register_methods(table: &mut MethodDispatchTableBuilder<'_, Self>) {
        table
            .method::<GetValue, _, _>(|store, (key,), _| async move {
                store
                    .get_value(key)
                    .await
                    .map_err(|err| ApplicationFault::from_exception(&err))
            })
            .method::<SetValue, _, _>(|store, (key, value), _| async move {
                store.set_value(key, value).await;
                Ok::<_, ApplicationFault>(())
            })
            .method::<Count, _, _>(|store, (), _| async move {
                Ok::<_, ApplicationFault>(store.count().await)
            })
            .method::<SlowEcho, _, _>(|store, (value, delay_millis), token| async move {
                store.slow_echo(value, delay_millis, token).await
            });
    }
}

/// Process-local [`KeyValueStore`].
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    entries: DashMap<String, String>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get_value(&self, key: String) -> Result<String, KeyNotFound> {
        match self.entries.get(&key) {
            Some(value) => Ok(value.value().clone()),
            None => Err(KeyNotFound { key }),
        }
    }

    async fn set_value(&self, key: String, value: String) {
        self.entries.insert(key, value);
    }

    async fn count(&self) -> u64 {
        self.entries.len() as u64
    }

    async fn slow_echo(
        &self,
        value: String,
        delay_millis: u64,
        cancellation: CancellationToken,
    ) -> Result<String, ApplicationFault> {
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(delay_millis)) => Ok(value),
            _ = cancellation.cancelled() => Err(ApplicationFault::Canceled),
        }
    }
}
