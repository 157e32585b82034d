use fabric_remoting::ApplicationFault;
use fabric_remoting_service::{
    InterfaceSignature, MethodDispatchTableBuilder, ParameterSignature, RemotedInterface,
    RemotingKind, RemotingMethod, ReturnShape,
};

/// A per-actor counter.
#[async_trait::async_trait]
pub trait Counter: Send + Sync {
    /// Adds `by` and returns the new value.
    async fn increment(&self, by: i64) -> i64;

    async fn get(&self) -> i64;
}

pub struct CounterActorInterface;

pub struct Increment;
pub struct Get;

impl RemotingMethod for Increment {
    type Interface = CounterActorInterface;
    type Args = (i64,);
    type Output = i64;
    const NAME: &'static str = "Increment";
    const PARAMETERS: &'static [ParameterSignature] = &[ParameterSignature::value("by")];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotingMethod for Get {
    type Interface = CounterActorInterface;
    type Args = ();
    type Output = i64;
    const NAME: &'static str = "Get";
    const PARAMETERS: &'static [ParameterSignature] = &[];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotedInterface for CounterActorInterface {
    type Target = dyn Counter;
    const NAMESPACE: &'static str = "Example.Actors";
    const NAME: &'static str = "ICounterActor";
    const KIND: RemotingKind = RemotingKind::Actor;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>()
            .method::<Increment>()
            .method::<Get>()
    }

    fn register_methods(table: &mut MethodDispatchTableBuilder<'_, Self>) {
        table
            .method::<Increment, _, _>(|counter, (by,), _| async move {
                Ok::<_, ApplicationFault>(counter.increment(by).await)
            })
            .method::<Get, _, _>(|counter, (), _| async move {
                Ok::<_, ApplicationFault>(counter.get().await)
            });
    }
}

/// Notifications a counter actor raises to its subscribers.
pub trait CounterEvents: Send + Sync {
    fn count_changed(&self, value: i64);
}

pub struct CounterEventsInterface;

pub struct CountChanged;

impl RemotingMethod for CountChanged {
    type Interface = CounterEventsInterface;
    type Args = (i64,);
    type Output = ();
    const NAME: &'static str = "CountChanged";
    const PARAMETERS: &'static [ParameterSignature] = &[ParameterSignature::value("value")];
    const RETURNS: ReturnShape = ReturnShape::Void;
}

impl RemotedInterface for CounterEventsInterface {
    type Target = dyn CounterEvents;
    const NAMESPACE: &'static str = "Example.Actors";
    const NAME: &'static str = "ICounterEvents";
    const KIND: RemotingKind = RemotingKind::Event;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>().method::<CountChanged>()
    }

    fn register_methods(table: &mut MethodDispatchTableBuilder<'_, Self>) {
        table.method::<CountChanged, _, _>(|subscriber, (value,), _| async move {
            subscriber.count_changed(value);
            Ok::<_, ApplicationFault>(())
        });
    }
}
