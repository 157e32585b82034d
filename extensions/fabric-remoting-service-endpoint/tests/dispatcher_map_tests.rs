use example_fabric_remoting_service_definition::{
    counter::CounterEventsInterface,
    key_value_store::{InMemoryKeyValueStore, KeyValueStore, KeyValueStoreInterface},
};
use fabric_remoting_service::{
    ContractError, IdScheme, InterfaceSignature, MethodDispatchTableBuilder, RemotedInterface,
    RemotingKind, RemotingMethod, RemotingRegistry, RemotingSettings, ReturnShape,
    compute_interface_id,
};
use fabric_remoting_service_endpoint::{DispatchError, DispatcherMap, RegistrationError};
use fabric_remoting::ApplicationFault;
use std::sync::Arc;

// --- Test Setup ---

struct Ping;

/// Same name as `KeyValueStoreInterface`, different type.
struct ImpostorStoreInterface;

struct Hello;

impl RemotingMethod for Hello {
    type Interface = ImpostorStoreInterface;
    type Args = ();
    type Output = ();
    const NAME: &'static str = "Hello";
    const PARAMETERS: &'static [fabric_remoting_service::ParameterSignature] = &[];
    const RETURNS: ReturnShape = ReturnShape::Task;
}

impl RemotedInterface for ImpostorStoreInterface {
    type Target = Ping;
    const NAMESPACE: &'static str = "Example.Storage";
    const NAME: &'static str = "IKeyValueStore";
    const KIND: RemotingKind = RemotingKind::Service;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>().method::<Hello>()
    }

    fn register_methods(table: &mut MethodDispatchTableBuilder<'_, Self>) {
        table.method::<Hello, _, _>(|_, (), _| async move { Ok::<_, ApplicationFault>(()) });
    }
}

/// Declares a method but never binds a handler to it.
struct UnfinishedInterface;

struct Forgotten;

impl RemotingMethod for Forgotten {
    type Interface = UnfinishedInterface;
    type Args = ();
    type Output = ();
    const NAME: &'static str = "Forgotten";
    const PARAMETERS: &'static [fabric_remoting_service::ParameterSignature] = &[];
    const RETURNS: ReturnShape = ReturnShape::Task;
}

impl RemotedInterface for UnfinishedInterface {
    type Target = Ping;
    const NAMESPACE: &'static str = "Tests";
    const NAME: &'static str = "IUnfinished";
    const KIND: RemotingKind = RemotingKind::Service;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>().method::<Forgotten>()
    }

    fn register_methods(_table: &mut MethodDispatchTableBuilder<'_, Self>) {}
}

fn store() -> Arc<dyn KeyValueStore> {
    Arc::new(InMemoryKeyValueStore::new())
}

// --- Tests ---

#[test]
fn test_interface_is_registered_under_every_accepted_scheme() {
    let registry = Arc::new(RemotingRegistry::new());
    let settings =
        RemotingSettings::default().with_accepted_id_schemes([IdScheme::Crc64, IdScheme::Legacy]);

    let map = DispatcherMap::builder(registry.clone(), &settings)
        .register::<KeyValueStoreInterface>(store())
        .unwrap()
        .build();

    assert_eq!(map.len(), 2);
    for scheme in [IdScheme::Crc64, IdScheme::Legacy] {
        let id = compute_interface_id(scheme, "Example.Storage", "IKeyValueStore");
        let dispatcher = map.get_dispatcher(id).unwrap();
        assert_eq!(dispatcher.description().scheme(), scheme);
    }
}

#[test]
fn test_unknown_interface_is_reported() {
    let registry = Arc::new(RemotingRegistry::new());
    let map = DispatcherMap::builder(registry, &RemotingSettings::default()).build();

    assert!(map.is_empty());
    assert_eq!(
        map.get_dispatcher(1234).err(),
        Some(DispatchError::InterfaceNotFound { interface_id: 1234 })
    );
}

#[test]
fn test_registering_an_interface_twice_fails() {
    let registry = Arc::new(RemotingRegistry::new());
    let err = DispatcherMap::builder(registry, &RemotingSettings::default())
        .register::<KeyValueStoreInterface>(store())
        .unwrap()
        .register::<KeyValueStoreInterface>(store())
        .err()
        .unwrap();

    assert!(matches!(err, RegistrationError::DuplicateInterface { .. }));
}

#[test]
fn test_colliding_interface_ids_fail_fast() {
    let registry = Arc::new(RemotingRegistry::new());
    let err = DispatcherMap::builder(registry, &RemotingSettings::default())
        .register::<KeyValueStoreInterface>(store())
        .unwrap()
        .register::<ImpostorStoreInterface>(Arc::new(Ping))
        .err()
        .unwrap();

    match err {
        RegistrationError::IdCollision {
            id,
            existing,
            incoming,
        } => {
            assert_eq!(
                id,
                compute_interface_id(IdScheme::Crc64, "Example.Storage", "IKeyValueStore")
            );
            assert_eq!(existing, "Example.Storage.IKeyValueStore");
            assert_eq!(incoming, "Example.Storage.IKeyValueStore");
        }
        other => panic!("Unexpected error: {:?}", other),
    }
}

#[test]
fn test_event_interfaces_are_not_dispatchable() {
    struct NoSubscriber;
    impl example_fabric_remoting_service_definition::counter::CounterEvents for NoSubscriber {
        fn count_changed(&self, _value: i64) {}
    }

    let registry = Arc::new(RemotingRegistry::new());
    let err = DispatcherMap::builder(registry, &RemotingSettings::default())
        .register::<CounterEventsInterface>(Arc::new(NoSubscriber))
        .err()
        .unwrap();

    assert!(matches!(err, RegistrationError::EventInterface { .. }));
}

#[test]
fn test_missing_handler_surfaces_as_contract_error() {
    let registry = Arc::new(RemotingRegistry::new());
    let err = DispatcherMap::builder(registry, &RemotingSettings::default())
        .register::<UnfinishedInterface>(Arc::new(Ping))
        .err()
        .unwrap();

    assert_eq!(
        err,
        RegistrationError::Contract(ContractError::MissingHandler {
            interface: "Tests.IUnfinished".into(),
            method: "Forgotten".into(),
        })
    );
}
