use example_fabric_remoting_service_definition::{
    counter::CounterActorInterface, key_value_store::KeyValueStoreInterface,
};
use fabric_remoting_service::{
    ContractError, IdScheme, RemotingKind, RemotingRegistry, ReturnShape, compute_method_id,
};
use fabric_remoting_service_caller::ProxyGenerator;
use std::sync::Arc;

#[test]
fn test_tables_are_generated_once_per_scheme() {
    let generator = ProxyGenerator::new(Arc::new(RemotingRegistry::new()));

    let first = generator
        .generate::<KeyValueStoreInterface>(IdScheme::Crc64)
        .unwrap();
    let again = generator
        .generate::<KeyValueStoreInterface>(IdScheme::Crc64)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(generator.generated_count(), 1);

    let legacy = generator
        .generate::<KeyValueStoreInterface>(IdScheme::Legacy)
        .unwrap();
    assert_ne!(first.interface_id(), legacy.interface_id());
    assert_eq!(generator.generated_count(), 2);
    assert_eq!(generator.registry().description_count(), 2);
}

#[test]
fn test_method_shims_carry_ids_and_argument_names() {
    let generator = ProxyGenerator::new(Arc::new(RemotingRegistry::new()));
    let table = generator
        .generate::<KeyValueStoreInterface>(IdScheme::Crc64)
        .unwrap();

    let set_value = table.method("SetValue").unwrap();
    assert_eq!(
        set_value.method_id,
        compute_method_id(IdScheme::Crc64, "Example.Storage", "IKeyValueStore", "SetValue")
    );
    assert_eq!(&*set_value.argument_names, &["key", "value"]);
    assert_eq!(set_value.returns, ReturnShape::Task);
    assert!(!set_value.cancellable);

    let slow_echo = table.method("SlowEcho").unwrap();
    assert!(slow_echo.cancellable);
    assert_eq!(&*slow_echo.argument_names, &["value", "delayMillis"]);
}

#[test]
fn test_unknown_method_is_a_contract_error() {
    let generator = ProxyGenerator::new(Arc::new(RemotingRegistry::new()));
    let table = generator
        .generate::<KeyValueStoreInterface>(IdScheme::Crc64)
        .unwrap();

    assert_eq!(
        table.method("Delete").unwrap_err(),
        ContractError::UnknownMethod {
            interface: "Example.Storage.IKeyValueStore".into(),
            method: "Delete".into(),
        }
    );
}

#[test]
fn test_kind_is_checked() {
    let generator = ProxyGenerator::new(Arc::new(RemotingRegistry::new()));

    let err = generator
        .generate_of_kind::<CounterActorInterface>(IdScheme::Crc64, RemotingKind::Service)
        .unwrap_err();
    assert_eq!(
        err,
        ContractError::UnexpectedKind {
            interface: "Example.Actors.ICounterActor".into(),
            expected: RemotingKind::Service,
            found: RemotingKind::Actor,
        }
    );
    assert!(
        generator
            .generate_of_kind::<CounterActorInterface>(IdScheme::Crc64, RemotingKind::Actor)
            .is_ok()
    );
}
