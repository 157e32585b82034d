use fabric_remoting_service::{
    ContractError, IdScheme, InterfaceDescription, InterfaceSignature, MethodSignature,
    ParameterSignature, RemotingKind, ReturnShape, compute_interface_id, compute_method_id,
};

fn service() -> InterfaceSignature {
    InterfaceSignature::new("Tests", "IInventory", RemotingKind::Service)
}

#[test]
fn test_valid_interface_is_described() {
    let signature = service()
        .with_method(
            MethodSignature::new("Reserve", ReturnShape::TaskOf)
                .with_parameter(ParameterSignature::value("sku"))
                .with_parameter(ParameterSignature::value("quantity"))
                .with_parameter(ParameterSignature::cancellation("token")),
        )
        .with_method(MethodSignature::new("Reset", ReturnShape::Task));

    let description = InterfaceDescription::build(&signature, IdScheme::Crc64).unwrap();

    assert_eq!(
        description.id(),
        compute_interface_id(IdScheme::Crc64, "Tests", "IInventory")
    );
    assert_eq!(description.full_name(), "Tests.IInventory");
    assert_eq!(description.methods().len(), 2);

    let reserve = description.method_by_name("Reserve").unwrap();
    assert_eq!(
        reserve.id(),
        compute_method_id(IdScheme::Crc64, "Tests", "IInventory", "Reserve")
    );
    assert_eq!(reserve.argument_names(), vec!["sku", "quantity"]);
    assert!(reserve.has_cancellation());
    assert_eq!(description.method(reserve.id()), Some(reserve));

    let reset = description.method_by_name("Reset").unwrap();
    assert!(!reset.has_cancellation());
    assert!(reset.arguments().is_empty());
}

#[test]
fn test_overloads_are_rejected() {
    let signature = service()
        .with_method(
            MethodSignature::new("Reserve", ReturnShape::Task)
                .with_parameter(ParameterSignature::value("sku")),
        )
        .with_method(
            MethodSignature::new("Reserve", ReturnShape::Task)
                .with_parameter(ParameterSignature::value("sku"))
                .with_parameter(ParameterSignature::value("quantity")),
        );

    let err = InterfaceDescription::build(&signature, IdScheme::Crc64).unwrap_err();
    assert_eq!(
        err,
        ContractError::OverloadedMethod {
            interface: "Tests.IInventory".into(),
            method: "Reserve".into(),
        }
    );
}

#[test]
fn test_generic_interface_is_rejected() {
    let signature = service()
        .with_generic_parameters(1)
        .with_method(MethodSignature::new("Reset", ReturnShape::Task));

    assert!(matches!(
        InterfaceDescription::build(&signature, IdScheme::Legacy),
        Err(ContractError::GenericInterface { .. })
    ));
}

#[test]
fn test_generic_method_is_rejected() {
    let signature = service()
        .with_method(MethodSignature::new("Convert", ReturnShape::TaskOf).with_generic_parameters(1));

    assert!(matches!(
        InterfaceDescription::build(&signature, IdScheme::Crc64),
        Err(ContractError::GenericMethod { .. })
    ));
}

#[test]
fn test_variadic_parameter_is_rejected() {
    let signature = service().with_method(
        MethodSignature::new("ReserveAll", ReturnShape::Task)
            .with_parameter(ParameterSignature::variadic("skus")),
    );

    assert!(matches!(
        InterfaceDescription::build(&signature, IdScheme::Crc64),
        Err(ContractError::VariadicParameter { parameter, .. }) if parameter == "skus"
    ));
}

#[test]
fn test_return_shapes_follow_interface_kind() {
    let void_service = service().with_method(MethodSignature::new("Fire", ReturnShape::Void));
    assert!(matches!(
        InterfaceDescription::build(&void_service, IdScheme::Crc64),
        Err(ContractError::InvalidReturnShape {
            kind: RemotingKind::Service,
            found: ReturnShape::Void,
            ..
        })
    ));

    let awaited_event = InterfaceSignature::new("Tests", "IInventoryEvents", RemotingKind::Event)
        .with_method(MethodSignature::new("StockChanged", ReturnShape::Task));
    assert!(matches!(
        InterfaceDescription::build(&awaited_event, IdScheme::Crc64),
        Err(ContractError::InvalidReturnShape {
            kind: RemotingKind::Event,
            ..
        })
    ));

    let event = InterfaceSignature::new("Tests", "IInventoryEvents", RemotingKind::Event)
        .with_method(
            MethodSignature::new("StockChanged", ReturnShape::Void)
                .with_parameter(ParameterSignature::value("sku")),
        );
    assert!(InterfaceDescription::build(&event, IdScheme::Crc64).is_ok());
}

#[test]
fn test_cancellation_must_be_last_parameter() {
    let signature = service().with_method(
        MethodSignature::new("Reserve", ReturnShape::Task)
            .with_parameter(ParameterSignature::cancellation("token"))
            .with_parameter(ParameterSignature::value("sku")),
    );

    assert!(matches!(
        InterfaceDescription::build(&signature, IdScheme::Crc64),
        Err(ContractError::MisplacedCancellation { parameter, .. }) if parameter == "token"
    ));
}

#[test]
fn test_only_cancellation_parameter_is_allowed() {
    let signature = service().with_method(
        MethodSignature::new("Drain", ReturnShape::Task)
            .with_parameter(ParameterSignature::cancellation("token")),
    );

    let description = InterfaceDescription::build(&signature, IdScheme::Crc64).unwrap();
    let drain = description.method_by_name("Drain").unwrap();
    assert!(drain.has_cancellation());
    assert!(drain.arguments().is_empty());
}

#[test]
fn test_argument_arity_must_match_parameters() {
    let mut method = MethodSignature::new("Reserve", ReturnShape::Task)
        .with_parameter(ParameterSignature::value("sku"));
    method.argument_arity = Some(2);

    assert_eq!(
        InterfaceDescription::build(&service().with_method(method), IdScheme::Crc64),
        Err(ContractError::ArgumentArityMismatch {
            interface: "Tests.IInventory".into(),
            method: "Reserve".into(),
            declared: 1,
            actual: 2,
        })
    );
}

#[test]
fn test_same_signature_differs_per_scheme() {
    let signature = service().with_method(MethodSignature::new("Reset", ReturnShape::Task));

    let legacy = InterfaceDescription::build(&signature, IdScheme::Legacy).unwrap();
    let crc = InterfaceDescription::build(&signature, IdScheme::Crc64).unwrap();

    assert_eq!(legacy.scheme(), IdScheme::Legacy);
    assert_eq!(crc.scheme(), IdScheme::Crc64);
    assert_ne!(legacy.id(), crc.id());
    assert_eq!(legacy.methods()[0].name(), crc.methods()[0].name());
}
