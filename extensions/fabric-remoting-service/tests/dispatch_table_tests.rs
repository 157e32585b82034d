use fabric_remoting::{
    ApplicationFault, CodecKind, NamedArgument, RequestBody, ResponseBody, SerializationProvider,
};
use fabric_remoting_service::{
    ContractError, DispatchFault, IdScheme, InterfaceSignature, MethodDispatchTableBuilder,
    ParameterSignature, RemotedInterface, RemotingKind, RemotingMethod, RemotingRegistry,
    ReturnShape,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

// --- Test Setup ---

trait Calculator: Send + Sync {
    fn add(&self, a: i64, b: i64) -> i64;
    fn name(&self) -> String;
}

struct Adder;

impl Calculator for Adder {
    fn add(&self, a: i64, b: i64) -> i64 {
        a + b
    }

    fn name(&self) -> String {
        "adder".into()
    }
}

struct CalculatorInterface;

struct Add;
struct Name;
struct Delay;
struct Fail;

impl RemotingMethod for Add {
    type Interface = CalculatorInterface;
    type Args = (i64, i64);
    type Output = i64;
    const NAME: &'static str = "Add";
    const PARAMETERS: &'static [ParameterSignature] =
        &[ParameterSignature::value("a"), ParameterSignature::value("b")];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotingMethod for Name {
    type Interface = CalculatorInterface;
    type Args = ();
    type Output = String;
    const NAME: &'static str = "Name";
    const PARAMETERS: &'static [ParameterSignature] = &[];
    const RETURNS: ReturnShape = ReturnShape::TaskOf;
}

impl RemotingMethod for Delay {
    type Interface = CalculatorInterface;
    type Args = (u64,);
    type Output = ();
    const NAME: &'static str = "Delay";
    const PARAMETERS: &'static [ParameterSignature] = &[
        ParameterSignature::value("millis"),
        ParameterSignature::cancellation("token"),
    ];
    const RETURNS: ReturnShape = ReturnShape::Task;
}

impl RemotingMethod for Fail {
    type Interface = CalculatorInterface;
    type Args = (String,);
    type Output = ();
    const NAME: &'static str = "Fail";
    const PARAMETERS: &'static [ParameterSignature] = &[ParameterSignature::value("reason")];
    const RETURNS: ReturnShape = ReturnShape::Task;
}

async fn delay(millis: u64, token: CancellationToken) -> Result<(), ApplicationFault> {
    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(millis)) => Ok(()),
        _ = token.cancelled() => Err(ApplicationFault::Canceled),
    }
}

async fn fail(reason: String) -> Result<(), ApplicationFault> {
    Err(ApplicationFault::new("Tests.CalculatorFault", reason))
}

impl RemotedInterface for CalculatorInterface {
    type Target = dyn Calculator;
    const NAMESPACE: &'static str = "Tests";
    const NAME: &'static str = "ICalculator";
    const KIND: RemotingKind = RemotingKind::Service;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>()
            .method::<Add>()
            .method::<Name>()
            .method::<Delay>()
            .method::<Fail>()
    }

    fn register_methods(table: &mut MethodDispatchTableBuilder<'_, Self>) {
        table
            .method::<Add, _, _>(|target, (a, b), _| async move {
                Ok::<_, ApplicationFault>(target.add(a, b))
            })
            .method::<Name, _, _>(|target, (), _| async move {
                Ok::<_, ApplicationFault>(target.name())
            })
            .method::<Delay, _, _>(|_, (millis,), token| delay(millis, token))
            .method::<Fail, _, _>(|_, (reason,), _| fail(reason));
    }
}

/// Declares every method but forgets to bind one of them.
struct IncompleteInterface;

struct Only;

impl RemotingMethod for Only {
    type Interface = IncompleteInterface;
    type Args = ();
    type Output = ();
    const NAME: &'static str = "Only";
    const PARAMETERS: &'static [ParameterSignature] = &[];
    const RETURNS: ReturnShape = ReturnShape::Task;
}

impl RemotedInterface for IncompleteInterface {
    type Target = dyn Calculator;
    const NAMESPACE: &'static str = "Tests";
    const NAME: &'static str = "IIncomplete";
    const KIND: RemotingKind = RemotingKind::Service;

    fn signature() -> InterfaceSignature {
        InterfaceSignature::of::<Self>().method::<Only>()
    }

    fn register_methods(_table: &mut MethodDispatchTableBuilder<'_, Self>) {}
}

fn method_id(registry: &RemotingRegistry, name: &str) -> i32 {
    registry
        .describe::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap()
        .method_by_name(name)
        .unwrap()
        .id()
}

fn target() -> Arc<dyn Calculator> {
    Arc::new(Adder)
}

// --- Tests ---

#[tokio::test]
async fn test_wrapped_arguments_round_trip() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();
    let codec = CodecKind::Bitcode;

    let body = RequestBody::Wrapped(codec.encode(&(2_i64, 40_i64)).unwrap());
    let response = table
        .dispatch(
            target(),
            method_id(&registry, "Add"),
            body,
            SerializationProvider::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    match response {
        ResponseBody::Wrapped(bytes) => assert_eq!(codec.decode::<i64>(&bytes).unwrap(), 42),
        other => panic!("unexpected response body: {other:?}"),
    }
}

#[tokio::test]
async fn test_unwrapped_arguments_round_trip() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();
    let codec = CodecKind::Json;

    // Named arguments may arrive in any order.
    let body = RequestBody::Unwrapped(vec![
        NamedArgument::new("b", codec.encode(&5_i64).unwrap()),
        NamedArgument::new("a", codec.encode(&-8_i64).unwrap()),
    ]);
    let response = table
        .dispatch(
            target(),
            method_id(&registry, "Add"),
            body,
            SerializationProvider::uniform(codec),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    match response {
        ResponseBody::Unwrapped(argument) => {
            assert_eq!(argument.name, "retVal");
            assert_eq!(codec.decode::<i64>(&argument.value).unwrap(), -3);
        }
        other => panic!("unexpected response body: {other:?}"),
    }
}

#[tokio::test]
async fn test_zero_argument_method_accepts_empty_body() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();

    let response = table
        .dispatch(
            target(),
            method_id(&registry, "Name"),
            RequestBody::Empty,
            SerializationProvider::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let value = response.value().unwrap();
    assert_eq!(CodecKind::Bitcode.decode::<String>(value).unwrap(), "adder");
}

#[tokio::test]
async fn test_cancellation_token_reaches_handler() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();
    let token = CancellationToken::new();

    let call = table.dispatch(
        target(),
        method_id(&registry, "Delay"),
        RequestBody::Wrapped(CodecKind::Bitcode.encode(&(60_000_u64,)).unwrap()),
        SerializationProvider::default(),
        token.clone(),
    );
    token.cancel();

    let result = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("handler should observe cancellation");
    assert_eq!(result, Err(DispatchFault::Canceled));
}

#[tokio::test]
async fn test_application_fault_is_reported() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();

    let result = table
        .dispatch(
            target(),
            method_id(&registry, "Fail"),
            RequestBody::Wrapped(CodecKind::Bitcode.encode(&("boom".to_string(),)).unwrap()),
            SerializationProvider::default(),
            CancellationToken::new(),
        )
        .await;

    match result {
        Err(DispatchFault::Application(information)) => {
            assert_eq!(information.type_name, "Tests.CalculatorFault");
            assert_eq!(information.message, "boom");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_method_is_not_found() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();

    let result = table
        .dispatch(
            target(),
            12345,
            RequestBody::Empty,
            SerializationProvider::default(),
            CancellationToken::new(),
        )
        .await;

    assert_eq!(
        result,
        Err(DispatchFault::MethodNotFound {
            interface_id: table.interface_id(),
            method_id: 12345,
        })
    );
}

#[tokio::test]
async fn test_malformed_arguments_are_codec_faults() {
    let registry = RemotingRegistry::new();
    let table = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();

    let result = table
        .dispatch(
            target(),
            method_id(&registry, "Add"),
            RequestBody::Unwrapped(vec![NamedArgument::new(
                "a",
                CodecKind::Bitcode.encode(&1_i64).unwrap(),
            )]),
            SerializationProvider::default(),
            CancellationToken::new(),
        )
        .await;

    assert!(matches!(result, Err(DispatchFault::Codec(_))));
}

#[test]
fn test_missing_handler_fails_table_build() {
    let registry = RemotingRegistry::new();
    let err = registry
        .dispatch_table::<IncompleteInterface>(IdScheme::Crc64)
        .err()
        .unwrap();

    assert_eq!(
        err,
        ContractError::MissingHandler {
            interface: "Tests.IIncomplete".into(),
            method: "Only".into(),
        }
    );
    assert_eq!(registry.dispatch_table_count(), 0);
}

#[test]
fn test_registry_builds_once_per_scheme() {
    let registry = RemotingRegistry::new();

    let first = registry.describe::<CalculatorInterface>(IdScheme::Crc64).unwrap();
    let second = registry.describe::<CalculatorInterface>(IdScheme::Crc64).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let legacy = registry.describe::<CalculatorInterface>(IdScheme::Legacy).unwrap();
    assert_ne!(legacy.id(), first.id());
    assert_eq!(registry.description_count(), 2);

    let table_a = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();
    let table_b = registry
        .dispatch_table::<CalculatorInterface>(IdScheme::Crc64)
        .unwrap();
    assert!(Arc::ptr_eq(&table_a, &table_b));
    assert!(Arc::ptr_eq(table_a.description(), &first));
    assert_eq!(registry.dispatch_table_count(), 1);
}

#[tokio::test]
async fn test_concurrent_first_use_builds_one_description() {
    let registry = Arc::new(RemotingRegistry::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move {
                registry
                    .describe::<CalculatorInterface>(IdScheme::Crc64)
                    .unwrap()
            })
        })
        .collect();

    let mut descriptions = Vec::new();
    for handle in handles {
        descriptions.push(handle.await.unwrap());
    }

    assert!(descriptions.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(registry.description_count(), 1);
}
