use crate::{
    ArgumentList, BodyWrapMode, ContractError, InterfaceDescription, RemotedInterface,
    RemotingMethod,
};
use fabric_remoting::{
    ApplicationFault, CodecError, CodecKind, ExceptionInformation, NamedArgument, RequestBody,
    ResponseBody, SerializationProvider, constants::RETURN_VALUE_ARGUMENT_NAME,
};
use futures::future::BoxFuture;
use serde::Serialize;
use std::{collections::HashMap, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Why a dispatched call produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchFault {
    #[error("method {method_id} is not implemented by interface {interface_id}")]
    MethodNotFound { interface_id: i32, method_id: i32 },

    #[error("application fault: {0}")]
    Application(ExceptionInformation),

    #[error("the call was canceled")]
    Canceled,

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<ApplicationFault> for DispatchFault {
    fn from(fault: ApplicationFault) -> Self {
        match fault {
            ApplicationFault::Exception(information) => DispatchFault::Application(information),
            ApplicationFault::Canceled => DispatchFault::Canceled,
        }
    }
}

pub type DispatchFuture = BoxFuture<'static, Result<ResponseBody, DispatchFault>>;

type MethodDispatchEntry<T> = Arc<
    dyn Fn(Arc<T>, RequestBody, SerializationProvider, CancellationToken) -> DispatchFuture
        + Send
        + Sync,
>;

/// Binds handlers to the methods of one interface description.
///
/// Handed to [`RemotedInterface::register_methods`]; problems are collected
/// and reported when the table is built.
pub struct MethodDispatchTableBuilder<'d, I: RemotedInterface> {
    description: &'d InterfaceDescription,
    entries: HashMap<i32, MethodDispatchEntry<I::Target>>,
    errors: Vec<ContractError>,
}

impl<'d, I: RemotedInterface> MethodDispatchTableBuilder<'d, I> {
    fn new(description: &'d InterfaceDescription) -> Self {
        Self {
            description,
            entries: HashMap::with_capacity(description.methods().len()),
            errors: Vec::new(),
        }
    }

    /// Registers the handler of method `M`.
    ///
    /// The handler receives the target object, the decoded argument tuple and
    /// a cancellation token that fires when the caller cancels the call.
    pub fn method<M, F, Fut>(&mut self, handler: F) -> &mut Self
    where
        M: RemotingMethod<Interface = I>,
        F: Fn(Arc<I::Target>, M::Args, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, ApplicationFault>> + Send + 'static,
    {
        let Some(method) = self.description.method_by_name(M::NAME) else {
            self.errors.push(ContractError::UnknownMethod {
                interface: self.description.full_name(),
                method: M::NAME.to_string(),
            });
            return self;
        };

        if self.entries.contains_key(&method.id()) {
            self.errors.push(ContractError::DuplicateHandler {
                interface: self.description.full_name(),
                method: M::NAME.to_string(),
            });
            return self;
        }

        let names: Arc<[&'static str]> = method.argument_names().into();
        let entry: MethodDispatchEntry<I::Target> = Arc::new(
            move |target: Arc<I::Target>,
                  body: RequestBody,
                  serialization: SerializationProvider,
                  cancellation: CancellationToken|
                  -> DispatchFuture {
                let (args, mode) =
                    match decode_arguments::<M::Args>(&body, &names, serialization.request) {
                        Ok(decoded) => decoded,
                        Err(err) => {
                            let fault = DispatchFault::from(err);
                            return Box::pin(async move { Err::<ResponseBody, _>(fault) });
                        }
                    };

                let call = handler(target, args, cancellation);
                Box::pin(async move {
                    let output = call.await.map_err(DispatchFault::from)?;
                    encode_output(&output, mode, serialization.response).map_err(DispatchFault::from)
                })
            },
        );

        self.entries.insert(method.id(), entry);
        self
    }

    fn finish(
        self,
        description: Arc<InterfaceDescription>,
    ) -> Result<MethodDispatchTable<I>, ContractError> {
        if let Some(err) = self.errors.into_iter().next() {
            return Err(err);
        }

        if let Some(missing) = description
            .methods()
            .iter()
            .find(|method| !self.entries.contains_key(&method.id()))
        {
            return Err(ContractError::MissingHandler {
                interface: description.full_name(),
                method: missing.name().to_string(),
            });
        }

        Ok(MethodDispatchTable {
            description,
            entries: self.entries,
        })
    }
}

/// `methodId -> handler` for one interface, built once and shared.
pub struct MethodDispatchTable<I: RemotedInterface> {
    description: Arc<InterfaceDescription>,
    entries: HashMap<i32, MethodDispatchEntry<I::Target>>,
}

impl<I: RemotedInterface> MethodDispatchTable<I> {
    pub fn build(description: Arc<InterfaceDescription>) -> Result<Self, ContractError> {
        let mut builder = MethodDispatchTableBuilder::<I>::new(&description);
        I::register_methods(&mut builder);
        builder.finish(description.clone())
    }

    #[inline]
    pub fn interface_id(&self) -> i32 {
        self.description.id()
    }

    pub fn description(&self) -> &Arc<InterfaceDescription> {
        &self.description
    }

    pub fn contains_method(&self, method_id: i32) -> bool {
        self.entries.contains_key(&method_id)
    }

    /// Starts the handler of `method_id` against `target`.
    pub fn dispatch(
        &self,
        target: Arc<I::Target>,
        method_id: i32,
        body: RequestBody,
        serialization: SerializationProvider,
        cancellation: CancellationToken,
    ) -> DispatchFuture {
        match self.entries.get(&method_id) {
            Some(entry) => entry(target, body, serialization, cancellation),
            None => {
                let interface_id = self.interface_id();
                Box::pin(async move {
                    Err::<ResponseBody, _>(DispatchFault::MethodNotFound {
                        interface_id,
                        method_id,
                    })
                })
            }
        }
    }
}

fn decode_arguments<A: ArgumentList>(
    body: &RequestBody,
    names: &[&'static str],
    codec: CodecKind,
) -> Result<(A, BodyWrapMode), CodecError> {
    match body {
        RequestBody::Empty => Ok((A::decode_named(&[], names, codec)?, BodyWrapMode::Wrapped)),
        RequestBody::Wrapped(bytes) => Ok((codec.decode::<A>(bytes)?, BodyWrapMode::Wrapped)),
        RequestBody::Unwrapped(arguments) => Ok((
            A::decode_named(arguments, names, codec)?,
            BodyWrapMode::Unwrapped,
        )),
    }
}

fn encode_output<O: Serialize>(
    output: &O,
    mode: BodyWrapMode,
    codec: CodecKind,
) -> Result<ResponseBody, CodecError> {
    let value = codec.encode(output)?;
    Ok(match mode {
        BodyWrapMode::Wrapped => ResponseBody::Wrapped(value),
        BodyWrapMode::Unwrapped => {
            ResponseBody::Unwrapped(NamedArgument::new(RETURN_VALUE_ARGUMENT_NAME, value))
        }
    })
}
