use crate::{ArgumentList, MethodDispatchTableBuilder};
use serde::{Serialize, de::DeserializeOwned};

/// How an interface is remoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemotingKind {
    /// A stateless or stateful service addressed by partition key.
    Service,
    /// An actor addressed by `ActorId`.
    Actor,
    /// One-way notifications from an actor to its subscribers.
    Event,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnShape {
    /// No response is awaited. Only valid on event interfaces.
    Void,
    /// Asynchronous completion without a value.
    Task,
    /// Asynchronous completion with a value.
    TaskOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterKind {
    Value,
    Cancellation,
    Variadic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParameterSignature {
    pub name: &'static str,
    pub kind: ParameterKind,
}

impl ParameterSignature {
    pub const fn value(name: &'static str) -> Self {
        Self {
            name,
            kind: ParameterKind::Value,
        }
    }

    pub const fn cancellation(name: &'static str) -> Self {
        Self {
            name,
            kind: ParameterKind::Cancellation,
        }
    }

    pub const fn variadic(name: &'static str) -> Self {
        Self {
            name,
            kind: ParameterKind::Variadic,
        }
    }
}

/// Declared shape of one method, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub name: &'static str,
    pub parameters: Vec<ParameterSignature>,
    pub returns: ReturnShape,
    pub generic_parameters: usize,
    /// Number of values in the method's argument tuple, when known.
    pub argument_arity: Option<usize>,
}

impl MethodSignature {
    pub fn new(name: &'static str, returns: ReturnShape) -> Self {
        Self {
            name,
            parameters: Vec::new(),
            returns,
            generic_parameters: 0,
            argument_arity: None,
        }
    }

    pub fn with_parameter(mut self, parameter: ParameterSignature) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_generic_parameters(mut self, count: usize) -> Self {
        self.generic_parameters = count;
        self
    }

    pub fn of<M: RemotingMethod>() -> Self {
        Self {
            name: M::NAME,
            parameters: M::PARAMETERS.to_vec(),
            returns: M::RETURNS,
            generic_parameters: M::GENERIC_PARAMETERS,
            argument_arity: Some(<M::Args as ArgumentList>::ARITY),
        }
    }
}

/// Declared shape of an interface, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSignature {
    pub namespace: &'static str,
    pub name: &'static str,
    pub kind: RemotingKind,
    pub generic_parameters: usize,
    pub methods: Vec<MethodSignature>,
}

impl InterfaceSignature {
    pub fn new(namespace: &'static str, name: &'static str, kind: RemotingKind) -> Self {
        Self {
            namespace,
            name,
            kind,
            generic_parameters: 0,
            methods: Vec::new(),
        }
    }

    pub fn of<I: RemotedInterface>() -> Self {
        let mut signature = Self::new(I::NAMESPACE, I::NAME, I::KIND);
        signature.generic_parameters = I::GENERIC_PARAMETERS;
        signature
    }

    pub fn method<M: RemotingMethod>(self) -> Self {
        self.with_method(MethodSignature::of::<M>())
    }

    pub fn with_method(mut self, method: MethodSignature) -> Self {
        self.methods.push(method);
        self
    }

    pub fn with_generic_parameters(mut self, count: usize) -> Self {
        self.generic_parameters = count;
        self
    }
}

/// A remotable interface.
///
/// Implemented on a zero-sized marker type. `Target` is the object the
/// interface is served by, typically `dyn SomeTrait`.
pub trait RemotedInterface: Send + Sync + Sized + 'static {
    type Target: ?Sized + Send + Sync + 'static;

    const NAMESPACE: &'static str;
    const NAME: &'static str;
    const KIND: RemotingKind;
    const GENERIC_PARAMETERS: usize = 0;

    /// Lists the interface's methods, usually
    /// `InterfaceSignature::of::<Self>().method::<A>().method::<B>()`.
    fn signature() -> InterfaceSignature;

    /// Binds each method id to a handler calling into `Target`.
    fn register_methods(table: &mut MethodDispatchTableBuilder<'_, Self>);
}

/// One method of a [`RemotedInterface`].
///
/// `Args` holds the value parameters in declaration order; a cancellation
/// parameter is never part of it.
pub trait RemotingMethod: Send + Sync + 'static {
    type Interface: RemotedInterface;
    type Args: ArgumentList;
    type Output: Serialize + DeserializeOwned + Send + 'static;

    const NAME: &'static str;
    const PARAMETERS: &'static [ParameterSignature];
    const RETURNS: ReturnShape;
    const GENERIC_PARAMETERS: usize = 0;
}
