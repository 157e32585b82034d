use crate::{
    ContractError, IdScheme, InterfaceSignature, MethodSignature, ParameterKind, RemotedInterface,
    RemotingKind, ReturnShape, compute_interface_id, compute_method_id,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDescription {
    pub name: &'static str,
    pub position: usize,
}

/// A validated method: its id and the information needed to pack, unpack
/// and dispatch its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescription {
    id: i32,
    name: &'static str,
    returns: ReturnShape,
    arguments: Vec<ArgumentDescription>,
    has_cancellation: bool,
}

impl MethodDescription {
    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn returns(&self) -> ReturnShape {
        self.returns
    }

    pub fn arguments(&self) -> &[ArgumentDescription] {
        &self.arguments
    }

    pub fn argument_names(&self) -> Vec<&'static str> {
        self.arguments.iter().map(|argument| argument.name).collect()
    }

    /// Whether callers may cancel this method while it runs.
    #[inline]
    pub fn has_cancellation(&self) -> bool {
        self.has_cancellation
    }
}

/// A validated, immutable description of a remoted interface under one
/// id scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDescription {
    id: i32,
    namespace: &'static str,
    name: &'static str,
    kind: RemotingKind,
    scheme: IdScheme,
    methods: Vec<MethodDescription>,
    by_id: HashMap<i32, usize>,
    by_name: HashMap<&'static str, usize>,
}

impl InterfaceDescription {
    pub fn of<I: RemotedInterface>(scheme: IdScheme) -> Result<Self, ContractError> {
        Self::build(&I::signature(), scheme)
    }

    /// Validates a signature and computes every id under `scheme`.
    pub fn build(signature: &InterfaceSignature, scheme: IdScheme) -> Result<Self, ContractError> {
        let interface = qualified_name(signature.namespace, signature.name);

        if signature.generic_parameters > 0 {
            return Err(ContractError::GenericInterface { interface });
        }

        let mut by_name = HashMap::with_capacity(signature.methods.len());
        for (index, method) in signature.methods.iter().enumerate() {
            if by_name.insert(method.name, index).is_some() {
                return Err(ContractError::OverloadedMethod {
                    interface,
                    method: method.name.to_string(),
                });
            }
        }

        let mut methods = Vec::with_capacity(signature.methods.len());
        let mut by_id = HashMap::with_capacity(signature.methods.len());
        for (index, method) in signature.methods.iter().enumerate() {
            let description = describe_method(&interface, signature, method, scheme)?;

            if let Some(&existing) = by_id.get(&description.id) {
                let first: &MethodDescription = &methods[existing];
                return Err(ContractError::MethodIdCollision {
                    interface,
                    first: first.name.to_string(),
                    second: description.name.to_string(),
                    id: description.id,
                });
            }

            by_id.insert(description.id, index);
            methods.push(description);
        }

        Ok(Self {
            id: compute_interface_id(scheme, signature.namespace, signature.name),
            namespace: signature.namespace,
            name: signature.name,
            kind: signature.kind,
            scheme,
            methods,
            by_id,
            by_name,
        })
    }

    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn full_name(&self) -> String {
        qualified_name(self.namespace, self.name)
    }

    pub fn kind(&self) -> RemotingKind {
        self.kind
    }

    pub fn scheme(&self) -> IdScheme {
        self.scheme
    }

    pub fn methods(&self) -> &[MethodDescription] {
        &self.methods
    }

    pub fn method(&self, method_id: i32) -> Option<&MethodDescription> {
        self.by_id.get(&method_id).map(|&index| &self.methods[index])
    }

    pub fn method_by_name(&self, name: &str) -> Option<&MethodDescription> {
        self.by_name.get(name).map(|&index| &self.methods[index])
    }
}

fn qualified_name(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

fn describe_method(
    interface: &str,
    signature: &InterfaceSignature,
    method: &MethodSignature,
    scheme: IdScheme,
) -> Result<MethodDescription, ContractError> {
    let method_name = || method.name.to_string();

    if let Some(parameter) = method
        .parameters
        .iter()
        .find(|parameter| parameter.kind == ParameterKind::Variadic)
    {
        return Err(ContractError::VariadicParameter {
            interface: interface.to_string(),
            method: method_name(),
            parameter: parameter.name.to_string(),
        });
    }

    if method.generic_parameters > 0 {
        return Err(ContractError::GenericMethod {
            interface: interface.to_string(),
            method: method_name(),
        });
    }

    let return_allowed = match signature.kind {
        RemotingKind::Service | RemotingKind::Actor => {
            matches!(method.returns, ReturnShape::Task | ReturnShape::TaskOf)
        }
        RemotingKind::Event => method.returns == ReturnShape::Void,
    };
    if !return_allowed {
        return Err(ContractError::InvalidReturnShape {
            interface: interface.to_string(),
            method: method_name(),
            kind: signature.kind,
            found: method.returns,
        });
    }

    let last = method.parameters.len().saturating_sub(1);
    let mut has_cancellation = false;
    let mut arguments = Vec::with_capacity(method.parameters.len());
    for (position, parameter) in method.parameters.iter().enumerate() {
        match parameter.kind {
            ParameterKind::Cancellation if position != last => {
                return Err(ContractError::MisplacedCancellation {
                    interface: interface.to_string(),
                    method: method_name(),
                    parameter: parameter.name.to_string(),
                });
            }
            ParameterKind::Cancellation => has_cancellation = true,
            _ => arguments.push(ArgumentDescription {
                name: parameter.name,
                position: arguments.len(),
            }),
        }
    }

    if let Some(arity) = method.argument_arity {
        if arity != arguments.len() {
            return Err(ContractError::ArgumentArityMismatch {
                interface: interface.to_string(),
                method: method_name(),
                declared: arguments.len(),
                actual: arity,
            });
        }
    }

    Ok(MethodDescription {
        id: compute_method_id(scheme, signature.namespace, signature.name, method.name),
        name: method.name,
        returns: method.returns,
        arguments,
        has_cancellation,
    })
}
