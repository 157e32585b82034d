use crate::{RemotingKind, ReturnShape};

/// A remoted interface that cannot be described, dispatched or proxied.
///
/// These are build-time failures; they are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("interface {interface} is generic; remoted interfaces cannot be generic")]
    GenericInterface { interface: String },

    #[error("interface {interface} declares more than one method named '{method}'")]
    OverloadedMethod { interface: String, method: String },

    #[error("method {interface}.{method} has variadic parameter '{parameter}'")]
    VariadicParameter {
        interface: String,
        method: String,
        parameter: String,
    },

    #[error("method {interface}.{method} is generic")]
    GenericMethod { interface: String, method: String },

    #[error("method {interface}.{method} returns {found:?}, which {kind:?} interfaces do not allow")]
    InvalidReturnShape {
        interface: String,
        method: String,
        kind: RemotingKind,
        found: ReturnShape,
    },

    #[error(
        "cancellation parameter '{parameter}' of {interface}.{method} must be the last parameter"
    )]
    MisplacedCancellation {
        interface: String,
        method: String,
        parameter: String,
    },

    #[error("method {interface}.{method} declares {declared} value parameters but takes {actual}")]
    ArgumentArityMismatch {
        interface: String,
        method: String,
        declared: usize,
        actual: usize,
    },

    #[error("methods '{first}' and '{second}' of {interface} share id {id}")]
    MethodIdCollision {
        interface: String,
        first: String,
        second: String,
        id: i32,
    },

    #[error("{interface} has no method named '{method}'")]
    UnknownMethod { interface: String, method: String },

    #[error("method {interface}.{method} has no registered handler")]
    MissingHandler { interface: String, method: String },

    #[error("a handler for {interface}.{method} is already registered")]
    DuplicateHandler { interface: String, method: String },

    #[error("{interface} is a {found:?} interface, expected {expected:?}")]
    UnexpectedKind {
        interface: String,
        expected: RemotingKind,
        found: RemotingKind,
    },
}
