use fabric_remoting::CodecError;
use fabric_remoting_service::ContractError;

/// Failure to add an interface to a dispatcher map.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("interface {incoming} has id {id}, which is already taken by {existing}")]
    IdCollision {
        id: i32,
        existing: String,
        incoming: String,
    },

    #[error("interface {interface} is already registered")]
    DuplicateInterface { interface: String },

    #[error("interface {interface} hashes to the reserved id {id}")]
    ReservedInterfaceId { interface: String, id: i32 },

    #[error("{interface} is an event interface; raise it through an ActorEventPublisher")]
    EventInterface { interface: String },
}

/// Failure to find the dispatcher for an incoming request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("interface {interface_id} is not implemented by this object")]
    InterfaceNotFound { interface_id: i32 },

    #[error("request for interface {interface_id} does not name an actor")]
    MissingActorId { interface_id: i32 },

    #[error("actor {actor_id} could not be activated: {reason}")]
    ActivationFailed { actor_id: String, reason: String },
}

/// Failure to raise an actor event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
