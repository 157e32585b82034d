use crate::RemoteException;
use dashmap::DashMap;
use fabric_remoting::{ExceptionInformation, RemoteExceptionType};
use std::sync::Arc;

type ExceptionFactory = Arc<
    dyn Fn(&ExceptionInformation) -> Option<Box<dyn std::error::Error + Send + Sync>>
        + Send
        + Sync,
>;

/// Rebuilds typed application faults from their `ExceptionInformation`.
///
/// Types are registered by name; an unregistered or undecodable fault stays
/// a generic [`RemoteException`].
#[derive(Default)]
pub struct ExceptionConverter {
    factories: DashMap<String, ExceptionFactory>,
}

impl ExceptionConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E: RemoteExceptionType>(&self) {
        let factory: ExceptionFactory = Arc::new(|information: &ExceptionInformation| {
            match information.decode_payload::<E>()? {
                Ok(exception) => Some(Box::new(exception) as Box<dyn std::error::Error + Send + Sync>),
                Err(err) => {
                    tracing::debug!("Could not rebuild {}: {}", E::TYPE_NAME, err);
                    None
                }
            }
        });
        self.factories.insert(E::TYPE_NAME.to_string(), factory);
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn convert(&self, information: ExceptionInformation) -> RemoteException {
        let factory = self
            .factories
            .get(&information.type_name)
            .map(|factory| factory.value().clone());
        let reconstructed = factory.and_then(|factory| factory(&information));
        RemoteException::new(information, reconstructed)
    }
}
