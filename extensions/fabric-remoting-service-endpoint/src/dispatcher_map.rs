use crate::{DispatchError, RegistrationError};
use fabric_remoting::{RequestBody, SerializationProvider, constants::EVENT_SUBSCRIPTION_INTERFACE_ID};
use fabric_remoting_service::{
    DispatchFuture, IdScheme, InterfaceDescription, MethodDispatchTable, RemotedInterface,
    RemotingKind, RemotingRegistry, RemotingSettings,
};
use std::{
    any::TypeId,
    collections::{HashMap, HashSet, hash_map::Entry},
    sync::Arc,
};
use tokio_util::sync::CancellationToken;

/// One interface of one receiving object, ready to dispatch.
pub trait InterfaceDispatcher: Send + Sync {
    fn description(&self) -> &InterfaceDescription;

    fn contains_method(&self, method_id: i32) -> bool;

    fn dispatch(
        &self,
        method_id: i32,
        body: RequestBody,
        cancellation: CancellationToken,
    ) -> DispatchFuture;
}

struct BoundDispatcher<I: RemotedInterface> {
    table: Arc<MethodDispatchTable<I>>,
    target: Arc<I::Target>,
    serialization: SerializationProvider,
}

impl<I: RemotedInterface> InterfaceDispatcher for BoundDispatcher<I> {
    fn description(&self) -> &InterfaceDescription {
        self.table.description()
    }

    fn contains_method(&self, method_id: i32) -> bool {
        self.table.contains_method(method_id)
    }

    fn dispatch(
        &self,
        method_id: i32,
        body: RequestBody,
        cancellation: CancellationToken,
    ) -> DispatchFuture {
        self.table.dispatch(
            self.target.clone(),
            method_id,
            body,
            self.serialization,
            cancellation,
        )
    }
}

/// `interfaceId -> dispatcher` for one receiving object. Immutable once built.
#[derive(Clone, Default)]
pub struct DispatcherMap {
    dispatchers: HashMap<i32, Arc<dyn InterfaceDispatcher>>,
}

impl DispatcherMap {
    pub fn builder(
        registry: Arc<RemotingRegistry>,
        settings: &RemotingSettings,
    ) -> DispatcherMapBuilder {
        DispatcherMapBuilder {
            registry,
            schemes: settings.endpoint_id_schemes(),
            serialization: settings.serialization,
            dispatchers: HashMap::new(),
            owners: HashMap::new(),
            registered: HashSet::new(),
        }
    }

    /// Finds the dispatcher of an interface. A miss is reported to the caller
    /// and leaves the endpoint serving.
    pub fn get_dispatcher(
        &self,
        interface_id: i32,
    ) -> Result<&Arc<dyn InterfaceDispatcher>, DispatchError> {
        self.dispatchers
            .get(&interface_id)
            .ok_or(DispatchError::InterfaceNotFound { interface_id })
    }

    pub fn interface_ids(&self) -> impl Iterator<Item = i32> + '_ {
        self.dispatchers.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}

/// Collects the interfaces a receiving object implements.
///
/// Each interface is registered under every id scheme the settings accept,
/// so clients of either wire generation reach the same implementation.
pub struct DispatcherMapBuilder {
    registry: Arc<RemotingRegistry>,
    schemes: Vec<IdScheme>,
    serialization: SerializationProvider,
    dispatchers: HashMap<i32, Arc<dyn InterfaceDispatcher>>,
    owners: HashMap<i32, TypeId>,
    registered: HashSet<TypeId>,
}

impl DispatcherMapBuilder {
    /// Serves interface `I` with `target`.
    pub fn register<I: RemotedInterface>(
        mut self,
        target: Arc<I::Target>,
    ) -> Result<Self, RegistrationError> {
        let interface = if I::NAMESPACE.is_empty() {
            I::NAME.to_string()
        } else {
            format!("{}.{}", I::NAMESPACE, I::NAME)
        };

        if I::KIND == RemotingKind::Event {
            return Err(RegistrationError::EventInterface { interface });
        }

        if !self.registered.insert(TypeId::of::<I>()) {
            return Err(RegistrationError::DuplicateInterface { interface });
        }

        for scheme in self.schemes.clone() {
            let table = self.registry.dispatch_table::<I>(scheme)?;
            let id = table.interface_id();

            if id == EVENT_SUBSCRIPTION_INTERFACE_ID {
                return Err(RegistrationError::ReservedInterfaceId { interface, id });
            }

            match self.dispatchers.entry(id) {
                Entry::Occupied(existing) => {
                    // Two schemes may map one interface to the same id.
                    if self.owners.get(&id) == Some(&TypeId::of::<I>()) {
                        continue;
                    }
                    let existing = existing.get().description().full_name();
                    return Err(RegistrationError::IdCollision {
                        id,
                        existing,
                        incoming: interface,
                    });
                }
                Entry::Vacant(entry) => {
                    tracing::debug!("Registered {} as interface {} ({:?})", interface, id, scheme);
                    self.owners.insert(id, TypeId::of::<I>());
                    entry.insert(Arc::new(BoundDispatcher::<I> {
                        table,
                        target: target.clone(),
                        serialization: self.serialization,
                    }));
                }
            }
        }

        Ok(self)
    }

    pub fn build(self) -> DispatcherMap {
        DispatcherMap {
            dispatchers: self.dispatchers,
        }
    }
}
