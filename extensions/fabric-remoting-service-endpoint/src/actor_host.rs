use crate::{DispatchError, DispatcherMap, RegistrationError};
use dashmap::{DashMap, mapref::entry::Entry};
use fabric_remoting::ActorId;
use std::sync::Arc;

type ActorActivator = dyn Fn(&ActorId) -> Result<DispatcherMap, RegistrationError> + Send + Sync;

/// Hosts the actors of one actor service: activates an actor on its first
/// request and keeps its dispatcher map until deactivation.
pub struct ActorDispatcherHost {
    activator: Box<ActorActivator>,
    activations: DashMap<ActorId, Arc<DispatcherMap>>,
}

impl ActorDispatcherHost {
    /// `activator` builds the dispatcher map of a newly activated actor.
    pub fn new<F>(activator: F) -> Self
    where
        F: Fn(&ActorId) -> Result<DispatcherMap, RegistrationError> + Send + Sync + 'static,
    {
        Self {
            activator: Box::new(activator),
            activations: DashMap::new(),
        }
    }

    pub fn get_or_activate(&self, actor_id: &ActorId) -> Result<Arc<DispatcherMap>, DispatchError> {
        if let Some(map) = self.activations.get(actor_id) {
            return Ok(map.value().clone());
        }

        match self.activations.entry(actor_id.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let map = (self.activator)(actor_id).map_err(|err| {
                    DispatchError::ActivationFailed {
                        actor_id: actor_id.to_string(),
                        reason: err.to_string(),
                    }
                })?;
                tracing::debug!("Activated actor {}", actor_id);
                let map = Arc::new(map);
                entry.insert(map.clone());
                Ok(map)
            }
        }
    }

    pub fn deactivate(&self, actor_id: &ActorId) -> bool {
        self.activations.remove(actor_id).is_some()
    }

    pub fn is_active(&self, actor_id: &ActorId) -> bool {
        self.activations.contains_key(actor_id)
    }

    pub fn active_count(&self) -> usize {
        self.activations.len()
    }
}
