use crate::{ContractError, IdScheme, InterfaceDescription, MethodDispatchTable, RemotedInterface};
use dashmap::{DashMap, mapref::entry::Entry};
use std::{
    any::{Any, TypeId},
    sync::Arc,
};

type RegistryKey = (TypeId, IdScheme);

/// Process-level cache of interface descriptions and method dispatch tables.
///
/// Each is built at most once per `(interface, id scheme)`; concurrent first
/// requests for the same key serialize on the map entry, requests for
/// different keys do not block each other. Construct one per composition
/// root and share it.
#[derive(Default)]
pub struct RemotingRegistry {
    descriptions: DashMap<RegistryKey, Arc<InterfaceDescription>>,
    dispatch_tables: DashMap<RegistryKey, Arc<dyn Any + Send + Sync>>,
}

impl RemotingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the validated description of `I` under `scheme`, building it on
    /// first use. Validation failures are not cached.
    pub fn describe<I: RemotedInterface>(
        &self,
        scheme: IdScheme,
    ) -> Result<Arc<InterfaceDescription>, ContractError> {
        let key = (TypeId::of::<I>(), scheme);
        if let Some(description) = self.descriptions.get(&key) {
            return Ok(description.value().clone());
        }

        match self.descriptions.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let description = Arc::new(InterfaceDescription::of::<I>(scheme)?);
                tracing::debug!(
                    "Described {} as interface {} ({:?})",
                    description.full_name(),
                    description.id(),
                    scheme
                );
                entry.insert(description.clone());
                Ok(description)
            }
        }
    }

    /// Returns the dispatch table of `I` under `scheme`, building it on first
    /// use.
    pub fn dispatch_table<I: RemotedInterface>(
        &self,
        scheme: IdScheme,
    ) -> Result<Arc<MethodDispatchTable<I>>, ContractError> {
        let key = (TypeId::of::<I>(), scheme);
        let cached = self.dispatch_tables.get(&key).map(|table| table.value().clone());
        if let Some(table) = cached.and_then(|table| table.downcast::<MethodDispatchTable<I>>().ok())
        {
            return Ok(table);
        }

        let description = self.describe::<I>(scheme)?;
        let build = || MethodDispatchTable::<I>::build(description.clone()).map(Arc::new);
        match self.dispatch_tables.entry(key) {
            Entry::Occupied(mut entry) => {
                match entry.get().clone().downcast::<MethodDispatchTable<I>>() {
                    Ok(table) => Ok(table),
                    Err(_) => {
                        let table = build()?;
                        entry.insert(table.clone());
                        Ok(table)
                    }
                }
            }
            Entry::Vacant(entry) => {
                let table = build()?;
                entry.insert(table.clone());
                Ok(table)
            }
        }
    }

    pub fn description_count(&self) -> usize {
        self.descriptions.len()
    }

    pub fn dispatch_table_count(&self) -> usize {
        self.dispatch_tables.len()
    }
}
