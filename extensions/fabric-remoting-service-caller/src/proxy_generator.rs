use dashmap::{DashMap, mapref::entry::Entry};
use fabric_remoting_service::{
    ContractError, IdScheme, InterfaceDescription, RemotedInterface, RemotingKind,
    RemotingRegistry, ReturnShape,
};
use std::{any::TypeId, collections::HashMap, sync::Arc};

/// What a proxy needs to address one method.
#[derive(Debug, Clone)]
pub struct ProxyMethod {
    pub method_id: i32,
    pub name: &'static str,
    pub returns: ReturnShape,
    pub argument_names: Arc<[&'static str]>,
    /// The method accepts a cancellation token.
    pub cancellable: bool,
}

/// Generated call shims for one interface under one id scheme.
#[derive(Debug)]
pub struct ProxyMethodTable {
    description: Arc<InterfaceDescription>,
    methods: HashMap<&'static str, ProxyMethod>,
}

impl ProxyMethodTable {
    fn build(description: Arc<InterfaceDescription>) -> Self {
        let methods = description
            .methods()
            .iter()
            .map(|method| {
                let proxy_method = ProxyMethod {
                    method_id: method.id(),
                    name: method.name(),
                    returns: method.returns(),
                    argument_names: method.argument_names().into(),
                    cancellable: method.has_cancellation(),
                };
                (method.name(), proxy_method)
            })
            .collect();

        Self {
            description,
            methods,
        }
    }

    #[inline]
    pub fn interface_id(&self) -> i32 {
        self.description.id()
    }

    pub fn description(&self) -> &Arc<InterfaceDescription> {
        &self.description
    }

    pub fn method(&self, name: &str) -> Result<&ProxyMethod, ContractError> {
        self.methods
            .get(name)
            .ok_or_else(|| ContractError::UnknownMethod {
                interface: self.description.full_name(),
                method: name.to_string(),
            })
    }
}

/// Builds and caches proxy method tables, at most once per interface and
/// id scheme.
pub struct ProxyGenerator {
    registry: Arc<RemotingRegistry>,
    tables: DashMap<(TypeId, IdScheme), Arc<ProxyMethodTable>>,
}

impl ProxyGenerator {
    pub fn new(registry: Arc<RemotingRegistry>) -> Self {
        Self {
            registry,
            tables: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<RemotingRegistry> {
        &self.registry
    }

    pub fn generate<I: RemotedInterface>(
        &self,
        scheme: IdScheme,
    ) -> Result<Arc<ProxyMethodTable>, ContractError> {
        let key = (TypeId::of::<I>(), scheme);
        if let Some(table) = self.tables.get(&key) {
            return Ok(table.value().clone());
        }

        match self.tables.entry(key) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                let description = self.registry.describe::<I>(scheme)?;
                let table = Arc::new(ProxyMethodTable::build(description));
                entry.insert(table.clone());
                Ok(table)
            }
        }
    }

    /// Like [`ProxyGenerator::generate`], additionally requiring `I` to be of
    /// `kind`.
    pub fn generate_of_kind<I: RemotedInterface>(
        &self,
        scheme: IdScheme,
        kind: RemotingKind,
    ) -> Result<Arc<ProxyMethodTable>, ContractError> {
        if I::KIND != kind {
            return Err(ContractError::UnexpectedKind {
                interface: qualified_name::<I>(),
                expected: kind,
                found: I::KIND,
            });
        }
        self.generate::<I>(scheme)
    }

    pub fn generated_count(&self) -> usize {
        self.tables.len()
    }
}

pub(crate) fn qualified_name<I: RemotedInterface>() -> String {
    if I::NAMESPACE.is_empty() {
        I::NAME.to_string()
    } else {
        format!("{}.{}", I::NAMESPACE, I::NAME)
    }
}
