//! Component resolution.
//!
//! A [`Factory`] is an immutable snapshot of prioritized machines, one
//! warehouse and the customizers found at bootstrap. Resolving a query finds
//! candidate names, builds their dependency graph, orders it and materializes
//! it bottom-up, storing each component in the warehouse.

pub mod activation;
mod builder;
mod dump;
pub mod errors;
mod graph;
mod query;

pub use builder::FactoryBuilder;
pub use errors::{Candidate, FactoryError};
pub use query::BoundQuery;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::core::component::{AutoPreparable, AutoStartable, Component, NamedComponent};
use crate::core::component_box::ComponentBox;
use crate::core::customizer::CustomizerRef;
use crate::core::machine::{EngineRef, MachineRef};
use crate::core::name::{ComponentType, Name};
use crate::core::query::{Query, QueryKind};
use crate::warehouse::{StdWarehouse, WarehouseRef};

use self::activation::{activation_names, is_activation_name, DEACTIVATED};

/// A machine known to a factory, with the machine component that built it.
#[derive(Debug, Clone)]
pub(crate) struct MachineEntry {
    pub machine: MachineRef,
    /// `None` for machines registered directly on the builder.
    pub origin: Option<Name>,
}

impl MachineEntry {
    pub fn registered(machine: MachineRef) -> Self {
        MachineEntry {
            machine,
            origin: None,
        }
    }
}

/// The resolver.
///
/// Cheap to query from several threads at once. Deriving a new configuration
/// ([`Factory::concat`]) always produces a new factory.
pub struct Factory {
    machines: Vec<MachineEntry>,
    warehouse: WarehouseRef,
    customizers: Vec<CustomizerRef>,
    activation: RwLock<HashMap<Name, bool>>,
    gates: Mutex<HashMap<Name, Arc<Mutex<()>>>>,
    single_flight: bool,
    rounds: usize,
}

impl Factory {
    /// Start configuring a factory.
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::new()
    }

    pub(crate) fn assemble(
        mut machines: Vec<MachineEntry>,
        warehouse: WarehouseRef,
        customizers: Vec<CustomizerRef>,
        single_flight: bool,
        rounds: usize,
    ) -> Self {
        // stable: equal priorities keep registration order
        machines.sort_by_key(|entry| entry.machine.priority());

        Factory {
            machines,
            warehouse,
            customizers,
            activation: RwLock::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            single_flight,
            rounds,
        }
    }

    /// Identifier of this factory, shared with its warehouse.
    pub fn id(&self) -> &str {
        self.warehouse.id()
    }

    pub fn warehouse(&self) -> &WarehouseRef {
        &self.warehouse
    }

    /// Machines in ascending priority order.
    pub fn machines(&self) -> impl Iterator<Item = &MachineRef> {
        self.machines.iter().map(|entry| &entry.machine)
    }

    /// Customizer engines found at bootstrap.
    pub fn customizers(&self) -> &[CustomizerRef] {
        &self.customizers
    }

    /// Number of machine-building rounds the bootstrap needed to reach its
    /// fixed point, the final round producing nothing new.
    pub fn bootstrap_rounds(&self) -> usize {
        self.rounds
    }

    pub fn is_single_flight(&self) -> bool {
        self.single_flight
    }

    /// Derive a factory with one more machine and a fresh warehouse.
    ///
    /// The new warehouse keeps the providers of this one. Components the added
    /// machine builds are not bootstrapped: use a builder for machines that
    /// produce machines.
    pub fn concat(&self, machine: MachineRef) -> Factory {
        let mut machines = self.machines.clone();
        machines.push(MachineEntry::registered(machine));

        let warehouse: WarehouseRef =
            Arc::new(StdWarehouse::with_providers(self.warehouse.providers().to_vec()));

        Factory::assemble(
            machines,
            warehouse,
            self.customizers.clone(),
            self.single_flight,
            self.rounds,
        )
    }

    /// Bind a query to this factory.
    pub fn query(&self, query: Query) -> BoundQuery<'_> {
        BoundQuery::new(self, query)
    }

    /// Query one component by name (mandatory).
    pub fn query_by_name(&self, name: Name) -> BoundQuery<'_> {
        self.query(Query::by_name(name))
    }

    /// Query every component of type `T` (optional).
    pub fn query_by_type<T: ?Sized + 'static>(&self) -> BoundQuery<'_> {
        self.query(Query::by_type::<T>())
    }

    /// Build or fetch the component named `name`.
    pub fn get<T: Component>(&self, name: &Name) -> Result<Arc<T>, FactoryError> {
        let query = Query::by_name(*name);
        self.query(query).find_one_as::<T>()?.ok_or_else(|| self.unsatisfied(&query, &[]))
    }

    /// Build or fetch the only component of type `T`.
    pub fn get_by_type<T: Component>(&self) -> Result<Arc<T>, FactoryError> {
        let query = Query::by_type::<T>().mandatory();
        self.query(query).find_one_as::<T>()?.ok_or_else(|| self.unsatisfied(&query, &[]))
    }

    /// Build or fetch every component of type `T`, ordered by priority then name.
    pub fn get_all<T: Component>(&self) -> Result<Vec<Arc<T>>, FactoryError> {
        self.query_by_type::<T>().find_as::<T>()
    }

    /// Start every component exposed as [`AutoStartable`], by priority.
    pub fn start(&self) -> Result<(), FactoryError> {
        for component in self.query_by_type::<dyn AutoStartable>().find()? {
            let name = component.name();
            match component.component().as_startable() {
                Some(startable) => {
                    tracing::debug!("starting {}", name);
                    startable.start().map_err(|source| FactoryError::Lifecycle {
                        name: name.to_string(),
                        phase: "start",
                        source,
                    })?;
                }
                None => tracing::warn!("{} is exposed as startable but can't be started", name),
            }
        }
        Ok(())
    }

    /// Prepare every component exposed as [`AutoPreparable`], by priority.
    pub fn prepare(&self) -> Result<(), FactoryError> {
        for component in self.query_by_type::<dyn AutoPreparable>().find()? {
            let name = component.name();
            match component.component().as_preparable() {
                Some(preparable) => {
                    tracing::debug!("preparing {}", name);
                    preparable.prepare().map_err(|source| FactoryError::Lifecycle {
                        name: name.to_string(),
                        phase: "prepare",
                        source,
                    })?;
                }
                None => tracing::warn!("{} is exposed as preparable but can't be prepared", name),
            }
        }
        Ok(())
    }

    /// Close the warehouse, releasing every component it owns.
    pub fn close(&self) -> Result<(), FactoryError> {
        tracing::debug!("closing factory {}", self.id());
        self.warehouse.close()
    }

    /// Dependency tree of a built component, as stored in the warehouse.
    pub fn dependency_tree(&self, name: &Name) -> String {
        crate::warehouse::dependency_tree(self.warehouse.as_ref(), name)
    }

    /// Engines able to build `name`, best candidate first.
    pub(crate) fn engines(&self, name: &Name) -> Vec<EngineRef> {
        self.machines
            .iter()
            .filter(|entry| entry.machine.can_build(name))
            .filter_map(|entry| entry.machine.engine(name))
            .collect()
    }

    /// Active names matching `query`, without building anything but
    /// activation flags.
    pub(crate) fn find_names(&self, query: &Query) -> Vec<Name> {
        match query.kind() {
            QueryKind::ByName(name) => {
                let known = !self.engines(&name).is_empty() || self.warehouse.is_available(&name);
                if known && self.is_active(&name) {
                    vec![name]
                } else {
                    Vec::new()
                }
            }
            QueryKind::ByType(ty) => {
                let mut seen = HashSet::new();
                self.machines
                    .iter()
                    .flat_map(|entry| entry.machine.names_buildable(&ty))
                    .filter(|name| seen.insert(*name))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .filter(|name| self.is_active(name))
                    .collect()
            }
        }
    }

    /// Components matching `query`, ordered by priority then name.
    pub(crate) fn find(
        &self,
        query: &Query,
        path: &[String],
    ) -> Result<Vec<NamedComponent>, FactoryError> {
        let names = self.find_names(query);
        if names.is_empty() {
            return if query.is_mandatory() {
                Err(self.unsatisfied(query, path))
            } else {
                Ok(Vec::new())
            };
        }

        let mut query_path = path.to_vec();
        query_path.push(query.to_string());

        let mut found = Vec::with_capacity(names.len());
        for name in names {
            if let Some(component) = self.resolve_name(name, &query_path)? {
                found.push(component);
            }
        }
        sort_components(&mut found);

        if found.is_empty() && query.is_mandatory() {
            return Err(self.unsatisfied(query, path));
        }
        Ok(found)
    }

    /// Checkout `name`, or build it with the first candidate engine that
    /// succeeds. Cycles abort immediately.
    pub(crate) fn resolve_name(
        &self,
        name: Name,
        path: &[String],
    ) -> Result<Option<NamedComponent>, FactoryError> {
        if let Some(component) = self.warehouse.checkout(&name) {
            return Ok(Some(component));
        }

        let mut first_error = None;
        for engine in self.engines(&name) {
            match graph::materialize(self, Arc::clone(&engine), path) {
                Ok(component) => return Ok(Some(component)),
                Err(e) if e.is_cycle() => return Err(e),
                Err(e) => {
                    tracing::debug!("{:?} failed to build {}: {}", engine, name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Whether `name` is active, checking its activation flags from the most
    /// specific type to the least specific one. Cached per factory.
    pub(crate) fn is_active(&self, name: &Name) -> bool {
        if is_activation_name(name) {
            return true;
        }

        if let Some(&active) = self
            .activation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return active;
        }

        let exposes = self
            .engines(name)
            .first()
            .map(|engine| engine.exposes().to_vec())
            .unwrap_or_default();

        let active = activation_names(name, &exposes)
            .into_iter()
            .find_map(|flag| self.flag_value(flag))
            .map(|value| value != DEACTIVATED)
            .unwrap_or(true);

        if !active {
            tracing::debug!("{} is deactivated", name);
        }

        self.activation
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*name, active);
        active
    }

    fn flag_value(&self, flag: Name) -> Option<String> {
        if self.engines(&flag).is_empty() && !self.warehouse.is_available(&flag) {
            return None;
        }
        match self.resolve_name(flag, &[]) {
            Ok(component) => component.and_then(|c| c.value::<String>().cloned()),
            Err(e) => {
                tracing::warn!("can't read activation flag {}: {}", flag, e);
                None
            }
        }
    }

    /// Unsatisfied error for `query`, with hints on similar components.
    pub(crate) fn unsatisfied(&self, query: &Query, path: &[String]) -> FactoryError {
        let mut full_path = path.to_vec();
        full_path.push(query.to_string());

        let (reason, similar) = match query.kind() {
            QueryKind::ByName(name) => {
                let reason = if self.engines(&name).is_empty() {
                    "no machine found to build it"
                } else {
                    "the component is deactivated"
                };
                let similar = self.similar_names(|candidate| {
                    candidate.raw() == name.raw() && *candidate != name
                });
                (reason, similar)
            }
            QueryKind::ByType(ty) => {
                let similar = self.similar_names(|candidate| {
                    candidate.raw() == ty && candidate.declared() != ty
                });
                ("no active component of this type can be built", similar)
            }
        };

        FactoryError::Unsatisfied {
            query: query.to_string(),
            reason: reason.to_string(),
            path: full_path,
            similar: similar.iter().map(ToString::to_string).collect(),
        }
    }

    fn similar_names(&self, matches: impl Fn(&Name) -> bool) -> Vec<Name> {
        let any = ComponentType::any();
        let mut names: Vec<Name> = self
            .machines
            .iter()
            .flat_map(|entry| entry.machine.names_buildable(&any))
            .filter(|name| matches(name))
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Per-name build gate, when single-flight builds are enabled.
    pub(crate) fn gate(&self, name: Name) -> Option<Arc<Mutex<()>>> {
        if !self.single_flight {
            return None;
        }
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        Some(Arc::clone(gates.entry(name).or_default()))
    }

    /// Run every applicable customizer on a freshly built box, lowest
    /// priority first. Machines and customizer engines are never customized.
    pub(crate) fn customize(&self, boxed: ComponentBox) -> Result<ComponentBox, FactoryError> {
        let name = boxed.name();
        let declared = name.declared();
        if declared == ComponentType::of::<MachineRef>()
            || declared == ComponentType::of::<CustomizerRef>()
            || is_activation_name(&name)
        {
            return Ok(boxed);
        }

        let mut customizers: Vec<_> = self
            .customizers
            .iter()
            .filter(|engine| engine.can_customize(&name))
            .map(|engine| (engine.customizer(&name), engine))
            .collect();
        customizers.sort_by_key(|(customizer, _)| customizer.priority());

        let mut boxed = boxed;
        for (customizer, engine) in customizers {
            tracing::debug!("customizing {} with {:?}", name, engine);
            boxed = boxed
                .customize(customizer.as_ref())
                .map_err(|source| FactoryError::Customize {
                    name: name.to_string(),
                    customizer: format!("{:?}", engine),
                    source,
                })?;
        }
        Ok(boxed)
    }
}

impl std::fmt::Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("id", &self.id())
            .field("machines", &self.machines.len())
            .field("customizers", &self.customizers.len())
            .field("single_flight", &self.single_flight)
            .finish()
    }
}

/// Order components by priority, then name.
pub(crate) fn sort_components(components: &mut [NamedComponent]) {
    components.sort_by(|a, b| {
        a.priority()
            .cmp(&b.priority())
            .then_with(|| a.name().cmp(&b.name()))
    });
}
