//! Factory construction and bootstrap.
//!
//! Machines can be components built by other machines, so building a factory
//! runs in rounds: each round builds every not yet built machine component
//! the current machines can produce, and adds the results to the pool. Once a
//! round produces nothing new, customizer engines are built exactly once
//! from the final machine set.

use std::collections::HashSet;
use std::sync::Arc;

use crate::core::customizer::CustomizerRef;
use crate::core::machine::{FactoryMachine, MachineRef};
use crate::core::name::Name;
use crate::core::query::Query;
use crate::machines::{DeactivationMachine, SettingsMachine, WarehouseProvidersMachine};
use crate::resolver::errors::FactoryError;
use crate::resolver::{Factory, MachineEntry};
use crate::util::config::Config;
use crate::warehouse::{StdWarehouse, WarehouseRef};

/// Collects machines and options, then bootstraps a [`Factory`].
///
/// ```rust,ignore
/// let factory = Factory::builder()
///     .add_machine(SingleNameMachine::new(0, engine))
///     .deactivate(Name::of::<String>("legacy"))
///     .build()?;
/// ```
#[derive(Default)]
pub struct FactoryBuilder {
    machines: Vec<MachineEntry>,
    providers: Vec<WarehouseRef>,
    deactivated: Vec<Name>,
    config: Config,
    single_flight: Option<bool>,
}

impl FactoryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_machine(self, machine: impl FactoryMachine + 'static) -> Self {
        self.add_machine_ref(Arc::new(machine))
    }

    pub fn add_machine_ref(mut self, machine: MachineRef) -> Self {
        self.machines.push(MachineEntry::registered(machine));
        self
    }

    pub fn add_machines(mut self, machines: impl IntoIterator<Item = MachineRef>) -> Self {
        self.machines
            .extend(machines.into_iter().map(MachineEntry::registered));
        self
    }

    /// Reuse the components of `warehouse` instead of rebuilding them.
    ///
    /// Provided components are never closed by the built factory.
    pub fn add_warehouse_provider(mut self, warehouse: WarehouseRef) -> Self {
        self.providers.push(warehouse);
        self
    }

    /// Treat the component named `name` as absent.
    pub fn deactivate(mut self, name: Name) -> Self {
        self.deactivated.push(name);
        self
    }

    /// Apply a configuration; later configurations take precedence.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config.merge(config);
        self
    }

    /// Override the configured single-flight setting.
    pub fn single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = Some(enabled);
        self
    }

    /// Bootstrap the factory.
    pub fn build(self) -> Result<Factory, FactoryError> {
        let single_flight = self
            .single_flight
            .unwrap_or(self.config.factory.single_flight);
        let providers = self.providers;

        let mut machines = self.machines;
        if !providers.is_empty() {
            machines.push(MachineEntry::registered(
                WarehouseProvidersMachine::new(providers.clone()).into_ref(),
            ));
        }
        if !self.deactivated.is_empty() {
            machines.push(MachineEntry::registered(
                DeactivationMachine::for_names(self.deactivated).into_ref(),
            ));
        }
        let settings = SettingsMachine::from_config(&self.config);
        if !settings.is_empty() {
            machines.push(MachineEntry::registered(settings.into_ref()));
        }

        let mut built: HashSet<Name> = HashSet::new();
        let mut rounds = 0;
        loop {
            rounds += 1;
            // new warehouse per round: earlier rounds built with fewer machines
            let factory = Factory::assemble(
                machines.clone(),
                fresh_warehouse(&providers),
                Vec::new(),
                single_flight,
                rounds,
            );

            let pending: Vec<Name> = factory
                .find_names(&Query::by_type::<MachineRef>())
                .into_iter()
                .filter(|name| !built.contains(name))
                .collect();

            let mut produced = Vec::new();
            let mut failures = Vec::new();
            for name in pending {
                match factory.resolve_name(name, &[]) {
                    Ok(Some(component)) => match component.downcast::<MachineRef>() {
                        Some(machine) => produced.push(MachineEntry {
                            machine: (*machine).clone(),
                            origin: Some(name),
                        }),
                        None => failures.push((name.to_string(), "not a machine".to_string())),
                    },
                    Ok(None) => {}
                    Err(e) => failures.push((name.to_string(), e.to_string())),
                }
            }

            tracing::info!(
                "bootstrap round {}: {} new machine(s), {} pending",
                rounds,
                produced.len(),
                failures.len()
            );

            if produced.is_empty() {
                if !failures.is_empty() {
                    return Err(FactoryError::Bootstrap { failures });
                }
                break;
            }

            for entry in produced {
                if let Some(origin) = entry.origin {
                    built.insert(origin);
                }
                machines.push(entry);
            }
        }

        let factory = Factory::assemble(
            machines.clone(),
            fresh_warehouse(&providers),
            Vec::new(),
            single_flight,
            rounds,
        );
        let mut customizers: Vec<CustomizerRef> = Vec::new();
        for component in factory.query_by_type::<CustomizerRef>().find()? {
            match component.downcast::<CustomizerRef>() {
                Some(customizer) => customizers.push((*customizer).clone()),
                None => tracing::warn!("{} is not a customizer engine", component.name()),
            }
        }
        let machine_count = machines.len();
        let factory = Factory::assemble(
            machines,
            fresh_warehouse(&providers),
            customizers,
            single_flight,
            rounds,
        );
        tracing::debug!(
            "factory {} ready: {} machine(s), {} customizer(s)",
            factory.id(),
            machine_count,
            factory.customizers().len()
        );

        Ok(factory)
    }
}

/// An empty warehouse reading through the builder's providers.
fn fresh_warehouse(providers: &[WarehouseRef]) -> WarehouseRef {
    Arc::new(StdWarehouse::with_providers(providers.to_vec()))
}
