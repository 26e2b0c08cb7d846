//! Advertises components of provider warehouses.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::core::bom::{BillOfMaterials, SatisfiedBOM};
use crate::core::component_box::ComponentBox;
use crate::core::machine::{matches_type, EngineRef, FactoryMachine, MachineEngine, MachineRef};
use crate::core::name::{ComponentType, Name};
use crate::warehouse::WarehouseRef;

/// Makes components already stored in provider warehouses visible to name
/// and type queries of a layered factory.
///
/// Its engines never build: the factory picks provided components straight
/// from its warehouse, which reads through to the providers. Single-use
/// components already picked from a provider are not advertised, so local
/// machines build them instead.
#[derive(Debug, Clone)]
pub struct WarehouseProvidersMachine {
    providers: Vec<WarehouseRef>,
}

impl WarehouseProvidersMachine {
    pub const PRIORITY: i32 = -10000;

    pub fn new(providers: Vec<WarehouseRef>) -> Self {
        WarehouseProvidersMachine { providers }
    }

    pub fn into_ref(self) -> MachineRef {
        Arc::new(self)
    }
}

impl FactoryMachine for WarehouseProvidersMachine {
    fn can_build(&self, name: &Name) -> bool {
        self.providers
            .iter()
            .any(|provider| provider.is_available(name))
    }

    fn engine(&self, name: &Name) -> Option<EngineRef> {
        let stored = self
            .providers
            .iter()
            .filter(|provider| provider.is_available(name))
            .find_map(|provider| provider.stored_box(name))?;

        let priority = stored
            .boxed()
            .peek()
            .map(|component| component.priority())
            .unwrap_or_default();

        Some(Arc::new(ProvidedEngine {
            name: *name,
            priority,
            bom: stored.satisfied().bom().clone(),
        }))
    }

    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name> {
        let mut names = Vec::new();
        for provider in &self.providers {
            for name in provider.list_names() {
                if matches_type(ty, &name, &[])
                    && !names.contains(&name)
                    && provider.is_available(&name)
                {
                    names.push(name);
                }
            }
        }
        names
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }
}

#[derive(Debug)]
struct ProvidedEngine {
    name: Name,
    priority: i32,
    bom: BillOfMaterials,
}

impl MachineEngine for ProvidedEngine {
    fn name(&self) -> Name {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn bill_of_materials(&self) -> &BillOfMaterials {
        &self.bom
    }

    fn build(&self, _satisfied: &SatisfiedBOM) -> Result<ComponentBox> {
        bail!(
            "{} is provided by another warehouse and can't be built here",
            self.name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::NamedComponent;
    use crate::warehouse::{StdWarehouse, Warehouse};
    use std::time::Duration;

    #[test]
    fn test_advertises_provided_names() {
        let provider = StdWarehouse::new();
        let component = NamedComponent::with_priority(Name::of::<String>("shared"), 7, "v".to_string());
        provider.checkin(
            ComponentBox::reusable(component.clone()),
            Arc::new(SatisfiedBOM::empty()),
            Duration::ZERO,
        );

        let machine = WarehouseProvidersMachine::new(vec![Arc::new(provider) as WarehouseRef]);
        let name = component.name();

        assert!(machine.can_build(&name));
        assert_eq!(machine.names_buildable(&ComponentType::of::<String>()), vec![name]);
        assert!(machine.names_buildable(&ComponentType::of::<u8>()).is_empty());

        let engine = machine.engine(&name).unwrap();
        assert_eq!(engine.priority(), 7);
        assert!(engine.build(&SatisfiedBOM::empty()).is_err());
    }

    #[test]
    fn test_picked_single_use_not_advertised() {
        let provider = StdWarehouse::new();
        let component = NamedComponent::of("token", "t".to_string());
        provider.checkin(
            ComponentBox::single_use(component.clone()),
            Arc::new(SatisfiedBOM::empty()),
            Duration::ZERO,
        );
        let name = component.name();
        let machine = WarehouseProvidersMachine::new(vec![Arc::new(provider) as WarehouseRef]);
        assert!(machine.can_build(&name));

        let provider = &machine.providers[0];
        assert!(provider.checkout(&name).is_some());

        assert!(!machine.can_build(&name));
        assert!(machine.engine(&name).is_none());
        assert!(machine.names_buildable(&ComponentType::of::<String>()).is_empty());
    }
}
