//! Conditional machines, selected by a setting.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::machine::{
    EmptyMachine, EngineRef, FactoryMachine, MachineRef, SingleNameMachine, StdEngine,
};
use crate::core::name::{ComponentType, Name};
use crate::core::query::Query;

/// A machine building a machine: reads the `String` selector component and
/// yields the machine registered for its value.
///
/// When the selector is absent or has no registered alternative, the produced
/// machine builds nothing.
///
/// ```rust,ignore
/// let machine = AlternativesMachine::new("storage", Name::of::<String>("mode"))
///     .when("dev", in_memory_storage)
///     .when("prod", postgres_storage);
/// ```
#[derive(Clone)]
pub struct AlternativesMachine {
    id: String,
    priority: i32,
    selector: Name,
    alternatives: BTreeMap<String, MachineRef>,
}

impl AlternativesMachine {
    pub fn new(id: impl Into<String>, selector: Name) -> Self {
        AlternativesMachine {
            id: id.into(),
            priority: 0,
            selector,
            alternatives: BTreeMap::new(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Register the machine used when the selector equals `value`.
    pub fn when(mut self, value: impl Into<String>, machine: MachineRef) -> Self {
        self.alternatives.insert(value.into(), machine);
        self
    }

    /// Name of the produced machine component.
    pub fn name(&self) -> Name {
        Name::of::<MachineRef>(self.id.as_str())
    }

    pub fn into_ref(self) -> MachineRef {
        Arc::new(self.into_machine())
    }

    fn into_machine(self) -> SingleNameMachine {
        let name = self.name();
        let selector = Query::by_name(self.selector).optional();
        let alternatives = Arc::new(self.alternatives);

        let engine = StdEngine::new(name)
            .with_priority(self.priority)
            .with_dependencies([selector])
            .build_with(move |satisfied| {
                let value = satisfied.one_as::<String>(&selector)?;
                let machine = value
                    .and_then(|value| {
                        tracing::debug!("selecting alternative {} for {}", value, name);
                        alternatives.get(value.as_str()).cloned()
                    })
                    .unwrap_or_else(|| Arc::new(EmptyMachine) as MachineRef);
                Ok(machine)
            });

        SingleNameMachine::new(self.priority, engine)
    }
}

impl FactoryMachine for AlternativesMachine {
    fn can_build(&self, name: &Name) -> bool {
        *name == self.name()
    }

    fn engine(&self, name: &Name) -> Option<EngineRef> {
        self.clone().into_machine().engine(name)
    }

    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name> {
        if ty.accepts(&ComponentType::of::<MachineRef>()) {
            vec![self.name()]
        } else {
            Vec::new()
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

impl fmt::Debug for AlternativesMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlternativesMachine")
            .field("id", &self.id)
            .field("selector", &self.selector.id())
            .field("when", &self.alternatives.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bom::{BillOfMaterials, SatisfiedBOM};
    use crate::core::component::NamedComponent;
    use crate::core::machine::SingletonMachine;
    use std::collections::HashMap;

    fn selected(machine: &MachineRef, mode: Option<&str>) -> MachineRef {
        let selector = Query::by_name(Name::of::<String>("mode")).optional();
        let components = mode
            .map(|m| vec![NamedComponent::of("mode", m.to_string())])
            .unwrap_or_default();
        let satisfied = SatisfiedBOM::new(
            BillOfMaterials::of([selector]),
            HashMap::from([(selector, components)]),
        );

        let name = Name::of::<MachineRef>("storage");
        let component = machine
            .engine(&name)
            .unwrap()
            .build(&satisfied)
            .unwrap()
            .pick()
            .unwrap();
        (*component.downcast::<MachineRef>().unwrap()).clone()
    }

    #[test]
    fn test_selects_alternative() {
        let dev = SingletonMachine::new(0, NamedComponent::of("storage", "memory".to_string()));
        let machine = AlternativesMachine::new("storage", Name::of::<String>("mode"))
            .when("dev", dev.into_ref())
            .into_ref();

        let storage = Name::of::<String>("storage");
        assert!(selected(&machine, Some("dev")).can_build(&storage));
        assert!(!selected(&machine, Some("prod")).can_build(&storage));
        assert!(!selected(&machine, None).can_build(&storage));
    }
}
