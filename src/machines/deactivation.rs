//! Explicit deactivation of components.

use std::fmt;
use std::sync::Arc;

use crate::core::machine::{EngineRef, FactoryMachine, MachineRef};
use crate::core::name::{ComponentType, Name};
use crate::machines::settings::SettingsMachine;
use crate::resolver::activation::{activation_key_for, DEACTIVATED};

/// Provides a `"false"` activation flag for each listed component.
#[derive(Clone)]
pub struct DeactivationMachine {
    flags: SettingsMachine,
}

impl DeactivationMachine {
    pub const PRIORITY: i32 = -10000;

    /// Deactivate every listed name, keyed by its declared type.
    pub fn for_names(names: impl IntoIterator<Item = Name>) -> Self {
        Self::for_keys(
            names
                .into_iter()
                .map(|name| activation_key_for(name.declared(), name.id())),
        )
    }

    /// Deactivate every listed activation key.
    pub fn for_keys(keys: impl IntoIterator<Item = String>) -> Self {
        let flags = keys.into_iter().map(|key| (key, DEACTIVATED.to_string()));
        DeactivationMachine {
            flags: SettingsMachine::with_priority(Self::PRIORITY, flags),
        }
    }

    pub fn into_ref(self) -> MachineRef {
        Arc::new(self)
    }
}

impl FactoryMachine for DeactivationMachine {
    fn can_build(&self, name: &Name) -> bool {
        self.flags.can_build(name)
    }

    fn engine(&self, name: &Name) -> Option<EngineRef> {
        self.flags.engine(name)
    }

    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name> {
        self.flags.names_buildable(ty)
    }

    fn priority(&self) -> i32 {
        Self::PRIORITY
    }
}

impl fmt::Debug for DeactivationMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys = self.flags.names_buildable(&ComponentType::any());
        f.debug_struct("DeactivationMachine")
            .field("keys", &keys.iter().map(Name::id).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::activation::activation_key;

    #[test]
    fn test_flags_for_names() {
        let machine = DeactivationMachine::for_names([Name::of::<String>("legacy")]);
        let flag = Name::of::<String>(activation_key::<String>("legacy"));

        assert!(machine.can_build(&flag));
        assert_eq!(machine.priority(), -10000);
        assert_eq!(machine.names_buildable(&ComponentType::of::<String>()), vec![flag]);
    }
}
