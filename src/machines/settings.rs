//! String settings as components.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::machine::{EngineRef, FactoryMachine, MachineRef, StdEngine};
use crate::core::name::{ComponentType, Name};
use crate::util::config::Config;

/// Provides each configured `key = value` as a `String` component named
/// `Name::of::<String>(key)`.
#[derive(Clone)]
pub struct SettingsMachine {
    priority: i32,
    values: Arc<BTreeMap<String, String>>,
}

impl SettingsMachine {
    /// Default priority, overriding ordinary recipes.
    pub const PRIORITY: i32 = -1000;

    pub fn new(values: impl IntoIterator<Item = (String, String)>) -> Self {
        Self::with_priority(Self::PRIORITY, values)
    }

    pub fn with_priority(priority: i32, values: impl IntoIterator<Item = (String, String)>) -> Self {
        SettingsMachine {
            priority,
            values: Arc::new(values.into_iter().collect()),
        }
    }

    /// Settings and activation flags of a configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut values = config.activation_flags();
        values.extend(config.settings.clone());
        Self::new(values)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_ref(self) -> MachineRef {
        Arc::new(self)
    }

    fn is_string(name: &Name) -> bool {
        let string = ComponentType::of::<String>();
        name.declared() == string && name.raw() == string
    }
}

impl FactoryMachine for SettingsMachine {
    fn can_build(&self, name: &Name) -> bool {
        Self::is_string(name) && self.values.contains_key(name.id())
    }

    fn engine(&self, name: &Name) -> Option<EngineRef> {
        if !Self::is_string(name) {
            return None;
        }
        let value = self.values.get(name.id())?.clone();
        let engine = StdEngine::new(*name)
            .with_priority(self.priority)
            .build_with(move |_| Ok(value.clone()));
        Some(Arc::new(engine))
    }

    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name> {
        if !ty.accepts(&ComponentType::of::<String>()) {
            return Vec::new();
        }
        self.values
            .keys()
            .map(|key| Name::of::<String>(key.as_str()))
            .collect()
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

impl fmt::Debug for SettingsMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsMachine")
            .field("priority", &self.priority)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bom::SatisfiedBOM;

    #[test]
    fn test_settings_are_string_components() {
        let machine = SettingsMachine::new([("mode".to_string(), "dev".to_string())]);
        let mode = Name::of::<String>("mode");

        assert!(machine.can_build(&mode));
        assert!(!machine.can_build(&Name::of::<u32>("mode")));
        assert_eq!(machine.names_buildable(&ComponentType::of::<String>()), vec![mode]);
        assert!(machine.names_buildable(&ComponentType::of::<u32>()).is_empty());

        let component = machine
            .engine(&mode)
            .unwrap()
            .build(&SatisfiedBOM::empty())
            .unwrap()
            .pick()
            .unwrap();
        assert_eq!(component.value::<String>().unwrap(), "dev");
        assert_eq!(component.priority(), SettingsMachine::PRIORITY);
    }

    #[test]
    fn test_from_config() {
        let config = Config::from_toml(
            "[activation]\n\"factory.activation::u32::n\" = false\n[settings]\nport = \"8080\"",
        )
        .unwrap();
        let machine = SettingsMachine::from_config(&config);

        assert!(machine.can_build(&Name::of::<String>("port")));
        assert!(machine.can_build(&Name::of::<String>("factory.activation::u32::n")));
    }
}
