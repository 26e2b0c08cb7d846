//! Customizers - post-build transforms applied before a component is stored.

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::core::component::{Component, NamedComponent};
use crate::core::name::{ComponentType, Name};

/// Shared handle to a customizer engine, as stored in a warehouse.
pub type CustomizerRef = Arc<dyn CustomizerEngine>;

impl Component for CustomizerRef {}

/// One transform of a freshly built component.
pub trait ComponentCustomizer: Send + Sync {
    /// Lower priorities run first.
    fn priority(&self) -> i32 {
        0
    }

    fn customize(&self, component: NamedComponent) -> Result<NamedComponent>;
}

/// Decides which components it customizes and supplies the transform.
///
/// Customizer engines are themselves components, built once after the
/// machine bootstrap; they never customize machines or each other.
pub trait CustomizerEngine: Send + Sync + fmt::Debug {
    fn can_customize(&self, name: &Name) -> bool;

    fn customizer(&self, name: &Name) -> Arc<dyn ComponentCustomizer>;
}

type Transform<T> = dyn Fn(&Name, &T) -> Result<T> + Send + Sync;

/// Customizes every component declared with type `T` using a closure.
pub struct TypeCustomizer<T> {
    priority: i32,
    transform: Arc<Transform<T>>,
}

impl<T: Component> TypeCustomizer<T> {
    pub fn new<F>(priority: i32, transform: F) -> Self
    where
        F: Fn(&Name, &T) -> Result<T> + Send + Sync + 'static,
    {
        TypeCustomizer {
            priority,
            transform: Arc::new(transform),
        }
    }

    /// Shared engine handle, ready to be registered as a component.
    pub fn into_ref(self) -> CustomizerRef {
        Arc::new(self)
    }
}

impl<T> Clone for TypeCustomizer<T> {
    fn clone(&self) -> Self {
        TypeCustomizer {
            priority: self.priority,
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<T: Component> ComponentCustomizer for TypeCustomizer<T> {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn customize(&self, component: NamedComponent) -> Result<NamedComponent> {
        let name = component.name();
        let value = component
            .value::<T>()
            .ok_or_else(|| anyhow!("{} is not a `{}`", name, std::any::type_name::<T>()))?;
        let customized = (self.transform)(&name, value)?;
        Ok(component.map(customized))
    }
}

impl<T: Component> CustomizerEngine for TypeCustomizer<T> {
    fn can_customize(&self, name: &Name) -> bool {
        name.declared() == ComponentType::of::<T>()
    }

    fn customizer(&self, _name: &Name) -> Arc<dyn ComponentCustomizer> {
        Arc::new(self.clone())
    }
}

impl<T> fmt::Debug for TypeCustomizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCustomizer")
            .field("type", &std::any::type_name::<T>())
            .field("priority", &self.priority)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_customizer() {
        let engine = TypeCustomizer::<String>::new(0, |_, value| Ok(format!("{} world", value)));
        let name = Name::of::<String>("test");

        assert!(engine.can_customize(&name));
        assert!(!engine.can_customize(&Name::of::<u32>("test")));

        let customized = engine
            .customizer(&name)
            .customize(NamedComponent::new(name, "hello".to_string()))
            .unwrap();
        assert_eq!(customized.value::<String>().unwrap(), "hello world");
    }

    #[test]
    fn test_type_customizer_rejects_other_types() {
        let engine = TypeCustomizer::<String>::new(0, |_, value| Ok(value.clone()));
        let name = Name::of::<u32>("n");

        let result = engine.customizer(&name).customize(NamedComponent::new(name, 1u32));
        assert!(result.is_err());
    }
}
