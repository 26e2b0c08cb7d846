//! A warehouse view hiding some components.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::core::bom::SatisfiedBOM;
use crate::core::component_box::ComponentBox;
use crate::core::name::{ComponentType, Name};
use crate::resolver::errors::FactoryError;
use crate::warehouse::{StoredBox, Warehouse, WarehouseRef};

/// Wraps a warehouse and answers as if filtered components were absent.
///
/// Only lookups are filtered: checkin and close go straight to the wrapped
/// warehouse. Used as a provider, it forces a layered factory to rebuild the
/// hidden components instead of reusing them.
#[derive(Debug)]
pub struct FilteredWarehouse {
    original: WarehouseRef,
    names: HashSet<Name>,
    types: HashSet<ComponentType>,
}

impl FilteredWarehouse {
    pub fn new(original: WarehouseRef) -> Self {
        FilteredWarehouse {
            original,
            names: HashSet::new(),
            types: HashSet::new(),
        }
    }

    /// Hide every listed name.
    pub fn for_names(original: WarehouseRef, names: impl IntoIterator<Item = Name>) -> Self {
        names.into_iter().fold(Self::new(original), Self::hide_name)
    }

    /// Hide every component declared with one of the listed types.
    pub fn for_types(
        original: WarehouseRef,
        types: impl IntoIterator<Item = ComponentType>,
    ) -> Self {
        types.into_iter().fold(Self::new(original), Self::hide_type)
    }

    pub fn hide_name(mut self, name: Name) -> Self {
        self.names.insert(name);
        self
    }

    pub fn hide_type(mut self, ty: ComponentType) -> Self {
        self.types.insert(ty);
        self
    }

    fn is_filtered(&self, name: &Name) -> bool {
        self.names.contains(name) || self.types.contains(&name.declared())
    }
}

impl Warehouse for FilteredWarehouse {
    fn id(&self) -> &str {
        self.original.id()
    }

    fn providers(&self) -> &[WarehouseRef] {
        self.original.providers()
    }

    fn stored_box(&self, name: &Name) -> Option<StoredBox> {
        if self.is_filtered(name) {
            return None;
        }
        self.original.stored_box(name)
    }

    fn checkin(&self, boxed: ComponentBox, satisfied: Arc<SatisfiedBOM>, build_time: Duration) {
        self.original.checkin(boxed, satisfied, build_time)
    }

    fn list_names(&self) -> Vec<Name> {
        self.original
            .list_names()
            .into_iter()
            .filter(|name| !self.is_filtered(name))
            .collect()
    }

    fn list_dependencies(&self, name: &Name) -> Vec<Name> {
        if self.is_filtered(name) {
            return Vec::new();
        }
        self.original.list_dependencies(name)
    }

    fn close(&self) -> Result<(), FactoryError> {
        self.original.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::NamedComponent;
    use crate::warehouse::StdWarehouse;

    fn stocked() -> WarehouseRef {
        let warehouse = StdWarehouse::new();
        for (id, value) in [("a", "1"), ("b", "2")] {
            warehouse.checkin(
                ComponentBox::reusable(NamedComponent::of(id, value.to_string())),
                Arc::new(SatisfiedBOM::empty()),
                Duration::ZERO,
            );
        }
        warehouse.checkin(
            ComponentBox::reusable(NamedComponent::of("n", 3u32)),
            Arc::new(SatisfiedBOM::empty()),
            Duration::ZERO,
        );
        Arc::new(warehouse)
    }

    #[test]
    fn test_filter_by_name() {
        let original = stocked();
        let filtered = FilteredWarehouse::for_names(original.clone(), [Name::of::<String>("a")]);

        assert!(filtered.checkout(&Name::of::<String>("a")).is_none());
        assert!(filtered.checkout(&Name::of::<String>("b")).is_some());
        assert_eq!(filtered.list_names().len(), 2);
        assert_eq!(filtered.id(), original.id());
    }

    #[test]
    fn test_filter_by_type() {
        let filtered = FilteredWarehouse::for_types(stocked(), [ComponentType::of::<String>()]);

        assert!(!filtered.is_available(&Name::of::<String>("b")));
        assert_eq!(filtered.list_names(), vec![Name::of::<u32>("n")]);
    }
}
