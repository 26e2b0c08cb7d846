//! Component stores.
//!
//! A warehouse caches built component boxes by [`Name`], together with the
//! satisfied bill of materials that produced them. Warehouses can be chained:
//! a checkout miss is delegated read-through to provider warehouses in order.

mod filtered;
mod std_warehouse;

pub use filtered::FilteredWarehouse;
pub use std_warehouse::StdWarehouse;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::core::bom::SatisfiedBOM;
use crate::core::component::NamedComponent;
use crate::core::component_box::ComponentBox;
use crate::core::name::Name;
use crate::resolver::errors::FactoryError;

/// Shared handle to a warehouse.
pub type WarehouseRef = Arc<dyn Warehouse>;

/// A checked in box with the materials it was built from.
#[derive(Clone)]
pub struct StoredBox {
    boxed: Arc<ComponentBox>,
    satisfied: Arc<SatisfiedBOM>,
    build_time: Duration,
}

impl StoredBox {
    pub fn new(boxed: ComponentBox, satisfied: Arc<SatisfiedBOM>, build_time: Duration) -> Self {
        StoredBox {
            boxed: Arc::new(boxed),
            satisfied,
            build_time,
        }
    }

    pub fn boxed(&self) -> &ComponentBox {
        &self.boxed
    }

    pub fn satisfied(&self) -> &SatisfiedBOM {
        &self.satisfied
    }

    /// Time spent in the build function and customizers.
    pub fn build_time(&self) -> Duration {
        self.build_time
    }
}

impl fmt::Debug for StoredBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredBox")
            .field("box", &self.boxed)
            .field("build_time", &self.build_time)
            .finish()
    }
}

/// A keyed cache of component boxes.
pub trait Warehouse: Send + Sync + fmt::Debug {
    /// Identifier used in logs and dumps.
    fn id(&self) -> &str;

    /// Warehouses consulted on a local miss, in order.
    fn providers(&self) -> &[WarehouseRef];

    /// The stored box for `name`, looking in providers on a local miss.
    fn stored_box(&self, name: &Name) -> Option<StoredBox>;

    /// Store a freshly built box, closing any box it replaces.
    fn checkin(&self, boxed: ComponentBox, satisfied: Arc<SatisfiedBOM>, build_time: Duration);

    /// Names of every stored component, providers included.
    fn list_names(&self) -> Vec<Name>;

    /// Close every locally checked in box.
    ///
    /// Boxes owned by providers are never closed.
    fn close(&self) -> Result<(), FactoryError>;

    /// Retrieve a stored component, building nothing.
    fn checkout(&self, name: &Name) -> Option<NamedComponent> {
        self.stored_box(name).and_then(|stored| stored.boxed().pick())
    }

    /// Whether a checkout would currently succeed, without consuming
    /// single-use boxes.
    fn is_available(&self, name: &Name) -> bool {
        self.stored_box(name)
            .map(|stored| stored.boxed().is_available())
            .unwrap_or(false)
    }

    /// Names of the components `name` was built from.
    fn list_dependencies(&self, name: &Name) -> Vec<Name> {
        self.stored_box(name)
            .map(|stored| {
                stored
                    .satisfied()
                    .all_components()
                    .map(NamedComponent::name)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Render the dependency tree of a stored component, one name per line.
pub fn dependency_tree(warehouse: &dyn Warehouse, name: &Name) -> String {
    let mut out = String::new();
    write_tree(warehouse, name, 0, &mut Vec::new(), &mut out);
    out
}

fn write_tree(
    warehouse: &dyn Warehouse,
    name: &Name,
    depth: usize,
    stack: &mut Vec<Name>,
    out: &mut String,
) {
    if depth == 0 {
        out.push_str(&name.simple_name());
    } else {
        out.push_str(&format!("{}+-> {}", "  ".repeat(depth - 1), name.simple_name()));
    }

    // stored graphs are acyclic, the stack only guards against odd providers
    if stack.contains(name) {
        out.push_str(" (cycle)\n");
        return;
    }
    out.push('\n');

    stack.push(*name);
    for dep in warehouse.list_dependencies(name) {
        write_tree(warehouse, &dep, depth + 1, stack, out);
    }
    stack.pop();
}
