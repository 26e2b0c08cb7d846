//! Machines - build recipes and prioritized groups of recipes.
//!
//! A [`MachineEngine`] builds one named component from its satisfied bill of
//! materials. A [`FactoryMachine`] groups engines and advertises, for any
//! requested type, the names it is able to build. Lower priorities win.

use std::fmt;
use std::sync::Arc;

use anyhow::Result;

use crate::core::bom::{BillOfMaterials, SatisfiedBOM};
use crate::core::component::{Component, NamedComponent};
use crate::core::component_box::{BoxKind, ComponentBox};
use crate::core::name::{ComponentType, Name};
use crate::core::query::Query;

/// Shared handle to a machine, as stored in a warehouse.
pub type MachineRef = Arc<dyn FactoryMachine>;

/// Shared handle to an engine.
pub type EngineRef = Arc<dyn MachineEngine>;

impl Component for MachineRef {}

/// A single build recipe.
pub trait MachineEngine: Send + Sync + fmt::Debug {
    /// The name of the component this engine builds.
    fn name(&self) -> Name;

    /// Priority of the built component, used to order multi-result queries.
    fn priority(&self) -> i32 {
        0
    }

    /// Dependencies, declared up front.
    fn bill_of_materials(&self) -> &BillOfMaterials;

    /// Extra types (usually capability traits) the component is visible as.
    fn exposes(&self) -> &[ComponentType] {
        &[]
    }

    /// Build the component from its resolved dependencies.
    fn build(&self, satisfied: &SatisfiedBOM) -> Result<ComponentBox>;
}

/// A prioritized group of engines.
pub trait FactoryMachine: Send + Sync + fmt::Debug {
    fn can_build(&self, name: &Name) -> bool;

    /// The engine building `name`, if this machine can build it.
    fn engine(&self, name: &Name) -> Option<EngineRef>;

    /// Every name this machine can build whose type matches `ty`.
    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name>;

    /// Lower priorities are preferred.
    fn priority(&self) -> i32;
}

/// Whether a component named `name`, also exposed as `exposes`, answers a
/// query for `ty`.
pub fn matches_type(ty: &ComponentType, name: &Name, exposes: &[ComponentType]) -> bool {
    ty.accepts(&name.declared()) || exposes.contains(ty)
}

type BuildFn = dyn Fn(&SatisfiedBOM) -> Result<Arc<dyn Component>> + Send + Sync;

/// A closure-based engine.
///
/// ```rust,ignore
/// let dep = Query::by_name(Name::of::<String>("test"));
/// let engine = StdEngine::new(Name::of::<String>("test2"))
///     .with_bom(BillOfMaterials::of([dep]))
///     .build_with(move |bom| Ok(format!("{} value2", bom.require::<String>(&dep)?)));
/// ```
pub struct StdEngine {
    name: Name,
    priority: i32,
    bom: BillOfMaterials,
    exposes: Vec<ComponentType>,
    kind: BoxKind,
    build: Arc<BuildFn>,
}

/// Builder half of [`StdEngine`], before the build closure is known.
pub struct StdEngineBuilder {
    name: Name,
    priority: i32,
    bom: BillOfMaterials,
    exposes: Vec<ComponentType>,
    kind: BoxKind,
}

impl StdEngine {
    #[allow(clippy::new_ret_no_self)]
    pub fn new(name: Name) -> StdEngineBuilder {
        StdEngineBuilder {
            name,
            priority: 0,
            bom: BillOfMaterials::empty(),
            exposes: Vec::new(),
            kind: BoxKind::Reusable,
        }
    }
}

impl StdEngineBuilder {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_bom(mut self, bom: BillOfMaterials) -> Self {
        self.bom = bom;
        self
    }

    pub fn with_dependencies(mut self, queries: impl IntoIterator<Item = Query>) -> Self {
        self.bom = self.bom.add_queries(queries);
        self
    }

    /// Make the component visible to queries for `T` too.
    pub fn exposing<T: ?Sized + 'static>(mut self) -> Self {
        let ty = ComponentType::of::<T>();
        if !self.exposes.contains(&ty) {
            self.exposes.push(ty);
        }
        self
    }

    /// Hand out each built instance only once.
    pub fn single_use(mut self) -> Self {
        self.kind = BoxKind::SingleUse;
        self
    }

    pub fn build_with<T, F>(self, build: F) -> StdEngine
    where
        T: Component,
        F: Fn(&SatisfiedBOM) -> Result<T> + Send + Sync + 'static,
    {
        StdEngine {
            name: self.name,
            priority: self.priority,
            bom: self.bom,
            exposes: self.exposes,
            kind: self.kind,
            build: Arc::new(move |satisfied: &SatisfiedBOM| {
                let component: Arc<dyn Component> = Arc::new(build(satisfied)?);
                Ok(component)
            }),
        }
    }
}

impl MachineEngine for StdEngine {
    fn name(&self) -> Name {
        self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn bill_of_materials(&self) -> &BillOfMaterials {
        &self.bom
    }

    fn exposes(&self) -> &[ComponentType] {
        &self.exposes
    }

    fn build(&self, satisfied: &SatisfiedBOM) -> Result<ComponentBox> {
        let component = (self.build)(satisfied)?;
        Ok(ComponentBox::new(
            self.kind,
            NamedComponent::from_shared(self.name, self.priority, component),
        ))
    }
}

impl fmt::Debug for StdEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdEngine")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("kind", &self.kind)
            .finish()
    }
}

/// A machine building exactly one name with one engine.
#[derive(Debug, Clone)]
pub struct SingleNameMachine {
    priority: i32,
    engine: EngineRef,
}

impl SingleNameMachine {
    pub fn new(priority: i32, engine: impl MachineEngine + 'static) -> Self {
        Self::from_engine(priority, Arc::new(engine))
    }

    pub fn from_engine(priority: i32, engine: EngineRef) -> Self {
        SingleNameMachine { priority, engine }
    }

    /// Shared machine handle.
    pub fn into_ref(self) -> MachineRef {
        Arc::new(self)
    }
}

impl FactoryMachine for SingleNameMachine {
    fn can_build(&self, name: &Name) -> bool {
        self.engine.name() == *name
    }

    fn engine(&self, name: &Name) -> Option<EngineRef> {
        self.can_build(name).then(|| Arc::clone(&self.engine))
    }

    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name> {
        let name = self.engine.name();
        if matches_type(ty, &name, self.engine.exposes()) {
            vec![name]
        } else {
            Vec::new()
        }
    }

    fn priority(&self) -> i32 {
        self.priority
    }
}

/// Engine handing out an already built component.
#[derive(Debug, Clone)]
struct SingletonEngine {
    component: NamedComponent,
    bom: BillOfMaterials,
    exposes: Vec<ComponentType>,
}

impl MachineEngine for SingletonEngine {
    fn name(&self) -> Name {
        self.component.name()
    }

    fn priority(&self) -> i32 {
        self.component.priority()
    }

    fn bill_of_materials(&self) -> &BillOfMaterials {
        &self.bom
    }

    fn exposes(&self) -> &[ComponentType] {
        &self.exposes
    }

    fn build(&self, _satisfied: &SatisfiedBOM) -> Result<ComponentBox> {
        Ok(ComponentBox::reusable(self.component.clone()))
    }
}

/// A machine providing one already built component.
#[derive(Debug, Clone)]
pub struct SingletonMachine {
    inner: SingleNameMachine,
}

impl SingletonMachine {
    pub fn new(priority: i32, component: NamedComponent) -> Self {
        Self::exposing(priority, component, Vec::new())
    }

    /// A singleton also visible as the given types.
    pub fn exposing(priority: i32, component: NamedComponent, exposes: Vec<ComponentType>) -> Self {
        let engine = SingletonEngine {
            component,
            bom: BillOfMaterials::empty(),
            exposes,
        };
        SingletonMachine {
            inner: SingleNameMachine::new(priority, engine),
        }
    }

    pub fn into_ref(self) -> MachineRef {
        Arc::new(self)
    }
}

impl FactoryMachine for SingletonMachine {
    fn can_build(&self, name: &Name) -> bool {
        self.inner.can_build(name)
    }

    fn engine(&self, name: &Name) -> Option<EngineRef> {
        self.inner.engine(name)
    }

    fn names_buildable(&self, ty: &ComponentType) -> Vec<Name> {
        self.inner.names_buildable(ty)
    }

    fn priority(&self) -> i32 {
        self.inner.priority()
    }
}

/// A machine building nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyMachine;

impl FactoryMachine for EmptyMachine {
    fn can_build(&self, _name: &Name) -> bool {
        false
    }

    fn engine(&self, _name: &Name) -> Option<EngineRef> {
        None
    }

    fn names_buildable(&self, _ty: &ComponentType) -> Vec<Name> {
        Vec::new()
    }

    fn priority(&self) -> i32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::component::AutoStartable;

    #[test]
    fn test_single_name_machine() {
        let machine = SingleNameMachine::new(
            5,
            StdEngine::new(Name::of::<String>("test")).build_with(|_| Ok("value1".to_string())),
        );

        assert!(machine.can_build(&Name::of::<String>("test")));
        assert!(!machine.can_build(&Name::of::<String>("other")));
        assert!(machine.engine(&Name::of::<String>("other")).is_none());
        assert_eq!(
            machine.names_buildable(&ComponentType::of::<String>()),
            vec![Name::of::<String>("test")]
        );
        assert_eq!(
            machine.names_buildable(&ComponentType::any()),
            vec![Name::of::<String>("test")]
        );
        assert!(machine.names_buildable(&ComponentType::of::<u32>()).is_empty());
        assert_eq!(machine.priority(), 5);
    }

    #[test]
    fn test_std_engine_builds_box() {
        let engine = StdEngine::new(Name::of::<String>("test"))
            .with_priority(3)
            .single_use()
            .build_with(|_| Ok("value1".to_string()));

        let boxed = engine.build(&SatisfiedBOM::empty()).unwrap();
        assert_eq!(boxed.kind(), BoxKind::SingleUse);

        let picked = boxed.pick().unwrap();
        assert_eq!(picked.priority(), 3);
        assert_eq!(picked.value::<String>().unwrap(), "value1");
    }

    #[test]
    fn test_exposed_types_are_buildable() {
        let engine = StdEngine::new(Name::of::<String>("job"))
            .exposing::<dyn AutoStartable>()
            .build_with(|_| Ok(String::new()));
        let machine = SingleNameMachine::new(0, engine);

        assert_eq!(
            machine.names_buildable(&ComponentType::of::<dyn AutoStartable>()),
            vec![Name::of::<String>("job")]
        );
    }

    #[test]
    fn test_singleton_machine_reuses_instance() {
        let component = NamedComponent::of("test", "hello".to_string());
        let machine = SingletonMachine::new(0, component.clone());

        let engine = machine.engine(&component.name()).unwrap();
        let picked = engine.build(&SatisfiedBOM::empty()).unwrap().pick().unwrap();
        assert!(picked.same_instance(&component));
    }
}
