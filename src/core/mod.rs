//! Core data structures.
//!
//! This module contains the value types the resolver works with:
//! - Interned identities (Name, ComponentType)
//! - Queries and bills of materials
//! - Components, their boxes and customizers
//! - Machines and engines

pub mod bom;
pub mod component;
pub mod component_box;
pub mod customizer;
pub mod machine;
pub mod name;
pub mod query;

pub use bom::{BillOfMaterials, SatisfiedBOM};
pub use component::{AutoClosable, AutoPreparable, AutoStartable, Component, NamedComponent};
pub use component_box::{BoxKind, ComponentBox};
pub use customizer::{ComponentCustomizer, CustomizerEngine, CustomizerRef, TypeCustomizer};
pub use machine::{
    EmptyMachine, EngineRef, FactoryMachine, MachineEngine, MachineRef, SingleNameMachine,
    SingletonMachine, StdEngine, StdEngineBuilder,
};
pub use name::{ComponentType, Name};
pub use query::{Query, QueryKind};
