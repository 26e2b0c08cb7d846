//! Component factory - an in-process dependency resolver
//!
//! Prioritized build recipes ("machines") produce named, typed components.
//! Requesting a component materializes its whole dependency graph, in
//! dependency order, exactly once per warehouse.
//!
//! ```rust,ignore
//! use factory::{Factory, Name, Query, SingleNameMachine, StdEngine};
//!
//! let test = Name::of::<String>("test");
//! let dep = Query::by_name(test);
//! let factory = Factory::builder()
//!     .add_machine(SingleNameMachine::new(
//!         0,
//!         StdEngine::new(test).build_with(|_| Ok("value1".to_string())),
//!     ))
//!     .add_machine(SingleNameMachine::new(
//!         0,
//!         StdEngine::new(Name::of::<String>("test2"))
//!             .with_dependencies([dep])
//!             .build_with(move |bom| Ok(format!("{} value2", bom.require::<String>(&dep)?))),
//!     ))
//!     .build()?;
//!
//! assert_eq!(*factory.get::<String>(&Name::of::<String>("test2"))?, "value1 value2");
//! ```

pub mod core;
pub mod machines;
pub mod resolver;
pub mod util;
pub mod warehouse;

pub use self::core::{
    AutoClosable, AutoPreparable, AutoStartable, BillOfMaterials, BoxKind, Component,
    ComponentBox, ComponentCustomizer, ComponentType, CustomizerEngine, CustomizerRef,
    EmptyMachine, EngineRef, FactoryMachine, MachineEngine, MachineRef, Name, NamedComponent,
    Query, QueryKind, SatisfiedBOM, SingleNameMachine, SingletonMachine, StdEngine,
    TypeCustomizer,
};
pub use self::machines::{
    AlternativesMachine, DeactivationMachine, SettingsMachine, WarehouseProvidersMachine,
};
pub use resolver::activation::{activation_key, activation_key_for};
pub use resolver::{BoundQuery, Candidate, Factory, FactoryBuilder, FactoryError};
pub use util::config::Config;
pub use warehouse::{FilteredWarehouse, StdWarehouse, StoredBox, Warehouse, WarehouseRef};
