//! Ready-made machines.
//!
//! - [`SettingsMachine`]: string settings, at priority -1000
//! - [`DeactivationMachine`]: `"false"` activation flags, at priority -10000
//! - [`WarehouseProvidersMachine`]: components of provider warehouses
//! - [`AlternativesMachine`]: a machine chosen by a setting

pub mod alternatives;
pub mod deactivation;
pub mod providers;
pub mod settings;

pub use alternatives::AlternativesMachine;
pub use deactivation::DeactivationMachine;
pub use providers::WarehouseProvidersMachine;
pub use settings::SettingsMachine;
