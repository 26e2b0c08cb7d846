//! Shared utilities

pub mod config;
pub mod diagnostic;

pub use config::Config;
pub use diagnostic::Diagnostic;
