//! chain-adapters: modelos concretos registrables en el core.
//!
//! Cada adapter de este crate es local y determinista; los modelos que
//! llaman servicios remotos viven en sus propios crates de despliegue y
//! siguen el mismo contrato.

pub mod dryer;
pub mod example;

pub use dryer::DryerAdapter;
pub use example::ExampleAdapter;
