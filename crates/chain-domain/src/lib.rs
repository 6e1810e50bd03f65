// chain-domain library entry point
pub mod concentration;
pub mod error;
pub mod panel;
pub mod params;

pub use concentration::{Compound, Concentrations};
pub use error::SchemaError;
pub use panel::{Panel, ReactionPath};
pub use params::{EnumParam, ParamErrors, ParamKind, ParamValue, ParameterRecord, ParameterSchema, ParameterSpec, Unit};
