//! Schema declarativo de parámetros de modelo.
//!
//! Rol en el flujo:
//! - Cada adapter declara sus parámetros ajustables como datos
//!   (`ParameterSpec`), no por introspección de tipos.
//! - `ParameterSchema::new` valida la declaración completa al construirse
//!   (fail fast, antes de servir ninguna petición).
//! - `ParameterSchema::validate` convierte un mapa crudo clave→valor en un
//!   `ParameterRecord` tipado, agregando TODOS los errores por campo en una
//!   sola respuesta (nunca corta en el primero).

pub mod schema;
pub mod spec;

pub use schema::{ParamErrors, ParameterRecord, ParameterSchema};
pub use spec::{EnumParam, ParamKind, ParamValue, ParameterSpec, Unit};
