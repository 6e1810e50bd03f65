//! chain-core: motor de composición de modelos encadenados.
//!
//! Piezas, de hoja a raíz:
//! - `adapter`: contrato uniforme de un modelo (`ModelAdapter` + descriptor).
//! - `registry`: registro explícito de adapters, poblado una vez al arranque.
//! - `gate`: validación/normalización/filtrado de concentraciones contra la
//!   whitelist de cada adapter.
//! - `store`: interfaz de persistencia inyectada (nodos + resultados) con
//!   implementación in-memory.
//! - `orchestrator`: valida la submission completa, persiste la cadena y la
//!   ejecuta secuencialmente en un worker fire-and-forget.
//! - `assembler`: reconstruye la vista de la cadena para polling.
//! - `dto`: shapes de petición/respuesta que serializa el transporte.

pub mod adapter;
pub mod assembler;
pub mod dto;
pub mod gate;
pub mod orchestrator;
pub mod registry;
pub mod store;

pub use adapter::{AdapterDescriptor, AdapterError, ModelAdapter, ModelCategory, StageInput, StageOutput};
pub use assembler::{ChainReader, ReadError};
pub use dto::{ChainedRunResponse, ModelInfo, ModelInput, RunRequest, RunStatus, StageRequest, StageView, ValidationDetail};
pub use orchestrator::{ChainOrchestrator, SubmitError};
pub use registry::{AdapterRegistry, RegistryError};
pub use store::{InMemorySimulationStore, NewNode, SimulationNode, SimulationStore, StageResult, StoreError};
