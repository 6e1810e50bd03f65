//! Interfaz de persistencia inyectada del orquestador.
//!
//! El core solo depende de este trait; el backend concreto (in-memory para
//! tests/demo, Postgres en despliegue) es decisión del wiring. Contrato:
//! - `create_chain` es atómico: o se persiste la cadena completa enlazada o
//!   nada.
//! - `attach_result` escribe el resultado de un nodo exactamente una vez; un
//!   segundo intento es `Conflict`.
//! - Las lecturas no bloquean la ejecución en curso: observan lo persistido.

pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use chain_domain::{Concentrations, Panel, ParameterRecord};

pub use memory::InMemorySimulationStore;

/// Datos de un nodo aún sin persistir. El store asigna id, timestamp y
/// enlace `previous_node_id` según el orden recibido.
#[derive(Debug, Clone)]
pub struct NewNode {
    pub model_id: String,
    pub parameters: ParameterRecord,
    /// Input sembrado por el caller: solo significativo en el nodo raíz, los
    /// demás stages derivan su input del output anterior al ejecutarse.
    pub input_concentrations: Concentrations,
}

/// Un stage materializado. Inmutable desde su creación; lo único que se
/// adjunta después (una sola vez) es el `StageResult`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationNode {
    pub id: Uuid,
    pub model_id: String,
    pub parameters: ParameterRecord,
    pub input_concentrations: Concentrations,
    /// `None` para la raíz de la cadena.
    pub previous_node_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub result: Option<StageResult>,
}

/// Resultado de ejecutar un stage. Ausencia = stage todavía pendiente.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Input efectivamente alimentado al modelo (ya filtrado y normalizado).
    pub input_concentrations: Concentrations,
    /// Vacío cuando el stage falló.
    pub output_concentrations: Concentrations,
    pub panels: Vec<Panel>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StageResult {
    pub fn success(input: Concentrations, output: Concentrations, panels: Vec<Panel>) -> Self {
        Self { input_concentrations: input,
               output_concentrations: output,
               panels,
               error: None,
               created_at: Utc::now() }
    }

    pub fn failure(input: Concentrations, error: impl Into<String>) -> Self {
        Self { input_concentrations: input,
               output_concentrations: Concentrations::new(),
               panels: Vec::new(),
               error: Some(error.into()),
               created_at: Utc::now() }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("node not found")]
    NotFound,
    #[error("result already attached to node {0}")]
    Conflict(Uuid),
    #[error("invalid chain: {0}")]
    InvalidChain(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Operaciones de persistencia que necesita el orquestador.
pub trait SimulationStore: Send + Sync {
    /// Persiste la cadena completa (raíz primero) y devuelve los nodos
    /// creados, enlazados vía `previous_node_id`.
    fn create_chain(&self, stages: Vec<NewNode>) -> Result<Vec<SimulationNode>, StoreError>;

    /// Adjunta el resultado de un nodo. Exactamente una vez por nodo.
    fn attach_result(&self, node_id: Uuid, result: StageResult) -> Result<(), StoreError>;

    /// Nodo individual, con su resultado si ya existe.
    fn get_node(&self, node_id: Uuid) -> Result<SimulationNode, StoreError>;

    /// Cadena completa alcanzable desde `node_id` caminando hacia atrás por
    /// `previous_node_id`, devuelta raíz→hoja.
    fn get_chain(&self, node_id: Uuid) -> Result<Vec<SimulationNode>, StoreError>;
}
