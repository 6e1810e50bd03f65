//! Reconstrucción de la vista de una cadena a partir de nodos persistidos.
//!
//! Lectura libre de side effects, apta para polling: camina hacia atrás
//! desde el nodo consultado hasta la raíz, invierte a orden raíz→hoja y
//! computa el estado. El estado no se almacena: se deriva de qué nodos
//! tienen resultado y con qué error.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use chain_domain::Concentrations;

use crate::dto::{ChainedRunResponse, ModelInput, RunStatus, StageView};
use crate::store::{SimulationNode, SimulationStore, StoreError};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("simulation not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ReadError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => ReadError::NotFound,
            other => ReadError::Store(other),
        }
    }
}

/// Lector de cadenas: la contraparte de solo-lectura del orquestador.
pub struct ChainReader {
    store: Arc<dyn SimulationStore>,
}

impl ChainReader {
    pub fn new(store: Arc<dyn SimulationStore>) -> Self {
        Self { store }
    }

    /// Estado actual de la cadena alcanzable desde `node_id`.
    pub fn read(&self, node_id: Uuid) -> Result<ChainedRunResponse, ReadError> {
        let nodes = self.store.get_chain(node_id)?;

        let stages: Vec<StageView> = nodes.iter().map(stage_view).collect();

        // `failed` gana en cuanto algún resultado trae error, sin importar lo
        // que haya después; `pending` gana sobre `done` mientras falte algún
        // resultado.
        let status = if stages.iter().any(|s| s.status == RunStatus::Failed) {
            RunStatus::Failed
        } else if stages.iter().any(|s| s.status == RunStatus::Pending) {
            RunStatus::Pending
        } else {
            RunStatus::Done
        };

        Ok(ChainedRunResponse { status, stages })
    }
}

fn stage_view(node: &SimulationNode) -> StageView {
    let status = match &node.result {
        None => RunStatus::Pending,
        Some(r) if r.succeeded() => RunStatus::Done,
        Some(_) => RunStatus::Failed,
    };

    // Input efectivo: el registrado en el resultado cuando el stage ya corrió;
    // para una raíz pendiente, el input sembrado en el nodo. Un stage no-raíz
    // pendiente aún no tiene input determinado.
    let concentrations = match &node.result {
        Some(r) => r.input_concentrations.clone(),
        None if node.previous_node_id.is_none() => node.input_concentrations.clone(),
        None => Concentrations::new(),
    };

    StageView { status,
                model_input: ModelInput { model_id: node.model_id.clone(),
                                          concentrations,
                                          parameters: node.parameters.clone() },
                final_concentrations: node.result
                                          .as_ref()
                                          .filter(|r| r.succeeded())
                                          .map(|r| r.output_concentrations.clone()),
                panels: node.result.as_ref().map(|r| r.panels.clone()).unwrap_or_default(),
                error: node.result.as_ref().and_then(|r| r.error.clone()) }
}
