//! Orquestador de cadenas de simulación.
//!
//! Máquina de estados por cadena: `Building → Running → {Done, Failed}`.
//! - Submission: toda la validación es eager y atómica. Modelo desconocido o
//!   input inválido abortan la submission completa; no se persiste ningún
//!   nodo para una petición que falla los chequeos upfront.
//! - Ejecución: un worker fire-and-forget por cadena, stages estrictamente
//!   secuenciales (el input de cada stage depende del output del anterior).
//!   El primer fallo detiene la cadena: los stages posteriores quedan sin
//!   resultado para siempre, y así se distinguen de un run en curso.
//! - Sin retries, sin resume, sin cancelación, sin timeouts propios: un
//!   timeout es responsabilidad del `run` de cada adapter.

use std::sync::Arc;

use log::{debug, error, warn};
use thiserror::Error;
use tokio::task::JoinError;
use uuid::Uuid;

use chain_domain::{Concentrations, ParameterRecord};

use crate::adapter::{ModelAdapter, StageInput};
use crate::dto::{RunRequest, ValidationDetail};
use crate::gate;
use crate::registry::AdapterRegistry;
use crate::store::{NewNode, SimulationNode, SimulationStore, StageResult, StoreError};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("chain must contain at least one stage")]
    EmptyChain,
    #[error("unknown model '{0}'")]
    UnknownModel(String),
    /// Input inválido en el stage indicado; el detalle lleva la shape del 422.
    #[error("invalid inputs for stage {stage}")]
    Validation { stage: usize, detail: ValidationDetail },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Punto de entrada del core: valida, persiste y lanza la ejecución.
pub struct ChainOrchestrator {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn SimulationStore>,
}

impl ChainOrchestrator {
    pub fn new(registry: Arc<AdapterRegistry>, store: Arc<dyn SimulationStore>) -> Self {
        Self { registry, store }
    }

    pub fn store(&self) -> Arc<dyn SimulationStore> {
        self.store.clone()
    }

    /// Somete una cadena. Devuelve el id del nodo del ÚLTIMO stage, con el
    /// que el caller hace polling; la ejecución continúa en background.
    pub async fn submit(&self, request: RunRequest, credential: Option<String>) -> Result<Uuid, SubmitError> {
        if request.stages.is_empty() {
            return Err(SubmitError::EmptyChain);
        }

        // Resolución de adapters primero: un model_id desconocido aborta
        // antes de validar o persistir nada.
        let mut adapters: Vec<Arc<dyn ModelAdapter>> = Vec::with_capacity(request.stages.len());
        for stage in &request.stages {
            let adapter = self.registry
                              .get(&stage.model_id)
                              .ok_or_else(|| SubmitError::UnknownModel(stage.model_id.clone()))?;
            adapters.push(adapter.clone());
        }

        // Validación upfront de todos los stages: parámetros de todos,
        // concentraciones solo del raíz (los demás derivan su input del
        // stage anterior; lo que traigan en la petición se ignora).
        let mut validated: Vec<ParameterRecord> = Vec::with_capacity(request.stages.len());
        for (index, (stage, adapter)) in request.stages.iter().zip(&adapters).enumerate() {
            let descriptor = adapter.descriptor();
            let mut detail = ValidationDetail::default();

            if index == 0 {
                if let Err(errors) = gate::validate_input(descriptor, &stage.concentrations) {
                    detail.concentrations = errors;
                }
            }

            let parameters = match &descriptor.parameters {
                Some(schema) => match schema.validate(&stage.parameters) {
                    Ok(record) => record,
                    Err(errors) => {
                        detail.parameters = errors;
                        ParameterRecord::new()
                    }
                },
                None => {
                    // Sin schema declarado, cualquier parámetro es extra.
                    for name in stage.parameters.keys() {
                        detail.parameters
                              .entry(name.clone())
                              .or_default()
                              .push("Extra inputs are not permitted".to_string());
                    }
                    ParameterRecord::new()
                }
            };

            if !detail.is_empty() {
                return Err(SubmitError::Validation { stage: index, detail });
            }
            validated.push(parameters);
        }

        // Persistencia atómica de la cadena completa, ya enlazada.
        let new_nodes: Vec<NewNode> =
            request.stages
                   .iter()
                   .zip(&adapters)
                   .zip(validated)
                   .enumerate()
                   .map(|(index, ((stage, adapter), parameters))| {
                       let input = if index == 0 {
                           gate::normalize(adapter.descriptor(), &stage.concentrations)
                       } else {
                           Concentrations::new()
                       };
                       NewNode { model_id: stage.model_id.clone(),
                                 parameters,
                                 input_concentrations: input }
                   })
                   .collect();

        let nodes = self.store.create_chain(new_nodes)?;
        let last_id = nodes.last().map(|n| n.id).ok_or(SubmitError::EmptyChain)?;
        debug!("chain {last_id}: persisted {} stage(s), starting worker", nodes.len());

        tokio::spawn(run_chain(self.store.clone(), adapters, nodes, credential));

        Ok(last_id)
    }
}

/// Worker de una cadena: camina los stages en orden, propagando el output
/// filtrado de cada stage como input del siguiente, y se detiene en el
/// primer fallo.
async fn run_chain(store: Arc<dyn SimulationStore>,
                   adapters: Vec<Arc<dyn ModelAdapter>>,
                   nodes: Vec<SimulationNode>,
                   credential: Option<String>) {
    let mut carried: Option<Concentrations> = None;
    for (node, adapter) in nodes.iter().zip(adapters) {
        let descriptor = adapter.descriptor();
        let input = match &carried {
            // Raíz: el input normalizado que sembró el caller.
            None => node.input_concentrations.clone(),
            // Resto: output del stage anterior, recortado a la whitelist de
            // este adapter y con defaults 0.0 para lo que falte.
            Some(previous) => gate::normalize(descriptor, &gate::forward_filter(descriptor, previous)),
        };

        let stage_input = StageInput { concentrations: input.clone(),
                                       parameters: node.parameters.clone(),
                                       credential: credential.clone() };

        // El run corre en su propia task: un panic dentro del adapter se
        // captura como JoinError y se registra como fallo del stage, nunca
        // tumba el worker.
        let handle = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.run(stage_input).await }
        });

        let outcome = match handle.await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(err)) => Err(err.to_string()),
            Err(join_err) => Err(panic_message(join_err)),
        };

        match outcome {
            Ok(output) => {
                let result = StageResult::success(input, output.concentrations.clone(), output.panels);
                if let Err(err) = store.attach_result(node.id, result) {
                    error!("chain worker: could not attach result to node {}: {err}", node.id);
                    return;
                }
                carried = Some(output.concentrations);
            }
            Err(message) => {
                warn!("stage '{}' (node {}) failed: {message}", node.model_id, node.id);
                let result = StageResult::failure(input, message);
                if let Err(err) = store.attach_result(node.id, result) {
                    error!("chain worker: could not attach failure to node {}: {err}", node.id);
                }
                // Halt: los stages posteriores no reciben resultado nunca.
                return;
            }
        }
    }
}

/// Mensaje legible a partir de un panic capturado en la task del adapter.
fn panic_message(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        let msg = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else {
            "unknown panic".to_string()
        };
        format!("Model failed to calculate the change: {msg}")
    } else {
        "Model failed to calculate the change: task cancelled".to_string()
    }
}
