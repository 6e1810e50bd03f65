//! Store in-memory sobre `DashMap`, para tests y el binario demo.
//!
//! Paridad de contrato con el backend Postgres: mismas reglas de atomicidad,
//! conflicto y orden de lectura.

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{NewNode, SimulationNode, SimulationStore, StageResult, StoreError};

#[derive(Default)]
pub struct InMemorySimulationStore {
    nodes: DashMap<Uuid, SimulationNode>,
}

impl InMemorySimulationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl SimulationStore for InMemorySimulationStore {
    fn create_chain(&self, stages: Vec<NewNode>) -> Result<Vec<SimulationNode>, StoreError> {
        if stages.is_empty() {
            return Err(StoreError::InvalidChain("chain must contain at least one stage".into()));
        }
        // Construcción completa antes de insertar: el enlace queda correcto
        // por construcción y la inserción no puede fallar a medias.
        let mut created: Vec<SimulationNode> = Vec::with_capacity(stages.len());
        let mut previous: Option<Uuid> = None;
        for stage in stages {
            let node = SimulationNode { id: Uuid::new_v4(),
                                        model_id: stage.model_id,
                                        parameters: stage.parameters,
                                        input_concentrations: stage.input_concentrations,
                                        previous_node_id: previous,
                                        created_at: Utc::now(),
                                        result: None };
            previous = Some(node.id);
            created.push(node);
        }
        for node in &created {
            self.nodes.insert(node.id, node.clone());
        }
        Ok(created)
    }

    fn attach_result(&self, node_id: Uuid, result: StageResult) -> Result<(), StoreError> {
        let mut entry = self.nodes.get_mut(&node_id).ok_or(StoreError::NotFound)?;
        if entry.result.is_some() {
            return Err(StoreError::Conflict(node_id));
        }
        entry.result = Some(result);
        Ok(())
    }

    fn get_node(&self, node_id: Uuid) -> Result<SimulationNode, StoreError> {
        self.nodes
            .get(&node_id)
            .map(|n| n.value().clone())
            .ok_or(StoreError::NotFound)
    }

    fn get_chain(&self, node_id: Uuid) -> Result<Vec<SimulationNode>, StoreError> {
        let mut chain: Vec<SimulationNode> = Vec::new();
        let mut cursor = Some(node_id);
        while let Some(id) = cursor {
            // Enlace roto o cíclico: lo tratamos como cadena inválida en vez
            // de colgar la lectura.
            if chain.iter().any(|n| n.id == id) {
                return Err(StoreError::InvalidChain(format!("cycle detected at node {id}")));
            }
            let node = self.get_node(id)?;
            cursor = node.previous_node_id;
            chain.push(node);
        }
        chain.reverse();
        Ok(chain)
    }
}
