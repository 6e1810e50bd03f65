//! Registro explícito de adapters.
//!
//! Estado por proceso: se puebla una vez al wiring (o en el setup de cada
//! test) y se comparte inmutable vía `Arc` de ahí en adelante. No hay
//! auto-registro por side effects de import: registrar es una llamada
//! explícita, y una colisión de `model_id` es error fatal de configuración.
//!
//! El chequeo "el campo parameters debe ser un ParameterSchema" del diseño
//! original lo absorbe el sistema de tipos; la bien-formación interna del
//! schema ya quedó garantizada al construirlo.

use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::adapter::ModelAdapter;
use crate::dto::ModelInfo;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("model adapter with ID '{0}' has already been registered")]
    DuplicateModelId(String),
}

/// Mapa `model_id` → adapter, en orden de registro.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: IndexMap<String, Arc<dyn ModelAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un adapter. Falla si el `model_id` ya existe.
    pub fn register(&mut self, adapter: Arc<dyn ModelAdapter>) -> Result<(), RegistryError> {
        let model_id = adapter.descriptor().model_id.clone();
        if self.adapters.contains_key(&model_id) {
            return Err(RegistryError::DuplicateModelId(model_id));
        }
        self.adapters.insert(model_id, adapter);
        Ok(())
    }

    pub fn get(&self, model_id: &str) -> Option<&Arc<dyn ModelAdapter>> {
        self.adapters.get(model_id)
    }

    /// Adapters en orden de registro.
    pub fn list(&self) -> impl Iterator<Item = &Arc<dyn ModelAdapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Payload del listado de modelos para el frontend.
    ///
    /// `access_error` se fija para adapters que requieren autenticación
    /// cuando no llega credencial; la verificación profunda del token es
    /// asunto del colaborador de auth, no del core.
    pub fn model_infos(&self, credential: Option<&str>) -> Vec<ModelInfo> {
        self.adapters
            .values()
            .map(|adapter| {
                let d = adapter.descriptor();
                let access_error = if d.requires_auth && credential.is_none() {
                    Some("Must be signed in".to_string())
                } else {
                    None
                };
                ModelInfo { access_error,
                            model_id: d.model_id.clone(),
                            display_name: d.display_name.clone(),
                            category: d.category,
                            description: d.description.clone(),
                            valid_substances: d.valid_substances.clone(),
                            parameters: d.parameters
                                         .as_ref()
                                         .map(|s| s.schema_json())
                                         .unwrap_or_else(|| serde_json::json!({})) }
            })
            .collect()
    }
}
