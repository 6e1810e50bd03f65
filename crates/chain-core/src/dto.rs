//! Shapes externas de petición/respuesta.
//!
//! El routing y el framework de serialización HTTP viven fuera del core;
//! estas structs son el contrato de datos que ese colaborador serializa.
//! Campos en camelCase en el JSON, como espera el frontend.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use chain_domain::{Compound, Concentrations, Panel, ParameterRecord};

use crate::adapter::ModelCategory;

/// Un stage de la petición: modelo + parámetros crudos. Solo las
/// concentraciones del primer stage son significativas; siembran la cadena.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRequest {
    pub model_id: String,
    #[serde(default)]
    pub concentrations: Concentrations,
    #[serde(default)]
    pub parameters: IndexMap<String, Value>,
}

/// Petición de ejecución: lista ordenada de stages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRequest {
    pub stages: Vec<StageRequest>,
}

impl RunRequest {
    /// Ejecución de un solo modelo: cadena de un stage.
    pub fn single(model_id: impl Into<String>,
                  concentrations: Concentrations,
                  parameters: IndexMap<String, Value>)
                  -> Self {
        Self { stages: vec![StageRequest { model_id: model_id.into(),
                                           concentrations,
                                           parameters }] }
    }
}

/// Estado observable de un stage o de la cadena completa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Pending,
    Done,
    Failed,
}

/// Input efectivo de un stage en la vista de lectura.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInput {
    pub model_id: String,
    pub concentrations: Concentrations,
    pub parameters: ParameterRecord,
}

/// Vista de un stage: estado + input efectivo + resultado si existe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    pub status: RunStatus,
    pub model_input: ModelInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_concentrations: Option<Concentrations>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub panels: Vec<Panel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Respuesta de lectura de una cadena completa, raíz→hoja.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedRunResponse {
    pub status: RunStatus,
    pub stages: Vec<StageView>,
}

/// Detalle de error de validación (cuerpo del 422): agregado por campo, con
/// las concentraciones y los parámetros por separado.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationDetail {
    #[serde(default)]
    pub concentrations: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pub parameters: IndexMap<String, Vec<String>>,
}

impl ValidationDetail {
    pub fn is_empty(&self) -> bool {
        self.concentrations.is_empty() && self.parameters.is_empty()
    }
}

/// Entrada del listado de modelos que consume el frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub access_error: Option<String>,
    pub model_id: String,
    pub display_name: String,
    pub category: ModelCategory,
    pub description: String,
    pub valid_substances: Vec<Compound>,
    /// Schema de parámetros renderizable (objeto vacío si el modelo no
    /// declara parámetros).
    pub parameters: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_request_defaults_missing_maps() {
        let req: StageRequest = serde_json::from_value(json!({"modelId": "arcs"})).unwrap();
        assert_eq!(req.model_id, "arcs");
        assert!(req.concentrations.is_empty());
        assert!(req.parameters.is_empty());
    }

    #[test]
    fn run_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RunStatus::Pending).unwrap(), json!("pending"));
        assert_eq!(serde_json::to_value(RunStatus::Done).unwrap(), json!("done"));
        assert_eq!(serde_json::to_value(RunStatus::Failed).unwrap(), json!("failed"));
    }

    #[test]
    fn stage_view_uses_camel_case() {
        let view = StageView { status: RunStatus::Done,
                               model_input: ModelInput { model_id: "m".into(),
                                                         concentrations: Concentrations::new(),
                                                         parameters: ParameterRecord::new() },
                               final_concentrations: Some(Concentrations::new()),
                               panels: vec![],
                               error: None };
        let v = serde_json::to_value(&view).unwrap();
        assert!(v.get("modelInput").is_some());
        assert!(v.get("finalConcentrations").is_some());
        assert!(v.get("error").is_none(), "None error is omitted");
    }
}
