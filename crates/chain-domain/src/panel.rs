//! Paneles de salida auxiliar de un stage.
//!
//! Un panel es un objeto etiquetado por `type` que acompaña (ortogonal) a las
//! concentraciones de salida: JSON libre, texto, tabla o caminos de reacción.
//! El discriminador vive en el JSON serializado para que el frontend elija el
//! renderizador.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Camino de reacción individual dentro de un panel `reaction_paths`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionPath {
    pub reaction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
}

/// Panel auxiliar adjunto al resultado de un stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Panel {
    Json {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        json: Value,
    },
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        text: String,
    },
    Table {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    ReactionPaths {
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
        paths: Vec<ReactionPath>,
    },
}

impl Panel {
    /// Panel de texto sin label.
    pub fn text(text: impl Into<String>) -> Self {
        Panel::Text { label: None,
                      text: text.into() }
    }

    /// Panel JSON sin label.
    pub fn json(json: Value) -> Self {
        Panel::Json { label: None, json }
    }
}
