//! Contrato uniforme de un modelo registrable.
//!
//! Un adapter es una función opaca `(Concentrations, Parameters) ->
//! StageOutput | AdapterError` más metadata declarativa (descriptor). El
//! fallo es un valor, no una excepción: el orchestrator decide qué persistir.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chain_domain::{Compound, Concentrations, Panel, ParameterRecord, ParameterSchema};

/// Categoría del modelo, tal como la muestra el frontend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelCategory {
    Primary,
    Secondary,
}

/// Metadata declarativa de un adapter. El schema de parámetros es dato
/// adjunto, nunca se infiere por reflexión.
#[derive(Debug, Clone)]
pub struct AdapterDescriptor {
    /// Identificador estable y único dentro del registry.
    pub model_id: String,
    pub display_name: String,
    pub description: String,
    pub category: ModelCategory,
    /// Compuestos que el modelo entiende; todo lo demás se rechaza o filtra.
    pub valid_substances: Vec<Compound>,
    pub requires_auth: bool,
    /// Scope del recurso downstream cuando `requires_auth`.
    pub scope: Option<String>,
    pub parameters: Option<ParameterSchema>,
}

impl AdapterDescriptor {
    pub fn new(model_id: impl Into<String>,
               display_name: impl Into<String>,
               description: impl Into<String>,
               category: ModelCategory)
               -> Self {
        Self { model_id: model_id.into(),
               display_name: display_name.into(),
               description: description.into(),
               category,
               valid_substances: Vec::new(),
               requires_auth: false,
               scope: None,
               parameters: None }
    }

    pub fn substances<I, S>(mut self, substances: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<Compound>
    {
        self.valid_substances = substances.into_iter().map(Into::into).collect();
        self
    }

    pub fn parameters(mut self, schema: ParameterSchema) -> Self {
        self.parameters = Some(schema);
        self
    }

    pub fn requires_auth(mut self, scope: impl Into<String>) -> Self {
        self.requires_auth = true;
        self.scope = Some(scope.into());
        self
    }

    pub fn accepts(&self, compound: &str) -> bool {
        self.valid_substances.iter().any(|s| s == compound)
    }
}

/// Input entregado a `ModelAdapter::run`: concentraciones ya normalizadas,
/// parámetros ya validados y la credencial opaca a reenviar downstream.
#[derive(Debug, Clone)]
pub struct StageInput {
    pub concentrations: Concentrations,
    pub parameters: ParameterRecord,
    pub credential: Option<String>,
}

/// Salida de un run exitoso: concentraciones resultantes + paneles
/// auxiliares opcionales.
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub concentrations: Concentrations,
    pub panels: Vec<Panel>,
}

impl StageOutput {
    pub fn concentrations(concentrations: Concentrations) -> Self {
        Self { concentrations,
               panels: Vec::new() }
    }

    pub fn panel(mut self, panel: Panel) -> Self {
        self.panels.push(panel);
        self
    }
}

/// Fallo señalado por el propio modelo.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// El modelo no pudo calcular el cambio (mensaje legible para el usuario).
    #[error("{0}")]
    Model(String),
    #[error("Must be authenticated")]
    Unauthenticated,
    /// Fallo del servicio remoto que implementa el modelo.
    #[error("upstream service error: {0}")]
    Upstream(String),
}

/// Contrato que implementa cada modelo registrable.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Metadata declarativa; estable durante la vida del proceso.
    fn descriptor(&self) -> &AdapterDescriptor;

    /// Ejecuta el modelo. Puros respecto a input + parámetros en los modelos
    /// locales; los remotos encapsulan aquí su cliente HTTP y timeouts.
    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError>;
}
