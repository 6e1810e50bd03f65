//! Adapter de ejemplo: plantilla mínima de cómo se escribe un modelo.

use std::sync::Arc;

use async_trait::async_trait;

use chain_core::adapter::{AdapterDescriptor, AdapterError, ModelAdapter, ModelCategory, StageInput, StageOutput};
use chain_domain::{ParameterSchema, ParameterSpec, SchemaError};

/// Modelo identidad con un parámetro acotado. Sirve de referencia al
/// escribir adapters nuevos:
/// - `valid_substances` enumera los compuestos que el usuario puede sembrar;
///   las concentraciones llegan y se devuelven en ppm.
/// - Los parámetros se declaran como datos (`ParameterSpec`), nunca como
///   campos sueltos; llegan al `run` ya validados.
pub struct ExampleAdapter {
    descriptor: AdapterDescriptor,
}

impl ExampleAdapter {
    pub fn new() -> Result<Arc<dyn ModelAdapter>, SchemaError> {
        let schema = ParameterSchema::new(vec![
            ParameterSpec::int("spontaneously_combust", 50)
                .label("Spontaneously combust")
                .description("The rate at which atoms will spontaneously disappear")
                .min(0.0)
                .max(100.0)
                .unit("%"),
        ])?;
        let descriptor = AdapterDescriptor::new("example",
                                                "Example",
                                                "Reference adapter that returns its input unchanged",
                                                ModelCategory::Primary).substances(["H2O"])
                                                                       .parameters(schema);
        Ok(Arc::new(Self { descriptor }))
    }
}

#[async_trait]
impl ModelAdapter for ExampleAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        // El primer objeto devuelto son las concentraciones de salida, en ppm
        // y del mismo tipo que las de entrada.
        Ok(StageOutput::concentrations(input.concentrations))
    }
}
