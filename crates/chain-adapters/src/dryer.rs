//! Unidad de secado: retira una fracción configurable del agua del stream.
//!
//! Modelo local determinista pensado para encadenarse detrás de un modelo de
//! reacción: el agua condensable alimenta la formación de ácidos aguas abajo,
//! así que retirarla cambia el resultado de cualquier stage posterior.

use std::sync::Arc;

use async_trait::async_trait;

use chain_core::adapter::{AdapterDescriptor, AdapterError, ModelAdapter, ModelCategory, StageInput, StageOutput};
use chain_domain::{Panel, ParamValue, ParameterSchema, ParameterSpec, SchemaError};

pub struct DryerAdapter {
    descriptor: AdapterDescriptor,
}

impl DryerAdapter {
    pub fn new() -> Result<Arc<dyn ModelAdapter>, SchemaError> {
        let schema = ParameterSchema::new(vec![
            ParameterSpec::float("efficiency", 90.0)
                .label("Removal efficiency")
                .description("Fraction of H2O removed by the dryer")
                .min(0.0)
                .max(100.0)
                .unit("%"),
        ])?;
        let descriptor = AdapterDescriptor::new("dryer",
                                                "Dryer",
                                                "Removes a configurable fraction of H2O from the stream",
                                                ModelCategory::Secondary).substances(["H2O", "O2", "SO2", "NO2", "H2S"])
                                                                         .parameters(schema);
        Ok(Arc::new(Self { descriptor }))
    }
}

#[async_trait]
impl ModelAdapter for DryerAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    async fn run(&self, input: StageInput) -> Result<StageOutput, AdapterError> {
        let efficiency = match input.parameters.get("efficiency") {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => 90.0,
        };

        let mut concentrations = input.concentrations.clone();
        let water_in = concentrations.get("H2O").copied().unwrap_or(0.0);
        let removed = water_in * efficiency / 100.0;
        if let Some(water) = concentrations.get_mut("H2O") {
            *water = water_in - removed;
        }

        Ok(StageOutput::concentrations(concentrations)
            .panel(Panel::text(format!("removed {removed:.2} ppm of H2O at {efficiency}% efficiency"))))
    }
}
