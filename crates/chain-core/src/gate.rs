//! Gate de concentraciones contra la whitelist de un adapter.
//!
//! Tres operaciones, mismas reglas de agregación de errores que el schema de
//! parámetros:
//! - `validate_input`: rechaza compuestos fuera de whitelist y valores
//!   negativos o no finitos, acumulando por compuesto ofensor.
//! - `normalize`: rellena con 0.0 todo compuesto de la whitelist ausente del
//!   input. Se asume input ya validado.
//! - `forward_filter`: recorta un output a los compuestos que el adapter
//!   aguas abajo declara entender. Lossy a propósito: es el mecanismo de
//!   composición segura entre modelos heterogéneos.

use indexmap::IndexMap;

use chain_domain::Concentrations;

use crate::adapter::AdapterDescriptor;

/// Errores por compuesto: clave ofensora → razones.
pub type ConcentrationErrors = IndexMap<String, Vec<String>>;

/// Valida un mapa crudo contra la whitelist del adapter.
pub fn validate_input(descriptor: &AdapterDescriptor, raw: &Concentrations) -> Result<(), ConcentrationErrors> {
    let mut errors = ConcentrationErrors::new();
    for (compound, value) in raw {
        if !descriptor.accepts(compound) {
            errors.entry(compound.clone())
                  .or_default()
                  .push("Extra inputs are not permitted".to_string());
        }
        if !value.is_finite() || *value < 0.0 {
            errors.entry(compound.clone())
                  .or_default()
                  .push("Input should be greater than or equal to 0".to_string());
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Rellena defaults 0.0: el resultado contiene exactamente la whitelist del
/// adapter, en su orden declarado.
pub fn normalize(descriptor: &AdapterDescriptor, raw: &Concentrations) -> Concentrations {
    descriptor.valid_substances
              .iter()
              .map(|s| (s.clone(), raw.get(s).copied().unwrap_or(0.0)))
              .collect()
}

/// Recorta `output` a los compuestos aceptados por `descriptor`.
pub fn forward_filter(descriptor: &AdapterDescriptor, output: &Concentrations) -> Concentrations {
    output.iter()
          .filter(|(compound, _)| descriptor.accepts(compound))
          .map(|(compound, value)| (compound.clone(), *value))
          .collect()
}
