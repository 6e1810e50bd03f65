//! Mapas de concentraciones por compuesto.
//!
//! - Las claves son identificadores de compuesto (`"H2O"`, `"SO2"`, ...). El
//!   motor no interpreta la química: son claves opacas restringidas por la
//!   whitelist de cada adapter.
//! - Los valores son reales no negativos, por convención en ppm.
//! - Usamos `IndexMap` para conservar el orden de inserción al serializar
//!   (salida JSON estable entre polls).

use indexmap::IndexMap;

/// Identificador opaco de compuesto (token tipo fórmula química).
pub type Compound = String;

/// Concentraciones por compuesto, en ppm.
pub type Concentrations = IndexMap<Compound, f64>;
