//! Declaración de un parámetro individual (`ParameterSpec`) y sus tipos.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unidades que el frontend sabe convertir.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kelvin,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Kelvin => "kelvin",
        }
    }
}

/// Tipo declarado de un parámetro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    #[serde(rename = "string")]
    Str,
    /// Conjunto cerrado de strings; `choices` se deriva de los miembros de la
    /// enumeración salvo override explícito.
    Enum,
}

impl ParamKind {
    /// Nombre del tipo tal como aparece en el schema JSON renderizable.
    pub fn schema_type(&self) -> &'static str {
        match self {
            ParamKind::Int => "integer",
            ParamKind::Float => "number",
            ParamKind::Bool => "boolean",
            ParamKind::Str | ParamKind::Enum => "string",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ParamKind::Int | ParamKind::Float)
    }
}

/// Valor escalar tipado de un parámetro.
///
/// El orden de las variantes importa para la deserialización `untagged`:
/// bool antes que int, int antes que float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Valor numérico si la variante lo permite (para chequeo de bounds).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Int(v) => Some(*v as f64),
            ParamValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// ¿El valor es representable en el kind declarado?
    pub fn matches_kind(&self, kind: ParamKind) -> bool {
        matches!((self, kind),
                 (ParamValue::Int(_), ParamKind::Int)
                 | (ParamValue::Float(_), ParamKind::Float)
                 | (ParamValue::Int(_), ParamKind::Float)
                 | (ParamValue::Bool(_), ParamKind::Bool)
                 | (ParamValue::Str(_), ParamKind::Str)
                 | (ParamValue::Str(_), ParamKind::Enum))
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self { ParamValue::Int(v) }
}
impl From<f64> for ParamValue {
    fn from(v: f64) -> Self { ParamValue::Float(v) }
}
impl From<bool> for ParamValue {
    fn from(v: bool) -> Self { ParamValue::Bool(v) }
}
impl From<&str> for ParamValue {
    fn from(v: &str) -> Self { ParamValue::Str(v.to_string()) }
}

/// Enumeraciones cerradas usables como parámetro.
///
/// Implementar este trait permite declarar un parámetro enum cuyo conjunto de
/// `choices` se deriva automáticamente de los miembros.
pub trait EnumParam {
    /// Todos los miembros de la enumeración, en orden estable.
    fn members() -> Vec<&'static str>;
    /// Representación string del miembro.
    fn as_param(&self) -> &'static str;
}

/// Declaración de un campo de parámetro: nombre, kind, default y
/// restricciones opcionales. Todo campo de un record de parámetros debe
/// declararse por esta vía; no existen campos ad-hoc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamValue,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub choices: Option<Vec<ParamValue>>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub convertible_unit: Option<Unit>,
}

impl ParameterSpec {
    fn base(name: impl Into<String>, kind: ParamKind, default: ParamValue) -> Self {
        Self { name: name.into(),
               kind,
               default,
               min: None,
               max: None,
               choices: None,
               label: None,
               description: None,
               unit: None,
               convertible_unit: None }
    }

    pub fn int(name: impl Into<String>, default: i64) -> Self {
        Self::base(name, ParamKind::Int, ParamValue::Int(default))
    }

    pub fn float(name: impl Into<String>, default: f64) -> Self {
        Self::base(name, ParamKind::Float, ParamValue::Float(default))
    }

    pub fn bool(name: impl Into<String>, default: bool) -> Self {
        Self::base(name, ParamKind::Bool, ParamValue::Bool(default))
    }

    pub fn string(name: impl Into<String>, default: impl Into<String>) -> Self {
        Self::base(name, ParamKind::Str, ParamValue::Str(default.into()))
    }

    /// Parámetro enum: los `choices` se derivan de los miembros de `E`.
    pub fn enumeration<E: EnumParam>(name: impl Into<String>, default: E) -> Self {
        let mut spec = Self::base(name, ParamKind::Enum, ParamValue::Str(default.as_param().to_string()));
        spec.choices = Some(E::members().into_iter().map(ParamValue::from).collect());
        spec
    }

    pub fn min(mut self, v: f64) -> Self {
        self.min = Some(v);
        self
    }

    pub fn max(mut self, v: f64) -> Self {
        self.max = Some(v);
        self
    }

    /// Override explícito del conjunto cerrado de valores admitidos.
    pub fn choices<I, V>(mut self, values: I) -> Self
        where I: IntoIterator<Item = V>,
              V: Into<ParamValue>
    {
        self.choices = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn label(mut self, v: impl Into<String>) -> Self {
        self.label = Some(v.into());
        self
    }

    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.description = Some(v.into());
        self
    }

    pub fn unit(mut self, v: impl Into<String>) -> Self {
        self.unit = Some(v.into());
        self
    }

    pub fn convertible_unit(mut self, v: Unit) -> Self {
        self.convertible_unit = Some(v);
        self
    }
}
