//! `ParameterSchema`: conjunto validado de `ParameterSpec` + validador.
//!
//! Dos momentos de chequeo, deliberadamente separados:
//! - Construcción (`new`): bien-formación de la declaración. Un schema que
//!   construye es válido; el fallo aquí es error de configuración del adapter
//!   y debe abortar el arranque del proceso.
//! - Validación (`validate`): coerción de tipos, bounds y membresía de
//!   choices sobre el input crudo de una petición. Los errores se agregan
//!   por campo y se devuelven todos juntos.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SchemaError;
use super::spec::{ParamKind, ParamValue, ParameterSpec};

/// Record tipado resultante de una validación exitosa, en orden de
/// declaración.
pub type ParameterRecord = IndexMap<String, ParamValue>;

/// Errores de validación agregados: campo → lista de razones.
pub type ParamErrors = IndexMap<String, Vec<String>>;

/// Schema declarativo inmutable de los parámetros de un modelo.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSchema {
    specs: Vec<ParameterSpec>,
}

impl ParameterSchema {
    /// Construye el schema validando la declaración completa.
    pub fn new(specs: Vec<ParameterSpec>) -> Result<Self, SchemaError> {
        let mut seen: Vec<&str> = Vec::with_capacity(specs.len());
        for spec in &specs {
            if seen.contains(&spec.name.as_str()) {
                return Err(SchemaError::DuplicateField(spec.name.clone()));
            }
            seen.push(spec.name.as_str());
            check_spec(spec)?;
        }
        Ok(Self { specs })
    }

    pub fn specs(&self) -> &[ParameterSpec] {
        &self.specs
    }

    /// Valida un mapa crudo clave→valor contra el schema.
    ///
    /// - Campos ausentes se rellenan con su default.
    /// - Campos desconocidos producen `"Extra inputs are not permitted"`.
    /// - Se reportan todos los problemas, no solo el primero.
    pub fn validate(&self, raw: &IndexMap<String, Value>) -> Result<ParameterRecord, ParamErrors> {
        let mut record = ParameterRecord::new();
        let mut errors = ParamErrors::new();

        for spec in &self.specs {
            let value = match raw.get(&spec.name) {
                None => spec.default.clone(),
                Some(v) => match coerce(spec.kind, v) {
                    Ok(value) => value,
                    Err(msg) => {
                        errors.entry(spec.name.clone()).or_default().push(msg);
                        continue;
                    }
                },
            };
            if let Some(v) = value.as_f64() {
                if let Some(min) = spec.min {
                    if v < min {
                        errors.entry(spec.name.clone())
                              .or_default()
                              .push(format!("Input should be greater than or equal to {}", fmt_num(min)));
                    }
                }
                if let Some(max) = spec.max {
                    if v > max {
                        errors.entry(spec.name.clone())
                              .or_default()
                              .push(format!("Input should be less than or equal to {}", fmt_num(max)));
                    }
                }
            }
            if let Some(choices) = &spec.choices {
                if !choices.contains(&value) {
                    let rendered = serde_json::to_string(choices).expect("serialize choices");
                    errors.entry(spec.name.clone())
                          .or_default()
                          .push(format!("must be one of: {rendered}"));
                }
            }
            if errors.get(&spec.name).is_none() {
                record.insert(spec.name.clone(), value);
            }
        }

        for key in raw.keys() {
            if !self.specs.iter().any(|s| &s.name == key) {
                errors.entry(key.clone())
                      .or_default()
                      .push("Extra inputs are not permitted".to_string());
            }
        }

        if errors.is_empty() {
            Ok(record)
        } else {
            Err(errors)
        }
    }

    /// Schema legible por máquina para renderizado de formularios.
    ///
    /// Shape por campo: `{"type", "default", "minimum"?, "maximum"?,
    /// "choices"?, "label"?, "description"?, "unit"?, "convertibleUnit"?}`.
    pub fn schema_json(&self) -> Value {
        let mut props = serde_json::Map::new();
        for spec in &self.specs {
            let mut field = serde_json::Map::new();
            field.insert("type".into(), Value::String(spec.kind.schema_type().to_string()));
            field.insert("default".into(), serde_json::to_value(&spec.default).expect("serialize default"));
            if let Some(min) = spec.min {
                field.insert("minimum".into(), num_value(min));
            }
            if let Some(max) = spec.max {
                field.insert("maximum".into(), num_value(max));
            }
            if let Some(choices) = &spec.choices {
                field.insert("choices".into(), serde_json::to_value(choices).expect("serialize choices"));
            }
            if let Some(label) = &spec.label {
                field.insert("label".into(), Value::String(label.clone()));
            }
            if let Some(description) = &spec.description {
                field.insert("description".into(), Value::String(description.clone()));
            }
            if let Some(unit) = &spec.unit {
                field.insert("unit".into(), Value::String(unit.clone()));
            }
            if let Some(cu) = spec.convertible_unit {
                field.insert("convertibleUnit".into(), Value::String(cu.as_str().to_string()));
            }
            props.insert(spec.name.clone(), Value::Object(field));
        }
        Value::Object(props)
    }
}

/// Bien-formación de una declaración individual.
fn check_spec(spec: &ParameterSpec) -> Result<(), SchemaError> {
    if (spec.min.is_some() || spec.max.is_some()) && !spec.kind.is_numeric() {
        return Err(SchemaError::BoundsOnNonNumeric(spec.name.clone()));
    }
    if let (Some(min), Some(max)) = (spec.min, spec.max) {
        if min > max {
            return Err(SchemaError::InvalidBounds(spec.name.clone()));
        }
    }
    if spec.kind == ParamKind::Enum && spec.choices.is_none() {
        return Err(SchemaError::EnumWithoutChoices(spec.name.clone()));
    }
    if !spec.default.matches_kind(spec.kind) {
        return Err(SchemaError::DefaultKindMismatch(spec.name.clone()));
    }
    if let Some(choices) = &spec.choices {
        if choices.is_empty() {
            return Err(SchemaError::EmptyChoices(spec.name.clone()));
        }
        if choices.iter().any(|c| !c.matches_kind(spec.kind)) {
            return Err(SchemaError::ChoiceKindMismatch(spec.name.clone()));
        }
        if !choices.contains(&spec.default) {
            return Err(SchemaError::DefaultNotInChoices(spec.name.clone()));
        }
    }
    if let Some(v) = spec.default.as_f64() {
        if spec.min.is_some_and(|min| v < min) || spec.max.is_some_and(|max| v > max) {
            return Err(SchemaError::DefaultOutOfBounds(spec.name.clone()));
        }
    }
    Ok(())
}

/// Coerción de un valor JSON crudo al kind declarado.
fn coerce(kind: ParamKind, value: &Value) -> Result<ParamValue, String> {
    match kind {
        ParamKind::Int => match value {
            Value::Number(n) => {
                if let Some(v) = n.as_i64() {
                    Ok(ParamValue::Int(v))
                } else if let Some(f) = n.as_f64() {
                    // 5.0 es un entero válido; 5.5 no.
                    if f.is_finite() && f.fract() == 0.0 {
                        Ok(ParamValue::Int(f as i64))
                    } else {
                        Err("Input should be a valid integer".to_string())
                    }
                } else {
                    Err("Input should be a valid integer".to_string())
                }
            }
            Value::String(s) => s.trim()
                                 .parse::<i64>()
                                 .map(ParamValue::Int)
                                 .map_err(|_| "Input should be a valid integer".to_string()),
            _ => Err("Input should be a valid integer".to_string()),
        },
        ParamKind::Float => match value {
            Value::Number(n) => n.as_f64()
                                 .map(ParamValue::Float)
                                 .ok_or_else(|| "Input should be a valid number".to_string()),
            Value::String(s) => s.trim()
                                 .parse::<f64>()
                                 .map(ParamValue::Float)
                                 .map_err(|_| "Input should be a valid number".to_string()),
            _ => Err("Input should be a valid number".to_string()),
        },
        ParamKind::Bool => match value {
            Value::Bool(b) => Ok(ParamValue::Bool(*b)),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(ParamValue::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(ParamValue::Bool(false)),
            _ => Err("Input should be a valid boolean".to_string()),
        },
        ParamKind::Str | ParamKind::Enum => match value {
            Value::String(s) => Ok(ParamValue::Str(s.clone())),
            _ => Err("Input should be a valid string".to_string()),
        },
    }
}

fn fmt_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

fn num_value(v: f64) -> Value {
    if v.fract() == 0.0 {
        Value::from(v as i64)
    } else {
        Value::from(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::spec::EnumParam;
    use serde_json::json;

    enum Solver {
        Euler,
        RungeKutta,
    }

    impl EnumParam for Solver {
        fn members() -> Vec<&'static str> {
            vec!["euler", "runge_kutta"]
        }
        fn as_param(&self) -> &'static str {
            match self {
                Solver::Euler => "euler",
                Solver::RungeKutta => "runge_kutta",
            }
        }
    }

    fn schema() -> ParameterSchema {
        ParameterSchema::new(vec![ParameterSpec::int("temperature", 300).min(200.0)
                                                                        .max(400.0)
                                                                        .unit("K"),
                                  ParameterSpec::float("pressure", 10.0).min(1.0),
                                  ParameterSpec::bool("dry_run", false),
                                  ParameterSpec::enumeration("solver", Solver::Euler)]).expect("well-formed schema")
    }

    fn raw(v: Value) -> IndexMap<String, Value> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn defaults_fill_missing_fields() {
        let record = schema().validate(&raw(json!({}))).expect("all defaults");
        assert_eq!(record["temperature"], ParamValue::Int(300));
        assert_eq!(record["pressure"], ParamValue::Float(10.0));
        assert_eq!(record["dry_run"], ParamValue::Bool(false));
        assert_eq!(record["solver"], ParamValue::Str("euler".into()));
    }

    #[test]
    fn extra_fields_are_rejected() {
        let err = schema().validate(&raw(json!({"bogus": 1}))).unwrap_err();
        assert_eq!(err["bogus"], vec!["Extra inputs are not permitted".to_string()]);
    }

    #[test]
    fn all_errors_are_aggregated() {
        let err = schema().validate(&raw(json!({
                              "temperature": 500,
                              "solver": "cranky",
                              "bogus": true,
                          })))
                          .unwrap_err();
        assert_eq!(err.len(), 3);
        assert_eq!(err["temperature"], vec!["Input should be less than or equal to 400".to_string()]);
        assert!(err["solver"][0].starts_with("must be one of:"));
        assert_eq!(err["bogus"], vec!["Extra inputs are not permitted".to_string()]);
    }

    #[test]
    fn int_coercion_accepts_integral_floats_and_strings() {
        let record = schema().validate(&raw(json!({"temperature": 250.0}))).expect("integral float");
        assert_eq!(record["temperature"], ParamValue::Int(250));
        let record = schema().validate(&raw(json!({"temperature": "250"}))).expect("numeric string");
        assert_eq!(record["temperature"], ParamValue::Int(250));
        let err = schema().validate(&raw(json!({"temperature": 250.5}))).unwrap_err();
        assert_eq!(err["temperature"], vec!["Input should be a valid integer".to_string()]);
    }

    #[test]
    fn bounds_produce_min_message() {
        let err = schema().validate(&raw(json!({"pressure": 0.5}))).unwrap_err();
        assert_eq!(err["pressure"], vec!["Input should be greater than or equal to 1".to_string()]);
    }

    #[test]
    fn enum_members_become_choices() {
        let s = schema();
        let solver = s.specs().iter().find(|s| s.name == "solver").unwrap();
        assert_eq!(solver.choices,
                   Some(vec![ParamValue::Str("euler".into()), ParamValue::Str("runge_kutta".into())]));
    }

    #[test]
    fn declaration_errors_fail_at_construction() {
        let err = ParameterSchema::new(vec![ParameterSpec::string("name", "x").min(0.0)]).unwrap_err();
        assert_eq!(err, SchemaError::BoundsOnNonNumeric("name".into()));

        let err = ParameterSchema::new(vec![ParameterSpec::int("n", 1), ParameterSpec::int("n", 2)]).unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("n".into()));

        let err = ParameterSchema::new(vec![ParameterSpec::int("n", 5).min(10.0)]).unwrap_err();
        assert_eq!(err, SchemaError::DefaultOutOfBounds("n".into()));

        let err = ParameterSchema::new(vec![ParameterSpec::string("mode", "z").choices(["a", "b"])]).unwrap_err();
        assert_eq!(err, SchemaError::DefaultNotInChoices("mode".into()));
    }

    #[test]
    fn schema_json_shape_for_form_rendering() {
        let v = schema().schema_json();
        assert_eq!(v["temperature"]["type"], "integer");
        assert_eq!(v["temperature"]["default"], 300);
        assert_eq!(v["temperature"]["minimum"], 200);
        assert_eq!(v["temperature"]["maximum"], 400);
        assert_eq!(v["temperature"]["unit"], "K");
        assert_eq!(v["solver"]["choices"], json!(["euler", "runge_kutta"]));
        assert!(v["pressure"].get("maximum").is_none());
    }
}
