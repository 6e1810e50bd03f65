//! Errores de definición de schema de parámetros.
//!
//! Son errores de programador (adapter mal configurado): se detectan al
//! construir el `ParameterSchema`, nunca llegan a un usuario final.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SchemaError {
    #[error("duplicate parameter field '{0}'")]
    DuplicateField(String),
    #[error("field '{0}': min/max bounds are only valid for numeric kinds")]
    BoundsOnNonNumeric(String),
    #[error("field '{0}': min is greater than max")]
    InvalidBounds(String),
    #[error("field '{0}': default value does not match the declared kind")]
    DefaultKindMismatch(String),
    #[error("field '{0}': default value is outside the declared bounds")]
    DefaultOutOfBounds(String),
    #[error("field '{0}': default value is not among the declared choices")]
    DefaultNotInChoices(String),
    #[error("field '{0}': choices must be a non-empty set")]
    EmptyChoices(String),
    #[error("field '{0}': choice value does not match the declared kind")]
    ChoiceKindMismatch(String),
    #[error("field '{0}': enum parameters require a set of members")]
    EnumWithoutChoices(String),
}
