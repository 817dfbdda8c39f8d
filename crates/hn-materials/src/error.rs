//! Material property errors.

use crate::property::Property;
use thiserror::Error;

/// Result type for material operations.
pub type MaterialResult<T> = Result<T, MaterialError>;

/// Errors that can occur during material lookups and property evaluation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaterialError {
    /// No material registered under this name.
    #[error("Unknown material '{name}'")]
    UnknownMaterial { name: String },

    /// The material does not define the requested property.
    #[error("Material '{material}' has no {property} property")]
    MissingProperty {
        material: String,
        property: Property,
    },

    /// The property function reads a variable the state does not carry.
    #[error("Material '{material}' {property} needs state variable '{variable}'")]
    MissingVariable {
        material: String,
        property: Property,
        variable: String,
    },

    /// A fitted property evaluated outside the range it was fitted on.
    #[error(
        "Material '{material}' {property} evaluated at {value} outside fitted domain [{min}, {max}]"
    )]
    OutOfDomain {
        material: String,
        property: Property,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The property evaluated to a non-finite or non-positive value.
    #[error("Non-physical {property} for material '{material}': {value}")]
    NonPhysical {
        material: String,
        property: Property,
        value: f64,
    },

    /// A state-dependent property was requested without a reference state.
    #[error("Material '{material}' {property} is state dependent and has no reference state")]
    NoReferenceState {
        material: String,
        property: Property,
    },
}
