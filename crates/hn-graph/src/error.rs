//! Graph-specific error types.

use hn_core::{BlockId, HnError, Real};
use hn_materials::MaterialError;
use thiserror::Error;

/// Network construction, validation and evaluation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("duplicate block name '{name}'")]
    DuplicateBlockName { name: String },

    #[error("reference to non-existent block {id}")]
    InvalidBlockRef { id: BlockId },

    #[error("no block named '{name}'")]
    UnknownBlock { name: String },

    #[error("block '{block}' has a flux pointing at itself")]
    SelfLoop { block: String },

    #[error("{context} on block '{block}' refers to undeclared variable '{variable}'")]
    UnknownVariable {
        block: String,
        variable: String,
        context: &'static str,
    },

    #[error("source on block '{block}' does not supply variable '{variable}'")]
    MissingSourceVariable { block: String, variable: String },

    #[error("variable '{variable}' of block '{block}' is not touched by any flux or source")]
    UnconstrainedVariable { block: String, variable: String },

    #[error("block '{block}' needs a mass flow")]
    MissingMassFlow { block: String },

    #[error("block '{block}' needs a material providing {needed}")]
    MissingMaterial { block: String, needed: &'static str },

    #[error("block '{block}' has no rate scaling")]
    MissingRateScaling { block: String },

    #[error("invalid geometry: {what}")]
    InvalidGeometry { what: String },

    #[error("invalid time series: {what}")]
    InvalidSeries { what: &'static str },

    #[error("time {time} is outside the series span [{start}, {end}]")]
    DataRange { time: Real, start: Real, end: Real },

    #[error("rate scaling of '{block}.{variable}' is {value}; must be finite and positive")]
    NonPositiveScaling {
        block: String,
        variable: String,
        value: Real,
    },

    #[error("non-physical {what} on block '{block}': {value}")]
    NonPhysical {
        block: String,
        what: &'static str,
        value: Real,
    },

    #[error("material error: {0}")]
    Material(#[from] MaterialError),

    #[error("core error: {0}")]
    Core(#[from] HnError),
}

pub type GraphResult<T> = Result<T, GraphError>;
