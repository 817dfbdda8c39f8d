//! Property identifiers and property functions.

use core::fmt;

use hn_core::{Real, StateLookup, polyval};
use serde::{Deserialize, Serialize};

/// Thermophysical properties a material may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Density,
    SpecificHeat,
    Conductivity,
    Viscosity,
    Prandtl,
}

impl Property {
    pub fn as_str(self) -> &'static str {
        match self {
            Property::Density => "density",
            Property::SpecificHeat => "specific heat",
            Property::Conductivity => "conductivity",
            Property::Viscosity => "viscosity",
            Property::Prandtl => "Prandtl number",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A property as a function of one state variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyFn {
    /// State-independent value.
    Constant { value: Real },
    /// Polynomial in `variable`, coefficients from the highest power down.
    Polynomial {
        variable: String,
        coeffs: Vec<Real>,
        /// Inclusive range the fit is valid on.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        domain: Option<(Real, Real)>,
    },
}

/// Outcome of a raw evaluation before it is attributed to a material.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawEval {
    Value(Real),
    MissingVariable(String),
    OutOfDomain { value: Real, min: Real, max: Real },
}

impl PropertyFn {
    pub fn constant(value: Real) -> Self {
        PropertyFn::Constant { value }
    }

    pub fn polynomial(variable: impl Into<String>, coeffs: &[Real]) -> Self {
        PropertyFn::Polynomial {
            variable: variable.into(),
            coeffs: coeffs.to_vec(),
            domain: None,
        }
    }

    /// Restrict a polynomial fit to `[min, max]`; no effect on constants.
    pub fn with_domain(self, min: Real, max: Real) -> Self {
        match self {
            PropertyFn::Polynomial {
                variable, coeffs, ..
            } => PropertyFn::Polynomial {
                variable,
                coeffs,
                domain: Some((min, max)),
            },
            other => other,
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, PropertyFn::Constant { .. })
    }

    pub(crate) fn eval_raw(&self, state: &dyn StateLookup) -> RawEval {
        match self {
            PropertyFn::Constant { value } => RawEval::Value(*value),
            PropertyFn::Polynomial {
                variable,
                coeffs,
                domain,
            } => {
                let Some(x) = state.get_var(variable) else {
                    return RawEval::MissingVariable(variable.clone());
                };
                if let Some((min, max)) = *domain {
                    if !(min..=max).contains(&x) {
                        return RawEval::OutOfDomain { value: x, min, max };
                    }
                }
                RawEval::Value(polyval(coeffs, x))
            }
        }
    }
}
