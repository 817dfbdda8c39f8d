//! Material definitions.

use std::collections::BTreeMap;

use hn_core::{Real, StateLookup, StateMap};
use serde::{Deserialize, Serialize};

use crate::error::{MaterialError, MaterialResult};
use crate::property::{Property, PropertyFn, RawEval};

/// Phase of a material; selects the film correlation used by layered
/// conduction paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Liquid,
    Gas,
    Solid,
}

/// A named substance with a set of state-dependent property functions.
///
/// Any material may carry any subset of properties. Fluids normally define
/// density, specific heat and conductivity; gases add viscosity and Prandtl
/// number; solids usually only carry conductivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub phase: Phase,
    #[serde(default)]
    pub properties: BTreeMap<Property, PropertyFn>,
    /// State used when the material sits inside a flux path (a static layer)
    /// rather than in a block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_state: Option<StateMap>,
}

impl Material {
    pub fn new(name: impl Into<String>, phase: Phase) -> Self {
        Self {
            name: name.into(),
            phase,
            properties: BTreeMap::new(),
            reference_state: None,
        }
    }

    /// Builder-style property registration.
    pub fn with(mut self, property: Property, f: PropertyFn) -> Self {
        self.properties.insert(property, f);
        self
    }

    /// Builder-style reference state for static-layer evaluation.
    pub fn with_reference_state(mut self, state: StateMap) -> Self {
        self.reference_state = Some(state);
        self
    }

    pub fn has(&self, property: Property) -> bool {
        self.properties.contains_key(&property)
    }

    /// Evaluate `property` at `state`.
    ///
    /// The result must be finite, and strictly positive for every property
    /// this crate knows about.
    pub fn eval(&self, property: Property, state: &dyn StateLookup) -> MaterialResult<Real> {
        let f = self
            .properties
            .get(&property)
            .ok_or_else(|| MaterialError::MissingProperty {
                material: self.name.clone(),
                property,
            })?;

        match f.eval_raw(state) {
            RawEval::Value(v) if v.is_finite() && v > 0.0 => Ok(v),
            RawEval::Value(v) => Err(MaterialError::NonPhysical {
                material: self.name.clone(),
                property,
                value: v,
            }),
            RawEval::MissingVariable(variable) => Err(MaterialError::MissingVariable {
                material: self.name.clone(),
                property,
                variable,
            }),
            RawEval::OutOfDomain { value, min, max } => Err(MaterialError::OutOfDomain {
                material: self.name.clone(),
                property,
                value,
                min,
                max,
            }),
        }
    }

    /// Evaluate `property` for a static layer: constants directly, fitted
    /// properties at the reference state.
    pub fn eval_reference(&self, property: Property) -> MaterialResult<Real> {
        let f = self
            .properties
            .get(&property)
            .ok_or_else(|| MaterialError::MissingProperty {
                material: self.name.clone(),
                property,
            })?;
        match (&self.reference_state, f.is_constant()) {
            (_, true) => self.eval(property, &StateMap::new()),
            (Some(reference), false) => self.eval(property, reference),
            (None, false) => Err(MaterialError::NoReferenceState {
                material: self.name.clone(),
                property,
            }),
        }
    }

    pub fn density(&self, state: &dyn StateLookup) -> MaterialResult<Real> {
        self.eval(Property::Density, state)
    }

    pub fn specific_heat(&self, state: &dyn StateLookup) -> MaterialResult<Real> {
        self.eval(Property::SpecificHeat, state)
    }

    pub fn conductivity(&self, state: &dyn StateLookup) -> MaterialResult<Real> {
        self.eval(Property::Conductivity, state)
    }

    pub fn viscosity(&self, state: &dyn StateLookup) -> MaterialResult<Real> {
        self.eval(Property::Viscosity, state)
    }

    pub fn prandtl(&self, state: &dyn StateLookup) -> MaterialResult<Real> {
        self.eval(Property::Prandtl, state)
    }
}
