//! Scenario schema definitions.

use hn_core::StateMap;
use hn_graph::{ConductanceClass, Interpolation};
use hn_materials::Material;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    /// Added to the built-in catalog; same-named entries replace it.
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(default)]
    pub blocks: Vec<BlockDef>,
    #[serde(default)]
    pub fluxes: Vec<FluxDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steady: Option<SteadyDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transient: Option<TransientDef>,
    #[serde(default)]
    pub cases: Vec<CaseDef>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockRole {
    /// Every variable is an unknown.
    #[default]
    Solvable,
    /// Driven by the sum of its sources.
    Boundary,
    /// Keeps its declared state.
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockDef {
    pub name: String,
    #[serde(default)]
    pub role: BlockRole,
    /// Declared variables and initial values, in declaration order.
    pub state: StateMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass_flow: Option<MassFlowDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_scaling: Option<RateScalingDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesDef {
    pub times: Vec<f64>,
    pub values: Vec<f64>,
    #[serde(default)]
    pub interpolation: InterpolationDef,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationDef {
    #[default]
    Linear,
    Previous,
}

impl From<InterpolationDef> for Interpolation {
    fn from(def: InterpolationDef) -> Self {
        match def {
            InterpolationDef::Linear => Interpolation::Linear,
            InterpolationDef::Previous => Interpolation::Previous,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MassFlowDef {
    /// kg/s.
    Constant { value: f64 },
    /// m^3/s, multiplied by the block material's density.
    Volumetric { rate: f64 },
    Series(SeriesDef),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RateScalingDef {
    Uniform { value: f64 },
    PerVariable { values: StateMap },
    /// `volume * density * specific heat` of the block material.
    Thermal { volume_m3: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalDef {
    Constant { value: f64 },
    Series(SeriesDef),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceDef {
    Constant { values: StateMap },
    TimeDriven { signals: IndexMap<String, SignalDef> },
}

impl SourceDef {
    pub fn variables(&self) -> Vec<&str> {
        match self {
            SourceDef::Constant { values } => values.keys().map(String::as_str).collect(),
            SourceDef::TimeDriven { signals } => signals.keys().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ConductanceClassDef {
    Exterior,
    Interior,
    WaterAir,
    Custom(f64),
}

impl From<ConductanceClassDef> for ConductanceClass {
    fn from(def: ConductanceClassDef) -> Self {
        match def {
            ConductanceClassDef::Exterior => ConductanceClass::Exterior,
            ConductanceClassDef::Interior => ConductanceClass::Interior,
            ConductanceClassDef::WaterAir => ConductanceClass::WaterAir,
            ConductanceClassDef::Custom(h) => ConductanceClass::Custom(h),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeometryDef {
    Cylindrical { radii_m: Vec<f64>, length_m: f64 },
    Planar {
        width_m: f64,
        length_m: f64,
        thicknesses_m: Vec<f64>,
    },
}

impl GeometryDef {
    pub fn layer_count(&self) -> usize {
        match self {
            GeometryDef::Cylindrical { radii_m, .. } => radii_m.len().saturating_sub(1),
            GeometryDef::Planar { thicknesses_m, .. } => thicknesses_m.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FluxKindDef {
    /// kW/K.
    Conductance { value: f64 },
    Empirical {
        class: ConductanceClassDef,
        length_m: f64,
        #[serde(default = "unit_scale")]
        scale: f64,
    },
    Layered {
        geometry: GeometryDef,
        /// Material names, innermost first.
        layers: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        inner_flow_area_m2: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        outer_flow_area_m2: Option<f64>,
    },
    /// Owner receives advected heat from the neighbor, its upstream.
    Convection,
    FiniteDifference { spacing: f64 },
    Offset { value: f64 },
}

fn unit_scale() -> f64 {
    1.0
}

impl FluxKindDef {
    /// Kinds whose value is odd under swapping owner and neighbor.
    pub fn is_symmetric(&self) -> bool {
        matches!(
            self,
            FluxKindDef::Conductance { .. }
                | FluxKindDef::Empirical { .. }
                | FluxKindDef::FiniteDifference { .. }
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FluxDef {
    pub owner: String,
    pub neighbor: String,
    pub kind: FluxKindDef,
    /// Owner variables the flux writes; empty takes the kind's default.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
    /// Also attach the mirrored flux to the neighbor.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mutual: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewtonDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abs_tol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel_tol: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SteadyDef {
    /// Time the boundaries are driven at; defaults to the scenario start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub newton: Option<NewtonDef>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorDef {
    #[default]
    DormandPrince,
    Rk4,
    ForwardEuler,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransientDef {
    #[serde(default)]
    pub t_start: f64,
    pub t_end: f64,
    /// Output times, including both ends.
    pub samples: usize,
    #[serde(default)]
    pub integrator: IntegratorDef,
    /// Largest step for fixed-step integrators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rtol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atol: Option<f64>,
}

impl TransientDef {
    /// `samples` evenly spaced output times from `t_start` to `t_end`.
    pub fn output_times(&self) -> Vec<f64> {
        match self.samples {
            0 => Vec::new(),
            1 => vec![self.t_start],
            n => {
                let step = (self.t_end - self.t_start) / (n - 1) as f64;
                (0..n)
                    .map(|i| {
                        if i == n - 1 {
                            self.t_end
                        } else {
                            self.t_start + i as f64 * step
                        }
                    })
                    .collect()
            }
        }
    }
}

/// A named variant of the base scenario for batch runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseDef {
    pub name: String,
    /// Per block: state values to overwrite (initial guess, held values).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub state: IndexMap<String, StateMap>,
    /// Per block: replaces every source with one constant source.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub sources: IndexMap<String, StateMap>,
}
