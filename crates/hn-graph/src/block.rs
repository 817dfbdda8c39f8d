//! Blocks: named control volumes with ordered state.

use std::fmt;
use std::sync::Arc;

use hn_core::{Real, StateLookup, StateMap};
use hn_materials::Material;

use crate::error::{GraphError, GraphResult};
use crate::flux::Flux;
use crate::network::BlockRef;
use crate::source::{Source, TimeSeries};

/// Mass flow rate through a block.
#[derive(Clone)]
pub enum MassFlow {
    Constant(Real),
    /// Volumetric rate times the density of the block's material at its state.
    Volumetric(Real),
    Series(TimeSeries),
    Function(Arc<dyn Fn(Real) -> Real + Send + Sync>),
}

impl MassFlow {
    pub fn function(f: impl Fn(Real) -> Real + Send + Sync + 'static) -> Self {
        MassFlow::Function(Arc::new(f))
    }

    pub(crate) fn evaluate(&self, block: BlockRef<'_>, t: Real) -> GraphResult<Real> {
        match self {
            MassFlow::Constant(v) => Ok(*v),
            MassFlow::Volumetric(rate) => {
                let material = block.material_for("density")?;
                Ok(rate * material.density(&block.state)?)
            }
            MassFlow::Series(series) => series.evaluate(t),
            MassFlow::Function(f) => Ok(f(t)),
        }
    }
}

impl fmt::Debug for MassFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassFlow::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            MassFlow::Volumetric(v) => f.debug_tuple("Volumetric").field(v).finish(),
            MassFlow::Series(s) => f.debug_tuple("Series").field(s).finish(),
            MassFlow::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Divisor turning a residual into a time derivative.
#[derive(Debug, Clone, PartialEq)]
pub enum RateScaling {
    Uniform(Real),
    PerVariable(StateMap),
    /// Thermal capacitance `rho(state) * cp(state) * volume`.
    Thermal { volume: Real },
}

impl RateScaling {
    /// Divisor for every variable of `block`, in declaration order.
    pub(crate) fn divisors(&self, block: BlockRef<'_>) -> GraphResult<Vec<Real>> {
        let names = block.block.state.keys();
        let raw: Vec<(String, Real)> = match self {
            RateScaling::Uniform(c) => names.map(|n| (n.clone(), *c)).collect(),
            RateScaling::PerVariable(map) => names
                .map(|n| {
                    map.get(n)
                        .map(|c| (n.clone(), *c))
                        .ok_or_else(|| GraphError::UnknownVariable {
                            block: block.block.name.clone(),
                            variable: n.clone(),
                            context: "rate scaling",
                        })
                })
                .collect::<GraphResult<_>>()?,
            RateScaling::Thermal { volume } => {
                let material = block.material_for("density and specific heat")?;
                let c = material.density(&block.state)?
                    * material.specific_heat(&block.state)?
                    * volume;
                names.map(|n| (n.clone(), c)).collect()
            }
        };

        raw.into_iter()
            .map(|(variable, value)| {
                if value.is_finite() && value > 0.0 {
                    Ok(value)
                } else {
                    Err(GraphError::NonPositiveScaling {
                        block: block.block.name.clone(),
                        variable,
                        value,
                    })
                }
            })
            .collect()
    }
}

/// A control volume in the network.
///
/// Variables are declared up front; their insertion order is the order the
/// solver packs them in. Once a block is part of a built network only the
/// values may change, never the set of names.
#[derive(Debug, Clone)]
pub struct Block {
    pub(crate) name: String,
    pub(crate) material: Option<Arc<Material>>,
    pub(crate) state: StateMap,
    pub(crate) fluxes: Vec<Flux>,
    pub(crate) sources: Vec<Source>,
    pub(crate) mass_flow: Option<MassFlow>,
    pub(crate) rate_scaling: Option<RateScaling>,
    pub(crate) time: Real,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            material: None,
            state: StateMap::new(),
            fluxes: Vec::new(),
            sources: Vec::new(),
            mass_flow: None,
            rate_scaling: None,
            time: 0.0,
        }
    }

    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    /// Declare a state variable (or overwrite its initial value).
    pub fn with_var(mut self, name: impl Into<String>, value: Real) -> Self {
        self.state.insert(name.into(), value);
        self
    }

    pub fn with_mass_flow(mut self, flow: MassFlow) -> Self {
        self.mass_flow = Some(flow);
        self
    }

    pub fn with_rate_scaling(mut self, scaling: RateScaling) -> Self {
        self.rate_scaling = Some(scaling);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn material(&self) -> Option<&Arc<Material>> {
        self.material.as_ref()
    }

    pub fn state(&self) -> &StateMap {
        &self.state
    }

    pub fn var(&self, name: &str) -> Option<Real> {
        self.state.get_var(name)
    }

    pub fn fluxes(&self) -> &[Flux] {
        &self.fluxes
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn mass_flow(&self) -> Option<&MassFlow> {
        self.mass_flow.as_ref()
    }

    pub fn rate_scaling(&self) -> Option<&RateScaling> {
        self.rate_scaling.as_ref()
    }

    /// Simulation time of the last committed solve.
    pub fn time(&self) -> Real {
        self.time
    }

    /// Declare a variable on a block that is not yet part of a network.
    pub fn set_var(&mut self, name: impl Into<String>, value: Real) {
        self.state.insert(name.into(), value);
    }

    pub fn add_flux(&mut self, flux: Flux) {
        self.fluxes.push(flux);
    }

    pub fn add_source(&mut self, source: Source) {
        self.sources.push(source);
    }

    pub fn set_mass_flow(&mut self, flow: MassFlow) {
        self.mass_flow = Some(flow);
    }

    pub fn set_rate_scaling(&mut self, scaling: RateScaling) {
        self.rate_scaling = Some(scaling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hn_materials::catalog;

    fn snapshot_of(block: &Block) -> Vec<Real> {
        block.state.values().copied().collect()
    }

    #[test]
    fn variables_keep_declaration_order() {
        let b = Block::new("tube").with_var("T", 20.0).with_var("P", 1.0);
        let keys: Vec<_> = b.state().keys().cloned().collect();
        assert_eq!(keys, vec!["T", "P"]);
        assert_eq!(b.var("P"), Some(1.0));
        assert_eq!(b.var("x"), None);
    }

    #[test]
    fn volumetric_flow_uses_material_density() {
        let b = Block::new("w")
            .with_material(Arc::new(catalog::const_water()))
            .with_var("T", 20.0);
        let values = snapshot_of(&b);
        let flow = MassFlow::Volumetric(2e-3);
        let m = flow.evaluate(BlockRef::new(&b, &values), 0.0).unwrap();
        assert!((m - 2.0).abs() < 1e-12);
    }

    #[test]
    fn volumetric_flow_without_material_fails() {
        let b = Block::new("w").with_var("T", 20.0);
        let values = snapshot_of(&b);
        let err = MassFlow::Volumetric(1.0)
            .evaluate(BlockRef::new(&b, &values), 0.0)
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingMaterial { .. }));
    }

    #[test]
    fn thermal_scaling_is_rho_cp_volume() {
        let b = Block::new("w")
            .with_material(Arc::new(catalog::const_water()))
            .with_var("T", 20.0);
        let values = snapshot_of(&b);
        let d = RateScaling::Thermal { volume: 0.5 }
            .divisors(BlockRef::new(&b, &values))
            .unwrap();
        assert_eq!(d.len(), 1);
        assert!((d[0] - 1000.0 * 4.218 * 0.5).abs() < 1e-9);
    }

    #[test]
    fn zero_scaling_is_rejected() {
        let b = Block::new("n").with_var("u", 0.0);
        let values = snapshot_of(&b);
        let err = RateScaling::Uniform(0.0)
            .divisors(BlockRef::new(&b, &values))
            .unwrap_err();
        assert!(matches!(err, GraphError::NonPositiveScaling { value, .. } if value == 0.0));
    }

    #[test]
    fn per_variable_scaling_must_cover_all_variables() {
        let b = Block::new("n").with_var("u", 0.0).with_var("v", 0.0);
        let values = snapshot_of(&b);
        let mut map = StateMap::new();
        map.insert("u".into(), 2.0);
        let err = RateScaling::PerVariable(map)
            .divisors(BlockRef::new(&b, &values))
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownVariable { variable, .. } if variable == "v"));
    }
}
