//! Pairwise exchange terms.
//!
//! A flux lives on its owning block and points at one neighbor. Its value is
//! the rate into the owner, so every conduction-like kind is evaluated as
//! `(neighbor - owner)` times a conductance.

use std::f64::consts::PI;
use std::sync::Arc;

use hn_core::{Area, BlockId, Length, Real, meters, square_meters};
use hn_materials::{Material, MaterialRegistry, Phase, Property};

use crate::block::Block;
use crate::error::{GraphError, GraphResult};
use crate::network::BlockRef;

/// Fully developed laminar internal flow, constant wall temperature.
const LAMINAR_NUSSELT: Real = 3.66;
/// Turbulent external flow: `Nu = C * Re^0.8 * Pr^(1/3)`.
const TURBULENT_COEFF: Real = 0.037;
const TURBULENT_RE_EXP: Real = 0.8;
const TURBULENT_PR_EXP: Real = 1.0 / 3.0;
/// Geometry-derived conductances are in W/K; rates are in kW.
const W_PER_KW: Real = 1000.0;

/// Film conductance class for the empirical conduction kind.
///
/// Values are per metre of characteristic length in W/(m·K); the kind
/// divides by 1000 so the resulting conductance is in kW/K, matching the
/// kJ-based specific heats of the material catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConductanceClass {
    Exterior,
    Interior,
    WaterAir,
    Custom(Real),
}

impl ConductanceClass {
    pub fn per_metre(self) -> Real {
        match self {
            ConductanceClass::Exterior => 0.5233,
            ConductanceClass::Interior => 1.6124,
            ConductanceClass::WaterAir => 0.160_791_751_879_746_12,
            ConductanceClass::Custom(h) => h,
        }
    }
}

/// Geometry of a multi-layer conduction path.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerGeometry {
    /// Concentric shells. `radii[0]` is the wetted inner radius and
    /// `radii[i + 1]` the outer radius of layer `i`.
    Cylindrical { radii: Vec<Length>, length: Length },
    /// Flat slabs of equal face area `width * length`.
    Planar {
        width: Length,
        length: Length,
        thicknesses: Vec<Length>,
    },
}

/// Which face of a layered path. The owner sits on the inner face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathSide {
    Inner,
    Outer,
}

#[derive(Debug, Clone, PartialEq)]
struct Surface {
    area: Real,
    /// Hydraulic diameter for cylinders, flow length for slabs.
    length: Real,
    flow_area: Real,
}

/// Series resistance through solid layers with a film on each face.
///
/// Layer resistances and surface areas are resolved once here; only the
/// film coefficients depend on the endpoints' state.
#[derive(Debug, Clone)]
pub struct LayeredPath {
    geometry: LayerGeometry,
    layers: Vec<Arc<Material>>,
    layer_resistance: Real,
    inner: Surface,
    outer: Surface,
}

impl LayeredPath {
    /// Resolve layer materials by name from `registry`.
    pub fn new(
        geometry: LayerGeometry,
        layers: &[&str],
        registry: &MaterialRegistry,
    ) -> GraphResult<Self> {
        let materials = layers
            .iter()
            .map(|name| registry.get(name))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_materials(geometry, materials)
    }

    pub fn from_materials(geometry: LayerGeometry, layers: Vec<Arc<Material>>) -> GraphResult<Self> {
        if layers.is_empty() {
            return Err(GraphError::InvalidGeometry {
                what: "a layered path needs at least one layer".into(),
            });
        }
        let conductivities = layers
            .iter()
            .map(|m| m.eval_reference(Property::Conductivity))
            .collect::<Result<Vec<_>, _>>()?;

        let (layer_resistance, inner, outer) = match &geometry {
            LayerGeometry::Cylindrical { radii, length } => {
                let r: Vec<Real> = radii.iter().map(|l| meters(*l)).collect();
                let len = meters(*length);
                if r.len() != layers.len() + 1 {
                    return Err(GraphError::InvalidGeometry {
                        what: format!(
                            "{} layers need {} radii, got {}",
                            layers.len(),
                            layers.len() + 1,
                            r.len()
                        ),
                    });
                }
                if !(len > 0.0) || !(r[0] > 0.0) || r.windows(2).any(|w| !(w[1] > w[0])) {
                    return Err(GraphError::InvalidGeometry {
                        what: "radii must be positive and strictly increasing, length positive"
                            .into(),
                    });
                }
                let resistance: Real = r
                    .windows(2)
                    .zip(&conductivities)
                    .map(|(w, k)| (w[1] / w[0]).ln() / (2.0 * PI * k * len))
                    .sum();
                let (r_in, r_out) = (r[0], r[r.len() - 1]);
                let surface = |radius: Real| Surface {
                    area: 2.0 * PI * radius * len,
                    length: 2.0 * radius,
                    flow_area: PI * radius * radius,
                };
                (resistance, surface(r_in), surface(r_out))
            }
            LayerGeometry::Planar {
                width,
                length,
                thicknesses,
            } => {
                let (w, len) = (meters(*width), meters(*length));
                let t: Vec<Real> = thicknesses.iter().map(|l| meters(*l)).collect();
                if t.len() != layers.len() {
                    return Err(GraphError::InvalidGeometry {
                        what: format!(
                            "{} layers need {} thicknesses, got {}",
                            layers.len(),
                            layers.len(),
                            t.len()
                        ),
                    });
                }
                if !(w > 0.0) || !(len > 0.0) || t.iter().any(|x| !(*x > 0.0)) {
                    return Err(GraphError::InvalidGeometry {
                        what: "width, length and thicknesses must be positive".into(),
                    });
                }
                let area = w * len;
                let resistance: Real = t
                    .iter()
                    .zip(&conductivities)
                    .map(|(x, k)| x / (k * area))
                    .sum();
                let surface = Surface {
                    area,
                    length: len,
                    flow_area: area,
                };
                (resistance, surface.clone(), surface)
            }
        };

        Ok(Self {
            geometry,
            layers,
            layer_resistance,
            inner,
            outer,
        })
    }

    /// Override the cross-section used for the Reynolds number on one face.
    pub fn with_flow_area(mut self, side: PathSide, area: Area) -> Self {
        let a = square_meters(area);
        match side {
            PathSide::Inner => self.inner.flow_area = a,
            PathSide::Outer => self.outer.flow_area = a,
        }
        self
    }

    pub fn geometry(&self) -> &LayerGeometry {
        &self.geometry
    }

    pub fn layers(&self) -> &[Arc<Material>] {
        &self.layers
    }

    /// Conductive resistance of the layers alone.
    pub fn layer_resistance(&self) -> Real {
        self.layer_resistance
    }

    pub fn surface_area(&self, side: PathSide) -> Real {
        match side {
            PathSide::Inner => self.inner.area,
            PathSide::Outer => self.outer.area,
        }
    }

    /// Total resistance between owner (inner face) and neighbor (outer face).
    pub(crate) fn resistance(
        &self,
        owner: BlockRef<'_>,
        neighbor: BlockRef<'_>,
        t: Real,
    ) -> GraphResult<Real> {
        Ok(self.layer_resistance
            + film_resistance(&self.inner, owner, t)?
            + film_resistance(&self.outer, neighbor, t)?)
    }
}

fn film_resistance(surface: &Surface, side: BlockRef<'_>, t: Real) -> GraphResult<Real> {
    let Some(material) = side.block.material.as_deref() else {
        return Ok(0.0);
    };
    let h = match material.phase {
        Phase::Solid => return Ok(0.0),
        Phase::Liquid => {
            LAMINAR_NUSSELT * material.conductivity(&side.state)? / surface.length
        }
        Phase::Gas => {
            let flow = side
                .block
                .mass_flow
                .as_ref()
                .ok_or_else(|| GraphError::MissingMassFlow {
                    block: side.block.name.clone(),
                })?;
            let mdot = flow.evaluate(side, t)?.abs();
            let mu = material.viscosity(&side.state)?;
            let pr = material.prandtl(&side.state)?;
            let k = material.conductivity(&side.state)?;
            let re = mdot * surface.length / (mu * surface.flow_area);
            if !(re > 0.0) || !re.is_finite() {
                return Err(GraphError::NonPhysical {
                    block: side.block.name.clone(),
                    what: "Reynolds number",
                    value: re,
                });
            }
            let nu = TURBULENT_COEFF * re.powf(TURBULENT_RE_EXP) * pr.powf(TURBULENT_PR_EXP);
            nu * k / surface.length
        }
    };
    Ok(1.0 / (h * surface.area))
}

/// Formula selecting how a flux turns endpoint state into a rate.
#[derive(Debug, Clone)]
pub enum FluxKind {
    /// `g * (n - o)`.
    Conductance(Real),
    /// State-independent film conductance `h * L / 1000 * scale`.
    Empirical {
        class: ConductanceClass,
        length: Length,
        scale: Real,
    },
    /// `(n - o) / R`, with `R` the films plus layers in K/W.
    Layered(LayeredPath),
    /// `mdot(owner) * cp(owner) * (n - o)`; the neighbor is upstream.
    Convection,
    /// `(n - o) / spacing^2`.
    FiniteDifference { spacing: Real },
    /// Fixed contribution independent of state.
    Offset(Real),
}

impl FluxKind {
    fn default_variables(&self) -> Option<&'static str> {
        match self {
            FluxKind::FiniteDifference { .. } | FluxKind::Offset(_) => None,
            _ => Some("T"),
        }
    }
}

/// Resolved positions of one target variable in owner and neighbor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VarLink {
    pub owner: usize,
    pub neighbor: usize,
}

/// A directed exchange term owned by one block.
#[derive(Debug, Clone)]
pub struct Flux {
    pub(crate) neighbor: BlockId,
    pub(crate) kind: FluxKind,
    /// Explicit target variables; empty means the kind's default.
    pub(crate) variables: Vec<String>,
    pub(crate) links: Vec<VarLink>,
}

impl Flux {
    pub fn new(neighbor: BlockId, kind: FluxKind) -> Self {
        Self {
            neighbor,
            kind,
            variables: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn conductance(neighbor: BlockId, g: Real) -> Self {
        Self::new(neighbor, FluxKind::Conductance(g))
    }

    pub fn empirical(
        neighbor: BlockId,
        class: ConductanceClass,
        length: Length,
        scale: Real,
    ) -> Self {
        Self::new(
            neighbor,
            FluxKind::Empirical {
                class,
                length,
                scale,
            },
        )
    }

    pub fn layered(neighbor: BlockId, path: LayeredPath) -> Self {
        Self::new(neighbor, FluxKind::Layered(path))
    }

    pub fn convection(upstream: BlockId) -> Self {
        Self::new(upstream, FluxKind::Convection)
    }

    pub fn finite_difference(neighbor: BlockId, spacing: Real) -> Self {
        Self::new(neighbor, FluxKind::FiniteDifference { spacing })
    }

    pub fn offset(neighbor: BlockId, value: Real) -> Self {
        Self::new(neighbor, FluxKind::Offset(value))
    }

    /// Restrict the flux to the named variables.
    pub fn on<S: Into<String>>(mut self, variables: impl IntoIterator<Item = S>) -> Self {
        self.variables = variables.into_iter().map(Into::into).collect();
        self
    }

    pub fn neighbor(&self) -> BlockId {
        self.neighbor
    }

    pub fn kind(&self) -> &FluxKind {
        &self.kind
    }

    /// Variable names this flux targets, before resolution against state.
    pub(crate) fn target_names_for(&self, owner: &Block) -> Vec<String> {
        if !self.variables.is_empty() {
            return self.variables.clone();
        }
        match self.kind.default_variables() {
            Some(v) => vec![v.to_string()],
            None => owner.state.keys().cloned().collect(),
        }
    }

    /// Add this flux's rate into `acc` (owner variable order).
    pub(crate) fn accumulate(
        &self,
        owner: BlockRef<'_>,
        neighbor: BlockRef<'_>,
        t: Real,
        acc: &mut [Real],
    ) -> GraphResult<()> {
        let diff = |link: &VarLink| neighbor.state.at(link.neighbor) - owner.state.at(link.owner);
        let conductance = match &self.kind {
            FluxKind::Offset(value) => {
                for link in &self.links {
                    acc[link.owner] += *value;
                }
                return Ok(());
            }
            FluxKind::Conductance(g) => *g,
            FluxKind::Empirical {
                class,
                length,
                scale,
            } => class.per_metre() * meters(*length) / W_PER_KW * scale,
            FluxKind::Layered(path) => 1.0 / (W_PER_KW * path.resistance(owner, neighbor, t)?),
            FluxKind::Convection => {
                let flow = owner.block.mass_flow.as_ref().ok_or_else(|| {
                    GraphError::MissingMassFlow {
                        block: owner.block.name.clone(),
                    }
                })?;
                let material = owner.material_for("specific heat")?;
                flow.evaluate(owner, t)? * material.specific_heat(&owner.state)?
            }
            FluxKind::FiniteDifference { spacing } => 1.0 / (spacing * spacing),
        };
        for link in &self.links {
            acc[link.owner] += conductance * diff(link);
        }
        Ok(())
    }
}
