//! Scenario to network/problem assembly.

use std::collections::HashMap;

use hn_core::{BlockId, m, m2};
use hn_graph::{
    Block, Flux, FluxKind, LayerGeometry, LayeredPath, MassFlow, NetworkBuilder, PathSide,
    RateScaling, Source, TimeSeries, TimeSignal,
};
use hn_materials::MaterialRegistry;
use hn_sim::{AdaptiveConfig, IntegratorType, SimOptions};
use hn_solver::{NewtonConfig, Problem, SteadyOptions};

use crate::schema::{
    BlockRole, CaseDef, FluxDef, FluxKindDef, GeometryDef, IntegratorDef, MassFlowDef,
    RateScalingDef, Scenario, SeriesDef, SignalDef, SourceDef, TransientDef,
};
use crate::validate::validate_scenario;
use crate::{ScenarioError, ScenarioResult};

/// `base` plus every material declared in the scenario.
pub fn material_registry(scenario: &Scenario, base: &MaterialRegistry) -> MaterialRegistry {
    let mut registry = base.clone();
    for material in &scenario.materials {
        registry.insert(material.clone());
    }
    registry
}

/// Validate and assemble `scenario` into a problem ready to solve.
///
/// Solvable blocks become the unknowns in file order; boundary blocks are
/// driven by their sources; fixed blocks keep their declared state.
pub fn build_problem(scenario: &Scenario, base: &MaterialRegistry) -> ScenarioResult<Problem> {
    validate_scenario(scenario)?;
    let registry = material_registry(scenario, base);

    let mut builder = NetworkBuilder::new();
    let mut ids: HashMap<&str, BlockId> = HashMap::new();
    let mut solvable = Vec::new();
    let mut boundary = Vec::new();

    for def in &scenario.blocks {
        let mut block = Block::new(def.name.as_str());
        for (var, value) in &def.state {
            block = block.with_var(var.as_str(), *value);
        }
        if let Some(name) = &def.material {
            block = block.with_material(registry.get(name)?);
        }
        if let Some(flow) = &def.mass_flow {
            block = block.with_mass_flow(mass_flow(flow)?);
        }
        if let Some(scaling) = &def.rate_scaling {
            block = block.with_rate_scaling(rate_scaling(scaling));
        }
        let id = builder.add_block(block);
        for source in &def.sources {
            builder.add_source(id, source_from_def(source)?)?;
        }
        match def.role {
            BlockRole::Solvable => solvable.push(id),
            BlockRole::Boundary => boundary.push(id),
            BlockRole::Fixed => {}
        }
        ids.insert(def.name.as_str(), id);
    }

    for def in &scenario.fluxes {
        let owner = lookup(&ids, &def.owner)?;
        let neighbor = lookup(&ids, &def.neighbor)?;
        builder.add_flux(owner, flux(def, neighbor, &registry)?)?;
        if def.mutual {
            builder.add_flux(neighbor, flux(def, owner, &registry)?)?;
        }
    }

    let network = builder.build()?;
    let mut problem = Problem::new(network, solvable, boundary)?;
    if let Some(transient) = &scenario.transient {
        problem.set_time(transient.t_start);
    }
    Ok(problem)
}

/// Copy of `scenario` with the overrides of `case` folded in.
pub fn apply_case(scenario: &Scenario, case: &CaseDef) -> ScenarioResult<Scenario> {
    let mut out = scenario.clone();
    out.cases.clear();
    for (name, values) in &case.state {
        let block = block_def_mut(&mut out, name)?;
        for (var, v) in values {
            block.state.insert(var.clone(), *v);
        }
    }
    for (name, values) in &case.sources {
        let block = block_def_mut(&mut out, name)?;
        block.sources = vec![SourceDef::Constant {
            values: values.clone(),
        }];
    }
    Ok(out)
}

/// Named case of `scenario`, applied.
pub fn case_scenario(scenario: &Scenario, name: &str) -> ScenarioResult<Scenario> {
    let case = scenario
        .cases
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| ScenarioError::UnknownCase { name: name.into() })?;
    apply_case(scenario, case)
}

pub fn steady_options(scenario: &Scenario) -> SteadyOptions {
    let mut options = SteadyOptions::default();
    if let Some(steady) = &scenario.steady {
        options.time = steady.time;
        if let Some(newton) = &steady.newton {
            let defaults = NewtonConfig::default();
            options.newton = NewtonConfig {
                max_iterations: newton.max_iterations.unwrap_or(defaults.max_iterations),
                abs_tol: newton.abs_tol.unwrap_or(defaults.abs_tol),
                rel_tol: newton.rel_tol.unwrap_or(defaults.rel_tol),
                ..defaults
            };
        }
    }
    options
}

pub fn sim_options(transient: &TransientDef) -> SimOptions {
    let defaults = SimOptions::default();
    let adaptive = AdaptiveConfig {
        rtol: transient.rtol.unwrap_or(defaults.adaptive.rtol),
        atol: transient.atol.unwrap_or(defaults.adaptive.atol),
        ..defaults.adaptive.clone()
    };
    SimOptions {
        integrator: match transient.integrator {
            IntegratorDef::DormandPrince => IntegratorType::DormandPrince,
            IntegratorDef::Rk4 => IntegratorType::RK4,
            IntegratorDef::ForwardEuler => IntegratorType::ForwardEuler,
        },
        adaptive,
        dt: transient.dt.unwrap_or(defaults.dt),
        ..defaults
    }
}

fn block_def_mut<'a>(
    scenario: &'a mut Scenario,
    name: &str,
) -> ScenarioResult<&'a mut crate::schema::BlockDef> {
    scenario
        .blocks
        .iter_mut()
        .find(|b| b.name == name)
        .ok_or_else(|| {
            ScenarioError::Graph(hn_graph::GraphError::UnknownBlock { name: name.into() })
        })
}

fn lookup(ids: &HashMap<&str, BlockId>, name: &str) -> ScenarioResult<BlockId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| hn_graph::GraphError::UnknownBlock { name: name.into() }.into())
}

fn series(def: &SeriesDef) -> ScenarioResult<TimeSeries> {
    Ok(TimeSeries::new(
        def.times.clone(),
        def.values.clone(),
        def.interpolation.into(),
    )?)
}

fn mass_flow(def: &MassFlowDef) -> ScenarioResult<MassFlow> {
    Ok(match def {
        MassFlowDef::Constant { value } => MassFlow::Constant(*value),
        MassFlowDef::Volumetric { rate } => MassFlow::Volumetric(*rate),
        MassFlowDef::Series(s) => MassFlow::Series(series(s)?),
    })
}

fn rate_scaling(def: &RateScalingDef) -> RateScaling {
    match def {
        RateScalingDef::Uniform { value } => RateScaling::Uniform(*value),
        RateScalingDef::PerVariable { values } => RateScaling::PerVariable(values.clone()),
        RateScalingDef::Thermal { volume_m3 } => RateScaling::Thermal { volume: *volume_m3 },
    }
}

fn source_from_def(def: &SourceDef) -> ScenarioResult<Source> {
    Ok(match def {
        SourceDef::Constant { values } => Source::Constant(values.clone()),
        SourceDef::TimeDriven { signals } => {
            let mut out = Vec::with_capacity(signals.len());
            for (var, signal) in signals {
                let signal = match signal {
                    SignalDef::Constant { value } => TimeSignal::Constant(*value),
                    SignalDef::Series(s) => TimeSignal::Series(series(s)?),
                };
                out.push((var.clone(), signal));
            }
            Source::time_driven(out)
        }
    })
}

fn flux(def: &FluxDef, neighbor: BlockId, registry: &MaterialRegistry) -> ScenarioResult<Flux> {
    let kind = match &def.kind {
        FluxKindDef::Conductance { value } => FluxKind::Conductance(*value),
        FluxKindDef::Empirical {
            class,
            length_m,
            scale,
        } => FluxKind::Empirical {
            class: (*class).into(),
            length: m(*length_m),
            scale: *scale,
        },
        FluxKindDef::Layered {
            geometry,
            layers,
            inner_flow_area_m2,
            outer_flow_area_m2,
        } => {
            let names: Vec<&str> = layers.iter().map(String::as_str).collect();
            let mut path = LayeredPath::new(layer_geometry(geometry), &names, registry)?;
            if let Some(area) = inner_flow_area_m2 {
                path = path.with_flow_area(PathSide::Inner, m2(*area));
            }
            if let Some(area) = outer_flow_area_m2 {
                path = path.with_flow_area(PathSide::Outer, m2(*area));
            }
            FluxKind::Layered(path)
        }
        FluxKindDef::Convection => FluxKind::Convection,
        FluxKindDef::FiniteDifference { spacing } => FluxKind::FiniteDifference { spacing: *spacing },
        FluxKindDef::Offset { value } => FluxKind::Offset(*value),
    };
    let flux = Flux::new(neighbor, kind);
    Ok(if def.variables.is_empty() {
        flux
    } else {
        flux.on(def.variables.iter().cloned())
    })
}

fn layer_geometry(def: &GeometryDef) -> LayerGeometry {
    match def {
        GeometryDef::Cylindrical { radii_m, length_m } => LayerGeometry::Cylindrical {
            radii: radii_m.iter().copied().map(m).collect(),
            length: m(*length_m),
        },
        GeometryDef::Planar {
            width_m,
            length_m,
            thicknesses_m,
        } => LayerGeometry::Planar {
            width: m(*width_m),
            length: m(*length_m),
            thicknesses: thicknesses_m.iter().copied().map(m).collect(),
        },
    }
}
