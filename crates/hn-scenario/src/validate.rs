//! Scenario validation logic.
//!
//! Checks what can be decided from the file alone: names, references and
//! value ranges. Checks that need materials or the assembled network
//! (variable linking, property coverage) happen when the scenario is built.

use std::collections::{HashMap, HashSet};

use crate::schema::{
    BlockDef, BlockRole, CaseDef, FluxDef, FluxKindDef, GeometryDef, MassFlowDef, RateScalingDef,
    Scenario, SeriesDef, SignalDef, SourceDef, TransientDef,
};

/// Newest scenario format this crate reads.
pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Duplicate name: {name} in {context}")]
    DuplicateName { name: String, context: String },

    #[error("Missing reference: {name} in {context}")]
    MissingReference { name: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }

    let mut material_names = HashSet::new();
    for material in &scenario.materials {
        if !material_names.insert(material.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: material.name.clone(),
                context: "materials".to_string(),
            });
        }
    }

    let mut blocks: HashMap<&str, &BlockDef> = HashMap::new();
    for block in &scenario.blocks {
        if blocks.insert(block.name.as_str(), block).is_some() {
            return Err(ValidationError::DuplicateName {
                name: block.name.clone(),
                context: "blocks".to_string(),
            });
        }
        validate_block(block)?;
    }

    for (i, flux) in scenario.fluxes.iter().enumerate() {
        validate_flux(i, flux, &blocks)?;
    }

    if let Some(transient) = &scenario.transient {
        validate_transient(transient)?;
    }

    let mut case_names = HashSet::new();
    for case in &scenario.cases {
        if !case_names.insert(case.name.as_str()) {
            return Err(ValidationError::DuplicateName {
                name: case.name.clone(),
                context: "cases".to_string(),
            });
        }
        validate_case(case, &blocks)?;
    }

    Ok(())
}

fn validate_block(block: &BlockDef) -> Result<(), ValidationError> {
    if block.name.is_empty() {
        return Err(invalid("block name", "", "must not be empty"));
    }
    if block.state.is_empty() {
        return Err(invalid(
            &format!("block '{}' state", block.name),
            "{}",
            "must declare at least one variable",
        ));
    }
    for (var, value) in &block.state {
        finite(&format!("block '{}' state {var}", block.name), *value)?;
    }

    if block.role == BlockRole::Boundary && block.sources.is_empty() {
        return Err(invalid(
            &format!("block '{}' role", block.name),
            "boundary",
            "a boundary block needs at least one source",
        ));
    }

    for (i, source) in block.sources.iter().enumerate() {
        let context = format!("block '{}' source {i}", block.name);
        let declared: Vec<&str> = block.state.keys().map(String::as_str).collect();
        let mut supplied = source.variables();
        supplied.sort_unstable();
        let mut expected = declared.clone();
        expected.sort_unstable();
        if supplied != expected {
            return Err(invalid(
                &context,
                &source.variables().join(","),
                &format!("must supply exactly {}", declared.join(",")),
            ));
        }
        match source {
            SourceDef::Constant { values } => {
                for (var, v) in values {
                    finite(&format!("{context} {var}"), *v)?;
                }
            }
            SourceDef::TimeDriven { signals } => {
                for (var, signal) in signals {
                    match signal {
                        SignalDef::Constant { value } => finite(&format!("{context} {var}"), *value)?,
                        SignalDef::Series(series) => {
                            validate_series(&format!("{context} {var}"), series)?;
                        }
                    }
                }
            }
        }
    }

    match &block.mass_flow {
        Some(MassFlowDef::Constant { value }) => {
            finite(&format!("block '{}' mass_flow", block.name), *value)?;
        }
        Some(MassFlowDef::Volumetric { rate }) => {
            finite(&format!("block '{}' mass_flow rate", block.name), *rate)?;
            require_material(block, "volumetric mass flow")?;
        }
        Some(MassFlowDef::Series(series)) => {
            validate_series(&format!("block '{}' mass_flow", block.name), series)?;
        }
        None => {}
    }

    match &block.rate_scaling {
        Some(RateScalingDef::Uniform { value }) => {
            positive(&format!("block '{}' rate_scaling", block.name), *value)?;
        }
        Some(RateScalingDef::PerVariable { values }) => {
            for (var, v) in values {
                if !block.state.contains_key(var) {
                    return Err(ValidationError::MissingReference {
                        name: var.clone(),
                        context: format!("block '{}' rate_scaling", block.name),
                    });
                }
                positive(&format!("block '{}' rate_scaling {var}", block.name), *v)?;
            }
        }
        Some(RateScalingDef::Thermal { volume_m3 }) => {
            positive(&format!("block '{}' volume_m3", block.name), *volume_m3)?;
            require_material(block, "thermal rate scaling")?;
        }
        None => {}
    }

    Ok(())
}

fn require_material(block: &BlockDef, what: &str) -> Result<(), ValidationError> {
    if block.material.is_none() {
        return Err(ValidationError::MissingReference {
            name: "material".to_string(),
            context: format!("block '{}' {what}", block.name),
        });
    }
    Ok(())
}

fn validate_series(context: &str, series: &SeriesDef) -> Result<(), ValidationError> {
    if series.times.is_empty() || series.times.len() != series.values.len() {
        return Err(invalid(
            context,
            &format!("{} times, {} values", series.times.len(), series.values.len()),
            "times and values must be non-empty and of equal length",
        ));
    }
    if series.times.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(invalid(context, "times", "must be strictly increasing"));
    }
    for v in series.times.iter().chain(&series.values) {
        finite(context, *v)?;
    }
    Ok(())
}

fn validate_flux(
    index: usize,
    flux: &FluxDef,
    blocks: &HashMap<&str, &BlockDef>,
) -> Result<(), ValidationError> {
    let context = format!("flux {index} ({} -> {})", flux.owner, flux.neighbor);
    for name in [&flux.owner, &flux.neighbor] {
        if !blocks.contains_key(name.as_str()) {
            return Err(ValidationError::MissingReference {
                name: name.clone(),
                context,
            });
        }
    }
    if flux.owner == flux.neighbor {
        return Err(invalid(&context, &flux.owner, "owner and neighbor must differ"));
    }
    if flux.mutual && !flux.kind.is_symmetric() {
        return Err(invalid(
            &context,
            "mutual",
            "only conductance, empirical and finite-difference fluxes can be mutual",
        ));
    }

    match &flux.kind {
        FluxKindDef::Conductance { value } => positive(&format!("{context} value"), *value)?,
        FluxKindDef::Empirical {
            class,
            length_m,
            scale,
        } => {
            if let crate::schema::ConductanceClassDef::Custom(h) = class {
                positive(&format!("{context} class"), *h)?;
            }
            positive(&format!("{context} length_m"), *length_m)?;
            positive(&format!("{context} scale"), *scale)?;
        }
        FluxKindDef::Layered {
            geometry,
            layers,
            inner_flow_area_m2,
            outer_flow_area_m2,
        } => {
            validate_geometry(&context, geometry)?;
            if layers.is_empty() || layers.len() != geometry.layer_count() {
                return Err(invalid(
                    &format!("{context} layers"),
                    &layers.len().to_string(),
                    &format!("geometry describes {} layers", geometry.layer_count()),
                ));
            }
            for area in inner_flow_area_m2.iter().chain(outer_flow_area_m2) {
                positive(&format!("{context} flow area"), *area)?;
            }
        }
        FluxKindDef::Convection => {
            if blocks
                .get(flux.owner.as_str())
                .is_some_and(|b| b.mass_flow.is_none())
            {
                return Err(ValidationError::MissingReference {
                    name: "mass_flow".to_string(),
                    context: format!("{context} convection owner"),
                });
            }
        }
        FluxKindDef::FiniteDifference { spacing } => {
            positive(&format!("{context} spacing"), *spacing)?;
        }
        FluxKindDef::Offset { value } => finite(&format!("{context} value"), *value)?,
    }

    if let Some(owner) = blocks.get(flux.owner.as_str()) {
        for var in &flux.variables {
            if !owner.state.contains_key(var) {
                return Err(ValidationError::MissingReference {
                    name: var.clone(),
                    context: format!("{context} variables"),
                });
            }
        }
    }
    Ok(())
}

fn validate_geometry(context: &str, geometry: &GeometryDef) -> Result<(), ValidationError> {
    match geometry {
        GeometryDef::Cylindrical { radii_m, length_m } => {
            positive(&format!("{context} length_m"), *length_m)?;
            for r in radii_m {
                positive(&format!("{context} radii_m"), *r)?;
            }
            if radii_m.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(invalid(context, "radii_m", "must be strictly increasing"));
            }
        }
        GeometryDef::Planar {
            width_m,
            length_m,
            thicknesses_m,
        } => {
            positive(&format!("{context} width_m"), *width_m)?;
            positive(&format!("{context} length_m"), *length_m)?;
            for t in thicknesses_m {
                positive(&format!("{context} thicknesses_m"), *t)?;
            }
        }
    }
    Ok(())
}

fn validate_transient(transient: &TransientDef) -> Result<(), ValidationError> {
    finite("transient t_start", transient.t_start)?;
    finite("transient t_end", transient.t_end)?;
    if !(transient.t_end > transient.t_start) {
        return Err(invalid(
            "transient t_end",
            &transient.t_end.to_string(),
            "must be after t_start",
        ));
    }
    if transient.samples < 2 {
        return Err(invalid(
            "transient samples",
            &transient.samples.to_string(),
            "must be at least 2",
        ));
    }
    if let Some(dt) = transient.dt {
        positive("transient dt", dt)?;
    }
    for tol in transient.rtol.iter().chain(&transient.atol) {
        if !tol.is_finite() || *tol < 0.0 {
            return Err(invalid(
                "transient tolerance",
                &tol.to_string(),
                "must be non-negative and finite",
            ));
        }
    }
    Ok(())
}

fn validate_case(case: &CaseDef, blocks: &HashMap<&str, &BlockDef>) -> Result<(), ValidationError> {
    for (name, values) in &case.state {
        let block = blocks
            .get(name.as_str())
            .ok_or_else(|| ValidationError::MissingReference {
                name: name.clone(),
                context: format!("case '{}' state", case.name),
            })?;
        for (var, v) in values {
            if !block.state.contains_key(var) {
                return Err(ValidationError::MissingReference {
                    name: format!("{name}.{var}"),
                    context: format!("case '{}' state", case.name),
                });
            }
            finite(&format!("case '{}' state {name}.{var}", case.name), *v)?;
        }
    }
    for (name, values) in &case.sources {
        let block = blocks
            .get(name.as_str())
            .ok_or_else(|| ValidationError::MissingReference {
                name: name.clone(),
                context: format!("case '{}' sources", case.name),
            })?;
        let mut supplied: Vec<&str> = values.keys().map(String::as_str).collect();
        let mut declared: Vec<&str> = block.state.keys().map(String::as_str).collect();
        supplied.sort_unstable();
        declared.sort_unstable();
        if supplied != declared {
            return Err(invalid(
                &format!("case '{}' sources {name}", case.name),
                &supplied.join(","),
                &format!("must supply exactly {}", declared.join(",")),
            ));
        }
        for (var, v) in values {
            finite(&format!("case '{}' sources {name}.{var}", case.name), *v)?;
        }
    }
    Ok(())
}

fn invalid(field: &str, value: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(invalid(field, &value.to_string(), "must be finite"));
    }
    Ok(())
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(field, &value.to_string(), "must be positive and finite"));
    }
    Ok(())
}
