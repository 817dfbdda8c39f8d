//! Assembly-time validation and link resolution.

use std::collections::HashMap;

use hn_core::{BlockId, Real};
use hn_materials::{MaterialError, Phase, Property};

use crate::block::{Block, MassFlow, RateScaling};
use crate::error::{GraphError, GraphResult};
use crate::flux::{FluxKind, VarLink};

/// Validate every block, resolve flux variable links in place and return
/// the name table.
pub(crate) fn validate_blocks(blocks: &mut [Block]) -> GraphResult<HashMap<String, BlockId>> {
    let names = unique_names(blocks)?;

    // Resolve first against an immutable view, then write back
    let mut resolved: Vec<Vec<Vec<VarLink>>> = Vec::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        let mut per_block = Vec::with_capacity(block.fluxes.len());
        for flux in &block.fluxes {
            let neighbor = blocks
                .get(flux.neighbor.slot())
                .ok_or(GraphError::InvalidBlockRef { id: flux.neighbor })?;
            if flux.neighbor.slot() == i {
                return Err(GraphError::SelfLoop {
                    block: block.name.clone(),
                });
            }
            check_flux_kind(&flux.kind, block, neighbor)?;
            per_block.push(resolve_links(block, neighbor, flux.target_names_for(block))?);
        }
        check_sources(block)?;
        check_mass_flow(block)?;
        check_rate_scaling(block)?;
        resolved.push(per_block);
    }

    for (block, links) in blocks.iter_mut().zip(resolved) {
        for (flux, l) in block.fluxes.iter_mut().zip(links) {
            flux.links = l;
        }
    }
    Ok(names)
}

fn unique_names(blocks: &[Block]) -> GraphResult<HashMap<String, BlockId>> {
    let mut names = HashMap::with_capacity(blocks.len());
    for (i, block) in blocks.iter().enumerate() {
        if names
            .insert(block.name.clone(), BlockId::from_index(i as u32))
            .is_some()
        {
            return Err(GraphError::DuplicateBlockName {
                name: block.name.clone(),
            });
        }
    }
    Ok(names)
}

fn resolve_links(owner: &Block, neighbor: &Block, targets: Vec<String>) -> GraphResult<Vec<VarLink>> {
    targets
        .into_iter()
        .map(|name| {
            let position = |b: &Block| {
                b.state
                    .get_index_of(&name)
                    .ok_or_else(|| GraphError::UnknownVariable {
                        block: b.name.clone(),
                        variable: name.clone(),
                        context: "flux",
                    })
            };
            Ok(VarLink {
                owner: position(owner)?,
                neighbor: position(neighbor)?,
            })
        })
        .collect()
}

fn require_properties(
    block: &Block,
    properties: &[Property],
    needed: &'static str,
) -> GraphResult<()> {
    let material = block
        .material
        .as_deref()
        .ok_or_else(|| GraphError::MissingMaterial {
            block: block.name.clone(),
            needed,
        })?;
    for &property in properties {
        if !material.has(property) {
            return Err(MaterialError::MissingProperty {
                material: material.name.clone(),
                property,
            }
            .into());
        }
    }
    Ok(())
}

fn require_mass_flow(block: &Block) -> GraphResult<()> {
    if block.mass_flow.is_none() {
        return Err(GraphError::MissingMassFlow {
            block: block.name.clone(),
        });
    }
    Ok(())
}

fn check_positive(block: &Block, what: &'static str, value: Real) -> GraphResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(GraphError::NonPhysical {
            block: block.name.clone(),
            what,
            value,
        })
    }
}

fn check_flux_kind(kind: &FluxKind, owner: &Block, neighbor: &Block) -> GraphResult<()> {
    match kind {
        FluxKind::Conductance(g) => check_positive(owner, "conductance", *g),
        FluxKind::Empirical { class, scale, .. } => {
            check_positive(owner, "film coefficient", class.per_metre())?;
            check_positive(owner, "conductance scale", *scale)
        }
        FluxKind::FiniteDifference { spacing } => check_positive(owner, "grid spacing", *spacing),
        FluxKind::Offset(v) if !v.is_finite() => Err(GraphError::NonPhysical {
            block: owner.name.clone(),
            what: "flux offset",
            value: *v,
        }),
        FluxKind::Offset(_) => Ok(()),
        FluxKind::Convection => {
            require_mass_flow(owner)?;
            require_properties(owner, &[Property::SpecificHeat], "specific heat")
        }
        FluxKind::Layered(_) => {
            for side in [owner, neighbor] {
                match side.material.as_deref().map(|m| m.phase) {
                    Some(Phase::Liquid) => {
                        require_properties(side, &[Property::Conductivity], "conductivity")?
                    }
                    Some(Phase::Gas) => {
                        require_mass_flow(side)?;
                        require_properties(
                            side,
                            &[
                                Property::Conductivity,
                                Property::Viscosity,
                                Property::Prandtl,
                            ],
                            "gas film properties",
                        )?
                    }
                    Some(Phase::Solid) | None => {}
                }
            }
            Ok(())
        }
    }
}

fn check_sources(block: &Block) -> GraphResult<()> {
    for source in &block.sources {
        let supplied = source.variables();
        if let Some(extra) = supplied.iter().find(|v| !block.state.contains_key(**v)) {
            return Err(GraphError::UnknownVariable {
                block: block.name.clone(),
                variable: (*extra).to_string(),
                context: "source",
            });
        }
        if let Some(missing) = block.state.keys().find(|k| !supplied.contains(&k.as_str())) {
            return Err(GraphError::MissingSourceVariable {
                block: block.name.clone(),
                variable: missing.clone(),
            });
        }
    }
    Ok(())
}

fn check_mass_flow(block: &Block) -> GraphResult<()> {
    match &block.mass_flow {
        Some(MassFlow::Volumetric(_)) => {
            require_properties(block, &[Property::Density], "density")
        }
        _ => Ok(()),
    }
}

fn check_rate_scaling(block: &Block) -> GraphResult<()> {
    match &block.rate_scaling {
        Some(RateScaling::Thermal { volume }) => {
            check_positive(block, "volume", *volume)?;
            require_properties(
                block,
                &[Property::Density, Property::SpecificHeat],
                "density and specific heat",
            )
        }
        Some(RateScaling::PerVariable(map)) => {
            if let Some(extra) = map.keys().find(|k| !block.state.contains_key(k.as_str())) {
                return Err(GraphError::UnknownVariable {
                    block: block.name.clone(),
                    variable: extra.clone(),
                    context: "rate scaling",
                });
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
