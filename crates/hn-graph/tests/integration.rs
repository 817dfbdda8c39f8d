//! Assembly-time validation of whole networks.

use std::sync::Arc;

use hn_core::{BlockId, m, mm};
use hn_graph::{
    Block, ConductanceClass, EvalContext, Flux, GraphError, LayerGeometry, LayeredPath, MassFlow, NetworkBuilder,
    RateScaling, Source, TimeSignal,
};
use hn_materials::{MaterialRegistry, catalog};

#[test]
fn duplicate_names_rejected() {
    let mut b = NetworkBuilder::new();
    b.add_block(Block::new("x").with_var("T", 0.0));
    b.add_block(Block::new("x").with_var("T", 0.0));
    assert!(matches!(
        b.build(),
        Err(GraphError::DuplicateBlockName { name }) if name == "x"
    ));
}

#[test]
fn dangling_neighbor_rejected() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("T", 0.0));
    b.add_flux(a, Flux::conductance(BlockId::from_index(5), 1.0))
        .unwrap();
    assert!(matches!(b.build(), Err(GraphError::InvalidBlockRef { .. })));
}

#[test]
fn flux_on_unknown_owner_rejected_immediately() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("T", 0.0));
    let err = b
        .add_flux(BlockId::from_index(3), Flux::conductance(a, 1.0))
        .unwrap_err();
    assert!(matches!(err, GraphError::InvalidBlockRef { .. }));
}

#[test]
fn self_loop_rejected() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("T", 0.0));
    b.add_flux(a, Flux::conductance(a, 1.0)).unwrap();
    assert!(matches!(b.build(), Err(GraphError::SelfLoop { .. })));
}

#[test]
fn flux_variable_missing_on_neighbor() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("T", 0.0));
    let n = b.add_block(Block::new("n").with_var("u", 0.0));
    b.add_flux(a, Flux::conductance(n, 1.0)).unwrap();
    assert!(matches!(
        b.build(),
        Err(GraphError::UnknownVariable { block, variable, .. }) if block == "n" && variable == "T"
    ));
}

#[test]
fn finite_difference_targets_all_owner_variables() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("u", 1.0).with_var("v", 2.0));
    let n = b.add_block(Block::new("n").with_var("v", 0.0).with_var("u", 0.0));
    b.add_flux(a, Flux::finite_difference(n, 1.0)).unwrap();
    let net = b.build().unwrap();
    let r = net
        .block_residual(a, &net.snapshot(), EvalContext::default())
        .unwrap();
    // links resolve by name, not by position
    assert_eq!(r, vec![-1.0, -2.0]);
}

#[test]
fn flux_restricted_to_subset() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("u", 1.0).with_var("v", 2.0));
    let n = b.add_block(Block::new("n").with_var("v", 5.0));
    b.add_flux(a, Flux::finite_difference(n, 1.0).on(["v"])).unwrap();
    let net = b.build().unwrap();
    let r = net
        .block_residual(a, &net.snapshot(), EvalContext::default())
        .unwrap();
    assert_eq!(r, vec![0.0, 3.0]);
    assert_eq!(net.touched_variables(a).unwrap(), vec![false, true]);
}

#[test]
fn source_must_cover_every_variable() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("T", 0.0).with_var("P", 0.0));
    b.add_source(a, Source::constant([("T", 1.0)])).unwrap();
    assert!(matches!(
        b.build(),
        Err(GraphError::MissingSourceVariable { variable, .. }) if variable == "P"
    ));
}

#[test]
fn source_with_extra_variable_rejected() {
    let mut b = NetworkBuilder::new();
    let a = b.add_block(Block::new("a").with_var("T", 0.0));
    b.add_source(
        a,
        Source::time_driven([("T", TimeSignal::Constant(1.0)), ("Q", TimeSignal::Constant(2.0))]),
    )
    .unwrap();
    assert!(matches!(
        b.build(),
        Err(GraphError::UnknownVariable { variable, context: "source", .. }) if variable == "Q"
    ));
}

#[test]
fn custom_film_coefficient_must_be_positive() {
    for h in [-2.0, 0.0, f64::NAN] {
        let mut b = NetworkBuilder::new();
        let wall = b.add_block(Block::new("wall").with_var("T", 0.0));
        let a = b.add_block(Block::new("a").with_var("T", 0.0));
        b.add_flux(
            a,
            Flux::empirical(wall, ConductanceClass::Custom(h), m(1.0), 1.0),
        )
        .unwrap();
        assert!(matches!(
            b.build(),
            Err(GraphError::NonPhysical { what: "film coefficient", .. })
        ));
    }
}

#[test]
fn convection_needs_flow_and_material() {
    let mut b = NetworkBuilder::new();
    let up = b.add_block(Block::new("up").with_var("T", 0.0));
    let down = b.add_block(Block::new("down").with_var("T", 0.0));
    b.add_flux(down, Flux::convection(up)).unwrap();
    assert!(matches!(b.build(), Err(GraphError::MissingMassFlow { .. })));

    let mut b = NetworkBuilder::new();
    let up = b.add_block(Block::new("up").with_var("T", 0.0));
    let down = b.add_block(
        Block::new("down")
            .with_mass_flow(MassFlow::Constant(0.1))
            .with_var("T", 0.0),
    );
    b.add_flux(down, Flux::convection(up)).unwrap();
    assert!(matches!(b.build(), Err(GraphError::MissingMaterial { .. })));
}

#[test]
fn layered_gas_side_needs_flow() {
    let registry = MaterialRegistry::builtin();
    let path = LayeredPath::new(
        LayerGeometry::Planar {
            width: hn_core::m(1.0),
            length: hn_core::m(1.0),
            thicknesses: vec![mm(6.0)],
        },
        &["glass"],
        &registry,
    )
    .unwrap();
    let mut b = NetworkBuilder::new();
    let cavity = b.add_block(
        Block::new("cavity")
            .with_material(registry.get("air").unwrap())
            .with_var("T", 20.0),
    );
    let ambient = b.add_block(Block::new("ambient").with_var("T", 0.0));
    b.add_flux(cavity, Flux::layered(ambient, path)).unwrap();
    assert!(matches!(b.build(), Err(GraphError::MissingMassFlow { .. })));
}

#[test]
fn thermal_scaling_needs_capacity_properties() {
    let mut b = NetworkBuilder::new();
    b.add_block(
        Block::new("pane")
            .with_material(Arc::new(catalog::glass()))
            .with_rate_scaling(RateScaling::Thermal { volume: 1.0 })
            .with_var("T", 0.0),
    );
    assert!(matches!(b.build(), Err(GraphError::Material(_))));
}

#[test]
fn water_loop_evaluates() {
    let registry = MaterialRegistry::builtin();
    let water = registry.get("water").unwrap();
    let mut b = NetworkBuilder::new();
    let inlet = b.add_block(Block::new("inlet").with_var("T", 20.0));
    let tube = b.add_block(
        Block::new("tube")
            .with_material(water)
            .with_mass_flow(MassFlow::Volumetric(1e-6))
            .with_var("T", 22.0),
    );
    let wall = b.add_block(Block::new("wall").with_var("T", 30.0));
    let path = LayeredPath::new(
        LayerGeometry::Cylindrical {
            radii: vec![mm(2.0), mm(3.0)],
            length: hn_core::m(0.3),
        },
        &["silicon_tubing"],
        &registry,
    )
    .unwrap();
    b.add_flux(tube, Flux::convection(inlet)).unwrap();
    b.add_flux(tube, Flux::layered(wall, path)).unwrap();
    b.add_source(inlet, Source::constant([("T", 20.0)])).unwrap();
    let net = b.build().unwrap();

    let r = net
        .block_residual(tube, &net.snapshot(), EvalContext::default())
        .unwrap();
    // cooled by the cooler inlet stream, heated by the warmer wall
    let snap = net.snapshot();
    let convective = net.flux_value(tube, 0, &snap, EvalContext::default()).unwrap()[0];
    let conductive = net.flux_value(tube, 1, &snap, EvalContext::default()).unwrap()[0];
    assert!(convective < 0.0);
    assert!(conductive > 0.0);
    assert!((r[0] - (convective + conductive)).abs() < 1e-12);
}
