use std::path::Path;

use approx::assert_abs_diff_eq;
use hn_graph::GraphError;
use hn_materials::MaterialRegistry;
use hn_scenario::schema::*;
use hn_scenario::{
    ScenarioError, apply_case, build_problem, case_scenario, load_yaml, sim_options, steady_options,
};
use hn_sim::solve_transient;
use hn_solver::{SolverError, solve_steady};

fn demo(name: &str) -> Scenario {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name);
    load_yaml(&path).unwrap()
}

#[test]
fn rod_steady_midpoint() {
    let scenario = demo("rod.yaml");
    let mut problem = build_problem(&scenario, &MaterialRegistry::builtin()).unwrap();
    assert_eq!(problem.labels(), vec!["mid_T"]);
    solve_steady(&mut problem, &steady_options(&scenario)).unwrap();
    assert_abs_diff_eq!(problem.value("mid", "T").unwrap(), 5.0, epsilon = 1e-6);
}

#[test]
fn rod_transient_relaxes_to_steady() {
    let scenario = demo("rod.yaml");
    let transient = scenario.transient.clone().unwrap();
    let mut problem = build_problem(&scenario, &MaterialRegistry::builtin()).unwrap();
    let trajectory =
        solve_transient(&mut problem, &transient.output_times(), &sim_options(&transient)).unwrap();
    assert_eq!(trajectory.len(), 21);
    let mid = trajectory.series("mid_T").unwrap();
    assert_eq!(mid[0], 2.0);
    // dT/dt = 5 - T
    assert_abs_diff_eq!(mid[1], 5.0 - 3.0 * (-1.0f64).exp(), epsilon = 1e-4);
    assert_abs_diff_eq!(problem.value("mid", "T").unwrap(), 5.0, epsilon = 1e-6);
}

#[test]
fn cases_override_sources_and_state() {
    let scenario = demo("rod.yaml");
    let registry = MaterialRegistry::builtin();

    let warm = case_scenario(&scenario, "warm_end").unwrap();
    assert!(warm.cases.is_empty());
    let mut problem = build_problem(&warm, &registry).unwrap();
    problem.solve().unwrap();
    assert_abs_diff_eq!(problem.value("mid", "T").unwrap(), 7.0, epsilon = 1e-6);

    let hot = apply_case(&scenario, &scenario.cases[1]).unwrap();
    let problem = build_problem(&hot, &registry).unwrap();
    assert_eq!(problem.value("mid", "T").unwrap(), 9.0);

    assert!(matches!(
        case_scenario(&scenario, "nope"),
        Err(ScenarioError::UnknownCase { .. })
    ));
}

#[test]
fn facade_channel_heats_along_the_flow() {
    let scenario = demo("facade_channel.yaml");
    let mut problem = build_problem(&scenario, &MaterialRegistry::builtin()).unwrap();
    solve_steady(&mut problem, &steady_options(&scenario)).unwrap();
    let t: Vec<f64> = ["module_1", "module_2", "module_3"]
        .iter()
        .map(|b| problem.value(b, "T").unwrap())
        .collect();
    assert!(20.0 < t[0] && t[0] < t[1] && t[1] < t[2] && t[2] < 40.0, "{t:?}");
}

#[test]
fn facade_channel_overcast_is_cooler() {
    let scenario = demo("facade_channel.yaml");
    let registry = MaterialRegistry::builtin();
    let mut sunny = build_problem(&scenario, &registry).unwrap();
    sunny.solve().unwrap();
    let mut overcast = build_problem(&case_scenario(&scenario, "overcast").unwrap(), &registry).unwrap();
    overcast.solve().unwrap();
    assert!(overcast.value("module_3", "T").unwrap() < sunny.value("module_3", "T").unwrap());
}

#[test]
fn facade_channel_transient_tracks_inlet_ramp() {
    let scenario = demo("facade_channel.yaml");
    let transient = scenario.transient.clone().unwrap();
    let mut problem = build_problem(&scenario, &MaterialRegistry::builtin()).unwrap();
    let trajectory =
        solve_transient(&mut problem, &transient.output_times(), &sim_options(&transient)).unwrap();
    assert_eq!(trajectory.len(), 13);
    let outlet = trajectory.series("module_3_T").unwrap();
    assert!(outlet.iter().all(|v| v.is_finite()));
    // the inlet warms by 4 K over the run
    assert!(outlet[12] > outlet[1]);
    assert_eq!(problem.value("inlet", "T").unwrap(), 24.0);
}

#[test]
fn mutual_flux_is_attached_to_both_ends() {
    let mut scenario = demo("rod.yaml");
    scenario.blocks[2].role = BlockRole::Solvable;
    scenario.blocks[2].sources.clear();
    scenario.fluxes[1].mutual = true;
    let problem = build_problem(&scenario, &MaterialRegistry::builtin()).unwrap();
    let network = problem.network();
    assert_eq!(network.block_by_name("hot").unwrap().fluxes().len(), 1);
    assert_eq!(network.block_by_name("mid").unwrap().fluxes().len(), 2);
    assert_eq!(problem.len(), 2);
}

#[test]
fn unknown_material_is_reported() {
    let mut scenario = demo("rod.yaml");
    scenario.blocks[1].material = Some("unobtainium".into());
    assert!(matches!(
        build_problem(&scenario, &MaterialRegistry::builtin()),
        Err(ScenarioError::Material(_))
    ));
}

#[test]
fn unknown_layer_material_is_reported() {
    let mut scenario = demo("facade_channel.yaml");
    scenario.materials.clear();
    assert!(matches!(
        build_problem(&scenario, &MaterialRegistry::builtin()),
        Err(ScenarioError::Graph(GraphError::Material(_)))
    ));
}

#[test]
fn untouched_solvable_block_is_reported() {
    let mut scenario = demo("rod.yaml");
    scenario.blocks.push(BlockDef {
        name: "island".into(),
        role: BlockRole::Solvable,
        state: [("T".to_string(), 0.0)].into_iter().collect(),
        material: None,
        mass_flow: None,
        rate_scaling: None,
        sources: Vec::new(),
    });
    assert!(matches!(
        build_problem(&scenario, &MaterialRegistry::builtin()),
        Err(ScenarioError::Solver(SolverError::Graph(
            GraphError::UnconstrainedVariable { .. }
        )))
    ));
}

#[test]
fn flux_variable_missing_on_neighbor_is_reported() {
    let mut scenario = demo("rod.yaml");
    scenario.blocks[1].state.insert("u".into(), 0.0);
    scenario.fluxes.push(FluxDef {
        owner: "mid".into(),
        neighbor: "cold".into(),
        kind: FluxKindDef::FiniteDifference { spacing: 1.0 },
        variables: vec!["u".into()],
        mutual: false,
    });
    assert!(matches!(
        build_problem(&scenario, &MaterialRegistry::builtin()),
        Err(ScenarioError::Graph(GraphError::UnknownVariable { .. }))
    ));
}
