//! Steady solves of small conduction networks.

use approx::assert_abs_diff_eq;
use hn_core::BlockId;
use hn_graph::{Block, EvalContext, Flux, Network, NetworkBuilder, Source};
use hn_solver::{NewtonConfig, Problem, SolverError, SteadyOptions, solve_steady};
use proptest::prelude::*;

/// cold --g1-- mid --g2-- hot, with an optional heat source on mid.
fn series(g1: f64, g2: f64, q: f64) -> (Network, [BlockId; 3]) {
    let mut b = NetworkBuilder::new();
    let cold = b.add_block(Block::new("cold").with_var("T", 0.0));
    let mid = b.add_block(Block::new("mid").with_var("T", 1.0));
    let hot = b.add_block(Block::new("hot").with_var("T", 10.0));
    b.add_flux(mid, Flux::conductance(cold, g1)).unwrap();
    b.add_flux(mid, Flux::conductance(hot, g2)).unwrap();
    if q != 0.0 {
        b.add_source(mid, Source::constant([("T", q)])).unwrap();
    }
    b.add_source(cold, Source::constant([("T", 0.0)])).unwrap();
    b.add_source(hot, Source::constant([("T", 10.0)])).unwrap();
    (b.build().unwrap(), [cold, mid, hot])
}

/// a -- c -- d -- wall with mirrored conductances, heat source `q` on a.
fn chain(q: f64) -> (Network, [BlockId; 4]) {
    let mut b = NetworkBuilder::new();
    let wall = b.add_block(Block::new("wall").with_var("T", 20.0));
    let a = b.add_block(Block::new("a").with_var("T", 20.0));
    let c = b.add_block(Block::new("c").with_var("T", 20.0));
    let d = b.add_block(Block::new("d").with_var("T", 20.0));
    for (x, y, g) in [(a, c, 1.5), (c, d, 0.8), (d, wall, 2.0)] {
        b.add_flux(x, Flux::conductance(y, g)).unwrap();
        b.add_flux(y, Flux::conductance(x, g)).unwrap();
    }
    b.add_source(a, Source::constant([("T", q)])).unwrap();
    b.add_source(wall, Source::constant([("T", 20.0)])).unwrap();
    (b.build().unwrap(), [wall, a, c, d])
}

#[test]
fn equal_resistances_give_midpoint() {
    let (net, [cold, mid, hot]) = series(1.0, 1.0, 0.0);
    let mut problem = Problem::new(net, vec![mid], vec![cold, hot]).unwrap();
    let solution = problem.solve().unwrap();
    assert_abs_diff_eq!(solution.x[0], 5.0, epsilon = 1e-6);
    assert_abs_diff_eq!(problem.value("mid", "T").unwrap(), 5.0, epsilon = 1e-6);
}

#[test]
fn unequal_resistances_give_weighted_average() {
    let (net, [cold, mid, hot]) = series(3.0, 1.0, 0.0);
    let mut problem = Problem::new(net, vec![mid], vec![cold, hot]).unwrap();
    problem.solve().unwrap();
    assert_abs_diff_eq!(problem.value("mid", "T").unwrap(), 2.5, epsilon = 1e-6);
}

#[test]
fn held_blocks_act_as_fixed_boundaries() {
    let (net, [_, mid, _]) = series(1.0, 1.0, 0.0);
    // neither cold nor hot is listed: both keep their initial state
    let mut problem = Problem::new(net, vec![mid], vec![]).unwrap();
    problem.solve().unwrap();
    assert_abs_diff_eq!(problem.value("mid", "T").unwrap(), 5.0, epsilon = 1e-6);
}

#[test]
fn solving_twice_is_idempotent() {
    let (net, [cold, mid, hot]) = series(1.0, 2.0, 3.0);
    let mut problem = Problem::new(net, vec![mid], vec![cold, hot]).unwrap();
    let first = problem.solve().unwrap();
    let second = problem.solve().unwrap();
    assert_eq!(second.iterations, 0);
    assert_abs_diff_eq!(first.x[0], second.x[0], epsilon = 1e-12);
}

#[test]
fn edges_conserve_energy_at_solution() {
    // two free nodes with mirrored fluxes: a -- b, each also tied to a wall
    let mut builder = NetworkBuilder::new();
    let wall = builder.add_block(Block::new("wall").with_var("T", 0.0));
    let a = builder.add_block(Block::new("a").with_var("T", 1.0));
    let b = builder.add_block(Block::new("b").with_var("T", 1.0));
    builder.add_flux(a, Flux::conductance(b, 0.7)).unwrap();
    builder.add_flux(b, Flux::conductance(a, 0.7)).unwrap();
    builder.add_flux(a, Flux::conductance(wall, 1.0)).unwrap();
    builder.add_flux(b, Flux::conductance(wall, 2.0)).unwrap();
    builder.add_source(a, Source::constant([("T", 5.0)])).unwrap();
    builder.add_source(wall, Source::constant([("T", 0.0)])).unwrap();
    let net = builder.build().unwrap();

    let mut problem = Problem::new(net, vec![a, b], vec![wall]).unwrap();
    problem.solve().unwrap();

    let net = problem.network();
    let snap = net.snapshot();
    let ctx = EvalContext::default();
    let a_to_b = net.flux_value(a, 0, &snap, ctx).unwrap()[0];
    let b_to_a = net.flux_value(b, 0, &snap, ctx).unwrap()[0];
    assert_abs_diff_eq!(a_to_b, -b_to_a, epsilon = 1e-12);

    // everything the source injects leaves through the wall
    let into_wall = -(net.flux_value(a, 1, &snap, ctx).unwrap()[0]
        + net.flux_value(b, 1, &snap, ctx).unwrap()[0]);
    assert_abs_diff_eq!(into_wall, 5.0, epsilon = 1e-8);
}

#[test]
fn failure_carries_last_iterate_and_commits_nothing() {
    let (net, [cold, mid, hot]) = series(1.0, 1.0, 0.0);
    let mut problem = Problem::new(net, vec![mid], vec![cold, hot]).unwrap();
    let options = SteadyOptions {
        newton: NewtonConfig {
            max_iterations: 0,
            ..NewtonConfig::default()
        },
        ..SteadyOptions::default()
    };
    let err = solve_steady(&mut problem, &options).unwrap_err();
    match err {
        SolverError::ConvergenceFailed {
            iterations,
            residual_norm,
            last_iterate,
        } => {
            assert_eq!(iterations, 0);
            assert_abs_diff_eq!(residual_norm, 8.0, epsilon = 1e-12);
            assert_eq!(last_iterate.as_slice(), &[1.0]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(problem.value("mid", "T").unwrap(), 1.0);
}

#[test]
fn offset_balances_diffusion() {
    let mut b = NetworkBuilder::new();
    let sink = b.add_block(Block::new("sink").with_var("u", 0.0));
    let mid = b.add_block(Block::new("mid").with_var("u", 0.0));
    b.add_flux(mid, Flux::finite_difference(sink, 0.5)).unwrap();
    b.add_flux(mid, Flux::offset(sink, 2.0)).unwrap();
    let net = b.build().unwrap();
    let mut problem = Problem::new(net, vec![mid], vec![]).unwrap();
    problem.solve().unwrap();
    // 4 * (0 - u) + 2 = 0
    assert_abs_diff_eq!(problem.value("mid", "u").unwrap(), 0.5, epsilon = 1e-9);
}

proptest! {
    #[test]
    fn mid_temperature_rises_with_source(q1 in -20.0f64..20.0, dq in 0.01f64..20.0) {
        let solve = |q: f64| {
            let (net, [cold, mid, hot]) = series(1.0, 2.0, q);
            let mut problem = Problem::new(net, vec![mid], vec![cold, hot]).unwrap();
            problem.solve().unwrap().x[0]
        };
        prop_assert!(solve(q1 + dq) > solve(q1));
    }

    #[test]
    fn source_warms_every_downstream_block(q1 in -20.0f64..20.0, dq in 0.01f64..20.0) {
        let solve = |q: f64| {
            let (net, [wall, a, c, d]) = chain(q);
            let mut problem = Problem::new(net, vec![a, c, d], vec![wall]).unwrap();
            problem.solve().unwrap().x
        };
        let low = solve(q1);
        let high = solve(q1 + dq);
        for i in 0..3 {
            prop_assert!(high[i] > low[i], "block {} did not warm: {} -> {}", i, low[i], high[i]);
        }
    }
}
