//! Transient solve of a [`Problem`] over requested output times.

use std::fmt::Write as _;

use hn_graph::GraphError;
use hn_solver::Problem;
use nalgebra::DVector;
use tracing::{debug, info, warn};

use crate::error::{SimError, SimResult};
use crate::integrator::{AdaptiveConfig, DormandPrince, ForwardEuler, Integrator, RK4};
use crate::model::{NetworkModel, TransientModel};

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// Adaptive Dormand–Prince 5(4) (default).
    #[default]
    DormandPrince,
    /// 4th-order Runge-Kutta, fixed step `dt`.
    RK4,
    /// Forward Euler, fixed step `dt`.
    ForwardEuler,
}

/// Options for transient runs.
#[derive(Clone, Debug, PartialEq)]
pub struct SimOptions {
    pub integrator: IntegratorType,
    /// Step-size control for the adaptive integrator.
    pub adaptive: AdaptiveConfig,
    /// Largest step for the fixed-step integrators; each output interval is
    /// split into equal steps no longer than this.
    pub dt: f64,
    /// Safety limit on accepted plus rejected steps.
    pub max_steps: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            integrator: IntegratorType::default(),
            adaptive: AdaptiveConfig::default(),
            dt: 1e-2,
            max_steps: 1_000_000,
        }
    }
}

/// Value of every `(block, variable)` pair at every requested output time.
///
/// Columns follow block order, then each block's declaration order, so
/// boundary drive and held blocks are recorded next to the unknowns.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    /// `<block>_<var>` per column.
    pub labels: Vec<String>,
    pub times: Vec<f64>,
    pub states: Vec<DVector<f64>>,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Time series of one `<block>_<var>` column.
    pub fn series(&self, label: &str) -> Option<Vec<f64>> {
        let col = self.labels.iter().position(|l| l == label)?;
        Some(self.states.iter().map(|x| x[col]).collect())
    }

    pub fn final_state(&self) -> Option<&DVector<f64>> {
        self.states.last()
    }

    /// Flat table: a `time` column then one column per `(block, variable)`.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from("time");
        for label in &self.labels {
            csv.push(',');
            csv.push_str(label);
        }
        csv.push('\n');
        for (t, x) in self.times.iter().zip(&self.states) {
            let _ = write!(csv, "{t}");
            for v in x.iter() {
                let _ = write!(csv, ",{v}");
            }
            csv.push('\n');
        }
        csv
    }
}

/// Integrate `problem` through `output_times` and commit the final state.
///
/// The first output time is the start time; the initial state is the
/// problem's current solvable state. `output_times` must be finite and
/// strictly increasing. Every solvable block needs a rate scaling.
pub fn solve_transient(
    problem: &mut Problem,
    output_times: &[f64],
    options: &SimOptions,
) -> SimResult<Trajectory> {
    validate(problem, output_times, options)?;

    let (states, evaluations) = {
        let mut model = NetworkModel::new(problem);
        let states = match options.integrator {
            IntegratorType::DormandPrince => {
                integrate_adaptive(&mut model, output_times, &options.adaptive, options.max_steps)?
            }
            IntegratorType::RK4 => {
                integrate_fixed(&RK4, &mut model, output_times, options.dt, options.max_steps)?
            }
            IntegratorType::ForwardEuler => integrate_fixed(
                &ForwardEuler,
                &mut model,
                output_times,
                options.dt,
                options.max_steps,
            )?,
        };
        (states, model.evaluations())
    };

    let t_end = output_times[output_times.len() - 1];
    if let Some(last) = states.last() {
        problem.commit(last, t_end)?;
    }
    info!(
        outputs = output_times.len(),
        evaluations,
        t_end,
        "transient solve finished"
    );

    let states = output_times
        .iter()
        .zip(&states)
        .map(|(&t, x)| full_state(problem, x, t))
        .collect::<SimResult<Vec<_>>>()?;
    Ok(Trajectory {
        labels: full_labels(problem),
        times: output_times.to_vec(),
        states,
    })
}

fn full_labels(problem: &Problem) -> Vec<String> {
    problem
        .network()
        .blocks()
        .iter()
        .flat_map(|b| b.state().keys().map(move |v| format!("{}_{v}", b.name())))
        .collect()
}

/// Every block's values at `t` with unknowns `x`, boundaries driven.
fn full_state(problem: &Problem, x: &DVector<f64>, t: f64) -> SimResult<DVector<f64>> {
    let snapshot = problem.snapshot_at(x, t)?;
    let network = problem.network();
    let values: Vec<f64> = network
        .ids()
        .flat_map(|id| snapshot.block(id).iter().copied())
        .collect();
    Ok(DVector::from_vec(values))
}

fn validate(problem: &Problem, output_times: &[f64], options: &SimOptions) -> SimResult<()> {
    if output_times.is_empty() {
        return Err(SimError::InvalidArg {
            what: "at least one output time is required",
        });
    }
    if output_times.iter().any(|t| !t.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "output times must be finite",
        });
    }
    if output_times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SimError::InvalidArg {
            what: "output times must be strictly increasing",
        });
    }
    if options.integrator != IntegratorType::DormandPrince && !(options.dt > 0.0) {
        return Err(SimError::InvalidArg {
            what: "dt must be positive",
        });
    }
    if options.max_steps == 0 {
        return Err(SimError::InvalidArg {
            what: "max_steps must be positive",
        });
    }
    let cfg = &options.adaptive;
    if !(cfg.rtol >= 0.0 && cfg.atol >= 0.0 && cfg.rtol + cfg.atol > 0.0) {
        return Err(SimError::InvalidArg {
            what: "tolerances must be non-negative and not both zero",
        });
    }
    for &id in problem.solvable() {
        let block = problem.network().block(id)?;
        if block.rate_scaling().is_none() {
            return Err(GraphError::MissingRateScaling {
                block: block.name().to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn integrate_fixed<I: Integrator, M: TransientModel>(
    integrator: &I,
    model: &mut M,
    output_times: &[f64],
    dt: f64,
    max_steps: usize,
) -> SimResult<Vec<M::State>> {
    let mut x = model.initial_state();
    let mut out = vec![x.clone()];
    let mut steps = 0usize;

    for w in output_times.windows(2) {
        let (t0, t1) = (w[0], w[1]);
        let n = ((t1 - t0) / dt).ceil().max(1.0) as usize;
        let h = (t1 - t0) / n as f64;
        for i in 0..n {
            let t = t0 + i as f64 * h;
            steps += 1;
            if steps > max_steps {
                return Err(SimError::IntegrationFailed {
                    t_reached: t,
                    reason: format!("exceeded {max_steps} steps"),
                });
            }
            x = integrator
                .step(model, t, &x, h)
                .map_err(|e| e.reached(t))?;
        }
        out.push(x.clone());
    }
    Ok(out)
}

fn integrate_adaptive<M: TransientModel>(
    model: &mut M,
    output_times: &[f64],
    config: &AdaptiveConfig,
    max_steps: usize,
) -> SimResult<Vec<M::State>> {
    let dp = DormandPrince::new(config.clone());
    let mut t = output_times[0];
    let mut x = model.initial_state();
    let mut out = vec![x.clone()];
    if output_times.len() == 1 {
        return Ok(out);
    }

    let max_step = config.max_step.unwrap_or(f64::INFINITY);
    let mut h = config
        .initial_step
        .unwrap_or(0.01 * (output_times[1] - output_times[0]))
        .min(max_step);
    let mut k1 = model.rhs(t, &x)?;
    let mut steps = 0usize;
    let mut rejected = 0usize;

    for &target in &output_times[1..] {
        while t < target {
            steps += 1;
            if steps > max_steps {
                return Err(SimError::IntegrationFailed {
                    t_reached: t,
                    reason: format!("exceeded {max_steps} steps"),
                });
            }
            if h < config.min_step {
                warn!(t, h, "step size underflow");
                return Err(SimError::IntegrationFailed {
                    t_reached: t,
                    reason: format!("step size {h:e} below minimum {:e}", config.min_step),
                });
            }

            let remaining = target - t;
            let lands = h >= remaining;
            let h_try = if lands { remaining } else { h };
            let attempt = dp
                .attempt(model, t, &x, &k1, h_try)
                .map_err(|e| e.reached(t))?;
            let factor = dp.step_factor(attempt.error);

            if attempt.error <= 1.0 {
                t = if lands { target } else { t + h_try };
                x = attempt.x;
                k1 = attempt.k_last;
                // a step clipped to land on an output keeps the larger proposal
                h = (h_try * factor).max(if lands { h } else { 0.0 }).min(max_step);
            } else {
                rejected += 1;
                debug!(t, h = h_try, error = attempt.error, "step rejected");
                h = h_try * factor;
            }
        }
        out.push(x.clone());
    }
    debug!(steps, rejected, "adaptive integration complete");
    Ok(out)
}
