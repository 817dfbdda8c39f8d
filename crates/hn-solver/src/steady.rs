//! Steady-state solve.

use nalgebra::DVector;
use tracing::{info, warn};

use crate::error::SolverResult;
use crate::jacobian::{DEFAULT_FORWARD_EPS, forward_difference_jacobian};
use crate::newton::{NewtonConfig, newton_solve};
use crate::problem::Problem;

/// Options for [`solve_steady`].
#[derive(Debug, Clone, PartialEq)]
pub struct SteadyOptions {
    pub newton: NewtonConfig,
    /// Time at which boundaries are driven; `None` keeps the problem's time.
    pub time: Option<f64>,
    /// Relative finite-difference step for the Newton Jacobian.
    pub jacobian_epsilon: f64,
}

impl Default for SteadyOptions {
    fn default() -> Self {
        Self {
            newton: NewtonConfig::default(),
            time: None,
            jacobian_epsilon: DEFAULT_FORWARD_EPS,
        }
    }
}

/// Converged unknown vector and convergence info.
#[derive(Clone, Debug)]
pub struct SteadySolution {
    pub x: DVector<f64>,
    pub residual_norm: f64,
    pub iterations: usize,
    pub time: f64,
}

/// Solve `residual(x, t) = 0` from the current block state and commit the
/// result into the blocks.
///
/// On failure nothing is committed; the error carries the last iterate so a
/// driver can retry from it.
pub fn solve_steady(problem: &mut Problem, options: &SteadyOptions) -> SolverResult<SteadySolution> {
    let t = options.time.unwrap_or(problem.time());
    let x0 = problem.pack();

    let result = {
        let p: &Problem = problem;
        let residual_fn = |x: &DVector<f64>| p.residual(x, t);
        let jacobian_fn = |x: &DVector<f64>| {
            forward_difference_jacobian(x, residual_fn, options.jacobian_epsilon)
        };
        newton_solve(x0, residual_fn, jacobian_fn, &options.newton)
    };

    match result {
        Ok(r) => {
            problem.commit(&r.x, t)?;
            info!(
                unknowns = r.x.len(),
                iterations = r.iterations,
                residual_norm = r.residual_norm,
                "steady solve converged"
            );
            Ok(SteadySolution {
                x: r.x,
                residual_norm: r.residual_norm,
                iterations: r.iterations,
                time: t,
            })
        }
        Err(e) => {
            warn!(error = %e, "steady solve failed");
            Err(e)
        }
    }
}

impl Problem {
    /// Steady solve with default options.
    pub fn solve(&mut self) -> SolverResult<SteadySolution> {
        solve_steady(self, &SteadyOptions::default())
    }
}
