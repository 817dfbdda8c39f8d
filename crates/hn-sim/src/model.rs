//! TransientModel trait and its network implementation.

use hn_solver::Problem;
use nalgebra::DVector;

use crate::error::{SimError, SimResult};

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Scalar field arithmetic for integration: add states, scale by scalar
/// - A weighted error norm for adaptive step control
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// State at the start of integration.
    fn initial_state(&self) -> Self::State;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Takes &mut self so models can count or cache evaluations.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;

    /// RMS of `error_i / (atol + rtol * max(|x0_i|, |x1_i|))`.
    fn error_norm(
        &self,
        error: &Self::State,
        x0: &Self::State,
        x1: &Self::State,
        atol: f64,
        rtol: f64,
    ) -> f64;
}

/// Rate form of a [`Problem`]: `dx/dt = residual(x, t) / rate scaling`.
#[derive(Debug)]
pub struct NetworkModel<'a> {
    problem: &'a Problem,
    evaluations: usize,
}

impl<'a> NetworkModel<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        Self {
            problem,
            evaluations: 0,
        }
    }

    /// Number of right-hand-side evaluations so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }
}

impl TransientModel for NetworkModel<'_> {
    type State = DVector<f64>;

    fn initial_state(&self) -> DVector<f64> {
        self.problem.pack()
    }

    fn rhs(&mut self, t: f64, x: &DVector<f64>) -> SimResult<DVector<f64>> {
        self.evaluations += 1;
        self.problem
            .rate(x, t)
            .map_err(|source| SimError::Evaluation {
                time: t,
                t_reached: t,
                source,
            })
    }

    fn add(&self, a: &DVector<f64>, b: &DVector<f64>) -> DVector<f64> {
        a + b
    }

    fn scale(&self, a: &DVector<f64>, scale: f64) -> DVector<f64> {
        a * scale
    }

    fn error_norm(
        &self,
        error: &DVector<f64>,
        x0: &DVector<f64>,
        x1: &DVector<f64>,
        atol: f64,
        rtol: f64,
    ) -> f64 {
        if error.is_empty() {
            return 0.0;
        }
        let sum: f64 = error
            .iter()
            .zip(x0.iter().zip(x1.iter()))
            .map(|(e, (a, b))| {
                let w = atol + rtol * a.abs().max(b.abs());
                (e / w).powi(2)
            })
            .sum();
        (sum / error.len() as f64).sqrt()
    }
}
