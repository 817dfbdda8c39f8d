//! Local sensitivity and uncertainty propagation through the steady
//! residual Jacobian.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};
use crate::jacobian::{DEFAULT_CENTRAL_EPS, central_difference_jacobian};
use crate::problem::Problem;

/// How input deviations are combined into a state covariance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Propagation {
    /// `delta = J^-1 u`, covariance `delta delta^T`: all inputs deviate
    /// together (fully correlated).
    #[default]
    Correlated,
    /// `J^-1 diag(u^2) J^-T`: independent inputs.
    Independent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensitivityOptions {
    pub epsilon: f64,
    pub propagation: Propagation,
}

impl Default for SensitivityOptions {
    fn default() -> Self {
        Self {
            epsilon: DEFAULT_CENTRAL_EPS,
            propagation: Propagation::Correlated,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Uncertainty {
    /// State shift `J^-1 u`.
    pub delta: DVector<f64>,
    pub covariance: DMatrix<f64>,
    /// `sqrt(diag(covariance))`, one entry per unknown.
    pub std_dev: DVector<f64>,
}

/// Central-difference Jacobian of the residual at the committed state.
pub fn jacobian_at_state(problem: &Problem, epsilon: f64) -> SolverResult<DMatrix<f64>> {
    let t = problem.time();
    central_difference_jacobian(&problem.pack(), |x| problem.residual(x, t), epsilon)
}

/// Propagate per-row residual deviations `sigma` through `jacobian`.
pub fn propagate(
    jacobian: &DMatrix<f64>,
    sigma: &DVector<f64>,
    propagation: Propagation,
) -> SolverResult<Uncertainty> {
    if !jacobian.is_square() || jacobian.nrows() != sigma.len() {
        return Err(SolverError::InvalidState {
            what: format!(
                "jacobian is {}x{} but {} deviations were given",
                jacobian.nrows(),
                jacobian.ncols(),
                sigma.len()
            ),
        });
    }
    let inverse = jacobian
        .clone()
        .try_inverse()
        .ok_or(SolverError::SingularJacobian)?;
    let delta = &inverse * sigma;
    let covariance = match propagation {
        Propagation::Correlated => &delta * delta.transpose(),
        Propagation::Independent => {
            let variances = DMatrix::from_diagonal(&sigma.map(|s| s * s));
            &inverse * variances * inverse.transpose()
        }
    };
    let std_dev = covariance.diagonal().map(|v| v.max(0.0).sqrt());
    Ok(Uncertainty {
        delta,
        covariance,
        std_dev,
    })
}

/// Deviation vector with `sigma` on every source-bearing unknown and zero
/// elsewhere.
pub fn source_row_sigma(problem: &Problem, sigma: f64) -> DVector<f64> {
    let mut u = DVector::zeros(problem.len());
    for row in problem.source_bearing_rows() {
        u[row] = sigma;
    }
    u
}

impl Problem {
    /// Residual Jacobian at the committed state.
    pub fn jacobian(&self) -> SolverResult<DMatrix<f64>> {
        jacobian_at_state(self, DEFAULT_CENTRAL_EPS)
    }

    /// Uncertainty of the committed (normally converged) state given
    /// residual deviations `sigma`.
    pub fn uncertainty(
        &self,
        sigma: &DVector<f64>,
        options: &SensitivityOptions,
    ) -> SolverResult<Uncertainty> {
        let jac = jacobian_at_state(self, options.epsilon)?;
        propagate(&jac, sigma, options.propagation)
    }
}
