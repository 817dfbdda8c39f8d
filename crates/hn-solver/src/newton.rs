//! Damped Newton iteration with backtracking line search.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::{SolverError, SolverResult};

/// Newton solver configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonConfig {
    /// Maximum iterations
    pub max_iterations: usize,
    /// Absolute tolerance for residual norm
    pub abs_tol: f64,
    /// Relative tolerance for residual norm, against the initial norm
    pub rel_tol: f64,
    /// Line search backtracking factor
    pub line_search_beta: f64,
    /// Maximum line search iterations
    pub max_line_search_iters: usize,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            abs_tol: 1e-9,
            rel_tol: 1e-12,
            line_search_beta: 0.5,
            max_line_search_iters: 30,
        }
    }
}

/// Newton iteration result.
#[derive(Debug, Clone)]
pub struct NewtonResult {
    /// Solution vector
    pub x: DVector<f64>,
    /// Final residual norm
    pub residual_norm: f64,
    /// Number of iterations
    pub iterations: usize,
}

/// Solve `residual_fn(x) = 0` starting from `x0`.
///
/// Each step solves `J dx = -r` by LU and backtracks until the residual
/// norm decreases. A trial point whose residual cannot be evaluated (for
/// instance a material fit leaving its domain) is treated like an increase.
pub fn newton_solve<F, J>(
    x0: DVector<f64>,
    residual_fn: F,
    jacobian_fn: J,
    config: &NewtonConfig,
) -> SolverResult<NewtonResult>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
    J: Fn(&DVector<f64>) -> SolverResult<DMatrix<f64>>,
{
    let mut x = x0;
    let mut r = residual_fn(&x)?;
    let mut r_norm = r.norm();
    let r0_norm = r_norm;
    let converged = |norm: f64| norm <= config.abs_tol || norm <= config.rel_tol * r0_norm;

    for iter in 0..config.max_iterations {
        if converged(r_norm) {
            return Ok(NewtonResult {
                x,
                residual_norm: r_norm,
                iterations: iter,
            });
        }

        let jac = jacobian_fn(&x)?;
        let Some(dx) = jac.lu().solve(&(-&r)) else {
            warn!(iteration = iter, residual_norm = r_norm, "singular Jacobian");
            return Err(SolverError::SingularJacobian);
        };

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..config.max_line_search_iters {
            let trial = &x + alpha * &dx;
            if let Ok(r_trial) = residual_fn(&trial) {
                let norm = r_trial.norm();
                if norm < r_norm {
                    accepted = Some((trial, r_trial, norm));
                    break;
                }
            }
            alpha *= config.line_search_beta;
        }

        let Some((x_new, r_new, norm_new)) = accepted else {
            warn!(iteration = iter, residual_norm = r_norm, "line search stagnated");
            return Err(SolverError::ConvergenceFailed {
                iterations: iter,
                residual_norm: r_norm,
                last_iterate: x,
            });
        };
        debug!(iteration = iter, residual_norm = norm_new, step = alpha, "newton step");
        x = x_new;
        r = r_new;
        r_norm = norm_new;
    }

    if converged(r_norm) {
        return Ok(NewtonResult {
            x,
            residual_norm: r_norm,
            iterations: config.max_iterations,
        });
    }
    warn!(
        iterations = config.max_iterations,
        residual_norm = r_norm,
        "maximum Newton iterations reached"
    );
    Err(SolverError::ConvergenceFailed {
        iterations: config.max_iterations,
        residual_norm: r_norm,
        last_iterate: x,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(DVector::from_element(1, x[0] * x[0] - 4.0))
    }

    fn quadratic_jac(x: &DVector<f64>) -> SolverResult<DMatrix<f64>> {
        Ok(DMatrix::from_element(1, 1, 2.0 * x[0]))
    }

    #[test]
    fn simple_quadratic() {
        let result = newton_solve(
            DVector::from_element(1, 3.0),
            quadratic,
            quadratic_jac,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert!((result.x[0] - 2.0).abs() < 1e-9);
        assert!(result.iterations > 0);
    }

    #[test]
    fn iteration_limit_reports_last_iterate() {
        let config = NewtonConfig {
            max_iterations: 1,
            ..NewtonConfig::default()
        };
        let err = newton_solve(
            DVector::from_element(1, 100.0),
            quadratic,
            quadratic_jac,
            &config,
        )
        .unwrap_err();
        match err {
            SolverError::ConvergenceFailed {
                iterations,
                residual_norm,
                last_iterate,
            } => {
                assert_eq!(iterations, 1);
                assert!(residual_norm > 0.0);
                // one full step from 100 lands near 50
                assert!((last_iterate[0] - 50.02).abs() < 1e-9);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn singular_jacobian_is_reported() {
        let flat = |_: &DVector<f64>| -> SolverResult<DMatrix<f64>> { Ok(DMatrix::zeros(1, 1)) };
        let err = newton_solve(
            DVector::from_element(1, 3.0),
            quadratic,
            flat,
            &NewtonConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SolverError::SingularJacobian));
    }

    #[test]
    fn already_converged_takes_no_steps() {
        let result = newton_solve(
            DVector::from_element(1, 2.0),
            quadratic,
            quadratic_jac,
            &NewtonConfig::default(),
        )
        .unwrap();
        assert_eq!(result.iterations, 0);
    }
}
