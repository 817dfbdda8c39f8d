//! Finite-difference Jacobians of a residual function.

use nalgebra::{DMatrix, DVector};

use crate::error::{SolverError, SolverResult};

/// Step used for the Newton Jacobian.
pub const DEFAULT_FORWARD_EPS: f64 = 1e-7;
/// Step used for the sensitivity Jacobian.
pub const DEFAULT_CENTRAL_EPS: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifferenceScheme {
    /// `(f(x + h) - f(x)) / h`, one extra evaluation per column.
    #[default]
    Forward,
    /// `(f(x + h) - f(x - h)) / 2h`, two evaluations per column.
    Central,
}

/// Jacobian of `f` at `x`.
///
/// Column `j` is perturbed by `epsilon * max(|x_j|, 1)` so that large
/// states (kelvin-scale temperatures) and near-zero states both get a
/// usable step.
pub fn difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
    scheme: DifferenceScheme,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    if !(epsilon > 0.0) {
        return Err(SolverError::Numeric {
            what: format!("finite-difference step must be positive, got {epsilon}"),
        });
    }
    let f_x = match scheme {
        DifferenceScheme::Forward => Some(f(x)?),
        DifferenceScheme::Central => None,
    };

    let mut jac: Option<DMatrix<f64>> = None;
    let mut probe = x.clone();
    for j in 0..x.len() {
        let h = epsilon * x[j].abs().max(1.0);
        let column = match &f_x {
            Some(base) => {
                probe[j] = x[j] + h;
                let ahead = f(&probe)?;
                check_len(&ahead, base.len())?;
                (ahead - base) / h
            }
            None => {
                probe[j] = x[j] + h;
                let ahead = f(&probe)?;
                probe[j] = x[j] - h;
                let behind = f(&probe)?;
                check_len(&behind, ahead.len())?;
                (ahead - behind) / (2.0 * h)
            }
        };
        probe[j] = x[j];

        let m = jac.get_or_insert_with(|| DMatrix::zeros(column.len(), x.len()));
        check_len(&column, m.nrows())?;
        m.set_column(j, &column);
    }

    match jac {
        Some(m) => Ok(m),
        None => {
            let rows = match f_x {
                Some(base) => base.len(),
                None => f(x)?.len(),
            };
            Ok(DMatrix::zeros(rows, 0))
        }
    }
}

pub fn forward_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    difference_jacobian(x, f, epsilon, DifferenceScheme::Forward)
}

pub fn central_difference_jacobian<F>(
    x: &DVector<f64>,
    f: F,
    epsilon: f64,
) -> SolverResult<DMatrix<f64>>
where
    F: Fn(&DVector<f64>) -> SolverResult<DVector<f64>>,
{
    difference_jacobian(x, f, epsilon, DifferenceScheme::Central)
}

fn check_len(v: &DVector<f64>, expected: usize) -> SolverResult<()> {
    if v.len() == expected {
        Ok(())
    } else {
        Err(SolverError::InvalidState {
            what: format!("residual length changed from {expected} to {}", v.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn field(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        // f0 = x0^2 * x1, f1 = 3 x0 + sin(x1)
        Ok(DVector::from_vec(vec![
            x[0] * x[0] * x[1],
            3.0 * x[0] + x[1].sin(),
        ]))
    }

    fn analytic(x: &DVector<f64>) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 2, &[2.0 * x[0] * x[1], x[0] * x[0], 3.0, x[1].cos()])
    }

    #[test]
    fn forward_matches_analytic() {
        let x = DVector::from_vec(vec![1.5, -0.7]);
        let jac = forward_difference_jacobian(&x, field, DEFAULT_FORWARD_EPS).unwrap();
        let exact = analytic(&x);
        for (a, b) in jac.iter().zip(exact.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5, max_relative = 1e-5);
        }
    }

    #[test]
    fn central_is_tighter_than_forward() {
        let x = DVector::from_vec(vec![2.0, 0.3]);
        let exact = analytic(&x);
        let central = central_difference_jacobian(&x, field, 1e-4).unwrap();
        let forward = forward_difference_jacobian(&x, field, 1e-4).unwrap();
        assert!((central - &exact).norm() < (forward - &exact).norm());
    }

    #[test]
    fn rectangular_shape() {
        let f = |x: &DVector<f64>| -> SolverResult<DVector<f64>> {
            Ok(DVector::from_vec(vec![x[0], x[0] + x[1], 2.0 * x[1]]))
        };
        let jac = central_difference_jacobian(&DVector::zeros(2), f, 1e-6).unwrap();
        assert_eq!(jac.shape(), (3, 2));
        assert_relative_eq!(jac[(2, 1)], 2.0, epsilon = 1e-8);
    }

    #[test]
    fn rejects_non_positive_step() {
        let x = DVector::from_element(1, 1.0);
        assert!(forward_difference_jacobian(&x, field_1d, 0.0).is_err());
    }

    fn field_1d(x: &DVector<f64>) -> SolverResult<DVector<f64>> {
        Ok(x.clone())
    }
}
