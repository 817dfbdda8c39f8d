//! Steady-state solution and sensitivity analysis for heatnet networks.
//!
//! A [`Problem`] freezes which blocks are unknowns and which are driven by
//! their sources, packs solvable state into a vector and evaluates the
//! network residual. [`solve_steady`] finds a root with damped Newton and a
//! finite-difference Jacobian; the `sensitivity` module propagates input
//! deviations through the Jacobian at the converged state.

pub mod error;
pub mod jacobian;
pub mod newton;
pub mod problem;
pub mod sensitivity;
pub mod steady;

pub use error::{SolverError, SolverResult};
pub use jacobian::{DifferenceScheme, central_difference_jacobian, forward_difference_jacobian};
pub use newton::{NewtonConfig, NewtonResult, newton_solve};
pub use problem::Problem;
pub use sensitivity::{
    Propagation, SensitivityOptions, Uncertainty, propagate, source_row_sigma,
};
pub use steady::{SteadyOptions, SteadySolution, solve_steady};
