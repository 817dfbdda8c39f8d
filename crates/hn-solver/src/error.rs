//! Error types for solver operations.

use hn_graph::GraphError;
use nalgebra::DVector;
use thiserror::Error;

/// Errors that can occur while assembling or solving a problem.
#[derive(Error, Debug, Clone)]
pub enum SolverError {
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    #[error(
        "Convergence failed after {iterations} iterations (residual norm {residual_norm:e})"
    )]
    ConvergenceFailed {
        iterations: usize,
        residual_norm: f64,
        /// Best iterate reached, in unknown order.
        last_iterate: DVector<f64>,
    },

    #[error("Invalid state: {what}")]
    InvalidState { what: String },

    #[error("Jacobian is singular")]
    SingularJacobian,

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Numeric error: {what}")]
    Numeric { what: String },
}

pub type SolverResult<T> = Result<T, SolverError>;
