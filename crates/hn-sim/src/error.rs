//! Error types for transient simulation.

use hn_solver::SolverError;
use thiserror::Error;

/// Errors encountered during transient simulation.
#[derive(Error, Debug, Clone)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// The integrator could not advance; the state is valid up to `t_reached`.
    #[error("Integration failed at t = {t_reached}: {reason}")]
    IntegrationFailed { t_reached: f64, reason: String },

    /// The model could not be evaluated at `time`; the last accepted state
    /// is at `t_reached`.
    #[error("Evaluation failed at t = {time} (integrated to t = {t_reached}): {source}")]
    Evaluation {
        time: f64,
        t_reached: f64,
        #[source]
        source: SolverError,
    },

    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// Record the furthest accepted time on an evaluation failure.
    pub(crate) fn reached(self, t: f64) -> Self {
        match self {
            SimError::Evaluation { time, source, .. } => SimError::Evaluation {
                time,
                t_reached: t,
                source,
            },
            other => other,
        }
    }
}

impl From<hn_graph::GraphError> for SimError {
    fn from(e: hn_graph::GraphError) -> Self {
        SimError::Solver(e.into())
    }
}
