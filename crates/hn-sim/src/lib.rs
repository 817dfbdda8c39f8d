//! Transient simulation for heatnet problems.
//!
//! Provides:
//! - `TransientModel` trait and `NetworkModel`, the rate form of a `Problem`
//! - Fixed-step RK4 and forward Euler integrators
//! - Adaptive Dormand–Prince 5(4) with error-controlled step size
//! - `solve_transient` over caller-supplied output times, returning a
//!   `Trajectory` with CSV export

pub mod error;
pub mod integrator;
pub mod model;
pub mod transient;

pub use error::{SimError, SimResult};
pub use integrator::{AdaptiveConfig, DormandPrince, ForwardEuler, Integrator, RK4, StepAttempt};
pub use model::{NetworkModel, TransientModel};
pub use transient::{IntegratorType, SimOptions, Trajectory, solve_transient};
