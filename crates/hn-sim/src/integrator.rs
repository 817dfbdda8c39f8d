//! Time integrators: fixed-step RK4 and forward Euler, adaptive
//! Dormand–Prince 5(4).

use crate::error::SimResult;
use crate::model::TransientModel;

/// Trait for fixed-step time integrators.
pub trait Integrator {
    /// Advance state by one time step using the transient model.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// `x + h * sum(c_i * k_i)`, skipping zero coefficients.
fn combine<M: TransientModel>(
    model: &M,
    x: &M::State,
    h: f64,
    terms: &[(f64, &M::State)],
) -> M::State {
    terms.iter().fold(x.clone(), |acc, (c, k)| {
        if *c == 0.0 {
            acc
        } else {
            model.add(&acc, &model.scale(k, h * c))
        }
    })
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;
        let x2 = combine(model, x, dt, &[(0.5, &k1)]);
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;
        let x3 = combine(model, x, dt, &[(0.5, &k2)]);
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;
        let x4 = combine(model, x, dt, &[(1.0, &k3)]);
        let k4 = model.rhs(t + dt, &x4)?;

        Ok(combine(
            model,
            x,
            dt / 6.0,
            &[(1.0, &k1), (2.0, &k2), (2.0, &k3), (1.0, &k4)],
        ))
    }
}

/// Forward Euler (explicit, 1st order, fast for testing).
/// Calls rhs() once per step instead of 4 times (RK4).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(combine(model, x, dt, &[(1.0, &xdot)]))
    }
}

/// Step-size control for [`DormandPrince`].
#[derive(Clone, Debug, PartialEq)]
pub struct AdaptiveConfig {
    pub rtol: f64,
    pub atol: f64,
    /// First trial step; `None` picks 1% of the first output interval.
    pub initial_step: Option<f64>,
    pub min_step: f64,
    pub max_step: Option<f64>,
    pub safety: f64,
    pub min_factor: f64,
    pub max_factor: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-6,
            atol: 1e-9,
            initial_step: None,
            min_step: 1e-12,
            max_step: None,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 5.0,
        }
    }
}

/// Outcome of one embedded step attempt.
#[derive(Clone, Debug)]
pub struct StepAttempt<S> {
    /// Fifth-order solution at `t + h`.
    pub x: S,
    /// Derivative at `(t + h, x)`, reusable as the next first stage.
    pub k_last: S,
    /// Weighted error norm; the step is acceptable when `<= 1`.
    pub error: f64,
}

/// Dormand–Prince 5(4) embedded Runge–Kutta pair with FSAL.
#[derive(Clone, Debug, Default)]
pub struct DormandPrince {
    pub config: AdaptiveConfig,
}

const C: [f64; 6] = [1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];
const A2: [f64; 1] = [1.0 / 5.0];
const A3: [f64; 2] = [3.0 / 40.0, 9.0 / 40.0];
const A4: [f64; 3] = [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0];
const A5: [f64; 4] = [
    19372.0 / 6561.0,
    -25360.0 / 2187.0,
    64448.0 / 6561.0,
    -212.0 / 729.0,
];
const A6: [f64; 5] = [
    9017.0 / 3168.0,
    -355.0 / 33.0,
    46732.0 / 5247.0,
    49.0 / 176.0,
    -5103.0 / 18656.0,
];
/// Fifth-order weights (also the last stage's row).
const B: [f64; 6] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
];
/// Fifth- minus fourth-order weights, seven stages.
const E: [f64; 7] = [
    71.0 / 57600.0,
    0.0,
    -71.0 / 16695.0,
    71.0 / 1920.0,
    -17253.0 / 339200.0,
    22.0 / 525.0,
    -1.0 / 40.0,
];

impl DormandPrince {
    pub fn new(config: AdaptiveConfig) -> Self {
        Self { config }
    }

    /// Attempt a step of size `h` from `(t, x)` with first stage `k1`.
    pub fn attempt<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        k1: &M::State,
        h: f64,
    ) -> SimResult<StepAttempt<M::State>> {
        let x2 = combine(model, x, h, &[(A2[0], k1)]);
        let k2 = model.rhs(t + C[0] * h, &x2)?;
        let x3 = combine(model, x, h, &[(A3[0], k1), (A3[1], &k2)]);
        let k3 = model.rhs(t + C[1] * h, &x3)?;
        let x4 = combine(model, x, h, &[(A4[0], k1), (A4[1], &k2), (A4[2], &k3)]);
        let k4 = model.rhs(t + C[2] * h, &x4)?;
        let x5 = combine(
            model,
            x,
            h,
            &[(A5[0], k1), (A5[1], &k2), (A5[2], &k3), (A5[3], &k4)],
        );
        let k5 = model.rhs(t + C[3] * h, &x5)?;
        let x6 = combine(
            model,
            x,
            h,
            &[
                (A6[0], k1),
                (A6[1], &k2),
                (A6[2], &k3),
                (A6[3], &k4),
                (A6[4], &k5),
            ],
        );
        let k6 = model.rhs(t + C[4] * h, &x6)?;
        let x_new = combine(
            model,
            x,
            h,
            &[
                (B[0], k1),
                (B[1], &k2),
                (B[2], &k3),
                (B[3], &k4),
                (B[4], &k5),
                (B[5], &k6),
            ],
        );
        let k7 = model.rhs(t + C[5] * h, &x_new)?;

        let zero = model.scale(x, 0.0);
        let error_vec = combine(
            model,
            &zero,
            h,
            &[
                (E[0], k1),
                (E[1], &k2),
                (E[2], &k3),
                (E[3], &k4),
                (E[4], &k5),
                (E[5], &k6),
                (E[6], &k7),
            ],
        );
        let error = model.error_norm(&error_vec, x, &x_new, self.config.atol, self.config.rtol);

        Ok(StepAttempt {
            x: x_new,
            k_last: k7,
            error,
        })
    }

    /// Factor to multiply `h` by after an attempt with the given error.
    pub fn step_factor(&self, error: f64) -> f64 {
        let cfg = &self.config;
        if !error.is_finite() {
            return cfg.min_factor;
        }
        if error == 0.0 {
            return cfg.max_factor;
        }
        (cfg.safety * error.powf(-0.2)).clamp(cfg.min_factor, cfg.max_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimResult;

    /// dx/dt = -x, one scalar.
    struct Decay;

    impl TransientModel for Decay {
        type State = f64;

        fn initial_state(&self) -> f64 {
            1.0
        }

        fn rhs(&mut self, _t: f64, x: &f64) -> SimResult<f64> {
            Ok(-x)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }

        fn error_norm(&self, e: &f64, x0: &f64, x1: &f64, atol: f64, rtol: f64) -> f64 {
            (e / (atol + rtol * x0.abs().max(x1.abs()))).abs()
        }
    }

    #[test]
    fn rk4_is_fourth_order_accurate() {
        let mut m = Decay;
        let mut x = 1.0;
        let dt = 0.1;
        for i in 0..10 {
            x = RK4.step(&mut m, i as f64 * dt, &x, dt).unwrap();
        }
        assert!((x - (-1.0f64).exp()).abs() < 1e-6);
    }

    #[test]
    fn forward_euler_matches_closed_form() {
        let mut m = Decay;
        let x = ForwardEuler.step(&mut m, 0.0, &1.0, 0.1).unwrap();
        assert!((x - 0.9).abs() < 1e-15);
    }

    #[test]
    fn dormand_prince_single_step_is_fifth_order() {
        let mut m = Decay;
        let dp = DormandPrince::default();
        let h = 0.1;
        let attempt = dp.attempt(&mut m, 0.0, &1.0, &-1.0, h).unwrap();
        assert!((attempt.x - (-h).exp()).abs() < 1e-8);
        // FSAL: last stage is the derivative at the new point
        assert!((attempt.k_last + attempt.x).abs() < 1e-15);
        assert!(attempt.error.is_finite());
    }

    #[test]
    fn error_estimate_shrinks_with_step() {
        let mut m = Decay;
        let dp = DormandPrince::default();
        let big = dp.attempt(&mut m, 0.0, &1.0, &-1.0, 0.5).unwrap().error;
        let small = dp.attempt(&mut m, 0.0, &1.0, &-1.0, 0.05).unwrap().error;
        assert!(small < big);
    }

    #[test]
    fn step_factor_is_clamped() {
        let dp = DormandPrince::default();
        assert_eq!(dp.step_factor(0.0), 5.0);
        assert_eq!(dp.step_factor(f64::NAN), 0.2);
        assert_eq!(dp.step_factor(1e12), 0.2);
        let f = dp.step_factor(1.0);
        assert!((f - 0.9).abs() < 1e-12);
    }
}
