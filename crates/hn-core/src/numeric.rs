use crate::HnError;

/// Floating point type used throughout the network.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, HnError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(HnError::NonFinite { what, value: v })
    }
}

/// Evaluate a polynomial with coefficients ordered from the highest power down
/// (Horner form).
pub fn polyval(coeffs: &[Real], x: Real) -> Real {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn polyval_matches_expanded_form() {
        // 2x^2 - 3x + 1 at x = 4
        assert_eq!(polyval(&[2.0, -3.0, 1.0], 4.0), 21.0);
        assert_eq!(polyval(&[1.005], 123.0), 1.005);
        assert_eq!(polyval(&[], 5.0), 0.0);
    }
}
