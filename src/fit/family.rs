//! Family evaluation primitives.
//!
//! The fitter relies on three operations per family:
//! - build a design row for a given `x` (for least squares)
//! - predict `y(x)` given the full parameter vector (for residuals/metrics)
//! - describe the nonlinear shape parameter's search bracket, if the family
//!   has one
//!
//! Every family is linear in its leading coefficients once the shape
//! parameter is pinned:
//!
//! ```text
//! proportional  y = a·x                    basis [x]
//! affine        y = a·x + b                basis [x, 1]
//! quadratic     y = a·x² + b·x + c         basis [x², x, 1]
//! exponential   y = a·e^(b·x)              basis [e^(b·x)]        shape b
//! rational      y = (a·x + b)/(x + c)      basis [x/(x+c), 1/(x+c)] shape c
//! logarithmic   y = a·ln(x) + b            basis [ln x, 1]
//! power law     y = a·x^b                  basis [x^b]            shape b
//! ```

use crate::domain::FamilyKind;

/// Search bracket for a family's nonlinear shape parameter.
#[derive(Debug, Clone, Copy)]
pub struct ShapeBracket {
    pub lo: f64,
    pub hi: f64,
}

/// Number of coefficients solved linearly (design-row width).
pub fn linear_param_count(family: FamilyKind) -> usize {
    match family {
        FamilyKind::Proportional | FamilyKind::Exponential | FamilyKind::PowerLaw => 1,
        FamilyKind::Affine | FamilyKind::Rational | FamilyKind::Logarithmic => 2,
        FamilyKind::Quadratic => 3,
    }
}

/// The shape-parameter bracket, or `None` for fully linear families.
///
/// The rational family's pole offset scales with the data so the bracket
/// always covers poles beyond the observed `x` range.
pub fn shape_bracket(family: FamilyKind, xs: &[f64]) -> Option<ShapeBracket> {
    match family {
        FamilyKind::Exponential | FamilyKind::PowerLaw => {
            Some(ShapeBracket { lo: -10.0, hi: 10.0 })
        }
        FamilyKind::Rational => {
            let span = xs.iter().fold(0.0_f64, |m, &x| m.max(x.abs()));
            let half = 10.0 * span + 10.0;
            Some(ShapeBracket { lo: -half, hi: half })
        }
        FamilyKind::Proportional
        | FamilyKind::Affine
        | FamilyKind::Quadratic
        | FamilyKind::Logarithmic => None,
    }
}

/// Fill a design row for the given family.
///
/// `shape` must be `Some` exactly when [`shape_bracket`] returns one.
///
/// Returns `false` when the row is not representable at this `x`/shape
/// combination (e.g. a rational pole); such rows invalidate the candidate.
pub fn fill_design_row(family: FamilyKind, x: f64, shape: Option<f64>, out: &mut [f64]) -> bool {
    match family {
        FamilyKind::Proportional => {
            out[0] = x;
        }
        FamilyKind::Affine => {
            out[0] = x;
            out[1] = 1.0;
        }
        FamilyKind::Quadratic => {
            out[0] = x * x;
            out[1] = x;
            out[2] = 1.0;
        }
        FamilyKind::Exponential => {
            let b = shape.unwrap_or(0.0);
            out[0] = (b * x).exp();
        }
        FamilyKind::Rational => {
            let c = shape.unwrap_or(0.0);
            let denom = x + c;
            if denom.abs() < 1e-9 {
                return false;
            }
            out[0] = x / denom;
            out[1] = 1.0 / denom;
        }
        FamilyKind::Logarithmic => {
            out[0] = x.ln();
            out[1] = 1.0;
        }
        FamilyKind::PowerLaw => {
            let b = shape.unwrap_or(0.0);
            out[0] = x.powf(b);
        }
    }
    out.iter().take(linear_param_count(family)).all(|v| v.is_finite())
}

/// Assemble the ordered `a, b, c` parameter vector from the linear solve
/// plus the pinned shape parameter.
pub fn assemble_params(family: FamilyKind, betas: &[f64], shape: Option<f64>) -> Vec<f64> {
    match family {
        FamilyKind::Exponential | FamilyKind::PowerLaw => {
            vec![betas[0], shape.unwrap_or(0.0)]
        }
        FamilyKind::Rational => vec![betas[0], betas[1], shape.unwrap_or(0.0)],
        FamilyKind::Proportional
        | FamilyKind::Affine
        | FamilyKind::Quadratic
        | FamilyKind::Logarithmic => betas.to_vec(),
    }
}

/// Predict `y(x)` for the given family and full parameter vector.
pub fn predict(family: FamilyKind, x: f64, params: &[f64]) -> f64 {
    match family {
        FamilyKind::Proportional => params[0] * x,
        FamilyKind::Affine => params[0] * x + params[1],
        FamilyKind::Quadratic => params[0] * x * x + params[1] * x + params[2],
        FamilyKind::Exponential => params[0] * (params[1] * x).exp(),
        FamilyKind::Rational => (params[0] * x + params[1]) / (x + params[2]),
        FamilyKind::Logarithmic => params[0] * x.ln() + params[1],
        FamilyKind::PowerLaw => params[0] * x.powf(params[1]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_matches_design_row_for_linear_families() {
        let mut row = [0.0; 3];
        assert!(fill_design_row(FamilyKind::Quadratic, 2.0, None, &mut row));
        let params = [1.5, -2.0, 0.5];
        let via_row: f64 = row.iter().zip(params.iter()).map(|(r, p)| r * p).sum();
        assert!((via_row - predict(FamilyKind::Quadratic, 2.0, &params)).abs() < 1e-12);
    }

    #[test]
    fn rational_pole_is_rejected() {
        let mut row = [0.0; 2];
        assert!(!fill_design_row(FamilyKind::Rational, 2.0, Some(-2.0), &mut row));
    }

    #[test]
    fn param_counts_line_up() {
        for family in FamilyKind::ALL {
            let shape = usize::from(shape_bracket(family, &[1.0]).is_some());
            assert_eq!(linear_param_count(family) + shape, family.param_count());
        }
    }
}
