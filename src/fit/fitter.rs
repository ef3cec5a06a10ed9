//! Low-level fitting for a single candidate family.
//!
//! Given `(x_i, y_i)` pairs and a family, we produce the best parameter
//! vector and its error metrics, or nothing if the family cannot represent
//! the data finitely.
//!
//! Strategy:
//! - The proportionality family gets a ratio shortcut: if every
//!   `y_i / x_i` agrees with the first ratio within 1% relative tolerance,
//!   the mean ratio is accepted directly (exact for this family) and scored
//!   with the same MSE/R² as everything else.
//! - Fully linear families (affine, quadratic, logarithmic) are one SVD
//!   least-squares solve.
//! - Families with a nonlinear shape parameter (exponential `b`, power-law
//!   `b`, rational `c`) are calibrated by grid search over the shape value:
//!   each grid point pins the shape, the remaining coefficients are solved by
//!   least squares, and the bracket is shrunk around the best point for a
//!   fixed number of refinement rounds. This bounds the iteration budget and
//!   keeps the result deterministic.

use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::domain::{CandidateModel, FamilyKind};
use crate::fit::family::{
    assemble_params, fill_design_row, linear_param_count, predict, shape_bracket,
};
use crate::math::solve_least_squares;

/// Grid points per refinement round for shape-parameter search.
const SHAPE_GRID_POINTS: usize = 65;
/// Number of bracket-shrinking rounds (bounded iteration budget).
const SHAPE_REFINE_ROUNDS: usize = 6;

/// Relative tolerance for the proportionality ratio shortcut.
const RATIO_RTOL: f64 = 0.01;
const RATIO_ATOL: f64 = 1e-8;

/// Fit one family. `None` means the family is dropped from consideration
/// (domain violation, no finite solve, or non-finite metrics), never fatal
/// to the overall selection.
pub fn fit_family(family: FamilyKind, pairs: &[(f64, f64)]) -> Option<CandidateModel> {
    if pairs.is_empty() {
        return None;
    }
    if family.requires_positive_x() && pairs.iter().any(|&(x, _)| x <= 0.0) {
        return None;
    }

    if family == FamilyKind::Proportional {
        if let Some(model) = fit_proportional_by_ratio(pairs) {
            return Some(model);
        }
    }

    let xs: Vec<f64> = pairs.iter().map(|&(x, _)| x).collect();
    let params = match shape_bracket(family, &xs) {
        None => {
            let betas = solve_pinned(family, pairs, None)?;
            assemble_params(family, &betas, None)
        }
        Some(bracket) => search_shape(family, pairs, bracket.lo, bracket.hi)?,
    };

    finish(family, params, pairs)
}

/// Ratio shortcut for `y = a·x`: accept the mean ratio when all per-pair
/// ratios agree with the first within tolerance.
fn fit_proportional_by_ratio(pairs: &[(f64, f64)]) -> Option<CandidateModel> {
    let mut ratios = Vec::with_capacity(pairs.len());
    for &(x, y) in pairs {
        if x == 0.0 {
            return None;
        }
        let r = y / x;
        if !r.is_finite() {
            return None;
        }
        ratios.push(r);
    }

    let r0 = ratios[0];
    let close = ratios
        .iter()
        .all(|&r| (r - r0).abs() <= RATIO_ATOL + RATIO_RTOL * r0.abs());
    if !close {
        return None;
    }

    let a = ratios.iter().sum::<f64>() / ratios.len() as f64;
    finish(FamilyKind::Proportional, vec![a], pairs)
}

/// Solve the linear coefficients with the shape parameter pinned.
fn solve_pinned(family: FamilyKind, pairs: &[(f64, f64)], shape: Option<f64>) -> Option<Vec<f64>> {
    let n = pairs.len();
    let p = linear_param_count(family);

    let mut design = DMatrix::<f64>::zeros(n, p);
    let mut obs = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];

    for (i, &(x, y)) in pairs.iter().enumerate() {
        if !fill_design_row(family, x, shape, &mut row) {
            return None;
        }
        for j in 0..p {
            design[(i, j)] = row[j];
        }
        obs[i] = y;
    }

    let beta = solve_least_squares(&design, &obs)?;
    Some(beta.iter().copied().collect())
}

/// Grid search over the shape parameter with bracket refinement.
///
/// Each round evaluates the grid in parallel; selection is by minimum SSE
/// with ties broken by the lower grid index, so the result does not depend
/// on evaluation order.
fn search_shape(
    family: FamilyKind,
    pairs: &[(f64, f64)],
    mut lo: f64,
    mut hi: f64,
) -> Option<Vec<f64>> {
    let mut best: Option<(f64, Vec<f64>)> = None;

    for _ in 0..SHAPE_REFINE_ROUNDS {
        let step = (hi - lo) / (SHAPE_GRID_POINTS - 1) as f64;
        let grid: Vec<f64> = (0..SHAPE_GRID_POINTS)
            .map(|i| lo + step * i as f64)
            .collect();

        let candidates: Vec<(usize, f64, Vec<f64>, f64)> = grid
            .par_iter()
            .enumerate()
            .filter_map(|(idx, &shape)| {
                let betas = solve_pinned(family, pairs, Some(shape))?;
                let params = assemble_params(family, &betas, Some(shape));
                let sse = sse_of(family, &params, pairs)?;
                Some((idx, shape, params, sse))
            })
            .collect();

        let round_best = candidates.iter().fold(None::<&(usize, f64, Vec<f64>, f64)>, |acc, c| {
            match acc {
                None => Some(c),
                Some(b) if c.3 < b.3 || (c.3 == b.3 && c.0 < b.0) => Some(c),
                Some(b) => Some(b),
            }
        })?;

        let (_, shape, params, sse) = round_best.clone();
        if best.as_ref().is_none_or(|(s, _)| sse < *s) {
            best = Some((sse, params));
        }

        // Shrink the bracket to one grid step either side of the winner.
        lo = shape - step;
        hi = shape + step;
    }

    best.map(|(_, params)| params)
}

fn sse_of(family: FamilyKind, params: &[f64], pairs: &[(f64, f64)]) -> Option<f64> {
    let mut sse = 0.0;
    for &(x, y) in pairs {
        let y_fit = predict(family, x, params);
        if !y_fit.is_finite() {
            return None;
        }
        let r = y - y_fit;
        sse += r * r;
    }
    sse.is_finite().then_some(sse)
}

/// Score the parameter vector and build the candidate, dropping non-finite
/// outcomes.
fn finish(family: FamilyKind, params: Vec<f64>, pairs: &[(f64, f64)]) -> Option<CandidateModel> {
    if params.iter().any(|p| !p.is_finite()) {
        return None;
    }

    let n = pairs.len() as f64;
    let sse = sse_of(family, &params, pairs)?;
    let mse = sse / n;

    let y_mean = pairs.iter().map(|&(_, y)| y).sum::<f64>() / n;
    let ss_tot = pairs
        .iter()
        .map(|&(_, y)| (y - y_mean) * (y - y_mean))
        .sum::<f64>();
    // Constant-target sets have zero total variance; clamp so R² stays finite.
    let r2 = 1.0 - sse / ss_tot.max(1e-12);

    if !(mse.is_finite() && r2.is_finite()) {
        return None;
    }

    Some(CandidateModel {
        family,
        params,
        mse,
        r2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_shortcut_recovers_exact_ratio() {
        let pairs = vec![(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)];
        let model = fit_family(FamilyKind::Proportional, &pairs).unwrap();
        assert!((model.params[0] - 2.0).abs() < 1e-12);
        assert!(model.mse < 1e-12);
        assert!(model.r2 > 0.999);
    }

    #[test]
    fn proportional_falls_back_to_least_squares_on_noisy_ratios() {
        // Ratios 2.0, 2.2, 1.9 differ by more than 1%; the shortcut must not
        // fire, but the general solve still produces a candidate.
        let pairs = vec![(1.0, 2.0), (2.0, 4.4), (3.0, 5.7)];
        let model = fit_family(FamilyKind::Proportional, &pairs).unwrap();
        assert!(model.params[0].is_finite());
        assert!(model.mse > 0.0);
    }

    #[test]
    fn affine_fit_is_exact_on_affine_data() {
        let pairs: Vec<(f64, f64)> = (0..6).map(|i| (i as f64, 3.0 * i as f64 - 1.5)).collect();
        let model = fit_family(FamilyKind::Affine, &pairs).unwrap();
        assert!((model.params[0] - 3.0).abs() < 1e-9);
        assert!((model.params[1] + 1.5).abs() < 1e-9);
        assert!(model.r2 >= 0.999);
    }

    #[test]
    fn quadratic_fit_recovers_coefficients() {
        let pairs: Vec<(f64, f64)> = (-3..4)
            .map(|i| {
                let x = i as f64;
                (x, 2.0 * x * x - x + 0.5)
            })
            .collect();
        let model = fit_family(FamilyKind::Quadratic, &pairs).unwrap();
        assert!((model.params[0] - 2.0).abs() < 1e-8);
        assert!((model.params[1] + 1.0).abs() < 1e-8);
        assert!((model.params[2] - 0.5).abs() < 1e-8);
    }

    #[test]
    fn exponential_grid_search_gets_close() {
        let pairs: Vec<(f64, f64)> = (0..8)
            .map(|i| {
                let x = i as f64 * 0.5;
                (x, 1.5 * (0.8 * x).exp())
            })
            .collect();
        let model = fit_family(FamilyKind::Exponential, &pairs).unwrap();
        assert!((model.params[0] - 1.5).abs() < 0.05, "a={}", model.params[0]);
        assert!((model.params[1] - 0.8).abs() < 0.05, "b={}", model.params[1]);
    }

    #[test]
    fn log_family_skipped_for_nonpositive_x() {
        let pairs = vec![(0.0, 1.0), (1.0, 2.0)];
        assert!(fit_family(FamilyKind::Logarithmic, &pairs).is_none());
        assert!(fit_family(FamilyKind::PowerLaw, &pairs).is_none());
    }

    #[test]
    fn logarithmic_fit_recovers_coefficients() {
        let pairs: Vec<(f64, f64)> = (1..8)
            .map(|i| {
                let x = i as f64;
                (x, 2.5 * x.ln() + 1.0)
            })
            .collect();
        let model = fit_family(FamilyKind::Logarithmic, &pairs).unwrap();
        assert!((model.params[0] - 2.5).abs() < 1e-8);
        assert!((model.params[1] - 1.0).abs() < 1e-8);
    }
}
