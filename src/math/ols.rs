//! Least squares line fitting.
//!
//! Counter trends are fitted as `hours = a + b * days`, where `days` is elapsed
//! time since the first usable reading. The slope `b` is the accrual rate.
//!
//! Implementation choices:
//! - We solve the tall system with SVD so that nearly collinear inputs (all
//!   readings bunched in a few days) degrade gracefully instead of panicking.
//! - Inputs are centred before solving, which keeps the design matrix well
//!   conditioned when `days` spans several years.

use nalgebra::{DMatrix, DVector};

/// Intercept and slope of a fitted line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub intercept: f64,
    pub slope: f64,
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Ordinary least squares fit of `y` against `x`.
///
/// Returns `None` for fewer than two points, mismatched lengths, or when all
/// `x` values coincide.
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LineFit> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }

    let x_mean = x.iter().sum::<f64>() / n as f64;
    let y_mean = y.iter().sum::<f64>() / n as f64;
    if x.iter().all(|v| (v - x_mean).abs() < 1e-12) {
        return None;
    }

    let mut design = DMatrix::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi - x_mean;
    }
    let rhs = DVector::from_iterator(n, y.iter().map(|v| v - y_mean));

    let beta = solve_least_squares(&design, &rhs)?;
    let slope = beta[1];
    let intercept = y_mean + beta[0] - slope * x_mean;
    if !(slope.is_finite() && intercept.is_finite()) {
        return None;
    }
    Some(LineFit { intercept, slope })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn fit_line_recovers_slope_over_years() {
        let x = [0.0, 365.0, 730.0, 1095.0];
        let y: Vec<f64> = x.iter().map(|d| 10_000.0 + 16.0 * d).collect();

        let fit = fit_line(&x, &y).unwrap();
        assert!((fit.slope - 16.0).abs() < 1e-9);
        assert!((fit.intercept - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn fit_line_rejects_degenerate_input() {
        assert!(fit_line(&[1.0], &[5.0]).is_none());
        assert!(fit_line(&[3.0, 3.0], &[5.0, 9.0]).is_none());
        assert!(fit_line(&[0.0, 1.0], &[5.0]).is_none());
    }
}
