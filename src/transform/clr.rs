//! Centred Log-Ratio (CLR) transformation for compositional data.

use super::{check_nonempty, check_positive, exp_rows_stable};
use crate::closure::close;
use crate::error::{CodaError, Result};
use crate::tolerance;
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{debug, trace};

/// Geometric mean of each row (sample).
///
/// Computed as `exp(mean(log(x)))`. All parts must be positive.
pub fn geometric_means(data: &DMatrix<f64>) -> Result<Vec<f64>> {
    check_nonempty(data, "geometric mean")?;
    check_positive(data, "geometric mean")?;
    Ok(mean_logs(data).into_iter().map(f64::exp).collect())
}

fn mean_logs(data: &DMatrix<f64>) -> Vec<f64> {
    let n_parts = data.ncols() as f64;
    (0..data.nrows())
        .into_par_iter()
        .map(|i| data.row(i).iter().map(|x| x.ln()).sum::<f64>() / n_parts)
        .collect()
}

/// Apply the Centred Log-Ratio (CLR) transformation.
///
/// # Formula
/// For sample i: CLR(x_ij) = log(x_ij) - mean_j(log(x_ij)) = log(x_ij / g_i)
///
/// where g_i is the geometric mean of sample i. Each output row sums to zero.
///
/// # Errors
/// `NonPositive` if any part is zero, negative or NaN.
pub fn clr(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_nonempty(data, "CLR")?;
    check_positive(data, "CLR")?;

    let (n_rows, n_parts) = data.shape();
    let log_means = mean_logs(data);

    let mut coords = DMatrix::zeros(n_rows, n_parts);
    for i in 0..n_rows {
        for j in 0..n_parts {
            coords[(i, j)] = data[(i, j)].ln() - log_means[i];
        }
    }

    check_centred(&coords)?;
    debug!(n_rows, n_parts, "applied CLR");
    Ok(coords)
}

/// Inverse CLR: exponentiate and close to 1.
pub fn inv_clr(coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    check_nonempty(coords, "inverse CLR")?;
    close(&exp_rows_stable(coords))
}

/// Aitchison distance between two compositions of equal length.
///
/// This is the Euclidean distance between their CLR coordinates.
pub fn aitchison_distance(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(CodaError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    let mut pair = DMatrix::zeros(2, a.len());
    for j in 0..a.len() {
        pair[(0, j)] = a[j];
        pair[(1, j)] = b[j];
    }
    let coords = clr(&pair)?;
    let squared: f64 = (0..a.len())
        .map(|j| (coords[(0, j)] - coords[(1, j)]).powi(2))
        .sum();
    Ok(squared.sqrt())
}

fn check_centred(coords: &DMatrix<f64>) -> Result<()> {
    for i in 0..coords.nrows() {
        let row = coords.row(i);
        let residual: f64 = row.sum();
        let scale: f64 = row.iter().map(|x| x.abs()).sum();
        if !tolerance::within(residual, scale, tolerance::CLR_CENTRING) {
            return Err(CodaError::InvariantViolated(format!(
                "CLR row {} sums to {} instead of 0",
                i, residual
            )));
        }
        trace!(row = i, residual, "CLR centring residual");
    }
    Ok(())
}
