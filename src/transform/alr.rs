//! Additive Log-Ratio (ALR) transformation for compositional data.
//!
//! ALR takes the log-ratio of each part relative to a reference part. The
//! reference is dropped from the output, so a D-part composition maps to
//! D-1 unconstrained coordinates.
//!
//! # Comparison with CLR
//!
//! | Property | CLR | ALR |
//! |----------|-----|-----|
//! | Output dimensions | D | D-1 |
//! | Sum constraint | Sums to zero | None |
//! | Reference | Geometric mean | Single part |

use super::{check_nonempty, exp_rows_stable};
use crate::closure::close;
use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use tracing::debug;

/// Apply the Additive Log-Ratio (ALR) transformation.
///
/// # Formula
/// ALR(x_ij) = log(x_ij / x_i,ref) for every j != ref
///
/// # Arguments
/// * `data` - Closed composition (samples × parts), all parts positive
/// * `ref_idx` - Reference column; `None` uses the last column
///
/// # Errors
/// - `ZeroReference` if the reference part is zero in any row.
/// - `NonPositive` for any other non-positive part.
/// - `InvalidParameter` if `ref_idx` is out of bounds.
pub fn alr(data: &DMatrix<f64>, ref_idx: Option<usize>) -> Result<DMatrix<f64>> {
    check_nonempty(data, "ALR")?;

    let (n_rows, n_parts) = data.shape();
    let ref_idx = ref_idx.unwrap_or(n_parts - 1);
    if ref_idx >= n_parts {
        return Err(CodaError::InvalidParameter(format!(
            "Reference index {} out of bounds (n_parts = {})",
            ref_idx, n_parts
        )));
    }

    for i in 0..n_rows {
        let reference = data[(i, ref_idx)];
        if reference == 0.0 {
            return Err(CodaError::ZeroReference {
                row: i,
                col: ref_idx,
            });
        }
        for j in 0..n_parts {
            let value = data[(i, j)];
            if value <= 0.0 || value.is_nan() {
                return Err(CodaError::NonPositive {
                    transform: "ALR",
                    row: i,
                    col: j,
                    value,
                });
            }
        }
    }

    let mut coords = DMatrix::zeros(n_rows, n_parts - 1);
    for i in 0..n_rows {
        let log_ref = data[(i, ref_idx)].ln();
        let mut out_col = 0;
        for j in 0..n_parts {
            if j == ref_idx {
                continue;
            }
            coords[(i, out_col)] = data[(i, j)].ln() - log_ref;
            out_col += 1;
        }
    }

    debug!(n_rows, n_parts, ref_idx, "applied ALR");
    Ok(coords)
}

/// Inverse ALR: exponentiate, reinsert the reference part and close to 1.
///
/// The composition has `coords.ncols() + 1` parts; the reference is placed at
/// `ref_idx` (default: last).
///
/// # Errors
/// `DimensionMismatch` if `ref_idx` does not fit a composition of that width.
pub fn inv_alr(coords: &DMatrix<f64>, ref_idx: Option<usize>) -> Result<DMatrix<f64>> {
    let (n_rows, n_coords) = coords.shape();
    if n_rows == 0 {
        return Err(CodaError::EmptyData(
            "Cannot apply inverse ALR to empty matrix".to_string(),
        ));
    }

    let n_parts = n_coords + 1;
    let ref_idx = ref_idx.unwrap_or(n_parts - 1);
    if ref_idx >= n_parts {
        return Err(CodaError::DimensionMismatch {
            expected: ref_idx,
            actual: n_coords,
        });
    }

    // log-ratios with the reference (log 1 = 0) reinserted
    let mut log_ratios = DMatrix::zeros(n_rows, n_parts);
    for i in 0..n_rows {
        let mut in_col = 0;
        for j in 0..n_parts {
            if j == ref_idx {
                continue;
            }
            log_ratios[(i, j)] = coords[(i, in_col)];
            in_col += 1;
        }
    }

    close(&exp_rows_stable(&log_ratios))
}
