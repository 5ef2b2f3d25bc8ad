//! Log-ratio and power transforms for compositional data.
//!
//! - **ALR**: additive log-ratio against a reference part (D → D-1)
//! - **CLR**: centred log-ratio against the geometric mean (D → D)
//! - **ILR**: isometric log-ratio on an orthonormal basis (D → D-1)
//! - **Box-Cox**: column-wise power transform with fitted lambda (D → D)
//!
//! Every transform has an exact inverse. Matrices are samples × parts.

pub mod alr;
pub mod boxcox;
pub mod clr;
pub mod ilr;

pub use alr::{alr, inv_alr};
pub use boxcox::{
    apply_boxcox, boxcox, boxcox_llf, boxcox_params, fit_lambda, inv_boxcox, BoxCoxOptions, BoxCoxOutput, BoxCoxParams,
    FitScope, LambdaSearch, LambdaSpec, ShiftSpec,
};
pub use clr::{aitchison_distance, clr, geometric_means, inv_clr};
pub use ilr::{ilr, ilr_with_basis, inv_ilr, inv_ilr_with_basis, IlrBasis};

use crate::error::{CodaError, Result};
use nalgebra::DMatrix;

/// Reject empty input before any numeric work.
pub(crate) fn check_nonempty(data: &DMatrix<f64>, transform: &str) -> Result<()> {
    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(CodaError::EmptyData(format!(
            "Cannot apply {} to empty matrix",
            transform
        )));
    }
    Ok(())
}

/// Reject zero, negative and NaN parts for log-based transforms.
pub(crate) fn check_positive(data: &DMatrix<f64>, transform: &'static str) -> Result<()> {
    for i in 0..data.nrows() {
        for j in 0..data.ncols() {
            let value = data[(i, j)];
            if value <= 0.0 || value.is_nan() {
                return Err(CodaError::NonPositive {
                    transform,
                    row: i,
                    col: j,
                    value,
                });
            }
        }
    }
    Ok(())
}

/// Exponentiate each row after subtracting its maximum, so the largest entry
/// becomes 1 and nothing overflows. Closure removes the per-row factor.
pub(crate) fn exp_rows_stable(coords: &DMatrix<f64>) -> DMatrix<f64> {
    let mut out = coords.clone();
    for i in 0..coords.nrows() {
        let max = coords.row(i).iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let offset = if max.is_finite() { max } else { 0.0 };
        for j in 0..coords.ncols() {
            out[(i, j)] = (coords[(i, j)] - offset).exp();
        }
    }
    out
}
