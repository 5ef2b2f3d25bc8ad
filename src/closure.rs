//! Closure: rescaling compositions to a constant row sum.
//!
//! Closure is the pre-step of every log-ratio transform. Each row (sample) is
//! divided by the sum of its included parts and multiplied by the target, so
//! the included parts of every row sum to the same constant (1 by default).

use crate::error::{CodaError, Result};
use crate::tolerance;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Options for [`close_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureOptions {
    /// Row sum of the included parts after closure.
    pub target: f64,
    /// Columns passed through unscaled and left out of the row sum.
    pub exclude: Vec<usize>,
}

impl Default for ClosureOptions {
    fn default() -> Self {
        Self {
            target: 1.0,
            exclude: Vec::new(),
        }
    }
}

impl ClosureOptions {
    /// Closure to a given target over all columns.
    pub fn with_target(target: f64) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

/// Close every row of `data` to sum to 1.
pub fn close(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    close_with(data, &ClosureOptions::default())
}

/// Close every row of `data` according to `options`.
///
/// # Errors
/// - `NegativeComponent` if any included part is negative.
/// - `ZeroSum` if a row's included parts sum to zero.
/// - `NonFiniteComponent` if an included part is infinite.
/// - `InvalidParameter` for a non-positive target, an out-of-range excluded
///   column, or when every column is excluded.
///
/// NaN parts are not imputed; they make the whole row NaN.
pub fn close_with(data: &DMatrix<f64>, options: &ClosureOptions) -> Result<DMatrix<f64>> {
    let (n_rows, n_cols) = data.shape();

    if n_rows == 0 || n_cols == 0 {
        return Err(CodaError::EmptyData(
            "Cannot close an empty matrix".to_string(),
        ));
    }

    if !(options.target.is_finite() && options.target > 0.0) {
        return Err(CodaError::InvalidParameter(format!(
            "Closure target must be positive and finite, got {}",
            options.target
        )));
    }

    let included = included_columns(n_cols, &options.exclude)?;

    let mut closed = data.clone();
    for i in 0..n_rows {
        // parts are divided by the row maximum, so the sum lies in [1, D]
        let mut max = 0.0_f64;
        let mut has_nan = false;
        for &j in &included {
            let value = data[(i, j)];
            if value < 0.0 {
                return Err(CodaError::NegativeComponent {
                    row: i,
                    col: j,
                    value,
                });
            }
            if value.is_infinite() {
                return Err(CodaError::NonFiniteComponent {
                    row: i,
                    col: j,
                    value,
                });
            }
            if value.is_nan() {
                has_nan = true;
            } else {
                max = max.max(value);
            }
        }

        if has_nan {
            for &j in &included {
                closed[(i, j)] = f64::NAN;
            }
            continue;
        }

        if max == 0.0 {
            return Err(CodaError::ZeroSum { row: i });
        }

        let sum: f64 = included.iter().map(|&j| data[(i, j)] / max).sum();
        for &j in &included {
            closed[(i, j)] = data[(i, j)] / max / sum * options.target;
        }

        let residual = included.iter().map(|&j| closed[(i, j)]).sum::<f64>() - options.target;
        if !tolerance::within(residual, options.target, tolerance::CLOSURE) {
            return Err(CodaError::InvariantViolated(format!(
                "row {} closes to {} instead of {}",
                i,
                options.target + residual,
                options.target
            )));
        }
        trace!(row = i, residual, "closure residual");
    }

    debug!(
        n_rows,
        n_cols,
        target = options.target,
        excluded = options.exclude.len(),
        "closed composition"
    );

    Ok(closed)
}

/// Close a single composition vector to `target`.
pub fn close_row(row: &[f64], target: f64) -> Result<Vec<f64>> {
    let data = DMatrix::from_row_slice(1, row.len(), row);
    let closed = close_with(&data, &ClosureOptions::with_target(target))?;
    Ok(closed.iter().cloned().collect())
}

/// Row sums over the columns not listed in `exclude`.
pub fn row_sums(data: &DMatrix<f64>, exclude: &[usize]) -> Vec<f64> {
    (0..data.nrows())
        .map(|i| {
            (0..data.ncols())
                .filter(|j| !exclude.contains(j))
                .map(|j| data[(i, j)])
                .sum()
        })
        .collect()
}

fn included_columns(n_cols: usize, exclude: &[usize]) -> Result<Vec<usize>> {
    if let Some(&bad) = exclude.iter().find(|&&j| j >= n_cols) {
        return Err(CodaError::InvalidParameter(format!(
            "Excluded column {} out of bounds (n_cols = {})",
            bad, n_cols
        )));
    }

    let included: Vec<usize> = (0..n_cols).filter(|j| !exclude.contains(j)).collect();
    if included.is_empty() {
        return Err(CodaError::InvalidParameter(
            "Closure needs at least one included column".to_string(),
        ));
    }
    Ok(included)
}
