//! Zero replacement strategies.
//!
//! Log-ratio transforms reject zero parts. These functions make the
//! replacement an explicit, visible step instead of a silent coercion.

use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use tracing::debug;

/// Multiplicative replacement of zeros.
///
/// In each row with total `t`, every zero becomes `delta * t` and every
/// non-zero part is scaled by `1 - k * delta` (k = number of zeros in the
/// row). Row totals and ratios between non-zero parts are preserved.
///
/// # Arguments
/// * `data` - Non-negative composition (samples × parts)
/// * `delta` - Replacement value as a fraction of the row total, in (0, 1)
///
/// # Errors
/// - `InvalidParameter` if `delta` is outside (0, 1) or `k * delta >= 1`.
/// - `NegativeComponent` / `ZeroSum` for invalid rows.
pub fn multiplicative_replacement(data: &DMatrix<f64>, delta: f64) -> Result<DMatrix<f64>> {
    if !(delta > 0.0 && delta < 1.0) {
        return Err(CodaError::InvalidParameter(format!(
            "Replacement delta must be in (0, 1), got {}",
            delta
        )));
    }

    let (n_rows, n_parts) = data.shape();
    let mut out = data.clone();
    let mut n_replaced = 0usize;

    for i in 0..n_rows {
        let mut total = 0.0;
        let mut zeros = 0usize;
        for j in 0..n_parts {
            let value = data[(i, j)];
            if value < 0.0 {
                return Err(CodaError::NegativeComponent { row: i, col: j, value });
            }
            if value == 0.0 {
                zeros += 1;
            }
            total += value;
        }

        if total == 0.0 {
            return Err(CodaError::ZeroSum { row: i });
        }
        if zeros == 0 {
            continue;
        }

        let scale = 1.0 - zeros as f64 * delta;
        if scale <= 0.0 {
            return Err(CodaError::InvalidParameter(format!(
                "delta {} too large for {} zeros in row {}",
                delta, zeros, i
            )));
        }

        for j in 0..n_parts {
            out[(i, j)] = if data[(i, j)] == 0.0 {
                delta * total
            } else {
                data[(i, j)] * scale
            };
        }
        n_replaced += zeros;
    }

    debug!(n_replaced, delta, "multiplicative zero replacement");
    Ok(out)
}

/// Add a constant to every part.
///
/// Simple but distorts ratios between small parts; prefer
/// [`multiplicative_replacement`] for closed data.
pub fn additive_replacement(data: &DMatrix<f64>, pseudocount: f64) -> Result<DMatrix<f64>> {
    if pseudocount <= 0.0 {
        return Err(CodaError::InvalidParameter(
            "Pseudocount must be positive".to_string(),
        ));
    }
    Ok(data.add_scalar(pseudocount))
}

/// Data-adaptive delta: half the smallest non-zero part, relative to its row
/// total. Falls back to 1e-5 if there is nothing to go on.
pub fn adaptive_delta(data: &DMatrix<f64>) -> f64 {
    let mut min_fraction = f64::INFINITY;

    for i in 0..data.nrows() {
        let total: f64 = data.row(i).sum();
        if !(total > 0.0) {
            continue;
        }
        for &value in data.row(i).iter() {
            if value > 0.0 {
                min_fraction = min_fraction.min(value / total);
            }
        }
    }

    if min_fraction.is_infinite() {
        1e-5
    } else {
        min_fraction / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_matrix() -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 4, &[
            0.5, 0.3, 0.2, 0.0,
            0.6, 0.0, 0.4, 0.0,
        ])
    }

    #[test]
    fn test_multiplicative_preserves_totals_and_ratios() {
        let data = create_test_matrix();
        let out = multiplicative_replacement(&data, 0.01).unwrap();

        for i in 0..2 {
            assert_relative_eq!(out.row(i).sum(), data.row(i).sum(), epsilon = 1e-12);
        }
        assert_relative_eq!(out[(0, 3)], 0.01, epsilon = 1e-12);
        assert_relative_eq!(out[(0, 0)] / out[(0, 1)], 0.5 / 0.3, epsilon = 1e-12);
        assert!(out.iter().all(|x| *x > 0.0));
    }

    #[test]
    fn test_multiplicative_invalid_delta() {
        let data = create_test_matrix();
        assert!(multiplicative_replacement(&data, 0.0).is_err());
        assert!(multiplicative_replacement(&data, 1.0).is_err());
        assert!(multiplicative_replacement(&data, 0.6).is_err());
    }

    #[test]
    fn test_multiplicative_rejects_negative() {
        let data = DMatrix::from_row_slice(1, 2, &[-0.1, 1.1]);
        assert!(multiplicative_replacement(&data, 0.01).unwrap_err().is_domain());
    }

    #[test]
    fn test_additive_replacement() {
        let out = additive_replacement(&create_test_matrix(), 0.5).unwrap();
        assert_relative_eq!(out[(1, 1)], 0.5, epsilon = 1e-12);
        assert!(additive_replacement(&create_test_matrix(), 0.0).is_err());
    }

    #[test]
    fn test_adaptive_delta() {
        // smallest non-zero fraction is 0.2 (row 0), so delta = 0.1
        assert_relative_eq!(adaptive_delta(&create_test_matrix()), 0.1, epsilon = 1e-12);
    }
}
