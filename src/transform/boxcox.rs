//! Box-Cox power transform with fitted lambda and positivity shift.
//!
//! # Formula
//! For a shifted value x = v + shift > 0:
//! - y = (x^λ - 1) / λ for λ != 0
//! - y = log(x) for λ = 0
//!
//! Lambda is either supplied or fitted per column by maximising the Box-Cox
//! normal log-likelihood: a fixed grid over the search interval, then a
//! fixed number of golden-section steps around the best grid point.

use super::check_nonempty;
use crate::error::{CodaError, Result};
use crate::tolerance;
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How lambda is chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum LambdaSpec {
    /// Fit lambda from the data.
    Fit,
    /// Use one lambda for every column.
    Fixed(f64),
    /// Use one lambda per column.
    PerColumn(Vec<f64>),
}

/// How values are shifted to be strictly positive before the power.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum ShiftSpec {
    /// No shift; non-positive values are a domain error.
    None,
    /// Add the same constant to every column.
    Fixed(f64),
    /// Add `|min| + 1` to every column whose minimum is not positive.
    Auto,
}

/// Whether a fitted lambda is shared by all columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitScope {
    /// One lambda per column. Falls back to `Global` for single-row input.
    PerColumn,
    /// One lambda fitted over all values.
    Global,
}

/// Search interval for fitting lambda.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LambdaSearch {
    pub lower: f64,
    pub upper: f64,
    /// Grid points over `[lower, upper]`.
    pub steps: usize,
    /// Golden-section iterations around the best grid point.
    pub refine_iterations: usize,
}

impl Default for LambdaSearch {
    fn default() -> Self {
        Self {
            lower: -1.0,
            upper: 5.0,
            steps: 100,
            refine_iterations: 60,
        }
    }
}

/// Options for [`boxcox`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxCoxOptions {
    pub lambda: LambdaSpec,
    pub shift: ShiftSpec,
    pub scope: FitScope,
    pub search: LambdaSearch,
}

impl Default for BoxCoxOptions {
    fn default() -> Self {
        Self {
            lambda: LambdaSpec::Fit,
            shift: ShiftSpec::None,
            scope: FitScope::PerColumn,
            search: LambdaSearch::default(),
        }
    }
}

impl BoxCoxOptions {
    /// Fixed lambda for every column, no shift.
    pub fn fixed(lambda: f64) -> Self {
        Self {
            lambda: LambdaSpec::Fixed(lambda),
            ..Self::default()
        }
    }

    /// Fitted lambda, no shift.
    pub fn fitted() -> Self {
        Self::default()
    }
}

/// Parameters produced by [`boxcox`] and consumed by [`inv_boxcox`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCoxParams {
    /// Lambda per column.
    pub lambdas: Vec<f64>,
    /// Shift added to each column before the power.
    pub shifts: Vec<f64>,
}

impl BoxCoxParams {
    /// Same lambda for `n_cols` columns, no shift.
    pub fn uniform(lambda: f64, n_cols: usize) -> Self {
        Self {
            lambdas: vec![lambda; n_cols],
            shifts: vec![0.0; n_cols],
        }
    }

    /// Number of columns these parameters apply to.
    pub fn n_cols(&self) -> usize {
        self.lambdas.len()
    }
}

/// Transformed data together with the parameters used.
#[derive(Debug, Clone)]
pub struct BoxCoxOutput {
    pub data: DMatrix<f64>,
    pub params: BoxCoxParams,
}

/// Apply the Box-Cox transform column-wise, resolving shift and lambda from
/// `options`. The returned params reproduce the data through [`inv_boxcox`].
///
/// # Errors
/// - `NonPositive` if any shifted value is not strictly positive or is NaN.
/// - `DimensionMismatch` if a per-column lambda list has the wrong length.
/// - `InvalidParameter` for an invalid search interval.
pub fn boxcox(data: &DMatrix<f64>, options: &BoxCoxOptions) -> Result<BoxCoxOutput> {
    let params = boxcox_params(data, options)?;
    let out = apply_boxcox(data, &params)?;
    Ok(BoxCoxOutput { data: out, params })
}

/// Resolve shifts and lambdas for `data` without transforming it.
pub fn boxcox_params(data: &DMatrix<f64>, options: &BoxCoxOptions) -> Result<BoxCoxParams> {
    check_nonempty(data, "Box-Cox")?;
    let n_cols = data.ncols();

    let shifts = resolve_shifts(data, &options.shift);
    check_shifted_positive(data, &shifts)?;

    let lambdas = match &options.lambda {
        LambdaSpec::Fixed(lambda) => vec![*lambda; n_cols],
        LambdaSpec::PerColumn(lambdas) => {
            if lambdas.len() != n_cols {
                return Err(CodaError::DimensionMismatch {
                    expected: n_cols,
                    actual: lambdas.len(),
                });
            }
            lambdas.clone()
        }
        LambdaSpec::Fit => fit_lambdas(data, &shifts, options)?,
    };

    debug!(n_cols, ?lambdas, ?shifts, "resolved Box-Cox parameters");
    Ok(BoxCoxParams { lambdas, shifts })
}

/// Apply the Box-Cox transform with known parameters.
pub fn apply_boxcox(data: &DMatrix<f64>, params: &BoxCoxParams) -> Result<DMatrix<f64>> {
    check_nonempty(data, "Box-Cox")?;
    check_params_width(data.ncols(), params)?;
    check_shifted_positive(data, &params.shifts)?;

    let (n_rows, n_cols) = data.shape();
    let mut out = DMatrix::zeros(n_rows, n_cols);
    for j in 0..n_cols {
        for i in 0..n_rows {
            out[(i, j)] = forward(data[(i, j)] + params.shifts[j], params.lambdas[j]);
        }
    }
    Ok(out)
}

/// Inverse Box-Cox: x = (λy + 1)^(1/λ) - shift, or exp(y) - shift for λ = 0.
///
/// # Errors
/// - `InverseOutOfDomain` where λy + 1 is not positive or y is NaN.
/// - `DimensionMismatch` if `params` do not match the column count.
pub fn inv_boxcox(coords: &DMatrix<f64>, params: &BoxCoxParams) -> Result<DMatrix<f64>> {
    check_nonempty(coords, "inverse Box-Cox")?;
    check_params_width(coords.ncols(), params)?;
    let (n_rows, n_cols) = coords.shape();

    let mut out = DMatrix::zeros(n_rows, n_cols);
    for j in 0..n_cols {
        let lambda = params.lambdas[j];
        for i in 0..n_rows {
            let y = coords[(i, j)];
            if y.is_nan() {
                return Err(CodaError::InverseOutOfDomain {
                    row: i,
                    col: j,
                    value: y,
                });
            }
            let x = if lambda.abs() < tolerance::LAMBDA_ZERO {
                y.exp()
            } else {
                let base = lambda * y;
                if base <= -1.0 {
                    return Err(CodaError::InverseOutOfDomain {
                        row: i,
                        col: j,
                        value: y,
                    });
                }
                (base.ln_1p() / lambda).exp()
            };
            out[(i, j)] = x - params.shifts[j];
        }
    }
    Ok(out)
}

/// Box-Cox normal log-likelihood of `values` (already shifted, all positive).
///
/// llf = (λ - 1) Σ log(x) - n/2 log(var(y))
pub fn boxcox_llf(lambda: f64, values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.is_empty() {
        return f64::NEG_INFINITY;
    }
    let log_sum: f64 = values.iter().map(|x| x.ln()).sum();
    let transformed: Vec<f64> = values.iter().map(|&x| forward(x, lambda)).collect();
    let mean = transformed.iter().sum::<f64>() / n;
    let variance = transformed.iter().map(|y| (y - mean).powi(2)).sum::<f64>() / n;
    (lambda - 1.0) * log_sum - 0.5 * n * variance.ln()
}

/// Fit lambda for one set of positive values.
///
/// Returns 1.0 for constant data or when the likelihood is nowhere finite.
/// A NaN or infinite value is a `NonFiniteComponent` error at its index.
pub fn fit_lambda(values: &[f64], search: &LambdaSearch) -> Result<f64> {
    if !(search.lower < search.upper) || search.steps < 2 {
        return Err(CodaError::InvalidParameter(format!(
            "Lambda search needs lower < upper and at least 2 steps, got [{}, {}] with {} steps",
            search.lower, search.upper, search.steps
        )));
    }

    if let Some((idx, &value)) = values.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(CodaError::NonFiniteComponent {
            row: idx,
            col: 0,
            value,
        });
    }
    if values.windows(2).all(|w| w[0] == w[1]) {
        return Ok(1.0);
    }

    let score = |lambda: f64| {
        let llf = boxcox_llf(lambda, &values);
        if llf.is_finite() {
            llf
        } else {
            f64::NEG_INFINITY
        }
    };

    let step = (search.upper - search.lower) / (search.steps - 1) as f64;
    let grid = |k: usize| search.lower + step * k as f64;

    let mut best_k = None;
    let mut best_score = f64::NEG_INFINITY;
    for k in 0..search.steps {
        let s = score(grid(k));
        if s > best_score {
            best_score = s;
            best_k = Some(k);
        }
    }

    let Some(best_k) = best_k else {
        return Ok(1.0);
    };

    // golden-section maximisation between the neighbouring grid points
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut a = grid(best_k.saturating_sub(1));
    let mut b = grid((best_k + 1).min(search.steps - 1));
    let mut c = b - inv_phi * (b - a);
    let mut d = a + inv_phi * (b - a);
    let (mut fc, mut fd) = (score(c), score(d));
    for _ in 0..search.refine_iterations {
        if fc > fd {
            b = d;
            d = c;
            fd = fc;
            c = b - inv_phi * (b - a);
            fc = score(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + inv_phi * (b - a);
            fd = score(d);
        }
    }

    let refined = (a + b) / 2.0;
    if score(refined) >= best_score {
        Ok(refined)
    } else {
        Ok(grid(best_k))
    }
}

fn fit_lambdas(data: &DMatrix<f64>, shifts: &[f64], options: &BoxCoxOptions) -> Result<Vec<f64>> {
    let (n_rows, n_cols) = data.shape();
    let scope = if n_rows < 2 {
        FitScope::Global
    } else {
        options.scope
    };

    match scope {
        FitScope::Global => {
            let values: Vec<f64> = (0..n_cols)
                .flat_map(|j| (0..n_rows).map(move |i| data[(i, j)] + shifts[j]))
                .collect();
            let lambda = fit_lambda(&values, &options.search)?;
            Ok(vec![lambda; n_cols])
        }
        FitScope::PerColumn => (0..n_cols)
            .into_par_iter()
            .map(|j| {
                let values: Vec<f64> = (0..n_rows).map(|i| data[(i, j)] + shifts[j]).collect();
                fit_lambda(&values, &options.search)
            })
            .collect(),
    }
}

fn check_params_width(n_cols: usize, params: &BoxCoxParams) -> Result<()> {
    if params.lambdas.len() != n_cols || params.shifts.len() != n_cols {
        return Err(CodaError::DimensionMismatch {
            expected: n_cols,
            actual: params.lambdas.len().min(params.shifts.len()),
        });
    }
    Ok(())
}

fn check_shifted_positive(data: &DMatrix<f64>, shifts: &[f64]) -> Result<()> {
    for i in 0..data.nrows() {
        for j in 0..data.ncols() {
            let value = data[(i, j)] + shifts[j];
            if value <= 0.0 || value.is_nan() {
                return Err(CodaError::NonPositive {
                    transform: "Box-Cox",
                    row: i,
                    col: j,
                    value,
                });
            }
        }
    }
    Ok(())
}

fn resolve_shifts(data: &DMatrix<f64>, shift: &ShiftSpec) -> Vec<f64> {
    let n_cols = data.ncols();
    match shift {
        ShiftSpec::None => vec![0.0; n_cols],
        ShiftSpec::Fixed(s) => vec![*s; n_cols],
        ShiftSpec::Auto => (0..n_cols)
            .map(|j| {
                let min = data.column(j).iter().cloned().fold(f64::INFINITY, f64::min);
                if min <= 0.0 {
                    min.abs() + 1.0
                } else {
                    0.0
                }
            })
            .collect(),
    }
}

fn forward(x: f64, lambda: f64) -> f64 {
    if lambda.abs() < tolerance::LAMBDA_ZERO {
        x.ln()
    } else {
        (lambda * x.ln()).exp_m1() / lambda
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::close;
    use approx::assert_relative_eq;

    fn create_test_data() -> DMatrix<f64> {
        let raw = DMatrix::from_row_slice(6, 3, &[
            52.0, 15.0, 3.0,
            48.0, 17.0, 5.5,
            61.0, 14.0, 1.2,
            45.0, 18.0, 9.0,
            57.0, 16.0, 2.4,
            50.0, 13.5, 4.1,
        ]);
        close(&raw).unwrap()
    }

    fn assert_roundtrip(data: &DMatrix<f64>, options: &BoxCoxOptions) {
        let out = boxcox(data, options).unwrap();
        let back = inv_boxcox(&out.data, &out.params).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_boxcox_log_branch() {
        let data = create_test_data();
        let out = boxcox(&data, &BoxCoxOptions::fixed(0.0)).unwrap();
        assert_relative_eq!(out.data[(0, 0)], data[(0, 0)].ln(), epsilon = 1e-12);
        assert_roundtrip(&data, &BoxCoxOptions::fixed(0.0));
    }

    #[test]
    fn test_boxcox_power_branch() {
        let data = DMatrix::from_row_slice(1, 2, &[4.0, 9.0]);
        let out = boxcox(&data, &BoxCoxOptions::fixed(0.5)).unwrap();
        // (sqrt(4) - 1) / 0.5 = 2
        assert_relative_eq!(out.data[(0, 0)], 2.0, epsilon = 1e-12);
        assert_relative_eq!(out.data[(0, 1)], 4.0, epsilon = 1e-12);
        assert_roundtrip(&create_test_data(), &BoxCoxOptions::fixed(0.5));
        assert_roundtrip(&create_test_data(), &BoxCoxOptions::fixed(-0.7));
    }

    #[test]
    fn test_boxcox_fitted_roundtrip() {
        let data = create_test_data();
        let out = boxcox(&data, &BoxCoxOptions::fitted()).unwrap();
        assert_eq!(out.params.n_cols(), 3);
        for lambda in &out.params.lambdas {
            assert!(*lambda >= -1.0 && *lambda <= 5.0);
        }
        assert_roundtrip(&data, &BoxCoxOptions::fitted());
    }

    #[test]
    fn test_boxcox_single_row_uses_global_lambda() {
        let data = create_test_data().rows(0, 1).into_owned();
        let out = boxcox(&data, &BoxCoxOptions::fitted()).unwrap();
        let first = out.params.lambdas[0];
        assert!(out.params.lambdas.iter().all(|l| *l == first));
        assert_roundtrip(&data, &BoxCoxOptions::fitted());
    }

    #[test]
    fn test_fit_lambda_beats_grid_neighbours() {
        let values = [1.2, 2.5, 3.1, 4.8, 7.9, 12.5, 20.1, 33.0];
        let search = LambdaSearch::default();
        let lambda = fit_lambda(&values, &search).unwrap();
        let best = boxcox_llf(lambda, &values);
        assert!(best >= boxcox_llf(lambda - 0.1, &values));
        assert!(best >= boxcox_llf(lambda + 0.1, &values));
    }

    #[test]
    fn test_fit_lambda_constant_values() {
        let lambda = fit_lambda(&[2.0, 2.0, 2.0], &LambdaSearch::default()).unwrap();
        assert_eq!(lambda, 1.0);
    }

    #[test]
    fn test_fit_lambda_invalid_search() {
        let search = LambdaSearch {
            lower: 1.0,
            upper: -1.0,
            ..LambdaSearch::default()
        };
        assert!(fit_lambda(&[1.0, 2.0], &search).is_err());
    }

    #[test]
    fn test_boxcox_rejects_non_positive_without_shift() {
        let data = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let err = boxcox(&data, &BoxCoxOptions::fixed(0.5)).unwrap_err();
        assert!(matches!(err, CodaError::NonPositive { row: 0, col: 0, .. }));
    }

    #[test]
    fn test_boxcox_rejects_nan() {
        let data = DMatrix::from_row_slice(3, 1, &[0.2, f64::NAN, 0.5]);
        let err = boxcox(&data, &BoxCoxOptions::fixed(0.5)).unwrap_err();
        assert!(matches!(err, CodaError::NonPositive { row: 1, col: 0, .. }));

        let err = boxcox(&data, &BoxCoxOptions::fitted()).unwrap_err();
        assert!(matches!(err, CodaError::NonPositive { row: 1, col: 0, .. }));

        let params = BoxCoxParams::uniform(0.5, 1);
        assert!(apply_boxcox(&data, &params).unwrap_err().is_domain());
    }

    #[test]
    fn test_fit_lambda_rejects_non_finite() {
        let search = LambdaSearch::default();
        let err = fit_lambda(&[1.0, f64::NAN, 2.0], &search).unwrap_err();
        assert!(matches!(err, CodaError::NonFiniteComponent { row: 1, .. }));
        assert!(fit_lambda(&[1.0, f64::INFINITY], &search).is_err());
    }

    #[test]
    fn test_boxcox_auto_shift_roundtrip() {
        let data = DMatrix::from_row_slice(3, 2, &[
            -2.0, 1.0,
            0.0, 2.0,
            3.0, 5.0,
        ]);
        let options = BoxCoxOptions {
            shift: ShiftSpec::Auto,
            ..BoxCoxOptions::fitted()
        };
        let out = boxcox(&data, &options).unwrap();
        assert_eq!(out.params.shifts, vec![3.0, 0.0]);
        let back = inv_boxcox(&out.data, &out.params).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_boxcox_per_column_lambda_length() {
        let options = BoxCoxOptions {
            lambda: LambdaSpec::PerColumn(vec![0.5]),
            ..BoxCoxOptions::default()
        };
        assert!(boxcox(&create_test_data(), &options).unwrap_err().is_shape());
    }

    #[test]
    fn test_inv_boxcox_out_of_domain() {
        let coords = DMatrix::from_row_slice(1, 1, &[-3.0]);
        let params = BoxCoxParams::uniform(0.5, 1);
        let err = inv_boxcox(&coords, &params).unwrap_err();
        assert!(matches!(err, CodaError::InverseOutOfDomain { .. }));
    }

    #[test]
    fn test_inv_boxcox_rejects_nan() {
        let coords = DMatrix::from_row_slice(2, 1, &[0.3, f64::NAN]);
        for lambda in [0.0, 0.5] {
            let params = BoxCoxParams::uniform(lambda, 1);
            let err = inv_boxcox(&coords, &params).unwrap_err();
            assert!(matches!(err, CodaError::InverseOutOfDomain { row: 1, col: 0, .. }));
        }
    }

    #[test]
    fn test_inv_boxcox_param_mismatch() {
        let coords = DMatrix::from_row_slice(1, 2, &[0.1, 0.2]);
        assert!(inv_boxcox(&coords, &BoxCoxParams::uniform(0.5, 3)).is_err());
    }
}
