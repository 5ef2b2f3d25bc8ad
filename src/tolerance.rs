//! Numeric tolerances for invariant checks.
//!
//! Residuals below these thresholds are accepted as floating-point noise;
//! anything larger is reported as [`CodaError::InvariantViolated`](crate::error::CodaError).

/// Closure: each closed row must sum to the target within this relative error.
pub const CLOSURE: f64 = 1e-8;

/// CLR centring: each row of CLR coordinates must sum to zero within this
/// tolerance, scaled by `1 + sum(|clr_i|)`.
pub const CLR_CENTRING: f64 = 1e-8;

/// ILR basis: columns must be unit-norm, mutually orthogonal and zero-sum
/// within this tolerance.
pub const BASIS: f64 = 1e-10;

/// Box-Cox lambdas closer to zero than this use the log branch.
pub const LAMBDA_ZERO: f64 = 1e-12;

/// Scaled residual check shared by the invariant guards.
pub(crate) fn within(residual: f64, scale: f64, tol: f64) -> bool {
    residual.abs() <= tol * (1.0 + scale.abs())
}
