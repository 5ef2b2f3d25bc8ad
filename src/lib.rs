//! Compositional data transforms for geochemical datasets.
//!
//! Compositions (rows of non-negative parts summing to a constant) cannot be
//! analysed with ordinary statistics: the fixed sum induces spurious negative
//! correlation. This library maps compositions into unconstrained real
//! coordinates with log-ratio and power transforms, and maps results back
//! with exact inverses.
//!
//! # Overview
//!
//! - **closure**: rescale rows to a constant sum
//! - **transform**: ALR, CLR, ILR and Box-Cox with their inverses
//! - **transformer**: uniform `fit` / `transform` / `inverse_transform` wrappers
//! - **zero**: explicit zero replacement before log-ratio transforms
//! - **data**: labelled composition tables (TSV)
//!
//! Matrices are `nalgebra::DMatrix<f64>` with samples as rows and parts as
//! columns.
//!
//! # Example
//!
//! ```no_run
//! use geocoda::prelude::*;
//! use nalgebra::DMatrix;
//!
//! let raw = DMatrix::from_row_slice(2, 3, &[
//!     50.0, 30.0, 20.0,
//!     60.0, 25.0, 15.0,
//! ]);
//! let data = close(&raw).unwrap();
//!
//! let mut tmr = IlrTransform::new();
//! let coords = tmr.transform(&data).unwrap();
//! let back = tmr.inverse_transform(&coords).unwrap();
//! assert_eq!(back.shape(), data.shape());
//! ```

pub mod closure;
pub mod data;
pub mod error;
pub mod tolerance;
pub mod transform;
pub mod transformer;
pub mod zero;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::closure::{close, close_row, close_with, row_sums, ClosureOptions};
    pub use crate::data::CompositionTable;
    pub use crate::error::{CodaError, ErrorKind, Result};
    pub use crate::transform::{
        aitchison_distance, alr, apply_boxcox, boxcox, boxcox_llf, boxcox_params, clr,
        fit_lambda, geometric_means, ilr, ilr_with_basis, inv_alr, inv_boxcox, inv_clr, inv_ilr,
        inv_ilr_with_basis, BoxCoxOptions, BoxCoxOutput, BoxCoxParams, FitScope, IlrBasis,
        LambdaSearch, LambdaSpec, ShiftSpec,
    };
    pub use crate::transformer::{
        AlrTransform, AnyTransform, BoxCoxTransform, ClrTransform, FittedTransform,
        IlrTransform, LinearTransform, TransformConfig, TransformSpec, Transformer,
    };
    pub use crate::zero::{adaptive_delta, additive_replacement, multiplicative_replacement};
}
