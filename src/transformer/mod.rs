//! Uniform fit / transform / inverse_transform interface over the transforms.
//!
//! Each transformer owns its fitted parameters (ALR reference, ILR basis,
//! Box-Cox lambdas). Parameters are fitted on the first `transform` call, or
//! explicitly with `fit`, and reused by `inverse_transform` until `reset` or
//! a refit. Instances share no state, so differently configured transformers
//! never interfere; an instance that is being fitted must not be shared
//! across threads without external synchronisation.

pub mod config;
pub mod log_ratio;
pub mod power;

pub use config::{AnyTransform, FittedTransform, TransformConfig, TransformSpec};
pub use log_ratio::{AlrTransform, ClrTransform, IlrTransform, LinearTransform};
pub use power::BoxCoxTransform;

use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use serde::Serialize;

/// A reversible transform of samples × parts matrices.
pub trait Transformer {
    /// Short name of the transform.
    fn name(&self) -> &'static str;

    /// Fit parameters from `data`, replacing any previous fit.
    fn fit(&mut self, data: &DMatrix<f64>) -> Result<()>;

    /// Whether parameters are available for `inverse_transform`.
    fn is_fitted(&self) -> bool;

    /// Discard fitted parameters.
    fn reset(&mut self);

    /// Transform `data`, fitting first if not yet fitted.
    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Map coordinates back to the original space.
    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>>;

    /// Fit on `data` then transform it.
    fn fit_transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        self.fit(data)?;
        self.transform(data)
    }

    /// Column labels of the transformed output for the given part names.
    fn output_names(&self, part_names: &[String]) -> Vec<String>;

    /// Fitted parameters as JSON; `null` before fitting.
    fn params_json(&self) -> Result<String>;
}

fn params_to_json<T: Serialize>(params: &T) -> Result<String> {
    serde_json::to_string(params).map_err(CodaError::from)
}
