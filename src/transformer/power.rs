//! Box-Cox power transformer.

use super::{params_to_json, Transformer};
use crate::error::{CodaError, Result};
use crate::transform::{apply_boxcox, boxcox, boxcox_params, inv_boxcox, BoxCoxOptions, BoxCoxParams};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Box-Cox transformer holding fitted lambdas and shifts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxCoxTransform {
    options: BoxCoxOptions,
    params: Option<BoxCoxParams>,
}

impl BoxCoxTransform {
    /// Fitted lambda per column, no shift.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BoxCoxOptions) -> Self {
        Self {
            options,
            params: None,
        }
    }

    /// Use already fitted parameters.
    pub fn with_params(params: BoxCoxParams) -> Self {
        Self {
            options: BoxCoxOptions::default(),
            params: Some(params),
        }
    }

    pub fn options(&self) -> &BoxCoxOptions {
        &self.options
    }

    /// Fitted parameters, if any.
    pub fn params(&self) -> Option<&BoxCoxParams> {
        self.params.as_ref()
    }
}

impl Transformer for BoxCoxTransform {
    fn name(&self) -> &'static str {
        "boxcox"
    }

    fn fit(&mut self, data: &DMatrix<f64>) -> Result<()> {
        let params = boxcox_params(data, &self.options)?;
        debug!(lambdas = ?params.lambdas, "fitted Box-Cox transformer");
        self.params = Some(params);
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    fn reset(&mut self) {
        self.params = None;
    }

    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match &self.params {
            Some(params) => apply_boxcox(data, params),
            None => {
                let out = boxcox(data, &self.options)?;
                self.params = Some(out.params);
                Ok(out.data)
            }
        }
    }

    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let params = self.params.as_ref().ok_or(CodaError::NotFitted("Box-Cox"))?;
        inv_boxcox(coords, params)
    }

    fn output_names(&self, part_names: &[String]) -> Vec<String> {
        part_names.iter().map(|name| format!("bc({})", name)).collect()
    }

    fn params_json(&self) -> Result<String> {
        params_to_json(&self.params)
    }
}
