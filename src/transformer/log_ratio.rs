//! Identity and log-ratio transformers.

use super::{params_to_json, Transformer};
use crate::error::{CodaError, Result};
use crate::transform::{alr, clr, ilr_with_basis, inv_alr, inv_clr, inv_ilr, inv_ilr_with_basis, IlrBasis};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn check_width(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(CodaError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// Identity passthrough.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearTransform;

impl Transformer for LinearTransform {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn fit(&mut self, _data: &DMatrix<f64>) -> Result<()> {
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        true
    }

    fn reset(&mut self) {}

    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(data.clone())
    }

    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        Ok(coords.clone())
    }

    fn output_names(&self, part_names: &[String]) -> Vec<String> {
        part_names.to_vec()
    }

    fn params_json(&self) -> Result<String> {
        params_to_json(&())
    }
}

/// Fitted state of an [`AlrTransform`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlrFit {
    pub n_parts: usize,
    pub ref_idx: usize,
}

/// Additive log-ratio transformer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlrTransform {
    /// Configured reference column; `None` means the last column.
    ref_idx: Option<usize>,
    fitted: Option<AlrFit>,
}

impl AlrTransform {
    /// ALR against the last column.
    pub fn new() -> Self {
        Self::default()
    }

    /// ALR against a given column.
    pub fn with_reference(ref_idx: usize) -> Self {
        Self {
            ref_idx: Some(ref_idx),
            fitted: None,
        }
    }

    /// Fitted state, if any.
    pub fn fitted(&self) -> Option<&AlrFit> {
        self.fitted.as_ref()
    }
}

impl Transformer for AlrTransform {
    fn name(&self) -> &'static str {
        "alr"
    }

    fn fit(&mut self, data: &DMatrix<f64>) -> Result<()> {
        let n_parts = data.ncols();
        if n_parts == 0 {
            return Err(CodaError::EmptyData("Cannot fit ALR on zero parts".to_string()));
        }
        let ref_idx = self.ref_idx.unwrap_or(n_parts - 1);
        if ref_idx >= n_parts {
            return Err(CodaError::InvalidParameter(format!(
                "Reference index {} out of bounds (n_parts = {})",
                ref_idx, n_parts
            )));
        }
        self.fitted = Some(AlrFit { n_parts, ref_idx });
        debug!(n_parts, ref_idx, "fitted ALR transformer");
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn reset(&mut self) {
        self.fitted = None;
    }

    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let fit = match self.fitted {
            Some(fit) => fit,
            None => {
                self.fit(data)?;
                self.fitted.ok_or(CodaError::NotFitted("ALR"))?
            }
        };
        check_width(fit.n_parts, data.ncols())?;
        alr(data, Some(fit.ref_idx))
    }

    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match self.fitted {
            Some(fit) => {
                check_width(fit.n_parts - 1, coords.ncols())?;
                inv_alr(coords, Some(fit.ref_idx))
            }
            None => inv_alr(coords, self.ref_idx),
        }
    }

    fn output_names(&self, part_names: &[String]) -> Vec<String> {
        if part_names.is_empty() {
            return Vec::new();
        }
        let ref_idx = self
            .fitted
            .map(|f| f.ref_idx)
            .or(self.ref_idx)
            .unwrap_or(part_names.len() - 1);
        let Some(reference) = part_names.get(ref_idx) else {
            return Vec::new();
        };
        part_names
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != ref_idx)
            .map(|(_, name)| format!("alr({}/{})", name, reference))
            .collect()
    }

    fn params_json(&self) -> Result<String> {
        params_to_json(&self.fitted)
    }
}

/// Centred log-ratio transformer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClrTransform {
    n_parts: Option<usize>,
}

impl ClrTransform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for ClrTransform {
    fn name(&self) -> &'static str {
        "clr"
    }

    fn fit(&mut self, data: &DMatrix<f64>) -> Result<()> {
        if data.ncols() == 0 {
            return Err(CodaError::EmptyData("Cannot fit CLR on zero parts".to_string()));
        }
        self.n_parts = Some(data.ncols());
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.n_parts.is_some()
    }

    fn reset(&mut self) {
        self.n_parts = None;
    }

    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if self.n_parts.is_none() {
            self.fit(data)?;
        }
        if let Some(n_parts) = self.n_parts {
            check_width(n_parts, data.ncols())?;
        }
        clr(data)
    }

    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if let Some(n_parts) = self.n_parts {
            check_width(n_parts, coords.ncols())?;
        }
        inv_clr(coords)
    }

    fn output_names(&self, part_names: &[String]) -> Vec<String> {
        part_names.iter().map(|name| format!("clr({})", name)).collect()
    }

    fn params_json(&self) -> Result<String> {
        params_to_json(&self.n_parts)
    }
}

/// Isometric log-ratio transformer.
///
/// Fitting builds the Helmert basis for the number of parts seen. A basis
/// given to [`IlrTransform::with_basis`] is configuration: it survives
/// `reset` and fitting on data of another width is an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IlrTransform {
    #[serde(default)]
    configured: Option<IlrBasis>,
    basis: Option<IlrBasis>,
}

impl IlrTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied basis.
    pub fn with_basis(basis: IlrBasis) -> Self {
        Self {
            configured: Some(basis.clone()),
            basis: Some(basis),
        }
    }

    /// Fitted basis, if any.
    pub fn basis(&self) -> Option<&IlrBasis> {
        self.basis.as_ref()
    }
}

impl Transformer for IlrTransform {
    fn name(&self) -> &'static str {
        "ilr"
    }

    fn fit(&mut self, data: &DMatrix<f64>) -> Result<()> {
        let n_parts = data.ncols();
        if n_parts == 0 {
            return Err(CodaError::EmptyData("Cannot fit ILR on zero parts".to_string()));
        }
        if let Some(configured) = &self.configured {
            check_width(configured.n_parts(), n_parts)?;
            self.basis = Some(configured.clone());
            return Ok(());
        }
        if self.basis.as_ref().map(IlrBasis::n_parts) != Some(n_parts) {
            self.basis = Some(IlrBasis::helmert(n_parts)?);
            debug!(n_parts, "built Helmert basis for ILR transformer");
        }
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.basis.is_some()
    }

    fn reset(&mut self) {
        self.basis = None;
    }

    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if self.basis.is_none() {
            self.fit(data)?;
        }
        let basis = self.basis.as_ref().ok_or(CodaError::NotFitted("ILR"))?;
        ilr_with_basis(data, basis)
    }

    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        match self.basis.as_ref().or(self.configured.as_ref()) {
            Some(basis) => inv_ilr_with_basis(coords, basis),
            None => inv_ilr(coords, None),
        }
    }

    fn output_names(&self, part_names: &[String]) -> Vec<String> {
        (1..part_names.len()).map(|k| format!("ilr{}", k)).collect()
    }

    fn params_json(&self) -> Result<String> {
        params_to_json(&self.basis)
    }
}
