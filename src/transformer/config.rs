//! Serializable transform configuration and fitted-state dispatch.

use super::{AlrTransform, BoxCoxTransform, ClrTransform, IlrTransform, LinearTransform, Transformer};
use crate::error::{CodaError, Result};
use crate::transform::BoxCoxOptions;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which transform to build, with its configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransformSpec {
    /// Identity passthrough.
    Linear,
    /// Additive log-ratio; `ref_idx` defaults to the last column.
    Alr {
        #[serde(default)]
        ref_idx: Option<usize>,
    },
    /// Centred log-ratio.
    Clr,
    /// Isometric log-ratio with the Helmert basis.
    Ilr,
    /// Box-Cox power transform.
    BoxCox {
        #[serde(default)]
        options: BoxCoxOptions,
    },
}

impl TransformSpec {
    /// Build an unfitted transformer for this spec.
    pub fn build(&self) -> AnyTransform {
        match self {
            TransformSpec::Linear => AnyTransform::Linear(LinearTransform),
            TransformSpec::Alr { ref_idx } => AnyTransform::Alr(match ref_idx {
                Some(idx) => AlrTransform::with_reference(*idx),
                None => AlrTransform::new(),
            }),
            TransformSpec::Clr => AnyTransform::Clr(ClrTransform::new()),
            TransformSpec::Ilr => AnyTransform::Ilr(IlrTransform::new()),
            TransformSpec::BoxCox { options } => {
                AnyTransform::BoxCox(BoxCoxTransform::with_options(options.clone()))
            }
        }
    }
}

/// One of the available transformers, with its fitted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnyTransform {
    Linear(LinearTransform),
    Alr(AlrTransform),
    Clr(ClrTransform),
    Ilr(IlrTransform),
    BoxCox(BoxCoxTransform),
}

macro_rules! delegate {
    ($self:expr, $inner:ident => $call:expr) => {
        match $self {
            AnyTransform::Linear($inner) => $call,
            AnyTransform::Alr($inner) => $call,
            AnyTransform::Clr($inner) => $call,
            AnyTransform::Ilr($inner) => $call,
            AnyTransform::BoxCox($inner) => $call,
        }
    };
}

impl Transformer for AnyTransform {
    fn name(&self) -> &'static str {
        delegate!(self, t => t.name())
    }

    fn fit(&mut self, data: &DMatrix<f64>) -> Result<()> {
        delegate!(self, t => t.fit(data))
    }

    fn is_fitted(&self) -> bool {
        delegate!(self, t => t.is_fitted())
    }

    fn reset(&mut self) {
        delegate!(self, t => t.reset())
    }

    fn transform(&mut self, data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        delegate!(self, t => t.transform(data))
    }

    fn inverse_transform(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        delegate!(self, t => t.inverse_transform(coords))
    }

    fn output_names(&self, part_names: &[String]) -> Vec<String> {
        delegate!(self, t => t.output_names(part_names))
    }

    fn params_json(&self) -> Result<String> {
        delegate!(self, t => t.params_json())
    }
}

/// Named transform configuration, stored as YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Name of the configuration.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Transform to apply.
    pub transform: TransformSpec,
}

impl TransformConfig {
    pub fn new(name: &str, transform: TransformSpec) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            transform,
        }
    }

    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(CodaError::from)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(CodaError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }
}

/// A fitted transformer together with the part names it was fitted on, so an
/// inverse can be run later (or in another process) with identical parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedTransform {
    pub part_names: Vec<String>,
    pub transform: AnyTransform,
}

impl FittedTransform {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(CodaError::from)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(CodaError::from)
    }

    /// Write JSON to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read JSON from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::close;
    use crate::transform::LambdaSpec;
    use approx::assert_relative_eq;

    fn create_test_data() -> DMatrix<f64> {
        let raw = DMatrix::from_row_slice(3, 3, &[
            60.0, 25.0, 15.0,
            55.0, 30.0, 15.0,
            70.0, 20.0, 10.0,
        ]);
        close(&raw).unwrap()
    }

    fn all_specs() -> Vec<TransformSpec> {
        vec![
            TransformSpec::Linear,
            TransformSpec::Alr { ref_idx: Some(0) },
            TransformSpec::Clr,
            TransformSpec::Ilr,
            TransformSpec::BoxCox {
                options: BoxCoxOptions::default(),
            },
        ]
    }

    #[test]
    fn test_every_spec_roundtrips() {
        let data = create_test_data();
        for spec in all_specs() {
            let mut tmr = spec.build();
            let out = tmr.transform(&data).unwrap();
            let back = tmr.inverse_transform(&out).unwrap();
            for (a, b) in data.iter().zip(back.iter()) {
                assert_relative_eq!(a, b, max_relative = 1e-10);
            }
        }
    }

    #[test]
    fn test_config_yaml_roundtrip() {
        let config = TransformConfig {
            name: "major-oxides".to_string(),
            description: Some("Box-Cox with fixed lambda".to_string()),
            transform: TransformSpec::BoxCox {
                options: BoxCoxOptions::fixed(0.25),
            },
        };
        let yaml = config.to_yaml().unwrap();
        let parsed = TransformConfig::from_yaml(&yaml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_config_from_handwritten_yaml() {
        let yaml = "name: oxides\ntransform:\n  kind: alr\n  ref_idx: 2\n";
        let config = TransformConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.transform, TransformSpec::Alr { ref_idx: Some(2) });
        assert_eq!(config.description, None);

        let yaml = "name: default\ntransform:\n  kind: box_cox\n";
        let config = TransformConfig::from_yaml(yaml).unwrap();
        match config.transform {
            TransformSpec::BoxCox { options } => assert_eq!(options.lambda, LambdaSpec::Fit),
            other => panic!("unexpected spec {:?}", other),
        }

        let yaml = "name: sqrt\ntransform:\n  kind: box_cox\n  options:\n    lambda:\n      mode: fixed\n      value: 0.5\n    shift:\n      mode: auto\n";
        let config = TransformConfig::from_yaml(yaml).unwrap();
        match config.transform {
            TransformSpec::BoxCox { options } => {
                assert_eq!(options.lambda, LambdaSpec::Fixed(0.5));
                assert_eq!(options.shift, crate::transform::ShiftSpec::Auto);
                assert_eq!(options.search, crate::transform::LambdaSearch::default());
            }
            other => panic!("unexpected spec {:?}", other),
        }
    }

    #[test]
    fn test_fitted_transform_json_preserves_inverse() {
        let data = create_test_data();
        let mut tmr = TransformSpec::BoxCox {
            options: BoxCoxOptions::default(),
        }
        .build();
        let out = tmr.transform(&data).unwrap();

        let fitted = FittedTransform {
            part_names: vec!["SiO2".into(), "Al2O3".into(), "MgO".into()],
            transform: tmr,
        };
        let restored = FittedTransform::from_json(&fitted.to_json().unwrap()).unwrap();
        assert!(restored.transform.is_fitted());

        let back = restored.transform.inverse_transform(&out).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_params_json_dispatch() {
        let data = create_test_data();
        let mut tmr = TransformSpec::Alr { ref_idx: Some(0) }.build();
        assert_eq!(tmr.params_json().unwrap(), "null");
        tmr.fit(&data).unwrap();
        let value: serde_json::Value = serde_json::from_str(&tmr.params_json().unwrap()).unwrap();
        assert_eq!(value["n_parts"], 3);
        assert_eq!(value["ref_idx"], 0);

        let mut tmr = TransformSpec::Clr.build();
        tmr.transform(&data).unwrap();
        assert_eq!(tmr.params_json().unwrap(), "3");
    }

    #[test]
    fn test_names_dispatch() {
        let names: Vec<&str> = all_specs().iter().map(|s| s.build().name()).collect();
        assert_eq!(names, vec!["linear", "alr", "clr", "ilr", "boxcox"]);
    }
}
