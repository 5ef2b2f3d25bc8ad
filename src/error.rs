//! Error types for the geocoda library.

use thiserror::Error;

/// Broad classification of a [`CodaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value lies outside the domain of the operation (non-positive parts,
    /// zero reference, zero-sum row, invalid inverse input).
    Domain,
    /// Matrix or basis dimensions do not agree.
    Shape,
    /// A configuration value or lifecycle precondition is invalid.
    Parameter,
    /// Reading or writing external data failed.
    Io,
}

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum CodaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value '{value}' at row {row}, column {col}")]
    InvalidValue { value: String, row: usize, col: usize },

    #[error("Negative component {value} at row {row}, column {col}; composition parts must be non-negative")]
    NegativeComponent { row: usize, col: usize, value: f64 },

    #[error("Non-finite component {value} at row {row}, column {col}")]
    NonFiniteComponent { row: usize, col: usize, value: f64 },

    #[error("{transform} requires positive values; found {value} at row {row}, column {col}")]
    NonPositive {
        transform: &'static str,
        row: usize,
        col: usize,
        value: f64,
    },

    #[error("Zero reference component at row {row} (reference column {col})")]
    ZeroReference { row: usize, col: usize },

    #[error("Row {row} sums to zero, cannot close")]
    ZeroSum { row: usize },

    #[error("Inverse Box-Cox undefined for {value} at row {row}, column {col}")]
    InverseOutOfDomain { row: usize, col: usize, value: f64 },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid ILR basis: {0}")]
    InvalidBasis(String),

    #[error("Invariant violated: {0}")]
    InvariantViolated(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0} has not been fitted")]
    NotFitted(&'static str),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodaError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CodaError::NegativeComponent { .. }
            | CodaError::NonFiniteComponent { .. }
            | CodaError::NonPositive { .. }
            | CodaError::ZeroReference { .. }
            | CodaError::ZeroSum { .. }
            | CodaError::InverseOutOfDomain { .. }
            | CodaError::InvariantViolated(_) => ErrorKind::Domain,
            CodaError::DimensionMismatch { .. }
            | CodaError::InvalidBasis(_)
            | CodaError::EmptyData(_) => ErrorKind::Shape,
            CodaError::InvalidParameter(_) | CodaError::NotFitted(_) => ErrorKind::Parameter,
            CodaError::Io(_)
            | CodaError::InvalidValue { .. }
            | CodaError::Yaml(_)
            | CodaError::Json(_) => ErrorKind::Io,
        }
    }

    /// True for domain errors (non-positivity, zero reference, zero sum).
    pub fn is_domain(&self) -> bool {
        self.kind() == ErrorKind::Domain
    }

    /// True for shape errors (dimension or basis mismatch).
    pub fn is_shape(&self) -> bool {
        self.kind() == ErrorKind::Shape
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, CodaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert!(CodaError::ZeroReference { row: 0, col: 0 }.is_domain());
        assert!(CodaError::DimensionMismatch { expected: 3, actual: 2 }.is_shape());
        assert_eq!(
            CodaError::NotFitted("ILR").kind(),
            ErrorKind::Parameter
        );
    }

    #[test]
    fn test_message_names_violation() {
        let err = CodaError::NonPositive {
            transform: "CLR",
            row: 1,
            col: 2,
            value: 0.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("CLR"));
        assert!(msg.contains("row 1"));
    }
}
