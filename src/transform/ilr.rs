//! Isometric Log-Ratio (ILR) transformation for compositional data.
//!
//! ILR projects CLR coordinates onto an orthonormal basis of the zero-sum
//! hyperplane `{v in R^D : sum(v) = 0}`, giving D-1 coordinates in which
//! Euclidean distance equals the Aitchison distance between compositions.
//!
//! The default basis is the Helmert sub-matrix, built from D alone, so a
//! transform and its inverse can be run independently and still agree
//! bit-for-bit.

use super::clr::{clr, inv_clr};
use crate::error::{CodaError, Result};
use crate::tolerance;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Orthonormal basis of the CLR hyperplane, stored as a D × (D-1) matrix
/// whose columns are the basis vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DMatrix<f64>", into = "DMatrix<f64>")]
pub struct IlrBasis {
    matrix: DMatrix<f64>,
}

impl IlrBasis {
    /// Helmert basis for a `n_parts`-part composition.
    ///
    /// Column k (1-based, k = 1..D-1) holds `1/sqrt(k(k+1))` in the first k
    /// rows, `-k/sqrt(k(k+1))` in row k+1 and zeros below.
    pub fn helmert(n_parts: usize) -> Result<Self> {
        if n_parts == 0 {
            return Err(CodaError::InvalidParameter(
                "ILR basis needs at least one part".to_string(),
            ));
        }

        let mut matrix = DMatrix::zeros(n_parts, n_parts - 1);
        for col in 0..n_parts - 1 {
            let k = (col + 1) as f64;
            let norm = (k * (k + 1.0)).sqrt();
            for row in 0..=col {
                matrix[(row, col)] = 1.0 / norm;
            }
            matrix[(col + 1, col)] = -k / norm;
        }

        Ok(Self { matrix })
    }

    /// Wrap a caller-supplied basis after checking that it is D × (D-1),
    /// orthonormal and zero-sum.
    pub fn from_matrix(matrix: DMatrix<f64>) -> Result<Self> {
        let (n_parts, n_coords) = matrix.shape();
        if n_parts == 0 {
            return Err(CodaError::InvalidBasis("basis has no rows".to_string()));
        }
        if n_coords + 1 != n_parts {
            return Err(CodaError::InvalidBasis(format!(
                "expected {} x {} matrix, got {} x {}",
                n_parts,
                n_parts - 1,
                n_parts,
                n_coords
            )));
        }

        for col in 0..n_coords {
            let sum = matrix.column(col).sum();
            if sum.abs() > tolerance::BASIS {
                return Err(CodaError::InvalidBasis(format!(
                    "column {} sums to {} instead of 0",
                    col, sum
                )));
            }
        }

        let gram = matrix.transpose() * &matrix;
        for a in 0..n_coords {
            for b in 0..n_coords {
                let expected = if a == b { 1.0 } else { 0.0 };
                if (gram[(a, b)] - expected).abs() > tolerance::BASIS {
                    return Err(CodaError::InvalidBasis(format!(
                        "columns {} and {} are not orthonormal (dot = {})",
                        a,
                        b,
                        gram[(a, b)]
                    )));
                }
            }
        }

        Ok(Self { matrix })
    }

    /// Number of composition parts D.
    pub fn n_parts(&self) -> usize {
        self.matrix.nrows()
    }

    /// Number of ILR coordinates (D-1).
    pub fn n_coords(&self) -> usize {
        self.matrix.ncols()
    }

    /// Get reference to the underlying matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    /// Project CLR coordinates (N × D) onto the basis (N × (D-1)).
    pub fn project(&self, clr_coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if clr_coords.ncols() != self.n_parts() {
            return Err(CodaError::DimensionMismatch {
                expected: self.n_parts(),
                actual: clr_coords.ncols(),
            });
        }
        Ok(clr_coords * &self.matrix)
    }

    /// Map ILR coordinates (N × (D-1)) back to CLR coordinates (N × D).
    pub fn unproject(&self, coords: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        if coords.ncols() != self.n_coords() {
            return Err(CodaError::DimensionMismatch {
                expected: self.n_coords(),
                actual: coords.ncols(),
            });
        }
        Ok(coords * self.matrix.transpose())
    }
}

impl TryFrom<DMatrix<f64>> for IlrBasis {
    type Error = CodaError;

    fn try_from(matrix: DMatrix<f64>) -> Result<Self> {
        Self::from_matrix(matrix)
    }
}

impl From<IlrBasis> for DMatrix<f64> {
    fn from(basis: IlrBasis) -> Self {
        basis.matrix
    }
}

/// Apply the ILR transformation with the Helmert basis for `data.ncols()` parts.
pub fn ilr(data: &DMatrix<f64>) -> Result<DMatrix<f64>> {
    let basis = IlrBasis::helmert(data.ncols().max(1))?;
    ilr_with_basis(data, &basis)
}

/// Apply the ILR transformation with a given basis.
pub fn ilr_with_basis(data: &DMatrix<f64>, basis: &IlrBasis) -> Result<DMatrix<f64>> {
    if data.ncols() != basis.n_parts() {
        return Err(CodaError::DimensionMismatch {
            expected: basis.n_parts(),
            actual: data.ncols(),
        });
    }
    let coords = basis.project(&clr(data)?)?;
    debug!(
        n_rows = coords.nrows(),
        n_parts = basis.n_parts(),
        "applied ILR"
    );
    Ok(coords)
}

/// Inverse ILR with the Helmert basis.
///
/// The number of parts D is taken from `reference` when given (only its
/// column count is used), otherwise from `coords.ncols() + 1`.
///
/// # Errors
/// `DimensionMismatch` if `coords` does not have D-1 columns.
pub fn inv_ilr(coords: &DMatrix<f64>, reference: Option<&DMatrix<f64>>) -> Result<DMatrix<f64>> {
    let n_parts = match reference {
        Some(reference) if reference.ncols() == 0 => {
            return Err(CodaError::EmptyData(
                "Reference composition has no parts".to_string(),
            ))
        }
        Some(reference) => reference.ncols(),
        None => coords.ncols() + 1,
    };

    if coords.ncols() + 1 != n_parts {
        return Err(CodaError::DimensionMismatch {
            expected: n_parts - 1,
            actual: coords.ncols(),
        });
    }

    let basis = IlrBasis::helmert(n_parts)?;
    inv_ilr_with_basis(coords, &basis)
}

/// Inverse ILR with a given basis: unproject to CLR, then inverse CLR.
pub fn inv_ilr_with_basis(coords: &DMatrix<f64>, basis: &IlrBasis) -> Result<DMatrix<f64>> {
    if coords.nrows() == 0 {
        return Err(CodaError::EmptyData(
            "Cannot apply inverse ILR to empty matrix".to_string(),
        ));
    }
    inv_clr(&basis.unproject(coords)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::closure::close;
    use crate::transform::clr::aitchison_distance;
    use approx::assert_relative_eq;

    fn create_test_data() -> DMatrix<f64> {
        let raw = DMatrix::from_row_slice(3, 5, &[
            48.0, 14.0, 11.0, 9.0, 3.0,
            55.0, 16.0, 8.0, 5.0, 4.0,
            72.0, 13.0, 2.0, 1.0, 6.0,
        ]);
        close(&raw).unwrap()
    }

    #[test]
    fn test_helmert_orthonormal_and_zero_sum() {
        for d in 1..8 {
            let basis = IlrBasis::helmert(d).unwrap();
            assert_eq!(basis.matrix().shape(), (d, d - 1));
            // revalidate through the checked constructor
            IlrBasis::from_matrix(basis.matrix().clone()).unwrap();
        }
    }

    #[test]
    fn test_helmert_known_values() {
        let basis = IlrBasis::helmert(3).unwrap();
        let m = basis.matrix();
        assert_relative_eq!(m[(0, 0)], 1.0 / 2.0_f64.sqrt(), epsilon = 1e-15);
        assert_relative_eq!(m[(1, 0)], -1.0 / 2.0_f64.sqrt(), epsilon = 1e-15);
        assert_eq!(m[(2, 0)], 0.0);
        assert_relative_eq!(m[(2, 1)], -2.0 / 6.0_f64.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_helmert_is_deterministic() {
        assert_eq!(IlrBasis::helmert(6).unwrap(), IlrBasis::helmert(6).unwrap());
    }

    #[test]
    fn test_ilr_dimensions() {
        let data = create_test_data();
        let coords = ilr(&data).unwrap();
        assert_eq!(coords.shape(), (3, 4));
        let back = inv_ilr(&coords, Some(&data)).unwrap();
        assert_eq!(back.shape(), (3, 5));
    }

    #[test]
    fn test_ilr_roundtrip() {
        let data = create_test_data();
        let back = inv_ilr(&ilr(&data).unwrap(), Some(&data)).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_ilr_roundtrip_without_reference() {
        let data = create_test_data();
        let back = inv_ilr(&ilr(&data).unwrap(), None).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_ilr_is_isometric() {
        let data = create_test_data();
        let coords = ilr(&data).unwrap();

        let row = |m: &DMatrix<f64>, i: usize| m.row(i).iter().cloned().collect::<Vec<f64>>();
        let aitchison = aitchison_distance(&row(&data, 0), &row(&data, 2)).unwrap();
        let euclidean: f64 = (0..coords.ncols())
            .map(|j| (coords[(0, j)] - coords[(2, j)]).powi(2))
            .sum::<f64>()
            .sqrt();
        assert_relative_eq!(aitchison, euclidean, epsilon = 1e-10);
    }

    #[test]
    fn test_inv_ilr_reference_mismatch() {
        let data = create_test_data();
        let coords = ilr(&data).unwrap();
        let wrong = DMatrix::from_element(1, 3, 1.0 / 3.0);
        let err = inv_ilr(&coords, Some(&wrong)).unwrap_err();
        assert!(matches!(err, CodaError::DimensionMismatch { expected: 2, actual: 4 }));
    }

    #[test]
    fn test_from_matrix_rejects_non_orthonormal() {
        let m = DMatrix::from_row_slice(3, 2, &[
            1.0, 1.0,
            -1.0, 0.0,
            0.0, -1.0,
        ]);
        assert!(matches!(
            IlrBasis::from_matrix(m),
            Err(CodaError::InvalidBasis(_))
        ));
    }

    #[test]
    fn test_custom_basis_roundtrip() {
        // sign-flipped Helmert basis is still orthonormal
        let flipped = -IlrBasis::helmert(5).unwrap().matrix().clone();
        let basis = IlrBasis::from_matrix(flipped).unwrap();
        let data = create_test_data();
        let coords = ilr_with_basis(&data, &basis).unwrap();
        let back = inv_ilr_with_basis(&coords, &basis).unwrap();
        for (a, b) in data.iter().zip(back.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-10);
        }
    }

    #[test]
    fn test_basis_serde_validates() {
        let basis = IlrBasis::helmert(4).unwrap();
        let json = serde_json::to_string(&basis).unwrap();
        let restored: IlrBasis = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.n_parts(), 4);
    }
}
