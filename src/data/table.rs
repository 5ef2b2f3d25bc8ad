//! Composition table: a dense samples × parts matrix with labels.

use crate::error::{CodaError, Result};
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A dense matrix of compositions or coordinates with row and column labels.
///
/// Rows represent samples, columns represent parts (or transformed coordinates).
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionTable {
    data: DMatrix<f64>,
    sample_ids: Vec<String>,
    part_names: Vec<String>,
}

impl CompositionTable {
    /// Create a table, checking that the labels match the matrix shape.
    pub fn new(data: DMatrix<f64>, sample_ids: Vec<String>, part_names: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != sample_ids.len() {
            return Err(CodaError::DimensionMismatch {
                expected: nrows,
                actual: sample_ids.len(),
            });
        }
        if ncols != part_names.len() {
            return Err(CodaError::DimensionMismatch {
                expected: ncols,
                actual: part_names.len(),
            });
        }
        Ok(Self {
            data,
            sample_ids,
            part_names,
        })
    }

    /// Load a table from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with part names (first column is the sample ID header)
    /// - Subsequent rows: sample ID followed by values
    ///
    /// `NA` and empty cells are read as NaN, as are missing trailing cells.
    /// A row with more values than the header has parts is rejected.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Parse a table from any buffered reader in the TSV format of [`Self::from_tsv`].
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| CodaError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(CodaError::EmptyData(
                "TSV must have at least one part column".to_string(),
            ));
        }
        let part_names: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_parts = part_names.len();

        let mut values: Vec<f64> = Vec::new();
        let mut sample_ids: Vec<String> = Vec::new();

        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let row = sample_ids.len();
            let fields: Vec<&str> = line.split('\t').collect();
            let n_fields = fields
                .iter()
                .rposition(|f| !f.trim().is_empty())
                .unwrap_or(0);
            if n_fields > n_parts {
                return Err(CodaError::DimensionMismatch {
                    expected: n_parts,
                    actual: n_fields,
                });
            }
            sample_ids.push(fields[0].to_string());

            for col in 0..n_parts {
                let raw = fields.get(col + 1).map(|s| s.trim()).unwrap_or("");
                let value = if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
                    f64::NAN
                } else {
                    raw.parse::<f64>().map_err(|_| CodaError::InvalidValue {
                        value: raw.to_string(),
                        row,
                        col,
                    })?
                };
                values.push(value);
            }
        }

        if sample_ids.is_empty() {
            return Err(CodaError::EmptyData("No samples in TSV".to_string()));
        }

        let data = DMatrix::from_row_slice(sample_ids.len(), n_parts, &values);
        Self::new(data, sample_ids, part_names)
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(BufWriter::new(file))
    }

    /// Write the table in TSV format to any writer.
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        write!(writer, "sample_id")?;
        for name in &self.part_names {
            write!(writer, "\t{}", name)?;
        }
        writeln!(writer)?;

        for (i, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            for j in 0..self.n_parts() {
                write!(writer, "\t{}", self.data[(i, j)])?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Replace the data, keeping sample IDs, with new column labels.
    pub fn with_data(&self, data: DMatrix<f64>, part_names: Vec<String>) -> Result<Self> {
        Self::new(data, self.sample_ids.clone(), part_names)
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of parts (columns).
    #[inline]
    pub fn n_parts(&self) -> usize {
        self.data.ncols()
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Part (column) names.
    #[inline]
    pub fn part_names(&self) -> &[String] {
        &self.part_names
    }

    /// Get reference to the underlying matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Position of a named part.
    pub fn part_index(&self, name: &str) -> Option<usize> {
        self.part_names.iter().position(|p| p == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const TSV: &str = "sample_id\tSiO2\tAl2O3\tMgO\n\
                       S1\t50.1\t15.2\t8.3\n\
                       S2\t48.7\tNA\t9.9\n";

    #[test]
    fn test_from_reader() {
        let table = CompositionTable::from_reader(Cursor::new(TSV)).unwrap();
        assert_eq!(table.n_samples(), 2);
        assert_eq!(table.n_parts(), 3);
        assert_eq!(table.part_names(), &["SiO2", "Al2O3", "MgO"]);
        assert_eq!(table.data()[(0, 1)], 15.2);
        assert!(table.data()[(1, 1)].is_nan());
        assert_eq!(table.part_index("MgO"), Some(2));
    }

    #[test]
    fn test_invalid_value() {
        let bad = "id\tA\tB\nS1\t1.0\tabc\n";
        let err = CompositionTable::from_reader(Cursor::new(bad)).unwrap_err();
        assert!(matches!(err, CodaError::InvalidValue { row: 0, col: 1, .. }));
    }

    #[test]
    fn test_rejects_row_longer_than_header() {
        let long = "id\tA\tB\nS1\t1.0\t2.0\t3.0\n";
        let err = CompositionTable::from_reader(Cursor::new(long)).unwrap_err();
        assert!(matches!(err, CodaError::DimensionMismatch { expected: 2, actual: 3 }));

        let trailing_tab = "id\tA\tB\nS1\t1.0\t2.0\t\n";
        let table = CompositionTable::from_reader(Cursor::new(trailing_tab)).unwrap();
        assert_eq!(table.data()[(0, 1)], 2.0);

        let short = "id\tA\tB\nS1\t1.0\n";
        let table = CompositionTable::from_reader(Cursor::new(short)).unwrap();
        assert!(table.data()[(0, 1)].is_nan());
    }

    #[test]
    fn test_write_then_read() {
        let table = CompositionTable::from_reader(Cursor::new(TSV)).unwrap();
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        let reread = CompositionTable::from_reader(Cursor::new(buf)).unwrap();
        assert_eq!(reread.sample_ids(), table.sample_ids());
        assert_eq!(reread.data()[(0, 0)], 50.1);
    }

    #[test]
    fn test_new_dimension_mismatch() {
        let data = DMatrix::zeros(2, 2);
        assert!(CompositionTable::new(data, vec!["S1".into()], vec!["A".into(), "B".into()]).is_err());
    }
}
