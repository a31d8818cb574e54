//! `DataFrame` module for named column containers.
//!
//! A `DataFrame` is the read-only dataset every task is built from. It is
//! loaded once (usually from CSV) and never mutated by the pipeline; folds
//! and holdout sets are produced with [`DataFrame::take_rows`].

use std::io::Read;
use std::path::Path;

use crate::error::{Result, TuneError};
use crate::primitives::{Matrix, Vector};

/// A minimal `DataFrame` with named `f32` columns.
///
/// # Examples
///
/// ```
/// use aprender_tune::data::DataFrame;
/// use aprender_tune::primitives::Vector;
///
/// let columns = vec![
///     ("x".to_string(), Vector::from_slice(&[1.0, 2.0, 3.0])),
///     ("y".to_string(), Vector::from_slice(&[4.0, 5.0, 6.0])),
/// ];
/// let df = DataFrame::new(columns).expect("DataFrame creation should succeed with valid columns");
/// assert_eq!(df.shape(), (3, 2));
/// ```
#[derive(Debug, Clone)]
pub struct DataFrame {
    columns: Vec<(String, Vector<f32>)>,
    n_rows: usize,
}

impl DataFrame {
    /// Creates a new `DataFrame` from named columns.
    ///
    /// # Errors
    ///
    /// Returns an error if columns have different lengths, a name is empty or
    /// duplicated, or no column is given.
    pub fn new(columns: Vec<(String, Vector<f32>)>) -> Result<Self> {
        if columns.is_empty() {
            return Err(TuneError::data("DataFrame must have at least one column"));
        }

        let n_rows = columns[0].1.len();

        for (name, col) in &columns {
            if col.len() != n_rows {
                return Err(TuneError::data(format!(
                    "column '{name}' has {} rows, expected {n_rows}",
                    col.len()
                )));
            }
            if name.is_empty() {
                return Err(TuneError::data("Column names cannot be empty"));
            }
        }

        let mut names: Vec<&str> = columns.iter().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        for pair in names.windows(2) {
            if pair[0] == pair[1] {
                return Err(TuneError::data(format!(
                    "duplicate column name '{}'",
                    pair[0]
                )));
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Reads a headered CSV file where every cell is numeric.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, a row is ragged, or a
    /// cell does not parse as a number.
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
            .map_err(|e| TuneError::data(format!("{}: {e}", path.display())))
    }

    /// Reads headered, all-numeric CSV from any reader.
    ///
    /// # Errors
    ///
    /// Returns an error on malformed CSV or non-numeric cells.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut values: Vec<Vec<f32>> = vec![Vec::new(); headers.len()];

        for (row_idx, record) in rdr.records().enumerate() {
            let record = record?;
            for (col_idx, cell) in record.iter().enumerate() {
                let value: f32 = cell.parse().map_err(|_| {
                    TuneError::data(format!(
                        "row {}, column '{}': '{cell}' is not numeric",
                        row_idx + 1,
                        headers[col_idx]
                    ))
                })?;
                values[col_idx].push(value);
            }
        }

        let columns = headers
            .into_iter()
            .zip(values)
            .map(|(name, data)| (name, Vector::from_vec(data)))
            .collect();
        Self::new(columns)
    }

    /// Returns the shape as (`n_rows`, `n_cols`).
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.n_rows, self.columns.len())
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Returns the column names in storage order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Whether a column with this name exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(n, _)| n == name)
    }

    /// Returns a reference to a column by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column doesn't exist.
    pub fn column(&self, name: &str) -> Result<&Vector<f32>> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| TuneError::data(format!("column '{name}' not found")))
    }

    /// Selects multiple columns by name, returning a new `DataFrame`.
    ///
    /// # Errors
    ///
    /// Returns an error if any column doesn't exist.
    pub fn select(&self, names: &[&str]) -> Result<Self> {
        if names.is_empty() {
            return Err(TuneError::data("Must select at least one column"));
        }

        let mut selected = Vec::with_capacity(names.len());
        for &name in names {
            let col = self.column(name)?;
            selected.push((name.to_string(), col.clone()));
        }

        Self::new(selected)
    }

    /// Returns a new `DataFrame` containing only the given rows.
    ///
    /// Column order is preserved; rows appear in the order of `indices`.
    ///
    /// # Errors
    ///
    /// Returns an error if an index is out of bounds.
    pub fn take_rows(&self, indices: &[usize]) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.n_rows) {
            return Err(TuneError::data(format!(
                "row index {bad} out of bounds (len={})",
                self.n_rows
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|(name, col)| (name.clone(), col.select(indices)))
            .collect();

        Ok(Self {
            columns,
            n_rows: indices.len(),
        })
    }

    /// Stacks the named columns into a row-major matrix.
    ///
    /// # Errors
    ///
    /// Returns an error if any column doesn't exist.
    pub fn to_matrix_of(&self, names: &[&str]) -> Result<Matrix<f32>> {
        let cols: Vec<&Vector<f32>> = names
            .iter()
            .map(|name| self.column(name))
            .collect::<Result<_>>()?;

        let mut data = Vec::with_capacity(self.n_rows * cols.len());
        for row_idx in 0..self.n_rows {
            for col in &cols {
                data.push(col[row_idx]);
            }
        }

        Matrix::from_vec(self.n_rows, cols.len(), data)
    }

    /// Converts the whole `DataFrame` to a Matrix with shape (`n_rows`, `n_cols`).
    #[must_use]
    pub fn to_matrix(&self) -> Matrix<f32> {
        let mut data = Vec::with_capacity(self.n_rows * self.columns.len());
        for row_idx in 0..self.n_rows {
            for (_, col) in &self.columns {
                data.push(col[row_idx]);
            }
        }
        // Length is n_rows * n_cols by construction.
        Matrix::from_vec(self.n_rows, self.columns.len(), data)
            .unwrap_or_else(|_| Matrix::zeros(self.n_rows, self.columns.len()))
    }

    /// Returns an iterator over columns as (name, vector) pairs.
    pub fn iter_columns(&self) -> impl Iterator<Item = (&str, &Vector<f32>)> {
        self.columns.iter().map(|(n, v)| (n.as_str(), v))
    }
}

#[cfg(test)]
#[path = "data_tests.rs"]
mod tests;
