//! Row-indexed table of named numeric columns
//!
//! Corrections only ever append columns. Rows keep their position and their
//! index label for the lifetime of the dataset, so series produced outside
//! the table (per-dataset REWS ratios, per-height production) can be aligned
//! back onto it by label.

use std::collections::{BTreeMap, HashMap, HashSet};

use thiserror::Error;

/// Errors raised while reading or writing dataset columns
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column {column} has {actual} values, dataset has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate index label {0}")]
    DuplicateIndex(usize),
}

/// A column of values keyed by row index label.
///
/// Produced by collaborators that compute their values away from the
/// dataset and hand them back for alignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    index: Vec<usize>,
    values: Vec<f64>,
}

impl Series {
    /// Build a series from parallel index labels and values. Labels must be
    /// unique.
    pub fn new(index: Vec<usize>, values: Vec<f64>) -> Result<Self, DatasetError> {
        if index.len() != values.len() {
            return Err(DatasetError::LengthMismatch {
                column: "series".to_string(),
                expected: index.len(),
                actual: values.len(),
            });
        }
        check_unique(&index)?;
        Ok(Self { index, values })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value stored under `label`, if present.
    pub fn get(&self, label: usize) -> Option<f64> {
        self.index
            .iter()
            .position(|&l| l == label)
            .map(|pos| self.values[pos])
    }

    /// Inner join on index label.
    ///
    /// Keeps only the labels present in every input series, in the order of
    /// the first series. Where several series carry a value for a kept label
    /// the first series wins. An empty input yields an empty series.
    pub fn inner_join(series: &[Self]) -> Self {
        let Some((first, rest)) = series.split_first() else {
            return Self::default();
        };

        let others: Vec<HashMap<usize, f64>> = rest
            .iter()
            .map(|s| s.index.iter().copied().zip(s.values.iter().copied()).collect())
            .collect();

        let (index, values) = first
            .index
            .iter()
            .zip(&first.values)
            .filter(|(label, _)| others.iter().all(|m| m.contains_key(*label)))
            .map(|(&label, &value)| (label, value))
            .unzip();

        Self { index, values }
    }
}

fn check_unique(index: &[usize]) -> Result<(), DatasetError> {
    let mut seen = HashSet::with_capacity(index.len());
    match index.iter().find(|&&label| !seen.insert(label)) {
        Some(&label) => Err(DatasetError::DuplicateIndex(label)),
        None => Ok(()),
    }
}

/// Shared table that every correction stage reads from and appends to.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    index: Vec<usize>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl Dataset {
    /// Empty dataset with index labels `0..rows`.
    pub fn with_rows(rows: usize) -> Self {
        Self {
            index: (0..rows).collect(),
            columns: BTreeMap::new(),
        }
    }

    /// Empty dataset with explicit index labels.
    pub fn with_index(index: Vec<usize>) -> Result<Self, DatasetError> {
        check_unique(&index)?;
        Ok(Self {
            index,
            columns: BTreeMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[usize] {
        &self.index
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Values of the named column.
    pub fn column(&self, name: &str) -> Result<&[f64], DatasetError> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DatasetError::ColumnNotFound(name.to_string()))
    }

    /// Insert (or overwrite) a column. Must have one value per row.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), DatasetError> {
        let name = name.into();
        if values.len() != self.len() {
            return Err(DatasetError::LengthMismatch {
                column: name,
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name, values);
        Ok(())
    }

    /// Insert a series aligned on index label. Rows missing from the
    /// series receive `NaN`.
    pub fn insert_series(&mut self, name: impl Into<String>, series: &Series) {
        let lookup: HashMap<usize, f64> = series
            .index
            .iter()
            .copied()
            .zip(series.values.iter().copied())
            .collect();
        let values = self
            .index
            .iter()
            .map(|label| lookup.get(label).copied().unwrap_or(f64::NAN))
            .collect();
        self.columns.insert(name.into(), values);
    }

    /// Borrow a single row.
    pub fn row(&self, position: usize) -> Row<'_> {
        Row {
            dataset: self,
            position,
        }
    }

    /// Evaluate `f` for every row in order, stopping at the first error.
    pub fn map_rows<E, F>(&self, mut f: F) -> Result<Vec<f64>, E>
    where
        F: FnMut(&Row<'_>) -> Result<f64, E>,
    {
        (0..self.len()).map(|position| f(&self.row(position))).collect()
    }
}

/// Read-only view of one dataset row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    dataset: &'a Dataset,
    position: usize,
}

impl Row<'_> {
    /// Index label of this row.
    pub fn label(&self) -> usize {
        self.dataset.index[self.position]
    }

    /// Value of `column` in this row.
    pub fn get(&self, column: &str) -> Result<f64, DatasetError> {
        self.dataset
            .column(column)
            .map(|values| values[self.position])
    }
}
