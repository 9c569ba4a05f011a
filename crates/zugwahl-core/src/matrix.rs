//! Flat row-major feature matrix.
//!
//! The pack deliberately avoids a linear-algebra dependency; classifiers
//! here work on contiguous `Vec<f32>` storage with explicit strides.

use crate::error::{PolicyError, Result};

/// Dense row-major matrix of `f32` features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    data: Vec<f32>,
    rows: usize,
    cols: usize,
}

impl FeatureMatrix {
    /// Create an empty matrix with a fixed column count.
    #[must_use]
    pub fn new(cols: usize) -> Self {
        Self {
            data: Vec::new(),
            rows: 0,
            cols,
        }
    }

    /// Append one row. The row width must match the matrix width.
    pub fn push_row(&mut self, row: &[f32]) -> Result<()> {
        if row.len() != self.cols {
            return Err(PolicyError::InvalidFeatureShape(format!(
                "row has {} columns, matrix has {}",
                row.len(),
                self.cols
            )));
        }
        self.data.extend_from_slice(row);
        self.rows += 1;
        Ok(())
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    /// Panics if `i >= rows()`; callers iterate `0..rows()`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over all rows in order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.cols.max(1)).take(self.rows)
    }

    /// New matrix holding the given rows of `self`, in the given order.
    ///
    /// Used by cross-validation to carve train/validation folds.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self> {
        let mut out = Self::new(self.cols);
        for &i in indices {
            if i >= self.rows {
                return Err(PolicyError::InvalidFeatureShape(format!(
                    "row index {i} out of bounds for {} rows",
                    self.rows
                )));
            }
            out.push_row(self.row(i))?;
        }
        Ok(out)
    }
}
