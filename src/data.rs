//! Contiguous sample storage.
//!
//! The training loop walks samples by index. [`Dataset`] validates the
//! per-row shapes once up front and stores features and labels row-major.

use crate::{Error, Result};

/// Supervised samples: inputs (X) and labels (Y).
///
/// - `inputs.len() == len * input_dim`
/// - `labels.len() == len * label_dim`
#[derive(Debug, Clone)]
pub struct Dataset {
    inputs: Vec<f64>,
    labels: Vec<f64>,
    len: usize,
    input_dim: usize,
    label_dim: usize,
}

impl Dataset {
    /// Build a dataset from flat buffers. At least one sample is required.
    pub fn from_flat(
        inputs: Vec<f64>,
        labels: Vec<f64>,
        input_dim: usize,
        label_dim: usize,
    ) -> Result<Self> {
        if input_dim == 0 || label_dim == 0 {
            return Err(Error::InvalidData(format!(
                "input_dim and label_dim must be > 0, got {input_dim} and {label_dim}"
            )));
        }
        if !inputs.len().is_multiple_of(input_dim) {
            return Err(Error::InvalidData(format!(
                "inputs length {} is not divisible by input_dim {input_dim}",
                inputs.len()
            )));
        }
        let len = inputs.len() / input_dim;
        if len == 0 {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }
        if labels.len() != len * label_dim {
            return Err(Error::InvalidData(format!(
                "labels length {} does not match len * label_dim ({len} * {label_dim})",
                labels.len()
            )));
        }

        Ok(Self {
            inputs,
            labels,
            len,
            input_dim,
            label_dim,
        })
    }

    /// Build a dataset from per-sample rows (copies into contiguous storage).
    pub fn from_rows(inputs: &[Vec<f64>], labels: &[Vec<f64>]) -> Result<Self> {
        if inputs.len() != labels.len() {
            return Err(Error::InvalidData(format!(
                "inputs/labels length mismatch: {} vs {}",
                inputs.len(),
                labels.len()
            )));
        }
        if inputs.is_empty() {
            return Err(Error::InvalidData("dataset must not be empty".to_owned()));
        }

        let inputs_flat = flatten("input", inputs)?;
        let labels_flat = flatten("label", labels)?;
        Self::from_flat(inputs_flat, labels_flat, inputs[0].len(), labels[0].len())
    }

    #[inline]
    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    #[inline]
    pub fn label_dim(&self) -> usize {
        self.label_dim
    }

    /// Returns the `idx`-th input row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn input(&self, idx: usize) -> &[f64] {
        let start = idx * self.input_dim;
        &self.inputs[start..start + self.input_dim]
    }

    /// Returns the `idx`-th label row.
    ///
    /// Panics if `idx >= len`.
    #[inline]
    pub fn label(&self, idx: usize) -> &[f64] {
        let start = idx * self.label_dim;
        &self.labels[start..start + self.label_dim]
    }
}

fn flatten(what: &str, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
    let dim = rows[0].len();
    let mut flat = Vec::with_capacity(rows.len() * dim);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != dim {
            return Err(Error::InvalidData(format!(
                "{what} row {i} has len {}, expected {dim}",
                row.len()
            )));
        }
        flat.extend_from_slice(row);
    }
    Ok(flat)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_flat_validates_shapes() {
        let ok = Dataset::from_flat(vec![0.0, 1.0, 2.0, 3.0], vec![0.0, 1.0], 2, 1).unwrap();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok.input(1), &[2.0, 3.0]);
        assert_eq!(ok.label(1), &[1.0]);

        assert!(Dataset::from_flat(vec![0.0, 1.0, 2.0], vec![0.0], 2, 1).is_err());
    }

    #[test]
    fn from_flat_rejects_zero_samples() {
        let err = Dataset::from_flat(vec![], vec![], 2, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn from_rows_rejects_ragged_rows() {
        let xs = vec![vec![0.0, 1.0], vec![1.0]];
        let ys = vec![vec![1.0], vec![0.0]];
        assert!(Dataset::from_rows(&xs, &ys).is_err());
        assert!(Dataset::from_rows(&xs[..1], &ys).is_err());
        assert!(Dataset::from_rows(&[], &[]).is_err());
    }
}
