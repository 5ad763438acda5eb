use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{DataError, FdResult, ModelError};

/// Binary transaction label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Label {
    Legitimate,
    Fraud,
}

impl Label {
    /// Both classes in index order (0, 1).
    pub const ALL: [Label; 2] = [Label::Legitimate, Label::Fraud];

    pub fn index(self) -> usize {
        match self {
            Label::Legitimate => 0,
            Label::Fraud => 1,
        }
    }

    /// Interpret a numeric label. Only exact 0 and 1 are accepted.
    pub fn from_value(value: f64) -> Option<Self> {
        if value == 0.0 {
            Some(Label::Legitimate)
        } else if value == 1.0 {
            Some(Label::Fraud)
        } else {
            None
        }
    }

    pub fn as_f64(self) -> f64 {
        self.index() as f64
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Legitimate => write!(f, "legitimate"),
            Label::Fraud => write!(f, "fraud"),
        }
    }
}

/// A labeled transaction dataset. Feature order is positional and must match
/// the order used at scoring time.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDataset {
    feature_names: Vec<String>,
    features: Array2<f64>,
    labels: Vec<Label>,
}

impl LabeledDataset {
    pub fn new(
        feature_names: Vec<String>,
        features: Array2<f64>,
        labels: Vec<Label>,
    ) -> FdResult<Self> {
        if features.nrows() != labels.len() {
            return Err(DataError::InvalidFormat {
                message: format!(
                    "{} feature rows but {} labels",
                    features.nrows(),
                    labels.len()
                ),
            }
            .into());
        }
        if feature_names.len() != features.ncols() {
            return Err(DataError::InvalidFormat {
                message: format!(
                    "{} feature names for {} feature columns",
                    feature_names.len(),
                    features.ncols()
                ),
            }
            .into());
        }

        Ok(Self {
            feature_names,
            features,
            labels,
        })
    }

    /// Build a dataset from row vectors, naming features `f0..fN`.
    pub fn from_rows(rows: Vec<Vec<f64>>, labels: Vec<Label>) -> FdResult<Self> {
        let n_features = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut flat = Vec::with_capacity(rows.len() * n_features);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(DataError::RaggedRow {
                    line: i + 1,
                    expected: n_features,
                    found: row.len(),
                }
                .into());
            }
            flat.extend_from_slice(row);
        }
        let features = Array2::from_shape_vec((rows.len(), n_features), flat).map_err(|e| {
            DataError::InvalidFormat {
                message: e.to_string(),
            }
        })?;
        let names = (0..n_features).map(|i| format!("f{i}")).collect();
        Self::new(names, features, labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.features.row(index)
    }

    /// Number of rows per class, indexed by [`Label::index`].
    pub fn class_counts(&self) -> [usize; 2] {
        let mut counts = [0usize; 2];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }

    /// Copy the given rows (in the given order) into a new dataset.
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: self.features.select(Axis(0), indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

/// Canonical scoring input: an ordered batch of feature rows.
///
/// Rows are not yet checked against a model's dimensionality; that check
/// happens in [`FeatureBatch::to_matrix`] and is a model concern.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureBatch {
    rows: Vec<Vec<f64>>,
}

impl FeatureBatch {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn single(row: Vec<f64>) -> Self {
        Self { rows: vec![row] }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Pack the rows into a matrix with exactly `n_features` columns.
    pub fn to_matrix(&self, n_features: usize) -> Result<Array2<f64>, ModelError> {
        let mut flat = Vec::with_capacity(self.rows.len() * n_features);
        for (row_index, row) in self.rows.iter().enumerate() {
            if row.len() != n_features {
                return Err(ModelError::DimensionMismatch {
                    row: row_index,
                    expected: n_features,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }
        Array2::from_shape_vec((self.rows.len(), n_features), flat).map_err(|e| {
            ModelError::Corrupt {
                message: e.to_string(),
            }
        })
    }
}
