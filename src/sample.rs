//! Labeled input samples.

use crate::error::Result;
use crate::feature_map::FeatureMap;
use serde::{Deserialize, Serialize};

/// An immutable 2D input matrix with an optional class label.
///
/// The label is ground truth for training and evaluation only; the engine
/// never changes it. `None` marks a sample whose class is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    matrix: FeatureMap,
    label: Option<usize>,
}

impl Sample {
    /// Labeled sample.
    pub fn new(matrix: FeatureMap, label: usize) -> Self {
        Self {
            matrix,
            label: Some(label),
        }
    }

    /// Sample whose class is unknown (e.g. digits cut out of a photo).
    pub fn unlabeled(matrix: FeatureMap) -> Self {
        Self {
            matrix,
            label: None,
        }
    }

    /// Build from nested rows; fails on empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<f64>>, label: Option<usize>) -> Result<Self> {
        Ok(Self {
            matrix: FeatureMap::from_rows(rows)?,
            label,
        })
    }

    pub fn matrix(&self) -> &FeatureMap {
        &self.matrix
    }

    pub fn label(&self) -> Option<usize> {
        self.label
    }

    pub fn rows(&self) -> usize {
        self.matrix.rows()
    }

    pub fn cols(&self) -> usize {
        self.matrix.cols()
    }
}
