//! Feature maps and the data flowing between layers
//!
//! A [`FeatureMap`] is a dense row-major 2D matrix. Convolution and pooling
//! stages exchange ordered lists of equally-shaped maps (one per channel),
//! fully connected stages exchange flat vectors. [`Activation`] carries either
//! form and [`flatten`] / [`unflatten`] convert between them.

use crate::error::{ConvNetError, Result};
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// Channel / row / column extent of the data a layer consumes or produces.
///
/// Fully connected layers describe their vectors as `1 × 1 × length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub channels: usize,
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub const fn new(channels: usize, rows: usize, cols: usize) -> Self {
        Self {
            channels,
            rows,
            cols,
        }
    }

    /// Shape of a plain vector of `length` values.
    pub const fn flat(length: usize) -> Self {
        Self::new(1, 1, length)
    }

    /// Total number of scalar values.
    pub fn elements(&self) -> usize {
        self.channels * self.rows * self.cols
    }

    /// True when the shape describes a vector rather than spatial maps.
    pub fn is_flat(&self) -> bool {
        self.channels == 1 && self.rows == 1
    }
}

/// A single 2D real-valued matrix stored row-major.
///
/// Deserialized maps go through [`FeatureMap::from_vec`], so a buffer that
/// does not hold exactly `rows * cols` values is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureMap")]
pub struct FeatureMap {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawFeatureMap {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawFeatureMap> for FeatureMap {
    type Error = ConvNetError;

    fn try_from(raw: RawFeatureMap) -> Result<Self> {
        FeatureMap::from_vec(raw.rows, raw.cols, raw.data)
    }
}

impl FeatureMap {
    /// Zero-filled map of the given size.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Map with every cell set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wrap an existing row-major buffer.
    ///
    /// Fails when `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(ConvNetError::ShapeMismatch {
                context: "feature map buffer",
                expected: rows * cols,
                actual: data.len(),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a map from nested rows. Rows must be non-empty and equally long.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        if row_count == 0 || col_count == 0 {
            return Err(ConvNetError::MalformedMatrix("matrix is empty".to_string()));
        }

        let mut data = Vec::with_capacity(row_count * col_count);
        for (r, row) in rows.into_iter().enumerate() {
            if row.len() != col_count {
                return Err(ConvNetError::MalformedMatrix(format!(
                    "row {} has {} columns, expected {}",
                    r,
                    row.len(),
                    col_count
                )));
            }
            data.extend(row);
        }

        Ok(Self {
            rows: row_count,
            cols: col_count,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row-major view of the values.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Copy of the map as nested rows.
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.cols.max(1)).map(<[f64]>::to_vec).collect()
    }

    /// Sum of every cell.
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// New map with every cell multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    /// New map mirrored along both axes (a 180 degree rotation).
    pub fn flipped(&self) -> Self {
        let mut data = self.data.clone();
        data.reverse();
        Self {
            rows: self.rows,
            cols: self.cols,
            data,
        }
    }

    /// Add `other` cell by cell over the region both maps cover.
    ///
    /// Cells of `other` outside this map are dropped and cells of this map
    /// outside `other` are left untouched.
    pub fn accumulate(&mut self, other: &FeatureMap) {
        let rows = self.rows.min(other.rows);
        let cols = self.cols.min(other.cols);
        for r in 0..rows {
            for c in 0..cols {
                self[(r, c)] += other[(r, c)];
            }
        }
    }
}

impl Index<(usize, usize)> for FeatureMap {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for FeatureMap {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        &mut self.data[row * self.cols + col]
    }
}

/// Concatenate equally-shaped maps into one row-major vector.
///
/// Channel `l`, row `r`, column `c` lands at `l * rows * cols + r * cols + c`.
pub fn flatten(maps: &[FeatureMap]) -> Result<Vec<f64>> {
    let Some(first) = maps.first() else {
        return Ok(Vec::new());
    };
    let mut vector = Vec::with_capacity(maps.len() * first.data.len());
    for map in maps {
        check_map_shape(map, first.rows, first.cols, "flatten")?;
        vector.extend_from_slice(&map.data);
    }
    Ok(vector)
}

/// Split a row-major vector into `channels` maps of `rows × cols`.
///
/// Inverse of [`flatten`]; fails unless `vector.len() == channels * rows * cols`.
pub fn unflatten(
    vector: &[f64],
    channels: usize,
    rows: usize,
    cols: usize,
) -> Result<Vec<FeatureMap>> {
    let expected = channels * rows * cols;
    if vector.len() != expected {
        return Err(ConvNetError::ShapeMismatch {
            context: "unflatten",
            expected,
            actual: vector.len(),
        });
    }
    if expected == 0 {
        return Ok(vec![FeatureMap::zeros(rows, cols); channels]);
    }
    Ok(vector
        .chunks(rows * cols)
        .map(|chunk| FeatureMap {
            rows,
            cols,
            data: chunk.to_vec(),
        })
        .collect())
}

fn check_map_shape(map: &FeatureMap, rows: usize, cols: usize, context: &'static str) -> Result<()> {
    if map.rows != rows {
        return Err(ConvNetError::ShapeMismatch {
            context,
            expected: rows,
            actual: map.rows,
        });
    }
    if map.cols != cols {
        return Err(ConvNetError::ShapeMismatch {
            context,
            expected: cols,
            actual: map.cols,
        });
    }
    Ok(())
}

/// Data handed from one layer to the next, in either of its two forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Ordered per-channel maps.
    Maps(Vec<FeatureMap>),
    /// Flat vector (fully connected input/output, or raw flattened data).
    Vector(Vec<f64>),
}

impl Activation {
    /// Number of scalar values carried.
    pub fn len(&self) -> usize {
        match self {
            Activation::Maps(maps) => maps.iter().map(|m| m.data.len()).sum(),
            Activation::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert into exactly `shape.channels` maps of `shape.rows × shape.cols`.
    pub fn into_maps(self, shape: Shape) -> Result<Vec<FeatureMap>> {
        match self {
            Activation::Maps(maps) => {
                if maps.len() != shape.channels {
                    return Err(ConvNetError::ShapeMismatch {
                        context: "channel count",
                        expected: shape.channels,
                        actual: maps.len(),
                    });
                }
                for map in &maps {
                    check_map_shape(map, shape.rows, shape.cols, "feature map")?;
                }
                Ok(maps)
            }
            Activation::Vector(v) => unflatten(&v, shape.channels, shape.rows, shape.cols),
        }
    }

    /// Convert into a flat vector, flattening maps if necessary.
    pub fn into_vector(self) -> Result<Vec<f64>> {
        match self {
            Activation::Maps(maps) => flatten(&maps),
            Activation::Vector(v) => Ok(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_maps() -> Vec<FeatureMap> {
        vec![
            FeatureMap::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap(),
            FeatureMap::from_rows(vec![vec![5.0, 6.0], vec![7.0, 8.0]]).unwrap(),
        ]
    }

    #[test]
    fn test_flatten_is_channel_then_row_major() {
        let vector = flatten(&sample_maps()).unwrap();
        assert_eq!(vector, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }

    #[test]
    fn test_unflatten_restores_maps() {
        let maps = sample_maps();
        let vector = flatten(&maps).unwrap();
        assert_eq!(unflatten(&vector, 2, 2, 2).unwrap(), maps);
    }

    #[test]
    fn test_unflatten_rejects_wrong_length() {
        let result = unflatten(&[1.0, 2.0, 3.0], 1, 2, 2);
        assert!(matches!(
            result,
            Err(ConvNetError::ShapeMismatch { expected: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_flatten_rejects_mixed_shapes() {
        let maps = vec![FeatureMap::zeros(2, 2), FeatureMap::zeros(3, 2)];
        assert!(flatten(&maps).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let result = FeatureMap::from_rows(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(ConvNetError::MalformedMatrix(_))));
    }

    #[test]
    fn test_from_rows_rejects_empty() {
        assert!(FeatureMap::from_rows(vec![]).is_err());
        assert!(FeatureMap::from_rows(vec![vec![]]).is_err());
    }

    #[test]
    fn test_flipped_rotates_both_axes() {
        let map = FeatureMap::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        let flipped = map.flipped();
        assert_eq!(
            flipped.to_rows(),
            vec![vec![6.0, 5.0, 4.0], vec![3.0, 2.0, 1.0]]
        );
    }

    #[test]
    fn test_accumulate_over_overlap() {
        let mut target = FeatureMap::zeros(2, 2);
        let larger = FeatureMap::filled(3, 3, 1.0);
        target.accumulate(&larger);
        assert_eq!(target.sum(), 4.0);

        let mut big = FeatureMap::zeros(3, 3);
        big.accumulate(&FeatureMap::filled(2, 2, 2.0));
        assert_eq!(big[(1, 1)], 2.0);
        assert_eq!(big[(2, 2)], 0.0);
    }

    #[test]
    fn test_activation_into_maps_checks_channels() {
        let activation = Activation::Maps(sample_maps());
        assert!(activation.clone().into_maps(Shape::new(2, 2, 2)).is_ok());
        assert!(activation.into_maps(Shape::new(3, 2, 2)).is_err());
    }

    #[test]
    fn test_deserialize_checks_buffer_length() {
        let map: FeatureMap =
            serde_json::from_str(r#"{"rows":1,"cols":2,"data":[1.0,2.0]}"#).unwrap();
        assert_eq!(map[(0, 1)], 2.0);

        let short = serde_json::from_str::<FeatureMap>(r#"{"rows":2,"cols":2,"data":[1.0]}"#);
        assert!(short.is_err());
    }

    #[test]
    fn test_shape_elements() {
        assert_eq!(Shape::new(8, 24, 24).elements(), 4608);
        assert!(Shape::flat(10).is_flat());
        assert!(!Shape::new(1, 2, 2).is_flat());
    }
}
