//! 2D sliding-window primitives used by the convolution layer.

use crate::feature_map::FeatureMap;

/// Output extent of a valid (unpadded) sliding window.
///
/// `floor((input - kernel) / stride) + 1`, or `None` when the window does not
/// fit or the stride / kernel is zero.
pub fn output_dim(input: usize, kernel: usize, stride: usize) -> Option<usize> {
    if stride == 0 || kernel == 0 || kernel > input {
        return None;
    }
    Some((input - kernel) / stride + 1)
}

/// Valid cross-correlation of `input` with `kernel` at `stride`.
///
/// `out[i][j] = Σ kernel[x][y] · input[i·stride + x][j·stride + y]`.
/// Returns an empty map when the kernel does not fit.
pub fn cross_correlate(input: &FeatureMap, kernel: &FeatureMap, stride: usize) -> FeatureMap {
    let (Some(out_rows), Some(out_cols)) = (
        output_dim(input.rows(), kernel.rows(), stride),
        output_dim(input.cols(), kernel.cols(), stride),
    ) else {
        return FeatureMap::zeros(0, 0);
    };

    let mut output = FeatureMap::zeros(out_rows, out_cols);
    for i in 0..out_rows {
        for j in 0..out_cols {
            let mut sum = 0.0;
            for x in 0..kernel.rows() {
                for y in 0..kernel.cols() {
                    sum += kernel[(x, y)] * input[(i * stride + x, j * stride + y)];
                }
            }
            output[(i, j)] = sum;
        }
    }
    output
}

/// Full correlation: `kernel` visits every offset where it overlaps `input`
/// at least partially, with zeros outside `input`.
///
/// The result is `(input.rows + kernel.rows - 1) × (input.cols + kernel.cols - 1)`
/// and `out[i][j] = Σ kernel[x][y] · input[i + x - (kernel.rows - 1)][j + y - (kernel.cols - 1)]`.
pub fn full_convolve(input: &FeatureMap, kernel: &FeatureMap) -> FeatureMap {
    if input.rows() == 0 || input.cols() == 0 || kernel.rows() == 0 || kernel.cols() == 0 {
        return FeatureMap::zeros(0, 0);
    }
    let out_rows = input.rows() + kernel.rows() - 1;
    let out_cols = input.cols() + kernel.cols() - 1;
    let row_shift = kernel.rows() - 1;
    let col_shift = kernel.cols() - 1;

    let mut output = FeatureMap::zeros(out_rows, out_cols);
    for i in 0..out_rows {
        for j in 0..out_cols {
            let mut sum = 0.0;
            for x in 0..kernel.rows() {
                let Some(r) = (i + x).checked_sub(row_shift).filter(|&r| r < input.rows()) else {
                    continue;
                };
                for y in 0..kernel.cols() {
                    if let Some(c) = (j + y).checked_sub(col_shift).filter(|&c| c < input.cols()) {
                        sum += kernel[(x, y)] * input[(r, c)];
                    }
                }
            }
            output[(i, j)] = sum;
        }
    }
    output
}

/// Spread a strided gradient back to stride-1 resolution.
///
/// Value `(i, j)` moves to `(i·stride, j·stride)` and the gaps are zero. With
/// stride 1 (or 0) the map is returned unchanged.
pub fn space(map: &FeatureMap, stride: usize) -> FeatureMap {
    if stride <= 1 || map.rows() == 0 || map.cols() == 0 {
        return map.clone();
    }
    let out_rows = (map.rows() - 1) * stride + 1;
    let out_cols = (map.cols() - 1) * stride + 1;

    let mut output = FeatureMap::zeros(out_rows, out_cols);
    for i in 0..map.rows() {
        for j in 0..map.cols() {
            output[(i * stride, j * stride)] = map[(i, j)];
        }
    }
    output
}
