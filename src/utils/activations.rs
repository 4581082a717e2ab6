//! Activation functions for fully connected layers
//!
//! - ReLU and its floored derivative for hidden layers
//! - Softmax for the terminal layer

/// Slope used by [`relu_derivative`] for inactive units.
pub const RELU_FLOOR_SLOPE: f64 = 0.01;

/// ReLU: `x` when positive, otherwise `0`.
pub fn relu(x: f64) -> f64 {
    if x > 0.0 {
        x
    } else {
        0.0
    }
}

/// Derivative of ReLU with a small non-zero slope for inactive units so that
/// gradient keeps flowing through them.
pub fn relu_derivative(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else {
        RELU_FLOOR_SLOPE
    }
}

/// Softmax over a vector.
///
/// Uses the max-subtraction trick for numerical stability to avoid overflow
/// with large values. An empty input gives an empty output.
pub fn softmax(values: &[f64]) -> Vec<f64> {
    let max_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let exps: Vec<f64> = values.iter().map(|v| (v - max_value).exp()).collect();
    let sum: f64 = exps.iter().sum();

    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value; ties go to the earliest index.
///
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            None => best = Some((i, v)),
            Some((_, current)) if v > current => best = Some((i, v)),
            Some(_) => {}
        }
    }
    best.map(|(i, _)| i)
}
