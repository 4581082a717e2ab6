//! Fully connected layer implementation
//!
//! This module provides a FullyConnectedLayer that performs the transformation
//! `net = input × weights` followed by ReLU, or softmax when it is the
//! network's terminal layer.

use crate::error::{ConvNetError, Result};
use crate::feature_map::{flatten, Activation, FeatureMap, Shape};
use crate::layers::Layer;
use crate::snapshot::LayerSnapshot;
use crate::utils::{relu, relu_derivative, softmax, SimpleRng};
use log::{debug, trace};

/// Dense layer without biases.
///
/// # Fields
///
/// * `input_length` - Number of input values
/// * `output_length` - Number of output units
/// * `weights` - Weight matrix stored row-major (input_length × output_length)
/// * `is_terminal` - Softmax output instead of ReLU
///
/// # Example
///
/// ```ignore
/// use digit_convnet::layers::FullyConnectedLayer;
///
/// let layer = FullyConnectedLayer::new(968, 10, 123, 0.1, true)?;
/// assert_eq!(layer.output_elements(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct FullyConnectedLayer {
    input_length: usize,
    output_length: usize,
    seed: u64,
    learning_rate: f64,
    is_terminal: bool,
    weights: Vec<f64>,
    last_input: Option<Vec<f64>>,
    last_nets: Option<Vec<f64>>,
}

impl FullyConnectedLayer {
    /// Create a FullyConnectedLayer with standard-normal weights drawn from `seed`.
    ///
    /// # Arguments
    ///
    /// * `input_length` - Number of input values
    /// * `output_length` - Number of output units
    /// * `seed` - Seed for the weight values
    /// * `learning_rate` - Gradient descent step size
    /// * `is_terminal` - Whether this layer produces the class probabilities
    pub fn new(
        input_length: usize,
        output_length: usize,
        seed: u64,
        learning_rate: f64,
        is_terminal: bool,
    ) -> Result<Self> {
        let mut rng = SimpleRng::new(seed);
        let weights = (0..input_length * output_length)
            .map(|_| rng.next_gaussian())
            .collect();

        let layer = Self::with_weights(
            input_length,
            output_length,
            seed,
            learning_rate,
            is_terminal,
            weights,
        )?;
        debug!(
            "fully connected layer: {} -> {} ({})",
            input_length,
            output_length,
            if is_terminal { "softmax" } else { "relu" }
        );
        Ok(layer)
    }

    /// Create a FullyConnectedLayer around an existing row-major weight matrix.
    pub fn with_weights(
        input_length: usize,
        output_length: usize,
        seed: u64,
        learning_rate: f64,
        is_terminal: bool,
        weights: Vec<f64>,
    ) -> Result<Self> {
        if input_length == 0 || output_length == 0 {
            return Err(ConvNetError::InvalidParameter {
                layer: "fully connected",
                reason: format!("dimensions must be positive, got {}x{}", input_length, output_length),
            });
        }
        if !learning_rate.is_finite() {
            return Err(ConvNetError::InvalidParameter {
                layer: "fully connected",
                reason: "learning rate must be finite".to_string(),
            });
        }
        if weights.len() != input_length * output_length {
            return Err(ConvNetError::ShapeMismatch {
                context: "fully connected weights",
                expected: input_length * output_length,
                actual: weights.len(),
            });
        }

        Ok(Self {
            input_length,
            output_length,
            seed,
            learning_rate,
            is_terminal,
            weights,
            last_input: None,
            last_nets: None,
        })
    }

    pub fn input_length(&self) -> usize {
        self.input_length
    }

    pub fn output_length(&self) -> usize {
        self.output_length
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Row-major weights, `weights()[k * output_length + j]` connects input
    /// `k` to output `j`.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Pre-activation sums from the last forward pass.
    pub fn last_nets(&self) -> Option<&[f64]> {
        self.last_nets.as_deref()
    }
}

impl Layer for FullyConnectedLayer {
    fn name(&self) -> &'static str {
        "fully connected"
    }

    fn forward_maps(&mut self, input: Vec<FeatureMap>) -> Result<Activation> {
        self.forward_vector(flatten(&input)?)
    }

    fn forward_vector(&mut self, input: Vec<f64>) -> Result<Activation> {
        if input.len() != self.input_length {
            return Err(ConvNetError::ShapeMismatch {
                context: "fully connected input",
                expected: self.input_length,
                actual: input.len(),
            });
        }

        let mut nets = vec![0.0; self.output_length];
        for (k, &x) in input.iter().enumerate() {
            let row = &self.weights[k * self.output_length..(k + 1) * self.output_length];
            for (net, &w) in nets.iter_mut().zip(row) {
                *net += x * w;
            }
        }

        let output = if self.is_terminal {
            softmax(&nets)
        } else {
            nets.iter().map(|&n| relu(n)).collect()
        };
        trace!("fully connected forward: {} outputs", output.len());

        self.last_input = Some(input);
        self.last_nets = Some(nets);
        Ok(Activation::Vector(output))
    }

    fn backward_maps(&mut self, grad_output: Vec<FeatureMap>) -> Result<Activation> {
        self.backward_vector(flatten(&grad_output)?)
    }

    /// Weight update and input gradient.
    ///
    /// The activation derivative is `1` / `0.01` for hidden units. For the
    /// terminal layer it is the cached net value itself, not the textbook
    /// softmax derivative.
    fn backward_vector(&mut self, grad_output: Vec<f64>) -> Result<Activation> {
        if grad_output.len() != self.output_length {
            return Err(ConvNetError::ShapeMismatch {
                context: "fully connected gradient",
                expected: self.output_length,
                actual: grad_output.len(),
            });
        }
        let (Some(last_input), Some(last_nets)) = (&self.last_input, &self.last_nets) else {
            return Err(ConvNetError::NoCachedForward("fully connected"));
        };

        let deltas: Vec<f64> = grad_output
            .iter()
            .zip(last_nets)
            .map(|(&g, &net)| {
                let derivative = if self.is_terminal { net } else { relu_derivative(net) };
                g * derivative
            })
            .collect();

        let mut grad_input = vec![0.0; self.input_length];
        for (k, (&x, grad)) in last_input.iter().zip(grad_input.iter_mut()).enumerate() {
            let row = &mut self.weights[k * self.output_length..(k + 1) * self.output_length];
            for (w, &delta) in row.iter_mut().zip(&deltas) {
                *grad += delta * *w;
                *w -= self.learning_rate * delta * x;
            }
        }
        trace!("fully connected backward: {} inputs", grad_input.len());

        Ok(Activation::Vector(grad_input))
    }

    fn input_shape(&self) -> Shape {
        Shape::flat(self.input_length)
    }

    fn output_shape(&self) -> Shape {
        Shape::flat(self.output_length)
    }

    fn parameter_count(&self) -> usize {
        self.weights.len()
    }

    fn is_terminal(&self) -> bool {
        self.is_terminal
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::FullyConnected {
            input_length: self.input_length,
            output_length: self.output_length,
            seed: self.seed,
            learning_rate: self.learning_rate,
            is_terminal: self.is_terminal,
            weights: self.weights.clone(),
        }
    }
}
