//! Layer trait definition for network stages
//!
//! This module defines the core Layer trait that every stage of the chain
//! implements: forward and backward contracts plus pure shape queries.

use crate::error::Result;
use crate::feature_map::{Activation, FeatureMap, Shape};
use crate::snapshot::LayerSnapshot;

/// Core trait for network layers.
///
/// A layer works with whichever form of [`Activation`] suits it: convolution
/// and pooling stages consume ordered feature maps, fully connected stages
/// consume flat vectors. The provided [`forward`](Layer::forward) and
/// [`backward`](Layer::backward) dispatch on the form received.
///
/// Layers are not re-entrant: the input cached by the last forward call is
/// what the next backward call differentiates against.
///
/// # Example
///
/// ```ignore
/// let output = layer.forward(Activation::Maps(vec![image]))?;
/// // ... compute dL/dOutput ...
/// let grad_input = layer.backward(Activation::Vector(grad_output))?;
/// ```
pub trait Layer {
    /// Short human readable layer kind, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Forward pass over per-channel feature maps.
    ///
    /// Caches whatever the backward pass needs and returns the layer output.
    fn forward_maps(&mut self, input: Vec<FeatureMap>) -> Result<Activation>;

    /// Forward pass over a flat vector.
    ///
    /// Spatial layers unflatten it to their input shape first.
    fn forward_vector(&mut self, input: Vec<f64>) -> Result<Activation>;

    /// Backward pass given dL/dOutput as feature maps.
    ///
    /// Updates this layer's parameters (if any) and returns dL/dInput for the
    /// predecessor.
    fn backward_maps(&mut self, grad_output: Vec<FeatureMap>) -> Result<Activation>;

    /// Backward pass given dL/dOutput as a flat vector.
    fn backward_vector(&mut self, grad_output: Vec<f64>) -> Result<Activation>;

    /// Shape of the data this layer expects.
    fn input_shape(&self) -> Shape;

    /// Shape of the data this layer produces.
    fn output_shape(&self) -> Shape;

    /// Number of trainable scalars.
    fn parameter_count(&self) -> usize;

    /// True for the stage producing the network's class probabilities.
    fn is_terminal(&self) -> bool {
        false
    }

    /// Capture construction parameters and current weights.
    fn snapshot(&self) -> LayerSnapshot;

    /// Forward pass dispatching on the activation form.
    fn forward(&mut self, input: Activation) -> Result<Activation> {
        match input {
            Activation::Maps(maps) => self.forward_maps(maps),
            Activation::Vector(vector) => self.forward_vector(vector),
        }
    }

    /// Backward pass dispatching on the gradient form.
    fn backward(&mut self, grad_output: Activation) -> Result<Activation> {
        match grad_output {
            Activation::Maps(maps) => self.backward_maps(maps),
            Activation::Vector(vector) => self.backward_vector(vector),
        }
    }

    /// Number of output feature maps (1 for vectors).
    fn output_channels(&self) -> usize {
        self.output_shape().channels
    }

    /// Rows of each output map (1 for vectors).
    fn output_rows(&self) -> usize {
        self.output_shape().rows
    }

    /// Columns of each output map (vector length for vectors).
    fn output_cols(&self) -> usize {
        self.output_shape().cols
    }

    /// Total number of output values.
    fn output_elements(&self) -> usize {
        self.output_shape().elements()
    }
}
