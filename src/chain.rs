//! Ordered chain of layers.
//!
//! The chain owns every layer in a `Vec`; a layer's predecessor and successor
//! are the neighbouring indices. Forward walks successors from the first
//! layer, backward walks predecessors from the terminal one.

use crate::error::{ConvNetError, Result};
use crate::feature_map::{Activation, Shape};
use crate::layers::{Layer, NetworkLayer};
use log::{debug, trace};

/// Layers wired in execution order.
#[derive(Debug, Clone)]
pub struct LayerChain {
    layers: Vec<NetworkLayer>,
}

impl LayerChain {
    /// Wire `layers` in the given order.
    ///
    /// # Errors
    ///
    /// Fails when the list is empty, when a layer's output shape does not
    /// feed its successor, or when a terminal layer is not the last one.
    pub fn new(layers: Vec<NetworkLayer>) -> Result<Self> {
        if layers.is_empty() {
            return Err(ConvNetError::EmptyNetwork);
        }

        let len = layers.len();
        if let Some(index) = layers[..len - 1].iter().position(Layer::is_terminal) {
            return Err(ConvNetError::MisplacedTerminal { index, len });
        }

        for pair in layers.windows(2) {
            check_link(pair[0].output_shape(), pair[1].input_shape())?;
        }

        debug!(
            "wired {} layers: {}",
            len,
            layers.iter().map(Layer::name).collect::<Vec<_>>().join(" -> ")
        );
        Ok(Self { layers })
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[NetworkLayer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&NetworkLayer> {
        self.layers.get(index)
    }

    /// Index of the layer feeding `index`, if any.
    pub fn predecessor(&self, index: usize) -> Option<usize> {
        if index == 0 || index >= self.layers.len() {
            None
        } else {
            Some(index - 1)
        }
    }

    /// Index of the layer fed by `index`, if any.
    pub fn successor(&self, index: usize) -> Option<usize> {
        if index + 1 < self.layers.len() {
            Some(index + 1)
        } else {
            None
        }
    }

    /// The last layer.
    pub fn terminal(&self) -> &NetworkLayer {
        &self.layers[self.layers.len() - 1]
    }

    /// Shape expected by the first layer.
    pub fn input_shape(&self) -> Shape {
        self.layers[0].input_shape()
    }

    /// Shape produced by the terminal layer.
    pub fn output_shape(&self) -> Shape {
        self.terminal().output_shape()
    }

    /// Run `input` through every layer and return the terminal output as a
    /// flat vector.
    pub fn forward(&mut self, input: Activation) -> Result<Vec<f64>> {
        let mut index = 0;
        let mut activation = input;
        loop {
            activation = self.layers[index].forward(activation)?;
            trace!("forward through layer {} ({})", index, self.layers[index].name());
            match self.successor(index) {
                Some(next) => index = next,
                None => return activation.into_vector(),
            }
        }
    }

    /// Backpropagate dL/dOutput of the terminal layer down to the first layer,
    /// updating weights on the way.
    pub fn backward(&mut self, grad_output: Vec<f64>) -> Result<()> {
        let mut index = self.layers.len() - 1;
        let mut grad = Activation::Vector(grad_output);
        loop {
            grad = self.layers[index].backward(grad)?;
            trace!("backward through layer {} ({})", index, self.layers[index].name());
            match self.predecessor(index) {
                Some(previous) => index = previous,
                None => return Ok(()),
            }
        }
    }

    /// Total trainable scalars across all layers.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(Layer::parameter_count).sum()
    }
}

/// Spatial stages must agree exactly; a flat side only needs the same count.
fn check_link(output: Shape, input: Shape) -> Result<()> {
    if output.is_flat() || input.is_flat() {
        if output.elements() != input.elements() {
            return Err(ConvNetError::ShapeMismatch {
                context: "layer link elements",
                expected: input.elements(),
                actual: output.elements(),
            });
        }
        return Ok(());
    }

    for (context, expected, actual) in [
        ("layer link channels", input.channels, output.channels),
        ("layer link rows", input.rows, output.rows),
        ("layer link cols", input.cols, output.cols),
    ] {
        if expected != actual {
            return Err(ConvNetError::ShapeMismatch {
                context,
                expected,
                actual,
            });
        }
    }
    Ok(())
}
