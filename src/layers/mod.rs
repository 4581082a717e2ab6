//! Layer abstractions for the network
//!
//! This module provides the Layer trait, the three concrete layer types and
//! [`NetworkLayer`], the closed set of variants a chain is made of.

mod r#trait;
pub mod convolution;
pub mod fully_connected;
pub mod max_pool;

// Re-export the Layer trait for convenience
pub use convolution::ConvolutionLayer;
pub use fully_connected::FullyConnectedLayer;
pub use max_pool::MaxPoolLayer;
pub use r#trait::Layer;

use crate::error::Result;
use crate::feature_map::{Activation, FeatureMap, Shape};
use crate::snapshot::LayerSnapshot;

/// Any layer that can appear in a chain.
#[derive(Debug, Clone)]
pub enum NetworkLayer {
    Convolution(ConvolutionLayer),
    MaxPool(MaxPoolLayer),
    FullyConnected(FullyConnectedLayer),
}

impl NetworkLayer {
    fn inner(&self) -> &dyn Layer {
        match self {
            NetworkLayer::Convolution(layer) => layer,
            NetworkLayer::MaxPool(layer) => layer,
            NetworkLayer::FullyConnected(layer) => layer,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Layer {
        match self {
            NetworkLayer::Convolution(layer) => layer,
            NetworkLayer::MaxPool(layer) => layer,
            NetworkLayer::FullyConnected(layer) => layer,
        }
    }

    /// Rebuild a layer, weights included, from its snapshot.
    pub fn from_snapshot(snapshot: LayerSnapshot) -> Result<Self> {
        Ok(match snapshot {
            LayerSnapshot::Convolution {
                stride,
                in_channels,
                in_rows,
                in_cols,
                seed,
                learning_rate,
                filters,
            } => NetworkLayer::Convolution(ConvolutionLayer::with_filters(
                stride,
                in_channels,
                in_rows,
                in_cols,
                seed,
                learning_rate,
                filters,
            )?),
            LayerSnapshot::MaxPool {
                stride,
                window_size,
                in_channels,
                in_rows,
                in_cols,
            } => NetworkLayer::MaxPool(MaxPoolLayer::new(
                stride,
                window_size,
                in_channels,
                in_rows,
                in_cols,
            )?),
            LayerSnapshot::FullyConnected {
                input_length,
                output_length,
                seed,
                learning_rate,
                is_terminal,
                weights,
            } => NetworkLayer::FullyConnected(FullyConnectedLayer::with_weights(
                input_length,
                output_length,
                seed,
                learning_rate,
                is_terminal,
                weights,
            )?),
        })
    }
}

impl From<ConvolutionLayer> for NetworkLayer {
    fn from(layer: ConvolutionLayer) -> Self {
        NetworkLayer::Convolution(layer)
    }
}

impl From<MaxPoolLayer> for NetworkLayer {
    fn from(layer: MaxPoolLayer) -> Self {
        NetworkLayer::MaxPool(layer)
    }
}

impl From<FullyConnectedLayer> for NetworkLayer {
    fn from(layer: FullyConnectedLayer) -> Self {
        NetworkLayer::FullyConnected(layer)
    }
}

impl Layer for NetworkLayer {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn forward_maps(&mut self, input: Vec<FeatureMap>) -> Result<Activation> {
        self.inner_mut().forward_maps(input)
    }

    fn forward_vector(&mut self, input: Vec<f64>) -> Result<Activation> {
        self.inner_mut().forward_vector(input)
    }

    fn backward_maps(&mut self, grad_output: Vec<FeatureMap>) -> Result<Activation> {
        self.inner_mut().backward_maps(grad_output)
    }

    fn backward_vector(&mut self, grad_output: Vec<f64>) -> Result<Activation> {
        self.inner_mut().backward_vector(grad_output)
    }

    fn input_shape(&self) -> Shape {
        self.inner().input_shape()
    }

    fn output_shape(&self) -> Shape {
        self.inner().output_shape()
    }

    fn parameter_count(&self) -> usize {
        self.inner().parameter_count()
    }

    fn is_terminal(&self) -> bool {
        self.inner().is_terminal()
    }

    fn snapshot(&self) -> LayerSnapshot {
        self.inner().snapshot()
    }
}
