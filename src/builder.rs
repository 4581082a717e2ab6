//! Incremental network construction with shape inference.

use crate::chain::LayerChain;
use crate::error::Result;
use crate::feature_map::Shape;
use crate::layers::{ConvolutionLayer, FullyConnectedLayer, Layer, MaxPoolLayer, NetworkLayer};
use crate::network::Network;

/// Collects layers in order and materializes a [`Network`].
///
/// The first layer consumes a single-channel `input_rows × input_cols`
/// matrix; each later layer takes its input shape from the previous layer's
/// output shape, so callers never compute intermediate sizes themselves.
///
/// # Example
///
/// ```
/// use digit_convnet::NetworkBuilder;
///
/// let mut builder = NetworkBuilder::new(28, 28, 25600.0);
/// builder.add_convolution_layer(8, 5, 1, 0.1, 123)?;
/// builder.add_max_pool_layer(3, 2)?;
/// builder.add_fully_connected_layer(10, 0.1, 123, true)?;
/// let network = builder.build()?;
/// assert_eq!(network.output_length(), 10);
/// # Ok::<(), digit_convnet::ConvNetError>(())
/// ```
#[derive(Debug, Clone)]
pub struct NetworkBuilder {
    input_rows: usize,
    input_cols: usize,
    scaling_factor: f64,
    layers: Vec<NetworkLayer>,
}

impl NetworkBuilder {
    pub fn new(input_rows: usize, input_cols: usize, scaling_factor: f64) -> Self {
        Self {
            input_rows,
            input_cols,
            scaling_factor,
            layers: Vec::new(),
        }
    }

    /// Shape the next appended layer will consume.
    pub fn next_input_shape(&self) -> Shape {
        self.layers
            .last()
            .map(Layer::output_shape)
            .unwrap_or(Shape::new(1, self.input_rows, self.input_cols))
    }

    /// Append a convolution layer of `num_filters` square filters.
    pub fn add_convolution_layer(
        &mut self,
        num_filters: usize,
        filter_size: usize,
        stride: usize,
        learning_rate: f64,
        seed: u64,
    ) -> Result<&mut Self> {
        let input = self.next_input_shape();
        let layer = ConvolutionLayer::new(
            filter_size,
            stride,
            input.channels,
            input.rows,
            input.cols,
            seed,
            num_filters,
            learning_rate,
        )?;
        self.layers.push(layer.into());
        Ok(self)
    }

    /// Append a max pooling layer.
    pub fn add_max_pool_layer(&mut self, window_size: usize, stride: usize) -> Result<&mut Self> {
        let input = self.next_input_shape();
        let layer = MaxPoolLayer::new(stride, window_size, input.channels, input.rows, input.cols)?;
        self.layers.push(layer.into());
        Ok(self)
    }

    /// Append a fully connected layer consuming everything the previous layer
    /// produces. `is_terminal` switches its activation to softmax.
    pub fn add_fully_connected_layer(
        &mut self,
        output_length: usize,
        learning_rate: f64,
        seed: u64,
        is_terminal: bool,
    ) -> Result<&mut Self> {
        let input = self.next_input_shape();
        let layer = FullyConnectedLayer::new(
            input.elements(),
            output_length,
            seed,
            learning_rate,
            is_terminal,
        )?;
        self.layers.push(layer.into());
        Ok(self)
    }

    /// Number of layers added so far.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Wire the accumulated layers into a network.
    pub fn build(self) -> Result<Network> {
        let chain = LayerChain::new(self.layers)?;
        Network::new(chain, self.input_rows, self.input_cols, self.scaling_factor)
    }
}
