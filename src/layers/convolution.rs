//! Convolutional layer implementation
//!
//! This module provides a ConvolutionLayer that slides square learnable
//! filters over every input channel and learns them by plain gradient descent.

use crate::error::{ConvNetError, Result};
use crate::feature_map::{Activation, FeatureMap, Shape};
use crate::layers::Layer;
use crate::snapshot::LayerSnapshot;
use crate::utils::matrix::{cross_correlate, full_convolve, output_dim, space};
use crate::utils::SimpleRng;
use log::{debug, trace};

/// Convolutional layer with learnable square filters and no padding.
///
/// Every input channel is correlated with every filter, so the layer emits
/// `in_channels × num_filters` maps. Output map `channel * num_filters + filter`
/// is channel `channel` filtered by filter `filter`.
///
/// # Fields
///
/// * `filter_size` - Side length of every square filter
/// * `stride` - Step of the sliding window
/// * `in_channels`, `in_rows`, `in_cols` - Expected input shape
/// * `seed` - Seed the filters were drawn from
/// * `learning_rate` - Step size of the in-place gradient descent update
/// * `filters` - One `filter_size × filter_size` weight matrix per output filter
///
/// # Example
///
/// ```ignore
/// use digit_convnet::layers::ConvolutionLayer;
///
/// // 8 filters of 5x5 over a single 28x28 channel
/// let layer = ConvolutionLayer::new(5, 1, 1, 28, 28, 123, 8, 0.1)?;
/// assert_eq!(layer.output_rows(), 24);
/// ```
#[derive(Debug, Clone)]
pub struct ConvolutionLayer {
    filter_size: usize,
    stride: usize,
    in_channels: usize,
    in_rows: usize,
    in_cols: usize,
    seed: u64,
    learning_rate: f64,
    filters: Vec<FeatureMap>,
    last_input: Option<Vec<FeatureMap>>,
}

impl ConvolutionLayer {
    /// Create a ConvolutionLayer with standard-normal filters drawn from `seed`.
    ///
    /// # Arguments
    ///
    /// * `filter_size` - Side length of each square filter
    /// * `stride` - Window step, at least 1
    /// * `in_channels` - Number of input feature maps
    /// * `in_rows` / `in_cols` - Size of every input feature map
    /// * `seed` - Seed for the filter values
    /// * `num_filters` - Number of filters applied to each channel
    /// * `learning_rate` - Gradient descent step size
    ///
    /// # Errors
    ///
    /// Fails when a filter does not fit the input, when the stride, filter
    /// size, channel count or filter count is zero, or when the learning rate
    /// is not finite.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        filter_size: usize,
        stride: usize,
        in_channels: usize,
        in_rows: usize,
        in_cols: usize,
        seed: u64,
        num_filters: usize,
        learning_rate: f64,
    ) -> Result<Self> {
        if num_filters == 0 {
            return Err(invalid("number of filters must be positive"));
        }

        let mut rng = SimpleRng::new(seed);
        let filters = (0..num_filters)
            .map(|_| {
                let data = (0..filter_size * filter_size)
                    .map(|_| rng.next_gaussian())
                    .collect();
                FeatureMap::from_vec(filter_size, filter_size, data)
            })
            .collect::<Result<Vec<_>>>()?;

        let layer = Self::with_filters(
            stride,
            in_channels,
            in_rows,
            in_cols,
            seed,
            learning_rate,
            filters,
        )?;
        debug!(
            "convolution layer: {} filters {}x{} stride {} over {}x{}x{} -> {:?}",
            num_filters,
            filter_size,
            filter_size,
            stride,
            in_channels,
            in_rows,
            in_cols,
            layer.output_shape()
        );
        Ok(layer)
    }

    /// Create a ConvolutionLayer around existing filters (used when restoring
    /// a snapshot). All filters must be square and of the same size.
    pub fn with_filters(
        stride: usize,
        in_channels: usize,
        in_rows: usize,
        in_cols: usize,
        seed: u64,
        learning_rate: f64,
        filters: Vec<FeatureMap>,
    ) -> Result<Self> {
        let filter_size = filters.first().map(FeatureMap::rows).unwrap_or(0);
        if filters.is_empty() {
            return Err(invalid("number of filters must be positive"));
        }
        if filters
            .iter()
            .any(|f| f.rows() != filter_size || f.cols() != filter_size)
        {
            return Err(invalid("filters must be square and equally sized"));
        }
        if in_channels == 0 {
            return Err(invalid("input channel count must be positive"));
        }
        if !learning_rate.is_finite() {
            return Err(invalid("learning rate must be finite"));
        }
        if output_dim(in_rows, filter_size, stride).is_none()
            || output_dim(in_cols, filter_size, stride).is_none()
        {
            return Err(invalid(&format!(
                "filter {}x{} with stride {} does not fit a {}x{} input",
                filter_size, filter_size, stride, in_rows, in_cols
            )));
        }

        Ok(Self {
            filter_size,
            stride,
            in_channels,
            in_rows,
            in_cols,
            seed,
            learning_rate,
            filters,
            last_input: None,
        })
    }

    pub fn filter_size(&self) -> usize {
        self.filter_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn num_filters(&self) -> usize {
        self.filters.len()
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Current filter weights, in filter order.
    pub fn filters(&self) -> &[FeatureMap] {
        &self.filters
    }

    fn out_rows(&self) -> usize {
        (self.in_rows - self.filter_size) / self.stride + 1
    }

    fn out_cols(&self) -> usize {
        (self.in_cols - self.filter_size) / self.stride + 1
    }
}

fn invalid(reason: &str) -> ConvNetError {
    ConvNetError::InvalidParameter {
        layer: "convolution",
        reason: reason.to_string(),
    }
}

impl Layer for ConvolutionLayer {
    fn name(&self) -> &'static str {
        "convolution"
    }

    fn forward_maps(&mut self, input: Vec<FeatureMap>) -> Result<Activation> {
        let input = Activation::Maps(input).into_maps(self.input_shape())?;

        let mut output = Vec::with_capacity(input.len() * self.filters.len());
        for channel in &input {
            for filter in &self.filters {
                output.push(cross_correlate(channel, filter, self.stride));
            }
        }
        trace!("convolution forward: {} maps out", output.len());

        self.last_input = Some(input);
        Ok(Activation::Maps(output))
    }

    fn forward_vector(&mut self, input: Vec<f64>) -> Result<Activation> {
        let maps = Activation::Vector(input).into_maps(self.input_shape())?;
        self.forward_maps(maps)
    }

    fn backward_maps(&mut self, grad_output: Vec<FeatureMap>) -> Result<Activation> {
        let grad_output = Activation::Maps(grad_output).into_maps(self.output_shape())?;
        let last_input = self
            .last_input
            .as_ref()
            .ok_or(ConvNetError::NoCachedForward("convolution"))?;

        let num_filters = self.filters.len();
        let mut filter_deltas = vec![FeatureMap::zeros(self.filter_size, self.filter_size); num_filters];
        let mut grad_input = Vec::with_capacity(last_input.len());

        for (channel, input_map) in last_input.iter().enumerate() {
            let mut channel_grad = FeatureMap::zeros(self.in_rows, self.in_cols);

            for (f, filter) in self.filters.iter().enumerate() {
                let spaced = space(&grad_output[channel * num_filters + f], self.stride);

                let grad_filter = cross_correlate(input_map, &spaced, 1);
                filter_deltas[f].accumulate(&grad_filter.scaled(-self.learning_rate));

                channel_grad.accumulate(&full_convolve(filter, &spaced.flipped()));
            }

            grad_input.push(channel_grad);
        }

        // one descent step per backward call, after every channel contributed
        for (filter, delta) in self.filters.iter_mut().zip(&filter_deltas) {
            filter.accumulate(delta);
        }
        trace!("convolution backward: {} filters updated", num_filters);

        Ok(Activation::Maps(grad_input))
    }

    fn backward_vector(&mut self, grad_output: Vec<f64>) -> Result<Activation> {
        let maps = Activation::Vector(grad_output).into_maps(self.output_shape())?;
        self.backward_maps(maps)
    }

    fn input_shape(&self) -> Shape {
        Shape::new(self.in_channels, self.in_rows, self.in_cols)
    }

    fn output_shape(&self) -> Shape {
        Shape::new(
            self.in_channels * self.filters.len(),
            self.out_rows(),
            self.out_cols(),
        )
    }

    fn parameter_count(&self) -> usize {
        self.filters.len() * self.filter_size * self.filter_size
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::Convolution {
            stride: self.stride,
            in_channels: self.in_channels,
            in_rows: self.in_rows,
            in_cols: self.in_cols,
            seed: self.seed,
            learning_rate: self.learning_rate,
            filters: self.filters.clone(),
        }
    }
}
