//! Max pooling layer.
//!
//! Downsamples every channel independently and remembers where each maximum
//! came from so the gradient can be routed back to it. No learnable parameters.

use crate::error::{ConvNetError, Result};
use crate::feature_map::{Activation, FeatureMap, Shape};
use crate::layers::Layer;
use crate::snapshot::LayerSnapshot;
use crate::utils::matrix::output_dim;
use log::{debug, trace};

/// Max pooling over square windows.
///
/// The running maximum of each window starts at `0.0`, so a window holding
/// only non-positive values outputs `0.0` and records no source position;
/// such cells pass no gradient back.
#[derive(Debug, Clone)]
pub struct MaxPoolLayer {
    stride: usize,
    window_size: usize,
    in_channels: usize,
    in_rows: usize,
    in_cols: usize,
    /// Per channel, per output cell (row-major): absolute input position of
    /// the selected maximum.
    last_max_positions: Option<Vec<Vec<Option<(usize, usize)>>>>,
}

impl MaxPoolLayer {
    /// Create a pooling layer.
    ///
    /// Fails when the window does not fit the input or the stride, window or
    /// channel count is zero.
    pub fn new(
        stride: usize,
        window_size: usize,
        in_channels: usize,
        in_rows: usize,
        in_cols: usize,
    ) -> Result<Self> {
        if in_channels == 0 {
            return Err(invalid("input channel count must be positive".to_string()));
        }
        if output_dim(in_rows, window_size, stride).is_none()
            || output_dim(in_cols, window_size, stride).is_none()
        {
            return Err(invalid(format!(
                "window {}x{} with stride {} does not fit a {}x{} input",
                window_size, window_size, stride, in_rows, in_cols
            )));
        }

        let layer = Self {
            stride,
            window_size,
            in_channels,
            in_rows,
            in_cols,
            last_max_positions: None,
        };
        debug!(
            "max pool layer: window {} stride {} over {}x{}x{} -> {:?}",
            window_size,
            stride,
            in_channels,
            in_rows,
            in_cols,
            layer.output_shape()
        );
        Ok(layer)
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    fn out_rows(&self) -> usize {
        (self.in_rows - self.window_size) / self.stride + 1
    }

    fn out_cols(&self) -> usize {
        (self.in_cols - self.window_size) / self.stride + 1
    }

    fn pool(&self, input: &FeatureMap) -> (FeatureMap, Vec<Option<(usize, usize)>>) {
        let (out_rows, out_cols) = (self.out_rows(), self.out_cols());
        let mut output = FeatureMap::zeros(out_rows, out_cols);
        let mut positions = Vec::with_capacity(out_rows * out_cols);

        for r in 0..out_rows {
            for c in 0..out_cols {
                let mut max = 0.0;
                let mut position = None;

                for x in 0..self.window_size {
                    for y in 0..self.window_size {
                        let (row, col) = (r * self.stride + x, c * self.stride + y);
                        if input[(row, col)] > max {
                            max = input[(row, col)];
                            position = Some((row, col));
                        }
                    }
                }

                output[(r, c)] = max;
                positions.push(position);
            }
        }

        (output, positions)
    }
}

fn invalid(reason: String) -> ConvNetError {
    ConvNetError::InvalidParameter {
        layer: "max pool",
        reason,
    }
}

impl Layer for MaxPoolLayer {
    fn name(&self) -> &'static str {
        "max pool"
    }

    fn forward_maps(&mut self, input: Vec<FeatureMap>) -> Result<Activation> {
        let input = Activation::Maps(input).into_maps(self.input_shape())?;

        let (output, positions): (Vec<_>, Vec<_>) = input.iter().map(|map| self.pool(map)).unzip();
        trace!("max pool forward: {} channels", output.len());

        self.last_max_positions = Some(positions);
        Ok(Activation::Maps(output))
    }

    fn forward_vector(&mut self, input: Vec<f64>) -> Result<Activation> {
        let maps = Activation::Vector(input).into_maps(self.input_shape())?;
        self.forward_maps(maps)
    }

    fn backward_maps(&mut self, grad_output: Vec<FeatureMap>) -> Result<Activation> {
        let grad_output = Activation::Maps(grad_output).into_maps(self.output_shape())?;
        let positions = self
            .last_max_positions
            .as_ref()
            .ok_or(ConvNetError::NoCachedForward("max pool"))?;

        let grad_input = grad_output
            .iter()
            .zip(positions)
            .map(|(grad, channel_positions)| {
                let mut routed = FeatureMap::zeros(self.in_rows, self.in_cols);
                for (value, position) in grad.as_slice().iter().zip(channel_positions) {
                    if let Some(cell) = *position {
                        routed[cell] += value;
                    }
                }
                routed
            })
            .collect();

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
        Shape::new(self.in_channels, self.out_rows(), self.out_cols())
    }

    fn parameter_count(&self) -> usize {
        0
    }

    fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot::MaxPool {
            stride: self.stride,
            window_size: self.window_size,
            in_channels: self.in_channels,
            in_rows: self.in_rows,
            in_cols: self.in_cols,
        }
    }
}
