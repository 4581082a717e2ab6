//! Network configuration structures
//!
//! This module describes a network as JSON so that architectures can be
//! changed without code changes. A configuration is validated on load and
//! turned into a [`Network`] through [`NetworkBuilder`].

use crate::builder::NetworkBuilder;
use crate::error::{ConvNetError, Result};
use crate::network::Network;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for a single layer.
///
/// Different layer types require different fields:
///
/// - **convolution**: `num_filters`, `filter_size`, `learning_rate`, `seed`,
///   optional `stride` (default 1)
/// - **max_pool**: `window_size`, optional `stride` (default 1)
/// - **fully_connected**: `output_length`, `learning_rate`, `seed`, optional
///   `is_last` (default false)
///
/// Input shapes are never configured; they are inferred from the previous
/// layer.
///
/// # Examples
///
/// ```json
/// {
///   "layer_type": "convolution",
///   "num_filters": 8,
///   "filter_size": 5,
///   "stride": 1,
///   "learning_rate": 0.1,
///   "seed": 123
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Type of layer: "convolution", "max_pool" or "fully_connected"
    pub layer_type: String,

    /// Number of filters for a convolution layer
    pub num_filters: Option<usize>,
    /// Side of the square filter for a convolution layer
    pub filter_size: Option<usize>,
    /// Window step for convolution and max pool layers (default: 1)
    pub stride: Option<usize>,

    /// Side of the square pooling window
    pub window_size: Option<usize>,

    /// Number of outputs of a fully connected layer
    pub output_length: Option<usize>,
    /// Whether a fully connected layer is the softmax output (default: false)
    pub is_last: Option<bool>,

    /// Learning rate for convolution and fully connected layers
    pub learning_rate: Option<f64>,
    /// Weight initialization seed for convolution and fully connected layers
    pub seed: Option<u64>,
}

/// Configuration for the entire network.
///
/// # Example
///
/// ```json
/// {
///   "input_rows": 28,
///   "input_cols": 28,
///   "scaling_factor": 25600.0,
///   "layers": [
///     { "layer_type": "convolution", "num_filters": 8, "filter_size": 5,
///       "learning_rate": 0.1, "seed": 123 },
///     { "layer_type": "max_pool", "window_size": 3, "stride": 2 },
///     { "layer_type": "fully_connected", "output_length": 10,
///       "learning_rate": 0.1, "seed": 123, "is_last": true }
///   ]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_rows: usize,
    pub input_cols: usize,
    /// Raw input values are divided by this before entering the network
    pub scaling_factor: f64,
    /// Layers in chain order
    pub layers: Vec<LayerConfig>,
}

/// Loads a network configuration from a JSON file.
///
/// Reads the file at `path`, deserializes it and validates every layer.
///
/// # Examples
///
/// ```no_run
/// use digit_convnet::config::{build_network, load_config};
///
/// let config = load_config("config/mnist_cnn.json").unwrap();
/// let network = build_network(&config).unwrap();
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<NetworkConfig> {
    let contents = fs::read_to_string(path)?;
    let config: NetworkConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and value ranges.
///
/// Shape compatibility is checked later, when [`build_network`] constructs
/// the layers.
pub fn validate_config(config: &NetworkConfig) -> Result<()> {
    if config.input_rows == 0 || config.input_cols == 0 {
        return Err(invalid("input_rows and input_cols must be positive".to_string()));
    }
    if !config.scaling_factor.is_finite() || config.scaling_factor <= 0.0 {
        return Err(invalid("scaling_factor must be positive".to_string()));
    }
    if config.layers.is_empty() {
        return Err(invalid("network must have at least one layer".to_string()));
    }

    for (i, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, i)?;
    }

    let last = config.layers.len() - 1;
    if let Some(i) = config.layers[..last]
        .iter()
        .position(|l| l.is_last.unwrap_or(false))
    {
        return Err(invalid(format!(
            "Layer {}: only the final layer may set is_last",
            i
        )));
    }

    Ok(())
}

fn validate_layer(layer: &LayerConfig, index: usize) -> Result<()> {
    match layer.layer_type.to_lowercase().as_str() {
        "convolution" => {
            positive(require(layer.num_filters, index, "num_filters")?, index, "num_filters")?;
            positive(require(layer.filter_size, index, "filter_size")?, index, "filter_size")?;
            validate_learning_rate(require(layer.learning_rate, index, "learning_rate")?, index)?;
            require(layer.seed, index, "seed")?;
            positive(layer.stride.unwrap_or(1), index, "stride")?;
        }
        "max_pool" => {
            positive(require(layer.window_size, index, "window_size")?, index, "window_size")?;
            positive(layer.stride.unwrap_or(1), index, "stride")?;
        }
        "fully_connected" => {
            positive(require(layer.output_length, index, "output_length")?, index, "output_length")?;
            validate_learning_rate(require(layer.learning_rate, index, "learning_rate")?, index)?;
            require(layer.seed, index, "seed")?;
        }
        _ => {
            return Err(invalid(format!(
                "Layer {}: Invalid layer type '{}'. Must be one of: convolution, max_pool, fully_connected",
                index, layer.layer_type
            )));
        }
    }
    Ok(())
}

/// Builds a network from a validated configuration.
pub fn build_network(config: &NetworkConfig) -> Result<Network> {
    validate_config(config)?;

    let mut builder = NetworkBuilder::new(config.input_rows, config.input_cols, config.scaling_factor);
    for (i, layer) in config.layers.iter().enumerate() {
        let stride = layer.stride.unwrap_or(1);
        match layer.layer_type.to_lowercase().as_str() {
            "convolution" => {
                builder.add_convolution_layer(
                    require(layer.num_filters, i, "num_filters")?,
                    require(layer.filter_size, i, "filter_size")?,
                    stride,
                    require(layer.learning_rate, i, "learning_rate")?,
                    require(layer.seed, i, "seed")?,
                )?;
            }
            "max_pool" => {
                builder.add_max_pool_layer(require(layer.window_size, i, "window_size")?, stride)?;
            }
            _ => {
                builder.add_fully_connected_layer(
                    require(layer.output_length, i, "output_length")?,
                    require(layer.learning_rate, i, "learning_rate")?,
                    require(layer.seed, i, "seed")?,
                    layer.is_last.unwrap_or(false),
                )?;
            }
        }
    }

    builder.build()
}

fn invalid(message: String) -> ConvNetError {
    ConvNetError::InvalidConfig(message)
}

fn require<T>(value: Option<T>, index: usize, field: &str) -> Result<T> {
    value.ok_or_else(|| invalid(format!("Layer {}: missing {}", index, field)))
}

fn positive(value: usize, index: usize, field: &str) -> Result<usize> {
    if value == 0 {
        return Err(invalid(format!("Layer {}: {} must be positive", index, field)));
    }
    Ok(value)
}

fn validate_learning_rate(rate: f64, index: usize) -> Result<()> {
    if !rate.is_finite() || rate < 0.0 {
        return Err(invalid(format!(
            "Layer {}: learning_rate must be non-negative",
            index
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convolution() -> LayerConfig {
        LayerConfig {
            layer_type: "convolution".to_string(),
            num_filters: Some(4),
            filter_size: Some(3),
            learning_rate: Some(0.1),
            seed: Some(1),
            ..Default::default()
        }
    }

    fn output_layer() -> LayerConfig {
        LayerConfig {
            layer_type: "fully_connected".to_string(),
            output_length: Some(10),
            learning_rate: Some(0.1),
            seed: Some(1),
            is_last: Some(true),
            ..Default::default()
        }
    }

    fn config(layers: Vec<LayerConfig>) -> NetworkConfig {
        NetworkConfig {
            input_rows: 12,
            input_cols: 12,
            scaling_factor: 255.0,
            layers,
        }
    }

    #[test]
    fn test_validate_convolution_layer() {
        assert!(validate_layer(&convolution(), 0).is_ok());
    }

    #[test]
    fn test_validate_convolution_missing_fields() {
        let layer = LayerConfig {
            filter_size: None,
            ..convolution()
        };
        let err = validate_layer(&layer, 2).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: Layer 2: missing filter_size"
        );
    }

    #[test]
    fn test_validate_invalid_layer_type() {
        let layer = LayerConfig {
            layer_type: "dropout".to_string(),
            ..Default::default()
        };
        assert!(validate_layer(&layer, 0).is_err());
    }

    #[test]
    fn test_validate_zero_stride() {
        let layer = LayerConfig {
            layer_type: "max_pool".to_string(),
            window_size: Some(2),
            stride: Some(0),
            ..Default::default()
        };
        assert!(validate_layer(&layer, 0).is_err());
    }

    #[test]
    fn test_validate_empty_network() {
        assert!(validate_config(&config(vec![])).is_err());
    }

    #[test]
    fn test_is_last_only_on_final_layer() {
        assert!(validate_config(&config(vec![output_layer(), convolution()])).is_err());
        assert!(validate_config(&config(vec![convolution(), output_layer()])).is_ok());
    }

    #[test]
    fn test_build_network() {
        let pool = LayerConfig {
            layer_type: "max_pool".to_string(),
            window_size: Some(2),
            stride: Some(2),
            ..Default::default()
        };
        let network = build_network(&config(vec![convolution(), pool, output_layer()])).unwrap();

        // 12x12 -> conv 3: 4x10x10 -> pool 2/2: 4x5x5 -> 10
        assert_eq!(network.len(), 3);
        assert_eq!(network.output_length(), 10);
        assert_eq!(network.parameter_count(), 4 * 9 + 100 * 10);
    }

    #[test]
    fn test_build_network_shape_error_surfaces() {
        let big = LayerConfig {
            filter_size: Some(20),
            ..convolution()
        };
        assert!(matches!(
            build_network(&config(vec![big, output_layer()])),
            Err(ConvNetError::InvalidParameter { .. })
        ));
    }
}
