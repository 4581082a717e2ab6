//! Tests for JSON network configuration
//!
//! This file tests the config module including:
//! - Loading the bundled MNIST configuration
//! - Building networks from configurations
//! - Handling invalid JSON, missing files and missing fields

use digit_convnet::config::{build_network, load_config, validate_config, NetworkConfig};
use digit_convnet::{ConvNetError, FeatureMap, Layer, NetworkLayer, Sample, Shape};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ============================================================================
// Bundled Config Tests
// ============================================================================

mod bundled_config_tests {
    use super::*;

    #[test]
    fn test_load_mnist_config() {
        let config = load_config("config/mnist_cnn.json").expect("Failed to load MNIST config");

        assert_eq!(config.input_rows, 28);
        assert_eq!(config.input_cols, 28);
        assert_eq!(config.scaling_factor, 25600.0);
        assert_eq!(config.layers.len(), 3);
        assert_eq!(config.layers[0].layer_type, "convolution");
        assert_eq!(config.layers[0].num_filters, Some(8));
        assert_eq!(config.layers[0].filter_size, Some(5));
        assert_eq!(config.layers[1].layer_type, "max_pool");
        assert_eq!(config.layers[1].window_size, Some(3));
        assert_eq!(config.layers[1].stride, Some(2));
        assert_eq!(config.layers[2].is_last, Some(true));
    }

    #[test]
    fn test_build_mnist_network() {
        let config = load_config("config/mnist_cnn.json").unwrap();
        let mut network = build_network(&config).unwrap();

        let shapes: Vec<Shape> = network.layers().iter().map(Layer::output_shape).collect();
        assert_eq!(
            shapes,
            vec![Shape::new(8, 24, 24), Shape::new(8, 11, 11), Shape::flat(10)]
        );
        assert_eq!(network.parameter_count(), 8 * 25 + 968 * 10);

        let sample = Sample::new(FeatureMap::filled(28, 28, 128.0), 3);
        let output = network.predict(&sample).unwrap();
        assert_eq!(output.len(), 10);
    }

    #[test]
    fn test_config_matches_builder() {
        let config = load_config("config/mnist_cnn.json").unwrap();
        let from_config = build_network(&config).unwrap();

        let mut builder = digit_convnet::NetworkBuilder::new(28, 28, 25600.0);
        builder
            .add_convolution_layer(8, 5, 1, 0.1, 123)
            .unwrap()
            .add_max_pool_layer(3, 2)
            .unwrap()
            .add_fully_connected_layer(10, 0.1, 123, true)
            .unwrap();
        let from_builder = builder.build().unwrap();

        assert_eq!(from_config.snapshot(), from_builder.snapshot());
    }
}

// ============================================================================
// Parsing Tests
// ============================================================================

mod parsing_tests {
    use super::*;

    #[test]
    fn test_optional_fields_default() {
        let file = write_temp(
            r#"{
  "input_rows": 6,
  "input_cols": 6,
  "scaling_factor": 1.0,
  "layers": [
    { "layer_type": "max_pool", "window_size": 2 },
    { "layer_type": "fully_connected", "output_length": 3,
      "learning_rate": 0.1, "seed": 1 }
  ]
}"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.layers[0].stride, None);
        assert_eq!(config.layers[1].is_last, None);

        // stride defaults to 1, is_last to false
        let network = build_network(&config).unwrap();
        assert_eq!(network.layers()[0].output_shape(), Shape::new(1, 5, 5));
        assert!(!network.layers()[1].is_terminal());
    }

    #[test]
    fn test_layer_type_case_insensitive() {
        let file = write_temp(
            r#"{
  "input_rows": 4,
  "input_cols": 4,
  "scaling_factor": 1.0,
  "layers": [
    { "layer_type": "Fully_Connected", "output_length": 2,
      "learning_rate": 0.1, "seed": 1, "is_last": true }
  ]
}"#,
        );
        let network = build_network(&load_config(file.path()).unwrap()).unwrap();
        assert!(matches!(network.layers()[0], NetworkLayer::FullyConnected(_)));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = load_config("config/mnist_cnn.json").unwrap();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: NetworkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}

// ============================================================================
// Error Handling Tests
// ============================================================================

mod error_handling_tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            load_config("nonexistent_config.json"),
            Err(ConvNetError::Io(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        let file = write_temp("not valid json at all");
        assert!(matches!(load_config(file.path()), Err(ConvNetError::Json(_))));
    }

    #[test]
    fn test_missing_required_field() {
        let file = write_temp(
            r#"{
  "input_rows": 4,
  "input_cols": 4,
  "scaling_factor": 1.0,
  "layers": [
    { "layer_type": "convolution", "filter_size": 2, "learning_rate": 0.1, "seed": 1 }
  ]
}"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: Layer 0: missing num_filters"
        );
    }

    #[test]
    fn test_negative_learning_rate_rejected() {
        let mut config = load_config("config/mnist_cnn.json").unwrap();
        config.layers[2].learning_rate = Some(-0.1);
        assert!(matches!(
            validate_config(&config),
            Err(ConvNetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_scaling_factor_rejected() {
        let mut config = load_config("config/mnist_cnn.json").unwrap();
        config.scaling_factor = 0.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_window_larger_than_input_fails_on_build() {
        let mut config = load_config("config/mnist_cnn.json").unwrap();
        config.layers[1].window_size = Some(30);
        assert!(validate_config(&config).is_ok());
        assert!(build_network(&config).is_err());
    }
}
