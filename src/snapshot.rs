//! Serializable network state.
//!
//! A [`NetworkSnapshot`] holds everything needed to rebuild a trained network:
//! input geometry, scaling factor, and every layer's construction parameters
//! together with its current weights. The on-disk format is left to the
//! caller; any serde format works.

use crate::feature_map::FeatureMap;
use serde::{Deserialize, Serialize};

/// Full state of one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "layer_type", rename_all = "snake_case")]
pub enum LayerSnapshot {
    Convolution {
        stride: usize,
        in_channels: usize,
        in_rows: usize,
        in_cols: usize,
        seed: u64,
        learning_rate: f64,
        filters: Vec<FeatureMap>,
    },
    MaxPool {
        stride: usize,
        window_size: usize,
        in_channels: usize,
        in_rows: usize,
        in_cols: usize,
    },
    FullyConnected {
        input_length: usize,
        output_length: usize,
        seed: u64,
        learning_rate: f64,
        is_terminal: bool,
        weights: Vec<f64>,
    },
}

/// Full state of a network, layers in chain order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub input_rows: usize,
    pub input_cols: usize,
    pub scaling_factor: f64,
    pub layers: Vec<LayerSnapshot>,
}
