//! Digit ConvNet Library
//!
//! A hand-written convolutional neural network engine: a chain of
//! convolution, max pooling and fully connected layers trained one sample at
//! a time by backpropagation.
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Convolution, MaxPool, FullyConnected)
//! - `chain`: Index-linked ordered layer chain
//! - `builder`: Network construction with shape inference
//! - `network`: Inference, training and evaluation
//! - `feature_map`: Feature maps, shapes and flatten/unflatten
//! - `sample`: Labeled input matrices
//! - `snapshot`: Serializable network state
//! - `config`: JSON network configuration
//! - `utils`: Shared utilities (RNG, activation functions, sliding windows)
//!
//! # Example
//!
//! ```
//! use digit_convnet::{FeatureMap, NetworkBuilder, Sample};
//!
//! let mut builder = NetworkBuilder::new(8, 8, 255.0);
//! builder
//!     .add_convolution_layer(2, 3, 1, 0.01, 7)?
//!     .add_max_pool_layer(2, 2)?
//!     .add_fully_connected_layer(3, 0.01, 7, true)?;
//! let mut network = builder.build()?;
//!
//! let samples = vec![Sample::new(FeatureMap::filled(8, 8, 255.0), 1)];
//! network.train_one_epoch(&samples)?;
//! let accuracy = network.evaluate(&samples)?;
//! assert!((0.0..=1.0).contains(&accuracy));
//! # Ok::<(), digit_convnet::ConvNetError>(())
//! ```

pub mod builder;
pub mod chain;
pub mod config;
pub mod error;
pub mod feature_map;
pub mod layers;
pub mod network;
pub mod sample;
pub mod snapshot;
pub mod utils;

pub use builder::NetworkBuilder;
pub use chain::LayerChain;
pub use error::{ConvNetError, Result};
pub use feature_map::{flatten, unflatten, Activation, FeatureMap, Shape};
pub use layers::{ConvolutionLayer, FullyConnectedLayer, Layer, MaxPoolLayer, NetworkLayer};
pub use network::{EpochSummary, Network};
pub use sample::Sample;
pub use snapshot::{LayerSnapshot, NetworkSnapshot};
