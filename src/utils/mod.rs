//! Shared utilities for the engine
//!
//! Random number generation, activation functions and the 2D sliding-window
//! primitives used by the layers.

pub mod activations;
pub mod matrix;
pub mod rng;

pub use activations::{argmax, relu, relu_derivative, softmax};
pub use rng::SimpleRng;
