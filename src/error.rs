//! Error types for the convnet engine.
//!
//! Every fallible operation in the crate returns [`Result`]. Shape problems,
//! bad layer parameters and malformed samples are reported here instead of
//! being truncated or padded away.

use thiserror::Error;

/// All failure conditions raised by the engine.
#[derive(Debug, Error)]
pub enum ConvNetError {
    /// Two adjacent pieces of data or layers disagree on a dimension.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A layer was constructed with parameters that cannot produce output.
    #[error("invalid {layer} parameter: {reason}")]
    InvalidParameter { layer: &'static str, reason: String },

    /// A network or chain was built without any layers.
    #[error("network has no layers")]
    EmptyNetwork,

    /// A chain was wired so that a terminal layer is not the last stage.
    #[error("terminal layer at position {index} is not the last of {len} layers")]
    MisplacedTerminal { index: usize, len: usize },

    /// Backward was requested on a layer that has not seen a forward pass.
    #[error("{0} layer received a gradient before any forward pass")]
    NoCachedForward(&'static str),

    /// Training needs a ground-truth label but the sample has none.
    #[error("sample has no label")]
    MissingLabel,

    /// The label does not index into the network output.
    #[error("label {label} out of range for {classes} output classes")]
    LabelOutOfRange { label: usize, classes: usize },

    /// A matrix was empty or ragged.
    #[error("malformed matrix: {0}")]
    MalformedMatrix(String),

    /// A JSON network description failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ConvNetError>;
