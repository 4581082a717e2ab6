//! The trainable network: inference, loss, training and evaluation.

use crate::chain::LayerChain;
use crate::error::{ConvNetError, Result};
use crate::feature_map::{Activation, Shape};
use crate::layers::{Layer, NetworkLayer};
use crate::sample::Sample;
use crate::snapshot::NetworkSnapshot;
use crate::utils::argmax;
use log::{debug, info, warn};

/// Outcome of one pass over a training set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochSummary {
    /// Number of samples trained on.
    pub samples: usize,
    /// Mean cross-entropy of the predictions made before each update.
    pub mean_loss: f64,
}

/// A chain of layers plus the input scaling applied to every sample.
///
/// Training is strictly sequential: each sample's forward pass completes,
/// then its backward pass runs all the way to the first layer before the
/// next sample is touched.
#[derive(Debug, Clone)]
pub struct Network {
    chain: LayerChain,
    input_rows: usize,
    input_cols: usize,
    scaling_factor: f64,
}

impl Network {
    /// Wrap a wired chain.
    ///
    /// The first layer must accept a single `input_rows × input_cols` matrix
    /// and `scaling_factor` must be finite and non-zero.
    pub fn new(
        chain: LayerChain,
        input_rows: usize,
        input_cols: usize,
        scaling_factor: f64,
    ) -> Result<Self> {
        if !scaling_factor.is_finite() || scaling_factor == 0.0 {
            return Err(ConvNetError::InvalidParameter {
                layer: "network",
                reason: format!("scaling factor must be finite and non-zero, got {}", scaling_factor),
            });
        }

        let expected = chain.input_shape();
        let provided = Shape::new(1, input_rows, input_cols);
        let accepts = if expected.is_flat() {
            expected.elements() == provided.elements()
        } else {
            expected == provided
        };
        if !accepts {
            return Err(ConvNetError::ShapeMismatch {
                context: "network input",
                expected: expected.elements(),
                actual: provided.elements(),
            });
        }

        debug!(
            "network over {}x{} inputs, {} layers, {} parameters",
            input_rows,
            input_cols,
            chain.len(),
            chain.parameter_count()
        );
        Ok(Self {
            chain,
            input_rows,
            input_cols,
            scaling_factor,
        })
    }

    /// Rebuild a network, weights included, from a snapshot.
    pub fn from_snapshot(snapshot: NetworkSnapshot) -> Result<Self> {
        let layers = snapshot
            .layers
            .into_iter()
            .map(NetworkLayer::from_snapshot)
            .collect::<Result<Vec<_>>>()?;
        Self::new(
            LayerChain::new(layers)?,
            snapshot.input_rows,
            snapshot.input_cols,
            snapshot.scaling_factor,
        )
    }

    /// Capture the complete current state.
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            input_rows: self.input_rows,
            input_cols: self.input_cols,
            scaling_factor: self.scaling_factor,
            layers: self.chain.layers().iter().map(Layer::snapshot).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn layers(&self) -> &[NetworkLayer] {
        self.chain.layers()
    }

    pub fn chain(&self) -> &LayerChain {
        &self.chain
    }

    pub fn scaling_factor(&self) -> f64 {
        self.scaling_factor
    }

    /// Length of the output vector (number of classes).
    pub fn output_length(&self) -> usize {
        self.chain.output_shape().elements()
    }

    /// Total trainable scalars.
    pub fn parameter_count(&self) -> usize {
        self.chain.parameter_count()
    }

    /// Forward pass: returns the terminal layer's output vector.
    pub fn predict(&mut self, sample: &Sample) -> Result<Vec<f64>> {
        if sample.rows() != self.input_rows {
            return Err(ConvNetError::ShapeMismatch {
                context: "sample rows",
                expected: self.input_rows,
                actual: sample.rows(),
            });
        }
        if sample.cols() != self.input_cols {
            return Err(ConvNetError::ShapeMismatch {
                context: "sample cols",
                expected: self.input_cols,
                actual: sample.cols(),
            });
        }

        let scaled = sample.matrix().scaled(1.0 / self.scaling_factor);
        self.chain.forward(Activation::Maps(vec![scaled]))
    }

    /// Predicted class: index of the largest output (earliest on ties).
    pub fn classify(&mut self, sample: &Sample) -> Result<usize> {
        let output = self.predict(sample)?;
        argmax(&output).ok_or(ConvNetError::EmptyNetwork)
    }

    /// Cross-entropy of the current prediction for a labeled sample.
    pub fn loss(&mut self, sample: &Sample) -> Result<f64> {
        let label = sample.label().ok_or(ConvNetError::MissingLabel)?;
        let output = self.predict(sample)?;
        cross_entropy(&output, label)
    }

    /// Fraction of `samples` whose predicted class equals their label.
    ///
    /// Unlabeled samples count as misclassified. An empty slice scores `0.0`.
    pub fn evaluate(&mut self, samples: &[Sample]) -> Result<f64> {
        if samples.is_empty() {
            return Ok(0.0);
        }

        let mut correct = 0usize;
        let mut unlabeled = 0usize;
        for sample in samples {
            let guess = self.classify(sample)?;
            match sample.label() {
                Some(label) if label == guess => correct += 1,
                Some(_) => {}
                None => unlabeled += 1,
            }
        }
        if unlabeled > 0 {
            warn!("{} of {} evaluated samples have no label", unlabeled, samples.len());
        }

        let accuracy = correct as f64 / samples.len() as f64;
        info!(
            "evaluated {} samples: {} correct, accuracy {:.4}",
            samples.len(),
            correct,
            accuracy
        );
        Ok(accuracy)
    }

    /// One forward/backward step for a single labeled sample.
    ///
    /// Returns the loss of the prediction made before the update.
    pub fn train_sample(&mut self, sample: &Sample) -> Result<f64> {
        let label = sample.label().ok_or(ConvNetError::MissingLabel)?;
        let output = self.predict(sample)?;
        let grad = loss_gradient(&output, label)?;
        let loss = cross_entropy(&output, label)?;
        self.chain.backward(grad)?;
        Ok(loss)
    }

    /// Train once on every sample, in the order given.
    pub fn train_one_epoch(&mut self, samples: &[Sample]) -> Result<EpochSummary> {
        let mut total_loss = 0.0;
        for sample in samples {
            total_loss += self.train_sample(sample)?;
        }

        let mean_loss = if samples.is_empty() {
            0.0
        } else {
            total_loss / samples.len() as f64
        };
        info!("trained on {} samples, mean loss {:.6}", samples.len(), mean_loss);
        Ok(EpochSummary {
            samples: samples.len(),
            mean_loss,
        })
    }
}

/// dL/dOutput for a one-hot target: `output - one_hot(label)`.
pub fn loss_gradient(output: &[f64], label: usize) -> Result<Vec<f64>> {
    check_label(output, label)?;
    Ok(output
        .iter()
        .enumerate()
        .map(|(i, &p)| if i == label { p - 1.0 } else { p })
        .collect())
}

/// `-ln(output[label])`, with the probability floored at the smallest
/// positive double so the loss stays finite.
pub fn cross_entropy(output: &[f64], label: usize) -> Result<f64> {
    check_label(output, label)?;
    Ok(-output[label].max(f64::MIN_POSITIVE).ln())
}

fn check_label(output: &[f64], label: usize) -> Result<()> {
    if label >= output.len() {
        return Err(ConvNetError::LabelOutOfRange {
            label,
            classes: output.len(),
        });
    }
    Ok(())
}
