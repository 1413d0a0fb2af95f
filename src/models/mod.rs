//! ML model inference components

pub mod artifact;
pub mod inference;
pub mod linear;
pub mod loader;
pub mod onnx;
pub mod tree;

use crate::error::{ShieldError, ShieldResult};

pub use artifact::ArtifactFile;
pub use inference::{BatchPrediction, ModelInfo, PredictionService};
pub use loader::{LoadedArtifact, ModelLoader};

/// A loaded binary classifier.
///
/// Implementations hold immutable parameters after load; scoring the same rows
/// twice yields the same probabilities.
pub trait Classifier: Send + Sync {
    /// Model family, e.g. "logistic" or "onnx"
    fn kind(&self) -> &'static str;

    /// Number of input columns each row must carry
    fn input_width(&self) -> usize;

    /// Fraud-class probability for each row, in input order
    fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>>;
}

/// Logistic sigmoid
pub(crate) fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Sigmoid of a decision margin; a margin that overflowed to inf or NaN means
/// the record's magnitudes are out of the model's numeric range
pub(crate) fn margin_probability(margin: f64) -> ShieldResult<f64> {
    if !margin.is_finite() {
        return Err(ShieldError::invalid(
            "feature magnitudes overflow the model's decision function",
        ));
    }
    Ok(sigmoid(margin))
}
