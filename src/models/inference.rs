//! Prediction service: the boundary between callers and the loaded artifact

use super::loader::{LoadedArtifact, ModelLoader};
use super::Classifier;
use crate::error::{ShieldError, ShieldResult};
use crate::feature_extractor::{FeatureEncoder, InputSchema};
use crate::threshold::Threshold;
use crate::types::verdict::{FraudLabel, Probabilities};
use crate::types::Record;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, error};

/// Labels and probabilities for a batch, one-to-one with the input records
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPrediction {
    pub labels: Vec<FraudLabel>,
    pub probabilities: Vec<Probabilities>,
}

impl BatchPrediction {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn fraud_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_fraud()).count()
    }
}

/// Description of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub kind: &'static str,
    pub schema: InputSchema,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

/// Loaded classifier plus its preprocessing transform.
///
/// Constructed once at startup and shared read-only. Scoring never mutates
/// observable state, so identical records always produce identical results.
pub struct PredictionService {
    name: String,
    encoder: FeatureEncoder,
    classifier: Box<dyn Classifier>,
}

impl PredictionService {
    /// Assemble a service from parts; encoder and classifier widths must agree
    pub fn new(
        name: impl Into<String>,
        encoder: FeatureEncoder,
        classifier: Box<dyn Classifier>,
    ) -> ShieldResult<Self> {
        if encoder.width() != classifier.input_width() {
            return Err(ShieldError::artifact(format!(
                "encoder produces {} columns but classifier expects {}",
                encoder.width(),
                classifier.input_width()
            )));
        }

        Ok(Self {
            name: name.into(),
            encoder,
            classifier,
        })
    }

    /// Load a service from an artifact file with the default loader
    pub fn load<P: AsRef<Path>>(path: P) -> ShieldResult<Self> {
        Self::load_with(&ModelLoader::new(), path)
    }

    /// Load a service from an artifact file with a configured loader
    pub fn load_with<P: AsRef<Path>>(loader: &ModelLoader, path: P) -> ShieldResult<Self> {
        let LoadedArtifact {
            name,
            encoder,
            classifier,
        } = loader.load(path)?;
        Self::new(name, encoder, classifier)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema this instance scores
    pub fn schema(&self) -> InputSchema {
        self.encoder.schema()
    }

    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            name: self.name.clone(),
            kind: self.classifier.kind(),
            schema: self.encoder.schema(),
            feature_count: self.encoder.width(),
            feature_names: self.encoder.feature_names(),
        }
    }

    /// Class probabilities `[p0, p1]` for one record; no threshold applied
    pub fn predict_proba(&self, record: &Record) -> ShieldResult<Probabilities> {
        let features = self.encoder.encode(record)?;
        let probabilities = self.score_rows(&[features])?;
        probabilities
            .into_iter()
            .next()
            .ok_or_else(|| ShieldError::prediction("classifier returned no probability"))
    }

    /// Binary label for one record (fraud iff p1 > 0.5)
    pub fn predict(&self, record: &Record) -> ShieldResult<FraudLabel> {
        let probabilities = self.predict_proba(record)?;
        Ok(Threshold::default().classify(&probabilities))
    }

    /// Vectorized scoring; results are in input order, one per record.
    ///
    /// Every record is validated before any is scored, so a malformed record
    /// rejects the whole batch instead of producing a partial result.
    pub fn predict_batch(&self, records: &[Record]) -> ShieldResult<BatchPrediction> {
        let rows = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                self.encoder.encode(record).map_err(|e| match e {
                    ShieldError::InvalidRecord(msg) => {
                        ShieldError::invalid(format!("record {}: {}", i + 1, msg))
                    }
                    other => other,
                })
            })
            .collect::<ShieldResult<Vec<_>>>()?;

        let probabilities = self.score_rows(&rows)?;
        let threshold = Threshold::default();
        let labels = probabilities.iter().map(|p| threshold.classify(p)).collect();

        Ok(BatchPrediction {
            labels,
            probabilities,
        })
    }

    fn score_rows(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<Probabilities>> {
        let raw = self.classifier.fraud_probabilities(rows).map_err(|e| {
            if !e.is_invalid_record() {
                error!(model = %self.name, error = %e, "Inference failed");
            }
            e
        })?;

        if raw.len() != rows.len() {
            return Err(ShieldError::prediction(format!(
                "classifier returned {} probabilities for {} rows",
                raw.len(),
                rows.len()
            )));
        }

        debug!(model = %self.name, rows = rows.len(), "Inference complete");

        raw.into_iter().map(Probabilities::from_fraud).collect()
    }
}
