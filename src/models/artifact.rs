//! Self-describing JSON artifact format.
//!
//! The artifact carries everything needed to score a record: the input schema,
//! feature names, the categorical encoder for transaction records, and the
//! model parameters. It references no internal names of the training library.

use super::linear::LogisticModel;
use super::tree::{GradientBoostedModel, RandomForestModel};
use super::Classifier;
use crate::error::{ShieldError, ShieldResult};
use crate::feature_extractor::{FeatureEncoder, InputSchema, TypeEncoding};
use crate::types::transaction::TransactionType;
use serde::{Deserialize, Serialize};

/// Supported artifact format version
pub const FORMAT_VERSION: u32 = 1;

/// Categorical encoder kind for the transaction `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    Label,
    OneHot,
}

/// Encoder section of the artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderSpec {
    pub kind: EncoderKind,
    pub classes: Vec<TransactionType>,
}

/// Model parameters, tagged by family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    Logistic(LogisticModel),
    RandomForest(RandomForestModel),
    GradientBoosted(GradientBoostedModel),
}

/// Top-level artifact document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub format_version: u32,
    #[serde(default = "default_name")]
    pub name: String,
    pub schema: InputSchema,
    pub feature_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoder: Option<EncoderSpec>,
    pub model: ModelSpec,
}

fn default_name() -> String {
    "fraud_model".to_string()
}

impl ArtifactFile {
    /// Parse an artifact from JSON bytes
    pub fn from_slice(bytes: &[u8]) -> ShieldResult<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| ShieldError::artifact(format!("malformed artifact: {}", e)))
    }

    /// Validate the artifact and split it into its encoder and classifier.
    pub fn into_parts(self) -> ShieldResult<(String, FeatureEncoder, Box<dyn Classifier>)> {
        if self.format_version != FORMAT_VERSION {
            return Err(ShieldError::artifact(format!(
                "unsupported artifact format version {} (expected {})",
                self.format_version, FORMAT_VERSION
            )));
        }

        let encoder = match (self.schema, self.encoder) {
            (InputSchema::Anonymized, None) => FeatureEncoder::anonymized(),
            (InputSchema::Anonymized, Some(_)) => {
                return Err(ShieldError::artifact(
                    "anonymized-feature artifacts must not carry a type encoder",
                ))
            }
            (InputSchema::Transaction, Some(spec)) => FeatureEncoder::transaction(match spec.kind {
                EncoderKind::Label => TypeEncoding::Label(spec.classes),
                EncoderKind::OneHot => TypeEncoding::OneHot(spec.classes),
            })?,
            (InputSchema::Transaction, None) => {
                return Err(ShieldError::artifact(
                    "transaction artifacts must carry a type encoder",
                ))
            }
        };

        let width = encoder.width();
        if self.feature_names.len() != width {
            return Err(ShieldError::artifact(format!(
                "artifact lists {} feature names, {} schema encodes {} columns",
                self.feature_names.len(),
                self.schema.as_str(),
                width
            )));
        }

        let classifier: Box<dyn Classifier> = match self.model {
            ModelSpec::Logistic(model) => {
                model.validate(width)?;
                Box::new(model)
            }
            ModelSpec::RandomForest(mut model) => {
                model.validate(width)?;
                Box::new(model)
            }
            ModelSpec::GradientBoosted(mut model) => {
                model.validate(width)?;
                Box::new(model)
            }
        };

        Ok((self.name, encoder, classifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn logistic_artifact() -> serde_json::Value {
        json!({
            "format_version": 1,
            "name": "tx_logistic",
            "schema": "transaction",
            "feature_names": ["type", "amount", "oldbalanceOrg", "newbalanceOrig", "oldbalanceDest", "newbalanceDest"],
            "encoder": {"kind": "label", "classes": ["CASH_OUT", "DEPOSIT", "PAYMENT", "TRANSFER"]},
            "model": {"kind": "logistic", "coefficients": [0.1, 0.0, 0.0, 0.0, 0.0, 0.0], "intercept": -1.0}
        })
    }

    fn parse(value: serde_json::Value) -> ShieldResult<(String, FeatureEncoder, Box<dyn Classifier>)> {
        ArtifactFile::from_slice(value.to_string().as_bytes())?.into_parts()
    }

    #[test]
    fn test_transaction_artifact() {
        let (name, encoder, classifier) = parse(logistic_artifact()).unwrap();
        assert_eq!(name, "tx_logistic");
        assert_eq!(encoder.schema(), InputSchema::Transaction);
        assert_eq!(classifier.kind(), "logistic");
        assert_eq!(classifier.input_width(), 6);
    }

    #[test]
    fn test_forest_artifact() {
        let mut names = vec!["x".to_string(); 30];
        names[0] = "Time".to_string();
        let value = json!({
            "format_version": 1,
            "schema": "anonymized",
            "feature_names": names,
            "model": {"kind": "random_forest", "trees": [
                {"nodes": [{"feature": 14, "threshold": -2.5, "left": 1, "right": 2}, {"leaf": 0.9}, {"leaf": 0.05}]}
            ]}
        });
        let (name, encoder, classifier) = parse(value).unwrap();
        assert_eq!(name, "fraud_model");
        assert_eq!(encoder.width(), 30);
        assert_eq!(classifier.kind(), "random_forest");
        assert_eq!(classifier.input_width(), 30);
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut value = logistic_artifact();
        value["format_version"] = json!(2);
        assert!(matches!(parse(value), Err(ShieldError::ArtifactLoad(_))));
    }

    #[test]
    fn test_missing_encoder_rejected() {
        let mut value = logistic_artifact();
        value.as_object_mut().unwrap().remove("encoder");
        assert!(parse(value).is_err());
    }

    #[test]
    fn test_feature_name_mismatch_rejected() {
        let mut value = logistic_artifact();
        value["feature_names"] = json!(["type", "amount"]);
        assert!(parse(value).is_err());
    }

    #[test]
    fn test_unknown_model_kind_rejected() {
        let mut value = logistic_artifact();
        value["model"] = json!({"kind": "svm", "support_vectors": []});
        assert!(matches!(parse(value), Err(ShieldError::ArtifactLoad(_))));
    }

    #[test]
    fn test_corrupt_bytes_rejected() {
        let err = ArtifactFile::from_slice(b"\x80\x04\x95 pickle").unwrap_err();
        assert!(matches!(err, ShieldError::ArtifactLoad(_)));
    }
}
