//! Prediction outputs and the rendered verdict

use crate::error::{ShieldError, ShieldResult};
use crate::heuristics::FlagKind;
use crate::threshold::Threshold;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Binary fraud label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum FraudLabel {
    Legitimate,
    Fraud,
}

impl FraudLabel {
    pub fn as_u8(&self) -> u8 {
        match self {
            FraudLabel::Legitimate => 0,
            FraudLabel::Fraud => 1,
        }
    }

    /// Human-readable label used in exported tables
    pub fn as_str(&self) -> &'static str {
        match self {
            FraudLabel::Legitimate => "Legitimate",
            FraudLabel::Fraud => "Fraud",
        }
    }

    pub fn is_fraud(&self) -> bool {
        matches!(self, FraudLabel::Fraud)
    }
}

impl From<FraudLabel> for u8 {
    fn from(label: FraudLabel) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for FraudLabel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FraudLabel::Legitimate),
            1 => Ok(FraudLabel::Fraud),
            other => Err(format!("invalid fraud label: {}", other)),
        }
    }
}

/// Class probabilities `[p0, p1]`, summing to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Probabilities {
    legitimate: f64,
    fraud: f64,
}

impl Probabilities {
    /// Build from the fraud-class probability.
    ///
    /// Rejects values outside `[0, 1]`; a classifier producing them is broken.
    pub fn from_fraud(p1: f64) -> ShieldResult<Self> {
        if !p1.is_finite() || !(0.0..=1.0).contains(&p1) {
            return Err(ShieldError::prediction(format!(
                "classifier produced an invalid probability: {}",
                p1
            )));
        }
        Ok(Self {
            legitimate: 1.0 - p1,
            fraud: p1,
        })
    }

    pub fn legitimate(&self) -> f64 {
        self.legitimate
    }

    /// Fraud confidence (p1)
    pub fn fraud(&self) -> f64 {
        self.fraud
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.legitimate, self.fraud]
    }
}

/// Rendered outcome of scoring one record
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Unique verdict identifier
    pub verdict_id: String,
    pub label: FraudLabel,
    pub fraud: bool,
    pub fraud_probability: f64,
    pub probabilities: [f64; 2],
    pub threshold: f64,
    /// Fraud probability as a percentage, e.g. "12.34%"
    pub confidence: String,
    pub message: &'static str,
    /// Advisory rule-based flags, never part of the label
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagKind>,
    pub scored_at: DateTime<Utc>,
}

impl Verdict {
    /// Apply `threshold` to `probabilities` and render the outcome.
    pub fn new(probabilities: Probabilities, threshold: Threshold) -> Self {
        let label = threshold.label(probabilities.fraud());
        let message = match label {
            FraudLabel::Fraud => "Fraudulent Transaction Detected!",
            FraudLabel::Legitimate => "Legitimate Transaction",
        };

        Self {
            verdict_id: uuid::Uuid::new_v4().to_string(),
            label,
            fraud: label.is_fraud(),
            fraud_probability: probabilities.fraud(),
            probabilities: probabilities.as_array(),
            threshold: threshold.value(),
            confidence: format_percent(probabilities.fraud()),
            message,
            flags: Vec::new(),
            scored_at: Utc::now(),
        }
    }

    /// Attach advisory flags
    pub fn with_flags(mut self, flags: BTreeSet<FlagKind>) -> Self {
        self.flags = flags.into_iter().collect();
        self
    }
}

/// Format a probability as a percentage with two decimals
pub fn format_percent(p: f64) -> String {
    format!("{:.2}%", p * 100.0)
}
