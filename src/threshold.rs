//! Decision threshold applied on top of the fraud probability.
//!
//! Thresholding lives outside the prediction service so callers can ask for
//! raw probabilities and pick their own cutoff.

use crate::error::{ShieldError, ShieldResult};
use crate::types::verdict::{FraudLabel, Probabilities};
use serde::{Deserialize, Serialize};

/// Cutoff probability in `[0, 1]`; label is fraud iff `p1 > t`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Threshold(f64);

impl Threshold {
    pub const DEFAULT: f64 = 0.5;

    pub fn new(value: f64) -> ShieldResult<Self> {
        if value.is_nan() || !(0.0..=1.0).contains(&value) {
            return Err(ShieldError::invalid(format!(
                "threshold must be within [0, 1], got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Label a fraud probability
    pub fn label(&self, fraud_probability: f64) -> FraudLabel {
        if fraud_probability > self.0 {
            FraudLabel::Fraud
        } else {
            FraudLabel::Legitimate
        }
    }

    pub fn classify(&self, probabilities: &Probabilities) -> FraudLabel {
        self.label(probabilities.fraud())
    }

    /// Resolve an optional per-request override against this default
    pub fn or_override(self, requested: Option<f64>) -> ShieldResult<Self> {
        match requested {
            Some(value) => Self::new(value),
            None => Ok(self),
        }
    }
}

impl Default for Threshold {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for Threshold {
    type Error = ShieldError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f64 {
    fn from(t: Threshold) -> Self {
        t.0
    }
}
