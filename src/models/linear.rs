//! Logistic-regression classifier with optional standard scaling

use super::{margin_probability, Classifier};
use crate::error::{ShieldError, ShieldResult};
use serde::{Deserialize, Serialize};

/// Per-column standardization `(x - mean) / scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// Logistic model parameters as stored in an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaler: Option<StandardScaler>,
}

impl LogisticModel {
    /// Check parameter shapes against the expected input width
    pub fn validate(&self, width: usize) -> ShieldResult<()> {
        if self.coefficients.len() != width {
            return Err(ShieldError::artifact(format!(
                "logistic model has {} coefficients for {} features",
                self.coefficients.len(),
                width
            )));
        }
        if !self.intercept.is_finite() || self.coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ShieldError::artifact("logistic model has non-finite parameters"));
        }

        if let Some(scaler) = &self.scaler {
            if scaler.mean.len() != width || scaler.scale.len() != width {
                return Err(ShieldError::artifact(format!(
                    "scaler widths ({}, {}) do not match {} features",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    width
                )));
            }
            if scaler.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
                return Err(ShieldError::artifact("scaler has zero or non-finite scale"));
            }
        }

        Ok(())
    }

    fn decision(&self, row: &[f64]) -> f64 {
        let dot: f64 = match &self.scaler {
            Some(scaler) => row
                .iter()
                .zip(&self.coefficients)
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|((x, w), (m, s))| w * (x - m) / s)
                .sum(),
            None => row.iter().zip(&self.coefficients).map(|(x, w)| x * w).sum(),
        };
        self.intercept + dot
    }
}

impl Classifier for LogisticModel {
    fn kind(&self) -> &'static str {
        "logistic"
    }

    fn input_width(&self) -> usize {
        self.coefficients.len()
    }

    fn fraud_probabilities(&self, rows: &[Vec<f64>]) -> ShieldResult<Vec<f64>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.coefficients.len() {
                    return Err(ShieldError::invalid(format!(
                        "row has {} features, model expects {}",
                        row.len(),
                        self.coefficients.len()
                    )));
                }
                margin_probability(self.decision(row))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sigmoid;

    fn model() -> LogisticModel {
        LogisticModel {
            coefficients: vec![1.0, -2.0],
            intercept: 0.5,
            scaler: None,
        }
    }

    #[test]
    fn test_probability() {
        let p = model().fraud_probabilities(&[vec![1.0, 0.75]]).unwrap();
        // z = 0.5 + 1.0 - 1.5 = 0
        assert!((p[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_scaled_probability() {
        let mut m = model();
        m.scaler = Some(StandardScaler {
            mean: vec![1.0, 1.0],
            scale: vec![2.0, 0.5],
        });
        m.validate(2).unwrap();

        // z = 0.5 + 1.0 * (3 - 1) / 2 - 2.0 * (1 - 1) / 0.5 = 1.5
        let p = m.fraud_probabilities(&[vec![3.0, 1.0]]).unwrap();
        assert!((p[0] - sigmoid(1.5)).abs() < 1e-12);
    }

    #[test]
    fn test_validate_width() {
        assert!(model().validate(2).is_ok());
        assert!(matches!(model().validate(3), Err(ShieldError::ArtifactLoad(_))));
    }

    #[test]
    fn test_zero_scale_rejected() {
        let mut m = model();
        m.scaler = Some(StandardScaler {
            mean: vec![0.0, 0.0],
            scale: vec![1.0, 0.0],
        });
        assert!(m.validate(2).is_err());
    }

    #[test]
    fn test_wrong_row_width() {
        let err = model().fraud_probabilities(&[vec![1.0]]).unwrap_err();
        assert!(err.is_invalid_record());
    }

    #[test]
    fn test_overflowing_margin_is_invalid_record() {
        let m = LogisticModel {
            coefficients: vec![0.8, -0.9, -1.5],
            intercept: -6.0,
            scaler: None,
        };
        // partial sums reach +inf, then inf - inf = NaN
        let err = m
            .fraud_probabilities(&[vec![1.7e308, -1.7e308, 1.7e308]])
            .unwrap_err();
        assert!(err.is_invalid_record());

        // large but representable margins saturate instead
        let p = m.fraud_probabilities(&[vec![1e300, 0.0, 0.0]]).unwrap();
        assert_eq!(p[0], 1.0);
    }
}
