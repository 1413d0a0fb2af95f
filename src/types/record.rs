//! Anonymized-feature record (Time, V1..V28, Amount)

use crate::error::{ShieldError, ShieldResult};
use serde::{Serialize, Serializer};
use std::str::FromStr;

/// Number of values in an anonymized-feature record
pub const FEATURE_COUNT: usize = 30;

/// Column names in model order
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Time", "V1", "V2", "V3", "V4", "V5", "V6", "V7", "V8", "V9", "V10", "V11", "V12", "V13",
    "V14", "V15", "V16", "V17", "V18", "V19", "V20", "V21", "V22", "V23", "V24", "V25", "V26",
    "V27", "V28", "Amount",
];

/// Fixed sample transaction offered for one-click scoring
pub const SAMPLE_TRANSACTION: [f64; FEATURE_COUNT] = [
    0.0,
    -1.35980713,
    -0.07278117,
    2.53634674,
    1.37815522,
    -0.33832077,
    0.46238778,
    0.23959855,
    0.0986979,
    0.36378697,
    0.09079417,
    -0.55159953,
    -0.61780086,
    -0.99138985,
    -0.31116935,
    1.46817697,
    -0.47040053,
    0.20797124,
    0.02579058,
    0.40399296,
    0.2514121,
    -0.01830678,
    0.27783757,
    -0.11047391,
    0.06692807,
    0.12853936,
    -0.18911484,
    0.13355838,
    -0.02105305,
    149.62,
];

/// An ordered, validated sequence of exactly 30 finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    values: [f64; FEATURE_COUNT],
}

impl FeatureRecord {
    /// Build a record from already-numeric values.
    pub fn new(values: &[f64]) -> ShieldResult<Self> {
        if values.len() != FEATURE_COUNT {
            return Err(ShieldError::invalid(format!(
                "expected exactly {} values, got {}",
                FEATURE_COUNT,
                values.len()
            )));
        }

        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ShieldError::invalid(format!(
                "value for {} is not a finite number",
                FEATURE_NAMES[pos]
            )));
        }

        let mut out = [0.0; FEATURE_COUNT];
        out.copy_from_slice(values);
        Ok(Self { values: out })
    }

    /// Parse a free-text comma-separated list of 30 numbers.
    pub fn parse(input: &str) -> ShieldResult<Self> {
        Self::from_cells(input.split(','))
    }

    /// Parse a record from string cells (free text tokens or CSV cells).
    pub fn from_cells<'a, I>(cells: I) -> ShieldResult<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let values = cells
            .into_iter()
            .enumerate()
            .map(|(i, cell)| parse_value(i, cell))
            .collect::<ShieldResult<Vec<f64>>>()?;
        Self::new(&values)
    }

    /// The fixed sample transaction.
    pub fn sample() -> Self {
        Self {
            values: SAMPLE_TRANSACTION,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Amount column (last value)
    pub fn amount(&self) -> f64 {
        self.values[FEATURE_COUNT - 1]
    }

    /// Comma-separated display form with values rounded to 4 decimals
    pub fn display_rounded(&self) -> String {
        self.values
            .iter()
            .map(|v| format!("{}", (v * 10_000.0).round() / 10_000.0))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn parse_value(index: usize, cell: &str) -> ShieldResult<f64> {
    let token = cell.trim();
    let name = FEATURE_NAMES.get(index).copied().unwrap_or("extra column");
    token.parse::<f64>().map_err(|_| {
        ShieldError::invalid(format!(
            "value {} ({}) is not numeric: {:?}",
            index + 1,
            name,
            token
        ))
    })
}

impl FromStr for FeatureRecord {
    type Err = ShieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.values.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_of(n: usize) -> String {
        (0..n).map(|i| format!("{}.5", i)).collect::<Vec<_>>().join(", ")
    }

    #[test]
    fn test_parse_thirty_values() {
        let record = FeatureRecord::parse(&csv_of(30)).unwrap();
        assert_eq!(record.values().len(), 30);
        assert_eq!(record.values()[0], 0.5);
        assert_eq!(record.amount(), 29.5);
    }

    #[test]
    fn test_wrong_count_rejected() {
        let err = FeatureRecord::parse(&csv_of(29)).unwrap_err();
        assert!(err.is_invalid_record());
        assert!(err.to_string().contains("got 29"));

        assert!(FeatureRecord::parse(&csv_of(31)).unwrap_err().is_invalid_record());
    }

    #[test]
    fn test_non_numeric_rejected() {
        let mut tokens: Vec<String> = (0..30).map(|i| i.to_string()).collect();
        tokens[14] = "abc".to_string();
        let err = FeatureRecord::parse(&tokens.join(",")).unwrap_err();
        assert!(err.is_invalid_record());
        assert!(err.to_string().contains("V14"));
    }

    #[test]
    fn test_empty_token_rejected() {
        let input = format!("{},", csv_of(29));
        assert!(FeatureRecord::parse(&input).unwrap_err().is_invalid_record());
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut values = SAMPLE_TRANSACTION.to_vec();
        values[3] = f64::NAN;
        assert!(FeatureRecord::new(&values).unwrap_err().is_invalid_record());
    }

    #[test]
    fn test_sample() {
        let sample = FeatureRecord::sample();
        assert_eq!(sample.amount(), 149.62);
        assert!(sample.display_rounded().starts_with("0, -1.3598, -0.0728"));
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_serialize_as_array() {
        let json = serde_json::to_value(FeatureRecord::sample()).unwrap();
        assert_eq!(json.as_array().unwrap().len(), 30);
    }
}
