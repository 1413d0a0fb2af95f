//! Feature encoding for model inference.
//!
//! Turns validated records into the numeric vectors a classifier consumes.
//! Vectors are produced in the exact column order the artifact was trained on.

use crate::error::{ShieldError, ShieldResult};
use crate::types::record::{FEATURE_COUNT, FEATURE_NAMES};
use crate::types::transaction::{Transaction, TransactionType};
use crate::types::Record;
use serde::{Deserialize, Serialize};

/// Names of the five monetary transaction columns, in model order
pub const TRANSACTION_AMOUNT_NAMES: [&str; 5] = [
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
];

/// Input schema served by one deployed service instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputSchema {
    /// 30 anonymized numeric features
    #[default]
    Anonymized,
    /// Six named transaction fields
    Transaction,
}

impl InputSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputSchema::Anonymized => "anonymized",
            InputSchema::Transaction => "transaction",
        }
    }
}

/// Encoding of the categorical `type` field
#[derive(Debug, Clone, PartialEq)]
pub enum TypeEncoding {
    /// Single column holding the class index
    Label(Vec<TransactionType>),
    /// One indicator column per class
    OneHot(Vec<TransactionType>),
}

impl TypeEncoding {
    fn classes(&self) -> &[TransactionType] {
        match self {
            TypeEncoding::Label(c) | TypeEncoding::OneHot(c) => c,
        }
    }

    fn width(&self) -> usize {
        match self {
            TypeEncoding::Label(_) => 1,
            TypeEncoding::OneHot(c) => c.len(),
        }
    }
}

/// Encoder that transforms records into model input vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureEncoder {
    schema: InputSchema,
    type_encoding: Option<TypeEncoding>,
}

impl FeatureEncoder {
    /// Encoder for the 30-value anonymized schema
    pub fn anonymized() -> Self {
        Self {
            schema: InputSchema::Anonymized,
            type_encoding: None,
        }
    }

    /// Encoder for the transaction schema.
    ///
    /// Every transaction type must appear exactly once in the encoding's classes.
    pub fn transaction(encoding: TypeEncoding) -> ShieldResult<Self> {
        let classes = encoding.classes();
        for t in TransactionType::ALL {
            let count = classes.iter().filter(|&&c| c == t).count();
            if count != 1 {
                return Err(ShieldError::artifact(format!(
                    "type encoder must list {} exactly once (found {})",
                    t, count
                )));
            }
        }
        if classes.len() != TransactionType::ALL.len() {
            return Err(ShieldError::artifact("type encoder lists unexpected classes"));
        }

        Ok(Self {
            schema: InputSchema::Transaction,
            type_encoding: Some(encoding),
        })
    }

    /// Default transaction encoder: label codes in alphabetical class order
    pub fn transaction_default() -> Self {
        Self {
            schema: InputSchema::Transaction,
            type_encoding: Some(TypeEncoding::Label(TransactionType::alphabetical())),
        }
    }

    /// Default encoder for a schema
    pub fn for_schema(schema: InputSchema) -> Self {
        match schema {
            InputSchema::Anonymized => Self::anonymized(),
            InputSchema::Transaction => Self::transaction_default(),
        }
    }

    pub fn schema(&self) -> InputSchema {
        self.schema
    }

    /// Number of model input columns produced
    pub fn width(&self) -> usize {
        match (&self.schema, &self.type_encoding) {
            (InputSchema::Anonymized, _) => FEATURE_COUNT,
            (InputSchema::Transaction, Some(enc)) => enc.width() + TRANSACTION_AMOUNT_NAMES.len(),
            (InputSchema::Transaction, None) => 1 + TRANSACTION_AMOUNT_NAMES.len(),
        }
    }

    /// Column names in model order
    pub fn feature_names(&self) -> Vec<String> {
        match (&self.schema, &self.type_encoding) {
            (InputSchema::Anonymized, _) => FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            (InputSchema::Transaction, encoding) => {
                let mut names: Vec<String> = match encoding {
                    Some(TypeEncoding::OneHot(classes)) => {
                        classes.iter().map(|c| format!("type_{}", c)).collect()
                    }
                    _ => vec!["type".to_string()],
                };
                names.extend(TRANSACTION_AMOUNT_NAMES.iter().map(|s| s.to_string()));
                names
            }
        }
    }

    /// Encode a record.
    ///
    /// A record of the other schema is rejected rather than coerced.
    pub fn encode(&self, record: &Record) -> ShieldResult<Vec<f64>> {
        match (self.schema, record) {
            (InputSchema::Anonymized, Record::Features(r)) => Ok(r.values().to_vec()),
            (InputSchema::Transaction, Record::Transaction(tx)) => self.encode_transaction(tx),
            (schema, record) => Err(ShieldError::invalid(format!(
                "this service scores {} records, got a {} record",
                schema.as_str(),
                record.schema_name()
            ))),
        }
    }

    fn encode_transaction(&self, tx: &Transaction) -> ShieldResult<Vec<f64>> {
        let mut features = Vec::with_capacity(self.width());

        let encoding = self
            .type_encoding
            .as_ref()
            .ok_or_else(|| ShieldError::prediction("transaction encoder has no type encoding"))?;
        let code = encoding
            .classes()
            .iter()
            .position(|&c| c == tx.tx_type())
            .ok_or_else(|| {
                ShieldError::invalid(format!(
                    "transaction type {} is unknown to the loaded encoder",
                    tx.tx_type()
                ))
            })?;

        match encoding {
            TypeEncoding::Label(_) => features.push(code as f64),
            TypeEncoding::OneHot(c) => {
                features.extend((0..c.len()).map(|i| if i == code { 1.0 } else { 0.0 }))
            }
        }

        features.extend_from_slice(&tx.amounts());
        Ok(features)
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::anonymized()
    }
}
