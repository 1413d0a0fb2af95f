//! Type definitions for the fraud scoring service

pub mod record;
pub mod transaction;
pub mod verdict;

pub use record::{FeatureRecord, FEATURE_COUNT, FEATURE_NAMES, SAMPLE_TRANSACTION};
pub use transaction::{Transaction, TransactionType};
pub use verdict::{FraudLabel, Probabilities, Verdict};

/// A request-scoped input record of either schema
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Features(FeatureRecord),
    Transaction(Transaction),
}

impl Record {
    pub fn schema_name(&self) -> &'static str {
        match self {
            Record::Features(_) => "anonymized",
            Record::Transaction(_) => "transaction",
        }
    }
}

impl From<FeatureRecord> for Record {
    fn from(record: FeatureRecord) -> Self {
        Record::Features(record)
    }
}

impl From<Transaction> for Record {
    fn from(tx: Transaction) -> Self {
        Record::Transaction(tx)
    }
}
