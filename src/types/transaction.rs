//! Transaction record with named balance fields

use crate::error::{ShieldError, ShieldResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Payment,
    CashOut,
    Transfer,
    Deposit,
}

impl TransactionType {
    /// All types, in declaration order
    pub const ALL: [TransactionType; 4] = [
        TransactionType::Payment,
        TransactionType::CashOut,
        TransactionType::Transfer,
        TransactionType::Deposit,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Payment => "PAYMENT",
            TransactionType::CashOut => "CASH_OUT",
            TransactionType::Transfer => "TRANSFER",
            TransactionType::Deposit => "DEPOSIT",
        }
    }

    /// Classes sorted by name, the order a label encoder assigns codes in
    pub fn alphabetical() -> Vec<TransactionType> {
        let mut classes = Self::ALL.to_vec();
        classes.sort_by_key(|t| t.as_str());
        classes
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = ShieldError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| ShieldError::invalid(format!("unknown transaction type: {:?}", s)))
    }
}

/// Raw wire form, validated into [`Transaction`]
#[derive(Debug, Clone, Deserialize)]
struct TransactionFields {
    #[serde(rename = "type")]
    tx_type: TransactionType,
    amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_dest: f64,
}

/// A single money movement between an originating and a destination account.
///
/// All monetary fields are finite and non-negative; construction fails otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionFields")]
pub struct Transaction {
    #[serde(rename = "type")]
    tx_type: TransactionType,
    amount: f64,
    #[serde(rename = "oldbalanceOrg")]
    old_balance_org: f64,
    #[serde(rename = "newbalanceOrig")]
    new_balance_orig: f64,
    #[serde(rename = "oldbalanceDest")]
    old_balance_dest: f64,
    #[serde(rename = "newbalanceDest")]
    new_balance_dest: f64,
}

impl Transaction {
    /// Create a validated transaction
    pub fn new(
        tx_type: TransactionType,
        amount: f64,
        old_balance_org: f64,
        new_balance_orig: f64,
        old_balance_dest: f64,
        new_balance_dest: f64,
    ) -> ShieldResult<Self> {
        let fields = [
            ("amount", amount),
            ("oldbalanceOrg", old_balance_org),
            ("newbalanceOrig", new_balance_orig),
            ("oldbalanceDest", old_balance_dest),
            ("newbalanceDest", new_balance_dest),
        ];

        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ShieldError::invalid(format!("{} must be a finite number", name)));
            }
            if value < 0.0 {
                return Err(ShieldError::invalid(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }

        Ok(Self {
            tx_type,
            amount,
            old_balance_org,
            new_balance_orig,
            old_balance_dest,
            new_balance_dest,
        })
    }

    pub fn tx_type(&self) -> TransactionType {
        self.tx_type
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn old_balance_org(&self) -> f64 {
        self.old_balance_org
    }

    pub fn new_balance_orig(&self) -> f64 {
        self.new_balance_orig
    }

    pub fn old_balance_dest(&self) -> f64 {
        self.old_balance_dest
    }

    pub fn new_balance_dest(&self) -> f64 {
        self.new_balance_dest
    }

    /// The five monetary fields in model order
    pub fn amounts(&self) -> [f64; 5] {
        [
            self.amount,
            self.old_balance_org,
            self.new_balance_orig,
            self.old_balance_dest,
            self.new_balance_dest,
        ]
    }
}

impl TryFrom<TransactionFields> for Transaction {
    type Error = ShieldError;

    fn try_from(f: TransactionFields) -> Result<Self, Self::Error> {
        Transaction::new(
            f.tx_type,
            f.amount,
            f.old_balance_org,
            f.new_balance_orig,
            f.old_balance_dest,
            f.new_balance_dest,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_serialization() {
        let tx = Transaction::new(TransactionType::Transfer, 181.0, 181.0, 0.0, 0.0, 0.0).unwrap();

        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"type\":\"TRANSFER\""));
        assert!(json.contains("\"oldbalanceOrg\":181.0"));

        let deserialized: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(tx, deserialized);
    }

    #[test]
    fn test_negative_amount_rejected() {
        let err = Transaction::new(TransactionType::Payment, -1.0, 0.0, 0.0, 0.0, 0.0).unwrap_err();
        assert!(err.is_invalid_record());

        let json = r#"{"type":"PAYMENT","amount":10,"oldbalanceOrg":-5,"newbalanceOrig":0,"oldbalanceDest":0,"newbalanceDest":0}"#;
        let err = serde_json::from_str::<Transaction>(json).unwrap_err();
        assert!(err.to_string().contains("oldbalanceOrg"));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"type":"DEBIT","amount":10,"oldbalanceOrg":0,"newbalanceOrig":0,"oldbalanceDest":0,"newbalanceDest":0}"#;
        assert!(serde_json::from_str::<Transaction>(json).is_err());
    }

    #[test]
    fn test_type_from_str() {
        assert_eq!("cash_out".parse::<TransactionType>().unwrap(), TransactionType::CashOut);
        assert_eq!(" Cash-Out ".parse::<TransactionType>().unwrap(), TransactionType::CashOut);
        assert!("wire".parse::<TransactionType>().is_err());
    }

    #[test]
    fn test_alphabetical_order() {
        assert_eq!(
            TransactionType::alphabetical(),
            vec![
                TransactionType::CashOut,
                TransactionType::Deposit,
                TransactionType::Payment,
                TransactionType::Transfer,
            ]
        );
    }
}
