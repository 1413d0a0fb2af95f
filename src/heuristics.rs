//! Rule-based suspicious-pattern flags over transaction records.
//!
//! Flags are advisory annotations shown next to the model verdict. They never
//! feed into the label.

use crate::types::transaction::Transaction;
use serde::Serialize;
use std::collections::BTreeSet;

/// Structural pattern that makes a transaction look suspicious
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FlagKind {
    /// Transaction amount is zero
    AmountZero,
    /// Sender balance did not move
    SenderBalanceUnchanged,
    /// Receiver balance did not move
    ReceiverBalanceUnchanged,
}

impl FlagKind {
    pub fn description(&self) -> &'static str {
        match self {
            FlagKind::AmountZero => "Transaction amount is zero",
            FlagKind::SenderBalanceUnchanged => "Sender balance unchanged after transaction",
            FlagKind::ReceiverBalanceUnchanged => "Receiver balance unchanged after transaction",
        }
    }
}

/// Compute the advisory flags for a transaction.
pub fn flags(tx: &Transaction) -> BTreeSet<FlagKind> {
    let mut out = BTreeSet::new();

    if tx.amount() == 0.0 {
        out.insert(FlagKind::AmountZero);
    }
    if tx.old_balance_org() == tx.new_balance_orig() {
        out.insert(FlagKind::SenderBalanceUnchanged);
    }
    if tx.old_balance_dest() == tx.new_balance_dest() {
        out.insert(FlagKind::ReceiverBalanceUnchanged);
    }

    out
}
