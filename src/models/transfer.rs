use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::integrations::identity::{ConnectedWallet, TransactionSender};

// ==================== TRANSFER ====================

/// One user submission. Consumed by a single executor run.
#[derive(Clone, Default)]
pub struct TransferRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
    pub sender: Option<Arc<dyn TransactionSender>>,
    pub wallets: Vec<Arc<dyn ConnectedWallet>>,
}

impl TransferRequest {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount: amount.into(),
            sender: None,
            wallets: Vec::new(),
        }
    }

    pub fn with_sender(mut self, sender: Arc<dyn TransactionSender>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn with_wallets(mut self, wallets: Vec<Arc<dyn ConnectedWallet>>) -> Self {
        self.wallets = wallets;
        self
    }
}

impl fmt::Debug for TransferRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferRequest")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("amount", &self.amount)
            .field("has_sender", &self.sender.is_some())
            .field("wallets", &self.wallets.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResult {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub amount: String,
    pub timestamp: DateTime<Utc>,
}

// ==================== SEND PRIMITIVE ====================

/// `value` is the smallest-unit amount as decimal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionRequest {
    pub to: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendTransactionResponse {
    pub hash: String,
}

// ==================== CHAIN RECORDS ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    /// Smallest-unit value as decimal text.
    pub value: String,
    pub nonce: u64,
    pub block_number: Option<u64>,
    pub gas: String,
    pub gas_price: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub transaction_hash: String,
    pub block_number: Option<u64>,
    pub status: Option<u64>,
    pub gas_used: Option<String>,
}

impl ReceiptRecord {
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}
