//! Append-only local ledger of payment attempts.
//!
//! Every completed payment attempt (successful, or failed after funds were
//! committed) produces one [`TransactionRecord`]. Records are never mutated
//! after creation apart from status finalization at write time; the store
//! contract is append and list, newest first.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::proto::UnixTimestamp;

/// Final status of a payment attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Funds may have moved but the merchant exchange did not complete.
    Pending,
    /// Payment accepted by the merchant.
    Success,
    /// Payment rejected after funds were committed.
    Failed,
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Success => f.write_str("success"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// One completed payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Opaque unique identifier, assigned by the caller.
    pub id: String,
    /// When the attempt completed.
    pub timestamp: UnixTimestamp,
    /// The counterparty service (request host).
    pub service: String,
    /// Human-readable description of what was paid for.
    pub description: String,
    /// Display amount paid.
    pub amount: Decimal,
    /// Display currency (e.g., `"USDC"`).
    pub currency: String,
    /// Settlement transaction id, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<String>,
    /// Final status of the attempt.
    pub status: TransactionStatus,
}

/// Errors from the transaction store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The backing store rejected the operation.
    #[error("transaction store error: {0}")]
    Store(String),
}

/// Append-only store of [`TransactionRecord`]s.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Appends one record. Records are immutable once appended.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if the backing store rejects the write.
    async fn append(&self, record: TransactionRecord) -> Result<(), HistoryError>;

    /// Lists up to `limit` records, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError`] if the backing store cannot be read.
    async fn list(&self, limit: usize) -> Result<Vec<TransactionRecord>, HistoryError>;
}

/// In-process store backed by a mutex-guarded vector.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<TransactionRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns `true` if no records have been appended.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn append(&self, record: TransactionRecord) -> Result<(), HistoryError> {
        self.records.lock().await.push(record);
        Ok(())
    }

    async fn list(&self, limit: usize) -> Result<Vec<TransactionRecord>, HistoryError> {
        let records = self.records.lock().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}
