//! Collaborator traits implemented by chain-specific crates.
//!
//! The core crate never talks to a blockchain directly. Balance queries and
//! transfers go through a [`LedgerClient`]; proof-of-payment production goes
//! through a [`ProofStrategy`]; identity signing goes through an
//! [`IdentityKey`]. The EVM implementations live in `w402-evm`; the
//! permissioned-ledger side is an external collaborator consumed through the
//! same [`LedgerClient`] interface.

use async_trait::async_trait;

use crate::proto::PaymentRequirements;

/// A balance snapshot in the ledger's smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    /// Amount held, in smallest units.
    pub amount: u128,
    /// Decimal count of the asset.
    pub decimals: u8,
}

/// Result of a submitted transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    /// Ledger transaction identifier.
    pub tx_id: String,
    /// Whether the transfer was confirmed by the ledger.
    pub confirmed: bool,
}

/// Errors from ledger interactions.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The address could not be parsed for this ledger.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    /// The ledger node returned an error.
    #[error("ledger rpc error: {0}")]
    Rpc(String),
    /// The transfer was included but reverted.
    #[error("transfer reverted: {0}")]
    TransferReverted(String),
}

/// Balance and transfer operations against one ledger.
///
/// Implementations exist per ledger family; callers treat them opaquely.
/// The balance check and a subsequent transfer are not atomic with each
/// other, so a concurrent spend can still race between them.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Returns the balance held by `address` in the payment asset.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] on address or RPC failures.
    async fn balance_of(&self, address: &str) -> Result<Balance, LedgerError>;

    /// Transfers `amount_base_units` of the payment asset to `to` and waits
    /// for one confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::TransferReverted`] if the transfer was
    /// included but failed, or [`LedgerError::Rpc`] on submission failures.
    async fn transfer(
        &self,
        to: &str,
        amount_base_units: u128,
    ) -> Result<TransferReceipt, LedgerError>;
}

/// Proof of payment ready to attach to the retried request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProof {
    /// The payment header value (encoding is strategy-specific).
    pub header_value: String,
    /// Settlement transaction id, when funds already moved.
    pub settlement_id: Option<String>,
}

/// Errors from proof production.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    /// The strategy cannot satisfy the selected option.
    #[error("unsupported payment option: {0}")]
    UnsupportedOption(String),
    /// Signing the payment authorization failed.
    #[error("signing failed: {0}")]
    SignatureFailed(String),
    /// The settlement transfer failed or reverted.
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

/// Produces proof of payment for a selected option.
///
/// Two interchangeable strategies exist behind this interface: an off-chain
/// signed authorization (no funds move until the merchant settles it) and an
/// on-chain transfer (the confirmed transaction id becomes the proof).
/// Exactly one strategy is active per deployment; the orchestrator never
/// falls back to the other mid-flow because the proof encodings differ.
#[async_trait]
pub trait ProofStrategy: Send + Sync {
    /// The payer address proofs are produced for.
    fn payer(&self) -> String;

    /// Produces proof of payment for `requirements`.
    ///
    /// # Errors
    ///
    /// Returns [`ProofError`] when the option cannot be satisfied, signing
    /// fails, or the settlement transfer fails.
    async fn produce_proof(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentProof, ProofError>;
}

/// Errors from identity signing.
#[derive(Debug, thiserror::Error)]
pub enum SignError {
    /// The underlying key refused to sign.
    #[error("identity signing failed: {0}")]
    Signing(String),
}

/// A locally held identity signing key.
///
/// Used for request attestation; the key identifier is embedded in the
/// signature parameters so verifiers can locate the public key.
#[async_trait]
pub trait IdentityKey: Send + Sync {
    /// Stable identifier for the key (e.g., `"erc8128:8453:0x…"`).
    fn key_id(&self) -> String;

    /// Signs an arbitrary message, returning raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignError`] if the key cannot produce a signature.
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignError>;
}

impl From<ProofError> for crate::error::PaymentError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::UnsupportedOption(msg) => Self::NoCompatibleOption(msg),
            ProofError::SignatureFailed(msg) => Self::SignatureFailed(msg),
            ProofError::TransferFailed(msg) => Self::TransferFailed(msg),
        }
    }
}
