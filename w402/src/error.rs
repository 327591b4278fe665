//! The payment error taxonomy.
//!
//! Every failure mode of a payment attempt maps to exactly one variant of
//! [`PaymentError`]. The orchestrator folds these into a structured failure
//! outcome at its public boundary; nothing in this taxonomy escapes as a
//! panic or an opaque transport error. Each variant carries enough context
//! (amounts, caps, status codes) for the calling agent to decide whether to
//! retry, adjust limits, or fund the wallet.

use rust_decimal::Decimal;

use crate::limits::LimitViolation;

/// A fatal payment failure.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// The 402 response body was malformed or listed no payment options.
    #[error("invalid 402 challenge: {0}")]
    InvalidChallenge(String),

    /// The selector found no usable payment option.
    #[error("no compatible payment option: {0}")]
    NoCompatibleOption(String),

    /// A configured spend limit rejected the payment.
    #[error("{0}")]
    LimitExceeded(#[from] LimitViolation),

    /// The wallet balance does not cover the required amount.
    #[error(
        "Insufficient balance: have {available} {currency}, need {required} {currency}. \
         Fund the wallet to continue."
    )]
    InsufficientBalance {
        /// Display amount required by the selected option.
        required: Decimal,
        /// Display amount currently held.
        available: Decimal,
        /// Display currency name.
        currency: String,
    },

    /// An on-chain transfer reverted or was rejected by the node.
    #[error("transfer failed: {0}")]
    TransferFailed(String),

    /// Producing the signed payment authorization failed.
    #[error("signature failed: {0}")]
    SignatureFailed(String),

    /// The retried request came back non-2xx after payment was attached.
    #[error("payment failed with status {status}: {message}")]
    MerchantRejected {
        /// The HTTP status of the retried request.
        status: u16,
        /// Merchant-provided error text, or generic status text.
        message: String,
    },

    /// Catch-all for unexpected failures; always logged with the
    /// triggering URL before being surfaced.
    #[error("unexpected payment error: {0}")]
    Unexpected(String),
}

impl PaymentError {
    /// Returns the machine-readable kind tag used in audit entries.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidChallenge(_) => "invalid_challenge",
            Self::NoCompatibleOption(_) => "no_compatible_option",
            Self::LimitExceeded(_) => "limit_exceeded",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::TransferFailed(_) => "transfer_failed",
            Self::SignatureFailed(_) => "signature_failed",
            Self::MerchantRejected { .. } => "merchant_rejected",
            Self::Unexpected(_) => "unexpected_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_balance_names_both_amounts() {
        let err = PaymentError::InsufficientBalance {
            required: Decimal::new(1, 2),
            available: Decimal::ZERO,
            currency: "USDC".into(),
        };
        let text = err.to_string();
        assert!(text.contains("0.01"));
        assert!(text.contains("Insufficient") || text.contains("insufficient"));
    }

    #[test]
    fn merchant_rejection_names_status() {
        let err = PaymentError::MerchantRejected {
            status: 503,
            message: "payment failed with status 503".into(),
        };
        assert!(err.to_string().contains("503"));
        assert_eq!(err.kind(), "merchant_rejected");
    }
}
