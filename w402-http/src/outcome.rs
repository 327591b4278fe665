//! The structured result returned from a payment attempt.
//!
//! The orchestrator's public entry point never propagates errors; every
//! failure folds into a [`PaymentOutcome`] with `success: false` and a
//! human-readable message that carries enough context (amounts, caps,
//! status codes) for the calling agent to act.

use rust_decimal::Decimal;
use serde::Serialize;

/// Details of a completed payment, present only when funds were exchanged.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    /// Display amount paid.
    pub amount_paid: Decimal,
    /// Display currency (e.g., `"USDC"`).
    pub currency: String,
    /// The counterparty service (request host).
    pub service: String,
    /// Settlement transaction id, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement_id: Option<String>,
}

/// Result of [`execute_payment`](crate::client::PaymentClient::execute_payment).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    /// Whether the resource was obtained.
    pub success: bool,
    /// The response body, parsed as JSON when possible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    /// Payment details when a payment was made; `None` for free resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentReceipt>,
    /// Failure description when `success` is `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PaymentOutcome {
    /// The resource was served without payment.
    #[must_use]
    pub const fn free(body: serde_json::Value) -> Self {
        Self {
            success: true,
            body: Some(body),
            payment: None,
            error: None,
        }
    }

    /// The resource was served after a successful payment.
    #[must_use]
    pub const fn paid(body: serde_json::Value, receipt: PaymentReceipt) -> Self {
        Self {
            success: true,
            body: Some(body),
            payment: Some(receipt),
            error: None,
        }
    }

    /// The attempt failed; `error` describes why.
    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            body: None,
            payment: None,
            error: Some(error.into()),
        }
    }
}
