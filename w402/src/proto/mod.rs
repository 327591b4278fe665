//! Wire format types for the x402 payment protocol, wallet side.
//!
//! This module defines the JSON shapes exchanged with merchants during a
//! 402 payment negotiation:
//!
//! - [`PaymentRequired`] - the HTTP 402 challenge body
//! - [`PaymentRequirements`] - a single acceptable payment option
//! - [`PaymentPayload`] - the outbound signed payment envelope
//! - [`ExactScheme`] - marker for the canonical `"exact"` scheme
//!
//! All types serialize to JSON with camelCase field names. Parsing is strict
//! at the boundary: challenges missing required fields are rejected here
//! rather than surfacing as missing values deep inside the payment flow.

use serde::{Deserialize, Serialize};

mod encoding;
mod timestamp;
mod version;

pub use encoding::Base64Bytes;
pub use timestamp::UnixTimestamp;
pub use version::Version;

/// Version marker for x402 protocol version 1.
///
/// Serializes as the bare integer `1` and rejects other values on
/// deserialization.
pub type X402Version1 = Version<1>;

/// Convenience constant for constructing protocol messages.
pub const V1: X402Version1 = Version;

/// A unit struct representing the string literal `"exact"`.
///
/// This is the canonical scheme name for exact-amount transfer payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactScheme;

impl ExactScheme {
    /// The string literal value: `"exact"`.
    pub const VALUE: &'static str = "exact";
}

impl std::fmt::Display for ExactScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::VALUE)
    }
}

impl AsRef<str> for ExactScheme {
    fn as_ref(&self) -> &str {
        Self::VALUE
    }
}

/// HTTP 402 Payment Required challenge body.
///
/// Returned by a merchant when a resource requires payment. Contains the
/// list of acceptable payment options. An empty `accepts` list parses
/// successfully but is rejected by the orchestrator as an invalid challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// List of acceptable payment options.
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    /// Optional error message if the original request was malformed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A single payment option from a 402 challenge.
///
/// Defines the terms under which the merchant accepts payment: scheme,
/// network, amount, recipient, and asset. Immutable once parsed; selection
/// among multiple options is a pure function over the challenge's list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// The payment scheme (e.g., `"exact"`).
    pub scheme: String,
    /// The network identifier (e.g., `"base"`).
    pub network: String,
    /// Required amount in the asset's smallest unit, as a decimal string.
    pub max_amount_required: String,
    /// The recipient address for payment.
    pub pay_to: String,
    /// The token asset contract identifier.
    pub asset: String,
    /// The resource URL being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Maximum validity window for the payment authorization, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
    /// Scheme-specific extra metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RequirementsExtra>,
}

impl PaymentRequirements {
    /// Returns `true` if this option uses the canonical exact-amount scheme.
    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.scheme == ExactScheme::VALUE
    }
}

/// Extra metadata a merchant may attach to a payment option.
///
/// All fields are optional; unknown keys are ignored. The EIP-712 `name` and
/// `version` fields feed the authorization signing domain when present.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementsExtra {
    /// Merchant-supplied nonce to bind into the payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
    /// Human-friendly display name for the asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Token decimals (6 for USDC-style assets).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    /// Token name for the EIP-712 signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Token version for the EIP-712 signing domain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Outbound signed payment envelope.
///
/// This is the wire shape carried (base64-encoded) in the payment header of
/// the retried request. The `payload` type is scheme-specific and supplied
/// by the chain crate that produced the proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload<TPayload> {
    /// Protocol version (always 1).
    pub x402_version: X402Version1,
    /// The payment scheme (e.g., `"exact"`).
    pub scheme: String,
    /// The network identifier the payment targets.
    pub network: String,
    /// The scheme-specific signed payload.
    pub payload: TPayload,
}

impl<TPayload: Serialize> PaymentPayload<TPayload> {
    /// Encodes the payload as base64 JSON for use as a header value.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_header_value(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_vec(self)?;
        Ok(Base64Bytes::encode(&json).to_string())
    }
}

impl PaymentRequired {
    /// Parses a 402 response body into a challenge.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if the body is not a well-formed
    /// challenge. Note that an empty `accepts` list is *not* a parse error;
    /// the orchestrator rejects it separately so the failure carries payment
    /// context.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHALLENGE: &str = r#"{
        "x402Version": 1,
        "accepts": [{
            "scheme": "exact",
            "network": "base",
            "maxAmountRequired": "10000",
            "payTo": "0xRECIPIENT",
            "asset": "0xUSDC",
            "resource": "https://svc/api"
        }]
    }"#;

    #[test]
    fn parses_minimal_challenge() {
        let challenge = PaymentRequired::from_json(CHALLENGE).unwrap();
        assert_eq!(challenge.accepts.len(), 1);
        let option = &challenge.accepts[0];
        assert!(option.is_exact());
        assert_eq!(option.max_amount_required, "10000");
        assert_eq!(option.pay_to, "0xRECIPIENT");
        assert!(option.description.is_none());
        assert!(option.extra.is_none());
    }

    #[test]
    fn rejects_wrong_version() {
        let body = r#"{"x402Version": 3, "accepts": []}"#;
        assert!(PaymentRequired::from_json(body).is_err());
    }

    #[test]
    fn missing_accepts_defaults_to_empty() {
        let body = r#"{"x402Version": 1, "error": "payment required"}"#;
        let challenge = PaymentRequired::from_json(body).unwrap();
        assert!(challenge.accepts.is_empty());
        assert_eq!(challenge.error.as_deref(), Some("payment required"));
    }

    #[test]
    fn rejects_option_missing_required_fields() {
        let body = r#"{
            "x402Version": 1,
            "accepts": [{"scheme": "exact", "network": "base"}]
        }"#;
        assert!(PaymentRequired::from_json(body).is_err());
    }

    #[test]
    fn extra_metadata_round_trips() {
        let body = r#"{
            "x402Version": 1,
            "accepts": [{
                "scheme": "exact",
                "network": "base",
                "maxAmountRequired": "250000",
                "payTo": "0xAB",
                "asset": "0xCD",
                "resource": "https://svc/api",
                "extra": {"nonce": "abc123", "decimals": 6, "name": "USD Coin", "version": "2"}
            }]
        }"#;
        let challenge = PaymentRequired::from_json(body).unwrap();
        let extra = challenge.accepts[0].extra.as_ref().unwrap();
        assert_eq!(extra.nonce.as_deref(), Some("abc123"));
        assert_eq!(extra.decimals, Some(6));
        assert_eq!(extra.name.as_deref(), Some("USD Coin"));
    }
}
