//! HTTP header names used in the payment flow.

use reqwest::header::HeaderMap;

/// Header carrying the payment proof on the retried request.
pub const PAYMENT: &str = "X-Payment";

/// Header carrying the externally issued attestation token.
pub const ATTESTATION_TOKEN: &str = "Attestation-Token";

/// RFC 9421 signature-input descriptor header.
pub const SIGNATURE_INPUT: &str = "Signature-Input";

/// RFC 9421 signature value header.
pub const SIGNATURE: &str = "Signature";

/// Response headers a merchant may use to report the settlement transaction.
const SETTLEMENT_HEADERS: &[&str] = &["x-payment-transaction", "x-transaction-hash"];

/// Recovers a settlement transaction id from merchant response headers.
///
/// Used when the active proof strategy itself produced no settlement id
/// (off-chain authorization) but the merchant settled and reported the
/// transaction.
#[must_use]
pub fn settlement_id_from(headers: &HeaderMap) -> Option<String> {
    SETTLEMENT_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};

    #[test]
    fn recovers_settlement_id_case_insensitively() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-transaction-hash"),
            HeaderValue::from_static("0xdeadbeef"),
        );
        assert_eq!(settlement_id_from(&headers).as_deref(), Some("0xdeadbeef"));
    }

    #[test]
    fn prefers_payment_transaction_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-transaction-hash"),
            HeaderValue::from_static("0xsecond"),
        );
        headers.insert(
            HeaderName::from_static("x-payment-transaction"),
            HeaderValue::from_static("0xfirst"),
        );
        assert_eq!(settlement_id_from(&headers).as_deref(), Some("0xfirst"));
    }

    #[test]
    fn absent_headers_yield_none() {
        assert!(settlement_id_from(&HeaderMap::new()).is_none());
    }
}
