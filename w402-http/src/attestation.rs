//! RFC 9421 request attestation headers.
//!
//! Optionally proves the agent's identity to a merchant by signing a
//! canonical description of the outbound request with the locally held
//! identity key. The signature base binds the HTTP method, authority, path,
//! the payment proof header, and the externally issued attestation token,
//! so none of them can be replayed onto a different request.
//!
//! Absence of identity is a normal state: [`RequestAttestor::build_headers`]
//! returns `Ok(None)` when no valid, unexpired token is available, and the
//! payment flow continues without attestation.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use rand::Rng;
use reqwest::Method;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use w402::chain::IdentityKey;
use w402::proto::UnixTimestamp;

use crate::headers;

/// Signature label used in `Signature-Input` / `Signature` headers.
const SIGNATURE_LABEL: &str = "agent";

/// Application tag bound into the signature parameters.
const SIGNATURE_TAG: &str = "agent-payment";

/// Default validity window for a signature, in seconds. Kept well under
/// eight minutes to bound replay exposure.
const DEFAULT_WINDOW_SECS: u64 = 300;

/// An externally issued identity attestation token.
///
/// The token is opaque to the wallet and carries its own expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationToken {
    /// The opaque token value.
    pub value: String,
    /// When the token stops being presentable.
    pub expires_at: UnixTimestamp,
}

impl AttestationToken {
    /// Returns `true` if the token is still presentable at `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: UnixTimestamp) -> bool {
        now < self.expires_at
    }
}

/// Supplies the current attestation token, if any.
#[async_trait]
pub trait AttestationSource: Send + Sync {
    /// The token to present, or `None` when the agent has no identity.
    async fn current(&self) -> Option<AttestationToken>;
}

/// A fixed token source for configurations where the token is provisioned
/// out of band.
#[derive(Debug, Default)]
pub struct StaticTokenSource {
    token: Option<AttestationToken>,
}

impl StaticTokenSource {
    /// Creates a source that always returns `token`.
    #[must_use]
    pub const fn new(token: AttestationToken) -> Self {
        Self { token: Some(token) }
    }

    /// Creates a source with no token.
    #[must_use]
    pub const fn empty() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl AttestationSource for StaticTokenSource {
    async fn current(&self) -> Option<AttestationToken> {
        self.token.clone()
    }
}

/// The three headers to merge into the retried request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestationHeaders {
    /// The attestation token value.
    pub token: String,
    /// RFC 9421 `Signature-Input` descriptor.
    pub signature_input: String,
    /// RFC 9421 `Signature` value.
    pub signature: String,
}

/// Errors from attestation signing.
///
/// Only genuine failures surface here; a missing or expired token is not an
/// error (see [`RequestAttestor::build_headers`]).
#[derive(Debug, thiserror::Error)]
pub enum AttestationError {
    /// The identity key refused to sign the signature base.
    #[error("attestation signing failed: {0}")]
    Signing(String),
    /// The request URL has no host to use as the signed authority.
    #[error("request url has no authority component")]
    MissingAuthority,
}

/// Builds RFC 9421 attestation headers for outbound payment requests.
pub struct RequestAttestor {
    key: Arc<dyn IdentityKey>,
    source: Arc<dyn AttestationSource>,
    window_secs: u64,
}

impl std::fmt::Debug for RequestAttestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestAttestor")
            .field("key_id", &self.key.key_id())
            .field("window_secs", &self.window_secs)
            .finish_non_exhaustive()
    }
}

impl RequestAttestor {
    /// Creates an attestor around an identity key and token source.
    pub fn new(key: Arc<dyn IdentityKey>, source: Arc<dyn AttestationSource>) -> Self {
        Self {
            key,
            source,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }

    /// Overrides the signature validity window. Values above eight minutes
    /// are clamped.
    #[must_use]
    pub fn with_window_secs(mut self, secs: u64) -> Self {
        self.window_secs = secs.min(480);
        self
    }

    /// Builds the attestation headers for one outbound request.
    ///
    /// Returns `Ok(None)` when no valid, unexpired token is available —
    /// absence of identity is expected, not an error. The caller logs the
    /// skip and continues the payment without attestation.
    ///
    /// # Errors
    ///
    /// Returns [`AttestationError`] when a token exists but signing fails,
    /// so callers can distinguish "skipped" from genuinely erroring.
    pub async fn build_headers(
        &self,
        method: &Method,
        url: &Url,
        payment_header: &str,
    ) -> Result<Option<AttestationHeaders>, AttestationError> {
        let Some(token) = self.source.current().await else {
            debug!("no attestation token available, skipping attestation");
            return Ok(None);
        };
        let now = UnixTimestamp::now();
        if !token.is_valid_at(now) {
            debug!(expires_at = %token.expires_at, "attestation token expired, skipping attestation");
            return Ok(None);
        }

        let authority = url
            .host_str()
            .ok_or(AttestationError::MissingAuthority)?
            .to_lowercase();
        let authority = match url.port() {
            Some(port) => format!("{authority}:{port}"),
            None => authority,
        };

        let mut components: Vec<&str> = vec!["@method", "@authority", "@path"];
        if url.query().is_some() {
            components.push("@query");
        }
        let payment_component = headers::PAYMENT.to_lowercase();
        let token_component = headers::ATTESTATION_TOKEN.to_lowercase();
        components.push(&payment_component);
        components.push(&token_component);

        let created = now.as_secs();
        let expires = created + self.window_secs;
        let nonce = format!("{:032x}", rand::rng().random::<u128>());
        let keyid = self.key.key_id();

        let components_list = components
            .iter()
            .map(|c| format!("\"{c}\""))
            .collect::<Vec<_>>()
            .join(" ");
        let params = format!(
            "({components_list});created={created};expires={expires};keyid=\"{keyid}\";\
             nonce=\"{nonce}\";alg=\"erc191\";tag=\"{SIGNATURE_TAG}\""
        );

        let mut base_lines = Vec::with_capacity(components.len() + 1);
        for component in &components {
            let value = match *component {
                "@method" => method.as_str().to_uppercase(),
                "@authority" => authority.clone(),
                "@path" => url.path().to_string(),
                "@query" => format!("?{}", url.query().unwrap_or("")),
                name if name == payment_component.as_str() => payment_header.to_string(),
                name if name == token_component.as_str() => token.value.clone(),
                _ => String::new(),
            };
            base_lines.push(format!("\"{component}\": {value}"));
        }
        base_lines.push(format!("\"@signature-params\": {params}"));
        let signature_base = base_lines.join("\n");

        let signature = self
            .key
            .sign_message(signature_base.as_bytes())
            .await
            .map_err(|e| AttestationError::Signing(e.to_string()))?;

        Ok(Some(AttestationHeaders {
            token: token.value,
            signature_input: format!("{SIGNATURE_LABEL}={params}"),
            signature: format!("{SIGNATURE_LABEL}=:{}:", b64.encode(signature)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use w402::chain::SignError;

    struct FakeKey {
        fail: bool,
    }

    #[async_trait]
    impl IdentityKey for FakeKey {
        fn key_id(&self) -> String {
            "erc8128:8453:0xFEED".into()
        }

        async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, SignError> {
            if self.fail {
                Err(SignError::Signing("key unavailable".into()))
            } else {
                Ok(vec![0x42; 65])
            }
        }
    }

    fn valid_token() -> AttestationToken {
        AttestationToken {
            value: "tok-abc".into(),
            expires_at: UnixTimestamp::now() + 600,
        }
    }

    fn expired_token() -> AttestationToken {
        AttestationToken {
            value: "tok-old".into(),
            expires_at: UnixTimestamp::from_secs(1),
        }
    }

    fn attestor(key_fails: bool, token: Option<AttestationToken>) -> RequestAttestor {
        let source = token.map_or_else(StaticTokenSource::empty, StaticTokenSource::new);
        RequestAttestor::new(Arc::new(FakeKey { fail: key_fails }), Arc::new(source))
    }

    #[tokio::test]
    async fn builds_headers_covering_payment_and_token() {
        let attestor = attestor(false, Some(valid_token()));
        let url: Url = "https://api.example.com/v1/data?q=1".parse().unwrap();
        let headers = attestor
            .build_headers(&Method::GET, &url, "payment-proof")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(headers.token, "tok-abc");
        assert!(headers.signature_input.starts_with("agent=("));
        assert!(headers.signature_input.contains("\"@method\""));
        assert!(headers.signature_input.contains("\"@query\""));
        assert!(headers.signature_input.contains("\"x-payment\""));
        assert!(headers.signature_input.contains("\"attestation-token\""));
        assert!(headers.signature_input.contains("alg=\"erc191\""));
        assert!(headers.signature_input.contains("keyid=\"erc8128:8453:0xFEED\""));
        assert!(headers.signature_input.contains("tag=\"agent-payment\""));
        assert!(headers.signature.starts_with("agent=:"));
        assert!(headers.signature.ends_with(':'));
    }

    #[tokio::test]
    async fn missing_token_is_not_an_error() {
        let attestor = attestor(false, None);
        let url: Url = "https://api.example.com/v1".parse().unwrap();
        let result = attestor.build_headers(&Method::GET, &url, "p").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn expired_token_is_not_an_error() {
        let attestor = attestor(false, Some(expired_token()));
        let url: Url = "https://api.example.com/v1".parse().unwrap();
        let result = attestor.build_headers(&Method::GET, &url, "p").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn signing_failure_is_distinguishable() {
        let attestor = attestor(true, Some(valid_token()));
        let url: Url = "https://api.example.com/v1".parse().unwrap();
        let err = attestor
            .build_headers(&Method::GET, &url, "p")
            .await
            .unwrap_err();
        assert!(matches!(err, AttestationError::Signing(_)));
    }

    #[tokio::test]
    async fn nonces_are_fresh_per_request() {
        let attestor = attestor(false, Some(valid_token()));
        let url: Url = "https://api.example.com/v1".parse().unwrap();
        let first = attestor
            .build_headers(&Method::GET, &url, "p")
            .await
            .unwrap()
            .unwrap();
        let second = attestor
            .build_headers(&Method::GET, &url, "p")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(first.signature_input, second.signature_input);
    }
}
