//! ERC-3009 `transferWithAuthorization` signing via EIP-712.
//!
//! Builds a time-bounded, nonce-protected transfer authorization and signs
//! it with the payer's key. The signature plus the authorization fields are
//! the wallet's proof of payment when the off-chain strategy is active; no
//! funds move until the merchant (or a facilitator) redeems the
//! authorization on-chain.

use alloy_primitives::{Address, B256, Bytes, FixedBytes, Signature, U256};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{SolStruct, eip712_domain, sol};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;

use w402::proto::UnixTimestamp;

/// Seconds the authorization reaches into the past, to tolerate clock skew
/// between wallet and verifier.
const VALID_AFTER_SKEW_SECS: u64 = 60;

/// Default authorization lifetime when the challenge sets no timeout.
const DEFAULT_VALIDITY_SECS: u64 = 3600;

/// A trait that abstracts signing operations, allowing both owned signers
/// and Arc-wrapped signers.
///
/// Alloy's `Signer` trait is not implemented for `Arc<T>`, but callers may
/// want to share one key between the payment signer and the request
/// attestor.
pub trait SignerLike: Send + Sync {
    /// Returns the address of the signer.
    fn address(&self) -> Address;

    /// Signs the given EIP-712 hash.
    fn sign_hash(
        &self,
        hash: &FixedBytes<32>,
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;

    /// Signs an arbitrary message with the EIP-191 prefix.
    fn sign_message(
        &self,
        message: &[u8],
    ) -> impl Future<Output = Result<Signature, alloy_signer::Error>> + Send;
}

impl SignerLike for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_hash(self, hash).await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, alloy_signer::Error> {
        alloy_signer::Signer::sign_message(self, message).await
    }
}

impl<T: SignerLike + Send + Sync> SignerLike for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    async fn sign_hash(&self, hash: &FixedBytes<32>) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash).await
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_message(message).await
    }
}

/// A `U256` token amount that serializes as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAmount(pub U256);

impl Serialize for TokenAmount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<U256>()
            .map(Self)
            .map_err(|_| serde::de::Error::custom("amount must be a decimal integer string"))
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

/// The structured authorization data that gets signed.
///
/// Field values MUST match the EIP-712 struct exactly; the verifier
/// reconstructs the typed message from these fields to check the signature.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Authorization {
    /// The address authorizing the transfer (token owner).
    pub from: Address,
    /// The recipient address for the transfer.
    pub to: Address,
    /// The amount of tokens to transfer, in the token's smallest unit.
    pub value: TokenAmount,
    /// The authorization is not valid before this timestamp (inclusive).
    pub valid_after: UnixTimestamp,
    /// The authorization expires at this timestamp (exclusive).
    pub valid_before: UnixTimestamp,
    /// A unique 32-byte nonce to prevent replay attacks.
    pub nonce: B256,
}

/// Signed payment payload for the EVM exact scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactEvmPayload {
    /// The EIP-712 signature over the authorization (65 bytes, hex).
    pub signature: Bytes,
    /// The authorization data that was signed.
    pub authorization: Eip3009Authorization,
}

sol!(
    /// Solidity-compatible struct definition for ERC-3009
    /// `transferWithAuthorization`, used to compute the EIP-712 signing
    /// hash. Field order matches the on-chain struct.
    #[derive(Serialize, Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
);

/// EIP-712 signing parameters for one transfer authorization.
#[derive(Debug, Clone)]
pub struct AuthorizationParams {
    /// The EIP-155 chain id.
    pub chain_id: u64,
    /// The token contract address (EIP-712 verifying contract).
    pub asset: Address,
    /// The recipient address.
    pub pay_to: Address,
    /// The amount to transfer, in smallest units.
    pub amount: U256,
    /// Authorization lifetime in seconds; defaults to one hour.
    pub valid_for_seconds: Option<u64>,
    /// EIP-712 domain name for the token.
    pub domain_name: String,
    /// EIP-712 domain version for the token.
    pub domain_version: String,
}

/// Errors from authorization signing.
#[derive(Debug, thiserror::Error)]
pub enum AuthorizationError {
    /// The underlying key refused to sign the EIP-712 hash.
    #[error("eip-712 signing failed: {0}")]
    Signing(String),
}

/// Builds and signs an ERC-3009 `TransferWithAuthorization`.
///
/// The validity window is `[now - 60s, now + lifetime]`: reaching slightly
/// into the past keeps the authorization immediately redeemable despite
/// clock skew, while the bounded lifetime limits replay exposure. The nonce
/// is 32 bytes of cryptographic randomness; consecutive calls never repeat
/// it.
///
/// # Errors
///
/// Returns [`AuthorizationError`] if EIP-712 signing fails.
pub async fn sign_transfer_authorization<S: SignerLike + Sync>(
    signer: &S,
    params: &AuthorizationParams,
) -> Result<ExactEvmPayload, AuthorizationError> {
    let domain = eip712_domain! {
        name: params.domain_name.clone(),
        version: params.domain_version.clone(),
        chain_id: params.chain_id,
        verifying_contract: params.asset,
    };

    let now = UnixTimestamp::now();
    let valid_after = now.saturating_sub(VALID_AFTER_SKEW_SECS);
    let valid_before = now + params.valid_for_seconds.unwrap_or(DEFAULT_VALIDITY_SECS);
    let nonce: [u8; 32] = rand::rng().random();
    let nonce = FixedBytes(nonce);

    let authorization = Eip3009Authorization {
        from: signer.address(),
        to: params.pay_to,
        value: params.amount.into(),
        valid_after,
        valid_before,
        nonce,
    };

    // The verifier reconstructs this struct from the authorization fields,
    // so the two must agree exactly.
    let transfer_with_authorization = TransferWithAuthorization {
        from: authorization.from,
        to: authorization.to,
        value: authorization.value.0,
        validAfter: U256::from(authorization.valid_after.as_secs()),
        validBefore: U256::from(authorization.valid_before.as_secs()),
        nonce: authorization.nonce,
    };

    let eip712_hash = transfer_with_authorization.eip712_signing_hash(&domain);
    let signature = signer
        .sign_hash(&eip712_hash)
        .await
        .map_err(|e| AuthorizationError::Signing(format!("{e:?}")))?;

    Ok(ExactEvmPayload {
        signature: signature.as_bytes().into(),
        authorization,
    })
}
