//! Proof-of-payment strategies for EVM networks.
//!
//! Two interchangeable [`ProofStrategy`] implementations sit behind one
//! interface:
//!
//! - [`AuthorizationStrategy`] signs an off-chain ERC-3009 authorization.
//!   The wallet's guarantee ends at producing a valid signature; settlement
//!   happens later, merchant-side.
//! - [`TransferStrategy`] submits a direct ERC-20 transfer and uses the
//!   confirmed transaction hash as proof.
//!
//! Exactly one strategy is selected at construction time per deployment.
//! Each has its own header encoding, so mixing them mid-flow is disallowed.

use alloy_primitives::{Address, U256, hex};
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info};

use w402::chain::{LedgerClient, PaymentProof, ProofError, ProofStrategy};
use w402::proto::{ExactScheme, PaymentPayload, PaymentRequirements, V1};

use crate::networks::{chain_id_for_network, usdc_deployment};
use crate::signer::{AuthorizationParams, SignerLike, sign_transfer_authorization};

/// Off-chain signed-authorization strategy.
///
/// Proof is the base64-encoded JSON payment envelope carrying the EIP-712
/// signature and authorization fields. No funds move here.
#[derive(Debug)]
pub struct AuthorizationStrategy<S> {
    signer: S,
}

impl<S> AuthorizationStrategy<S> {
    /// Creates a strategy around the payer's signing key.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }
}

/// Resolves the EIP-712 domain for a payment option.
///
/// Prefers the merchant-supplied `extra.name`/`extra.version`; falls back to
/// the known USDC deployment for the chain, then to empty strings.
fn eip712_domain_for(
    requirements: &PaymentRequirements,
    chain_id: u64,
    asset: Address,
) -> (String, String) {
    if let Some(extra) = &requirements.extra
        && let (Some(name), Some(version)) = (&extra.name, &extra.version)
    {
        return (name.clone(), version.clone());
    }
    usdc_deployment(chain_id, asset).map_or_else(
        || (String::new(), String::new()),
        |token| (token.eip712_name.to_string(), token.eip712_version.to_string()),
    )
}

#[async_trait]
impl<S> ProofStrategy for AuthorizationStrategy<S>
where
    S: SignerLike + Sync + Send,
{
    fn payer(&self) -> String {
        self.signer.address().to_string()
    }

    async fn produce_proof(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentProof, ProofError> {
        let chain_id = chain_id_for_network(&requirements.network).ok_or_else(|| {
            ProofError::UnsupportedOption(format!("unknown network '{}'", requirements.network))
        })?;
        let asset: Address = requirements.asset.parse().map_err(|_| {
            ProofError::UnsupportedOption(format!("invalid asset address '{}'", requirements.asset))
        })?;
        let pay_to: Address = requirements.pay_to.parse().map_err(|_| {
            ProofError::UnsupportedOption(format!(
                "invalid recipient address '{}'",
                requirements.pay_to
            ))
        })?;
        let amount: U256 = requirements.max_amount_required.parse().map_err(|_| {
            ProofError::UnsupportedOption(format!(
                "invalid amount '{}'",
                requirements.max_amount_required
            ))
        })?;

        let (domain_name, domain_version) = eip712_domain_for(requirements, chain_id, asset);
        let params = AuthorizationParams {
            chain_id,
            asset,
            pay_to,
            amount,
            valid_for_seconds: requirements.max_timeout_seconds,
            domain_name,
            domain_version,
        };

        let payload = sign_transfer_authorization(&self.signer, &params)
            .await
            .map_err(|e| ProofError::SignatureFailed(e.to_string()))?;

        debug!(
            chain_id,
            payer = %payload.authorization.from,
            nonce = %payload.authorization.nonce,
            "Signed transfer authorization"
        );

        let envelope = PaymentPayload {
            x402_version: V1,
            scheme: ExactScheme::VALUE.to_string(),
            network: requirements.network.clone(),
            payload,
        };
        let header_value = envelope
            .to_header_value()
            .map_err(|e| ProofError::SignatureFailed(e.to_string()))?;

        Ok(PaymentProof {
            header_value,
            settlement_id: None,
        })
    }
}

/// On-chain settlement strategy.
///
/// Submits a direct ERC-20 transfer for the exact required amount, waits for
/// one confirmation, and treats the resulting transaction hash as both proof
/// and settlement record. A reverted or rejected transfer fails the payment;
/// the merchant request is not retried.
pub struct TransferStrategy {
    ledger: Arc<dyn LedgerClient>,
    payer: String,
}

impl std::fmt::Debug for TransferStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferStrategy")
            .field("payer", &self.payer)
            .finish_non_exhaustive()
    }
}

impl TransferStrategy {
    /// Creates a strategy that settles through the given ledger client.
    pub fn new(ledger: Arc<dyn LedgerClient>, payer: impl Into<String>) -> Self {
        Self {
            ledger,
            payer: payer.into(),
        }
    }
}

#[async_trait]
impl ProofStrategy for TransferStrategy {
    fn payer(&self) -> String {
        self.payer.clone()
    }

    async fn produce_proof(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<PaymentProof, ProofError> {
        let amount = w402::amount::parse_base_units(&requirements.max_amount_required)
            .map_err(|e| ProofError::UnsupportedOption(e.to_string()))?;

        let receipt = self
            .ledger
            .transfer(&requirements.pay_to, amount)
            .await
            .map_err(|e| ProofError::TransferFailed(e.to_string()))?;
        if !receipt.confirmed {
            return Err(ProofError::TransferFailed(format!(
                "transfer {} was not confirmed",
                receipt.tx_id
            )));
        }

        info!(tx_id = %receipt.tx_id, to = %requirements.pay_to, amount, "Settled payment on-chain");

        let nonce: [u8; 16] = rand::rng().random();
        let header_value = format!(
            "scheme=\"exact\", recipient=\"{}\", nonce=\"{}\", payer=\"{}\", tx_hash=\"{}\"",
            requirements.pay_to,
            hex::encode(nonce),
            self.payer,
            receipt.tx_id,
        );

        Ok(PaymentProof {
            header_value,
            settlement_id: Some(receipt.tx_id),
        })
    }
}
