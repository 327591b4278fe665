//! ERC-191 identity key for request attestation.
//!
//! Wraps a wallet signer as a [`w402::chain::IdentityKey`] so verifiers can
//! recover the wallet's Ethereum identity from an attestation signature via
//! `ecrecover`. The key identifier embeds the chain id and checksummed
//! address.

use async_trait::async_trait;

use w402::chain::{IdentityKey, SignError};

use crate::signer::SignerLike;

/// An [`IdentityKey`] that signs with the EIP-191 personal-message prefix.
#[derive(Debug)]
pub struct Erc191Key<S> {
    signer: S,
    chain_id: u64,
}

impl<S: SignerLike> Erc191Key<S> {
    /// Creates a key bound to `chain_id` for the key-id namespace.
    pub const fn new(signer: S, chain_id: u64) -> Self {
        Self { signer, chain_id }
    }

    /// The wallet address backing this key.
    pub fn address(&self) -> String {
        self.signer.address().to_string()
    }
}

#[async_trait]
impl<S> IdentityKey for Erc191Key<S>
where
    S: SignerLike + Send + Sync,
{
    fn key_id(&self) -> String {
        format!("erc8128:{}:{}", self.chain_id, self.signer.address())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>, SignError> {
        let signature = self
            .signer
            .sign_message(message)
            .await
            .map_err(|e| SignError::Signing(format!("{e:?}")))?;
        Ok(signature.as_bytes().to_vec())
    }
}
