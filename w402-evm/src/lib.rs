#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EVM chain support for the w402 agent wallet toolkit.
//!
//! Implements the chain-side collaborators defined in [`w402::chain`] for
//! EIP-155 chains:
//!
//! - [`signer`] - ERC-3009 `transferWithAuthorization` signing via EIP-712
//! - [`strategy`] - the two proof strategies (signed authorization vs.
//!   on-chain transfer)
//! - [`ledger`] - an ERC-20 [`w402::chain::LedgerClient`] backed by an alloy
//!   provider
//! - [`identity`] - an ERC-191 [`w402::chain::IdentityKey`] for request
//!   attestation
//! - [`networks`] - known network names and token deployments

pub mod identity;
pub mod ledger;
pub mod networks;
pub mod signer;
pub mod strategy;

pub use identity::Erc191Key;
pub use ledger::Erc20Ledger;
pub use networks::{EVM_NETWORKS, NetworkInfo, TokenDeployment, chain_id_for_network};
pub use signer::{
    AuthorizationParams, Eip3009Authorization, ExactEvmPayload, SignerLike,
    sign_transfer_authorization,
};
pub use strategy::{AuthorizationStrategy, TransferStrategy};
