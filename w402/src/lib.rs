#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the w402 agent wallet toolkit.
//!
//! This crate provides the transport- and chain-agnostic building blocks used
//! by an agent-facing wallet to pay for pay-per-use HTTP resources via the
//! x402 protocol: wire format types for 402 challenges, payment option
//! selection, spend-limit policy, a local transaction ledger, and the
//! collaborator traits implemented by chain-specific crates.
//!
//! # Overview
//!
//! When an agent requests a paid resource, the server responds with HTTP 402
//! and a [`proto::PaymentRequired`] challenge listing acceptable payment
//! options. The wallet selects one option ([`select`]), checks it against the
//! configured spend limits ([`limits`]), produces a payment proof through a
//! [`chain::ProofStrategy`], retries the request, and records the outcome in
//! the local [`history`] ledger.
//!
//! # Modules
//!
//! - [`amount`] - Smallest-unit / display-amount conversion
//! - [`audit`] - Fire-and-forget audit sink for wallet actions
//! - [`chain`] - Collaborator traits for ledgers, proof strategies, and keys
//! - [`error`] - The payment error taxonomy
//! - [`history`] - Append-only local transaction ledger
//! - [`limits`] - Per-transaction and daily spend-limit guard
//! - [`proto`] - Wire format types, encoding utilities, and timestamps
//! - [`select`] - Deterministic payment-option selection

pub mod amount;
pub mod audit;
pub mod chain;
pub mod error;
pub mod history;
pub mod limits;
pub mod proto;
pub mod select;
