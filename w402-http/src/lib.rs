#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP payment orchestration for the w402 agent wallet toolkit.
//!
//! This crate drives the full x402 payment flow over `reqwest`: issue the
//! request, detect a 402 challenge, select a payment option, validate spend
//! limits and balance, produce proof of payment, attach best-effort identity
//! attestation headers, retry the request, and reconcile the result into a
//! durable transaction record.
//!
//! # Modules
//!
//! - [`client`] - the [`PaymentClient`] orchestrator
//! - [`attestation`] - RFC 9421 request attestation headers
//! - [`headers`] - header names and settlement-id recovery
//! - [`outcome`] - the structured result returned to callers
//!
//! # Example
//!
//! ```ignore
//! use w402_http::{PaymentClient, PaymentClientConfig, PaymentRequest};
//!
//! let client = PaymentClient::new(PaymentClientConfig::default(), strategy, ledger)
//!     .with_guard(guard)
//!     .with_attestor(attestor);
//! let outcome = client
//!     .execute_payment(PaymentRequest::get(url)?.with_description("weather data"))
//!     .await;
//! ```

pub mod attestation;
pub mod client;
pub mod headers;
pub mod outcome;

pub use attestation::{
    AttestationError, AttestationHeaders, AttestationSource, AttestationToken, RequestAttestor,
    StaticTokenSource,
};
pub use client::{PaymentClient, PaymentClientConfig, PaymentRequest};
pub use outcome::{PaymentOutcome, PaymentReceipt};
