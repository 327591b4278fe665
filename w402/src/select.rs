//! Deterministic payment-option selection.
//!
//! A 402 challenge may offer several payment options across different
//! networks. Selection is a pure function with a fixed tie-break so the
//! chosen network (and its fees) is reproducible:
//!
//! 1. An `"exact"` scheme option on the wallet's primary network.
//! 2. Any `"exact"` scheme option, regardless of network.
//! 3. The first option as presented by the merchant.
//!
//! The option list is validated non-empty by the orchestrator before
//! selection; an empty list here returns `None`.

use crate::proto::PaymentRequirements;

/// Selects one payment option from a challenge's `accepts` list.
///
/// `primary_network` is the network the wallet normally operates on
/// (e.g., `"base"`).
#[must_use]
pub fn select_option<'a>(
    accepts: &'a [PaymentRequirements],
    primary_network: &str,
) -> Option<&'a PaymentRequirements> {
    accepts
        .iter()
        .find(|option| option.is_exact() && option.network == primary_network)
        .or_else(|| accepts.iter().find(|option| option.is_exact()))
        .or_else(|| accepts.first())
}
