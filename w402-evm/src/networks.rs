//! Known EVM networks and token deployments.
//!
//! Maps the human-readable network names used in 402 challenges to EIP-155
//! chain ids, and records the USDC deployments the wallet pays with by
//! default.

use alloy_primitives::{Address, address};

/// A known network definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Human-readable network name (e.g., `"base"`).
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

/// Networks the wallet recognizes by name.
pub const EVM_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo {
        name: "base",
        chain_id: 8453,
    },
    NetworkInfo {
        name: "base-sepolia",
        chain_id: 84532,
    },
    NetworkInfo {
        name: "ethereum",
        chain_id: 1,
    },
    NetworkInfo {
        name: "sepolia",
        chain_id: 11_155_111,
    },
];

/// Looks up the chain id for a network name from a 402 challenge.
#[must_use]
pub fn chain_id_for_network(name: &str) -> Option<u64> {
    EVM_NETWORKS
        .iter()
        .find(|info| info.name == name)
        .map(|info| info.chain_id)
}

/// A token deployment with the data needed for EIP-712 signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenDeployment {
    /// Token contract address.
    pub address: Address,
    /// Token decimals.
    pub decimals: u8,
    /// EIP-712 domain name.
    pub eip712_name: &'static str,
    /// EIP-712 domain version.
    pub eip712_version: &'static str,
}

/// USDC on Base mainnet.
pub const BASE_USDC: TokenDeployment = TokenDeployment {
    address: address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
    decimals: 6,
    eip712_name: "USD Coin",
    eip712_version: "2",
};

/// USDC on Base Sepolia.
pub const BASE_SEPOLIA_USDC: TokenDeployment = TokenDeployment {
    address: address!("0x036CbD53842c5426634e7929541eC2318f3dCF7e"),
    decimals: 6,
    eip712_name: "USDC",
    eip712_version: "2",
};

/// Looks up a known USDC deployment by chain id and contract address.
#[must_use]
pub fn usdc_deployment(chain_id: u64, asset: Address) -> Option<TokenDeployment> {
    let deployment = match chain_id {
        8453 => BASE_USDC,
        84532 => BASE_SEPOLIA_USDC,
        _ => return None,
    };
    (deployment.address == asset).then_some(deployment)
}
