//! ERC-20 ledger client backed by an alloy provider.
//!
//! Implements [`LedgerClient`] for a single token contract: balance queries
//! through `balanceOf`, transfers through `transfer` with a one-confirmation
//! wait and a receipt-status check. A reverted transfer surfaces as
//! [`LedgerError::TransferReverted`] rather than a confirmed receipt.

use alloy_contract::Error as ContractError;
use alloy_primitives::{Address, U256};
use alloy_provider::Provider;
use alloy_sol_types::sol;
use async_trait::async_trait;
use tracing::info;

use w402::chain::{Balance, LedgerClient, LedgerError, TransferReceipt};

sol! {
    /// Minimal ERC-20 surface used by the wallet.
    #[allow(missing_docs)]
    #[derive(Debug)]
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function decimals() external view returns (uint8);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

/// A [`LedgerClient`] for one ERC-20 token on one EVM chain.
///
/// The provider must carry a wallet filler for `transfer` to sign and
/// submit transactions.
pub struct Erc20Ledger<P> {
    token: IERC20::IERC20Instance<P>,
    decimals: u8,
}

impl<P: Provider> std::fmt::Debug for Erc20Ledger<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erc20Ledger")
            .field("token", self.token.address())
            .field("decimals", &self.decimals)
            .finish_non_exhaustive()
    }
}

impl<P: Provider> Erc20Ledger<P> {
    /// Creates a client for `token` with a known decimal count.
    pub fn new(provider: P, token: Address, decimals: u8) -> Self {
        Self {
            token: IERC20::new(token, provider),
            decimals,
        }
    }

    /// Creates a client for `token`, querying its decimal count on-chain.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Rpc`] if the `decimals` call fails.
    pub async fn connect(provider: P, token: Address) -> Result<Self, LedgerError> {
        let contract = IERC20::new(token, provider);
        let decimals = contract
            .decimals()
            .call()
            .await
            .map_err(map_contract_error)?;
        Ok(Self {
            token: contract,
            decimals,
        })
    }

    /// The token contract address this client operates on.
    #[must_use]
    pub const fn token_address(&self) -> &Address {
        self.token.address()
    }
}

fn map_contract_error(err: ContractError) -> LedgerError {
    LedgerError::Rpc(err.to_string())
}

fn parse_address(address: &str) -> Result<Address, LedgerError> {
    address
        .parse::<Address>()
        .map_err(|_| LedgerError::InvalidAddress(address.to_string()))
}

#[async_trait]
impl<P> LedgerClient for Erc20Ledger<P>
where
    P: Provider + Send + Sync,
{
    async fn balance_of(&self, address: &str) -> Result<Balance, LedgerError> {
        let account = parse_address(address)?;
        let raw = self
            .token
            .balanceOf(account)
            .call()
            .await
            .map_err(map_contract_error)?;
        let amount = u128::try_from(raw)
            .map_err(|_| LedgerError::Rpc(format!("balance {raw} exceeds u128 range")))?;
        Ok(Balance {
            amount,
            decimals: self.decimals,
        })
    }

    async fn transfer(
        &self,
        to: &str,
        amount_base_units: u128,
    ) -> Result<TransferReceipt, LedgerError> {
        let recipient = parse_address(to)?;
        let amount = U256::from(amount_base_units);

        let pending = self
            .token
            .transfer(recipient, amount)
            .send()
            .await
            .map_err(map_contract_error)?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        let tx_id = format!("{}", receipt.transaction_hash);
        if !receipt.status() {
            return Err(LedgerError::TransferReverted(tx_id));
        }

        info!(%tx_id, to = %recipient, amount = amount_base_units, "ERC-20 transfer confirmed");

        Ok(TransferReceipt {
            tx_id,
            confirmed: true,
        })
    }
}
