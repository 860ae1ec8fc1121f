//! On-chain ERC-20 balance reads
//!
//! One `eth_call` to `balanceOf(address)`, scaled down by the token's decimals.

use alloy_primitives::{address, Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use std::str::FromStr;
use tracing::debug;

sol! {
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// USDC on Ethereum mainnet
pub const USDC_TOKEN: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

pub const USDC_DECIMALS: u8 = 6;

/// Convert a raw token amount to a human-readable float
pub fn scale_down(raw: U256, decimals: u8) -> Result<f64> {
    let raw: f64 = raw
        .to_string()
        .parse()
        .map_err(|e| eyre!("Failed to convert balance: {}", e))?;
    Ok(raw / 10f64.powi(decimals as i32))
}

/// Reads ERC-20 balances through a JSON-RPC endpoint
pub struct Erc20BalanceReader {
    rpc_url: String,
}

impl Erc20BalanceReader {
    pub fn new(rpc_url: String) -> Self {
        Self { rpc_url }
    }

    /// Raw `balanceOf` result
    pub async fn balance_of(&self, token: Address, holder: Address) -> Result<U256> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        let calldata = IERC20::balanceOfCall { account: holder }.abi_encode();
        let tx = TransactionRequest::default()
            .to(token)
            .input(calldata.into());

        let output = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("eth_call failed: {}", e))?;

        let balance = IERC20::balanceOfCall::abi_decode_returns(&output)?;
        Ok(balance)
    }

    /// USDC balance of `holder`, in USD
    pub async fn usdc_balance(&self, holder: &str) -> Result<f64> {
        let holder = Address::from_str(holder)
            .map_err(|e| eyre!("Invalid holder address {}: {}", holder, e))?;

        let raw = self.balance_of(USDC_TOKEN, holder).await?;
        let balance = scale_down(raw, USDC_DECIMALS)?;

        debug!("USDC balance of {:?}: ${:.2}", holder, balance);
        Ok(balance)
    }
}
