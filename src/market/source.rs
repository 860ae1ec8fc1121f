//! The set of upstream reads one computation pass needs
//!
//! `MarketSource` is the seam between the snapshot layer and the network;
//! `LiveMarket` is the real implementation backed by one shared HTTP client.

use async_trait::async_trait;
use eyre::{eyre, Result};
use reqwest::Client;
use std::time::Duration;

use crate::config::Config;
use super::coingecko;
use super::defillama;
use super::ethereum::Erc20BalanceReader;
use super::stats::{self, USER_AGENT};
use super::types::TokenSnapshot;

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// CoinGecko snapshot for a coin id
    async fn token_snapshot(&self, coin_id: &str) -> Result<TokenSnapshot>;

    /// ETH price in USD
    async fn eth_price(&self) -> Result<f64>;

    /// Project TVL reported by the aggregator (USD)
    async fn project_aggregator_tvl(&self) -> Result<f64>;

    /// Project treasury's on-chain stablecoin balance (USD)
    async fn project_onchain_balance(&self) -> Result<f64>;

    /// Reference protocol TVL from Arma (USD)
    async fn arma_tvl(&self) -> Result<f64>;

    /// Reference protocol TVL from Pulse (ETH)
    async fn pulse_balance_eth(&self) -> Result<f64>;
}

/// Upstream endpoints and identifiers
#[derive(Debug, Clone)]
pub struct MarketEndpoints {
    pub coingecko_api_url: String,
    pub defillama_api_url: String,
    pub arma_stats_url: String,
    pub pulse_stats_url: Option<String>,
    pub project_tvl_slug: String,
    pub treasury_address: String,
}

impl From<&Config> for MarketEndpoints {
    fn from(config: &Config) -> Self {
        Self {
            coingecko_api_url: config.coingecko_api_url.clone(),
            defillama_api_url: config.defillama_api_url.clone(),
            arma_stats_url: config.arma_stats_url.clone(),
            pulse_stats_url: config.pulse_stats_url.clone(),
            project_tvl_slug: config.project_tvl_slug.clone(),
            treasury_address: config.treasury_address.clone(),
        }
    }
}

pub fn build_http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| eyre!("Failed to create HTTP client: {}", e))
}

pub struct LiveMarket {
    http_client: Client,
    endpoints: MarketEndpoints,
    balances: Erc20BalanceReader,
}

impl LiveMarket {
    pub fn new(http_client: Client, endpoints: MarketEndpoints, rpc_url: String) -> Self {
        Self {
            http_client,
            endpoints,
            balances: Erc20BalanceReader::new(rpc_url),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = build_http_client(config.http_timeout_secs)?;
        Ok(Self::new(
            http_client,
            MarketEndpoints::from(config),
            config.rpc_url.clone(),
        ))
    }

    /// Shared client, reused by the proxy routes
    pub fn http_client(&self) -> &Client {
        &self.http_client
    }
}

#[async_trait]
impl MarketSource for LiveMarket {
    async fn token_snapshot(&self, coin_id: &str) -> Result<TokenSnapshot> {
        coingecko::fetch_token_snapshot(&self.http_client, &self.endpoints.coingecko_api_url, coin_id).await
    }

    async fn eth_price(&self) -> Result<f64> {
        coingecko::fetch_eth_price(&self.http_client, &self.endpoints.coingecko_api_url).await
    }

    async fn project_aggregator_tvl(&self) -> Result<f64> {
        defillama::fetch_protocol_tvl(
            &self.http_client,
            &self.endpoints.defillama_api_url,
            &self.endpoints.project_tvl_slug,
        )
        .await
    }

    async fn project_onchain_balance(&self) -> Result<f64> {
        self.balances.usdc_balance(&self.endpoints.treasury_address).await
    }

    async fn arma_tvl(&self) -> Result<f64> {
        stats::fetch_arma_tvl(&self.http_client, &self.endpoints.arma_stats_url).await
    }

    async fn pulse_balance_eth(&self) -> Result<f64> {
        let url = self
            .endpoints
            .pulse_stats_url
            .as_deref()
            .ok_or_else(|| eyre!("PULSE_STATS_URL is not configured"))?;
        stats::fetch_pulse_balance_eth(&self.http_client, url).await
    }
}
