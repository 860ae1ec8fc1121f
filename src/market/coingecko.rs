//! CoinGecko - coin snapshots and ETH spot price
//!
//! API: https://api.coingecko.com/api/v3/coins/{id}
//!      https://api.coingecko.com/api/v3/simple/price?ids=ethereum&vs_currencies=usd

use eyre::{eyre, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::types::TokenSnapshot;

// ============================================
// API RESPONSE TYPES
// ============================================

#[derive(Debug, Default, Deserialize)]
struct UsdQuote {
    usd: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageLinks {
    large: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MarketData {
    #[serde(default)]
    current_price: Option<UsdQuote>,
    #[serde(default)]
    market_cap: Option<UsdQuote>,
    #[serde(default)]
    fully_diluted_valuation: Option<UsdQuote>,
    total_supply: Option<f64>,
    max_supply: Option<f64>,
    circulating_supply: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap_rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CoinResponse {
    id: String,
    symbol: String,
    name: String,
    market_cap_rank: Option<u32>,
    #[serde(default)]
    market_data: Option<MarketData>,
    #[serde(default)]
    image: Option<ImageLinks>,
}

fn usd(quote: Option<UsdQuote>) -> Option<f64> {
    quote.and_then(|q| q.usd)
}

impl From<CoinResponse> for TokenSnapshot {
    fn from(coin: CoinResponse) -> Self {
        let md = coin.market_data.unwrap_or_default();
        TokenSnapshot {
            id: coin.id,
            symbol: coin.symbol.to_uppercase(),
            name: coin.name,
            current_price: usd(md.current_price),
            market_cap: usd(md.market_cap),
            fully_diluted_valuation: usd(md.fully_diluted_valuation),
            total_supply: md.total_supply,
            max_supply: md.max_supply,
            circulating_supply: md.circulating_supply,
            price_change_percentage_24h: md.price_change_percentage_24h,
            market_cap_rank: md.market_cap_rank.or(coin.market_cap_rank),
            image: coin.image.and_then(|i| i.large),
        }
    }
}

// ============================================
// FETCHERS
// ============================================

/// Fetch a coin's market snapshot
pub async fn fetch_token_snapshot(client: &Client, base_url: &str, coin_id: &str) -> Result<TokenSnapshot> {
    let url = format!("{}/coins/{}", base_url.trim_end_matches('/'), coin_id);

    let coin: CoinResponse = client
        .get(&url)
        .query(&[
            ("localization", "false"),
            ("tickers", "false"),
            ("market_data", "true"),
            ("community_data", "false"),
            ("developer_data", "false"),
            ("sparkline", "false"),
        ])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let snapshot = TokenSnapshot::from(coin);
    debug!(
        "CoinGecko {}: price {:?}, FDV {:?}",
        snapshot.symbol, snapshot.current_price, snapshot.fully_diluted_valuation
    );

    Ok(snapshot)
}

/// Fetch the current ETH price in USD
pub async fn fetch_eth_price(client: &Client, base_url: &str) -> Result<f64> {
    let url = format!("{}/simple/price", base_url.trim_end_matches('/'));

    let prices: HashMap<String, UsdQuote> = client
        .get(&url)
        .query(&[("ids", "ethereum"), ("vs_currencies", "usd")])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    prices
        .get("ethereum")
        .and_then(|q| q.usd)
        .ok_or_else(|| eyre!("No ethereum/usd quote in CoinGecko response"))
}
