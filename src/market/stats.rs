//! Reference-protocol stats endpoints (Arma, Pulse)
//!
//! Both are CORS-restricted for browsers, which is why the server proxies
//! them verbatim. Here we only pull the `total_balance` figure:
//! - Arma reports it in USD as a number
//! - Pulse reports it in wei (18 decimals) as a string

use eyre::{eyre, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

pub const USER_AGENT: &str = "Almanak-App/1.0";

const WEI_PER_ETH: f64 = 1e18;

/// GET an upstream stats endpoint and return its JSON body untouched
pub async fn fetch_raw(client: &Client, url: &str) -> Result<Value> {
    let response = client
        .get(url)
        .header("Content-Type", "application/json")
        .header("User-Agent", USER_AGENT)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(eyre!("HTTP error! status: {}", status.as_u16()));
    }

    Ok(response.json().await?)
}

/// Read a JSON field that may be a number or a numeric string
fn numeric_field(body: &Value, field: &str) -> Option<f64> {
    body.get(field).and_then(|v| {
        v.as_f64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
    })
}

/// Arma TVL in USD
pub fn arma_tvl(body: &Value) -> Result<f64> {
    numeric_field(body, "total_balance").ok_or_else(|| eyre!("Arma stats missing total_balance"))
}

/// Pulse TVL in ETH
pub fn pulse_balance_eth(body: &Value) -> Result<f64> {
    let wei = numeric_field(body, "total_balance")
        .ok_or_else(|| eyre!("Pulse stats missing total_balance"))?;
    Ok(wei / WEI_PER_ETH)
}

pub async fn fetch_arma_tvl(client: &Client, url: &str) -> Result<f64> {
    let body = fetch_raw(client, url).await?;
    let tvl = arma_tvl(&body)?;
    debug!("Arma TVL: ${:.2}", tvl);
    Ok(tvl)
}

pub async fn fetch_pulse_balance_eth(client: &Client, url: &str) -> Result<f64> {
    let body = fetch_raw(client, url).await?;
    let eth = pulse_balance_eth(&body)?;
    debug!("Pulse TVL: {:.4} ETH", eth);
    Ok(eth)
}
