//! DefiLlama - protocol TVL
//!
//! API: https://api.llama.fi/tvl/{protocol}  (plain number body, USD)

use eyre::{eyre, Result};
use reqwest::Client;
use tracing::debug;

pub async fn fetch_protocol_tvl(client: &Client, base_url: &str, protocol: &str) -> Result<f64> {
    let url = format!("{}/tvl/{}", base_url.trim_end_matches('/'), protocol);

    let tvl: f64 = client
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    if !tvl.is_finite() || tvl < 0.0 {
        return Err(eyre!("DefiLlama returned an invalid TVL for {}: {}", protocol, tvl));
    }

    debug!("DefiLlama TVL for {}: ${:.2}", protocol, tvl);
    Ok(tvl)
}
