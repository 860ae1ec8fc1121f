//! One fetch pass: fan out every upstream read, fan in when all have settled
//!
//! Each read lands in its own `Slot`, so a failure only replaces that
//! value with its fallback and never aborts the rest of the join.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

use crate::valuation::TvlSnapshot;
use super::source::MarketSource;
use super::types::{ReferenceToken, Slot, TokenSnapshot};

/// How the reference protocol's TVL is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTvlMode {
    /// Arma + Pulse, falling back to the fixed value when both read 0
    Live,
    /// Always the fixed value
    Fixed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenSlot {
    pub reference: ReferenceToken,
    pub snapshot: Slot<Option<TokenSnapshot>>,
}

impl TokenSlot {
    /// FDV of the token, 0 if the fetch failed or the field was absent
    pub fn fdv(&self) -> f64 {
        self.snapshot.value.as_ref().map(|s| s.fdv()).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectTvlSources {
    pub aggregator: Slot<f64>,
    pub onchain_balance: Slot<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceTvlSources {
    pub arma: Slot<f64>,
    pub pulse_eth: Slot<f64>,
    pub eth_price: Slot<f64>,
}

impl ReferenceTvlSources {
    pub fn pulse_usd(&self) -> f64 {
        self.pulse_eth.value * self.eth_price.value
    }
}

/// Everything one computation pass consumes
#[derive(Debug, Clone, Serialize)]
pub struct MarketSnapshot {
    pub tokens: Vec<TokenSlot>,

    pub project_tvl: TvlSnapshot,
    pub project_tvl_sources: ProjectTvlSources,

    pub reference_tvl: TvlSnapshot,
    /// `None` when the reference TVL was fixed by mode
    pub reference_tvl_sources: Option<ReferenceTvlSources>,

    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// True when every reference token came back
    pub fn all_tokens_fetched(&self) -> bool {
        self.tokens.iter().all(|t| t.snapshot.is_success())
    }
}

async fn fetch_token<S: MarketSource + ?Sized>(source: &S, reference: &ReferenceToken) -> TokenSlot {
    let result = source.token_snapshot(&reference.id).await.map(Some);
    TokenSlot {
        reference: reference.clone(),
        snapshot: Slot::settle(result, None, &format!("CoinGecko {}", reference.id)),
    }
}

async fn fetch_project_tvl<S: MarketSource + ?Sized>(source: &S) -> (TvlSnapshot, ProjectTvlSources) {
    let (aggregator, onchain) = tokio::join!(
        source.project_aggregator_tvl(),
        source.project_onchain_balance(),
    );

    let sources = ProjectTvlSources {
        aggregator: Slot::settle(aggregator, 0.0, "DefiLlama TVL"),
        onchain_balance: Slot::settle(onchain, 0.0, "Treasury USDC balance"),
    };

    let tvl = TvlSnapshot::from_components(sources.aggregator.value, sources.onchain_balance.value, 0.0);
    (tvl, sources)
}

async fn fetch_reference_tvl<S: MarketSource + ?Sized>(
    source: &S,
    mode: ReferenceTvlMode,
    fixed_total: f64,
) -> (TvlSnapshot, Option<ReferenceTvlSources>) {
    if mode == ReferenceTvlMode::Fixed {
        return (TvlSnapshot::fixed(fixed_total), None);
    }

    let (arma, pulse_eth, eth_price) = tokio::join!(
        source.arma_tvl(),
        source.pulse_balance_eth(),
        source.eth_price(),
    );

    let sources = ReferenceTvlSources {
        arma: Slot::settle(arma, 0.0, "Arma stats"),
        pulse_eth: Slot::settle(pulse_eth, 0.0, "Pulse stats"),
        eth_price: Slot::settle(eth_price, 0.0, "ETH price"),
    };

    let live = TvlSnapshot::from_components(sources.arma.value, sources.pulse_usd(), sources.eth_price.value);
    let tvl = live.or_fixed(fixed_total);
    if tvl.is_fallback {
        warn!("Live reference TVL unavailable, using fixed ${:.0}", fixed_total);
    }

    (tvl, Some(sources))
}

/// Run every fetch for one pass concurrently
pub async fn gather<S: MarketSource + ?Sized>(
    source: &S,
    references: &[ReferenceToken],
    mode: ReferenceTvlMode,
    fixed_reference_tvl: f64,
) -> MarketSnapshot {
    let start = Instant::now();

    let tokens = join_all(references.iter().map(|r| fetch_token(source, r)));

    let (tokens, (project_tvl, project_tvl_sources), (reference_tvl, reference_tvl_sources)) = tokio::join!(
        tokens,
        fetch_project_tvl(source),
        fetch_reference_tvl(source, mode, fixed_reference_tvl),
    );

    info!(
        "Market snapshot in {:?}: {}/{} tokens, project TVL ${:.2}, reference TVL ${:.2}",
        start.elapsed(),
        tokens.iter().filter(|t| t.snapshot.is_success()).count(),
        tokens.len(),
        project_tvl.total,
        reference_tvl.total
    );

    MarketSnapshot {
        tokens,
        project_tvl,
        project_tvl_sources,
        reference_tvl,
        reference_tvl_sources,
        fetched_at: Utc::now(),
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use eyre::{eyre, Result};

    /// Canned upstream values; `None` simulates a failed fetch
    #[derive(Default)]
    pub(crate) struct FakeMarket {
        pub fdvs: Vec<(String, Option<f64>)>,
        pub eth_price: Option<f64>,
        pub aggregator_tvl: Option<f64>,
        pub onchain_balance: Option<f64>,
        pub arma_tvl: Option<f64>,
        pub pulse_eth: Option<f64>,
    }

    fn canned(value: Option<f64>, what: &str) -> Result<f64> {
        value.ok_or_else(|| eyre!("{} unavailable", what))
    }

    #[async_trait]
    impl MarketSource for FakeMarket {
        async fn token_snapshot(&self, coin_id: &str) -> Result<TokenSnapshot> {
            let fdv = self
                .fdvs
                .iter()
                .find(|(id, _)| id == coin_id)
                .and_then(|(_, fdv)| *fdv)
                .ok_or_else(|| eyre!("no data for {}", coin_id))?;
            Ok(TokenSnapshot {
                id: coin_id.to_string(),
                symbol: coin_id.to_uppercase(),
                name: coin_id.to_string(),
                fully_diluted_valuation: Some(fdv),
                ..Default::default()
            })
        }

        async fn eth_price(&self) -> Result<f64> {
            canned(self.eth_price, "eth price")
        }

        async fn project_aggregator_tvl(&self) -> Result<f64> {
            canned(self.aggregator_tvl, "aggregator tvl")
        }

        async fn project_onchain_balance(&self) -> Result<f64> {
            canned(self.onchain_balance, "onchain balance")
        }

        async fn arma_tvl(&self) -> Result<f64> {
            canned(self.arma_tvl, "arma")
        }

        async fn pulse_balance_eth(&self) -> Result<f64> {
            canned(self.pulse_eth, "pulse")
        }
    }

    fn references() -> Vec<ReferenceToken> {
        vec![
            ReferenceToken::new("giza", "Giza"),
            ReferenceToken::new("newton-protocol", "Newton"),
        ]
    }

    #[tokio::test]
    async fn test_all_sources_succeed() {
        let market = FakeMarket {
            fdvs: vec![
                ("giza".into(), Some(250_000_000.0)),
                ("newton-protocol".into(), Some(400_000_000.0)),
            ],
            eth_price: Some(3_000.0),
            aggregator_tvl: Some(30_000_000.0),
            onchain_balance: Some(2_779_544.0),
            arma_tvl: Some(10_000_000.0),
            pulse_eth: Some(1_000.0),
        };

        let snapshot = gather(&market, &references(), ReferenceTvlMode::Live, 16_389_772.0).await;

        assert!(snapshot.all_tokens_fetched());
        assert_eq!(snapshot.tokens[0].fdv(), 250_000_000.0);
        assert_eq!(snapshot.tokens[1].reference.label, "Newton");
        assert_eq!(snapshot.project_tvl.total, 32_779_544.0);
        assert_eq!(snapshot.reference_tvl.total, 13_000_000.0);
        assert!(!snapshot.reference_tvl.is_fallback);

        // Project TVL is all USD, the reference side converts Pulse ETH
        assert_eq!(snapshot.project_tvl.reference_token_price, 0.0);
        assert_eq!(snapshot.reference_tvl.reference_token_price, 3_000.0);
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let market = FakeMarket {
            fdvs: vec![("giza".into(), Some(250_000_000.0))],
            aggregator_tvl: Some(30_000_000.0),
            ..Default::default()
        };

        let snapshot = gather(&market, &references(), ReferenceTvlMode::Live, 16_389_772.0).await;

        assert!(snapshot.tokens[0].snapshot.is_success());
        assert!(!snapshot.tokens[1].snapshot.is_success());
        assert_eq!(snapshot.tokens[1].fdv(), 0.0);
        assert!(!snapshot.all_tokens_fetched());

        assert_eq!(snapshot.project_tvl.total, 30_000_000.0);
        assert!(!snapshot.project_tvl_sources.onchain_balance.is_success());

        // Arma, Pulse and ETH price all failed: fixed reference TVL kicks in
        assert!(snapshot.reference_tvl.is_fallback);
        assert_eq!(snapshot.reference_tvl.total, 16_389_772.0);
    }

    #[tokio::test]
    async fn test_pulse_without_eth_price_reads_zero() {
        let market = FakeMarket {
            arma_tvl: Some(5_000_000.0),
            pulse_eth: Some(1_000.0),
            ..Default::default()
        };

        let snapshot = gather(&market, &references(), ReferenceTvlMode::Live, 16_389_772.0).await;
        assert_eq!(snapshot.reference_tvl.total, 5_000_000.0);
        assert_eq!(snapshot.reference_tvl.component_b, 0.0);
    }

    #[test]
    fn test_fixed_mode_skips_live_reads() {
        let market = FakeMarket {
            arma_tvl: Some(99.0),
            ..Default::default()
        };

        let snapshot = tokio_test::block_on(gather(
            &market,
            &references(),
            ReferenceTvlMode::Fixed,
            16_389_772.0,
        ));
        assert!(snapshot.reference_tvl_sources.is_none());
        assert_eq!(snapshot.reference_tvl.total, 16_389_772.0);
    }
}
