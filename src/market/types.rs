//! Normalized shapes produced by the fetchers

use eyre::Result;
use serde::Serialize;
use std::fmt;
use tracing::warn;

use crate::valuation::sanitize;

/// A token the project is compared against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceToken {
    /// CoinGecko coin id ("giza", "newton-protocol")
    pub id: String,

    /// Display label used in report rows ("Giza")
    pub label: String,
}

impl ReferenceToken {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Parse `id:Label`; a bare id is its own label
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim();
        if entry.is_empty() {
            return None;
        }
        match entry.split_once(':') {
            Some((id, label)) if !id.trim().is_empty() => {
                let label = if label.trim().is_empty() { id } else { label };
                Some(Self::new(id.trim(), label.trim()))
            }
            Some(_) => None,
            None => Some(Self::new(entry, entry)),
        }
    }
}

/// Market snapshot for one token, as reported by CoinGecko
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TokenSnapshot {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub fully_diluted_valuation: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub image: Option<String>,
}

impl TokenSnapshot {
    /// FDV in USD, 0 when absent
    pub fn fdv(&self) -> f64 {
        sanitize(self.fully_diluted_valuation.unwrap_or(0.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FetchStatus {
    Success,
    Failed,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Success => write!(f, "Success"),
            FetchStatus::Failed => write!(f, "Failed"),
        }
    }
}

/// Settled result of one fetch: the value, or its documented fallback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot<T> {
    pub value: T,
    pub status: FetchStatus,
}

impl<T> Slot<T> {
    pub fn success(value: T) -> Self {
        Self {
            value,
            status: FetchStatus::Success,
        }
    }

    pub fn failed(fallback: T) -> Self {
        Self {
            value: fallback,
            status: FetchStatus::Failed,
        }
    }

    /// Absorb a fetch error into the fallback value
    pub fn settle(result: Result<T>, fallback: T, source: &str) -> Self {
        match result {
            Ok(value) => Self::success(value),
            Err(e) => {
                warn!("{} fetch failed, using fallback: {}", source, e);
                Self::failed(fallback)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FetchStatus::Success
    }
}
