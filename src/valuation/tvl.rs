//! TVL snapshots and the TVL ratio used for scaled projections

use serde::Serialize;

use super::engine::{safe_div, sanitize};

/// TVL summed from independently sourced components
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TvlSnapshot {
    pub component_a: f64,
    pub component_b: f64,

    /// Always component_a + component_b
    pub total: f64,

    /// Price used to convert a non-USD component (ETH for Pulse), 0 if unused
    pub reference_token_price: f64,

    /// True when `total` is a configured constant rather than live data
    pub is_fallback: bool,
}

impl TvlSnapshot {
    pub fn from_components(component_a: f64, component_b: f64, reference_token_price: f64) -> Self {
        let component_a = sanitize(component_a);
        let component_b = sanitize(component_b);
        Self {
            component_a,
            component_b,
            total: component_a + component_b,
            reference_token_price: sanitize(reference_token_price),
            is_fallback: false,
        }
    }

    /// A fixed total standing in for live data
    pub fn fixed(total: f64) -> Self {
        Self {
            is_fallback: true,
            ..Self::from_components(total, 0.0, 0.0)
        }
    }

    /// Replace an empty live snapshot with the fixed total
    pub fn or_fixed(self, fallback_total: f64) -> Self {
        if self.total > 0.0 {
            self
        } else {
            Self::fixed(fallback_total)
        }
    }
}

/// Quotient of two TVL totals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum TvlRatio {
    Available(f64),
    /// Denominator was zero (or unusable)
    Unavailable,
}

impl TvlRatio {
    pub fn between(numerator: f64, denominator: f64) -> Self {
        let denominator = sanitize(denominator);
        if denominator == 0.0 {
            return TvlRatio::Unavailable;
        }
        TvlRatio::Available(safe_div(sanitize(numerator), denominator))
    }

    /// Numeric ratio; the sentinel 0 when unavailable
    pub fn value(&self) -> f64 {
        match self {
            TvlRatio::Available(r) => *r,
            TvlRatio::Unavailable => 0.0,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, TvlRatio::Available(_))
    }

    /// Effective FDV for the TVL-scaled projection
    pub fn scale(&self, reference_fdv: f64) -> f64 {
        sanitize(reference_fdv) * self.value()
    }
}

/// Project TVL measured against a reference protocol's TVL
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TvlComparison {
    pub project: TvlSnapshot,
    pub reference: TvlSnapshot,
    pub ratio: TvlRatio,

    /// project.total - reference.total
    pub difference: f64,

    /// ratio * 100, 0 when unavailable
    pub percentage: f64,
}

impl TvlComparison {
    pub fn new(project: TvlSnapshot, reference: TvlSnapshot) -> Self {
        let ratio = TvlRatio::between(project.total, reference.total);
        Self {
            project,
            reference,
            ratio,
            difference: project.total - reference.total,
            percentage: ratio.value() * 100.0,
        }
    }
}
