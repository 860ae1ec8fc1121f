//! Valuation
//!
//! Responsible for:
//! - Turning a reference FDV into allocation and point values
//! - TVL ratio projections
//! - The bonus APR estimate

mod bonus;
mod comparison;
mod engine;
mod tvl;

pub use bonus::{estimate_bonus, BonusEstimate, BonusInputs};
pub use comparison::{CustomPointsValues, LabeledValue, ReferenceInput, ReferenceValuation, ValuationSet};
pub use engine::{compute_valuation, compute_valuation_flagged, custom_points_value, safe_div, sanitize, ValuationResult};
pub use tvl::{TvlComparison, TvlRatio, TvlSnapshot};
