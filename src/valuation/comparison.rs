//! Valuation set: the engine run against every reference FDV plus the
//! TVL-scaled projection
//!
//! This is the only place the engine is fanned out, so the HTTP API and the
//! CSV report always show the same numbers for the same snapshot.

use serde::Serialize;

use crate::market::MarketSnapshot;
use crate::program::AllocationProgramConfig;
use super::engine::{compute_valuation_flagged, custom_points_value, ValuationResult};
use super::tvl::TvlComparison;

/// One reference FDV fed to the engine
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceInput {
    pub label: String,
    pub fdv: f64,
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceValuation {
    pub label: String,
    pub valuation: ValuationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationSet {
    /// In reference order
    pub per_reference: Vec<ReferenceValuation>,

    pub tvl: TvlComparison,

    /// Label of the reference whose FDV the TVL ratio scales (the first one)
    pub tvl_basis: String,

    /// Engine output at `basis FDV * TVL ratio`
    pub tvl_scaled: ValuationResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledValue {
    pub label: String,
    pub value: f64,
}

/// A custom point count valued at every reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomPointsValues {
    pub points: f64,
    pub per_reference: Vec<LabeledValue>,
    pub tvl_scaled: f64,
}

impl ValuationSet {
    pub fn compute(
        program: &AllocationProgramConfig,
        references: &[ReferenceInput],
        tvl: TvlComparison,
    ) -> Self {
        let per_reference = references
            .iter()
            .map(|r| ReferenceValuation {
                label: r.label.clone(),
                valuation: compute_valuation_flagged(r.fdv, program, r.is_fallback),
            })
            .collect();

        let basis = references.first();
        let basis_fdv = basis.map(|r| r.fdv).unwrap_or(0.0);
        let basis_fallback = basis.map(|r| r.is_fallback).unwrap_or(true);

        let tvl_scaled = compute_valuation_flagged(
            tvl.ratio.scale(basis_fdv),
            program,
            basis_fallback || !tvl.ratio.is_available() || tvl.reference.is_fallback,
        );

        Self {
            per_reference,
            tvl,
            tvl_basis: basis.map(|r| r.label.clone()).unwrap_or_default(),
            tvl_scaled,
        }
    }

    /// Build inputs from a fetch pass and compute
    pub fn from_snapshot(program: &AllocationProgramConfig, snapshot: &MarketSnapshot) -> Self {
        let references: Vec<ReferenceInput> = snapshot
            .tokens
            .iter()
            .map(|t| ReferenceInput {
                label: t.reference.label.clone(),
                fdv: t.fdv(),
                is_fallback: !t.snapshot.is_success(),
            })
            .collect();

        let tvl = TvlComparison::new(snapshot.project_tvl, snapshot.reference_tvl);
        Self::compute(program, &references, tvl)
    }

    /// Valuation at the reference named `label`
    pub fn reference(&self, label: &str) -> Option<&ValuationResult> {
        self.per_reference
            .iter()
            .find(|r| r.label == label)
            .map(|r| &r.valuation)
    }

    /// Value `points` at every reference FDV and at the TVL-scaled FDV
    pub fn custom_points(&self, points: f64, program: &AllocationProgramConfig) -> CustomPointsValues {
        CustomPointsValues {
            points,
            per_reference: self
                .per_reference
                .iter()
                .map(|r| LabeledValue {
                    label: r.label.clone(),
                    value: custom_points_value(points, r.valuation.reference_fdv, program),
                })
                .collect(),
            tvl_scaled: custom_points_value(points, self.tvl_scaled.reference_fdv, program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::tvl::TvlSnapshot;

    fn inputs() -> Vec<ReferenceInput> {
        vec![
            ReferenceInput { label: "Giza".into(), fdv: 1_000_000_000.0, is_fallback: false },
            ReferenceInput { label: "Newton".into(), fdv: 400_000_000.0, is_fallback: false },
        ]
    }

    fn tvl(project: f64, reference: f64) -> TvlComparison {
        TvlComparison::new(
            TvlSnapshot::from_components(project, 0.0, 0.0),
            TvlSnapshot::from_components(reference, 0.0, 0.0),
        )
    }

    #[test]
    fn test_tvl_scaled_matches_direct_substitution() {
        let program = AllocationProgramConfig::default();
        let set = ValuationSet::compute(&program, &inputs(), tvl(32_779_544.0, 16_389_772.0));

        let direct = crate::valuation::compute_valuation(2_000_000_000.0, &program);
        assert_eq!(set.tvl_basis, "Giza");
        assert_eq!(set.tvl_scaled.flat_allocation_value, 10_000_000.0);
        assert_eq!(set.tvl_scaled.total_allocation_value, direct.total_allocation_value);
        assert!(!set.tvl_scaled.is_fallback);
    }

    #[test]
    fn test_zero_reference_tvl_gives_sentinel() {
        let program = AllocationProgramConfig::default();
        let set = ValuationSet::compute(&program, &inputs(), tvl(32_779_544.0, 0.0));

        assert!(set.tvl_scaled.is_fallback);
        assert_eq!(set.tvl_scaled.reference_fdv, 0.0);
        assert_eq!(set.tvl_scaled.flat_allocation_value, 0.0);
        assert!(set.tvl_scaled.per_phase_total_value.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_per_reference_order_and_lookup() {
        let program = AllocationProgramConfig::default();
        let set = ValuationSet::compute(&program, &inputs(), tvl(1.0, 1.0));

        assert_eq!(set.per_reference[0].label, "Giza");
        assert_eq!(set.reference("Newton").map(|v| v.implied_token_price), Some(0.4));
        assert_eq!(set.reference("Newton"), Some(&set.per_reference[1].valuation));
        assert!(set.reference("Missing").is_none());
    }

    #[test]
    fn test_custom_points() {
        let program = AllocationProgramConfig::default();
        let set = ValuationSet::compute(&program, &inputs(), tvl(32_779_544.0, 16_389_772.0));
        let values = set.custom_points(10_000.0, &program);

        assert_eq!(values.per_reference[0].value, 10_000.0);
        assert!((values.per_reference[1].value - 4_000.0).abs() < 1e-9);
        assert_eq!(values.tvl_scaled, 20_000.0);
    }

    #[test]
    fn test_no_references() {
        let program = AllocationProgramConfig::default();
        let set = ValuationSet::compute(&program, &[], tvl(1.0, 1.0));
        assert!(set.per_reference.is_empty());
        assert_eq!(set.tvl_scaled.total_allocation_value, 0.0);
    }
}
