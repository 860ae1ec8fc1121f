//! Valuation Engine
//!
//! Converts an effective reference FDV into the full set of allocation
//! metrics for a program. Pure and synchronous: no I/O, no state.
//!
//! Every output is linear in the reference FDV, so a TVL-scaled projection
//! is just a different input (`fdv * ratio`), never a separate code path.

use serde::Serialize;

use crate::program::AllocationProgramConfig;

/// Derived metrics for one reference FDV
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationResult {
    /// Effective FDV the metrics were computed from
    pub reference_fdv: f64,

    /// reference_fdv / total_supply
    pub implied_token_price: f64,

    /// Fully diluted, so equal to the reference FDV
    pub implied_market_cap: f64,

    pub flat_allocation_value: f64,
    pub flat_allocation_tokens: f64,

    pub point_program_allocation_value: f64,
    pub point_program_tokens: f64,

    /// One entry per phase, in program order
    pub per_phase_total_value: Vec<f64>,
    pub per_phase_value_per_point: Vec<f64>,

    /// Flat allocation plus every phase
    pub total_allocation_value: f64,

    /// Set when the input came from a fallback (missing upstream data).
    /// Never changes the computed numbers.
    pub is_fallback: bool,
}

/// Sanitize an upstream figure: anything missing, negative or non-finite reads as 0
pub fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Divide, returning 0 instead of NaN/Infinity
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let q = numerator / denominator;
    if q.is_finite() {
        q
    } else {
        0.0
    }
}

/// Clamp an overflowed product of sanitized figures to the largest finite value
fn saturate(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::MAX
    }
}

/// Share of `amount` given as a percentage, scaled before multiplying so it cannot overflow
fn percent_of(amount: f64, percent: f64) -> f64 {
    saturate(amount * (sanitize(percent) / 100.0))
}

/// Compute all metrics for one reference FDV
pub fn compute_valuation(reference_fdv: f64, program: &AllocationProgramConfig) -> ValuationResult {
    let fdv = sanitize(reference_fdv);
    let supply = sanitize(program.total_supply);
    let implied_token_price = safe_div(fdv, supply);

    let per_phase_total_value: Vec<f64> = program
        .phases
        .iter()
        .map(|phase| saturate(implied_token_price * sanitize(phase.total_points)))
        .collect();

    // Every point in every phase is worth one token
    let per_phase_value_per_point: Vec<f64> = program
        .phases
        .iter()
        .map(|phase| {
            if sanitize(phase.total_points) > 0.0 {
                implied_token_price
            } else {
                0.0
            }
        })
        .collect();

    let flat_allocation_value = percent_of(fdv, program.flat_allocation_percent);
    let total_allocation_value = saturate(
        per_phase_total_value
            .iter()
            .fold(flat_allocation_value, |sum, value| sum + value),
    );

    ValuationResult {
        reference_fdv: fdv,
        implied_token_price,
        implied_market_cap: fdv,
        flat_allocation_value,
        flat_allocation_tokens: percent_of(supply, program.flat_allocation_percent),
        point_program_allocation_value: percent_of(fdv, program.point_program_percent),
        point_program_tokens: percent_of(supply, program.point_program_percent),
        total_allocation_value,
        per_phase_total_value,
        per_phase_value_per_point,
        is_fallback: false,
    }
}

/// Same as `compute_valuation`, flagging the result as fallback-derived
pub fn compute_valuation_flagged(
    reference_fdv: f64,
    program: &AllocationProgramConfig,
    is_fallback: bool,
) -> ValuationResult {
    let mut result = compute_valuation(reference_fdv, program);
    result.is_fallback = is_fallback || result.reference_fdv == 0.0;
    result
}

/// Value of an arbitrary number of points at a reference FDV
pub fn custom_points_value(points: f64, reference_fdv: f64, program: &AllocationProgramConfig) -> f64 {
    let price = safe_div(sanitize(reference_fdv), sanitize(program.total_supply));
    saturate(price * sanitize(points))
}

// ============================================
// TESTS
// ============================================
