//! Bonus APR calculator
//!
//! Estimates the yearly return a depositor earns from the point program's
//! daily emission, given an assumed FDV and the current TVL their deposit
//! is diluted against.

use serde::{Deserialize, Serialize};

use crate::program::AllocationProgramConfig;
use super::engine::{safe_div, sanitize};

/// User-entered scalars; missing ones read as 0
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusInputs {
    /// Assumed FDV in millions of USD
    pub assumed_fdv_millions: f64,

    /// Deposit in USD
    pub user_deposit: f64,

    /// Protocol TVL in USD (full value)
    pub current_tvl: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BonusEstimate {
    /// USD value of one day of point emission
    pub points_value_per_day: f64,

    /// Depositor's share of that daily value
    pub user_daily_value: f64,

    /// Annualized, in percent
    pub apr: f64,

    /// deposit * apr / 100
    pub yearly_bonus: f64,
}

impl BonusEstimate {
    fn zero() -> Self {
        Self {
            points_value_per_day: 0.0,
            user_daily_value: 0.0,
            apr: 0.0,
            yearly_bonus: 0.0,
        }
    }
}

pub fn estimate_bonus(inputs: &BonusInputs, program: &AllocationProgramConfig) -> BonusEstimate {
    let fdv = sanitize(inputs.assumed_fdv_millions) * 1_000_000.0;
    let deposit = sanitize(inputs.user_deposit);
    let tvl = sanitize(inputs.current_tvl);

    if fdv == 0.0 || deposit == 0.0 || tvl == 0.0 {
        return BonusEstimate::zero();
    }

    let points_per_day = program
        .bonus_phase()
        .map(|phase| sanitize(phase.points_per_day))
        .unwrap_or(0.0);

    let points_value_per_day = safe_div(points_per_day * fdv, sanitize(program.total_supply));
    let user_daily_value = deposit / tvl * points_value_per_day;
    let apr = user_daily_value * 365.0 / deposit * 100.0;

    BonusEstimate {
        points_value_per_day,
        user_daily_value,
        apr,
        yearly_bonus: deposit * apr / 100.0,
    }
}
