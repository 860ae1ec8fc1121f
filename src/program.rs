//! Allocation program definitions
//!
//! Static description of the token-distribution program being valued:
//! - Fixed total issuance
//! - A single flat percentage carve-out (the "CSNapper" allocation)
//! - A point program with ordered phases
//!
//! The defaults describe the Almanak program. A different program can be
//! loaded from a TOML file (see `AllocationProgramConfig::from_file`).

use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================
// DEFAULT PROGRAM CONSTANTS
// ============================================

/// 1 billion tokens
pub const DEFAULT_TOTAL_SUPPLY: f64 = 1_000_000_000.0;

/// 0.5% of supply (5 million tokens)
pub const DEFAULT_FLAT_ALLOCATION_PERCENT: f64 = 0.5;

/// 0.048333% of supply
pub const DEFAULT_POINT_PROGRAM_PERCENT: f64 = 0.048333;

// ============================================
// PHASES
// ============================================

/// One time-boxed phase of the point program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    /// Display name ("Phase 1")
    pub name: String,

    /// Points distributed per day while the phase runs
    pub points_per_day: f64,

    /// Points distributed over the whole phase
    pub total_points: f64,
}

impl Phase {
    pub fn new(name: impl Into<String>, points_per_day: f64, total_points: f64) -> Self {
        Self {
            name: name.into(),
            points_per_day,
            total_points,
        }
    }
}

pub fn default_phases() -> Vec<Phase> {
    vec![
        Phase::new("Phase 1", 150_000.0, 4_650_000.0),
        Phase::new("Phase 2", 333_333.0, 12_987_000.0),
    ]
}

// ============================================
// PROGRAM CONFIG
// ============================================

/// Immutable constants describing the distribution program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationProgramConfig {
    /// Name of the token being valued ("Almanak")
    pub project_name: String,

    /// Label of the flat carve-out ("CSNapper")
    pub flat_allocation_label: String,

    /// Fixed total issuance
    pub total_supply: f64,

    /// Flat carve-out, in percent of total supply
    pub flat_allocation_percent: f64,

    /// Point program share, in percent of total supply
    pub point_program_percent: f64,

    /// Ordered point program phases
    pub phases: Vec<Phase>,
}

impl Default for AllocationProgramConfig {
    fn default() -> Self {
        Self {
            project_name: "Almanak".to_string(),
            flat_allocation_label: "CSNapper".to_string(),
            total_supply: DEFAULT_TOTAL_SUPPLY,
            flat_allocation_percent: DEFAULT_FLAT_ALLOCATION_PERCENT,
            point_program_percent: DEFAULT_POINT_PROGRAM_PERCENT,
            phases: default_phases(),
        }
    }
}

impl AllocationProgramConfig {
    /// Load a program from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let program: Self = toml::from_str(&content)?;
        program.validate()?;
        Ok(program)
    }

    /// Save the program to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject programs the formulas cannot give meaning to
    pub fn validate(&self) -> Result<()> {
        if !self.total_supply.is_finite() || self.total_supply <= 0.0 {
            return Err(eyre!(
                "total_supply must be a positive number (currently {})",
                self.total_supply
            ));
        }

        for (label, pct) in [
            ("flat_allocation_percent", self.flat_allocation_percent),
            ("point_program_percent", self.point_program_percent),
        ] {
            if !pct.is_finite() || !(0.0..=100.0).contains(&pct) {
                return Err(eyre!("{} must be within 0-100 (currently {})", label, pct));
            }
        }

        for phase in &self.phases {
            if !phase.total_points.is_finite() || phase.total_points < 0.0 {
                return Err(eyre!("{} has invalid total_points", phase.name));
            }
            if !phase.points_per_day.is_finite() || phase.points_per_day < 0.0 {
                return Err(eyre!("{} has invalid points_per_day", phase.name));
            }
        }

        Ok(())
    }

    /// Tokens reserved by the flat carve-out
    pub fn flat_allocation_tokens(&self) -> f64 {
        self.total_supply * self.flat_allocation_percent / 100.0
    }

    /// Tokens reserved for the point program
    pub fn point_program_tokens(&self) -> f64 {
        self.total_supply * self.point_program_percent / 100.0
    }

    /// The phase whose daily emission drives the bonus calculator (the latest one)
    pub fn bonus_phase(&self) -> Option<&Phase> {
        self.phases.last()
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_program() {
        let program = AllocationProgramConfig::default();
        assert_eq!(program.total_supply, 1_000_000_000.0);
        assert_eq!(program.phases.len(), 2);
        assert_eq!(program.flat_allocation_tokens(), 5_000_000.0);
        assert!((program.point_program_tokens() - 483_330.0).abs() < 1e-6);
        assert!(program.validate().is_ok());
    }

    #[test]
    fn test_bonus_phase_is_last() {
        let program = AllocationProgramConfig::default();
        assert_eq!(program.bonus_phase().map(|p| p.points_per_day), Some(333_333.0));
    }

    #[test]
    fn test_validate_rejects_zero_supply() {
        let program = AllocationProgramConfig {
            total_supply: 0.0,
            ..Default::default()
        };
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_percent() {
        let program = AllocationProgramConfig {
            flat_allocation_percent: 150.0,
            ..Default::default()
        };
        assert!(program.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let path = std::env::temp_dir().join(format!("fdv_program_{}.toml", std::process::id()));
        let program = AllocationProgramConfig {
            project_name: "Testnet".to_string(),
            phases: vec![Phase::new("Season 1", 10.0, 310.0)],
            ..Default::default()
        };
        program.save_to_file(&path).unwrap();
        let loaded = AllocationProgramConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, program);
    }

    #[test]
    fn test_from_file_rejects_invalid_program() {
        let path = std::env::temp_dir().join(format!("fdv_bad_program_{}.toml", std::process::id()));
        let program = AllocationProgramConfig {
            total_supply: 0.0,
            ..Default::default()
        };
        program.save_to_file(&path).unwrap();
        let loaded = AllocationProgramConfig::from_file(&path);
        std::fs::remove_file(&path).ok();
        assert!(loaded.is_err());
    }
}
