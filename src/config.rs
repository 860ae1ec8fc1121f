//! Runtime configuration for the dashboard server and report generator
//!
//! Everything upstream-facing (API base URLs, RPC, addresses) is explicit
//! configuration injected at startup. Nothing branches on the environment
//! name except what the server reports and how much error detail it returns.

use eyre::{eyre, Result};
use std::env;
use std::fmt;
use std::path::PathBuf;

use crate::market::ReferenceToken;
use crate::program::AllocationProgramConfig;

// ============================================
// DEFAULTS
// ============================================

pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_DEFILLAMA_API_URL: &str = "https://api.llama.fi";
pub const DEFAULT_RPC_URL: &str = "https://eth.llamarpc.com";
pub const DEFAULT_ARMA_STATS_URL: &str = "https://api.arma.xyz/api/v1/8453/stats";
pub const DEFAULT_TREASURY_ADDRESS: &str = "0x6402D60bEE5e67226F19CFD08A1734586e6c3954";
pub const DEFAULT_REFERENCE_TOKENS: &str = "giza:Giza,newton-protocol:Newton";

/// Reference TVL used when the live figure is unavailable
pub const DEFAULT_REFERENCE_TVL: f64 = 16_389_772.0;

pub const DEFAULT_REPORT_OUTPUT_PATH: &str = "almanak_live_data.csv";

// ============================================
// ENVIRONMENT
// ============================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
    Other(String),
}

impl Environment {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "development" | "dev" => Environment::Development,
            "production" | "prod" => Environment::Production,
            other => Environment::Other(other.to_string()),
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
            Environment::Other(name) => write!(f, "{}", name),
        }
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

#[derive(Debug, Clone)]
pub struct Config {
    // ========== Server ==========
    pub port: u16,
    pub environment: Environment,

    /// Built single-page app; `index.html` inside is the routing fallback
    pub static_dir: PathBuf,

    // ========== Upstreams ==========
    pub coingecko_api_url: String,
    pub defillama_api_url: String,
    pub rpc_url: String,
    pub arma_stats_url: String,

    /// Pulse has no public default; unset means the Pulse component reads 0
    pub pulse_stats_url: Option<String>,

    pub http_timeout_secs: u64,

    // ========== Project ==========
    /// DefiLlama protocol slug of the project
    pub project_tvl_slug: String,

    /// Address whose on-chain USDC balance counts toward project TVL
    pub treasury_address: String,

    /// Tokens whose FDV the project is valued at, in report order
    pub reference_tokens: Vec<ReferenceToken>,

    pub reference_tvl_fallback: f64,

    /// Optional TOML file describing the allocation program
    pub program_path: Option<PathBuf>,

    // ========== Report ==========
    pub report_output_path: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

pub fn parse_reference_tokens(list: &str) -> Vec<ReferenceToken> {
    list.split(',').filter_map(ReferenceToken::parse).collect()
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = env::var("APP_ENV")
            .or_else(|_| env::var("NODE_ENV"))
            .map(|name| Environment::parse(&name))
            .unwrap_or_default();

        Ok(Self {
            // Server
            port: env_parse("PORT", DEFAULT_PORT),
            environment,
            static_dir: PathBuf::from(env_or("STATIC_DIR", "build")),

            // Upstreams
            coingecko_api_url: env_or("COINGECKO_API_URL", DEFAULT_COINGECKO_API_URL),
            defillama_api_url: env_or("DEFILLAMA_API_URL", DEFAULT_DEFILLAMA_API_URL),
            rpc_url: env_or("RPC_URL", DEFAULT_RPC_URL),
            arma_stats_url: env_or("ARMA_STATS_URL", DEFAULT_ARMA_STATS_URL),
            pulse_stats_url: env::var("PULSE_STATS_URL").ok().filter(|s| !s.trim().is_empty()),
            http_timeout_secs: env_parse("HTTP_TIMEOUT_SECS", 10),

            // Project
            project_tvl_slug: env_or("PROJECT_TVL_SLUG", "almanak"),
            treasury_address: env_or("TREASURY_ADDRESS", DEFAULT_TREASURY_ADDRESS),
            reference_tokens: parse_reference_tokens(&env_or(
                "REFERENCE_TOKENS",
                DEFAULT_REFERENCE_TOKENS,
            )),
            reference_tvl_fallback: env_parse("REFERENCE_TVL_FALLBACK", DEFAULT_REFERENCE_TVL),
            program_path: env::var("PROGRAM_CONFIG").ok().map(PathBuf::from),

            // Report
            report_output_path: PathBuf::from(env_or(
                "REPORT_OUTPUT_PATH",
                DEFAULT_REPORT_OUTPUT_PATH,
            )),
        })
    }

    /// The allocation program: from `PROGRAM_CONFIG` if set, else the built-in one
    pub fn program(&self) -> Result<AllocationProgramConfig> {
        match &self.program_path {
            Some(path) => AllocationProgramConfig::from_file(path)
                .map_err(|e| eyre!("Failed to load program from {}: {}", path.display(), e)),
            None => Ok(AllocationProgramConfig::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.reference_tokens.is_empty() {
            return Err(eyre!("REFERENCE_TOKENS must name at least one CoinGecko coin id"));
        }

        for (key, url) in [
            ("COINGECKO_API_URL", &self.coingecko_api_url),
            ("DEFILLAMA_API_URL", &self.defillama_api_url),
            ("RPC_URL", &self.rpc_url),
            ("ARMA_STATS_URL", &self.arma_stats_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(eyre!("{} must be an http(s) URL (currently {:?})", key, url));
            }
        }

        if !self.reference_tvl_fallback.is_finite() || self.reference_tvl_fallback < 0.0 {
            return Err(eyre!(
                "REFERENCE_TVL_FALLBACK must be a non-negative number (currently {})",
                self.reference_tvl_fallback
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(eyre!("HTTP_TIMEOUT_SECS must be at least 1"));
        }

        Ok(())
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let tokens = self
            .reference_tokens
            .iter()
            .map(|t| t.label.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              FDV DASHBOARD - CONFIGURATION                 ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Environment:       {:^40} ║", self.environment);
        println!("║ Port:              {:^40} ║", self.port);
        println!("║ Static Dir:        {:^40} ║", self.static_dir.display());
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ VALUATION                                                  ║");
        println!("║ • Reference Tokens: {:^39} ║", tokens);
        println!("║ • Project TVL Slug: {:^39} ║", self.project_tvl_slug);
        println!("║ • Fallback Ref TVL: ${:<38.0} ║", self.reference_tvl_fallback);
        println!("║ • Program File:    {:^40} ║",
            match &self.program_path {
                Some(path) => path.display().to_string(),
                None => "built-in".to_string(),
            }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ UPSTREAMS                                                  ║");
        println!("║ • Pulse Stats:     {:^40} ║",
            if self.pulse_stats_url.is_some() { "✓ Configured" } else { "✗ Not Set" }
        );
        println!("║ • HTTP Timeout:    {:>38}s ║", self.http_timeout_secs);
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            environment: Environment::Development,
            static_dir: PathBuf::from("build"),
            coingecko_api_url: DEFAULT_COINGECKO_API_URL.to_string(),
            defillama_api_url: DEFAULT_DEFILLAMA_API_URL.to_string(),
            rpc_url: DEFAULT_RPC_URL.to_string(),
            arma_stats_url: DEFAULT_ARMA_STATS_URL.to_string(),
            pulse_stats_url: None,
            http_timeout_secs: 10,
            project_tvl_slug: "almanak".to_string(),
            treasury_address: DEFAULT_TREASURY_ADDRESS.to_string(),
            reference_tokens: parse_reference_tokens(DEFAULT_REFERENCE_TOKENS),
            reference_tvl_fallback: DEFAULT_REFERENCE_TVL,
            program_path: None,
            report_output_path: PathBuf::from(DEFAULT_REPORT_OUTPUT_PATH),
        }
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3001);
        assert_eq!(config.reference_tokens.len(), 2);
        assert_eq!(config.reference_tokens[0].label, "Giza");
        assert_eq!(config.reference_tokens[1].id, "newton-protocol");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(""), Environment::Development);
        assert_eq!(Environment::parse("Staging").to_string(), "staging");
        assert!(!Environment::parse("staging").is_production());
    }

    #[test]
    fn test_default_environment_is_development() {
        assert_eq!(Environment::default(), Environment::Development);
        assert_eq!(Config::default().environment, Environment::Development);
    }

    #[test]
    fn test_validate_rejects_empty_references() {
        let config = Config {
            reference_tokens: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config {
            rpc_url: "eth.llamarpc.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_builtin_program() {
        let program = Config::default().program().unwrap();
        assert_eq!(program, AllocationProgramConfig::default());
    }
}
