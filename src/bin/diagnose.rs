//! Diagnostic tool - Check configuration and allocation program
//!
//! Run with: cargo run --bin diagnose

use std::env;

use fdv_dashboard::config::{
    Config, DEFAULT_ARMA_STATS_URL, DEFAULT_COINGECKO_API_URL, DEFAULT_DEFILLAMA_API_URL,
    DEFAULT_REFERENCE_TOKENS, DEFAULT_RPC_URL,
};
use fdv_dashboard::valuation::compute_valuation;

fn shorten(url: &str) -> String {
    if url.chars().count() > 50 {
        let head: String = url.chars().take(30).collect();
        let tail: String = url.chars().rev().take(15).collect::<Vec<_>>().into_iter().rev().collect();
        format!("{}...{}", head, tail)
    } else {
        url.to_string()
    }
}

fn main() {
    println!("🔍 FDV DASHBOARD DIAGNOSTIC CHECK\n");

    // Load .env
    dotenvy::dotenv().ok();

    println!("═══════════════════════════════════════════════════");
    println!("                  CONFIGURATION                     ");
    println!("═══════════════════════════════════════════════════\n");

    let checks = [
        ("PORT", "3001", "Server port"),
        ("APP_ENV", "development", "Environment (NODE_ENV also accepted)"),
        ("STATIC_DIR", "build", "Built single-page app"),
        ("COINGECKO_API_URL", DEFAULT_COINGECKO_API_URL, "Token snapshots and ETH price"),
        ("DEFILLAMA_API_URL", DEFAULT_DEFILLAMA_API_URL, "Project TVL"),
        ("RPC_URL", DEFAULT_RPC_URL, "Treasury USDC balance"),
        ("ARMA_STATS_URL", DEFAULT_ARMA_STATS_URL, "Reference TVL (Arma)"),
        ("REFERENCE_TOKENS", DEFAULT_REFERENCE_TOKENS, "Reference tokens, id:Label"),
        ("HTTP_TIMEOUT_SECS", "10", "Client timeout for every upstream"),
    ];

    for (key, default, desc) in checks {
        let value = env::var(key).unwrap_or_else(|_| default.to_string());
        let is_default = env::var(key).is_err();
        let marker = if is_default { "(default)" } else { "(from .env)" };
        println!("  {}: {} {}", key, shorten(&value), marker);
        println!("    └─ {}\n", desc);
    }

    let pulse = env::var("PULSE_STATS_URL").is_ok();
    let program_file = env::var("PROGRAM_CONFIG").ok();

    println!("═══════════════════════════════════════════════════");
    println!("                 OPTIONAL SOURCES                   ");
    println!("═══════════════════════════════════════════════════\n");

    println!("  PULSE_STATS_URL: {}", if pulse { "✅ Set" } else { "❌ Not set (Pulse TVL reads 0)" });
    println!(
        "  PROGRAM_CONFIG:  {}",
        program_file.as_deref().unwrap_or("built-in program")
    );

    println!("\n═══════════════════════════════════════════════════");
    println!("                     STATUS                         ");
    println!("═══════════════════════════════════════════════════\n");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("  ❌ Failed to load configuration: {}", e);
            return;
        }
    };

    match config.validate() {
        Ok(()) => println!("  ✅ Configuration valid"),
        Err(e) => println!("  ❌ {}", e),
    }

    let program = match config.program() {
        Ok(program) => program,
        Err(e) => {
            println!("  ❌ {}", e);
            return;
        }
    };
    println!("  ✅ Allocation program loaded: {}", program.project_name);
    println!("     → Total supply: {}", program.total_supply);
    println!(
        "     → {}: {}% | Point program: {}%",
        program.flat_allocation_label, program.flat_allocation_percent, program.point_program_percent
    );
    for phase in &program.phases {
        println!(
            "     → {}: {} points/day, {} total",
            phase.name, phase.points_per_day, phase.total_points
        );
    }

    println!("\n═══════════════════════════════════════════════════");
    println!("                  WHAT TO EXPECT                    ");
    println!("═══════════════════════════════════════════════════\n");

    // $1B reference FDV as a sanity point
    let sample = compute_valuation(1_000_000_000.0, &program);
    println!("  At a $1B reference FDV:");
    println!("  • Token price: ${:.4}", sample.implied_token_price);
    println!("  • {} value: ${:.2}", program.flat_allocation_label, sample.flat_allocation_value);
    println!("  • Total allocation value: ${:.2}", sample.total_allocation_value);

    if !pulse {
        println!(
            "\n  ⚠️  Without Pulse, live reference TVL is Arma only; falls back to ${:.0}",
            config.reference_tvl_fallback
        );
    }

    println!("\n✅ Diagnostic complete!\n");
}
