//! Report generator - one fetch pass written out as a CSV report
//!
//! Run with: cargo run --bin generate-report -- [--output FILE] [--live-reference-tvl]

use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fdv_dashboard::config::Config;
use fdv_dashboard::market::{gather, LiveMarket, ReferenceTvlMode};
use fdv_dashboard::report::format::format_currency;
use fdv_dashboard::report::AllocationReport;
use fdv_dashboard::valuation::ValuationSet;

#[derive(Parser)]
#[command(name = "generate-report")]
#[command(version = "0.1.0")]
#[command(about = "Write the allocation valuation report as CSV", long_about = None)]
struct Cli {
    /// Output file (defaults to REPORT_OUTPUT_PATH)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use live Arma + Pulse figures instead of the fixed reference TVL
    #[arg(long)]
    live_reference_tvl: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fdv_dashboard=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate()?;
    let program = config.program()?;
    let output = cli.output.unwrap_or_else(|| config.report_output_path.clone());

    let mode = if cli.live_reference_tvl {
        ReferenceTvlMode::Live
    } else {
        ReferenceTvlMode::Fixed
    };

    println!("{}", style("🚀 Generating allocation report...").cyan().bold());

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message("Fetching market data from CoinGecko, DefiLlama and Ethereum...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let market = LiveMarket::from_config(&config)?;
    let snapshot = gather(
        &market,
        &config.reference_tokens,
        mode,
        config.reference_tvl_fallback,
    )
    .await;

    spinner.finish_and_clear();

    let set = ValuationSet::from_snapshot(&program, &snapshot);
    let report = AllocationReport::build(&program, &snapshot, &set, Utc::now());
    report.write_to(&output)?;

    println!(
        "{} {}",
        style("✅ Report written to").green().bold(),
        output.display()
    );
    println!();
    println!("{}", style("📊 Summary").bold());

    for slot in &snapshot.tokens {
        let status = if slot.snapshot.is_success() {
            style("✓").green()
        } else {
            style("✗").red()
        };
        let total = set
            .reference(&slot.reference.label)
            .map(|v| v.total_allocation_value)
            .unwrap_or(0.0);
        println!(
            "  {} {} FDV: {} → total allocation {}",
            status,
            slot.reference.label,
            format_currency(slot.fdv()),
            format_currency(total)
        );
    }
    println!(
        "  • {} TVL: {}",
        program.project_name,
        format_currency(snapshot.project_tvl.total)
    );
    println!(
        "  • {} TVL: {}{}",
        set.tvl_basis,
        format_currency(snapshot.reference_tvl.total),
        if snapshot.reference_tvl.is_fallback { " (fixed)" } else { "" }
    );
    println!("  • TVL Ratio: {:.4}", set.tvl.ratio.value());

    if !snapshot.all_tokens_fetched() {
        println!();
        println!(
            "{}",
            style("⚠️  Some token data could not be fetched; affected rows read 0").yellow()
        );
    }

    Ok(())
}
