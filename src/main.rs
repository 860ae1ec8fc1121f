//! FDV Dashboard - API server
//!
//! Run with: cargo run
//!
//! Serves the valuation API, proxies the reference-protocol stats endpoints
//! and hosts the built single-page app.

use color_eyre::eyre::Result;
use console::style;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fdv_dashboard::config::Config;
use fdv_dashboard::market::{LiveMarket, MarketSource};
use fdv_dashboard::server::{router, AppState};

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 📊 FDV DASHBOARD - Allocation Valuation Server").cyan().bold()
    );
    println!(
        "{}",
        style("    Reference FDVs | TVL Ratio | Bonus APR").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("fdv_dashboard=info".parse()?),
        )
        .init();

    print_banner();

    // Load configuration
    let config = Config::from_env()?;

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        error!("Please check your .env file");
        return Err(e);
    }

    let program = config.program()?;

    // Print configuration summary
    config.print_summary();
    println!();

    let market = LiveMarket::from_config(&config)?;
    let http_client = market.http_client().clone();
    let market: Arc<dyn MarketSource> = Arc::new(market);

    let port = config.port;
    let environment = config.environment.to_string();

    let state = Arc::new(AppState {
        config,
        program,
        market,
        http_client,
    });
    let app = router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🚀 Server running on port {}", port);
    info!("📊 Arma API proxy available at: http://localhost:{}/api/arma/stats", port);
    info!("🏥 Health check available at: http://localhost:{}/api/health", port);
    info!("🌍 Environment: {}", environment);

    axum::serve(listener, app).await?;

    Ok(())
}
