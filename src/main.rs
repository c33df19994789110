//! Signal-driven futures trading bot entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use futures_signal_trader::api::{create_router, AppState};
use futures_signal_trader::config::Config;
use futures_signal_trader::feed::{MarketDataFeed, PriceFeed};
use futures_signal_trader::gateway::{BinanceFuturesGateway, ExchangeGateway, ResilientInvoker};
use futures_signal_trader::metrics;
use futures_signal_trader::signal::signal_channel;
use futures_signal_trader::trading::{Position, PositionEngine};

/// Signal-driven leveraged futures trading bot.
#[derive(Parser, Debug)]
#[command(name = "futures-signal-trader")]
#[command(about = "Holds one directional futures position per external signal")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the trading bot (default).
    Run,

    /// Check configuration validity.
    CheckConfig,

    /// Check exchange connectivity and wallet balance.
    CheckBalance,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("futures_signal_trader=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Initialize metrics
    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::CheckBalance) => cmd_check_balance().await,
        Some(Command::Run) | None => cmd_run().await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("FUTURES SIGNAL TRADER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Symbol: {}", config.symbol);
    println!("  Leverage: {}x", config.leverage);
    println!("  Long stop-loss: {}%", config.long_stoploss_pct);
    match &config.long_takeprofit_pct {
        Some(pct) => println!("  Long take-profit: {}%", pct),
        None => println!("  Long take-profit: disabled"),
    }
    println!("  Short stop-loss: {}%", config.short_stoploss_pct);
    match &config.short_takeprofit_pct {
        Some(pct) => println!("  Short take-profit: {}%", pct),
        None => println!("  Short take-profit: disabled"),
    }
    println!("  Safety factor: {}", config.safety_factor);
    println!("  Monitor poll: {}ms", config.monitor_poll_ms);
    println!("  REST URL: {}", config.rest_url);
    println!("  WS URL: {}", config.ws_url);
    println!("  Server port: {}", config.port);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check exchange connectivity and wallet balance.
async fn cmd_check_balance() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("FUTURES SIGNAL TRADER - BALANCE CHECK");
    println!("======================================================================");

    let config = Config::load()?;
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    println!("Host: {}", config.rest_url);
    println!("Symbol: {}", config.symbol);
    println!("API Key: present");
    println!("======================================================================");

    print!("\n1. Creating gateway... ");
    let gateway = BinanceFuturesGateway::new(&config);
    println!("OK");

    print!("\n2. Syncing server time... ");
    match gateway.reconnect().await {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    print!("\n3. Getting wallet balance... ");
    match gateway.account_balance().await {
        Ok(balance) => {
            println!("OK");
            println!("   USDT Balance: {}", balance);
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n======================================================================");
    println!("BALANCE CHECK COMPLETED");
    println!("======================================================================");

    Ok(())
}

/// Run the trading bot.
async fn cmd_run() -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Symbol: {}", config.symbol);
    info!("Leverage: {}x", config.leverage);
    info!(
        "Long stop-loss: {}% / take-profit: {:?}",
        config.long_stoploss_pct, config.long_takeprofit_pct
    );
    info!(
        "Short stop-loss: {}% / take-profit: {:?}",
        config.short_stoploss_pct, config.short_takeprofit_pct
    );

    // Shared position cell and signal queue
    let position = Arc::new(Mutex::new(Position::flat()));
    let (signal_tx, signal_rx) = signal_channel();

    // Create app state
    let app_state = AppState::new(config.symbol.clone(), Arc::clone(&position), signal_tx);

    // Prometheus exporter
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone()).route(
        "/metrics",
        get(move || {
            let handle = metrics_handle.clone();
            async move { handle.render() }
        }),
    );

    // Spawn HTTP server
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Start the market data feed
    let feed = PriceFeed::new();
    let market_data = Arc::new(MarketDataFeed::new(
        config.ws_url.clone(),
        config.symbol.clone(),
        feed.clone(),
    ));
    tokio::spawn(Arc::clone(&market_data).run_with_reconnect());

    // Create the gateway and engine
    let gateway = Arc::new(BinanceFuturesGateway::new(&config));
    let invoker = ResilientInvoker::new(gateway);
    let engine = PositionEngine::new(&config, invoker, feed, position);

    info!("========================================");
    info!("FUTURES SIGNAL TRADER STARTED");
    info!("========================================");

    // Wait for the first tick, log the balance, apply leverage
    engine.startup().await;
    app_state.set_ready(true);
    info!("Startup complete, consuming signals");

    tokio::select! {
        _ = engine.run(signal_rx) => {
            info!("Engine stopped");
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, exiting");
        }
    }

    Ok(())
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .unwrap_or_else(|e| error!("Failed to install Ctrl-C handler: {}", e));
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
