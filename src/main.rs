use analytics::PerformanceReport;
use anyhow::Context;
use backtester::{BacktestResult, Backtester};
use clap::{Args, Parser, Subcommand};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use configuration::{CliOverrides, Config, init_logging, load_config, load_config_from};
use core_types::{MarketSnapshot, RotationSignal};
use detector::{MarketSummary, RotationDetector, classify, read_table, snapshots_from_frame, summarize};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

/// The main entry point for the Tierwatch application.
fn main() -> anyhow::Result<()> {
    // Settings may come from a .env file; its absence is fine.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => load_config_from(Some(path)),
        None => load_config(),
    }
    .context("failed to load configuration")?;
    let overrides = match &cli.command {
        Commands::Detect(args) => &args.input.overrides,
        Commands::Backtest(args) => &args.input.overrides,
    };
    let config = overrides.apply(&config);
    config
        .validate()
        .context("invalid configuration after command-line overrides")?;

    let _log_guard = init_logging(&config.logging).context("failed to initialise logging")?;

    // Execute the appropriate command
    match cli.command {
        Commands::Detect(args) => handle_detect(args, &config),
        Commands::Backtest(args) => handle_backtest(args, &config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Detects capital rotation between market-cap tiers and backtests trading on it.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file to use instead of ./config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify tiers and print the rotation signals found in a market data file.
    Detect(DetectArgs),
    /// Generate signals and replay them through the backtest simulation.
    Backtest(BacktestArgs),
}

#[derive(Args)]
struct InputArgs {
    /// Market snapshot table (.csv or .parquet).
    #[arg(long)]
    data: PathBuf,

    #[command(flatten)]
    overrides: CliOverrides,
}

#[derive(Args)]
struct DetectArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Print the signals as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct BacktestArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Write the full backtest result (metrics and trades) to this JSON file.
    #[arg(long)]
    output: Option<PathBuf>,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn handle_detect(args: DetectArgs, config: &Config) -> anyhow::Result<()> {
    let snapshots = load_snapshots(&args.input.data)?;
    let signals = generate_signals(&snapshots, config)?;
    let summary = summarize(&snapshots)?;
    tracing::info!(
        assets = summary.assets,
        timestamps = summary.timestamps,
        first = %summary.first_timestamp,
        last = %summary.last_timestamp,
        "market data summary"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&signals)?);
    } else {
        println!("{}", market_table(&summary));
        println!("{}", signal_table(&signals));
    }
    Ok(())
}

fn handle_backtest(args: BacktestArgs, config: &Config) -> anyhow::Result<()> {
    let snapshots = load_snapshots(&args.input.data)?;
    let signals = generate_signals(&snapshots, config)?;

    let mut backtester = Backtester::from_config(config)?;
    let result = backtester
        .run_backtest(&snapshots, &signals)
        .context("backtest failed")?;

    match &result.metrics {
        Some(report) => {
            println!("{}", summary_table(report));
            println!("{}", tier_table(report));
        }
        None => println!("No trades were taken; final capital {}", result.final_capital),
    }

    if let Some(path) = &args.output {
        write_result(path, &result)?;
        println!("Backtest result written to {}", path.display());
    }
    Ok(())
}

/// Reads the table and makes sure every row carries a tier.
fn load_snapshots(path: &Path) -> anyhow::Result<Vec<MarketSnapshot>> {
    let df = read_table(path).with_context(|| format!("failed to read {}", path.display()))?;
    let snapshots = snapshots_from_frame(&df).context("invalid market data table")?;

    if snapshots.iter().all(|s| s.tier.is_some()) {
        tracing::info!(rows = snapshots.len(), "using tiers from the input table");
        return Ok(snapshots);
    }
    Ok(classify(&snapshots)?)
}

fn generate_signals(snapshots: &[MarketSnapshot], config: &Config) -> anyhow::Result<Vec<RotationSignal>> {
    let detector = RotationDetector::new(config.analysis.clone())?;
    Ok(detector.generate_rotation_signals(snapshots)?)
}

fn write_result(path: &Path, result: &BacktestResult) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ==============================================================================
// Output Tables
// ==============================================================================

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn market_table(summary: &MarketSummary) -> Table {
    let mut table = new_table(vec!["Tier", "Rows", "Market cap", "Volume"]);
    for totals in &summary.tiers {
        table.add_row(vec![
            totals.tier.to_string(),
            totals.rows.to_string(),
            totals.market_cap.round_dp(2).to_string(),
            totals.volume.round_dp(2).to_string(),
        ]);
    }
    table.add_row(vec![
        "All".to_string(),
        summary.rows.to_string(),
        summary.total_market_cap.round_dp(2).to_string(),
        summary.total_volume.round_dp(2).to_string(),
    ]);
    table
}

fn signal_table(signals: &[RotationSignal]) -> Table {
    let mut table = new_table(vec![
        "Timestamp",
        "From",
        "To",
        "Confidence",
        "Volume",
        "Correlation",
        "Rel. Strength",
    ]);
    for signal in signals {
        table.add_row(vec![
            signal.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            signal.from_tier.to_string(),
            signal.to_tier.to_string(),
            signal.confidence.round_dp(4).to_string(),
            format!("{:.4}", signal.metrics.volume_factor),
            format!("{:.4}", signal.metrics.correlation),
            format!("{:.4}", signal.metrics.relative_strength),
        ]);
    }
    table
}

fn summary_table(report: &PerformanceReport) -> Table {
    let mut table = new_table(vec!["Metric", "Value"]);
    let pct = |value: Decimal| format!("{}%", (value * Decimal::ONE_HUNDRED).round_dp(2));
    table
        .add_row(vec!["Total trades".to_string(), report.total_trades.to_string()])
        .add_row(vec!["Winning trades".to_string(), report.winning_trades.to_string()])
        .add_row(vec!["Win rate".to_string(), pct(report.win_rate)])
        .add_row(vec!["Average return".to_string(), pct(report.average_return)])
        .add_row(vec!["Return std".to_string(), pct(report.return_std)])
        .add_row(vec!["Sharpe ratio".to_string(), report.sharpe_ratio.round_dp(4).to_string()])
        .add_row(vec!["Worst trade".to_string(), pct(report.max_drawdown)])
        .add_row(vec!["Final capital".to_string(), report.final_capital.round_dp(2).to_string()])
        .add_row(vec!["Total return".to_string(), pct(report.total_return)]);
    table
}

fn tier_table(report: &PerformanceReport) -> Table {
    let mut table = new_table(vec!["Tier", "Trades", "Mean return"]);
    for tier in &report.tiers {
        let mean = tier
            .mean_return
            .map(|r| format!("{}%", (r * Decimal::ONE_HUNDRED).round_dp(2)))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![tier.tier.to_string(), tier.trades.to_string(), mean]);
    }
    table
}
