//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use chrono::DateTime;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{cross_tasks, load_candles, run_backtests, BacktestOutcome};
use crate::domain::config_validation::validate_config;
use crate::domain::error::TraderError;
use crate::domain::strategy::{SimulationConfig, StrategyConfig};
use crate::ports::data_port::CandleSource;

#[derive(Parser, Debug)]
#[command(name = "scalptrader", about = "Leveraged scalping engine for perpetual futures")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replay historical candles through one or more strategies
    Backtest {
        /// Strategy config; repeat to compare strategies. The first file
        /// also supplies the [simulation] section.
        #[arg(short, long, required = true)]
        config: Vec<PathBuf>,
        /// Directory holding one `{symbol}.csv` per symbol
        #[arg(short, long)]
        data: PathBuf,
        /// Comma-separated symbols; defaults to every CSV in --data
        #[arg(long)]
        symbols: Option<String>,
        /// Start of the replay, epoch ms or RFC 3339
        #[arg(long)]
        start: Option<String>,
        /// End of the replay, epoch ms or RFC 3339
        #[arg(long)]
        end: Option<String>,
        /// Print results as JSON instead of a summary
        #[arg(long)]
        json: bool,
        /// Write the JSON results to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a strategy configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List the symbols available in a data directory
    ListSymbols {
        #[arg(short, long)]
        data: PathBuf,
    },
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // a second call (tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    init_tracing();
    let result = match cli.command {
        Command::Backtest {
            config,
            data,
            symbols,
            start,
            end,
            json,
            output,
        } => run_backtest(
            &config,
            &data,
            symbols.as_deref(),
            start.as_deref(),
            end.as_deref(),
            json,
            output.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data } => run_list_symbols(&data),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}

/// Parses `--start` / `--end`: epoch milliseconds or RFC 3339.
pub fn parse_time_bound(flag: &str, raw: &str) -> Result<i64, TraderError> {
    if let Ok(ms) = raw.trim().parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| TraderError::invalid("cli", flag, format!("'{raw}': {e}")))
}

pub fn resolve_symbols(symbols: Option<&str>, source: &dyn CandleSource) -> Result<Vec<String>, TraderError> {
    let symbols: Vec<String> = match symbols {
        Some(list) => list
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        None => source.list_symbols()?,
    };
    if symbols.is_empty() {
        return Err(TraderError::missing("cli", "symbols"));
    }
    Ok(symbols)
}

fn strategy_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn run_backtest(
    config_paths: &[PathBuf],
    data_dir: &Path,
    symbols: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    json: bool,
    output: Option<&Path>,
) -> Result<(), TraderError> {
    // Stage 1: load and validate every strategy
    let mut strategies: Vec<(String, StrategyConfig)> = Vec::new();
    let mut simulation: Option<SimulationConfig> = None;
    for path in config_paths {
        eprintln!("Loading config from {}", path.display());
        let adapter = FileConfigAdapter::from_file(path)?;
        let strategy = StrategyConfig::from_port(&adapter)?;
        if simulation.is_none() {
            simulation = Some(SimulationConfig::from_port(&adapter)?);
        }
        strategies.push((strategy_name(path), strategy));
    }
    let simulation = simulation.ok_or_else(|| TraderError::missing("cli", "config"))?;

    // Stage 2: resolve the replay range and symbols
    let start_ms = start.map(|s| parse_time_bound("start", s)).transpose()?.unwrap_or(i64::MIN);
    let end_ms = end.map(|s| parse_time_bound("end", s)).transpose()?.unwrap_or(i64::MAX);
    if start_ms > end_ms {
        return Err(TraderError::invalid("cli", "start", "start is after end"));
    }

    let source = CsvAdapter::new(data_dir.to_path_buf());
    let symbols = resolve_symbols(symbols, &source)?;

    // Stage 3: load candles once, shared read-only by every task
    eprintln!("Loading candles for {} symbols...", symbols.len());
    let data = Arc::new(load_candles(&source, &symbols, start_ms, end_ms)?);

    // Stage 4: run
    let tasks = cross_tasks(&strategies, &symbols);
    eprintln!("Running {} backtests...", tasks.len());
    let outcomes = run_backtests(&tasks, &simulation, data)?;

    // Stage 5: report
    if json || output.is_some() {
        let body = serde_json::to_string_pretty(&outcomes).map_err(|e| TraderError::InvalidData {
            symbol: "*".into(),
            reason: format!("failed to serialize results: {e}"),
        })?;
        if let Some(path) = output {
            fs::write(path, &body)?;
            eprintln!("Results written to {}", path.display());
        }
        if json {
            println!("{body}");
        }
    }
    if !json {
        for outcome in &outcomes {
            print_summary(outcome);
        }
    }
    Ok(())
}

fn print_summary(outcome: &BacktestOutcome) {
    let m = &outcome.result.metrics;
    println!("== {} / {} ==", outcome.name, outcome.symbol);
    println!("  Capital:        {:.2} -> {:.2}", m.initial_capital, m.final_capital);
    println!("  Total PnL:      {:.4} ({:.2}%)", m.total_pnl, m.total_roi * 100.0);
    println!(
        "  Trades:         {} ({} wins, {} losses, win rate {:.1}%)",
        m.total_trades,
        m.wins,
        m.losses,
        m.win_rate * 100.0
    );
    println!("  Profit factor:  {:.3}", m.profit_factor);
    println!("  Max drawdown:   {:.2}%", m.max_drawdown * 100.0);
    println!("  Sharpe:         {:.3}", m.sharpe_ratio);
    println!("  Fees/slippage:  {:.4} / {:.4}", m.total_fees, m.total_slippage);
}

fn run_validate(config_path: &Path) -> Result<(), TraderError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let (strategy, simulation) = validate_config(&adapter)?;

    eprintln!("\nStrategy:");
    eprintln!("  leverage:            {}x", strategy.leverage());
    eprintln!(
        "  stop loss:           {} of capital ({:.4}% price)",
        strategy.stop_loss_pct(),
        strategy.stop_loss_price_pct() * 100.0
    );
    eprintln!(
        "  take profit:         {} of capital ({:.4}% price)",
        strategy.take_profit_pct(),
        strategy.take_profit_price_pct() * 100.0
    );
    eprintln!("  entry threshold:     {}", strategy.entry_threshold());
    eprintln!("  max positions:       {}", strategy.max_positions());
    eprintln!("\nSimulation:");
    eprintln!("  initial capital:     {}", simulation.initial_capital);
    eprintln!("  max concentration:   {}", simulation.max_concentration);

    eprintln!("\nConfiguration is valid.");
    Ok(())
}

fn run_list_symbols(data_dir: &Path) -> Result<(), TraderError> {
    let symbols = CsvAdapter::new(data_dir.to_path_buf()).list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {}", data_dir.display());
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_bound_accepts_millis_and_rfc3339() {
        assert_eq!(parse_time_bound("start", "1700000000000").unwrap(), 1_700_000_000_000);
        assert_eq!(
            parse_time_bound("start", "2023-11-14T22:13:20Z").unwrap(),
            1_700_000_000_000
        );
        assert!(parse_time_bound("end", "yesterday").is_err());
    }

    #[test]
    fn strategy_name_is_file_stem() {
        assert_eq!(strategy_name(Path::new("/tmp/aggressive.ini")), "aggressive");
    }

    #[test]
    fn cli_parses_repeated_configs() {
        let cli = Cli::try_parse_from([
            "scalptrader",
            "backtest",
            "-c",
            "a.ini",
            "-c",
            "b.ini",
            "--data",
            "candles",
            "--symbols",
            "btcusdt,ethusdt",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Backtest {
                config,
                symbols,
                json,
                ..
            } => {
                assert_eq!(config.len(), 2);
                assert_eq!(symbols.as_deref(), Some("btcusdt,ethusdt"));
                assert!(json);
            }
            other => panic!("expected backtest, got {other:?}"),
        }
    }
}
