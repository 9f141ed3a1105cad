//! CLI definition and dispatch.

use chrono::Local;
use clap::{Parser, Subcommand};
use log::error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::{DEFAULT_CONFIG, FileConfigAdapter};
use crate::adapters::markdown_report::MarkdownReportAdapter;
use crate::domain::config_validation::{validate_report_config, validate_simulation_config};
use crate::domain::error::DcasimError;
use crate::domain::metrics::{DEFAULT_RISK_FREE_RATE, DEFAULT_ROLLING_WINDOW};
use crate::domain::report::{FailedStrategy, SimulationReport};
use crate::domain::simulation::{SimulationConfig, Simulator};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_CONFIG_FILE: &str = "dcasim.ini";

#[derive(Parser, Debug)]
#[command(name = "dcasim", about = "Dollar-cost-averaging strategy simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Simulate every strategy and write the analysis report
    Run {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        prices: Option<PathBuf>,
        #[arg(long)]
        strategies: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create the data and report directories and a default configuration
    Init {
        #[arg(long, default_value = ".")]
        root: PathBuf,
    },
}

/// Input and output locations for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPaths {
    pub prices: PathBuf,
    pub strategies_dir: PathBuf,
    pub output_dir: PathBuf,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            prices,
            strategies,
            output,
        } => run_simulation(config.as_ref(), prices, strategies, output),
        Command::Validate { config } => run_validate(&config),
        Command::Init { root } => run_init(&root),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = DcasimError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_simulation_config(config: &dyn ConfigPort) -> SimulationConfig {
    let defaults = SimulationConfig::default();
    SimulationConfig {
        initial_amount: config.get_double("simulation", "initial_amount", defaults.initial_amount),
        monthly_contribution: config.get_double(
            "simulation",
            "monthly_contribution",
            defaults.monthly_contribution,
        ),
        annual_risk_free_rate: config.get_double(
            "simulation",
            "annual_risk_free_rate",
            DEFAULT_RISK_FREE_RATE,
        ),
    }
}

pub fn rolling_window(config: &dyn ConfigPort) -> usize {
    let window = config.get_int("report", "rolling_window", DEFAULT_ROLLING_WINDOW as i64);
    usize::try_from(window).unwrap_or(DEFAULT_ROLLING_WINDOW)
}

/// Config values with command-line overrides applied on top.
pub fn resolve_paths(
    config: &dyn ConfigPort,
    prices: Option<PathBuf>,
    strategies: Option<PathBuf>,
    output: Option<PathBuf>,
) -> RunPaths {
    let from_config = |section: &str, key: &str, default: &str| {
        PathBuf::from(
            config
                .get_string(section, key)
                .unwrap_or_else(|| default.to_string()),
        )
    };
    RunPaths {
        prices: prices.unwrap_or_else(|| from_config("data", "prices", "data/prices.csv")),
        strategies_dir: strategies
            .unwrap_or_else(|| from_config("data", "strategies_dir", "data/strategies")),
        output_dir: output.unwrap_or_else(|| from_config("report", "output_dir", "reports")),
    }
}

fn run_simulation(
    config_path: Option<&PathBuf>,
    prices: Option<PathBuf>,
    strategies: Option<PathBuf>,
    output: Option<PathBuf>,
) -> ExitCode {
    // Stage 1: Load config
    let adapter = match config_path {
        Some(path) => {
            eprintln!("Loading config from {}", path.display());
            match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            }
        }
        None => match FileConfigAdapter::from_string("") {
            Ok(a) => a,
            Err(reason) => {
                let err = DcasimError::ConfigParse {
                    file: "<defaults>".into(),
                    reason,
                };
                eprintln!("error: {err}");
                return (&err).into();
            }
        },
    };

    // Stage 2: Validate
    if let Err(e) = validate_simulation_config(&adapter).and_then(|()| validate_report_config(&adapter)) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let sim_config = build_simulation_config(&adapter);
    let window = rolling_window(&adapter);
    let paths = resolve_paths(&adapter, prices, strategies, output);

    let data_port = CsvAdapter::new(paths.prices.clone(), paths.strategies_dir.clone());
    run_pipeline(
        &data_port,
        &MarkdownReportAdapter,
        sim_config,
        window,
        &paths.output_dir,
    )
}

/// Loads prices and every strategy, runs them, and builds the report.
///
/// A strategy whose trades cannot be loaded or registered is recorded as
/// failed and the others still run. Fails when none completes.
pub fn simulate(
    data_port: &dyn DataPort,
    sim_config: SimulationConfig,
    rolling_window: usize,
) -> Result<SimulationReport, DcasimError> {
    let prices = data_port.fetch_prices()?;
    let names = data_port.list_strategies()?;
    eprintln!(
        "Simulating {} strategies over {} trading days",
        names.len(),
        prices.len()
    );
    if let (Some(first), Some(last)) = (prices.first_date(), prices.last_date()) {
        eprintln!("  Price history: {first} to {last}");
    }

    let mut simulator = Simulator::new(sim_config, prices);
    let mut failed = Vec::new();

    for name in &names {
        let outcome = data_port
            .fetch_trades(name)
            .and_then(|trades| simulator.run_strategy(name, &trades).map(|_| ()));
        if let Err(e) = outcome {
            error!("Strategy {name} failed: {e}");
            eprintln!("warning: skipping strategy {name} ({e})");
            failed.push(FailedStrategy {
                name: name.clone(),
                reason: e.to_string(),
            });
        }
    }

    if simulator.results().is_empty() {
        return Err(DcasimError::NoResults);
    }

    Ok(SimulationReport::build(
        &simulator,
        rolling_window,
        failed,
        Local::now().naive_local(),
    ))
}

pub fn run_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    sim_config: SimulationConfig,
    rolling_window: usize,
    output_dir: &Path,
) -> ExitCode {
    // Stage 3: Simulate
    let report = match simulate(data_port, sim_config, rolling_window) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Console summary
    print_summary(&report);

    // Stage 5: Write report
    match report_port.write(&report, output_dir) {
        Ok(path) => {
            eprintln!("\nReport written to: {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to write report: {e}");
            (&e).into()
        }
    }
}

fn print_summary(report: &SimulationReport) {
    for s in &report.strategies {
        let m = &s.metrics;
        eprintln!("\n=== {} ===", s.name);
        eprintln!("Total Contributions:   ${:.2}", m.total_contributions);
        eprintln!("Final Value:           ${:.2}", m.final_value);
        eprintln!("Money-weighted Return: {:.2}%", m.money_weighted_return * 100.0);
        eprintln!("Sharpe Ratio:          {:.2}", m.sharpe_ratio);
        eprintln!("Time-weighted CAGR:    {:.2}%", m.cagr * 100.0);
        eprintln!("Max Drawdown:          -{:.1}%", m.max_drawdown * 100.0);
        if s.rejected_trades > 0 || s.skipped_days > 0 {
            eprintln!(
                "Rejected trades: {}, skipped days: {}",
                s.rejected_trades, s.skipped_days
            );
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_simulation_config(&adapter).and_then(|()| validate_report_config(&adapter)) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let sim = build_simulation_config(&adapter);
    let paths = resolve_paths(&adapter, None, None, None);
    eprintln!("\nInitial amount:        {:.2}", sim.initial_amount);
    eprintln!("Monthly contribution:  {:.2}", sim.monthly_contribution);
    eprintln!("Risk-free rate:        {:.4}", sim.annual_risk_free_rate);
    eprintln!("Rolling window:        {}", rolling_window(&adapter));
    eprintln!("Prices:                {}", paths.prices.display());
    eprintln!("Strategies:            {}", paths.strategies_dir.display());
    eprintln!("Output:                {}", paths.output_dir.display());

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

/// Creates `data/`, `data/strategies/` and `reports/` under `root` and writes
/// the default config unless one exists.
pub fn init_workspace(root: &Path) -> Result<PathBuf, DcasimError> {
    for dir in ["data", "data/strategies", "reports"] {
        fs::create_dir_all(root.join(dir))?;
    }
    let config_path = root.join(DEFAULT_CONFIG_FILE);
    if !config_path.exists() {
        fs::write(&config_path, DEFAULT_CONFIG)?;
    }
    Ok(config_path)
}

fn run_init(root: &Path) -> ExitCode {
    match init_workspace(root) {
        Ok(config_path) => {
            eprintln!("Workspace ready. Config: {}", config_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}
