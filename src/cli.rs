//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::svg_chart_adapter::SvgChartAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult};
use crate::domain::config_validation::{
    read_bool, read_f64, read_kind, read_leverage, read_moving_average, read_window,
    read_window_sizes, read_leverages, require_string, strategy_section, validate_data_config,
    validate_run_config, validate_search_config, validate_strategy_config,
    validate_strategy_list,
};
use crate::domain::error::RotasimError;
use crate::domain::fees::CAPITAL_GAINS_TAX_RATE;
use crate::domain::metrics::{factor_to_percentage, floor2, Metrics};
use crate::domain::price::PriceSeries;
use crate::domain::search::{calculate_best_params, BestParams, SearchGrid};
use crate::domain::strategy::{build_strategy, StrategyConfig, StrategyKind};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ChartOptions, ReportCurve, ReportPort};

#[derive(Parser, Debug)]
#[command(name = "rotasim", about = "Leveraged moving-average rotation backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest every configured strategy and chart the growth curves
    Run {
        #[arg(short, long)]
        config: PathBuf,
        /// Chart path, overrides [report] output
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Evaluate the search grid on one thread
        #[arg(long)]
        sequential: bool,
    },
    /// Search the best leverage and window for one rotary strategy
    Optimize {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: String,
        #[arg(long)]
        sequential: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// One `[strategy.<name>]` section resolved into simulation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategySpec {
    pub name: String,
    pub label: String,
    pub kind: StrategyKind,
    pub config: StrategyConfig,
    pub search_leverage: bool,
    pub search_window: bool,
}

impl StrategySpec {
    pub fn needs_search(&self) -> bool {
        self.search_leverage || self.search_window
    }

    /// Bars consumed before the first simulated day.
    pub fn warmup(&self) -> usize {
        match self.kind {
            StrategyKind::Rotary => self.config.window_size.unwrap_or(0),
            StrategyKind::BuyAndHold => 0,
        }
    }
}

/// Simulated run of one strategy.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub label: String,
    pub result: BacktestResult,
    pub metrics: Metrics,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Run {
            config,
            output,
            sequential,
        } => run_run(&config, output.as_deref(), sequential),
        Command::Optimize {
            config,
            strategy,
            sequential,
        } => run_optimize(&config, &strategy, sequential),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    info!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path).map_err(|e| report_error(&e))
}

fn report_error(err: &RotasimError) -> ExitCode {
    eprintln!("error: {err}");
    ExitCode::from(err)
}

fn run_run(config_path: &Path, output: Option<&Path>, sequential: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&config) {
        return report_error(&e);
    }
    let data_port = match build_data_port(&config) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };

    match run_pipeline(
        &config,
        data_port.as_ref(),
        &SvgChartAdapter::new(),
        output,
        sequential,
    ) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => report_error(&e),
    }
}

fn run_optimize(config_path: &Path, name: &str, sequential: bool) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let data_port = match build_data_port(&config) {
        Ok(p) => p,
        Err(e) => return report_error(&e),
    };

    match optimize_strategy(&config, data_port.as_ref(), name, sequential) {
        Ok((spec, best)) => {
            println!(
                "Best params {}: leverage {}, window {} (growth x{:.2})",
                spec.label,
                best.leverage,
                best.window_size,
                floor2(best.growth)
            );
            ExitCode::SUCCESS
        }
        Err(e) => report_error(&e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    if let Err(e) = validate_run_config(&config) {
        return report_error(&e);
    }

    let names = match validate_strategy_list(&config) {
        Ok(n) => n,
        Err(e) => return report_error(&e),
    };
    for name in &names {
        match build_strategy_spec(&config, name) {
            Ok(spec) => println!("  {}: {}", spec.label, describe(&spec)),
            Err(e) => return report_error(&e),
        }
    }
    println!("Configuration is valid.");
    ExitCode::SUCCESS
}

fn describe(spec: &StrategySpec) -> String {
    let leverage = if spec.search_leverage {
        "auto".to_string()
    } else {
        spec.config.leverage.to_string()
    };
    match spec.kind {
        StrategyKind::BuyAndHold => format!("{} leverage {}", spec.kind, leverage),
        StrategyKind::Rotary => {
            let window = match spec.config.window_size {
                Some(w) if !spec.search_window => w.to_string(),
                _ => "auto".to_string(),
            };
            format!(
                "{} leverage {}, {} window {}",
                spec.kind, leverage, spec.config.moving_average, window
            )
        }
    }
}

/// Loads, searches, simulates, prints and charts every configured strategy.
pub fn run_pipeline(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    output: Option<&Path>,
    sequential: bool,
) -> Result<Vec<StrategyOutcome>, RotasimError> {
    let mut specs = validate_strategy_list(config)?
        .iter()
        .map(|name| build_strategy_spec(config, name))
        .collect::<Result<Vec<_>, _>>()?;

    let symbol = require_string(config, "data", "symbol")?;
    info!("Loading prices for {}", symbol);
    let series = data_port.fetch_prices(&symbol)?;

    resolve_parameters(&series, &mut specs, config, sequential)?;
    let outcomes = run_strategies(&series, &specs)?;
    print_summary(&outcomes);

    let output = output
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("report", "output").map(PathBuf::from));
    match output {
        Some(path) => {
            let options = ChartOptions {
                title: config
                    .get_string("report", "title")
                    .unwrap_or_else(|| ChartOptions::default().title),
                log_scale: read_bool(config, "report", "log_scale", true)?,
            };
            let curves: Vec<ReportCurve<'_>> = outcomes
                .iter()
                .map(|o| ReportCurve {
                    label: &o.label,
                    dates: &o.result.trajectory.dates,
                    values: &o.result.trajectory.values,
                })
                .collect();
            report_port.write(&curves, &options, &path)?;
        }
        None => warn!("No chart output configured, skipping chart"),
    }

    Ok(outcomes)
}

/// Runs the full `[search]` grid for one rotary strategy's cost profile.
pub fn optimize_strategy(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    name: &str,
    sequential: bool,
) -> Result<(StrategySpec, BestParams), RotasimError> {
    validate_data_config(config)?;
    let mut spec = build_strategy_spec(config, name)?;
    if spec.kind != StrategyKind::Rotary {
        return Err(RotasimError::InvalidParameter {
            parameter: "strategy".to_string(),
            reason: format!("'{}' is not a rotary strategy", spec.name),
        });
    }
    validate_search_config(config)?;
    spec.search_leverage = true;
    spec.search_window = true;

    let symbol = require_string(config, "data", "symbol")?;
    let series = data_port.fetch_prices(&symbol)?;
    let grid = build_search_grid(config, &spec, sequential)?;
    let best = calculate_best_params(&series, &grid, &search_base(&spec))?;
    Ok((spec, best))
}

pub fn build_strategy_spec(
    config: &dyn ConfigPort,
    name: &str,
) -> Result<StrategySpec, RotasimError> {
    validate_strategy_config(config, name)?;
    let section = strategy_section(name);
    let kind = read_kind(config, &section)?;
    let leverage = read_leverage(config, &section)?;
    let window_size = match kind {
        StrategyKind::Rotary => read_window(config, &section)?,
        StrategyKind::BuyAndHold => None,
    };

    let strategy_config = StrategyConfig {
        leverage: leverage.unwrap_or(1.0),
        ter: read_f64(config, &section, "ter", 0.0)?,
        spread: read_f64(config, &section, "spread", 0.0)?,
        certificate_fee: read_f64(config, &section, "certificate_fee", 0.0)?,
        performance_fee: read_f64(config, &section, "performance_fee", 0.0)?,
        tax_rate: read_f64(config, &section, "tax_rate", CAPITAL_GAINS_TAX_RATE)?,
        tax_at_rotation: read_bool(config, &section, "tax_at_rotation", false)?,
        circuit_breakers: read_bool(config, &section, "circuit_breakers", false)?,
        window_size,
        moving_average: read_moving_average(config, &section)?,
    };

    let name = name.trim().to_string();
    let label = config
        .get_string(&section, "label")
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| name.clone());

    Ok(StrategySpec {
        name,
        label,
        kind,
        config: strategy_config,
        search_leverage: leverage.is_none(),
        search_window: kind == StrategyKind::Rotary && window_size.is_none(),
    })
}

/// Grid for a spec: `[search]` values on the searched axes, the fixed
/// parameter on the others.
pub fn build_search_grid(
    config: &dyn ConfigPort,
    spec: &StrategySpec,
    sequential: bool,
) -> Result<SearchGrid, RotasimError> {
    let window_sizes = if spec.search_window {
        read_window_sizes(config)?
    } else {
        spec.config.window_size.into_iter().collect()
    };
    let leverages = if spec.search_leverage {
        read_leverages(config)?
    } else {
        vec![spec.config.leverage]
    };
    let parallel = read_bool(config, "search", "parallel", true)? && !sequential;
    Ok(SearchGrid::new(window_sizes, leverages).with_parallelism(parallel))
}

pub fn build_data_port(config: &dyn ConfigPort) -> Result<Box<dyn DataPort>, RotasimError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {
            let path = require_string(config, "data", "path")?;
            Ok(Box::new(CsvAdapter::new(PathBuf::from(path))))
        }
        "marketstack" => {
            #[cfg(feature = "marketstack")]
            {
                use crate::adapters::marketstack_adapter::MarketstackAdapter;
                Ok(Box::new(MarketstackAdapter::from_config(config)?))
            }
            #[cfg(not(feature = "marketstack"))]
            {
                Err(RotasimError::DataSource {
                    reason: "marketstack feature is required for source = marketstack".to_string(),
                })
            }
        }
        other => Err(RotasimError::ConfigInvalid {
            section: "data".to_string(),
            key: "source".to_string(),
            reason: format!("unknown source '{}' (expected csv or marketstack)", other),
        }),
    }
}

/// Fills in `auto` leverages and windows from the grid search.
///
/// Specs with the same cost profile and grid share one search.
pub fn resolve_parameters(
    series: &PriceSeries,
    specs: &mut [StrategySpec],
    config: &dyn ConfigPort,
    sequential: bool,
) -> Result<(), RotasimError> {
    let mut cache: Vec<(StrategyConfig, SearchGrid, BestParams)> = Vec::new();

    for spec in specs.iter_mut().filter(|s| s.needs_search()) {
        let grid = build_search_grid(config, spec, sequential)?;
        let base = search_base(spec);
        let cached = cache
            .iter()
            .find(|(c, g, _)| *c == base && *g == grid)
            .map(|(_, _, best)| *best);
        let best = match cached {
            Some(best) => {
                info!("Reusing search result for {}", spec.label);
                best
            }
            None => {
                let best = calculate_best_params(series, &grid, &base)?;
                cache.push((base, grid, best));
                best
            }
        };

        if spec.search_leverage {
            spec.config.leverage = best.leverage;
        }
        spec.config.window_size = Some(best.window_size);
        println!(
            "Best params {}: {}, {}",
            spec.label, spec.config.leverage, best.window_size
        );
    }
    Ok(())
}

fn search_base(spec: &StrategySpec) -> StrategyConfig {
    StrategyConfig {
        leverage: 1.0,
        window_size: None,
        ..spec.config.clone()
    }
}

/// Simulates every strategy over a common date range.
///
/// The range starts after the largest rotary warm-up. A rotary strategy with
/// a smaller window starts its warm-up later so its first simulated day is
/// the same as everyone else's.
pub fn run_strategies(
    series: &PriceSeries,
    specs: &[StrategySpec],
) -> Result<Vec<StrategyOutcome>, RotasimError> {
    let warmup = specs.iter().map(StrategySpec::warmup).max().unwrap_or(0);
    if series.len() < warmup + 2 {
        return Err(RotasimError::InsufficientData {
            bars: series.len(),
            minimum: warmup + 2,
        });
    }

    let mut outcomes = Vec::with_capacity(specs.len());
    for spec in specs {
        let bars = series.tail(warmup - spec.warmup());
        let mut strategy = build_strategy(spec.kind, bars, &spec.config)?;
        let result = run_backtest(strategy.as_mut());
        let metrics = Metrics::compute(&result);
        info!(
            "{}: {} days simulated, final value {:.4}",
            spec.label,
            result.trajectory.len(),
            result.trajectory.final_value()
        );
        outcomes.push(StrategyOutcome {
            label: spec.label.clone(),
            result,
            metrics,
        });
    }
    Ok(outcomes)
}

pub fn print_summary(outcomes: &[StrategyOutcome]) {
    let dates = outcomes.first().map(|o| &o.result.trajectory.dates);
    if let Some((first, last)) = dates.and_then(|d| d.first().zip(d.last())) {
        println!("Start date: {}", first);
        println!("End date: {}", last);
    }
    for o in outcomes {
        println!("{} growth: x{:.2}", o.label, floor2(o.metrics.final_value));
        println!("{} CAGR: {}", o.label, factor_to_percentage(o.metrics.cagr));
        println!(
            "{} max drawdown: {}",
            o.label,
            factor_to_percentage(1.0 + o.metrics.max_drawdown)
        );
    }
}
