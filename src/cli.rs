//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{BacktestResult, MeanReversionBacktester, SignalRow, exposed_rows};
use crate::domain::cleaner::{CleaningReport, DataCleaner, PIPELINE_IQR_FACTOR};
use crate::domain::config_validation::{
    validate_cleaning_config, validate_data_config, validate_strategy_config,
};
use crate::domain::error::MeanrevError;
use crate::domain::explorer::{correlation_matrix, missing_values_report, summary_statistics};
use crate::domain::strategy::{
    DEFAULT_THRESHOLD, DEFAULT_WINDOW, MovingAverageKind, StrategyConfig, parse_kinds,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

const TAIL_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(name = "meanrev", about = "OHLCV cleaning and mean-reversion backtesting")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clean a raw OHLCV table and store the result
    Clean {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        iqr_factor: Option<f64>,
    },
    /// Run the mean-reversion backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        input: Option<String>,
        /// SMA, EMA, DEMA, TEMA, a comma-separated list, or "all"
        #[arg(long = "ma")]
        ma: Option<String>,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        threshold: Option<f64>,
        /// Signals CSV; one file per kind when comparing
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Clean the input table before backtesting
        #[arg(long)]
        clean: bool,
    },
    /// Print summary statistics and missing values for a table
    Explore {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        input: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List tables in the data directory
    ListTables {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Command-line values that take precedence over `[strategy]`.
#[derive(Debug, Clone, Default)]
pub struct StrategyOverrides {
    pub ma: Option<String>,
    pub window: Option<usize>,
    pub threshold: Option<f64>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Clean {
            config,
            input,
            output,
            iqr_factor,
        } => run_clean(&config, input.as_deref(), output.as_deref(), iqr_factor),
        Command::Backtest {
            config,
            input,
            ma,
            window,
            threshold,
            output,
            clean,
        } => run_backtest(
            &config,
            input.as_deref(),
            &StrategyOverrides {
                ma,
                window,
                threshold,
            },
            output.as_deref(),
            clean,
        ),
        Command::Explore { config, input } => run_explore(&config, input.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListTables { config } => run_list_tables(&config),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| fail(&err))
}

fn fail(err: &MeanrevError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn build_cleaning_config(
    adapter: &dyn ConfigPort,
    iqr_override: Option<f64>,
) -> Result<DataCleaner, MeanrevError> {
    let factor = iqr_override
        .unwrap_or_else(|| adapter.get_double("cleaning", "iqr_factor", PIPELINE_IQR_FACTOR));
    DataCleaner::new(factor)
}

/// Strategy parameters plus the moving-average kinds to run. The first kind
/// is the one carried in the returned config.
pub fn build_strategy_config(
    adapter: &dyn ConfigPort,
    overrides: &StrategyOverrides,
) -> Result<(StrategyConfig, Vec<MovingAverageKind>), MeanrevError> {
    let window = match overrides.window {
        Some(w) => w,
        None => {
            let raw = adapter.get_int("strategy", "window", DEFAULT_WINDOW as i64);
            usize::try_from(raw).map_err(|_| MeanrevError::ConfigInvalid {
                section: "strategy".into(),
                key: "window".into(),
                reason: "window must be at least 1".into(),
            })?
        }
    };
    let threshold = overrides
        .threshold
        .unwrap_or_else(|| adapter.get_double("strategy", "threshold", DEFAULT_THRESHOLD));
    let ma_setting = overrides
        .ma
        .clone()
        .or_else(|| adapter.get_string("strategy", "moving_average"))
        .unwrap_or_else(|| MovingAverageKind::default().to_string());
    let kinds = parse_kinds(&ma_setting)?;

    let config = StrategyConfig {
        window,
        threshold,
        ma_kind: kinds.first().copied().unwrap_or_default(),
    };
    config.validate()?;
    Ok((config, kinds))
}

fn data_adapter(adapter: &dyn ConfigPort) -> Result<CsvAdapter, MeanrevError> {
    let directory = adapter
        .get_string("data", "directory")
        .ok_or_else(|| MeanrevError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })?;
    Ok(CsvAdapter::new(PathBuf::from(directory)))
}

fn config_input(adapter: &dyn ConfigPort) -> Result<String, MeanrevError> {
    adapter
        .get_string("data", "input")
        .ok_or_else(|| MeanrevError::ConfigMissing {
            section: "data".into(),
            key: "input".into(),
        })
}

/// Fetch, clean and store one table.
pub fn run_clean_pipeline(
    data_port: &dyn DataPort,
    cleaner: &DataCleaner,
    input: &str,
    output: &str,
) -> Result<CleaningReport, MeanrevError> {
    let raw = data_port.fetch_table(input)?;
    let (cleaned, report) = cleaner.clean(&raw)?;
    data_port.store_table(output, &cleaned)?;
    Ok(report)
}

/// Fetch a table, optionally clean it, backtest every requested kind and
/// write the signals when an output path is given.
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report_port: &dyn ReportPort,
    input: &str,
    cleaner: Option<&DataCleaner>,
    config: StrategyConfig,
    kinds: &[MovingAverageKind],
    output_path: Option<&Path>,
) -> Result<Vec<BacktestResult>, MeanrevError> {
    let mut table = data_port.fetch_table(input)?;
    if let Some(cleaner) = cleaner {
        let (cleaned, report) = cleaner.clean(&table)?;
        print_cleaning_report(&report);
        table = cleaned;
    }

    let backtester = MeanReversionBacktester::new(config)?;
    let results = backtester.compare(&table, kinds)?;

    if let Some(path) = output_path {
        match results.as_slice() {
            [single] => {
                report_port.write(single, path)?;
                eprintln!("\nSignals written to: {}", path.display());
            }
            many => {
                for written in report_port.write_comparison(many, path)? {
                    eprintln!("\nSignals written to: {}", written.display());
                }
            }
        }
    }
    Ok(results)
}

fn run_clean(
    config_path: &Path,
    input: Option<&str>,
    output: Option<&str>,
    iqr_factor: Option<f64>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&adapter).and_then(|_| validate_cleaning_config(&adapter))
    {
        return fail(&e);
    }

    let cleaner = match build_cleaning_config(&adapter, iqr_factor) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let input = match input.map(str::to_string).map_or_else(|| config_input(&adapter), Ok) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };
    let output = output
        .map(str::to_string)
        .or_else(|| adapter.get_string("data", "output"))
        .unwrap_or_else(|| format!("{}_clean", input));

    eprintln!(
        "Cleaning {} (iqr factor {})...",
        input,
        cleaner.iqr_factor()
    );
    match run_clean_pipeline(&data_port, &cleaner, &input, &output) {
        Ok(report) => {
            print_cleaning_report(&report);
            eprintln!("\nCleaned table written to: {}", output);
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_backtest(
    config_path: &Path,
    input: Option<&str>,
    overrides: &StrategyOverrides,
    output_path: Option<&Path>,
    clean: bool,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&adapter)
        .and_then(|_| validate_cleaning_config(&adapter))
        .and_then(|_| validate_strategy_config(&adapter))
    {
        return fail(&e);
    }

    let (config, kinds) = match build_strategy_config(&adapter, overrides) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let cleaner = if clean {
        match build_cleaning_config(&adapter, None) {
            Ok(c) => Some(c),
            Err(e) => return fail(&e),
        }
    } else {
        None
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    // without --clean the cleaned table from a previous `clean` run is used
    let input = match input {
        Some(i) => i.to_string(),
        None if !clean => match adapter.get_string("data", "output") {
            Some(o) => o,
            None => match config_input(&adapter) {
                Ok(i) => i,
                Err(e) => return fail(&e),
            },
        },
        None => match config_input(&adapter) {
            Ok(i) => i,
            Err(e) => return fail(&e),
        },
    };

    eprintln!(
        "Running backtest on {}: window {}, threshold {}, {} kind(s)",
        input,
        config.window,
        config.threshold,
        kinds.len()
    );

    let report_port = CsvReportAdapter::new();
    match run_backtest_pipeline(
        &data_port,
        &report_port,
        &input,
        cleaner.as_ref(),
        config,
        &kinds,
        output_path,
    ) {
        Ok(results) => {
            for result in &results {
                print_backtest_summary(result);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_explore(config_path: &Path, input: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&adapter) {
        return fail(&e);
    }
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    let input = match input.map(str::to_string).map_or_else(|| config_input(&adapter), Ok) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };
    let table = match data_port.fetch_table(&input) {
        Ok(t) => t,
        Err(e) => return fail(&e),
    };

    println!("{} rows x {} columns", table.len(), table.columns().len());
    if let (Some(first), Some(last)) = (table.first_timestamp(), table.last_timestamp()) {
        println!("{} to {}", first, last);
    }

    println!("\n=== Summary Statistics ===");
    println!(
        "{:<10} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for s in summary_statistics(&table) {
        println!(
            "{:<10} {:>8} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
            s.column,
            s.count,
            fmt_opt(s.mean),
            fmt_opt(s.std),
            fmt_opt(s.min),
            fmt_opt(s.q25),
            fmt_opt(s.median),
            fmt_opt(s.q75),
            fmt_opt(s.max),
        );
    }

    let correlations = correlation_matrix(&table);
    println!("\n=== Correlations ===");
    print!("{:<10}", "");
    for column in &correlations.columns {
        print!(" {:>10}", column);
    }
    println!();
    for (column, row) in correlations.columns.iter().zip(&correlations.values) {
        print!("{:<10}", column);
        for r in row {
            print!(" {:>10}", r.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v)));
        }
        println!();
    }

    let missing = missing_values_report(&table);
    println!("\n=== Missing Values ===");
    if missing.per_column.is_empty() {
        println!("none");
    }
    for (column, count) in &missing.per_column {
        println!("  {}: {}", column, count);
    }
    println!(
        "Total: {} of {} cells ({:.2}%)",
        missing.total_missing,
        missing.total_cells,
        missing.percent_missing()
    );
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_data_config(&adapter)
        .and_then(|_| validate_cleaning_config(&adapter))
        .and_then(|_| validate_strategy_config(&adapter))
    {
        return fail(&e);
    }

    let cleaner = match build_cleaning_config(&adapter, None) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let (config, kinds) = match build_strategy_config(&adapter, &StrategyOverrides::default()) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let kind_names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
    eprintln!("Configuration is valid");
    eprintln!("  IQR factor:     {}", cleaner.iqr_factor());
    eprintln!("  Window:         {}", config.window);
    eprintln!("  Threshold:      {}", config.threshold);
    eprintln!("  Moving average: {}", kind_names.join(", "));
    ExitCode::SUCCESS
}

fn run_list_tables(config_path: &Path) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let data_port = match data_adapter(&adapter) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };
    match data_port.list_tables() {
        Ok(names) => {
            for name in &names {
                println!("{}", name);
            }
            eprintln!("{} table(s)", names.len());
            ExitCode::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

pub fn print_cleaning_report(report: &CleaningReport) {
    eprintln!("\n=== Cleaning Report ===");
    eprintln!("Rows:             {} -> {}", report.rows_in, report.rows_out);
    eprintln!("Missing before:   {}", report.missing_before);
    eprintln!("Missing after:    {}", report.missing_after);
    eprintln!("Outlier rows:     {}", report.outliers_removed);
    for (column, count) in &report.negatives_corrected {
        eprintln!("  negative {}: {}", column, count);
    }
}

pub fn print_backtest_summary(result: &BacktestResult) {
    let r = &result.report;
    eprintln!(
        "\n=== {} +/- {} x {} ===",
        r.moving_average, r.threshold, r.deviation
    );
    eprintln!("Rows:             {}", r.rows);
    eprintln!("Days Spanned:     {}", r.days_spanned);
    eprintln!("Buy Signals:      {}", r.buy_signals);
    eprintln!("Sell Signals:     {}", r.sell_signals);
    eprintln!("Exposed Rows:     {}", exposed_rows(&result.signals));
    eprintln!("Cumulative:       {:.2}%", r.cumulative_return * 100.0);
    eprintln!("Annualized:       {:.2}%", r.annualized_return * 100.0);
    for warning in &r.warnings {
        eprintln!("warning: {}", warning);
    }

    let tail = result.signals.len().saturating_sub(TAIL_ROWS);
    eprintln!("\nLast {} rows:", result.signals.len() - tail);
    eprintln!(
        "{:<20} {:>10} {:>10} {:>10} {:>10} {:>4} {:>4} {:>4} {:>10}",
        "timestamp", "close", "ma", "upper", "lower", "buy", "sell", "pos", "cum"
    );
    for row in &result.signals[tail..] {
        eprintln!("{}", format_signal_row(row));
    }
}

pub fn format_signal_row(row: &SignalRow) -> String {
    format!(
        "{:<20} {:>10.4} {:>10} {:>10} {:>10} {:>4} {:>4} {:>4} {:>10.6}",
        row.timestamp.format("%Y-%m-%d %H:%M:%S"),
        row.close,
        fmt_opt(row.moving_average),
        fmt_opt(row.upper_bound),
        fmt_opt(row.lower_bound),
        u8::from(row.buy_signal),
        u8::from(row.sell_signal),
        row.position,
        row.cumulative_return,
    )
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}
