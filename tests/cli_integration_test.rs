//! CLI integration tests.
//!
//! Tests cover:
//! - Config building (build_cleaning_config, build_strategy_config)
//! - Every subcommand against real INI and CSV files on disk
//! - Exit codes for config, data and time-span failures

mod common;

use clap::Parser;
use common::*;
use meanrev::adapters::file_config_adapter::FileConfigAdapter;
use meanrev::cli::{self, Cli, StrategyOverrides};
use meanrev::domain::error::MeanrevError;
use meanrev::domain::strategy::MovingAverageKind;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn daily_csv(n: usize) -> String {
    let mut csv = String::from("date,open,high,low,close,volume\n");
    for (i, close) in oscillating_closes(n).into_iter().enumerate() {
        csv.push_str(&format!(
            "{},{:.4},{:.4},{:.4},{:.4},{}\n",
            day(i).format("%Y-%m-%d"),
            close - 0.2,
            close + 0.5,
            close - 0.5,
            close,
            10_000 + (i % 13) * 10
        ));
    }
    csv
}

/// Data directory with `raw_minute_bars` and `daily_bars`, plus an INI
/// pointing at it.
fn workspace(extra: &str) -> (TempDir, tempfile::NamedTempFile) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("raw_minute_bars.csv"), RAW_CSV).unwrap();
    fs::write(dir.path().join("daily_bars.csv"), daily_csv(150)).unwrap();
    let ini = format!(
        "[data]\ndirectory = {}\ninput = daily_bars\noutput = cleaned_bars\n\n{}",
        dir.path().display(),
        extra
    );
    let file = write_temp_ini(&ini);
    (dir, file)
}

fn run_args(args: &[&str]) -> ExitCode {
    let mut argv = vec!["meanrev"];
    argv.extend_from_slice(args);
    cli::run(Cli::try_parse_from(argv).unwrap())
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

const VALID_INI: &str = r#"
[data]
directory = data
input = raw_minute_bars
output = cleaned_minute_bars

[cleaning]
iqr_factor = 3.0

[strategy]
window = 50
threshold = 1.5
moving_average = EMA
"#;

mod config_building {
    use super::*;

    #[test]
    fn cleaning_config_from_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let cleaner = cli::build_cleaning_config(&adapter, None).unwrap();
        assert!((cleaner.iqr_factor() - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn cleaning_config_defaults_to_pipeline_factor() {
        let adapter = FileConfigAdapter::from_string("[data]\n").unwrap();
        let cleaner = cli::build_cleaning_config(&adapter, None).unwrap();
        assert!((cleaner.iqr_factor() - 3.6).abs() < f64::EPSILON);
    }

    #[test]
    fn cleaning_override_wins() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let cleaner = cli::build_cleaning_config(&adapter, Some(1.5)).unwrap();
        assert!((cleaner.iqr_factor() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn cleaning_override_must_be_positive() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let err = cli::build_cleaning_config(&adapter, Some(0.0)).unwrap_err();
        assert!(matches!(err, MeanrevError::InvalidParameter { .. }));
    }

    #[test]
    fn strategy_config_from_ini() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let (config, kinds) =
            cli::build_strategy_config(&adapter, &StrategyOverrides::default()).unwrap();
        assert_eq!(config.window, 50);
        assert!((config.threshold - 1.5).abs() < f64::EPSILON);
        assert_eq!(config.ma_kind, MovingAverageKind::Ema);
        assert_eq!(kinds, vec![MovingAverageKind::Ema]);
    }

    #[test]
    fn strategy_config_defaults() {
        let adapter = FileConfigAdapter::from_string("[strategy]\n").unwrap();
        let (config, kinds) =
            cli::build_strategy_config(&adapter, &StrategyOverrides::default()).unwrap();
        assert_eq!(config.window, 100);
        assert!((config.threshold - 2.0).abs() < f64::EPSILON);
        assert_eq!(kinds, vec![MovingAverageKind::Sma]);
    }

    #[test]
    fn strategy_overrides_win() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let overrides = StrategyOverrides {
            ma: Some("all".into()),
            window: Some(10),
            threshold: Some(2.5),
        };
        let (config, kinds) = cli::build_strategy_config(&adapter, &overrides).unwrap();
        assert_eq!(config.window, 10);
        assert!((config.threshold - 2.5).abs() < f64::EPSILON);
        assert_eq!(config.ma_kind, MovingAverageKind::Sma);
        assert_eq!(kinds, MovingAverageKind::ALL.to_vec());
    }

    #[test]
    fn zero_window_override_is_rejected() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let overrides = StrategyOverrides {
            window: Some(0),
            ..Default::default()
        };
        let err = cli::build_strategy_config(&adapter, &overrides).unwrap_err();
        assert!(matches!(err, MeanrevError::InvalidParameter { name, .. } if name == "window"));
    }

    #[test]
    fn negative_window_in_config_is_rejected() {
        let adapter = FileConfigAdapter::from_string("[strategy]\nwindow = -3\n").unwrap();
        let err = cli::build_strategy_config(&adapter, &StrategyOverrides::default()).unwrap_err();
        assert!(matches!(err, MeanrevError::ConfigInvalid { key, .. } if key == "window"));
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let adapter = FileConfigAdapter::from_string(VALID_INI).unwrap();
        let overrides = StrategyOverrides {
            ma: Some("HMA".into()),
            ..Default::default()
        };
        let err = cli::build_strategy_config(&adapter, &overrides).unwrap_err();
        assert!(matches!(err, MeanrevError::InvalidParameter { .. }));
    }
}

mod commands {
    use super::*;

    #[test]
    fn clean_writes_cleaned_table() {
        let (dir, ini) = workspace("[cleaning]\niqr_factor = 3.6\n");
        let code = run_args(&[
            "clean",
            "-c",
            path_str(ini.path()),
            "--input",
            "raw_minute_bars",
        ]);
        assert_eq!(code, ExitCode::SUCCESS);

        let cleaned = fs::read_to_string(dir.path().join("cleaned_bars.csv")).unwrap();
        let lines: Vec<&str> = cleaned.lines().collect();
        // the -50 volume row falls outside the volume fences
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[0],
            "timestamp,open,high,low,close,volume,vwap,symbol"
        );
        assert!(lines.iter().all(|l| !l.contains(",,")));
    }

    #[test]
    fn clean_rejects_bad_factor() {
        let (_dir, ini) = workspace("");
        let code = run_args(&["clean", "-c", path_str(ini.path()), "--iqr-factor", "0"]);
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn backtest_with_clean_writes_signals_per_kind() {
        let (dir, ini) = workspace("[strategy]\nwindow = 20\nthreshold = 2\n");
        let output = dir.path().join("signals.csv");
        let code = run_args(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "--clean",
            "--ma",
            "all",
            "--output",
            path_str(&output),
        ]);
        assert_eq!(code, ExitCode::SUCCESS);
        for kind in ["sma", "ema", "dema", "tema"] {
            let path = dir.path().join(format!("signals_{}.csv", kind));
            let content = fs::read_to_string(&path).unwrap();
            assert_eq!(content.lines().count(), 151);
        }
    }

    #[test]
    fn backtest_reads_cleaned_table_after_clean() {
        let (dir, ini) = workspace("[strategy]\nwindow = 10\n");
        assert_eq!(
            run_args(&["clean", "-c", path_str(ini.path())]),
            ExitCode::SUCCESS
        );
        let output = dir.path().join("sma.csv");
        let code = run_args(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "--output",
            path_str(&output),
        ]);
        assert_eq!(code, ExitCode::SUCCESS);
        assert!(output.exists());
    }

    #[test]
    fn backtest_without_cleaned_table_fails() {
        let (_dir, ini) = workspace("");
        let code = run_args(&["backtest", "-c", path_str(ini.path())]);
        assert_eq!(code, ExitCode::from(1));
    }

    #[test]
    fn backtest_on_uncleaned_minute_bars_fails() {
        let (_dir, ini) = workspace("");
        let code = run_args(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "--input",
            "raw_minute_bars",
        ]);
        assert_eq!(code, ExitCode::from(3));
    }

    #[test]
    fn backtest_on_single_day_is_degenerate() {
        let (_dir, ini) = workspace("");
        let code = run_args(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "--input",
            "raw_minute_bars",
            "--clean",
            "--window",
            "3",
        ]);
        assert_eq!(code, ExitCode::from(4));
    }

    #[test]
    fn explore_and_list_tables_succeed() {
        let (_dir, ini) = workspace("");
        assert_eq!(
            run_args(&["explore", "-c", path_str(ini.path()), "--input", "raw_minute_bars"]),
            ExitCode::SUCCESS
        );
        assert_eq!(
            run_args(&["list-tables", "-c", path_str(ini.path())]),
            ExitCode::SUCCESS
        );
    }

    #[test]
    fn validate_reports_config_errors() {
        let (_dir, good) = workspace("[strategy]\nmoving_average = ALL\n");
        assert_eq!(
            run_args(&["validate", "-c", path_str(good.path())]),
            ExitCode::SUCCESS
        );

        let (_dir, bad) = workspace("[strategy]\nthreshold = 0\n");
        assert_eq!(
            run_args(&["validate", "-c", path_str(bad.path())]),
            ExitCode::from(2)
        );
    }

    #[test]
    fn missing_config_file_exits_with_config_error() {
        let code = run_args(&["validate", "-c", "/nonexistent/path/config.ini"]);
        assert_eq!(code, ExitCode::from(2));
    }
}
