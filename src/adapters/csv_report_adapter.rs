//! CSV report adapter: writes the signals table of a backtest.

use crate::adapters::csv_adapter::TIMESTAMP_FORMAT;
use crate::domain::backtest::{BacktestResult, SignalRow};
use crate::domain::error::MeanrevError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Serialized shape of one signals row. `None` becomes an empty cell.
#[derive(Debug, Serialize)]
struct SignalRecord {
    timestamp: String,
    close: f64,
    moving_average: Option<f64>,
    std_dev: Option<f64>,
    upper_bound: Option<f64>,
    lower_bound: Option<f64>,
    buy_signal: bool,
    sell_signal: bool,
    position: i8,
    portfolio_return: Option<f64>,
    cumulative_return: f64,
}

impl From<&SignalRow> for SignalRecord {
    fn from(row: &SignalRow) -> Self {
        Self {
            timestamp: row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            close: row.close,
            moving_average: row.moving_average,
            std_dev: row.std_dev,
            upper_bound: row.upper_bound,
            lower_bound: row.lower_bound,
            buy_signal: row.buy_signal,
            sell_signal: row.sell_signal,
            position: row.position,
            portfolio_return: row.portfolio_return,
            cumulative_return: row.cumulative_return,
        }
    }
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

pub fn write_signals<W: Write>(rows: &[SignalRow], writer: W) -> Result<(), MeanrevError> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(SignalRecord::from(row))
            .map_err(|e| MeanrevError::Data {
                reason: format!("failed to write signals row: {}", e),
            })?;
    }
    wtr.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), MeanrevError> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(output_path)?;
        write_signals(&result.signals, file)?;
        info!(
            path = %output_path.display(),
            rows = result.signals.len(),
            ma_kind = %result.report.ma_kind,
            "wrote signals"
        );
        Ok(())
    }
}
