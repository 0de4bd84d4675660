//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MeanrevError;
use std::path::{Path, PathBuf};

/// Port for writing backtest signal tables.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), MeanrevError>;

    /// Default implementation: one output per result, with the moving-average
    /// kind appended to the file stem. Returns the paths written.
    fn write_comparison(
        &self,
        results: &[BacktestResult],
        output_path: &Path,
    ) -> Result<Vec<PathBuf>, MeanrevError> {
        let mut written = Vec::with_capacity(results.len());
        for result in results {
            let path = suffixed_path(output_path, &result.report.ma_kind.to_string().to_lowercase());
            self.write(result, &path)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// `signals.csv` + `ema` → `signals_ema.csv`.
pub fn suffixed_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}_{}", stem, suffix),
    };
    path.with_file_name(name)
}
