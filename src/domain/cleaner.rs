//! Deterministic OHLCV cleaning.
//!
//! Three stages, always in this order, each returning a new table:
//! 1. forward fill, then median fill of leading gaps (numeric columns)
//! 2. IQR outlier removal, row-wise across all numeric columns
//! 3. negative price/volume values become gaps, then stage 1 runs again
//!
//! Dropping rows moves the quartiles, so `clean` repeats stages 2 and 3 until
//! a pass removes nothing. Its output is therefore a fixed point:
//! cleaning it again changes nothing.

use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::{CLOSE, Column, ColumnData, OhlcvTable, PRICE_VOLUME_COLUMNS};
use crate::domain::stats;
use tracing::{debug, info};

/// Sensitivity used when the cleaner is constructed on its own.
pub const DEFAULT_IQR_FACTOR: f64 = 2.5;
/// Sensitivity used by the full clean-then-backtest pipeline.
pub const PIPELINE_IQR_FACTOR: f64 = 3.6;

#[derive(Debug, Clone, PartialEq)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub missing_before: usize,
    pub missing_after: usize,
    pub outliers_removed: usize,
    /// Negative cells replaced, per price/volume column present.
    pub negatives_corrected: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataCleaner {
    iqr_factor: f64,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self {
            iqr_factor: DEFAULT_IQR_FACTOR,
        }
    }
}

impl DataCleaner {
    pub fn new(iqr_factor: f64) -> Result<Self, MeanrevError> {
        if !iqr_factor.is_finite() || iqr_factor <= 0.0 {
            return Err(MeanrevError::InvalidParameter {
                name: "iqr_factor".into(),
                reason: format!("must be a positive number, got {iqr_factor}"),
            });
        }
        Ok(Self { iqr_factor })
    }

    pub fn iqr_factor(&self) -> f64 {
        self.iqr_factor
    }

    /// Run all three stages. The input table is left untouched.
    pub fn clean(&self, table: &OhlcvTable) -> Result<(OhlcvTable, CleaningReport), MeanrevError> {
        if table.is_empty() {
            return Err(MeanrevError::empty_input("to clean"));
        }
        table.numeric(CLOSE)?;

        info!(
            rows = table.len(),
            columns = table.columns().len(),
            iqr_factor = self.iqr_factor,
            "cleaning table"
        );
        let missing_before = table.missing_count();

        let filled = handle_missing_data(table)?;
        let mut trimmed = remove_outliers(&filled, self.iqr_factor)?;
        let mut negatives_corrected: Vec<(String, usize)> = Vec::new();
        let mut passes = 1;
        let corrected = loop {
            let (corrected, negatives) = correct_errors(&trimmed)?;
            merge_counts(&mut negatives_corrected, negatives);
            let retrimmed = remove_outliers(&corrected, self.iqr_factor)?;
            if retrimmed.len() == corrected.len() {
                break corrected;
            }
            passes += 1;
            trimmed = retrimmed;
        };

        let report = CleaningReport {
            rows_in: table.len(),
            rows_out: corrected.len(),
            missing_before,
            missing_after: corrected.missing_count(),
            outliers_removed: filled.len() - corrected.len(),
            negatives_corrected,
        };
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            outlier_passes = passes,
            "cleaning complete"
        );
        Ok((corrected, report))
    }
}

fn merge_counts(total: &mut Vec<(String, usize)>, counts: Vec<(String, usize)>) {
    for (name, n) in counts {
        match total.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, sum)) => *sum += n,
            None => total.push((name, n)),
        }
    }
}

/// Forward fill every column, then fill what is left of each numeric column
/// with that column's median. Text columns only get the forward fill.
pub fn handle_missing_data(table: &OhlcvTable) -> Result<OhlcvTable, MeanrevError> {
    let before = table.missing_count();
    let columns = table
        .columns()
        .iter()
        .map(fill_column)
        .collect::<Result<Vec<_>, _>>()?;
    let filled = table.with_columns(columns);
    info!(
        missing_before = before,
        missing_after = filled.missing_count(),
        "handled missing data"
    );
    Ok(filled)
}

fn fill_column(column: &Column) -> Result<Column, MeanrevError> {
    let data = match &column.data {
        ColumnData::Numeric(values) => {
            let mut values = forward_fill(values);
            if values.iter().any(Option::is_none) {
                let median = stats::median(&values).ok_or_else(|| MeanrevError::EmptyColumn {
                    column: column.name.clone(),
                })?;
                for v in values.iter_mut().filter(|v| v.is_none()) {
                    *v = Some(median);
                }
            }
            ColumnData::Numeric(values)
        }
        ColumnData::Text(values) => ColumnData::Text(forward_fill(values)),
    };
    Ok(Column {
        name: column.name.clone(),
        data,
    })
}

fn forward_fill<T: Clone>(values: &[Option<T>]) -> Vec<Option<T>> {
    let mut last: Option<T> = None;
    values
        .iter()
        .map(|v| match v {
            Some(x) => {
                last = Some(x.clone());
                Some(x.clone())
            }
            None => last.clone(),
        })
        .collect()
}

/// Drop every row in which any numeric column falls outside
/// `[Q1 - k*IQR, Q3 + k*IQR]` for that column.
pub fn remove_outliers(table: &OhlcvTable, iqr_factor: f64) -> Result<OhlcvTable, MeanrevError> {
    if table.is_empty() {
        return Err(MeanrevError::empty_input("for outlier removal"));
    }
    let mut keep = vec![true; table.len()];

    for (name, values) in table.numeric_columns() {
        let sorted = stats::sorted_present(values);
        let (Some(q1), Some(q3)) = (
            stats::quantile_sorted(&sorted, 0.25),
            stats::quantile_sorted(&sorted, 0.75),
        ) else {
            return Err(MeanrevError::EmptyColumn {
                column: name.to_string(),
            });
        };
        let iqr = q3 - q1;
        let lower = q1 - iqr_factor * iqr;
        let upper = q3 + iqr_factor * iqr;
        debug!(column = name, q1, q3, lower, upper, "outlier bounds");

        for (flag, v) in keep.iter_mut().zip(values) {
            *flag &= matches!(v, Some(x) if *x >= lower && *x <= upper);
        }
    }

    let trimmed = table.retain_rows(&keep);
    info!(
        rows_before = table.len(),
        rows_after = trimmed.len(),
        "removed outliers"
    );
    if trimmed.is_empty() {
        return Err(MeanrevError::empty_input("after outlier removal"));
    }
    Ok(trimmed)
}

/// Turn negative prices and volumes into gaps and fill them again.
/// Returns the corrected table and the per-column count of replaced cells.
pub fn correct_errors(
    table: &OhlcvTable,
) -> Result<(OhlcvTable, Vec<(String, usize)>), MeanrevError> {
    let mut corrected = Vec::new();
    let columns = table
        .columns()
        .iter()
        .map(|col| match &col.data {
            ColumnData::Numeric(values) if PRICE_VOLUME_COLUMNS.contains(&col.name.as_str()) => {
                let negatives = values.iter().filter(|v| matches!(v, Some(x) if *x < 0.0)).count();
                debug!(column = %col.name, negatives, "negative values");
                corrected.push((col.name.clone(), negatives));
                Column::numeric(
                    &col.name,
                    values.iter().map(|v| v.filter(|x| *x >= 0.0)).collect(),
                )
            }
            _ => col.clone(),
        })
        .collect();

    let fixed = handle_missing_data(&table.with_columns(columns))?;
    Ok((fixed, corrected))
}
