//! Tabular data exploration: per-column summary statistics, a
//! missing-value report and pairwise correlations of numeric columns.

use crate::domain::ohlcv::OhlcvTable;
use crate::domain::stats;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MissingValuesReport {
    /// Only columns with at least one gap, in table order.
    pub per_column: Vec<(String, usize)>,
    pub total_missing: usize,
    pub total_cells: usize,
}

impl MissingValuesReport {
    pub fn percent_missing(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.total_missing as f64 / self.total_cells as f64 * 100.0
        }
    }
}

/// Pearson correlations between every pair of numeric columns, in table order.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `values[i][j]` correlates `columns[i]` with `columns[j]`; `None` when undefined.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// count / mean / std / min / quartiles / max for every numeric column.
pub fn summary_statistics(table: &OhlcvTable) -> Vec<ColumnSummary> {
    table
        .numeric_columns()
        .map(|(name, values)| {
            let sorted = stats::sorted_present(values);
            ColumnSummary {
                column: name.to_string(),
                count: sorted.len(),
                mean: stats::mean(&sorted),
                std: stats::sample_std(&sorted),
                min: sorted.first().copied(),
                q25: stats::quantile_sorted(&sorted, 0.25),
                median: stats::quantile_sorted(&sorted, 0.5),
                q75: stats::quantile_sorted(&sorted, 0.75),
                max: sorted.last().copied(),
            }
        })
        .collect()
}

pub fn correlation_matrix(table: &OhlcvTable) -> CorrelationMatrix {
    let numeric: Vec<(&str, &[Option<f64>])> = table.numeric_columns().collect();
    let values = numeric
        .iter()
        .enumerate()
        .map(|(i, (_, xs))| {
            numeric
                .iter()
                .enumerate()
                .map(|(j, (_, ys))| {
                    let r = stats::pearson(xs, ys);
                    if i == j { r.map(|_| 1.0) } else { r }
                })
                .collect()
        })
        .collect();
    CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| name.to_string()).collect(),
        values,
    }
}

pub fn missing_values_report(table: &OhlcvTable) -> MissingValuesReport {
    let per_column: Vec<(String, usize)> = table
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.data.missing_count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    // the timestamp index counts as a column, never missing
    let total_cells = table.len() * (table.columns().len() + 1);
    MissingValuesReport {
        total_missing: per_column.iter().map(|(_, n)| n).sum(),
        per_column,
        total_cells,
    }
}
