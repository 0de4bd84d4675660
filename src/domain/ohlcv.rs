//! Time-indexed OHLCV table.
//!
//! Column-oriented: one timestamp index plus named columns that are either
//! numeric or text. Every cell may be missing until the table is cleaned.

use crate::domain::error::MeanrevError;
use chrono::NaiveDateTime;

pub const TIMESTAMP: &str = "timestamp";
pub const CLOSE: &str = "close";

/// Columns that can never legitimately hold a negative value.
pub const PRICE_VOLUME_COLUMNS: [&str; 6] = ["close", "high", "low", "open", "volume", "vwap"];

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn missing_count(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.iter().filter(|c| c.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|c| c.is_none()).count(),
        }
    }

    fn select(&self, keep: &[bool]) -> ColumnData {
        fn pick<T: Clone>(values: &[T], keep: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| v.clone())
                .collect()
        }
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(pick(v, keep)),
            ColumnData::Text(v) => ColumnData::Text(pick(v, keep)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: &str, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Text(values),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OhlcvTable {
    timestamps: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl OhlcvTable {
    /// Build a table, checking that every column matches the index length,
    /// that column names are unique, and that timestamps never go backwards.
    pub fn from_columns(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<Column>,
    ) -> Result<Self, MeanrevError> {
        if let Some(pair) = timestamps.windows(2).find(|w| w[1] < w[0]) {
            return Err(MeanrevError::InvalidParameter {
                name: TIMESTAMP.into(),
                reason: format!("timestamps must be non-decreasing ({} after {})", pair[1], pair[0]),
            });
        }
        for (i, col) in columns.iter().enumerate() {
            if col.data.len() != timestamps.len() {
                return Err(MeanrevError::InvalidParameter {
                    name: col.name.clone(),
                    reason: format!(
                        "column has {} values but the index has {}",
                        col.data.len(),
                        timestamps.len()
                    ),
                });
            }
            if col.name == TIMESTAMP || columns[..i].iter().any(|c| c.name == col.name) {
                return Err(MeanrevError::InvalidParameter {
                    name: col.name.clone(),
                    reason: "duplicate column name".into(),
                });
            }
        }
        Ok(Self {
            timestamps,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.columns
            .iter()
            .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
    }

    /// Values of a numeric column; a text column of that name counts as absent.
    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], MeanrevError> {
        self.column(name)
            .and_then(Column::as_numeric)
            .ok_or_else(|| MeanrevError::missing_column(name))
    }

    /// Fully populated values of a numeric column.
    pub fn dense(&self, name: &str) -> Result<Vec<f64>, MeanrevError> {
        self.numeric(name)?
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| MeanrevError::MissingValue {
                    column: name.to_string(),
                    row,
                })
            })
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(|c| c.data.missing_count()).sum()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamps.last().copied()
    }

    /// Keep only the rows whose flag is set.
    pub fn retain_rows(&self, keep: &[bool]) -> Self {
        let timestamps = self
            .timestamps
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(t, _)| *t)
            .collect();
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                data: c.data.select(keep),
            })
            .collect();
        Self {
            timestamps,
            columns,
        }
    }

    /// Same index, new column set. Callers keep the row count unchanged.
    pub(crate) fn with_columns(&self, columns: Vec<Column>) -> Self {
        debug_assert!(columns.iter().all(|c| c.data.len() == self.len()));
        Self {
            timestamps: self.timestamps.clone(),
            columns,
        }
    }
}
