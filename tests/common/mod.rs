#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use meanrev::domain::error::MeanrevError;
use meanrev::domain::ohlcv::{Column, OhlcvTable};
use meanrev::ports::data_port::DataPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub tables: RefCell<HashMap<String, OhlcvTable>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(HashMap::new()),
            errors: HashMap::new(),
        }
    }

    pub fn with_table(self, name: &str, table: OhlcvTable) -> Self {
        self.tables.borrow_mut().insert(name.to_string(), table);
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }

    pub fn stored(&self, name: &str) -> Option<OhlcvTable> {
        self.tables.borrow().get(name).cloned()
    }
}

impl DataPort for MockDataPort {
    fn fetch_table(&self, name: &str) -> Result<OhlcvTable, MeanrevError> {
        if let Some(reason) = self.errors.get(name) {
            return Err(MeanrevError::Data {
                reason: reason.clone(),
            });
        }
        self.tables
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| MeanrevError::Data {
                reason: format!("no table named {}", name),
            })
    }

    fn store_table(&self, name: &str, table: &OhlcvTable) -> Result<(), MeanrevError> {
        self.tables
            .borrow_mut()
            .insert(name.to_string(), table.clone());
        Ok(())
    }

    fn list_tables(&self) -> Result<Vec<String>, MeanrevError> {
        let mut names: Vec<String> = self.tables.borrow().keys().cloned().collect();
        names.sort();
        Ok(names)
    }
}

/// Daily bar timestamps at the 16:00 close, starting 2023-01-02.
pub fn day(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 2)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

/// Minute bar timestamps starting at 2024-01-02 14:30.
pub fn minute(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap()
        + Duration::minutes(i as i64)
}

pub fn close_table(closes: &[f64]) -> OhlcvTable {
    OhlcvTable::from_columns(
        (0..closes.len()).map(day).collect(),
        vec![Column::numeric(
            "close",
            closes.iter().copied().map(Some).collect(),
        )],
    )
    .unwrap()
}

/// A daily OHLCV table whose open/high/low track close.
pub fn bar_table(closes: &[Option<f64>], volumes: &[Option<f64>]) -> OhlcvTable {
    let shifted = |offset: f64| -> Vec<Option<f64>> {
        closes.iter().map(|c| c.map(|v| v + offset)).collect()
    };
    OhlcvTable::from_columns(
        (0..closes.len()).map(day).collect(),
        vec![
            Column::numeric("open", shifted(-0.25)),
            Column::numeric("high", shifted(0.5)),
            Column::numeric("low", shifted(-0.5)),
            Column::numeric("close", closes.to_vec()),
            Column::numeric("volume", volumes.to_vec()),
        ],
    )
    .unwrap()
}

/// Smooth oscillation around 100 with a few sharp excursions.
pub fn oscillating_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let base = 100.0 + (i as f64 * 0.3).sin() * 3.0;
            match i % 37 {
                17 => base + 9.0,
                29 => base - 9.0,
                _ => base,
            }
        })
        .collect()
}

pub const RAW_CSV: &str = "timestamp,open,high,low,close,volume,vwap,symbol
2024-01-02 14:30:00+00:00,100.0,100.5,99.5,100.2,1200,100.1,SPY
2024-01-02 14:31:00+00:00,100.2,100.8,100.0,,1100,100.4,SPY
2024-01-02 14:32:00+00:00,100.4,101.0,100.1,100.7,-50,100.6,
2024-01-02 14:33:00+00:00,100.7,101.2,100.5,100.9,1300,100.8,SPY
2024-01-02 14:34:00+00:00,100.9,101.1,100.6,101.0,1250,100.9,SPY
2024-01-02 14:35:00+00:00,101.0,101.3,100.8,100.8,NaN,101.0,SPY
";
