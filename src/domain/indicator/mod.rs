//! Trailing-window indicators over closing prices.
//!
//! - `IndicatorPoint`: one value plus whether the warm-up has completed
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a series aligned row-for-row with its input

pub mod dema;
pub mod ema;
pub mod sma;
pub mod stddev;
pub mod tema;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub valid: bool,
    pub value: f64,
}

impl IndicatorPoint {
    pub fn valid(value: f64) -> Self {
        Self { valid: true, value }
    }

    pub fn warming_up() -> Self {
        Self {
            valid: false,
            value: 0.0,
        }
    }

    pub fn get(&self) -> Option<f64> {
        self.valid.then_some(self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Dema(usize),
    Tema(usize),
    Stddev(usize),
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, i: usize) -> Option<f64> {
        self.values.get(i).and_then(IndicatorPoint::get)
    }

    pub(crate) fn from_values(indicator_type: IndicatorType, values: &[f64]) -> Self {
        Self {
            indicator_type,
            values: values.iter().copied().map(IndicatorPoint::valid).collect(),
        }
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Dema(period) => write!(f, "DEMA({})", period),
            IndicatorType::Tema(period) => write!(f, "TEMA({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
        }
    }
}
