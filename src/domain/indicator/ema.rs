//! Exponential Moving Average.
//!
//! k = 2/(n+1), seeded with the first close (no SMA seed, no bias
//! adjustment): EMA[0] = C[0], EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Every row is valid.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

/// Raw EMA pass, reused by the double and triple variants.
pub fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;

    for &v in values {
        let ema = match prev {
            None => v,
            Some(p) => v * k + p * (1.0 - k),
        };
        out.push(ema);
        prev = Some(ema);
    }
    out
}

pub fn calculate_ema(closes: &[f64], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(period),
            values: Vec::new(),
        };
    }
    IndicatorSeries::from_values(IndicatorType::Ema(period), &ema_values(closes, period))
}
