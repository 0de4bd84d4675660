//! Rolling Standard Deviation indicator.
//!
//! Sample standard deviation (divides by n-1) over n closing prices.
//! Warmup: first (n-1) rows are invalid; with n = 1 no row is valid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::stats::sample_std;

pub fn calculate_stddev(closes: &[f64], period: usize) -> IndicatorSeries {
    let values = (0..closes.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return IndicatorPoint::warming_up();
            }
            match sample_std(&closes[i + 1 - period..=i]) {
                Some(sd) => IndicatorPoint::valid(sd),
                None => IndicatorPoint::warming_up(),
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values,
    }
}
