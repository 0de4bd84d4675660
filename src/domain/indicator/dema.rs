//! Double Exponential Moving Average: DEMA = 2*E1 - E2,
//! with E1 = EMA(close) and E2 = EMA(E1).

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_dema(closes: &[f64], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Dema(period),
            values: Vec::new(),
        };
    }

    let e1 = ema_values(closes, period);
    let e2 = ema_values(&e1, period);
    let dema: Vec<f64> = e1.iter().zip(&e2).map(|(a, b)| 2.0 * a - b).collect();

    IndicatorSeries::from_values(IndicatorType::Dema(period), &dema)
}
