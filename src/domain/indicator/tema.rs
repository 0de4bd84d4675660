//! Triple Exponential Moving Average: TEMA = 3*E1 - 3*E2 + E3,
//! with E1 = EMA(close), E2 = EMA(E1), E3 = EMA(E2).

use crate::domain::indicator::ema::ema_values;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_tema(closes: &[f64], period: usize) -> IndicatorSeries {
    if period == 0 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Tema(period),
            values: Vec::new(),
        };
    }

    let e1 = ema_values(closes, period);
    let e2 = ema_values(&e1, period);
    let e3 = ema_values(&e2, period);
    let tema: Vec<f64> = e1
        .iter()
        .zip(&e2)
        .zip(&e3)
        .map(|((a, b), c)| 3.0 * a - 3.0 * b + c)
        .collect();

    IndicatorSeries::from_values(IndicatorType::Tema(period), &tema)
}
