//! Return accounting and annualization.

use super::error::MeanrevError;
use super::position::Position;
use chrono::NaiveDateTime;

const DAYS_PER_YEAR: f64 = 365.25;

/// Fractional change from `prev` to `curr`; a non-positive base yields 0.
pub fn percent_change(prev: f64, curr: f64) -> f64 {
    if prev > 0.0 { (curr - prev) / prev } else { 0.0 }
}

/// Return earned on each row by holding the previous row's position.
/// The first row has no previous position and is `None`.
pub fn portfolio_returns(closes: &[f64], positions: &[Position]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return returns;
    }
    returns.push(None);
    for i in 1..closes.len().min(positions.len()) {
        returns.push(Some(
            positions[i - 1].direction() * percent_change(closes[i - 1], closes[i]),
        ));
    }
    returns
}

/// Compounded return to date; undefined returns count as zero.
pub fn cumulative_returns(returns: &[Option<f64>]) -> Vec<f64> {
    let mut growth = 1.0;
    returns
        .iter()
        .map(|r| {
            growth *= 1.0 + r.unwrap_or(0.0);
            growth - 1.0
        })
        .collect()
}

/// Whole calendar days between the two timestamps.
pub fn days_spanned(first: NaiveDateTime, last: NaiveDateTime) -> i64 {
    (last - first).num_days()
}

/// `(1 + cumulative)^(365.25 / days) - 1`. A span shorter than one whole day
/// cannot be annualized. Equity at or below zero annualizes to -1.
pub fn annualized_return(
    cumulative_return: f64,
    first: NaiveDateTime,
    last: NaiveDateTime,
) -> Result<f64, MeanrevError> {
    let days = days_spanned(first, last);
    if days <= 0 {
        return Err(MeanrevError::DegenerateTimeSpan { first, last });
    }
    let growth = 1.0 + cumulative_return;
    if growth <= 0.0 {
        return Ok(-1.0);
    }
    let years = days as f64 / DAYS_PER_YEAR;
    Ok(growth.powf(1.0 / years) - 1.0)
}

/// First row whose compounded equity has fallen to zero or below.
pub fn first_total_loss(cumulative: &[f64]) -> Option<usize> {
    cumulative.iter().position(|c| 1.0 + c <= 0.0)
}
