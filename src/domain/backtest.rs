//! Mean-reversion backtest: band → signals → positions → returns.
//!
//! Each stage is a pure function over the previous stage's output, so the
//! stages can be run and inspected one at a time. `MeanReversionBacktester`
//! chains them and assembles the signals table and report.

use crate::domain::error::MeanrevError;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use crate::domain::indicator::stddev::calculate_stddev;
use crate::domain::metrics::{
    annualized_return, cumulative_returns, days_spanned, first_total_loss, portfolio_returns,
};
use crate::domain::ohlcv::{CLOSE, OhlcvTable};
use crate::domain::position::{Position, positions_from_signals};
use crate::domain::strategy::{MovingAverageKind, StrategyConfig};
use chrono::NaiveDateTime;
use std::fmt;
use tracing::{info, warn};

/// Moving-average envelope at one row. `None` until warm-up completes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Band {
    pub moving_average: Option<f64>,
    pub std_dev: Option<f64>,
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
}

impl Band {
    pub fn is_defined(&self) -> bool {
        self.upper_bound.is_some() && self.lower_bound.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Signal {
    pub buy: bool,
    pub sell: bool,
}

/// One row of the signals table.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub moving_average: Option<f64>,
    pub std_dev: Option<f64>,
    pub upper_bound: Option<f64>,
    pub lower_bound: Option<f64>,
    pub buy_signal: bool,
    pub sell_signal: bool,
    pub position: i8,
    pub portfolio_return: Option<f64>,
    pub cumulative_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BacktestWarning {
    /// No row had a fully defined band, so no signal could fire.
    InsufficientWarmup { rows: usize, required: usize },
    /// Compounded equity reached zero or below; the annualized return is
    /// reported as -1.
    TotalLoss { row: usize, cumulative_return: f64 },
}

impl fmt::Display for BacktestWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BacktestWarning::InsufficientWarmup { rows, required } => write!(
                f,
                "insufficient warm-up: {} rows, band needs at least {}",
                rows, required
            ),
            BacktestWarning::TotalLoss {
                row,
                cumulative_return,
            } => write!(
                f,
                "total loss: equity wiped out at row {} (cumulative return {:.2}%)",
                row,
                cumulative_return * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub ma_kind: MovingAverageKind,
    pub window: usize,
    pub threshold: f64,
    /// Indicators the band was built from.
    pub moving_average: IndicatorType,
    pub deviation: IndicatorType,
    pub rows: usize,
    pub buy_signals: usize,
    pub sell_signals: usize,
    pub days_spanned: i64,
    pub cumulative_return: f64,
    pub annualized_return: f64,
    pub warnings: Vec<BacktestWarning>,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub signals: Vec<SignalRow>,
    pub report: BacktestReport,
}

/// Moving average plus a `threshold`-wide band of rolling sample deviations.
pub fn calculate_band(closes: &[f64], config: &StrategyConfig) -> Vec<Band> {
    let ma = config.ma_kind.compute(closes, config.window);
    let sd = calculate_stddev(closes, config.window);
    band_from_series(&ma, &sd, config.threshold)
}

fn band_from_series(ma: &IndicatorSeries, sd: &IndicatorSeries, threshold: f64) -> Vec<Band> {
    (0..ma.len())
        .map(|i| {
            let moving_average = ma.value_at(i);
            let std_dev = sd.value_at(i);
            let (upper_bound, lower_bound) = match (moving_average, std_dev) {
                (Some(m), Some(s)) => (Some(m + threshold * s), Some(m - threshold * s)),
                _ => (None, None),
            };
            Band {
                moving_average,
                std_dev,
                upper_bound,
                lower_bound,
            }
        })
        .collect()
}

/// Buy below the lower bound, sell above the upper bound.
pub fn generate_signals(closes: &[f64], bands: &[Band]) -> Vec<Signal> {
    closes
        .iter()
        .zip(bands)
        .map(|(&close, band)| Signal {
            buy: band.lower_bound.is_some_and(|lb| close < lb),
            sell: band.upper_bound.is_some_and(|ub| close > ub),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanReversionBacktester {
    config: StrategyConfig,
}

impl MeanReversionBacktester {
    pub fn new(config: StrategyConfig) -> Result<Self, MeanrevError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run every stage on a cleaned table.
    pub fn run(&self, table: &OhlcvTable) -> Result<BacktestResult, MeanrevError> {
        if table.is_empty() {
            return Err(MeanrevError::empty_input("to backtest"));
        }
        let closes = table.dense(CLOSE)?;
        let timestamps = table.timestamps();
        let (first, last) = match (timestamps.iter().min(), timestamps.iter().max()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return Err(MeanrevError::empty_input("to backtest")),
        };

        let cfg = &self.config;
        info!(
            rows = closes.len(),
            ma_kind = %cfg.ma_kind,
            window = cfg.window,
            threshold = cfg.threshold,
            "running backtest"
        );

        let ma = cfg.ma_kind.compute(&closes, cfg.window);
        let sd = calculate_stddev(&closes, cfg.window);
        let bands = band_from_series(&ma, &sd, cfg.threshold);
        let signals = generate_signals(&closes, &bands);
        let positions = positions_from_signals(&signals);
        let returns = portfolio_returns(&closes, &positions);
        let cumulative = cumulative_returns(&returns);

        let mut warnings = Vec::new();
        if !bands.iter().any(Band::is_defined) {
            let warning = BacktestWarning::InsufficientWarmup {
                rows: closes.len(),
                required: cfg.window.max(2),
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        if let Some(row) = first_total_loss(&cumulative) {
            let warning = BacktestWarning::TotalLoss {
                row,
                cumulative_return: cumulative[row],
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        let cumulative_return = cumulative.last().copied().unwrap_or(0.0);
        let annualized = annualized_return(cumulative_return, first, last)?;

        let signal_rows: Vec<SignalRow> = (0..closes.len())
            .map(|i| SignalRow {
                timestamp: timestamps[i],
                close: closes[i],
                moving_average: bands[i].moving_average,
                std_dev: bands[i].std_dev,
                upper_bound: bands[i].upper_bound,
                lower_bound: bands[i].lower_bound,
                buy_signal: signals[i].buy,
                sell_signal: signals[i].sell,
                position: positions[i].as_i8(),
                portfolio_return: returns[i],
                cumulative_return: cumulative[i],
            })
            .collect();

        let report = BacktestReport {
            ma_kind: cfg.ma_kind,
            window: cfg.window,
            threshold: cfg.threshold,
            moving_average: ma.indicator_type,
            deviation: sd.indicator_type,
            rows: closes.len(),
            buy_signals: signals.iter().filter(|s| s.buy).count(),
            sell_signals: signals.iter().filter(|s| s.sell).count(),
            days_spanned: days_spanned(first, last),
            cumulative_return,
            annualized_return: annualized,
            warnings,
        };
        info!(
            ma_kind = %report.ma_kind,
            cumulative_return = report.cumulative_return,
            annualized_return = report.annualized_return,
            "backtest complete"
        );

        Ok(BacktestResult {
            signals: signal_rows,
            report,
        })
    }

    /// Run the same table once per moving-average kind.
    pub fn compare(
        &self,
        table: &OhlcvTable,
        kinds: &[MovingAverageKind],
    ) -> Result<Vec<BacktestResult>, MeanrevError> {
        kinds
            .iter()
            .map(|&kind| Self::new(self.config.with_kind(kind))?.run(table))
            .collect()
    }
}

/// Rows where the strategy held a position.
pub fn exposed_rows(rows: &[SignalRow]) -> usize {
    rows.iter()
        .filter(|r| r.position != Position::Flat.as_i8())
        .count()
}
