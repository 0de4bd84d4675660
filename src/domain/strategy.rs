//! Mean-reversion strategy parameters.

use crate::domain::error::MeanrevError;
use crate::domain::indicator::IndicatorSeries;
use crate::domain::indicator::dema::calculate_dema;
use crate::domain::indicator::ema::calculate_ema;
use crate::domain::indicator::sma::calculate_sma;
use crate::domain::indicator::tema::calculate_tema;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_WINDOW: usize = 100;
pub const DEFAULT_THRESHOLD: f64 = 2.0;

/// Which moving average forms the centre of the band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MovingAverageKind {
    #[default]
    Sma,
    Ema,
    Dema,
    Tema,
}

impl MovingAverageKind {
    pub const ALL: [MovingAverageKind; 4] = [
        MovingAverageKind::Sma,
        MovingAverageKind::Ema,
        MovingAverageKind::Dema,
        MovingAverageKind::Tema,
    ];

    pub fn compute(self, closes: &[f64], window: usize) -> IndicatorSeries {
        match self {
            MovingAverageKind::Sma => calculate_sma(closes, window),
            MovingAverageKind::Ema => calculate_ema(closes, window),
            MovingAverageKind::Dema => calculate_dema(closes, window),
            MovingAverageKind::Tema => calculate_tema(closes, window),
        }
    }
}

impl fmt::Display for MovingAverageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MovingAverageKind::Sma => "SMA",
            MovingAverageKind::Ema => "EMA",
            MovingAverageKind::Dema => "DEMA",
            MovingAverageKind::Tema => "TEMA",
        };
        f.write_str(name)
    }
}

impl FromStr for MovingAverageKind {
    type Err = MeanrevError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SMA" => Ok(MovingAverageKind::Sma),
            "EMA" => Ok(MovingAverageKind::Ema),
            "DEMA" => Ok(MovingAverageKind::Dema),
            "TEMA" => Ok(MovingAverageKind::Tema),
            other => Err(MeanrevError::InvalidParameter {
                name: "moving_average".into(),
                reason: format!("unknown kind '{other}' (expected SMA, EMA, DEMA or TEMA)"),
            }),
        }
    }
}

/// Parse a kind list: a single kind, a comma-separated list, or `ALL`.
pub fn parse_kinds(input: &str) -> Result<Vec<MovingAverageKind>, MeanrevError> {
    if input.trim().eq_ignore_ascii_case("all") {
        return Ok(MovingAverageKind::ALL.to_vec());
    }
    let mut kinds = Vec::new();
    for token in input.split(',') {
        let kind: MovingAverageKind = token.parse()?;
        if !kinds.contains(&kind) {
            kinds.push(kind);
        }
    }
    Ok(kinds)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyConfig {
    pub window: usize,
    pub threshold: f64,
    pub ma_kind: MovingAverageKind,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            threshold: DEFAULT_THRESHOLD,
            ma_kind: MovingAverageKind::Sma,
        }
    }
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<(), MeanrevError> {
        if self.window == 0 {
            return Err(MeanrevError::InvalidParameter {
                name: "window".into(),
                reason: "window must be at least 1".into(),
            });
        }
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(MeanrevError::InvalidParameter {
                name: "threshold".into(),
                reason: format!("threshold must be positive, got {}", self.threshold),
            });
        }
        Ok(())
    }

    pub fn with_kind(self, ma_kind: MovingAverageKind) -> Self {
        Self { ma_kind, ..self }
    }
}
