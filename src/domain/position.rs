//! Per-row position classification.
//!
//! Each row is classified on its own signals: there is no open/flat/closed
//! state carried between rows, so a long row may be followed directly by a
//! short one.

use crate::domain::backtest::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    /// Buy sets long, then sell overrides it, so sell wins a tie.
    pub fn from_signal(signal: Signal) -> Self {
        let mut position = Position::Flat;
        if signal.buy {
            position = Position::Long;
        }
        if signal.sell {
            position = Position::Short;
        }
        position
    }

    pub fn as_i8(self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn direction(self) -> f64 {
        f64::from(self.as_i8())
    }
}

pub fn positions_from_signals(signals: &[Signal]) -> Vec<Position> {
    signals.iter().copied().map(Position::from_signal).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(buy: bool, sell: bool) -> Signal {
        Signal { buy, sell }
    }

    #[test]
    fn classification() {
        assert_eq!(Position::from_signal(signal(true, false)), Position::Long);
        assert_eq!(Position::from_signal(signal(false, true)), Position::Short);
        assert_eq!(Position::from_signal(signal(false, false)), Position::Flat);
    }

    #[test]
    fn sell_wins_tie() {
        assert_eq!(Position::from_signal(signal(true, true)), Position::Short);
    }

    #[test]
    fn long_can_flip_straight_to_short() {
        let positions = positions_from_signals(&[signal(true, false), signal(false, true)]);
        assert_eq!(positions, vec![Position::Long, Position::Short]);
    }

    #[test]
    fn numeric_values() {
        assert_eq!(Position::Short.as_i8(), -1);
        assert_eq!(Position::Flat.as_i8(), 0);
        assert_eq!(Position::Long.as_i8(), 1);
        assert!((Position::Short.direction() + 1.0).abs() < f64::EPSILON);
    }
}
