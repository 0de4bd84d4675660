//! Core domain types and logic.

pub mod ohlcv;
pub mod stats;
pub mod cleaner;
pub mod indicator;
pub mod strategy;
pub mod position;
pub mod metrics;
pub mod backtest;
pub mod explorer;
pub mod config_validation;
pub mod error;
