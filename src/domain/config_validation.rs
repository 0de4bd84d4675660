//! Configuration validation.
//!
//! Checks every INI value before a cleaning run or backtest starts. Values
//! are read as raw strings so that a malformed number is reported instead
//! of silently falling back to the default.

use crate::domain::error::MeanrevError;
use crate::domain::strategy::parse_kinds;
use crate::ports::config_port::ConfigPort;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    require_non_empty(config, "data", "directory")?;
    require_non_empty(config, "data", "input")?;
    if let Some(output) = config.get_string("data", "output")
        && output.trim().is_empty()
    {
        return Err(invalid("data", "output", "output table name must not be empty"));
    }
    Ok(())
}

pub fn validate_cleaning_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if let Some(factor) = parse_optional::<f64>(config, "cleaning", "iqr_factor")?
        && (!factor.is_finite() || factor <= 0.0)
    {
        return Err(invalid("cleaning", "iqr_factor", "iqr_factor must be positive"));
    }
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    if let Some(window) = parse_optional::<i64>(config, "strategy", "window")?
        && window < 1
    {
        return Err(invalid("strategy", "window", "window must be at least 1"));
    }
    if let Some(threshold) = parse_optional::<f64>(config, "strategy", "threshold")?
        && (!threshold.is_finite() || threshold <= 0.0)
    {
        return Err(invalid("strategy", "threshold", "threshold must be positive"));
    }
    if let Some(kinds) = config.get_string("strategy", "moving_average") {
        parse_kinds(&kinds).map_err(|e| invalid("strategy", "moving_average", &e.to_string()))?;
    }
    Ok(())
}

fn require_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), MeanrevError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(MeanrevError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn parse_optional<T: std::str::FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, MeanrevError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("cannot parse '{}'", raw.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> MeanrevError {
    MeanrevError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
