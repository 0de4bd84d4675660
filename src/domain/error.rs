//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for meanrev.
#[derive(Debug, thiserror::Error)]
pub enum MeanrevError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("missing required column '{column}'")]
    MissingColumn { column: String },

    #[error("missing value in column '{column}' at row {row} (table not cleaned?)")]
    MissingValue { column: String, row: usize },

    #[error("column '{column}' has no values to impute from")]
    EmptyColumn { column: String },

    #[error("empty input: no rows {stage}")]
    EmptyInput { stage: String },

    #[error("degenerate time span: {first} to {last} covers zero calendar days")]
    DegenerateTimeSpan {
        first: NaiveDateTime,
        last: NaiveDateTime,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MeanrevError {
    pub(crate) fn empty_input(stage: &str) -> Self {
        MeanrevError::EmptyInput {
            stage: stage.to_string(),
        }
    }

    pub(crate) fn missing_column(column: &str) -> Self {
        MeanrevError::MissingColumn {
            column: column.to_string(),
        }
    }
}

impl From<&MeanrevError> for std::process::ExitCode {
    fn from(err: &MeanrevError) -> Self {
        let code: u8 = match err {
            MeanrevError::Io(_) | MeanrevError::Data { .. } => 1,
            MeanrevError::ConfigParse { .. }
            | MeanrevError::ConfigMissing { .. }
            | MeanrevError::ConfigInvalid { .. }
            | MeanrevError::InvalidParameter { .. } => 2,
            MeanrevError::MissingColumn { .. }
            | MeanrevError::MissingValue { .. }
            | MeanrevError::EmptyColumn { .. }
            | MeanrevError::EmptyInput { .. } => 3,
            MeanrevError::DegenerateTimeSpan { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
