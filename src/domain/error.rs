//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for rotasim.
#[derive(Debug, thiserror::Error)]
pub enum RotasimError {
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

    #[error("invalid parameter {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("unknown moving average kind '{kind}' (expected sma or ema)")]
    UnknownMovingAverage { kind: String },

    #[error("price series is empty")]
    EmptySeries,

    #[error("insufficient data: have {bars} bars, need {minimum}")]
    InsufficientData { bars: usize, minimum: usize },

    #[error("dates not strictly increasing at row {index}: {current} follows {previous}")]
    NonMonotonicDates {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RotasimError {
    pub(crate) fn invalid_parameter(parameter: &str, reason: impl Into<String>) -> Self {
        RotasimError::InvalidParameter {
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&RotasimError> for std::process::ExitCode {
    fn from(err: &RotasimError) -> Self {
        let code: u8 = match err {
            RotasimError::Io(_) | RotasimError::Report { .. } => 1,
            RotasimError::ConfigParse { .. }
            | RotasimError::ConfigMissing { .. }
            | RotasimError::ConfigInvalid { .. } => 2,
            RotasimError::DataSource { .. } => 3,
            RotasimError::InvalidParameter { .. } | RotasimError::UnknownMovingAverage { .. } => 4,
            RotasimError::EmptySeries
            | RotasimError::InsufficientData { .. }
            | RotasimError::NonMonotonicDates { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
