//! Domain error types.

/// Top-level error type for marketlens.
///
/// Value-level defects never surface here: malformed cells are coerced to
/// defaults during preparation. Only whole-source and configuration failures
/// become errors.
#[derive(Debug, thiserror::Error)]
pub enum MarketLensError {
    #[error("source error: {reason}")]
    Source { reason: String },

    #[error("source parse error in {source_name}: {reason}")]
    SourceParse { source_name: String, reason: String },

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

    #[error("fetch for {ticker} timed out after {seconds}s")]
    Timeout { ticker: String, seconds: u64 },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MarketLensError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        MarketLensError::Source {
            reason: reason.into(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MarketLensError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for MarketLensError {
    fn from(err: csv::Error) -> Self {
        MarketLensError::SourceParse {
            source_name: "csv".to_string(),
            reason: err.to_string(),
        }
    }
}

impl From<&MarketLensError> for std::process::ExitCode {
    fn from(err: &MarketLensError) -> Self {
        let code: u8 = match err {
            MarketLensError::Io(_) => 1,
            MarketLensError::ConfigParse { .. }
            | MarketLensError::ConfigMissing { .. }
            | MarketLensError::ConfigInvalid { .. } => 2,
            MarketLensError::Source { .. }
            | MarketLensError::SourceParse { .. }
            | MarketLensError::Timeout { .. } => 3,
            MarketLensError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
