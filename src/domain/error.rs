//! Domain error types.

/// Top-level error type for stratbench.
#[derive(Debug, thiserror::Error)]
pub enum StratbenchError {
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

    #[error("unknown rule type: {name}")]
    UnknownRule { name: String },

    #[error("unknown sizing method: {name}")]
    UnknownSizing { name: String },

    #[error("invalid {owner}: {reason}")]
    RuleInvalid { owner: String, reason: String },

    #[error("price table is empty")]
    EmptyPriceTable,

    #[error("malformed price table at row {row}: {reason}")]
    MalformedPriceTable { row: usize, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StratbenchError {
    pub(crate) fn invalid(owner: impl Into<String>, reason: impl Into<String>) -> Self {
        StratbenchError::RuleInvalid {
            owner: owner.into(),
            reason: reason.into(),
        }
    }
}

impl From<&StratbenchError> for std::process::ExitCode {
    fn from(err: &StratbenchError) -> Self {
        let code: u8 = match err {
            StratbenchError::Io(_) | StratbenchError::Report { .. } => 1,
            StratbenchError::ConfigParse { .. }
            | StratbenchError::ConfigMissing { .. }
            | StratbenchError::ConfigInvalid { .. } => 2,
            StratbenchError::EmptyPriceTable
            | StratbenchError::MalformedPriceTable { .. }
            | StratbenchError::Data { .. } => 3,
            StratbenchError::UnknownRule { .. }
            | StratbenchError::UnknownSizing { .. }
            | StratbenchError::RuleInvalid { .. } => 4,
            StratbenchError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
