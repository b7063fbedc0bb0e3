//! Domain error types.

/// Top-level error type for livefeed.
#[derive(Debug, thiserror::Error)]
pub enum LivefeedError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("malformed payload: {reason}")]
    Payload { reason: String },

    #[error("no async runtime available: {reason}")]
    Runtime { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LivefeedError {
    pub fn payload(reason: impl Into<String>) -> Self {
        LivefeedError::Payload {
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        LivefeedError::Data {
            reason: reason.into(),
        }
    }
}

impl From<&LivefeedError> for std::process::ExitCode {
    fn from(err: &LivefeedError) -> Self {
        let code: u8 = match err {
            LivefeedError::Io(_) => 1,
            LivefeedError::ConfigParse { .. } | LivefeedError::ConfigInvalid { .. } => 2,
            LivefeedError::Data { .. } => 3,
            LivefeedError::Payload { .. } | LivefeedError::Json(_) => 4,
            LivefeedError::Runtime { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
