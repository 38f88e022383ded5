use serde::Serialize;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidSettings(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Analysis Error: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures a single analysis session can run into. None of these are fatal;
/// the session stays usable for a fresh submission or a reset.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: usize, limit: usize },
    #[error("Decode failure: {0}")]
    DecodeFailure(String),
    #[error("Classification failure: {0}")]
    ClassificationFailure(String),
    #[error("An analysis is already in progress")]
    Busy,
    #[error("Classification timed out after {0} ms")]
    Timeout(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    InvalidFormat,
    FileTooLarge,
    DecodeFailure,
    ClassificationFailure,
    Busy,
    Timeout,
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::InvalidFormat(_) => ErrorKind::InvalidFormat,
            AnalysisError::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            AnalysisError::DecodeFailure(_) => ErrorKind::DecodeFailure,
            AnalysisError::ClassificationFailure(_) => ErrorKind::ClassificationFailure,
            AnalysisError::Busy => ErrorKind::Busy,
            AnalysisError::Timeout(_) => ErrorKind::Timeout,
        }
    }
}

/// Discrete notification handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorNotification {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&AnalysisError> for ErrorNotification {
    fn from(error: &AnalysisError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_carries_kind_and_message() {
        let error = AnalysisError::FileTooLarge {
            size: 11,
            limit: 10,
        };
        let notification = ErrorNotification::from(&error);
        assert_eq!(notification.kind, ErrorKind::FileTooLarge);
        assert_eq!(
            notification.message,
            "File too large: 11 bytes exceeds the 10 byte limit"
        );
    }

    #[test]
    fn busy_maps_to_busy_kind() {
        assert_eq!(AnalysisError::Busy.kind(), ErrorKind::Busy);
        assert_eq!(AnalysisError::Timeout(5).kind(), ErrorKind::Timeout);
    }
}
