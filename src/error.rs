use std::path::PathBuf;

use thiserror::Error;

/// Errors returned when configuring, loading or evaluating rules.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown role reference: {0}")]
    UnknownRole(String),
    #[error("unknown plugin id: {0}")]
    UnknownPlugin(String),
    #[error("unknown expression: {0}")]
    UnknownExpression(uuid::Uuid),
    #[error("rule not found: {0}")]
    NotFound(String),
    #[error("rules path does not exist: {0}")]
    MissingPath(String),
    #[error("failed to read rules from {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse rules from {path}: {message}")]
    Parse { path: String, message: String },
    #[error("duplicate rule identifier detected: {id}")]
    DuplicateRule { id: String },
}

impl RuleError {
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RuleError::Io {
            path: path.into().display().to_string(),
            source,
        }
    }

    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RuleError::Parse {
            path: path.into().display().to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::InvalidArgument(err.to_string())
    }
}
