use thiserror::Error;

/// Stable machine-readable codes for infrastructure failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigurationError,
    MetricsError,
    ShutdownTimeout,
    Internal,
}

/// Infrastructure error shared by the engine crates.
///
/// Domain errors (not-found, validation, lifecycle conflicts) live in the
/// engine crate; this type covers configuration, metrics, and runtime
/// plumbing failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("Shutdown grace period of {grace_seconds}s elapsed with work still in flight")]
    ShutdownTimeout { grace_seconds: u64 },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Configuration(_) => ErrorCode::ConfigurationError,
            Error::Metrics(_) => ErrorCode::MetricsError,
            Error::ShutdownTimeout { .. } => ErrorCode::ShutdownTimeout,
            Error::Internal { .. } => ErrorCode::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
