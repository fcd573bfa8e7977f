use thiserror::Error;
use uuid::Uuid;

/// Service assurance domain errors
#[derive(Error, Debug)]
pub enum AssuranceError {
    #[error("Probe not found: {id}")]
    ProbeNotFound { id: Uuid },

    #[error("Alarm rule not found: {id}")]
    RuleNotFound { id: Uuid },

    #[error("Alarm not found: {id}")]
    AlarmNotFound { id: Uuid },

    #[error("SLA policy not found: {id}")]
    PolicyNotFound { id: Uuid },

    #[error("Flow collector not found: {id}")]
    CollectorNotFound { id: Uuid },

    #[error("Validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Duplicate {entity}: {name}")]
    Duplicate { entity: &'static str, name: String },

    #[error("Core system error: {0}")]
    Core(#[from] assurance_core::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AssuranceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AssuranceError>;
