//! Error types for the DevOps Commander.
//!
//! The hierarchy mirrors the lifecycle: request-boundary rejections
//! (validation, not-found, conflict) are raised synchronously before any state
//! mutation, while configuration, permission, external and tool failures are
//! raised inside the orchestrator and recorded in the execution audit trail.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the DevOps Commander.
#[derive(Debug, Error)]
pub enum CommanderError {
    /// Settings-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persistence errors.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Deployment errors raised while driving a deployer.
    #[error(transparent)]
    Deploy(#[from] DeployError),

    /// Work queue errors.
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Malformed input rejected before any state mutation.
    #[error("Validation failed for {field}: {message}")]
    Validation {
        /// Field that failed validation.
        field: String,
        /// Description of the problem.
        message: String,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (Project, Plan, Execution).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A record is not in the status required for the requested transition.
    #[error("{message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Settings-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file was not found.
    #[error("Settings file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The settings file could not be parsed.
    #[error("Failed to parse settings: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Settings validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// An environment override carried a value that cannot be interpreted.
    #[error("Invalid value for {name}: '{value}'")]
    InvalidEnvValue {
        /// Name of the variable.
        name: String,
        /// The rejected value.
        value: String,
    },
}

/// Persistence errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A stored record could not be read back.
    #[error("Record is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// A record could not be written durably.
    #[error("Failed to write record: {message}")]
    WriteFailed {
        /// Description of the write failure.
        message: String,
    },

    /// Serialization error.
    #[error("Record serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },
}

/// Errors raised while selecting or driving a deployer.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The configured provider name does not match any backend.
    #[error("Unknown deploy provider: {provider}. Valid options: local, vercel, render")]
    UnknownProvider {
        /// The rejected provider name.
        provider: String,
    },

    /// A required credential or identifier is missing.
    #[error("{reason}")]
    Configuration {
        /// Reason reported by config validation.
        reason: String,
    },

    /// The policy gate refused local execution.
    #[error("Permission denied: {message}")]
    PermissionDenied {
        /// Remediation message.
        message: String,
    },

    /// The project repository is missing or not usable.
    #[error("{message}")]
    Repository {
        /// Description of the repository problem.
        message: String,
    },

    /// A provider API or subprocess reported failure.
    #[error("Deployment failed: {message}")]
    ExternalFailure {
        /// Message reported by the backend.
        message: String,
    },

    /// The local build tool could not be resolved.
    #[error("{tool} was not found. {hint}")]
    ToolMissing {
        /// Name of the missing tool.
        tool: String,
        /// Installation guidance.
        hint: String,
    },
}

/// Work queue errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A job could not be submitted.
    #[error("Failed to enqueue job: {message}")]
    EnqueueFailed {
        /// Description of the failure.
        message: String,
    },

    /// A job could not be claimed or decoded.
    #[error("Failed to dequeue job: {message}")]
    DequeueFailed {
        /// Description of the failure.
        message: String,
    },
}

/// Result type alias for DevOps Commander operations.
pub type Result<T> = std::result::Result<T, CommanderError>;

impl CommanderError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Creates a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Returns true for errors rejected at the request boundary.
    ///
    /// These never enter the asynchronous execution path.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::NotFound { .. } | Self::Conflict { .. }
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl StoreError {
    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }

    /// Creates a corruption error with the given message.
    #[must_use]
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }
}

impl DeployError {
    /// Creates a configuration error.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Creates an external failure.
    #[must_use]
    pub fn external(message: impl Into<String>) -> Self {
        Self::ExternalFailure {
            message: message.into(),
        }
    }

    /// Creates a repository error.
    #[must_use]
    pub fn repository(message: impl Into<String>) -> Self {
        Self::Repository {
            message: message.into(),
        }
    }
}
