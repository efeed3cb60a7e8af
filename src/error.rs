//! Structured error types for configuration operations.

use crate::config::FragmentError;
use serde::Serialize;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Lookup errors
    NotFound,
    PermissionDenied,

    // Content errors
    ParseError,
    InvalidStructure,
    InvalidService,
    ValidationError,
    MergeError,

    // Persistence errors
    WriteError,
    IoError,

    // Watcher errors
    WatchError,
}

/// A single rule violation reported by schema validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleViolation {
    pub key: String,
    pub message: String,
}

impl std::fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Errors surfaced by the resolver, mutator, and snapshot cache.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("permission denied: {}", path.display())]
    PermissionDenied { path: PathBuf },

    #[error("YAML error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid structure in {}: {message}", path.display())]
    InvalidStructure { path: PathBuf, message: String },

    #[error("invalid service name {service:?}: {reason}")]
    InvalidService { service: String, reason: String },

    #[error(
        "validation failed for {service}.{section}.{key}: {value} ({})",
        join_violations(violations)
    )]
    Validation {
        service: String,
        section: String,
        key: String,
        value: Value,
        violations: Vec<RuleViolation>,
    },

    #[error(
        "{} fragment(s) could not be merged: {}",
        errors.len(),
        join_fragment_errors(errors)
    )]
    Merge { errors: Vec<FragmentError> },

    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),
}

fn join_violations(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_fragment_errors(errors: &[FragmentError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path.display(), e.error))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConfigError {
    /// The machine-readable kind of this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::NotFound { .. } => ErrorCode::NotFound,
            ConfigError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            ConfigError::Parse { .. } => ErrorCode::ParseError,
            ConfigError::InvalidStructure { .. } => ErrorCode::InvalidStructure,
            ConfigError::InvalidService { .. } => ErrorCode::InvalidService,
            ConfigError::Validation { .. } => ErrorCode::ValidationError,
            ConfigError::Merge { .. } => ErrorCode::MergeError,
            ConfigError::Write { .. } => ErrorCode::WriteError,
            ConfigError::Io { .. } => ErrorCode::IoError,
            ConfigError::Watch(_) => ErrorCode::WatchError,
        }
    }

    /// Classify an I/O error raised while reading `path`.
    pub fn read(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound {
                path: path.to_path_buf(),
            },
            io::ErrorKind::PermissionDenied => ConfigError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    /// Classify an I/O error raised while persisting `path`.
    pub fn write(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::PermissionDenied => ConfigError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConfigError::Write {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }

    pub fn parse(path: &Path, err: impl std::fmt::Display) -> Self {
        ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub fn invalid_structure(path: &Path, message: impl Into<String>) -> Self {
        ConfigError::InvalidStructure {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn invalid_service(service: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidService {
            service: service.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
