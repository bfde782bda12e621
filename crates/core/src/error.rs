//! Error taxonomy and exit codes shared by every sidesnap operation

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Process exit codes surfaced to callers
///
/// Callers branch on these without parsing text, so the numeric values are
/// part of the public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "i32")]
pub enum ExitCode {
    Ok,
    NoChanges,
    NotInitialized,
    Locked,
    PreconditionFailed,
    InvalidArgs,
    Failure,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        match self {
            ExitCode::Ok => 0,
            ExitCode::NoChanges => 10,
            ExitCode::NotInitialized => 11,
            ExitCode::Locked => 12,
            ExitCode::PreconditionFailed => 13,
            ExitCode::InvalidArgs => 14,
            ExitCode::Failure => 1,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

/// A failed invocation of the store engine
#[derive(Debug, Clone, Error)]
#[error("git {} (exit code {})", .args.join(" "), describe_exit(.exit_code))]
pub struct GitError {
    pub args: Vec<String>,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

fn describe_exit(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Errors produced by sidecar operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    InvalidArguments(String),

    #[error("{0}")]
    Locked(String),

    #[error("{0}")]
    NotInitialized(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Error::InvalidArguments(message.into())
    }

    pub fn locked() -> Self {
        Error::Locked("another process holds the lock".to_string())
    }

    pub fn not_initialized() -> Self {
        Error::NotInitialized("sidecar repository not initialized".to_string())
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(action: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            context: format!("{} {}", action, path.into().display()),
            source,
        }
    }

    /// Exit code reported for this error
    pub fn code(&self) -> ExitCode {
        match self {
            Error::InvalidArguments(_) => ExitCode::InvalidArgs,
            Error::Locked(_) => ExitCode::Locked,
            Error::NotInitialized(_) => ExitCode::NotInitialized,
            Error::PreconditionFailed(_) => ExitCode::PreconditionFailed,
            Error::Git(_) | Error::Io { .. } => ExitCode::Failure,
        }
    }
}

/// Result type used throughout sidesnap-core
pub type Result<T> = std::result::Result<T, Error>;
