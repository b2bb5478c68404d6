//! Crate-wide error taxonomy (spec §7). One variant per error kind; no
//! stringly-typed catch-all.

use thiserror::Error;

/// Stable error kind used for observability tagging and caller-visible
/// surfaces. Every [`AceError`] maps to exactly one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    SchemaError,
    BackendTimeout,
    BackendUnavailable,
    MalformedOutput,
    Cancelled,
    Fatal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::SchemaError => "schema_error",
            ErrorKind::BackendTimeout => "backend_timeout",
            ErrorKind::BackendUnavailable => "backend_unavailable",
            ErrorKind::MalformedOutput => "malformed_output",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// The single error type shared by every ACE crate.
#[derive(Debug, Error)]
pub enum AceError {
    /// Schema violation in user input or extracted data. Not retried.
    #[error("validation: {0}")]
    Validation(String),

    /// Graph constraint violation. Not retried, logged and surfaced.
    #[error("schema error: {0}")]
    SchemaError(String),

    /// Adapter call exceeded its deadline.
    #[error("backend timeout: {0}")]
    BackendTimeout(String),

    /// Adapter call failed transiently after exhausting retries.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// LM output failed to parse or validate after one reprompt.
    #[error("malformed output: {0}")]
    MalformedOutput(String),

    /// Caller cancelled, or a deadline elapsed. No retry; partial work is
    /// rolled back by the caller.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Programmer error / invariant violation. Not retried.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl AceError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AceError::Validation(_) => ErrorKind::Validation,
            AceError::SchemaError(_) => ErrorKind::SchemaError,
            AceError::BackendTimeout(_) => ErrorKind::BackendTimeout,
            AceError::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
            AceError::MalformedOutput(_) => ErrorKind::MalformedOutput,
            AceError::Cancelled(_) => ErrorKind::Cancelled,
            AceError::Fatal(_) => ErrorKind::Fatal,
        }
    }

    /// True for errors the adapter layer should retry with backoff.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, AceError::BackendUnavailable(_))
    }
}

impl From<surrealdb::Error> for AceError {
    fn from(err: surrealdb::Error) -> Self {
        AceError::BackendUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for AceError {
    fn from(err: serde_json::Error) -> Self {
        AceError::MalformedOutput(err.to_string())
    }
}

pub type AceResult<T> = Result<T, AceError>;
