//! Error types for pullsink.

use std::fmt;

use thiserror::Error;

/// Result type for pullsink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for pullsink.
#[derive(Error, Debug)]
pub enum Error {
    /// The subscription had no pending message.
    #[error("No messages available on subscription {0}")]
    EmptyQueue(String),

    /// The payload does not have the `<word> <digits>` shape.
    #[error("Malformed input: {0}")]
    MalformedInput(#[from] TransformError),

    /// The destination table rejected the insert.
    #[error("Write to {table} failed: {}", join_insert_errors(.errors))]
    Write {
        /// Fully qualified table name.
        table: String,
        /// Errors reported by the store.
        errors: Vec<InsertError>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Subscription not found.
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Table not found.
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// A managed service answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the service.
        message: String,
    },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Process exit code for this error.
    ///
    /// The three pipeline outcomes get their own codes so callers can tell
    /// an empty subscription from bad input or a rejected write.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::EmptyQueue(_) => 2,
            Error::MalformedInput(_) => 3,
            Error::Write { .. } => 4,
            _ => 1,
        }
    }

    /// Short label used for the failure metric.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::EmptyQueue(_) => "empty_queue",
            Error::MalformedInput(_) => "malformed_input",
            Error::Write { .. } => "write",
            Error::Config(_) | Error::Validation(_) => "config",
            Error::SubscriptionNotFound(_) | Error::TableNotFound(_) => "not_found",
            Error::Api { .. } | Error::Http(_) => "transport",
            _ => "internal",
        }
    }
}

/// Reasons a payload fails to transform.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// Payload bytes are not UTF-8.
    #[error("payload is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Payload does not split into exactly two tokens.
    #[error("expected \"<word> <digits>\", got {count} space-separated tokens")]
    TokenCount {
        /// Number of tokens found.
        count: usize,
    },

    /// One of the two tokens is empty.
    #[error("{0} token is empty")]
    EmptyToken(&'static str),

    /// The numeric token contains a non-digit.
    #[error("numeric token contains non-digit '{ch}' at position {position}")]
    NonDigit {
        /// Offending character.
        ch: char,
        /// Character index within the token.
        position: usize,
    },
}

/// A single error reported by the table for an inserted row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertError {
    /// Index of the row in the request.
    pub index: u32,
    /// Machine-readable reason (e.g. `invalid`).
    pub reason: String,
    /// Column or field the error applies to.
    pub location: Option<String>,
    /// Human-readable message.
    pub message: String,
}

impl fmt::Display for InsertError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.index, self.reason)?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

fn join_insert_errors(errors: &[InsertError]) -> String {
    if errors.is_empty() {
        return "unknown error".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validation error types.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid project ID.
    #[error("Invalid project ID: {0}")]
    InvalidProjectId(String),

    /// Invalid subscription ID.
    #[error("Invalid subscription ID: {0}")]
    InvalidSubscriptionId(String),

    /// Invalid dataset ID.
    #[error("Invalid dataset ID: {0}")]
    InvalidDatasetId(String),

    /// Invalid table ID.
    #[error("Invalid table ID: {0}")]
    InvalidTableId(String),

    /// Invalid parameter.
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Reason for invalidity.
        reason: String,
    },
}
