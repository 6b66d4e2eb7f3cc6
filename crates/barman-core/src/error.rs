//! Error types for barman-core.

use crate::operation::Operation;
use thiserror::Error;

/// Result type alias for barman-core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while running the external tool.
///
/// Every variant carries owned text so that a single failed fetch can be
/// handed to every caller waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The process could not be started, was killed, timed out, or exited
    /// non-zero without a usable document on stdout.
    #[error("failed to execute {program}: {reason}")]
    Execution {
        /// Program that was spawned (first argv element)
        program: String,
        /// What went wrong
        reason: String,
    },

    /// Standard output was not a valid UTF-8 JSON document.
    #[error("invalid output from `{subcommand}`: {reason}")]
    Parse {
        /// Tool subcommand that produced the output
        subcommand: &'static str,
        /// Decoder error message
        reason: String,
    },

    /// Identifier count did not match the operation's arity.
    #[error("{operation} takes {expected} identifier(s), got {actual}")]
    Arity {
        /// Operation that was requested
        operation: Operation,
        /// Declared arity
        expected: usize,
        /// Number of identifiers supplied
        actual: usize,
    },

    /// An identifier would be read by the tool as an option.
    #[error("{operation} identifier must not start with '-': {identifier:?}")]
    InvalidIdentifier {
        /// Operation that was requested
        operation: Operation,
        /// Offending identifier
        identifier: String,
    },
}

impl CoreError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Execution { .. } => "execution_error",
            CoreError::Parse { .. } => "parse_error",
            CoreError::Arity { .. } => "arity_error",
            CoreError::InvalidIdentifier { .. } => "invalid_identifier",
        }
    }
}
