//! Error types for Sear core operations.
//!
//! Library errors are well-structured `thiserror` enums. Query parsing and
//! evaluation have their own error type carrying the offending source span,
//! since callers typically surface those verbatim to the user.

use thiserror::Error;

/// Result type alias using SearError
pub type Result<T> = std::result::Result<T, SearError>;

/// Core error types for database operations.
#[derive(Error, Debug)]
pub enum SearError {
    /// The database file exists but is corrupted or unreadable
    #[error("database is corrupted: {reason}")]
    Corrupted { reason: String },

    /// The database format version doesn't match the current version
    #[error("database version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u8, expected: u8 },

    /// The structural guard bytes in the header don't match this build
    #[error("database layout mismatch: {reason}")]
    LayoutMismatch { reason: String },

    /// Configuration file parsing failed
    #[error("configuration error: {reason}")]
    Config { reason: String },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Query parsing or evaluation failed
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl SearError {
    /// Create a corruption error
    pub fn corrupted(reason: impl Into<String>) -> Self {
        SearError::Corrupted {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(reason: impl Into<String>) -> Self {
        SearError::Config {
            reason: reason.into(),
        }
    }
}

/// The kinds of failures the query parser and evaluator can report.
///
/// Parsing kinds are raised while tokenizing or reducing the token list to an
/// AST; `InvalidPropertyDeclaration` is raised during reduction when a
/// property's right-hand side turns out not to be a word or literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    UnexpectedGroupEnd,
    UnexpectedQuoteEnd,
    MissingOrRightOperand,
    MissingAndRightOperand,
    MissingNotRightOperand,
    MissingPropertyValue,
    MissingFunctionGroup,
    UnexpectedOperator,
    MissingLeftOperand,
    MissingRightOperand,
    UnexpectedOperand,
    UnexpectedToken,
    InvalidLeafNode,
    InvalidOperator,
    InvalidPropertyDeclaration,
}

/// A query parse or evaluation failure, carrying the offending source span.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at `{token}`")]
pub struct QueryError {
    /// What went wrong
    pub kind: QueryErrorKind,

    /// The offending portion of the query text
    pub token: String,

    /// Human-readable description
    pub message: String,
}

impl QueryError {
    pub fn new(kind: QueryErrorKind, token: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError {
            kind,
            token: token.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_display() {
        let err = QueryError::new(
            QueryErrorKind::UnexpectedGroupEnd,
            "(unterminated",
            "Unexpected end of group",
        );
        assert_eq!(err.to_string(), "Unexpected end of group at `(unterminated`");
        assert_eq!(err.kind, QueryErrorKind::UnexpectedGroupEnd);
    }

    #[test]
    fn test_query_error_wraps_into_sear_error() {
        let err: SearError =
            QueryError::new(QueryErrorKind::MissingLeftOperand, "or", "Missing left operand")
                .into();
        assert!(matches!(err, SearError::Query(_)));
    }
}
