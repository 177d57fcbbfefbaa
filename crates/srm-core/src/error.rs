//! Error types shared by every SRM crate.

use std::fmt;

/// Lifecycle state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// The transaction accepts statements.
    Active,
    /// `commit()` completed; terminal.
    Committed,
    /// `rollback()` ran (explicitly or from the drop guard); terminal.
    RolledBack,
}

impl TransactionState {
    /// Whether no further transition is permitted.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, TransactionState::Active)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionState::Active => "active",
            TransactionState::Committed => "committed",
            TransactionState::RolledBack => "rolled back",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while mapping entities to and from the store.
///
/// None of these are recovered inside SRM. Every variant aborts the current operation
/// and leaves the owning transaction in a must-rollback state.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Opening or talking to the database connection failed.
    Connection(String),
    /// The driver refused to prepare a generated statement.
    Prepare { sql: String, message: String },
    /// The driver failed to execute a statement or query.
    Execution { sql: String, message: String },
    /// A result row could not be mapped back onto an entity.
    Scan(String),
    /// A configuration file could not be read or parsed.
    ConfigLoad { path: String, message: String },
    /// An entity descriptor breaks the identity or reference-tree conventions.
    Schema(String),
    /// Caller-supplied query input is malformed (template/join mismatch, bad column).
    Query(String),
    /// The transaction already reached a terminal state.
    State(TransactionState),
}

impl Error {
    /// Build an execution error for the given statement.
    pub fn execution(sql: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Execution {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Build a prepare error for the given statement.
    pub fn prepare(sql: impl Into<String>, message: impl fmt::Display) -> Self {
        Error::Prepare {
            sql: sql.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error reports an operation on a finished transaction.
    pub const fn is_state(&self) -> bool {
        matches!(self, Error::State(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(msg) => write!(f, "connection error: {}", msg),
            Error::Prepare { sql, message } => {
                write!(f, "failed to prepare statement: {} [{}]", message, sql)
            }
            Error::Execution { sql, message } => {
                write!(f, "statement execution failed: {} [{}]", message, sql)
            }
            Error::Scan(msg) => write!(f, "scan error: {}", msg),
            Error::ConfigLoad { path, message } => {
                write!(f, "failed to load configuration {}: {}", path, message)
            }
            Error::Schema(msg) => write!(f, "schema error: {}", msg),
            Error::Query(msg) => write!(f, "query error: {}", msg),
            Error::State(state) => write!(f, "transaction is {}", state),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias used across SRM.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_sql() {
        let err = Error::execution("delete from master1 where id = $1", "locked");
        assert_eq!(
            err.to_string(),
            "statement execution failed: locked [delete from master1 where id = $1]"
        );
    }

    #[test]
    fn test_state_error() {
        let err = Error::State(TransactionState::Committed);
        assert!(err.is_state());
        assert_eq!(err.to_string(), "transaction is committed");
        assert!(TransactionState::RolledBack.is_terminal());
        assert!(!TransactionState::Active.is_terminal());
    }
}
