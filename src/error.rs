//! Error types for aggsql

use std::fmt;

/// Errors that can occur while loading configuration, schemas or queries
#[derive(Debug)]
pub enum ParseError {
    /// IO error reading file
    Io {
        path: String,
        source: std::io::Error,
    },
    /// YAML (or JSON) deserialization error
    Yaml {
        source: serde_yaml::Error,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io { path, source } => {
                write!(f, "Failed to read '{}': {}", path, source)
            }
            ParseError::Yaml { source } => {
                write!(f, "Invalid YAML: {}", source)
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io { source, .. } => Some(source),
            ParseError::Yaml { source } => Some(source),
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        ParseError::Io {
            path: String::new(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for ParseError {
    fn from(err: serde_yaml::Error) -> Self {
        ParseError::Yaml { source: err }
    }
}

/// Category of a [`SqlBackendError`], stable across messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedConstruct,
    InvalidArity,
    UnknownField,
    InvalidQuery,
    ExecutionFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnsupportedConstruct => "UnsupportedConstruct",
            ErrorKind::InvalidArity => "InvalidArity",
            ErrorKind::UnknownField => "UnknownField",
            ErrorKind::InvalidQuery => "InvalidQuery",
            ErrorKind::ExecutionFailure => "ExecutionFailure",
        };
        f.write_str(name)
    }
}

/// Errors raised while compiling or executing a query against a SQL backend
///
/// Everything except `ExecutionFailure` is a compile-time error and is raised
/// before any connection is acquired.
#[derive(Debug)]
pub enum SqlBackendError {
    /// A filter, having or post-aggregation construct has no SQL translation
    UnsupportedConstruct(String),
    /// An operator received the wrong number of operands
    InvalidArity {
        operator: String,
        expected: String,
        actual: usize,
    },
    /// A referenced name is neither mapped nor part of the query
    UnknownField(String),
    /// The query descriptor itself is malformed
    InvalidQuery(String),
    /// The connection, statement or cursor layer failed
    ExecutionFailure {
        message: String,
        source: Option<sqlx::Error>,
    },
}

impl SqlBackendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SqlBackendError::UnsupportedConstruct(_) => ErrorKind::UnsupportedConstruct,
            SqlBackendError::InvalidArity { .. } => ErrorKind::InvalidArity,
            SqlBackendError::UnknownField(_) => ErrorKind::UnknownField,
            SqlBackendError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            SqlBackendError::ExecutionFailure { .. } => ErrorKind::ExecutionFailure,
        }
    }

    /// True for errors detected while compiling, before touching the backend
    pub fn is_compile_error(&self) -> bool {
        self.kind() != ErrorKind::ExecutionFailure
    }

    pub(crate) fn arity(operator: impl Into<String>, expected: impl Into<String>, actual: usize) -> Self {
        SqlBackendError::InvalidArity {
            operator: operator.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub(crate) fn execution(message: impl Into<String>) -> Self {
        SqlBackendError::ExecutionFailure {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn driver(message: impl Into<String>, source: sqlx::Error) -> Self {
        SqlBackendError::ExecutionFailure {
            message: message.into(),
            source: Some(source),
        }
    }
}

impl fmt::Display for SqlBackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlBackendError::UnsupportedConstruct(what) => {
                write!(f, "Unsupported construct: {}", what)
            }
            SqlBackendError::InvalidArity { operator, expected, actual } => {
                write!(f, "Operator '{}' expects {} operand(s), got {}", operator, expected, actual)
            }
            SqlBackendError::UnknownField(name) => {
                write!(f, "Unknown field: {}", name)
            }
            SqlBackendError::InvalidQuery(msg) => {
                write!(f, "Invalid query: {}", msg)
            }
            SqlBackendError::ExecutionFailure { message, source: Some(source) } => {
                write!(f, "Execution failed: {}: {}", message, source)
            }
            SqlBackendError::ExecutionFailure { message, source: None } => {
                write!(f, "Execution failed: {}", message)
            }
        }
    }
}

impl std::error::Error for SqlBackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SqlBackendError::ExecutionFailure { source: Some(source), .. } => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SqlBackendError>;
