//! Error types for lobster-core

use std::fmt;
use thiserror::Error;

/// Error kind categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or truncated dump data
    Parse,
    /// Snapshot resolution errors (dangling ids, bad field layouts)
    Resolve,
    /// Query evaluation errors
    Query,
    /// Object or class not found
    NotFound,
    /// Configuration errors (CLI arguments, excludes file)
    Config,
    /// I/O errors
    IO,
    /// Internal errors (bugs)
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "parse",
            ErrorKind::Resolve => "resolve",
            ErrorKind::Query => "query",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Config => "config",
            ErrorKind::IO => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type
#[derive(Debug, Error)]
pub struct LobsterError {
    pub kind: ErrorKind,
    pub message: String,
    /// Byte offset into the dump, when known
    pub offset: Option<u64>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl LobsterError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            offset: None,
            source: None,
        }
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Parse, message)
    }

    pub fn resolve(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Resolve, message)
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Query, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::IO, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for LobsterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " at offset {}", offset)?;
        }
        Ok(())
    }
}

impl From<std::io::Error> for LobsterError {
    fn from(err: std::io::Error) -> Self {
        LobsterError::io(format!("I/O error: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for LobsterError {
    fn from(err: serde_json::Error) -> Self {
        LobsterError::internal(format!("JSON serialization error: {}", err)).with_source(err)
    }
}

impl From<lobster_utils::ByteError> for LobsterError {
    fn from(err: lobster_utils::ByteError) -> Self {
        LobsterError::parse("truncated dump data")
            .with_offset(err.offset as u64)
            .with_source(err)
    }
}

impl From<lobster_utils::HexError> for LobsterError {
    fn from(err: lobster_utils::HexError) -> Self {
        LobsterError::query(format!("bad object id: {}", err)).with_source(err)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, LobsterError>;
