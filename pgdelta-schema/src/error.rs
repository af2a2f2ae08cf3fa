//! Error types for SQL parsing and extraction.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while parsing or extracting a schema document.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(pgdelta::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The grammar rejected the input.
    #[error("syntax error: {message}")]
    #[diagnostic(code(pgdelta::schema::syntax_error))]
    SyntaxError {
        #[source_code]
        src: String,
        #[label("error here")]
        span: miette::SourceSpan,
        message: String,
    },

    /// A statement parsed but its parts could not be interpreted.
    #[error("invalid {statement} statement: {message}")]
    #[diagnostic(code(pgdelta::schema::invalid_statement))]
    InvalidStatement { statement: String, message: String },

    /// A required name could not be resolved.
    #[error("unresolved {kind} `{name}`: {message}")]
    #[diagnostic(
        code(pgdelta::schema::unresolved_reference),
        help("declare the referenced object in the same document")
    )]
    UnresolvedReference {
        kind: String,
        name: String,
        message: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(pgdelta::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(pgdelta::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },
}

impl SchemaError {
    /// Create a syntax error with source location.
    pub fn syntax(
        src: impl Into<String>,
        offset: usize,
        len: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::SyntaxError {
            src: src.into(),
            span: (offset, len).into(),
            message: message.into(),
        }
    }

    /// Create an invalid statement error.
    pub fn invalid_statement(statement: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidStatement {
            statement: statement.into(),
            message: message.into(),
        }
    }

    /// Create an unresolved reference error.
    pub fn unresolved(
        kind: impl Into<String>,
        name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::UnresolvedReference {
            kind: kind.into(),
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Byte offset of the error in the source document, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::SyntaxError { span, .. } => Some(span.offset()),
            _ => None,
        }
    }
}
