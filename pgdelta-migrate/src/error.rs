//! Error types for diffing and migration generation.

use pgdelta_schema::SchemaError;
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur while diffing schemas or generating migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// Parsing or extracting a schema document failed.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// The objects being created or dropped depend on each other in a cycle.
    #[error("Dependency cycle between: {}", objects.join(", "))]
    DependencyCycle {
        /// Objects left unordered, as `schema.name`.
        objects: Vec<String>,
    },

    /// A change carries a fragment that cannot be used.
    #[error("Invalid fragment for '{object}': {message}")]
    InvalidFragment {
        /// Object the fragment belongs to.
        object: String,
        /// What is wrong with it.
        message: String,
    },
}

impl MigrationError {
    /// Create a dependency cycle error.
    pub fn dependency_cycle(objects: Vec<String>) -> Self {
        Self::DependencyCycle { objects }
    }

    /// Create an invalid fragment error.
    pub fn invalid_fragment(object: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFragment {
            object: object.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display() {
        let err = MigrationError::dependency_cycle(vec!["public.a".into(), "public.b".into()]);
        assert_eq!(err.to_string(), "Dependency cycle between: public.a, public.b");
    }

    #[test]
    fn test_schema_error_conversion() {
        let err: MigrationError = SchemaError::config("bad").into();
        assert!(matches!(err, MigrationError::Schema(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_invalid_fragment_display() {
        let err = MigrationError::invalid_fragment("public.users", "empty");
        let msg = err.to_string();
        assert!(msg.contains("public.users"));
        assert!(msg.contains("empty"));
    }
}
