//! # pgdelta
//!
//! PostgreSQL schema diffing and migration generation.
//!
//! pgdelta provides:
//! - Extraction of a typed object model from schema (SDL) text
//! - Semantic comparison of views and routines, so reformatting is not a change
//! - A structured diff between two schemas, from models or straight from text
//! - Dependency-ordered migration SQL
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pgdelta::prelude::*;
//!
//! fn main() -> Result<(), pgdelta::MigrationError> {
//!     let old = extract("CREATE TABLE users (id serial PRIMARY KEY);")?;
//!     let new = extract("CREATE TABLE users (id serial PRIMARY KEY, name text NOT NULL);")?;
//!
//!     let changes = SchemaDiffer::default().diff_models(&old, &new);
//!     let sql = MigrationGenerator::default().generate(&changes)?;
//!     print!("{}", sql);
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Schema parsing, the object model and extraction.
pub mod schema {
    pub use pgdelta_schema::*;
}

/// Comparers, diffing, scheduling and SQL generation.
pub mod migrate {
    pub use pgdelta_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{ChangeSet, DiffAction, MigrationGenerator, SchemaDiffer, Scheduler};
    pub use crate::schema::{Database, DeltaConfig, extract, extract_with_config};
}

// Re-export key types at the crate root
pub use migrate::{MigrateResult, MigrationError};
pub use schema::{SchemaError, SchemaResult};
