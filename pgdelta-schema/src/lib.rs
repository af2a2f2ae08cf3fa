//! # pgdelta-schema
//!
//! PostgreSQL DDL parsing and the schema object model for pgdelta.
//!
//! This crate provides:
//! - A `pest` grammar for schema documents, exposed as a typed statement tree
//! - The object model: schemas, tables, views, routines, sequences, enums
//! - The extractor that builds a [`Database`] from SDL text
//! - An SDL writer that re-serializes a model
//! - Configuration parsing for `pgdelta.toml`
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgdelta_schema::{DeltaConfig, extract_with_config};
//!
//! let config = DeltaConfig::from_file("pgdelta.toml")?;
//! let db = extract_with_config(r#"
//!     CREATE TYPE mood AS ENUM ('sad', 'ok');
//!     CREATE TABLE people (id serial PRIMARY KEY, mood mood NOT NULL);
//! "#, &config)?;
//!
//! println!("{}", db.to_sdl());
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod parser;
pub mod writer;

pub use config::DeltaConfig;
pub use error::{SchemaError, SchemaResult};
pub use extract::{extract, extract_file, extract_statements, extract_with_config};
pub use model::*;
pub use parser::{
    Statement, StatementKind, parse_column_fragment, parse_constraint_fragment, parse_statements,
    parse_statements_file,
};
pub use writer::write_database;
