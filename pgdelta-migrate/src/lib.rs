//! # pgdelta-migrate
//!
//! Schema diffing and migration generation for pgdelta.
//!
//! This crate provides:
//! - Semantic comparers that tell reformatted views and routines from real changes
//! - A differ producing a typed [`ChangeSet`] from two models or two SDL documents
//! - A dependency scheduler that orders creates and drops
//! - A PostgreSQL migration generator
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐
//! │ SDL / Model  │────▶│ Schema Differ  │────▶│  ChangeSet  │
//! └──────────────┘     └────────────────┘     └─────────────┘
//!                              │                     │
//!                              ▼                     ▼
//!                      ┌────────────────┐     ┌─────────────┐
//!                      │   Comparers    │     │  Scheduler  │
//!                      └────────────────┘     └─────────────┘
//!                                                    │
//!                                                    ▼
//!                                            ┌─────────────┐
//!                                            │ SQL Gen     │
//!                                            └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use pgdelta_migrate::{MigrationGenerator, SchemaDiffer};
//!
//! let changes = SchemaDiffer::default().diff_sdl(
//!     "",
//!     "CREATE TABLE users(id SERIAL PRIMARY KEY, name TEXT NOT NULL);",
//! )?;
//! println!("{}", changes.summary());
//!
//! let sql = MigrationGenerator::default().generate(&changes)?;
//! print!("{}", sql);
//! ```

mod catalog;
pub mod compare;
pub mod diff;
pub mod error;
pub mod graph;
pub mod sql;

pub use compare::{
    FunctionChangeKind, FunctionComparer, FunctionComparison, QueryClause, ViewComparer,
    ViewComparison,
};
pub use diff::{
    ChangeSet, CheckConstraintChange, ColumnChange, CommentDiff, DiffAction, ElementChange,
    ForeignKeyChange, FunctionChange, IndexChange, MaterializedViewChange, ObjectChange,
    OwnershipChange, PartitionChange, RuleChange, SchemaDiffer, TableChange, TriggerChange,
    ViewChange,
};
pub use error::{MigrateResult, MigrationError};
pub use graph::{DependencyGraph, ObjectId, Schedule, Scheduler, order};
pub use sql::MigrationGenerator;
