//! In-memory object model of a PostgreSQL database.
//!
//! The model is plain data. Cross-object references (foreign key targets,
//! partition parents, enum-typed columns) are stored as names and resolved
//! by lookup.

mod database;
mod objects;
mod table;
mod types;

pub use database::{Database, Schema};
pub use objects::{
    EnumType, Extension, Function, FunctionParameter, MaterializedView, ObjectKind, ObjectRef,
    ParameterMode, RoutineKind, Sequence, View,
};
pub use table::{
    CheckConstraint, Column, ColumnDefault, ForeignKey, IdentityGeneration, Index, MatchType,
    Partition, ReferentialAction, RewriteRule, Table, Trigger,
};
pub use types::{is_array_type, normalize_type, serial_base, serial_for};
