//! Typed statement tree produced by the DDL parser.
//!
//! Every node that can be regenerated verbatim keeps its exact source text.
//! Identifiers are already folded: bare names are lowercased, quoted names
//! are unquoted.

use serde::{Deserialize, Serialize};

/// A byte range in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Start offset in bytes.
    pub start: usize,
    /// End offset in bytes.
    pub end: usize,
}

impl Span {
    /// Create a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A possibly schema-qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedName {
    /// Schema part, if written.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl QualifiedName {
    /// An unqualified name.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }

    /// A qualified name.
    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            name: name.into(),
        }
    }

    /// Schema part, or `default` when unqualified.
    pub fn schema_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.schema.as_deref().unwrap_or(default)
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// One top-level statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// What the statement is.
    pub kind: StatementKind,
    /// Exact source text, without the terminating semicolon.
    pub text: String,
    /// Location in the document.
    pub span: Span,
}

/// Statement kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StatementKind {
    /// CREATE SCHEMA.
    CreateSchema(CreateSchema),
    /// CREATE TABLE, including PARTITION OF.
    CreateTable(CreateTable),
    /// CREATE INDEX.
    CreateIndex(CreateIndex),
    /// CREATE SEQUENCE.
    CreateSequence(CreateSequence),
    /// CREATE VIEW.
    CreateView(CreateView),
    /// CREATE MATERIALIZED VIEW.
    CreateMaterializedView(CreateView),
    /// CREATE FUNCTION / PROCEDURE.
    CreateFunction(CreateFunction),
    /// CREATE TYPE ... AS ENUM.
    CreateEnumType(CreateEnumType),
    /// CREATE EXTENSION.
    CreateExtension(CreateExtension),
    /// CREATE TRIGGER.
    CreateTrigger(CreateTrigger),
    /// CREATE RULE.
    CreateRule(CreateRule),
    /// ALTER TABLE ... ADD CONSTRAINT.
    AddConstraint(AddConstraint),
    /// ALTER TABLE ... ATTACH PARTITION.
    AttachPartition(AttachPartition),
    /// ALTER SEQUENCE ... OWNED BY.
    AlterSequenceOwner(AlterSequenceOwner),
    /// COMMENT ON.
    Comment(CommentOn),
    /// Anything else; kept as text only.
    Other,
}

impl StatementKind {
    /// Short label for logging and errors.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateSchema(_) => "CREATE SCHEMA",
            Self::CreateTable(_) => "CREATE TABLE",
            Self::CreateIndex(_) => "CREATE INDEX",
            Self::CreateSequence(_) => "CREATE SEQUENCE",
            Self::CreateView(_) => "CREATE VIEW",
            Self::CreateMaterializedView(_) => "CREATE MATERIALIZED VIEW",
            Self::CreateFunction(_) => "CREATE FUNCTION",
            Self::CreateEnumType(_) => "CREATE TYPE",
            Self::CreateExtension(_) => "CREATE EXTENSION",
            Self::CreateTrigger(_) => "CREATE TRIGGER",
            Self::CreateRule(_) => "CREATE RULE",
            Self::AddConstraint(_) => "ALTER TABLE ADD CONSTRAINT",
            Self::AttachPartition(_) => "ALTER TABLE ATTACH PARTITION",
            Self::AlterSequenceOwner(_) => "ALTER SEQUENCE OWNED BY",
            Self::Comment(_) => "COMMENT ON",
            Self::Other => "other",
        }
    }
}

// =============================================================================
// Schemas and tables
// =============================================================================

/// CREATE SCHEMA.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSchema {
    /// Schema name; defaults to the authorization role when omitted.
    pub name: String,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
}

/// CREATE TABLE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTable {
    /// Table name.
    pub name: QualifiedName,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
    /// Columns, constraints and LIKE clauses in order.
    pub elements: Vec<TableElement>,
    /// Set for `PARTITION OF parent FOR VALUES ...`.
    pub partition_of: Option<PartitionOf>,
    /// `PARTITION BY` key.
    pub partition_by: Option<PartitionKey>,
    /// Source text before the element list, e.g. `CREATE TABLE users`.
    pub head: String,
    /// Source text after the element list, e.g. `PARTITION BY RANGE (x)`.
    pub tail: String,
}

/// The parent side of `PARTITION OF`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionOf {
    /// Parent table.
    pub parent: QualifiedName,
    /// Bound clause text, e.g. `FOR VALUES IN ('eu')` or `DEFAULT`.
    pub bound: String,
}

/// A `PARTITION BY` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionKey {
    /// RANGE, LIST or HASH.
    pub strategy: String,
    /// Key expression text, without the outer parentheses.
    pub columns: String,
}

impl std::fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.strategy, self.columns)
    }
}

/// An item inside the table body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableElement {
    /// Column definition.
    Column(ColumnDef),
    /// Table constraint.
    Constraint(TableConstraint),
    /// `LIKE other_table ...`.
    Like {
        /// Source text.
        text: String,
    },
}

impl TableElement {
    /// Exact source text of the element.
    pub fn text(&self) -> &str {
        match self {
            Self::Column(c) => &c.text,
            Self::Constraint(c) => &c.text,
            Self::Like { text } => text,
        }
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Type as written; absent only in partition column options.
    pub data_type: Option<String>,
    /// Inline constraints in order.
    pub constraints: Vec<ColumnConstraint>,
    /// Source text.
    pub text: String,
}

/// An inline column constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConstraint {
    /// Explicit constraint name.
    pub name: Option<String>,
    /// Constraint kind.
    pub kind: ColumnConstraintKind,
}

/// Inline column constraint kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnConstraintKind {
    /// NOT NULL.
    NotNull,
    /// NULL.
    Null,
    /// DEFAULT expression.
    Default(String),
    /// GENERATED ... AS IDENTITY.
    Identity {
        /// ALWAYS (otherwise BY DEFAULT).
        always: bool,
        /// Sequence options.
        options: Vec<SequenceOption>,
    },
    /// GENERATED ALWAYS AS (expr) STORED.
    Generated(String),
    /// PRIMARY KEY.
    PrimaryKey {
        /// INCLUDE columns.
        include: Vec<String>,
    },
    /// UNIQUE.
    Unique {
        /// NULLS NOT DISTINCT.
        nulls_not_distinct: bool,
    },
    /// CHECK (expr).
    Check {
        /// Expression without the outer parentheses.
        expression: String,
        /// NO INHERIT.
        no_inherit: bool,
    },
    /// REFERENCES.
    References(ForeignKeyTarget),
    /// COLLATE.
    Collate(String),
    /// DEFERRABLE / INITIALLY clauses.
    Deferrable(String),
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConstraint {
    /// Explicit constraint name.
    pub name: Option<String>,
    /// Constraint kind.
    pub kind: TableConstraintKind,
    /// Source text.
    pub text: String,
}

/// Table-level constraint kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableConstraintKind {
    /// PRIMARY KEY (cols).
    PrimaryKey {
        /// Key columns.
        columns: Vec<String>,
        /// INCLUDE columns.
        include: Vec<String>,
    },
    /// UNIQUE (cols).
    Unique {
        /// Key columns.
        columns: Vec<String>,
        /// INCLUDE columns.
        include: Vec<String>,
        /// NULLS NOT DISTINCT.
        nulls_not_distinct: bool,
    },
    /// CHECK (expr).
    Check {
        /// Expression without the outer parentheses.
        expression: String,
        /// NO INHERIT.
        no_inherit: bool,
    },
    /// FOREIGN KEY (cols) REFERENCES ...
    ForeignKey {
        /// Local columns.
        columns: Vec<String>,
        /// Referenced side.
        target: ForeignKeyTarget,
    },
    /// EXCLUDE ...
    Exclude {
        /// Definition text after `EXCLUDE`.
        definition: String,
    },
}

/// The referenced side of a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKeyTarget {
    /// Referenced table.
    pub table: QualifiedName,
    /// Referenced columns; empty means the primary key.
    pub columns: Vec<String>,
    /// ON DELETE action text, uppercased.
    pub on_delete: Option<String>,
    /// ON UPDATE action text, uppercased.
    pub on_update: Option<String>,
    /// MATCH type, uppercased.
    pub match_type: Option<String>,
}

// =============================================================================
// Indexes and sequences
// =============================================================================

/// CREATE INDEX.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateIndex {
    /// Index name; generated when omitted.
    pub name: Option<String>,
    /// UNIQUE.
    pub unique: bool,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
    /// Indexed table or materialized view.
    pub table: QualifiedName,
    /// Access method, lowercased.
    pub method: Option<String>,
    /// Key expressions.
    pub keys: Vec<IndexKey>,
    /// INCLUDE columns.
    pub include: Vec<String>,
    /// WHERE predicate text.
    pub predicate: Option<String>,
}

/// One index key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexKey {
    /// Column name, function call or parenthesized expression.
    pub expression: String,
    /// DESC.
    pub descending: bool,
    /// Source text.
    pub text: String,
}

/// CREATE SEQUENCE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSequence {
    /// Sequence name.
    pub name: QualifiedName,
    /// IF NOT EXISTS.
    pub if_not_exists: bool,
    /// Options in order.
    pub options: Vec<SequenceOption>,
}

/// A sequence option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceOption {
    /// AS type.
    DataType(String),
    /// INCREMENT BY.
    Increment(i64),
    /// MINVALUE n, or NO MINVALUE.
    MinValue(Option<i64>),
    /// MAXVALUE n, or NO MAXVALUE.
    MaxValue(Option<i64>),
    /// START WITH.
    Start(i64),
    /// CACHE.
    Cache(i64),
    /// CYCLE / NO CYCLE.
    Cycle(bool),
    /// OWNED BY table.column, or OWNED BY NONE.
    OwnedBy(Option<ColumnRef>),
    /// SEQUENCE NAME (identity columns only).
    Name(QualifiedName),
}

/// ALTER SEQUENCE ... OWNED BY.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterSequenceOwner {
    /// Sequence.
    pub sequence: QualifiedName,
    /// Owning column; `None` for OWNED BY NONE.
    pub owner: Option<ColumnRef>,
}

/// A `table.column` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Table.
    pub table: QualifiedName,
    /// Column name.
    pub column: String,
}

// =============================================================================
// Views and routines
// =============================================================================

/// CREATE VIEW / CREATE MATERIALIZED VIEW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateView {
    /// View name.
    pub name: QualifiedName,
    /// OR REPLACE.
    pub or_replace: bool,
    /// Explicit column names.
    pub columns: Vec<String>,
    /// Query text.
    pub query: String,
    /// WITH [NO] DATA; always true for plain views.
    pub with_data: bool,
}

/// CREATE FUNCTION / PROCEDURE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateFunction {
    /// Routine name.
    pub name: QualifiedName,
    /// FUNCTION or PROCEDURE.
    pub kind: crate::model::RoutineKind,
    /// OR REPLACE.
    pub or_replace: bool,
    /// Parameters in order.
    pub parameters: Vec<FunctionParam>,
    /// Return type as written, e.g. `SETOF users` or `TABLE (id integer)`.
    pub returns: Option<String>,
    /// LANGUAGE, lowercased.
    pub language: Option<String>,
    /// Routine options other than LANGUAGE and the body, uppercased and
    /// keyed by option name, e.g. `("VOLATILITY", "IMMUTABLE")`.
    pub options: Vec<(String, String)>,
    /// Body with its quoting stripped.
    pub body: Option<String>,
}

impl CreateFunction {
    /// Value of a routine option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A routine parameter as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParam {
    /// Mode.
    pub mode: crate::model::ParameterMode,
    /// Name.
    pub name: Option<String>,
    /// Type as written.
    pub data_type: String,
    /// Default expression text.
    pub default: Option<String>,
}

/// CREATE TYPE ... AS ENUM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEnumType {
    /// Type name.
    pub name: QualifiedName,
    /// Labels in order, unquoted.
    pub values: Vec<String>,
}

/// CREATE EXTENSION.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateExtension {
    /// Extension name.
    pub name: String,
    /// SCHEMA.
    pub schema: Option<String>,
    /// VERSION.
    pub version: Option<String>,
}

/// CREATE TRIGGER.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTrigger {
    /// Trigger name.
    pub name: String,
    /// Table, view or materialized view.
    pub table: QualifiedName,
    /// BEFORE, AFTER or INSTEAD OF.
    pub timing: String,
    /// Events, uppercased keywords with column lists kept.
    pub events: Vec<String>,
    /// FOR EACH ROW.
    pub for_each_row: bool,
    /// Trigger function.
    pub function: QualifiedName,
    /// CREATE CONSTRAINT TRIGGER.
    pub constraint: bool,
}

/// CREATE RULE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRule {
    /// Rule name.
    pub name: String,
    /// SELECT, INSERT, UPDATE or DELETE.
    pub event: String,
    /// Table the rule is attached to.
    pub table: QualifiedName,
}

// =============================================================================
// ALTER and COMMENT
// =============================================================================

/// ALTER TABLE ... ADD CONSTRAINT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddConstraint {
    /// Table.
    pub table: QualifiedName,
    /// Constraint.
    pub constraint: TableConstraint,
}

/// ALTER TABLE ... ATTACH PARTITION.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachPartition {
    /// Partitioned table.
    pub parent: QualifiedName,
    /// Table being attached.
    pub partition: QualifiedName,
    /// Bound clause text.
    pub bound: String,
}

/// COMMENT ON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentOn {
    /// Commented object.
    pub target: CommentTarget,
    /// Comment text; `None` for `IS NULL`.
    pub comment: Option<String>,
}

/// Objects a comment can be attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommentTarget {
    /// TABLE.
    Table(QualifiedName),
    /// VIEW.
    View(QualifiedName),
    /// MATERIALIZED VIEW.
    MaterializedView(QualifiedName),
    /// SEQUENCE.
    Sequence(QualifiedName),
    /// INDEX.
    Index(QualifiedName),
    /// TYPE.
    Type(QualifiedName),
    /// SCHEMA.
    Schema(String),
    /// EXTENSION.
    Extension(String),
    /// COLUMN table.column.
    Column(ColumnRef),
    /// FUNCTION / PROCEDURE.
    Function {
        /// Routine name.
        name: QualifiedName,
        /// Argument types as written; `None` when the list was omitted.
        arguments: Option<Vec<String>>,
    },
    /// CONSTRAINT name ON table.
    Constraint {
        /// Constraint name.
        name: String,
        /// Table.
        table: QualifiedName,
    },
    /// TRIGGER name ON table.
    Trigger {
        /// Trigger name.
        name: String,
        /// Table.
        table: QualifiedName,
    },
}
