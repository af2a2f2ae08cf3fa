//! Tables and the objects they own.

use serde::{Deserialize, Serialize};

use super::Sequence;

/// A table definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name.
    pub name: String,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Indexes, including primary key and unique constraints.
    pub indexes: Vec<Index>,
    /// Foreign key constraints.
    pub foreign_keys: Vec<ForeignKey>,
    /// Check constraints in declaration order.
    pub check_constraints: Vec<CheckConstraint>,
    /// Triggers defined on the table.
    pub triggers: Vec<Trigger>,
    /// Rewrite rules defined on the table.
    pub rules: Vec<RewriteRule>,
    /// Partition key, e.g. `RANGE (created_at)`.
    pub partition_key: Option<String>,
    /// Attached partitions.
    pub partitions: Vec<Partition>,
    /// Sequences owned by serial and identity columns.
    pub sequences: Vec<Sequence>,
    /// Table comment.
    pub comment: Option<String>,
}

impl Table {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get a mutable column by name.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Get an index by name.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    /// The primary key index, if any.
    pub fn primary_key(&self) -> Option<&Index> {
        self.indexes.iter().find(|i| i.primary)
    }

    /// The sequence owned by `column`, if any.
    pub fn owned_sequence(&self, column: &str) -> Option<&Sequence> {
        self.sequences
            .iter()
            .find(|s| s.owner_column.as_deref() == Some(column))
    }

    /// Whether any constraint, index, trigger or rule uses `name`.
    pub fn has_constraint_named(&self, name: &str) -> bool {
        self.indexes.iter().any(|i| i.name == name)
            || self.foreign_keys.iter().any(|f| f.name == name)
            || self.check_constraints.iter().any(|c| c.name == name)
    }

    /// Whether a partition named `name` exists anywhere below this table.
    pub fn has_partition(&self, name: &str) -> bool {
        self.partitions.iter().any(|p| p.contains(name))
    }

    /// Find a partition anywhere below this table.
    pub fn find_partition_mut(&mut self, name: &str) -> Option<&mut Partition> {
        self.partitions.iter_mut().find_map(|p| p.find_mut(name))
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Normalized type, e.g. `character varying(255)`.
    pub data_type: String,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Default value.
    pub default: Option<ColumnDefault>,
    /// Identity generation mode.
    pub identity: IdentityGeneration,
    /// Expression of a `GENERATED ALWAYS AS (...) STORED` column.
    pub generated: Option<String>,
    /// Explicit collation.
    pub collation: Option<String>,
    /// Column comment.
    pub comment: Option<String>,
}

impl Column {
    /// Create a nullable column with the given type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            default: None,
            identity: IdentityGeneration::None,
            generated: None,
            collation: None,
            comment: None,
        }
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, default: ColumnDefault) -> Self {
        self.default = Some(default);
        self
    }
}

/// A column default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ColumnDefault {
    /// `DEFAULT NULL`.
    Null,
    /// A constant: string, number or boolean literal, optionally cast.
    Literal(String),
    /// Any other expression.
    Expression(String),
}

impl ColumnDefault {
    /// Classify default expression text.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.eq_ignore_ascii_case("null") {
            return Self::Null;
        }

        let value = text.split("::").next().unwrap_or(text).trim();
        let unprefixed = value.strip_prefix(['e', 'E']).unwrap_or(value);
        let is_string = unprefixed.len() > 1 && unprefixed.starts_with('\'') && value.ends_with('\'');
        let is_number = value
            .strip_prefix('-')
            .unwrap_or(value)
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.')
            && !value.is_empty()
            && value != "-";
        let is_bool = value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false");

        if is_string || is_number || is_bool {
            Self::Literal(text.to_string())
        } else {
            Self::Expression(text.to_string())
        }
    }

    /// SQL text of the default.
    pub fn to_sql(&self) -> &str {
        match self {
            Self::Null => "NULL",
            Self::Literal(s) | Self::Expression(s) => s,
        }
    }
}

/// Identity column mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityGeneration {
    /// Not an identity column.
    #[default]
    None,
    /// `GENERATED ALWAYS AS IDENTITY`.
    Always,
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    ByDefault,
}

impl IdentityGeneration {
    /// SQL keyword for the mode, if any.
    pub fn to_sql(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Always => Some("ALWAYS"),
            Self::ByDefault => Some("BY DEFAULT"),
        }
    }
}

/// An index, primary key or unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    /// Index or constraint name.
    pub name: String,
    /// Key expressions: column names or expression text.
    pub expressions: Vec<String>,
    /// Descending flag per expression.
    pub descending: Vec<bool>,
    /// UNIQUE index or constraint.
    pub unique: bool,
    /// PRIMARY KEY.
    pub primary: bool,
    /// Created by a constraint clause rather than CREATE INDEX.
    pub is_constraint: bool,
    /// Access method.
    pub method: String,
    /// Partial index predicate.
    pub predicate: Option<String>,
    /// INCLUDE columns.
    pub include: Vec<String>,
    /// Index comment.
    pub comment: Option<String>,
}

impl Index {
    /// Create a plain btree index.
    pub fn new(name: impl Into<String>, expressions: Vec<String>) -> Self {
        let descending = vec![false; expressions.len()];
        Self {
            name: name.into(),
            expressions,
            descending,
            unique: false,
            primary: false,
            is_constraint: false,
            method: "btree".to_string(),
            predicate: None,
            include: Vec::new(),
            comment: None,
        }
    }

    /// Create a primary key constraint index.
    pub fn primary_key(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            unique: true,
            primary: true,
            is_constraint: true,
            ..Self::new(name, columns)
        }
    }

    /// Create a unique constraint index.
    pub fn unique_constraint(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            unique: true,
            is_constraint: true,
            ..Self::new(name, columns)
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Constraint name.
    pub name: String,
    /// Local columns.
    pub columns: Vec<String>,
    /// Referenced schema.
    pub referenced_schema: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced columns. Empty means the referenced primary key.
    pub referenced_columns: Vec<String>,
    /// ON DELETE action.
    pub on_delete: ReferentialAction,
    /// ON UPDATE action.
    pub on_update: ReferentialAction,
    /// MATCH type.
    pub match_type: MatchType,
    /// Constraint comment.
    pub comment: Option<String>,
}

/// Referential action for ON DELETE / ON UPDATE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferentialAction {
    /// NO ACTION.
    #[default]
    NoAction,
    /// RESTRICT.
    Restrict,
    /// CASCADE.
    Cascade,
    /// SET NULL.
    SetNull,
    /// SET DEFAULT.
    SetDefault,
}

impl ReferentialAction {
    /// Parse action text such as `set null`.
    pub fn parse(text: &str) -> Self {
        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| w.to_ascii_uppercase())
            .collect();
        match words.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["CASCADE", ..] => Self::Cascade,
            ["RESTRICT", ..] => Self::Restrict,
            ["SET", "NULL", ..] => Self::SetNull,
            ["SET", "DEFAULT", ..] => Self::SetDefault,
            _ => Self::NoAction,
        }
    }

    /// SQL keyword(s) for the action.
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::NoAction => "NO ACTION",
            Self::Restrict => "RESTRICT",
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// MATCH type of a foreign key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// MATCH SIMPLE.
    #[default]
    Simple,
    /// MATCH FULL.
    Full,
    /// MATCH PARTIAL.
    Partial,
}

impl MatchType {
    /// Parse a match keyword.
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "FULL" => Self::Full,
            "PARTIAL" => Self::Partial,
            _ => Self::Simple,
        }
    }

    /// SQL keyword for the match type.
    pub fn to_sql(&self) -> &'static str {
        match self {
            Self::Simple => "SIMPLE",
            Self::Full => "FULL",
            Self::Partial => "PARTIAL",
        }
    }
}

/// A CHECK constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckConstraint {
    /// Constraint name.
    pub name: String,
    /// Boolean expression text, without the surrounding parentheses.
    pub expression: String,
    /// NO INHERIT.
    pub no_inherit: bool,
    /// Constraint comment.
    pub comment: Option<String>,
}

impl CheckConstraint {
    /// Create a check constraint.
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            no_inherit: false,
            comment: None,
        }
    }
}

/// A trigger on a table, view or materialized view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// Trigger name.
    pub name: String,
    /// BEFORE, AFTER or INSTEAD OF.
    pub timing: String,
    /// Events, e.g. `INSERT`, `UPDATE OF email`.
    pub events: Vec<String>,
    /// FOR EACH ROW (otherwise FOR EACH STATEMENT).
    pub for_each_row: bool,
    /// Trigger function, schema-qualified when written that way.
    pub function: String,
    /// Full CREATE TRIGGER statement.
    pub definition: String,
    /// Trigger comment.
    pub comment: Option<String>,
}

/// A rewrite rule on a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Rule name.
    pub name: String,
    /// SELECT, INSERT, UPDATE or DELETE.
    pub event: String,
    /// Full CREATE RULE statement.
    pub definition: String,
}

/// A partition of a partitioned table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition table name.
    pub name: String,
    /// Schema of the partition table.
    pub schema: String,
    /// Bound clause, e.g. `FOR VALUES FROM ('2024-01-01') TO ('2025-01-01')`.
    pub bound: String,
    /// Partition key of the parent this partition belongs to.
    pub parent_key: Option<String>,
    /// Partition key when the partition is itself partitioned.
    pub partition_key: Option<String>,
    /// Sub-partitions.
    pub partitions: Vec<Partition>,
}

impl Partition {
    fn contains(&self, name: &str) -> bool {
        self.name == name || self.partitions.iter().any(|p| p.contains(name))
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Partition> {
        if self.name == name {
            return Some(self);
        }
        self.partitions.iter_mut().find_map(|p| p.find_mut(name))
    }
}
