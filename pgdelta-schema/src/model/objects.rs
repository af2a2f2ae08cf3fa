//! Non-table schema objects.

use serde::{Deserialize, Serialize};

use super::{Index, Trigger};

/// A reference to a relation by schema and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Schema name.
    pub schema: String,
    /// Object name.
    pub name: String,
}

impl ObjectRef {
    /// Create a reference.
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// A sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Sequence name.
    pub name: String,
    /// Value type.
    pub data_type: String,
    /// START WITH.
    pub start: i64,
    /// INCREMENT BY.
    pub increment: i64,
    /// MINVALUE; `None` means the type default.
    pub min_value: Option<i64>,
    /// MAXVALUE; `None` means the type default.
    pub max_value: Option<i64>,
    /// CACHE.
    pub cache: i64,
    /// CYCLE.
    pub cycle: bool,
    /// Owning table, when the sequence is OWNED BY a column.
    pub owner_table: Option<String>,
    /// Owning column.
    pub owner_column: Option<String>,
    /// Sequence comment.
    pub comment: Option<String>,
}

impl Sequence {
    /// Create a sequence with server defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: "bigint".to_string(),
            start: 1,
            increment: 1,
            min_value: None,
            max_value: None,
            cache: 1,
            cycle: false,
            owner_table: None,
            owner_column: None,
            comment: None,
        }
    }

    /// Set the owning table and column.
    pub fn owned_by(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.owner_table = Some(table.into());
        self.owner_column = Some(column.into());
        self
    }

    /// Whether every option has its default value for the given type.
    pub fn has_default_options(&self, data_type: &str) -> bool {
        self.data_type == data_type
            && self.start == 1
            && self.increment == 1
            && self.min_value.is_none()
            && self.max_value.is_none()
            && self.cache == 1
            && !self.cycle
    }
}

/// An enum type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumType {
    /// Type name.
    pub name: String,
    /// Labels in declaration order.
    pub values: Vec<String>,
    /// Type comment.
    pub comment: Option<String>,
}

/// A view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    /// View name.
    pub name: String,
    /// Query text after `AS`.
    pub definition: String,
    /// Explicit column names.
    pub columns: Vec<String>,
    /// Relations the query reads.
    pub dependencies: Vec<ObjectRef>,
    /// INSTEAD OF triggers.
    pub triggers: Vec<Trigger>,
    /// View comment.
    pub comment: Option<String>,
}

/// A materialized view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedView {
    /// View name.
    pub name: String,
    /// Query text after `AS`.
    pub definition: String,
    /// Explicit column names.
    pub columns: Vec<String>,
    /// WITH DATA (the default) or WITH NO DATA.
    pub with_data: bool,
    /// Relations the query reads.
    pub dependencies: Vec<ObjectRef>,
    /// Indexes.
    pub indexes: Vec<Index>,
    /// Triggers.
    pub triggers: Vec<Trigger>,
    /// View comment.
    pub comment: Option<String>,
}

/// FUNCTION or PROCEDURE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    /// CREATE FUNCTION.
    #[default]
    Function,
    /// CREATE PROCEDURE.
    Procedure,
}

impl RoutineKind {
    /// SQL keyword.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

/// Parameter mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterMode {
    /// IN.
    #[default]
    In,
    /// OUT.
    Out,
    /// INOUT.
    InOut,
    /// VARIADIC.
    Variadic,
}

impl ParameterMode {
    /// Whether the parameter is part of the routine's identity.
    pub fn is_input(&self) -> bool {
        !matches!(self, Self::Out)
    }

    /// SQL keyword.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
            Self::InOut => "INOUT",
            Self::Variadic => "VARIADIC",
        }
    }
}

/// A routine parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionParameter {
    /// Mode.
    pub mode: ParameterMode,
    /// Name, if declared.
    pub name: Option<String>,
    /// Normalized type.
    pub data_type: String,
    /// Default expression.
    pub default: Option<String>,
}

/// A function or procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Routine name.
    pub name: String,
    /// FUNCTION or PROCEDURE.
    pub kind: RoutineKind,
    /// Identity signature, e.g. `add(integer, integer)`.
    pub signature: String,
    /// Parameters in declaration order.
    pub parameters: Vec<FunctionParameter>,
    /// Normalized return type, if any.
    pub return_type: Option<String>,
    /// Implementation language.
    pub language: Option<String>,
    /// Full CREATE statement.
    pub definition: String,
    /// Relations the body reads.
    pub dependencies: Vec<ObjectRef>,
    /// Routine comment.
    pub comment: Option<String>,
}

impl Function {
    /// Build the identity signature from a name and parameter list.
    pub fn signature_of(name: &str, parameters: &[FunctionParameter]) -> String {
        let types: Vec<&str> = parameters
            .iter()
            .filter(|p| p.mode.is_input())
            .map(|p| p.data_type.as_str())
            .collect();
        format!("{}({})", name, types.join(", "))
    }

    /// Argument type list of the signature, e.g. `integer, integer`.
    pub fn argument_types(&self) -> &str {
        self.signature
            .strip_prefix(self.name.as_str())
            .and_then(|s| s.strip_prefix('('))
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or("")
    }
}

/// An installed extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    /// Extension name.
    pub name: String,
    /// Schema it installs into.
    pub schema: Option<String>,
    /// Pinned version.
    pub version: Option<String>,
    /// Extension comment.
    pub comment: Option<String>,
}

/// Kinds of schema objects, as named in DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Schema.
    Schema,
    /// Extension.
    Extension,
    /// Enum type.
    Type,
    /// Sequence.
    Sequence,
    /// Table.
    Table,
    /// Table column.
    Column,
    /// Index.
    Index,
    /// Constraint.
    Constraint,
    /// Trigger.
    Trigger,
    /// View.
    View,
    /// Materialized view.
    MaterializedView,
    /// Function.
    Function,
    /// Procedure.
    Procedure,
}

impl ObjectKind {
    /// Keyword used after `CREATE`, `DROP` and `COMMENT ON`.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Schema => "SCHEMA",
            Self::Extension => "EXTENSION",
            Self::Type => "TYPE",
            Self::Sequence => "SEQUENCE",
            Self::Table => "TABLE",
            Self::Column => "COLUMN",
            Self::Index => "INDEX",
            Self::Constraint => "CONSTRAINT",
            Self::Trigger => "TRIGGER",
            Self::View => "VIEW",
            Self::MaterializedView => "MATERIALIZED VIEW",
            Self::Function => "FUNCTION",
            Self::Procedure => "PROCEDURE",
        }
    }
}

impl From<RoutineKind> for ObjectKind {
    fn from(kind: RoutineKind) -> Self {
        match kind {
            RoutineKind::Function => Self::Function,
            RoutineKind::Procedure => Self::Procedure,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.sql_keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(mode: ParameterMode, data_type: &str) -> FunctionParameter {
        FunctionParameter {
            mode,
            name: None,
            data_type: data_type.to_string(),
            default: None,
        }
    }

    #[test]
    fn test_signature_skips_out_parameters() {
        let params = vec![
            param(ParameterMode::In, "integer"),
            param(ParameterMode::Out, "text"),
            param(ParameterMode::Variadic, "integer[]"),
        ];
        assert_eq!(
            Function::signature_of("f", &params),
            "f(integer, integer[])"
        );
        assert_eq!(Function::signature_of("g", &[]), "g()");
    }

    #[test]
    fn test_argument_types() {
        let f = Function {
            name: "add".into(),
            kind: RoutineKind::Function,
            signature: "add(integer, integer)".into(),
            parameters: vec![],
            return_type: Some("integer".into()),
            language: Some("sql".into()),
            definition: String::new(),
            dependencies: vec![],
            comment: None,
        };
        assert_eq!(f.argument_types(), "integer, integer");
    }

    #[test]
    fn test_sequence_defaults() {
        let seq = Sequence::new("users_id_seq").owned_by("users", "id");
        assert!(seq.has_default_options("bigint"));
        assert!(!seq.has_default_options("integer"));
        assert_eq!(seq.owner_column.as_deref(), Some("id"));
    }

    #[test]
    fn test_object_kind_keywords() {
        assert_eq!(ObjectKind::MaterializedView.to_string(), "MATERIALIZED VIEW");
        assert_eq!(ObjectKind::from(RoutineKind::Procedure), ObjectKind::Procedure);
    }
}
