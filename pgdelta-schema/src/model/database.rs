//! Top-level database model.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::{EnumType, Extension, Function, MaterializedView, Sequence, Table, View};

/// A complete database: schemas plus database-wide objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Schema that unqualified names resolve to.
    pub default_schema: String,
    /// Schemas by name, in first-reference order.
    pub schemas: IndexMap<SmolStr, Schema>,
    /// Extensions by name.
    pub extensions: IndexMap<SmolStr, Extension>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new("public")
    }
}

impl Database {
    /// Create a database containing only the default schema.
    pub fn new(default_schema: impl Into<String>) -> Self {
        let default_schema = default_schema.into();
        let mut schemas = IndexMap::new();
        schemas.insert(
            SmolStr::new(&default_schema),
            Schema::new(default_schema.clone()),
        );
        Self {
            default_schema,
            schemas,
            extensions: IndexMap::new(),
        }
    }

    /// Get a schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Get a mutable schema by name.
    pub fn schema_mut(&mut self, name: &str) -> Option<&mut Schema> {
        self.schemas.get_mut(name)
    }

    /// Get a schema, registering it on first reference.
    pub fn ensure_schema(&mut self, name: &str) -> &mut Schema {
        self.schemas
            .entry(SmolStr::new(name))
            .or_insert_with(|| Schema::new(name))
    }

    /// Look up a table.
    pub fn table(&self, schema: &str, name: &str) -> Option<&Table> {
        self.schema(schema).and_then(|s| s.tables.get(name))
    }

    /// Look up a view.
    pub fn view(&self, schema: &str, name: &str) -> Option<&View> {
        self.schema(schema).and_then(|s| s.views.get(name))
    }

    /// Total number of tables across all schemas.
    pub fn table_count(&self) -> usize {
        self.schemas.values().map(|s| s.tables.len()).sum()
    }

    /// Whether the database holds no objects beyond empty schemas.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty() && self.schemas.values().all(Schema::is_empty)
    }
}

/// A schema namespace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema name.
    pub name: String,
    /// Schema comment.
    pub comment: Option<String>,
    /// Tables by name.
    pub tables: IndexMap<SmolStr, Table>,
    /// Views by name.
    pub views: IndexMap<SmolStr, View>,
    /// Materialized views by name.
    pub materialized_views: IndexMap<SmolStr, MaterializedView>,
    /// Functions and procedures by signature.
    pub functions: IndexMap<SmolStr, Function>,
    /// Standalone sequences by name.
    pub sequences: IndexMap<SmolStr, Sequence>,
    /// Enum types by name.
    pub enum_types: IndexMap<SmolStr, EnumType>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a table, replacing any table of the same name.
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(SmolStr::new(&table.name), table);
    }

    /// Add a view.
    pub fn add_view(&mut self, view: View) {
        self.views.insert(SmolStr::new(&view.name), view);
    }

    /// Add a materialized view.
    pub fn add_materialized_view(&mut self, view: MaterializedView) {
        self.materialized_views
            .insert(SmolStr::new(&view.name), view);
    }

    /// Add a function, keyed by its signature.
    pub fn add_function(&mut self, function: Function) {
        self.functions
            .insert(SmolStr::new(&function.signature), function);
    }

    /// Add a sequence.
    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences
            .insert(SmolStr::new(&sequence.name), sequence);
    }

    /// Add an enum type.
    pub fn add_enum_type(&mut self, enum_type: EnumType) {
        self.enum_types
            .insert(SmolStr::new(&enum_type.name), enum_type);
    }

    /// Whether `name` is a table, view or materialized view here.
    pub fn has_relation(&self, name: &str) -> bool {
        self.tables.contains_key(name)
            || self.views.contains_key(name)
            || self.materialized_views.contains_key(name)
    }

    /// Functions named `name`, across overloads.
    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Function> {
        self.functions.values().filter(move |f| f.name == name)
    }

    /// Whether the schema holds no objects.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.views.is_empty()
            && self.materialized_views.is_empty()
            && self.functions.is_empty()
            && self.sequences.is_empty()
            && self.enum_types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_database_has_default_schema() {
        let db = Database::new("public");
        assert!(db.schema("public").is_some());
        assert!(db.is_empty());
        assert_eq!(db.table_count(), 0);
    }

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let mut db = Database::default();
        db.ensure_schema("app").add_table(Table::new("users"));
        db.ensure_schema("app");

        assert_eq!(db.schemas.len(), 2);
        assert!(db.table("app", "users").is_some());
        assert_eq!(
            db.schemas.keys().map(|k| k.as_str()).collect::<Vec<_>>(),
            vec!["public", "app"]
        );
    }

    #[test]
    fn test_has_relation() {
        let mut schema = Schema::new("public");
        schema.add_table(Table::new("users"));
        schema.add_view(View {
            name: "active_users".into(),
            definition: "SELECT * FROM users".into(),
            columns: vec![],
            dependencies: vec![],
            triggers: vec![],
            comment: None,
        });

        assert!(schema.has_relation("users"));
        assert!(schema.has_relation("active_users"));
        assert!(!schema.has_relation("orders"));
    }
}
