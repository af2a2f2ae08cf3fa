//! Per-object view of a schema, keyed for diffing.
//!
//! A [`Catalog`] holds one entry per diffable object: the DDL fragment that
//! creates it plus the structured object. It is built either from an
//! extracted [`Database`] (fragments re-serialized by the writer) or
//! directly from SDL text, where statements are grouped per object and only
//! each group is extracted; fragments then keep the source text.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use pgdelta_schema::model::{
    Database, EnumType, Extension, Function, FunctionParameter, MaterializedView, ObjectKind,
    ParameterMode, RewriteRule, RoutineKind, Schema, Sequence, Table, Trigger, View,
};
use pgdelta_schema::parser::{
    CommentTarget, QualifiedName, Statement, StatementKind, TableConstraintKind, parse_statements,
};
use pgdelta_schema::{SchemaError, extract_statements, writer};
use tracing::{debug, trace, warn};

use crate::compare::normalize_type_in;
use crate::error::MigrateResult;

/// `(schema, name)`.
pub(crate) type Key = (String, String);

/// `(schema, relation, name)` for objects that live on a relation.
pub(crate) type RelationKey = (String, String, String);

/// One object: its CREATE fragment and structured form.
#[derive(Debug, Clone)]
pub(crate) struct Entry<T> {
    pub fragment: String,
    pub meta: T,
}

impl<T> Entry<T> {
    fn new(fragment: impl Into<String>, meta: T) -> Self {
        Self {
            fragment: fragment.into(),
            meta,
        }
    }
}

/// Identity of a commented object.
///
/// Schemas use their name as both `schema` and `object`; extensions have an
/// empty `schema`. Columns, constraints and triggers name their table in
/// `object` and themselves in `sub`. Routines use their signature as `object`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CommentKey {
    pub kind: ObjectKind,
    pub schema: String,
    pub object: String,
    pub sub: Option<String>,
}

impl CommentKey {
    fn new(kind: ObjectKind, schema: &str, object: &str) -> Self {
        Self {
            kind,
            schema: schema.to_string(),
            object: object.to_string(),
            sub: None,
        }
    }

    fn on(kind: ObjectKind, schema: &str, object: &str, sub: &str) -> Self {
        Self {
            sub: Some(sub.to_string()),
            ..Self::new(kind, schema, object)
        }
    }
}

fn routine_kind(kind: RoutineKind) -> ObjectKind {
    match kind {
        RoutineKind::Function => ObjectKind::Function,
        RoutineKind::Procedure => ObjectKind::Procedure,
    }
}

/// Every diffable object of one side of a diff.
#[derive(Debug, Clone, Default)]
pub(crate) struct Catalog {
    pub default_schema: String,
    pub schemas: IndexMap<String, Entry<Schema>>,
    pub extensions: IndexMap<String, Entry<Extension>>,
    pub enums: IndexMap<Key, Entry<EnumType>>,
    pub sequences: IndexMap<Key, Entry<Sequence>>,
    pub tables: IndexMap<Key, Entry<Table>>,
    pub views: IndexMap<Key, Entry<View>>,
    pub materialized_views: IndexMap<Key, Entry<MaterializedView>>,
    /// Keyed by `(schema, signature)`.
    pub functions: IndexMap<Key, Entry<Function>>,
    pub triggers: IndexMap<RelationKey, Entry<Trigger>>,
    pub rules: IndexMap<RelationKey, Entry<RewriteRule>>,
    pub comments: IndexMap<CommentKey, String>,
}

fn key(schema: &str, name: &str) -> Key {
    (schema.to_string(), name.to_string())
}

fn relation_key(schema: &str, relation: &str, name: &str) -> RelationKey {
    (schema.to_string(), relation.to_string(), name.to_string())
}

impl Catalog {
    fn empty(default_schema: &str) -> Self {
        Self {
            default_schema: default_schema.to_string(),
            ..Default::default()
        }
    }

    fn register_schema(&mut self, name: &str) {
        if !self.schemas.contains_key(name) {
            self.schemas
                .insert(name.to_string(), Entry::new(writer::create_schema(name), Schema::new(name)));
        }
    }

    // =========================================================================
    // Model mode
    // =========================================================================

    /// Build a catalog from an extracted model.
    pub fn from_database(db: &Database) -> Self {
        let default_schema = db.default_schema.as_str();
        let mut catalog = Self::empty(default_schema);

        for extension in db.extensions.values() {
            catalog.extensions.insert(
                extension.name.clone(),
                Entry::new(writer::create_extension(extension), extension.clone()),
            );
        }

        for (name, schema) in &db.schemas {
            let name = name.as_str();
            let mut meta = Schema::new(name);
            meta.comment = schema.comment.clone();
            catalog
                .schemas
                .insert(name.to_string(), Entry::new(writer::create_schema(name), meta));

            for e in schema.enum_types.values() {
                catalog.enums.insert(
                    key(name, &e.name),
                    Entry::new(writer::create_enum_type(name, e), e.clone()),
                );
            }
            for s in schema.sequences.values() {
                catalog.sequences.insert(
                    key(name, &s.name),
                    Entry::new(writer::create_sequence(name, s), s.clone()),
                );
            }
            for table in schema.tables.values() {
                catalog.tables.insert(
                    key(name, &table.name),
                    Entry::new(table_fragment(name, table, default_schema), table.clone()),
                );
                for trigger in &table.triggers {
                    catalog.add_trigger(name, &table.name, trigger);
                }
                for rule in &table.rules {
                    catalog.rules.insert(
                        relation_key(name, &table.name, &rule.name),
                        Entry::new(rule.definition.clone(), rule.clone()),
                    );
                }
            }
            for view in schema.views.values() {
                catalog.views.insert(
                    key(name, &view.name),
                    Entry::new(writer::create_view(name, view), view.clone()),
                );
                for trigger in &view.triggers {
                    catalog.add_trigger(name, &view.name, trigger);
                }
            }
            for view in schema.materialized_views.values() {
                let mut statements = vec![writer::create_materialized_view(name, view)];
                statements.extend(
                    view.indexes
                        .iter()
                        .map(|i| writer::create_index(name, &view.name, i)),
                );
                catalog.materialized_views.insert(
                    key(name, &view.name),
                    Entry::new(statements.join(";\n"), view.clone()),
                );
                for trigger in &view.triggers {
                    catalog.add_trigger(name, &view.name, trigger);
                }
            }
            for function in schema.functions.values() {
                catalog.functions.insert(
                    key(name, &function.signature),
                    Entry::new(writer::create_function(function), function.clone()),
                );
            }
        }

        catalog.collect_comments(db);
        catalog
    }

    fn add_trigger(&mut self, schema: &str, relation: &str, trigger: &Trigger) {
        self.triggers.insert(
            relation_key(schema, relation, &trigger.name),
            Entry::new(trigger.definition.clone(), trigger.clone()),
        );
    }

    fn collect_comments(&mut self, db: &Database) {
        let mut comments = IndexMap::new();
        let mut push = |key: CommentKey, comment: &Option<String>| {
            if let Some(text) = comment {
                comments.insert(key, text.clone());
            }
        };

        for extension in db.extensions.values() {
            push(CommentKey::new(ObjectKind::Extension, "", &extension.name), &extension.comment);
        }

        for (name, schema) in &db.schemas {
            let s = name.as_str();
            push(CommentKey::new(ObjectKind::Schema, s, s), &schema.comment);

            for e in schema.enum_types.values() {
                push(CommentKey::new(ObjectKind::Type, s, &e.name), &e.comment);
            }
            for q in schema.sequences.values() {
                push(CommentKey::new(ObjectKind::Sequence, s, &q.name), &q.comment);
            }
            for table in schema.tables.values() {
                let t = table.name.as_str();
                push(CommentKey::new(ObjectKind::Table, s, t), &table.comment);
                for column in &table.columns {
                    push(CommentKey::on(ObjectKind::Column, s, t, &column.name), &column.comment);
                }
                for index in &table.indexes {
                    let key = if index.is_constraint {
                        CommentKey::on(ObjectKind::Constraint, s, t, &index.name)
                    } else {
                        CommentKey::new(ObjectKind::Index, s, &index.name)
                    };
                    push(key, &index.comment);
                }
                for fk in &table.foreign_keys {
                    push(CommentKey::on(ObjectKind::Constraint, s, t, &fk.name), &fk.comment);
                }
                for check in &table.check_constraints {
                    push(CommentKey::on(ObjectKind::Constraint, s, t, &check.name), &check.comment);
                }
                for trigger in &table.triggers {
                    push(CommentKey::on(ObjectKind::Trigger, s, t, &trigger.name), &trigger.comment);
                }
                for sequence in &table.sequences {
                    push(CommentKey::new(ObjectKind::Sequence, s, &sequence.name), &sequence.comment);
                }
            }
            for view in schema.views.values() {
                push(CommentKey::new(ObjectKind::View, s, &view.name), &view.comment);
                for trigger in &view.triggers {
                    push(
                        CommentKey::on(ObjectKind::Trigger, s, &view.name, &trigger.name),
                        &trigger.comment,
                    );
                }
            }
            for view in schema.materialized_views.values() {
                push(CommentKey::new(ObjectKind::MaterializedView, s, &view.name), &view.comment);
                for index in &view.indexes {
                    push(CommentKey::new(ObjectKind::Index, s, &index.name), &index.comment);
                }
                for trigger in &view.triggers {
                    push(
                        CommentKey::on(ObjectKind::Trigger, s, &view.name, &trigger.name),
                        &trigger.comment,
                    );
                }
            }
            for function in schema.functions.values() {
                push(
                    CommentKey::new(routine_kind(function.kind), s, &function.signature),
                    &function.comment,
                );
            }
        }

        self.comments = comments;
    }

    // =========================================================================
    // Text mode
    // =========================================================================

    /// Build a catalog straight from SDL text.
    pub fn from_sdl(text: &str, default_schema: &str) -> MigrateResult<Self> {
        let statements = parse_statements(text)?;
        debug!(statements = statements.len(), "Building catalog from SDL");

        let grouping = Grouping::new(&statements, default_schema)?;
        let mut catalog = Self::empty(default_schema);
        catalog.register_schema(default_schema);
        for schema in &grouping.declared_schemas {
            catalog.register_schema(schema);
        }

        for statement in &grouping.extensions {
            if let StatementKind::CreateExtension(create) = &statement.kind {
                let extension = Extension {
                    name: create.name.clone(),
                    schema: create.schema.clone(),
                    version: create.version.clone(),
                    comment: None,
                };
                catalog
                    .extensions
                    .insert(create.name.clone(), Entry::new(statement.text.clone(), extension));
            }
        }

        for statement in &grouping.enums {
            if let StatementKind::CreateEnumType(create) = &statement.kind {
                let (schema, name) = grouping.resolve(&create.name);
                catalog.register_schema(&schema);
                let meta = EnumType {
                    name: name.clone(),
                    values: create.values.clone(),
                    comment: None,
                };
                catalog
                    .enums
                    .insert((schema, name), Entry::new(statement.text.clone(), meta));
            }
        }

        for ((schema, name), group) in &grouping.sequences {
            let mini = extract_statements(group, default_schema)?;
            let Some(sequence) = mini.schema(schema).and_then(|s| s.sequences.get(name.as_str()))
            else {
                continue;
            };
            catalog.register_schema(schema);
            catalog.sequences.insert(
                key(schema, name),
                Entry::new(writer::create_sequence(schema, sequence), sequence.clone()),
            );
        }

        for ((schema, name), group) in &grouping.tables {
            let mini = extract_statements(group, default_schema)?;
            let Some(table) = mini.table(schema, name) else {
                trace!(schema = %schema, table = %name, "Table group produced no table");
                continue;
            };
            let fragment = group
                .iter()
                .map(statement_fragment)
                .collect::<Vec<_>>()
                .join(";\n");
            catalog.register_schema(schema);
            catalog
                .tables
                .insert(key(schema, name), Entry::new(fragment, table.clone()));
        }

        for statement in &grouping.views {
            if let StatementKind::CreateView(create) = &statement.kind {
                let (schema, name) = grouping.resolve(&create.name);
                catalog.register_schema(&schema);
                let meta = View {
                    name: name.clone(),
                    definition: create.query.clone(),
                    columns: create.columns.clone(),
                    dependencies: Vec::new(),
                    triggers: Vec::new(),
                    comment: None,
                };
                catalog
                    .views
                    .insert((schema, name), Entry::new(statement.text.clone(), meta));
            }
        }

        for ((schema, name), group) in &grouping.materialized_views {
            let mini = extract_statements(group, default_schema)?;
            let Some(view) = mini
                .schema(schema)
                .and_then(|s| s.materialized_views.get(name.as_str()))
            else {
                continue;
            };
            let fragment = group
                .iter()
                .map(|s| s.text.clone())
                .collect::<Vec<_>>()
                .join(";\n");
            catalog.register_schema(schema);
            catalog
                .materialized_views
                .insert(key(schema, name), Entry::new(fragment, view.clone()));
        }

        for statement in &grouping.functions {
            let mini = extract_statements(std::slice::from_ref(statement), default_schema)?;
            for (schema, s) in &mini.schemas {
                for function in s.functions.values() {
                    catalog.register_schema(schema);
                    catalog.functions.insert(
                        key(schema, &function.signature),
                        Entry::new(statement.text.clone(), function.clone()),
                    );
                }
            }
        }

        for statement in &grouping.triggers {
            if let StatementKind::CreateTrigger(create) = &statement.kind {
                let (schema, relation) = grouping.resolve(&create.table);
                let trigger = Trigger {
                    name: create.name.clone(),
                    timing: create.timing.clone(),
                    events: create.events.clone(),
                    for_each_row: create.for_each_row,
                    function: create.function.to_string(),
                    definition: statement.text.clone(),
                    comment: None,
                };
                catalog.add_trigger(&schema, &relation, &trigger);
            }
        }

        for statement in &grouping.rules {
            if let StatementKind::CreateRule(create) = &statement.kind {
                let (schema, table) = grouping.resolve(&create.table);
                let rule = RewriteRule {
                    name: create.name.clone(),
                    event: create.event.clone(),
                    definition: statement.text.clone(),
                };
                catalog.rules.insert(
                    relation_key(&schema, &table, &create.name),
                    Entry::new(statement.text.clone(), rule),
                );
            }
        }

        for statement in &grouping.comments {
            if let StatementKind::Comment(comment) = &statement.kind {
                catalog.apply_comment(&comment.target, comment.comment.as_deref());
            }
        }

        debug!(
            tables = catalog.tables.len(),
            views = catalog.views.len(),
            functions = catalog.functions.len(),
            "Catalog built from SDL"
        );
        Ok(catalog)
    }

    fn apply_comment(&mut self, target: &CommentTarget, comment: Option<&str>) {
        let Some(key) = self.comment_key(target) else {
            warn!(target = ?target, "Comment target not found, skipping");
            return;
        };
        if !self.has_comment_target(&key) {
            warn!(target = ?target, "Comment target not found, skipping");
            return;
        }
        match comment {
            Some(text) => {
                self.comments.insert(key, text.to_string());
            }
            None => {
                self.comments.shift_remove(&key);
            }
        }
    }

    fn resolve(&self, name: &QualifiedName) -> Key {
        key(name.schema_or(&self.default_schema), &name.name)
    }

    fn comment_key(&self, target: &CommentTarget) -> Option<CommentKey> {
        let simple = |kind: ObjectKind, q: &QualifiedName| {
            let (schema, name) = self.resolve(q);
            CommentKey::new(kind, &schema, &name)
        };
        let on = |kind: ObjectKind, name: &str, table: &QualifiedName| {
            let (schema, table) = self.resolve(table);
            CommentKey::on(kind, &schema, &table, name)
        };

        Some(match target {
            CommentTarget::Schema(name) => CommentKey::new(ObjectKind::Schema, name, name),
            CommentTarget::Extension(name) => CommentKey::new(ObjectKind::Extension, "", name),
            CommentTarget::Table(q) => simple(ObjectKind::Table, q),
            CommentTarget::View(q) => simple(ObjectKind::View, q),
            CommentTarget::MaterializedView(q) => simple(ObjectKind::MaterializedView, q),
            CommentTarget::Sequence(q) => simple(ObjectKind::Sequence, q),
            CommentTarget::Index(q) => simple(ObjectKind::Index, q),
            CommentTarget::Type(q) => simple(ObjectKind::Type, q),
            CommentTarget::Column(column) => on(ObjectKind::Column, &column.column, &column.table),
            CommentTarget::Constraint { name, table } => on(ObjectKind::Constraint, name, table),
            CommentTarget::Trigger { name, table } => on(ObjectKind::Trigger, name, table),
            CommentTarget::Function { name, arguments } => {
                let (schema, routine) = self.resolve(name);
                let function = match arguments {
                    Some(arguments) => {
                        let parameters: Vec<FunctionParameter> = arguments
                            .iter()
                            .map(|a| FunctionParameter {
                                mode: ParameterMode::In,
                                name: None,
                                data_type: normalize_type_in(a, &self.default_schema),
                                default: None,
                            })
                            .collect();
                        let signature = Function::signature_of(&routine, &parameters);
                        &self.functions.get(&key(&schema, &signature))?.meta
                    }
                    None => {
                        let mut overloads = self
                            .functions
                            .iter()
                            .filter(|((s, _), e)| *s == schema && e.meta.name == routine);
                        let (_, first) = overloads.next()?;
                        if overloads.next().is_some() {
                            return None;
                        }
                        &first.meta
                    }
                };
                CommentKey::new(routine_kind(function.kind), &schema, &function.signature)
            }
        })
    }

    /// Whether the object a comment key names exists in this catalog.
    pub fn has_comment_target(&self, key: &CommentKey) -> bool {
        let k = (key.schema.clone(), key.object.clone());
        let sub = key.sub.as_deref().unwrap_or("");
        let tables_in_schema = move || {
            self.tables
                .iter()
                .filter(move |((s, _), _)| *s == key.schema)
                .map(|(_, e)| &e.meta)
        };

        match key.kind {
            ObjectKind::Schema => self.schemas.contains_key(&key.object),
            ObjectKind::Extension => self.extensions.contains_key(&key.object),
            ObjectKind::Type => self.enums.contains_key(&k),
            ObjectKind::Table => self.tables.contains_key(&k),
            ObjectKind::View => self.views.contains_key(&k),
            ObjectKind::MaterializedView => self.materialized_views.contains_key(&k),
            ObjectKind::Function | ObjectKind::Procedure => self
                .functions
                .get(&k)
                .is_some_and(|e| routine_kind(e.meta.kind) == key.kind),
            ObjectKind::Sequence => {
                self.sequences.contains_key(&k)
                    || tables_in_schema()
                        .any(|t| t.sequences.iter().any(|s| s.name == key.object))
            }
            ObjectKind::Index => {
                tables_in_schema().any(|t| t.index(&key.object).is_some())
                    || self
                        .materialized_views
                        .iter()
                        .filter(|((s, _), _)| *s == key.schema)
                        .any(|(_, e)| e.meta.indexes.iter().any(|i| i.name == key.object))
            }
            ObjectKind::Column => self
                .tables
                .get(&k)
                .is_some_and(|e| e.meta.column(sub).is_some()),
            ObjectKind::Constraint => self
                .tables
                .get(&k)
                .is_some_and(|e| e.meta.has_constraint_named(sub)),
            ObjectKind::Trigger => self
                .triggers
                .contains_key(&(key.schema.clone(), key.object.clone(), sub.to_string())),
        }
    }
}

/// Table fragment in model mode: the table, its partitions and plain indexes,
/// then its foreign keys.
fn table_fragment(schema: &str, table: &Table, default_schema: &str) -> String {
    let mut statements = vec![writer::create_table(schema, table, default_schema)];
    statements.extend(
        table
            .partitions
            .iter()
            .flat_map(|p| writer::create_partition(schema, &table.name, p)),
    );
    statements.extend(
        table
            .indexes
            .iter()
            .filter(|i| !i.is_constraint)
            .map(|i| writer::create_index(schema, &table.name, i)),
    );
    statements.extend(table.foreign_keys.iter().map(|fk| {
        writer::add_constraint(schema, &table.name, &writer::foreign_key_clause(fk))
    }));
    statements.join(";\n")
}

/// Source text of a statement, with CREATE TABLE element lists laid out one
/// element per line.
fn statement_fragment(statement: &Statement) -> String {
    match &statement.kind {
        StatementKind::CreateTable(create) if !create.elements.is_empty() => {
            let elements: Vec<&str> = create.elements.iter().map(|e| e.text()).collect();
            writer::format_create_table(&create.head, &elements, &create.tail)
        }
        _ => statement.text.clone(),
    }
}

// =============================================================================
// Statement grouping
// =============================================================================

/// Statements of an SDL document sorted into per-object groups.
struct Grouping {
    default_schema: String,
    declared_schemas: Vec<String>,
    extensions: Vec<Statement>,
    enums: Vec<Statement>,
    sequences: IndexMap<Key, Vec<Statement>>,
    /// Root tables with their indexes, constraints and partitions.
    tables: IndexMap<Key, Vec<Statement>>,
    views: Vec<Statement>,
    materialized_views: IndexMap<Key, Vec<Statement>>,
    functions: Vec<Statement>,
    triggers: Vec<Statement>,
    rules: Vec<Statement>,
    comments: Vec<Statement>,
}

impl Grouping {
    fn new(statements: &[Statement], default_schema: &str) -> MigrateResult<Self> {
        let mut grouping = Self {
            default_schema: default_schema.to_string(),
            declared_schemas: Vec::new(),
            extensions: Vec::new(),
            enums: Vec::new(),
            sequences: IndexMap::new(),
            tables: IndexMap::new(),
            views: Vec::new(),
            materialized_views: IndexMap::new(),
            functions: Vec::new(),
            triggers: Vec::new(),
            rules: Vec::new(),
            comments: Vec::new(),
        };

        // Partition children point at their parent, whether declared with
        // PARTITION OF or attached later.
        let mut parents: HashMap<Key, Key> = HashMap::new();
        let mut declared_tables: IndexSet<Key> = IndexSet::new();
        let mut relations: IndexSet<Key> = IndexSet::new();

        for statement in statements {
            match &statement.kind {
                StatementKind::CreateTable(create) => {
                    let table = grouping.resolve(&create.name);
                    match &create.partition_of {
                        Some(of) => {
                            parents.insert(table.clone(), grouping.resolve(&of.parent));
                        }
                        None => {
                            declared_tables.insert(table.clone());
                        }
                    }
                    relations.insert(table);
                }
                StatementKind::AttachPartition(attach) => {
                    parents.insert(
                        grouping.resolve(&attach.partition),
                        grouping.resolve(&attach.parent),
                    );
                }
                StatementKind::CreateView(create) => {
                    relations.insert(grouping.resolve(&create.name));
                }
                StatementKind::CreateMaterializedView(create) => {
                    let view = grouping.resolve(&create.name);
                    grouping.materialized_views.insert(view.clone(), Vec::new());
                    relations.insert(view);
                }
                _ => {}
            }
        }

        let root = |table: &Key| -> Key {
            let mut current = table.clone();
            let mut hops = 0;
            while let Some(parent) = parents.get(&current) {
                if hops > parents.len() {
                    break;
                }
                current = parent.clone();
                hops += 1;
            }
            current
        };

        for table in &declared_tables {
            if !parents.contains_key(table) {
                grouping.tables.insert(table.clone(), Vec::new());
            }
        }

        for statement in statements {
            grouping.route(statement, &parents, &root, &relations)?;
        }

        Ok(grouping)
    }

    fn resolve(&self, name: &QualifiedName) -> Key {
        key(name.schema_or(&self.default_schema), &name.name)
    }

    fn route(
        &mut self,
        statement: &Statement,
        parents: &HashMap<Key, Key>,
        root: &impl Fn(&Key) -> Key,
        relations: &IndexSet<Key>,
    ) -> MigrateResult<()> {
        match &statement.kind {
            StatementKind::CreateSchema(create) => {
                self.declared_schemas.push(create.name.clone());
            }
            StatementKind::CreateExtension(_) => self.extensions.push(statement.clone()),
            StatementKind::CreateEnumType(_) => self.enums.push(statement.clone()),
            StatementKind::CreateSequence(create) => {
                let sequence = self.resolve(&create.name);
                self.sequences
                    .entry(sequence)
                    .or_default()
                    .push(statement.clone());
            }
            StatementKind::AlterSequenceOwner(alter) => {
                let sequence = self.resolve(&alter.sequence);
                match self.sequences.get_mut(&sequence) {
                    Some(group) => group.push(statement.clone()),
                    None => warn!(sequence = %alter.sequence, "Sequence not found, skipping OWNED BY"),
                }
            }
            StatementKind::CreateTable(create) => {
                let table = self.resolve(&create.name);
                let is_root = create.partition_of.is_none() && !parents.contains_key(&table);
                let target = root(&table);
                match self.tables.get_mut(&target) {
                    Some(group) if is_root => group.insert(0, statement.clone()),
                    Some(group) => group.push(statement.clone()),
                    None => warn!(partition = %create.name, "Partition parent not found, skipping"),
                }
            }
            StatementKind::AttachPartition(attach) => {
                let target = root(&self.resolve(&attach.parent));
                match self.tables.get_mut(&target) {
                    Some(group) => group.push(statement.clone()),
                    None => warn!(parent = %attach.parent, "Partition parent not found, skipping"),
                }
            }
            StatementKind::CreateIndex(create) => {
                let target = self.resolve(&create.table);
                if let Some(group) = self.tables.get_mut(&target) {
                    group.push(statement.clone());
                } else if let Some(group) = self.materialized_views.get_mut(&target) {
                    group.push(statement.clone());
                } else {
                    warn!(index = ?create.name, table = %create.table, "Index target not found, skipping");
                }
            }
            StatementKind::AddConstraint(add) => {
                let target = self.resolve(&add.table);
                match self.tables.get_mut(&target) {
                    Some(group) => group.push(statement.clone()),
                    None => match &add.constraint.kind {
                        TableConstraintKind::PrimaryKey { .. }
                        | TableConstraintKind::ForeignKey { .. } => {
                            return Err(SchemaError::unresolved(
                                "table",
                                format!("{}.{}", target.0, target.1),
                                "ALTER TABLE ... ADD CONSTRAINT targets a table that is not defined",
                            )
                            .into());
                        }
                        _ => warn!(table = %add.table, "Constraint target not found, skipping"),
                    },
                }
            }
            StatementKind::CreateView(_) => self.views.push(statement.clone()),
            StatementKind::CreateMaterializedView(create) => {
                let view = self.resolve(&create.name);
                if let Some(group) = self.materialized_views.get_mut(&view) {
                    group.insert(0, statement.clone());
                }
            }
            StatementKind::CreateFunction(_) => self.functions.push(statement.clone()),
            StatementKind::CreateTrigger(create) => {
                if relations.contains(&self.resolve(&create.table)) {
                    self.triggers.push(statement.clone());
                } else {
                    warn!(trigger = %create.name, table = %create.table, "Trigger target not found, skipping");
                }
            }
            StatementKind::CreateRule(create) => {
                if self.tables.contains_key(&self.resolve(&create.table)) {
                    self.rules.push(statement.clone());
                } else {
                    warn!(rule = %create.name, table = %create.table, "Rule target not found, skipping");
                }
            }
            StatementKind::Comment(_) => self.comments.push(statement.clone()),
            StatementKind::Other => {
                trace!(statement = %statement.text, "Ignoring unsupported statement");
            }
        }
        Ok(())
    }
}
