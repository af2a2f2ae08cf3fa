//! Schema extraction.
//!
//! Walks parsed statements in document order and accumulates a [`Database`].
//! Creates are collected first; statements that attach to other objects
//! (indexes, constraints, triggers, comments, partition attachments) are
//! applied once every relation in the document is known, so their position
//! relative to the target does not matter.
//!
//! ```rust,ignore
//! use pgdelta_schema::extract;
//!
//! let db = extract("CREATE TABLE users (id serial PRIMARY KEY);")?;
//! assert!(db.table("public", "users").is_some());
//! ```

use std::path::Path;

use smol_str::SmolStr;
use tracing::{debug, trace, warn};

use crate::config::DeltaConfig;
use crate::error::{SchemaError, SchemaResult};
use crate::model::{
    CheckConstraint, Column, ColumnDefault, Database, EnumType, Extension, ForeignKey, Function,
    FunctionParameter, IdentityGeneration, Index, MatchType, MaterializedView, ObjectRef,
    ParameterMode, Partition, ReferentialAction, RewriteRule, Sequence, Table, Trigger, View,
    normalize_type, serial_base,
};
use crate::parser::{
    self, AddConstraint, AlterSequenceOwner, AttachPartition, ColumnConstraintKind, ColumnDef,
    CommentOn, CommentTarget, CreateFunction, CreateIndex, CreateRule, CreateTable,
    CreateTrigger, CreateView, ForeignKeyTarget, IndexKey, PartitionOf, QualifiedName,
    SequenceOption, Statement, StatementKind, TableConstraint, TableConstraintKind,
};

/// Extract a schema document using the default configuration.
pub fn extract(text: &str) -> SchemaResult<Database> {
    extract_with_config(text, &DeltaConfig::default())
}

/// Extract a schema document.
pub fn extract_with_config(text: &str, config: &DeltaConfig) -> SchemaResult<Database> {
    let statements = parser::parse_statements(text)?;
    extract_statements(&statements, config.default_schema())
}

/// Extract a schema document from a file.
pub fn extract_file(path: impl AsRef<Path>, config: &DeltaConfig) -> SchemaResult<Database> {
    let statements = parser::parse_statements_file(path)?;
    extract_statements(&statements, config.default_schema())
}

/// Build a [`Database`] from already parsed statements.
pub fn extract_statements(statements: &[Statement], default_schema: &str) -> SchemaResult<Database> {
    debug!(statements = statements.len(), "Extracting schema");
    let db = Extractor::new(default_schema).run(statements)?;
    debug!(
        schemas = db.schemas.len(),
        tables = db.table_count(),
        "Schema extracted"
    );
    Ok(db)
}

// =============================================================================
// Accumulator
// =============================================================================

struct Extractor<'s> {
    default_schema: String,
    db: Database,
    /// `CREATE TABLE ... PARTITION OF` statements awaiting their parent.
    partitions: Vec<PendingPartition<'s>>,
    /// Statements that attach to objects created elsewhere in the document.
    deferred: Vec<&'s Statement>,
    /// Routine bodies, scanned for dependencies once all relations exist.
    routine_bodies: Vec<(String, SmolStr, &'s str)>,
}

struct PendingPartition<'s> {
    schema: String,
    create: &'s CreateTable,
    parent: &'s PartitionOf,
}

impl<'s> Extractor<'s> {
    fn new(default_schema: &str) -> Self {
        Self {
            default_schema: default_schema.to_string(),
            db: Database::new(default_schema),
            partitions: Vec::new(),
            deferred: Vec::new(),
            routine_bodies: Vec::new(),
        }
    }

    fn run(mut self, statements: &'s [Statement]) -> SchemaResult<Database> {
        for statement in statements {
            self.collect(statement)?;
        }

        self.place_partitions();

        for statement in std::mem::take(&mut self.deferred) {
            self.apply_deferred(statement)?;
        }

        self.drop_shadowed_tables();
        self.resolve_dependencies();
        Ok(self.db)
    }

    fn resolve(&self, name: &QualifiedName) -> (String, String) {
        (
            name.schema_or(&self.default_schema).to_string(),
            name.name.clone(),
        )
    }

    fn collect(&mut self, statement: &'s Statement) -> SchemaResult<()> {
        trace!(kind = statement.kind.label(), "Collecting statement");

        match &statement.kind {
            StatementKind::CreateSchema(create) => {
                self.db.ensure_schema(&create.name);
            }
            StatementKind::CreateTable(create) => {
                let (schema, _) = self.resolve(&create.name);
                match &create.partition_of {
                    Some(parent) => self.partitions.push(PendingPartition {
                        schema,
                        create,
                        parent,
                    }),
                    None => {
                        let table = build_table(create, &schema, &self.default_schema)?;
                        self.db.ensure_schema(&schema).add_table(table);
                    }
                }
            }
            StatementKind::CreateSequence(create) => {
                let (schema, name) = self.resolve(&create.name);
                let mut sequence = Sequence::new(name);
                apply_sequence_options(&mut sequence, &create.options, &self.default_schema);
                self.db.ensure_schema(&schema).add_sequence(sequence);
            }
            StatementKind::CreateView(create) => {
                let (schema, name) = self.resolve(&create.name);
                let view = View {
                    name,
                    definition: create.query.clone(),
                    columns: create.columns.clone(),
                    dependencies: Vec::new(),
                    triggers: Vec::new(),
                    comment: None,
                };
                self.db.ensure_schema(&schema).add_view(view);
            }
            StatementKind::CreateMaterializedView(create) => {
                let (schema, view) = self.materialized_view(create);
                self.db.ensure_schema(&schema).add_materialized_view(view);
            }
            StatementKind::CreateFunction(create) => {
                let (schema, _) = self.resolve(&create.name);
                let function = self.function(statement, create);
                if let Some(body) = create.body.as_deref() {
                    self.routine_bodies.push((
                        schema.clone(),
                        SmolStr::new(&function.signature),
                        body,
                    ));
                }
                self.db.ensure_schema(&schema).add_function(function);
            }
            StatementKind::CreateEnumType(create) => {
                let (schema, name) = self.resolve(&create.name);
                self.db.ensure_schema(&schema).add_enum_type(EnumType {
                    name,
                    values: create.values.clone(),
                    comment: None,
                });
            }
            StatementKind::CreateExtension(create) => {
                self.db.extensions.insert(
                    SmolStr::new(&create.name),
                    Extension {
                        name: create.name.clone(),
                        schema: create.schema.clone(),
                        version: create.version.clone(),
                        comment: None,
                    },
                );
            }
            StatementKind::CreateIndex(_)
            | StatementKind::CreateTrigger(_)
            | StatementKind::CreateRule(_)
            | StatementKind::AddConstraint(_)
            | StatementKind::AttachPartition(_)
            | StatementKind::AlterSequenceOwner(_)
            | StatementKind::Comment(_) => self.deferred.push(statement),
            StatementKind::Other => {
                trace!(statement = %statement.text, "Ignoring unsupported statement");
            }
        }

        Ok(())
    }

    fn materialized_view(&self, create: &CreateView) -> (String, MaterializedView) {
        let (schema, name) = self.resolve(&create.name);
        let view = MaterializedView {
            name,
            definition: create.query.clone(),
            columns: create.columns.clone(),
            with_data: create.with_data,
            dependencies: Vec::new(),
            indexes: Vec::new(),
            triggers: Vec::new(),
            comment: None,
        };
        (schema, view)
    }

    fn function(&self, statement: &Statement, create: &CreateFunction) -> Function {
        let parameters: Vec<FunctionParameter> = create
            .parameters
            .iter()
            .map(|p| FunctionParameter {
                mode: p.mode,
                name: p.name.clone(),
                data_type: normalize_in(&p.data_type, &self.default_schema),
                default: p.default.clone(),
            })
            .collect();

        let name = create.name.name.clone();
        Function {
            signature: Function::signature_of(&name, &parameters),
            name,
            kind: create.kind,
            parameters,
            return_type: create
                .returns
                .as_deref()
                .map(|r| normalize_return(r, &self.default_schema)),
            language: create.language.clone(),
            definition: statement.text.clone(),
            dependencies: Vec::new(),
            comment: None,
        }
    }

    // =========================================================================
    // Partitions
    // =========================================================================

    fn place_partitions(&mut self) {
        let mut pending = std::mem::take(&mut self.partitions);

        // Sub-partitions may be declared before their parent partition.
        loop {
            let before = pending.len();
            pending.retain(|p| !self.place_partition(p));
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        for p in pending {
            warn!(
                partition = %p.create.name,
                parent = %p.parent.parent,
                "Partition parent not found, skipping"
            );
        }
    }

    fn place_partition(&mut self, pending: &PendingPartition<'_>) -> bool {
        let (parent_schema, parent_name) = self.resolve(&pending.parent.parent);
        let partition = Partition {
            name: pending.create.name.name.clone(),
            schema: pending.schema.clone(),
            bound: pending.parent.bound.clone(),
            parent_key: None,
            partition_key: pending.create.partition_by.as_ref().map(|k| k.to_string()),
            partitions: Vec::new(),
        };
        self.insert_partition(&parent_schema, &parent_name, partition)
    }

    fn has_partition_parent(&self, schema: &str, parent: &str) -> bool {
        self.db.schema(schema).is_some_and(|s| {
            s.tables.contains_key(parent) || s.tables.values().any(|t| t.has_partition(parent))
        })
    }

    fn insert_partition(&mut self, schema: &str, parent: &str, mut partition: Partition) -> bool {
        let Some(schema) = self.db.schema_mut(schema) else {
            return false;
        };

        if let Some(table) = schema.tables.get_mut(parent) {
            partition.parent_key = table.partition_key.clone();
            debug!(partition = %partition.name, parent = %table.name, "Attached partition");
            table.partitions.push(partition);
            return true;
        }

        for table in schema.tables.values_mut() {
            if let Some(node) = table.find_partition_mut(parent) {
                partition.parent_key = node.partition_key.clone();
                debug!(partition = %partition.name, parent = %node.name, "Attached sub-partition");
                node.partitions.push(partition);
                return true;
            }
        }

        false
    }

    // =========================================================================
    // Deferred statements
    // =========================================================================

    fn apply_deferred(&mut self, statement: &Statement) -> SchemaResult<()> {
        trace!(kind = statement.kind.label(), "Applying statement");

        match &statement.kind {
            StatementKind::CreateIndex(create) => self.apply_index(create),
            StatementKind::AddConstraint(add) => self.apply_constraint(add)?,
            StatementKind::AttachPartition(attach) => self.apply_attach(attach),
            StatementKind::AlterSequenceOwner(alter) => self.apply_sequence_owner(alter),
            StatementKind::CreateTrigger(create) => self.apply_trigger(statement, create),
            StatementKind::CreateRule(create) => self.apply_rule(statement, create),
            StatementKind::Comment(comment) => self.apply_comment(comment),
            _ => {}
        }

        Ok(())
    }

    fn apply_index(&mut self, create: &CreateIndex) {
        let (schema_name, table_name) = self.resolve(&create.table);
        let mut index = Index::new(
            String::new(),
            create.keys.iter().map(|k| k.expression.clone()).collect(),
        );
        index.descending = create.keys.iter().map(|k| k.descending).collect();
        index.unique = create.unique;
        index.include = create.include.clone();
        index.predicate = create.predicate.clone();
        if let Some(method) = &create.method {
            index.method = method.to_ascii_lowercase();
        }
        let base = index_base_name(&table_name, &create.keys);

        let Some(schema) = self.db.schema_mut(&schema_name) else {
            warn!(index = ?create.name, table = %create.table, "Index target not found, skipping");
            return;
        };

        if let Some(table) = schema.tables.get_mut(table_name.as_str()) {
            index.name = match &create.name {
                Some(name) => name.clone(),
                None => unique_name(base, |n| table.has_constraint_named(n)),
            };
            table.indexes.push(index);
        } else if let Some(view) = schema.materialized_views.get_mut(table_name.as_str()) {
            index.name = match &create.name {
                Some(name) => name.clone(),
                None => unique_name(base, |n| view.indexes.iter().any(|i| i.name == n)),
            };
            view.indexes.push(index);
        } else {
            warn!(index = ?create.name, table = %create.table, "Index target not found, skipping");
        }
    }

    fn apply_constraint(&mut self, add: &AddConstraint) -> SchemaResult<()> {
        let (schema, table_name) = self.resolve(&add.table);
        let table = self
            .db
            .schema_mut(&schema)
            .and_then(|s| s.tables.get_mut(table_name.as_str()));

        let Some(table) = table else {
            return match &add.constraint.kind {
                TableConstraintKind::PrimaryKey { .. } | TableConstraintKind::ForeignKey { .. } => {
                    Err(SchemaError::unresolved(
                        "table",
                        format!("{}.{}", schema, table_name),
                        "ALTER TABLE ... ADD CONSTRAINT targets a table that is not defined",
                    ))
                }
                _ => {
                    warn!(table = %add.table, "Constraint target not found, skipping");
                    Ok(())
                }
            };
        };

        add_table_constraint(table, &add.constraint, &self.default_schema);
        mark_primary_key_not_null(table);
        Ok(())
    }

    fn apply_attach(&mut self, attach: &AttachPartition) {
        let (parent_schema, parent_name) = self.resolve(&attach.parent);
        let (child_schema, child_name) = self.resolve(&attach.partition);

        if !self.has_partition_parent(&parent_schema, &parent_name) {
            warn!(parent = %attach.parent, "Partition parent not found, skipping");
            return;
        }

        let child = self
            .db
            .schema_mut(&child_schema)
            .and_then(|s| s.tables.shift_remove(child_name.as_str()));

        let partition = match child {
            Some(table) => Partition {
                name: table.name,
                schema: child_schema,
                bound: attach.bound.clone(),
                parent_key: None,
                partition_key: table.partition_key,
                partitions: table.partitions,
            },
            None => {
                warn!(partition = %attach.partition, "Attached table not defined, recording bound only");
                Partition {
                    name: child_name,
                    schema: child_schema,
                    bound: attach.bound.clone(),
                    parent_key: None,
                    partition_key: None,
                    partitions: Vec::new(),
                }
            }
        };

        self.insert_partition(&parent_schema, &parent_name, partition);
    }

    fn apply_sequence_owner(&mut self, alter: &AlterSequenceOwner) {
        let (schema, name) = self.resolve(&alter.sequence);
        let Some(sequence) = self
            .db
            .schema_mut(&schema)
            .and_then(|s| s.sequences.get_mut(name.as_str()))
        else {
            warn!(sequence = %alter.sequence, "Sequence not found, skipping OWNED BY");
            return;
        };

        match &alter.owner {
            Some(owner) => {
                sequence.owner_table = Some(owner.table.name.clone());
                sequence.owner_column = Some(owner.column.clone());
            }
            None => {
                sequence.owner_table = None;
                sequence.owner_column = None;
            }
        }
    }

    fn apply_trigger(&mut self, statement: &Statement, create: &CreateTrigger) {
        let (schema_name, relation) = self.resolve(&create.table);
        let trigger = Trigger {
            name: create.name.clone(),
            timing: create.timing.clone(),
            events: create.events.clone(),
            for_each_row: create.for_each_row,
            function: create.function.to_string(),
            definition: statement.text.clone(),
            comment: None,
        };

        let Some(schema) = self.db.schema_mut(&schema_name) else {
            warn!(trigger = %create.name, table = %create.table, "Trigger target not found, skipping");
            return;
        };

        if let Some(table) = schema.tables.get_mut(relation.as_str()) {
            table.triggers.push(trigger);
        } else if let Some(view) = schema.views.get_mut(relation.as_str()) {
            view.triggers.push(trigger);
        } else if let Some(view) = schema.materialized_views.get_mut(relation.as_str()) {
            view.triggers.push(trigger);
        } else {
            warn!(trigger = %create.name, table = %create.table, "Trigger target not found, skipping");
        }
    }

    fn apply_rule(&mut self, statement: &Statement, create: &CreateRule) {
        let (schema, table_name) = self.resolve(&create.table);
        match self
            .db
            .schema_mut(&schema)
            .and_then(|s| s.tables.get_mut(table_name.as_str()))
        {
            Some(table) => table.rules.push(RewriteRule {
                name: create.name.clone(),
                event: create.event.clone(),
                definition: statement.text.clone(),
            }),
            None => warn!(rule = %create.name, table = %create.table, "Rule target not found, skipping"),
        }
    }

    fn apply_comment(&mut self, comment: &CommentOn) {
        match comment_slot(&mut self.db, &self.default_schema, &comment.target) {
            Some(slot) => *slot = comment.comment.clone(),
            None => warn!(target = ?comment.target, "Comment target not found, skipping"),
        }
    }

    // =========================================================================
    // Finishing passes
    // =========================================================================

    /// A relation defined both as a table and a materialized view is a
    /// materialized view.
    fn drop_shadowed_tables(&mut self) {
        for schema in self.db.schemas.values_mut() {
            let shadowed: Vec<SmolStr> = schema
                .tables
                .keys()
                .filter(|name| schema.materialized_views.contains_key(name.as_str()))
                .cloned()
                .collect();

            for name in shadowed {
                debug!(schema = %schema.name, table = %name, "Table shadowed by materialized view");
                schema.tables.shift_remove(&name);
            }
        }
    }

    fn resolve_dependencies(&mut self) {
        let mut views = Vec::new();
        let mut materialized = Vec::new();
        for (schema_name, schema) in &self.db.schemas {
            for (key, view) in &schema.views {
                let deps = self.relations_in(&view.definition, schema_name, &view.name);
                views.push((schema_name.clone(), key.clone(), deps));
            }
            for (key, view) in &schema.materialized_views {
                let deps = self.relations_in(&view.definition, schema_name, &view.name);
                materialized.push((schema_name.clone(), key.clone(), deps));
            }
        }

        let routines: Vec<_> = self
            .routine_bodies
            .iter()
            .map(|(schema, signature, body)| {
                (
                    SmolStr::new(schema),
                    signature.clone(),
                    self.relations_in(body, schema, ""),
                )
            })
            .collect();

        for (schema, key, deps) in views {
            if let Some(view) = self.db.schema_mut(&schema).and_then(|s| s.views.get_mut(&key)) {
                view.dependencies = deps;
            }
        }
        for (schema, key, deps) in materialized {
            if let Some(view) = self
                .db
                .schema_mut(&schema)
                .and_then(|s| s.materialized_views.get_mut(&key))
            {
                view.dependencies = deps;
            }
        }
        for (schema, key, deps) in routines {
            if let Some(function) = self
                .db
                .schema_mut(&schema)
                .and_then(|s| s.functions.get_mut(&key))
            {
                function.dependencies = deps;
            }
        }
    }

    fn relations_in(&self, text: &str, schema: &str, own_name: &str) -> Vec<ObjectRef> {
        let is_relation = |s: &str, n: &str| self.db.schema(s).is_some_and(|s| s.has_relation(n));
        match parser::referenced_relations(text, &self.default_schema, is_relation) {
            Ok(refs) => refs
                .into_iter()
                .filter(|r| !(r.schema == schema && r.name == own_name))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Could not scan definition for dependencies");
                Vec::new()
            }
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

fn build_table(create: &CreateTable, schema: &str, default_schema: &str) -> SchemaResult<Table> {
    let mut table = Table::new(&create.name.name);
    table.partition_key = create.partition_by.as_ref().map(|k| k.to_string());

    for element in &create.elements {
        match element {
            parser::TableElement::Column(def) => {
                add_column(&mut table, def, schema, default_schema)?
            }
            parser::TableElement::Constraint(constraint) => {
                add_table_constraint(&mut table, constraint, default_schema)
            }
            parser::TableElement::Like { text } => {
                warn!(table = %table.name, clause = %text, "LIKE clauses are not expanded");
            }
        }
    }

    mark_primary_key_not_null(&mut table);
    Ok(table)
}

fn add_column(
    table: &mut Table,
    def: &ColumnDef,
    schema: &str,
    default_schema: &str,
) -> SchemaResult<()> {
    let raw_type = def.data_type.as_deref().ok_or_else(|| {
        SchemaError::invalid_statement(
            "CREATE TABLE",
            format!("column `{}` of `{}` has no type", def.name, table.name),
        )
    })?;

    let serial = serial_base(raw_type);
    let mut column = Column::new(&def.name, normalize_in(raw_type, default_schema));

    if let Some(base) = serial {
        let name = unique_name(format!("{}_{}_seq", table.name, def.name), |n| {
            table.sequences.iter().any(|s| s.name == n)
        });
        let regclass = if schema == default_schema {
            name.clone()
        } else {
            format!("{}.{}", schema, name)
        };
        column.nullable = false;
        column.default = Some(ColumnDefault::Expression(format!(
            "nextval('{}'::regclass)",
            regclass
        )));

        let mut sequence = Sequence::new(name).owned_by(&table.name, &def.name);
        sequence.data_type = base.to_string();
        table.sequences.push(sequence);
    }

    for constraint in &def.constraints {
        match &constraint.kind {
            ColumnConstraintKind::NotNull => column.nullable = false,
            ColumnConstraintKind::Null => {
                if serial.is_none() {
                    column.nullable = true;
                }
            }
            ColumnConstraintKind::Default(expr) => column.default = Some(ColumnDefault::parse(expr)),
            ColumnConstraintKind::Identity { always, options } => {
                column.identity = if *always {
                    IdentityGeneration::Always
                } else {
                    IdentityGeneration::ByDefault
                };
                column.nullable = false;

                let explicit = options.iter().find_map(|o| match o {
                    SequenceOption::Name(name) => Some(name.name.clone()),
                    _ => None,
                });
                let name = explicit.unwrap_or_else(|| {
                    unique_name(format!("{}_{}_seq", table.name, def.name), |n| {
                        table.sequences.iter().any(|s| s.name == n)
                    })
                });
                let mut sequence = Sequence::new(name).owned_by(&table.name, &def.name);
                sequence.data_type = column.data_type.clone();
                apply_sequence_options(&mut sequence, options, default_schema);
                table.sequences.push(sequence);
            }
            ColumnConstraintKind::Generated(expr) => column.generated = Some(expr.clone()),
            ColumnConstraintKind::PrimaryKey { include } => {
                let name = constraint
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("{}_pkey", table.name));
                let mut index = Index::primary_key(name, vec![def.name.clone()]);
                index.include = include.clone();
                table.indexes.push(index);
                column.nullable = false;
            }
            ColumnConstraintKind::Unique { .. } => {
                let name = constraint.name.clone().unwrap_or_else(|| {
                    unique_name(format!("{}_{}_key", table.name, def.name), |n| {
                        table.has_constraint_named(n)
                    })
                });
                table
                    .indexes
                    .push(Index::unique_constraint(name, vec![def.name.clone()]));
            }
            ColumnConstraintKind::Check {
                expression,
                no_inherit,
            } => {
                let name = constraint.name.clone().unwrap_or_else(|| {
                    unique_name(format!("{}_{}_check", table.name, def.name), |n| {
                        table.has_constraint_named(n)
                    })
                });
                let mut check = CheckConstraint::new(name, expression.clone());
                check.no_inherit = *no_inherit;
                table.check_constraints.push(check);
            }
            ColumnConstraintKind::References(target) => {
                let name = constraint.name.clone().unwrap_or_else(|| {
                    unique_name(format!("{}_{}_fkey", table.name, def.name), |n| {
                        table.has_constraint_named(n)
                    })
                });
                table.foreign_keys.push(foreign_key(
                    name,
                    vec![def.name.clone()],
                    target,
                    default_schema,
                ));
            }
            ColumnConstraintKind::Collate(collation) => {
                column.collation = Some(collation.clone())
            }
            ColumnConstraintKind::Deferrable(_) => {}
        }
    }

    table.columns.push(column);
    Ok(())
}

fn add_table_constraint(table: &mut Table, constraint: &TableConstraint, default_schema: &str) {
    match &constraint.kind {
        TableConstraintKind::PrimaryKey { columns, include } => {
            let name = constraint
                .name
                .clone()
                .unwrap_or_else(|| format!("{}_pkey", table.name));
            let mut index = Index::primary_key(name, columns.clone());
            index.include = include.clone();
            table.indexes.push(index);
        }
        TableConstraintKind::Unique {
            columns, include, ..
        } => {
            let name = constraint.name.clone().unwrap_or_else(|| {
                unique_name(format!("{}_{}_key", table.name, columns.join("_")), |n| {
                    table.has_constraint_named(n)
                })
            });
            let mut index = Index::unique_constraint(name, columns.clone());
            index.include = include.clone();
            table.indexes.push(index);
        }
        TableConstraintKind::Check {
            expression,
            no_inherit,
        } => {
            let name = constraint.name.clone().unwrap_or_else(|| {
                let base = match first_column_in(expression, table) {
                    Some(column) => format!("{}_{}_check", table.name, column),
                    None => format!("{}_check", table.name),
                };
                unique_name(base, |n| table.has_constraint_named(n))
            });
            let mut check = CheckConstraint::new(name, expression.clone());
            check.no_inherit = *no_inherit;
            table.check_constraints.push(check);
        }
        TableConstraintKind::ForeignKey { columns, target } => {
            let name = constraint.name.clone().unwrap_or_else(|| {
                unique_name(format!("{}_{}_fkey", table.name, columns.join("_")), |n| {
                    table.has_constraint_named(n)
                })
            });
            table
                .foreign_keys
                .push(foreign_key(name, columns.clone(), target, default_schema));
        }
        TableConstraintKind::Exclude { .. } => {
            debug!(table = %table.name, constraint = ?constraint.name, "Exclusion constraints are not modeled");
        }
    }
}

fn foreign_key(
    name: String,
    columns: Vec<String>,
    target: &ForeignKeyTarget,
    default_schema: &str,
) -> ForeignKey {
    ForeignKey {
        name,
        columns,
        referenced_schema: target.table.schema_or(default_schema).to_string(),
        referenced_table: target.table.name.clone(),
        referenced_columns: target.columns.clone(),
        on_delete: target
            .on_delete
            .as_deref()
            .map(ReferentialAction::parse)
            .unwrap_or_default(),
        on_update: target
            .on_update
            .as_deref()
            .map(ReferentialAction::parse)
            .unwrap_or_default(),
        match_type: target
            .match_type
            .as_deref()
            .map(MatchType::parse)
            .unwrap_or_default(),
        comment: None,
    }
}

fn mark_primary_key_not_null(table: &mut Table) {
    let Some(pk) = table.indexes.iter().find(|i| i.primary) else {
        return;
    };
    let columns = pk.expressions.clone();
    for column in &mut table.columns {
        if columns.contains(&column.name) {
            column.nullable = false;
        }
    }
}

/// First column of `table` mentioned in a check expression.
fn first_column_in(expression: &str, table: &Table) -> Option<String> {
    let tokens = parser::tokenize(expression).ok()?;
    tokens
        .iter()
        .filter_map(|t| t.identifier())
        .find(|ident| table.column(ident).is_some())
}

// =============================================================================
// Naming and normalization
// =============================================================================

/// `base`, or `base1`, `base2`, ... when taken.
fn unique_name(base: String, taken: impl Fn(&str) -> bool) -> String {
    if !taken(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}

/// Server-style index name: `{table}_{key}_..._idx`.
fn index_base_name(table: &str, keys: &[IndexKey]) -> String {
    let parts: Vec<String> = keys
        .iter()
        .map(|key| {
            let expr = key.expression.as_str();
            if is_simple_ident(expr) {
                return expr.to_string();
            }
            match expr.split_once('(') {
                Some((call, _)) if is_simple_ident(call.trim()) => call.trim().to_string(),
                _ => "expr".to_string(),
            }
        })
        .collect();
    format!("{}_{}_idx", table, parts.join("_"))
}

fn is_simple_ident(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Normalize a type name, dropping the default-schema qualifier.
fn normalize_in(raw: &str, default_schema: &str) -> String {
    let normalized = normalize_type(raw);
    match normalized.strip_prefix(&format!("{}.", default_schema)) {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}

fn normalize_return(text: &str, default_schema: &str) -> String {
    let trimmed = text.trim();
    let element = trimmed
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("setof "))
        .and_then(|_| trimmed.get(6..));
    if let Some(element) = element {
        return format!("setof {}", normalize_in(element, default_schema));
    }
    if trimmed.to_ascii_lowercase().starts_with("table") {
        return parser::squash(text);
    }
    normalize_in(text, default_schema)
}

fn apply_sequence_options(sequence: &mut Sequence, options: &[SequenceOption], default_schema: &str) {
    for option in options {
        match option {
            SequenceOption::DataType(data_type) => {
                sequence.data_type = normalize_in(data_type, default_schema)
            }
            SequenceOption::Increment(n) => sequence.increment = *n,
            SequenceOption::MinValue(n) => sequence.min_value = *n,
            SequenceOption::MaxValue(n) => sequence.max_value = *n,
            SequenceOption::Start(n) => sequence.start = *n,
            SequenceOption::Cache(n) => sequence.cache = *n,
            SequenceOption::Cycle(cycle) => sequence.cycle = *cycle,
            SequenceOption::OwnedBy(Some(owner)) => {
                sequence.owner_table = Some(owner.table.name.clone());
                sequence.owner_column = Some(owner.column.clone());
            }
            SequenceOption::OwnedBy(None) => {
                sequence.owner_table = None;
                sequence.owner_column = None;
            }
            SequenceOption::Name(_) => {}
        }
    }
}

// =============================================================================
// Comments
// =============================================================================

/// Locate the comment field a COMMENT ON statement writes to.
fn comment_slot<'a>(
    db: &'a mut Database,
    default_schema: &str,
    target: &CommentTarget,
) -> Option<&'a mut Option<String>> {
    let resolve = |q: &QualifiedName| (q.schema_or(default_schema).to_string(), q.name.clone());

    match target {
        CommentTarget::Schema(name) => db.schema_mut(name).map(|s| &mut s.comment),
        CommentTarget::Extension(name) => {
            db.extensions.get_mut(name.as_str()).map(|e| &mut e.comment)
        }
        CommentTarget::Table(q) => {
            let (s, n) = resolve(q);
            db.schema_mut(&s)?
                .tables
                .get_mut(n.as_str())
                .map(|t| &mut t.comment)
        }
        CommentTarget::View(q) => {
            let (s, n) = resolve(q);
            db.schema_mut(&s)?
                .views
                .get_mut(n.as_str())
                .map(|v| &mut v.comment)
        }
        CommentTarget::MaterializedView(q) => {
            let (s, n) = resolve(q);
            db.schema_mut(&s)?
                .materialized_views
                .get_mut(n.as_str())
                .map(|v| &mut v.comment)
        }
        CommentTarget::Type(q) => {
            let (s, n) = resolve(q);
            db.schema_mut(&s)?
                .enum_types
                .get_mut(n.as_str())
                .map(|e| &mut e.comment)
        }
        CommentTarget::Sequence(q) => {
            let (s, n) = resolve(q);
            let schema = db.schema_mut(&s)?;
            if schema.sequences.contains_key(n.as_str()) {
                return schema.sequences.get_mut(n.as_str()).map(|q| &mut q.comment);
            }
            schema
                .tables
                .values_mut()
                .flat_map(|t| t.sequences.iter_mut())
                .find(|q| q.name == n)
                .map(|q| &mut q.comment)
        }
        CommentTarget::Index(q) => {
            let (s, n) = resolve(q);
            let schema = db.schema_mut(&s)?;
            if schema.tables.values().any(|t| t.index(&n).is_some()) {
                return schema
                    .tables
                    .values_mut()
                    .flat_map(|t| t.indexes.iter_mut())
                    .find(|i| i.name == n)
                    .map(|i| &mut i.comment);
            }
            schema
                .materialized_views
                .values_mut()
                .flat_map(|v| v.indexes.iter_mut())
                .find(|i| i.name == n)
                .map(|i| &mut i.comment)
        }
        CommentTarget::Column(column) => {
            let (s, n) = resolve(&column.table);
            db.schema_mut(&s)?
                .tables
                .get_mut(n.as_str())?
                .column_mut(&column.column)
                .map(|c| &mut c.comment)
        }
        CommentTarget::Constraint { name, table } => {
            let (s, n) = resolve(table);
            let table = db.schema_mut(&s)?.tables.get_mut(n.as_str())?;
            if table.indexes.iter().any(|i| i.is_constraint && i.name == *name) {
                return table
                    .indexes
                    .iter_mut()
                    .find(|i| i.name == *name)
                    .map(|i| &mut i.comment);
            }
            if table.foreign_keys.iter().any(|f| f.name == *name) {
                return table
                    .foreign_keys
                    .iter_mut()
                    .find(|f| f.name == *name)
                    .map(|f| &mut f.comment);
            }
            table
                .check_constraints
                .iter_mut()
                .find(|c| c.name == *name)
                .map(|c| &mut c.comment)
        }
        CommentTarget::Trigger { name, table } => {
            let (s, n) = resolve(table);
            let schema = db.schema_mut(&s)?;
            let triggers = if schema.tables.contains_key(n.as_str()) {
                &mut schema.tables.get_mut(n.as_str())?.triggers
            } else if schema.views.contains_key(n.as_str()) {
                &mut schema.views.get_mut(n.as_str())?.triggers
            } else {
                &mut schema.materialized_views.get_mut(n.as_str())?.triggers
            };
            triggers
                .iter_mut()
                .find(|t| t.name == *name)
                .map(|t| &mut t.comment)
        }
        CommentTarget::Function { name, arguments } => {
            let (s, n) = resolve(name);
            let schema = db.schema_mut(&s)?;
            let signature = match arguments {
                Some(arguments) => {
                    let parameters: Vec<FunctionParameter> = arguments
                        .iter()
                        .map(|a| FunctionParameter {
                            mode: ParameterMode::In,
                            name: None,
                            data_type: normalize_in(a, default_schema),
                            default: None,
                        })
                        .collect();
                    Function::signature_of(&n, &parameters)
                }
                None => {
                    let mut overloads = schema.functions_named(&n);
                    let first = overloads.next()?.signature.clone();
                    if overloads.next().is_some() {
                        return None;
                    }
                    first
                }
            };
            schema
                .functions
                .get_mut(signature.as_str())
                .map(|f| &mut f.comment)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table<'a>(db: &'a Database, name: &str) -> &'a Table {
        db.table("public", name).unwrap()
    }

    #[test]
    fn test_empty_document() {
        let db = extract("").unwrap();
        assert_eq!(db.schemas.len(), 1);
        assert!(db.schema("public").unwrap().is_empty());
    }

    #[test]
    fn test_serial_primary_key() {
        let db = extract("CREATE TABLE users (id serial PRIMARY KEY, name text NOT NULL, bio text)")
            .unwrap();
        let users = table(&db, "users");

        let id = users.column("id").unwrap();
        assert_eq!(id.data_type, "integer");
        assert!(!id.nullable);
        assert_eq!(
            id.default,
            Some(ColumnDefault::Expression(
                "nextval('users_id_seq'::regclass)".to_string()
            ))
        );
        assert!(!users.column("name").unwrap().nullable);
        assert!(users.column("bio").unwrap().nullable);

        let pk = users.primary_key().unwrap();
        assert_eq!(pk.name, "users_pkey");
        assert!(pk.unique && pk.is_constraint);

        let sequence = users.owned_sequence("id").unwrap();
        assert_eq!(sequence.name, "users_id_seq");
        assert_eq!(sequence.data_type, "integer");
        assert_eq!(sequence.owner_table.as_deref(), Some("users"));
    }

    #[test]
    fn test_serial_in_other_schema() {
        let db = extract("CREATE TABLE app.jobs (id bigserial)").unwrap();
        let jobs = db.table("app", "jobs").unwrap();
        let id = jobs.column("id").unwrap();
        assert_eq!(id.data_type, "bigint");
        assert_eq!(
            id.default.as_ref().map(|d| d.to_sql()),
            Some("nextval('app.jobs_id_seq'::regclass)")
        );
    }

    #[test]
    fn test_identity_column() {
        let db = extract(
            "CREATE TABLE events (id bigint GENERATED BY DEFAULT AS IDENTITY (START WITH 100 INCREMENT BY 5))",
        )
        .unwrap();
        let events = table(&db, "events");

        let id = events.column("id").unwrap();
        assert_eq!(id.identity, IdentityGeneration::ByDefault);
        assert!(!id.nullable);

        let sequence = events.owned_sequence("id").unwrap();
        assert_eq!(sequence.name, "events_id_seq");
        assert_eq!(sequence.data_type, "bigint");
        assert_eq!(sequence.start, 100);
        assert_eq!(sequence.increment, 5);
        assert!(db.schema("public").unwrap().sequences.is_empty());
    }

    #[test]
    fn test_inline_constraint_names() {
        let db = extract(
            "CREATE TABLE orders (\
               id integer PRIMARY KEY,\
               code text UNIQUE,\
               user_id integer REFERENCES users (id) ON DELETE CASCADE,\
               total numeric(10, 2) CHECK (total >= 0)\
             );\
             CREATE TABLE users (id integer PRIMARY KEY)",
        )
        .unwrap();
        let orders = table(&db, "orders");

        assert!(orders.index("orders_code_key").is_some());
        assert_eq!(orders.foreign_keys[0].name, "orders_user_id_fkey");
        assert_eq!(orders.foreign_keys[0].referenced_schema, "public");
        assert_eq!(orders.foreign_keys[0].on_delete, ReferentialAction::Cascade);
        assert_eq!(orders.check_constraints[0].name, "orders_total_check");
        assert_eq!(orders.column("total").unwrap().data_type, "numeric(10,2)");
    }

    #[test]
    fn test_table_constraints() {
        let db = extract(
            "CREATE TABLE memberships (\
               team_id integer,\
               user_id integer,\
               role text,\
               PRIMARY KEY (team_id, user_id),\
               UNIQUE (user_id, role),\
               CHECK (role <> ''),\
               CONSTRAINT memberships_team_fk FOREIGN KEY (team_id) REFERENCES teams (id)\
             )",
        )
        .unwrap();
        let memberships = table(&db, "memberships");

        let pk = memberships.primary_key().unwrap();
        assert_eq!(pk.name, "memberships_pkey");
        assert_eq!(pk.expressions, vec!["team_id", "user_id"]);
        assert!(!memberships.column("team_id").unwrap().nullable);
        assert!(memberships.index("memberships_user_id_role_key").is_some());
        assert_eq!(memberships.check_constraints[0].name, "memberships_role_check");
        assert_eq!(memberships.foreign_keys[0].name, "memberships_team_fk");
    }

    #[test]
    fn test_colliding_constraint_names() {
        let db = extract("CREATE TABLE t (a integer CHECK (a > 0) CHECK (a < 10))").unwrap();
        let names: Vec<&str> = table(&db, "t")
            .check_constraints
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["t_a_check", "t_a_check1"]);
    }

    #[test]
    fn test_create_index_attaches_in_any_order() {
        let db = extract(
            "CREATE INDEX ON users (lower(email));\n\
             CREATE UNIQUE INDEX users_name_idx ON users USING hash (name DESC);\n\
             CREATE TABLE users (email text, name text);\n\
             CREATE INDEX ON missing (x);",
        )
        .unwrap();
        let users = table(&db, "users");

        assert_eq!(users.indexes.len(), 2);
        assert_eq!(users.indexes[0].name, "users_lower_idx");
        assert_eq!(users.indexes[0].expressions, vec!["lower(email)"]);

        let named = users.index("users_name_idx").unwrap();
        assert!(named.unique);
        assert!(!named.is_constraint);
        assert_eq!(named.method, "hash");
        assert_eq!(named.descending, vec![true]);
    }

    #[test]
    fn test_index_on_materialized_view() {
        let db = extract(
            "CREATE MATERIALIZED VIEW stats AS SELECT 1 AS n WITH NO DATA;\n\
             CREATE INDEX stats_n_idx ON stats (n);",
        )
        .unwrap();
        let stats = &db.schema("public").unwrap().materialized_views["stats"];
        assert!(!stats.with_data);
        assert_eq!(stats.indexes[0].name, "stats_n_idx");
    }

    #[test]
    fn test_partitions() {
        let db = extract(
            "CREATE TABLE events_2024_q1 PARTITION OF events_2024 \
               FOR VALUES FROM ('2024-01-01') TO ('2024-04-01');\n\
             CREATE TABLE events (id bigint, at date) PARTITION BY RANGE (at);\n\
             CREATE TABLE events_2024 PARTITION OF events \
               FOR VALUES FROM ('2024-01-01') TO ('2025-01-01') PARTITION BY RANGE (at);\n\
             CREATE TABLE orphan PARTITION OF nothing DEFAULT;",
        )
        .unwrap();
        let schema = db.schema("public").unwrap();
        assert_eq!(schema.tables.len(), 1);

        let events = &schema.tables["events"];
        assert_eq!(events.partition_key.as_deref(), Some("RANGE (at)"));
        let year = &events.partitions[0];
        assert_eq!(year.name, "events_2024");
        assert_eq!(year.parent_key.as_deref(), Some("RANGE (at)"));
        assert_eq!(year.partitions[0].name, "events_2024_q1");
    }

    #[test]
    fn test_attach_partition() {
        let db = extract(
            "CREATE TABLE logs (at date) PARTITION BY RANGE (at);\n\
             CREATE TABLE logs_old (at date);\n\
             ALTER TABLE logs ATTACH PARTITION logs_old FOR VALUES FROM (MINVALUE) TO ('2020-01-01');",
        )
        .unwrap();
        let schema = db.schema("public").unwrap();

        assert!(!schema.tables.contains_key("logs_old"));
        let logs = &schema.tables["logs"];
        assert_eq!(logs.partitions[0].name, "logs_old");
        assert!(logs.partitions[0].bound.starts_with("FOR VALUES FROM"));
    }

    #[test]
    fn test_add_constraint() {
        let db = extract(
            "CREATE TABLE a (id integer, b_id integer);\n\
             ALTER TABLE a ADD CONSTRAINT a_pkey PRIMARY KEY (id);\n\
             ALTER TABLE ONLY a ADD CONSTRAINT a_b_fkey FOREIGN KEY (b_id) REFERENCES b (id);",
        )
        .unwrap();
        let a = table(&db, "a");
        assert_eq!(a.primary_key().unwrap().name, "a_pkey");
        assert!(!a.column("id").unwrap().nullable);
        assert_eq!(a.foreign_keys[0].referenced_table, "b");
    }

    #[test]
    fn test_add_primary_key_to_unknown_table_fails() {
        let err = extract("ALTER TABLE ghost ADD CONSTRAINT ghost_pkey PRIMARY KEY (id)").unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference { .. }));

        // Soft constraints on unknown tables are skipped.
        assert!(extract("ALTER TABLE ghost ADD CONSTRAINT c CHECK (x > 0)").is_ok());
    }

    #[test]
    fn test_sequences() {
        let db = extract(
            "CREATE SEQUENCE app.counter AS integer START WITH 10 CACHE 20 CYCLE;\n\
             CREATE SEQUENCE app.orphan;\n\
             CREATE TABLE app.t (n integer);\n\
             ALTER SEQUENCE app.orphan OWNED BY app.t.n;",
        )
        .unwrap();
        let app = db.schema("app").unwrap();

        let counter = &app.sequences["counter"];
        assert_eq!(counter.data_type, "integer");
        assert_eq!(counter.start, 10);
        assert_eq!(counter.cache, 20);
        assert!(counter.cycle);

        let orphan = &app.sequences["orphan"];
        assert_eq!(orphan.owner_table.as_deref(), Some("t"));
        assert_eq!(orphan.owner_column.as_deref(), Some("n"));
    }

    #[test]
    fn test_enum_extension_and_schema() {
        let db = extract(
            "CREATE SCHEMA IF NOT EXISTS billing;\n\
             CREATE EXTENSION IF NOT EXISTS pgcrypto WITH SCHEMA public;\n\
             CREATE TYPE billing.status AS ENUM ('open', 'paid', 'void');\n\
             CREATE TABLE billing.invoices (state billing.status NOT NULL, tags public.label[]);",
        )
        .unwrap();

        let billing = db.schema("billing").unwrap();
        assert_eq!(billing.enum_types["status"].values, vec!["open", "paid", "void"]);
        assert_eq!(
            billing.tables["invoices"].column("state").unwrap().data_type,
            "billing.status"
        );
        assert_eq!(
            billing.tables["invoices"].column("tags").unwrap().data_type,
            "label[]"
        );
        assert_eq!(db.extensions["pgcrypto"].schema.as_deref(), Some("public"));
    }

    #[test]
    fn test_functions_and_procedures() {
        let db = extract(
            "CREATE FUNCTION add(a int4, b INTEGER) RETURNS int LANGUAGE sql \
               AS $$ SELECT a + b $$;\n\
             CREATE FUNCTION add(a text, OUT b text) LANGUAGE sql AS 'SELECT a';\n\
             CREATE PROCEDURE archive(days integer) LANGUAGE plpgsql \
               AS $$ BEGIN DELETE FROM users WHERE age > days; END $$;\n\
             CREATE TABLE users (age integer);",
        )
        .unwrap();
        let public = db.schema("public").unwrap();

        let add = &public.functions["add(integer, integer)"];
        assert_eq!(add.return_type.as_deref(), Some("integer"));
        assert_eq!(add.language.as_deref(), Some("sql"));
        assert!(add.definition.starts_with("CREATE FUNCTION add"));
        assert!(public.functions.contains_key("add(text)"));
        assert_eq!(public.functions["add(text)"].parameters[1].mode, ParameterMode::Out);

        let archive = &public.functions["archive(integer)"];
        assert_eq!(archive.kind, crate::model::RoutineKind::Procedure);
        assert_eq!(archive.dependencies, vec![ObjectRef::new("public", "users")]);
    }

    #[test]
    fn test_view_dependencies() {
        let db = extract(
            "CREATE VIEW active AS SELECT id FROM users WHERE active;\n\
             CREATE VIEW app.summary AS SELECT count(*) FROM active a JOIN app.orders o ON true;\n\
             CREATE TABLE users (id integer, active boolean);\n\
             CREATE TABLE app.orders (id integer);",
        )
        .unwrap();

        assert_eq!(
            db.view("public", "active").unwrap().dependencies,
            vec![ObjectRef::new("public", "users")]
        );
        assert_eq!(
            db.view("app", "summary").unwrap().dependencies,
            vec![
                ObjectRef::new("public", "active"),
                ObjectRef::new("app", "orders")
            ]
        );
    }

    #[test]
    fn test_triggers_and_rules() {
        let db = extract(
            "CREATE TABLE t (id integer);\n\
             CREATE VIEW v AS SELECT id FROM t;\n\
             CREATE TRIGGER t_audit AFTER INSERT OR UPDATE ON t FOR EACH ROW EXECUTE FUNCTION audit();\n\
             CREATE TRIGGER v_write INSTEAD OF INSERT ON v FOR EACH ROW EXECUTE FUNCTION write_v();\n\
             CREATE RULE t_no_delete AS ON DELETE TO t DO INSTEAD NOTHING;\n\
             CREATE TRIGGER lost AFTER INSERT ON missing EXECUTE FUNCTION f();",
        )
        .unwrap();

        let t = table(&db, "t");
        assert_eq!(t.triggers[0].name, "t_audit");
        assert_eq!(t.triggers[0].events, vec!["INSERT", "UPDATE"]);
        assert!(t.triggers[0].for_each_row);
        assert_eq!(t.rules[0].event, "DELETE");
        assert_eq!(db.view("public", "v").unwrap().triggers[0].name, "v_write");
    }

    #[test]
    fn test_comments() {
        let db = extract(
            "CREATE SCHEMA app;\n\
             CREATE TABLE app.users (id serial PRIMARY KEY, email text);\n\
             CREATE INDEX users_email_idx ON app.users (email);\n\
             CREATE FUNCTION app.f(x integer) RETURNS integer LANGUAGE sql AS 'SELECT x';\n\
             COMMENT ON SCHEMA app IS 'Application';\n\
             COMMENT ON TABLE app.users IS 'People';\n\
             COMMENT ON COLUMN app.users.email IS 'Login';\n\
             COMMENT ON INDEX app.users_email_idx IS 'Lookup';\n\
             COMMENT ON CONSTRAINT users_pkey ON app.users IS 'Identity';\n\
             COMMENT ON SEQUENCE app.users_id_seq IS 'Ids';\n\
             COMMENT ON FUNCTION app.f(int) IS 'Echo';\n\
             COMMENT ON TABLE app.nothing IS 'Skipped';",
        )
        .unwrap();
        let app = db.schema("app").unwrap();
        let users = &app.tables["users"];

        assert_eq!(app.comment.as_deref(), Some("Application"));
        assert_eq!(users.comment.as_deref(), Some("People"));
        assert_eq!(users.column("email").unwrap().comment.as_deref(), Some("Login"));
        assert_eq!(users.index("users_email_idx").unwrap().comment.as_deref(), Some("Lookup"));
        assert_eq!(users.primary_key().unwrap().comment.as_deref(), Some("Identity"));
        assert_eq!(users.sequences[0].comment.as_deref(), Some("Ids"));
        assert_eq!(app.functions["f(integer)"].comment.as_deref(), Some("Echo"));
    }

    #[test]
    fn test_comment_is_null_clears() {
        let db = extract(
            "CREATE TABLE t (id integer);\n\
             COMMENT ON TABLE t IS 'x';\n\
             COMMENT ON TABLE t IS NULL;",
        )
        .unwrap();
        assert_eq!(table(&db, "t").comment, None);
    }

    #[test]
    fn test_unsupported_statements_ignored() {
        let db = extract(
            "SET search_path = public;\n\
             GRANT SELECT ON users TO reader;\n\
             CREATE TABLE users (id integer);",
        )
        .unwrap();
        assert_eq!(db.table_count(), 1);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let sql = "CREATE TYPE mood AS ENUM ('sad', 'ok');\n\
                   CREATE TABLE people (id serial PRIMARY KEY, mood mood, CHECK (id > 0));\n\
                   CREATE VIEW happy AS SELECT id FROM people WHERE mood = 'ok';";
        assert_eq!(extract(sql).unwrap(), extract(sql).unwrap());
    }

    #[test]
    fn test_custom_default_schema() {
        let config = DeltaConfig::from_str("[schema]\ndefault_schema = \"app\"\n").unwrap();
        let db = extract_with_config("CREATE TABLE t (id integer)", &config).unwrap();
        assert!(db.table("app", "t").is_some());
        assert!(db.schema("public").is_none());
    }

    #[test]
    fn test_setof_return_type_normalized() {
        assert_eq!(normalize_return("SETOF public.users", "public"), "setof users");
        assert_eq!(normalize_return("  setof int4 ", "public"), "setof integer");
        assert!(!normalize_return("setofé", "public").starts_with("setof "));
    }

    #[test]
    fn test_syntax_error_is_fatal() {
        let err = extract("CREATE TABLE (").unwrap_err();
        assert!(matches!(err, SchemaError::SyntaxError { .. }));
    }
}
