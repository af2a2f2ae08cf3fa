//! Migration SQL generation.
//!
//! [`MigrationGenerator`] turns a [`ChangeSet`] into PostgreSQL DDL. Objects
//! that only the dependency graph can order (functions, tables, views and
//! materialized views) follow the [`Schedule`]; everything else is emitted
//! in fixed phases around it:
//!
//! 1. trigger, rule and foreign key drops;
//! 2. graph drops, dependents first;
//! 3. sequence, enum and extension drops;
//! 4. schema, extension, enum and sequence creates and alters;
//! 5. graph creates and alters, dependencies first;
//! 6. foreign keys and sequence ownership;
//! 7. triggers and rules;
//! 8. comments;
//! 9. schema drops.
//!
//! Statements are separated by a blank line. A drop immediately followed by
//! the create that replaces it is written as a pair on consecutive lines.

use std::collections::HashMap;

use pgdelta_schema::DeltaConfig;
use pgdelta_schema::model::{ObjectKind, Table, normalize_type, serial_base};
use pgdelta_schema::parser::{
    ColumnConstraintKind, ColumnDef, SequenceOption, Statement, StatementKind, TableConstraintKind,
    parse_column_fragment, parse_statements,
};
use pgdelta_schema::writer::{
    add_constraint, comment_on, create_schema, on_table_target, qualified, quote_ident,
    quote_literal,
};
use tracing::debug;

use crate::diff::{
    ChangeSet, ColumnChange, CommentDiff, DiffAction, ElementChange, FunctionChange, IndexChange,
    MaterializedViewChange, ObjectChange, TableChange, ViewChange,
};
use crate::error::{MigrateResult, MigrationError};
use crate::graph::{ObjectId, Schedule, Scheduler, routine_kind};

/// One unit of output.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// A standalone statement.
    Single(String),
    /// A drop and the create replacing it.
    Pair(String, String),
}

impl Step {
    fn render(&self) -> String {
        match self {
            Self::Single(sql) => format!("{};\n\n", sql),
            Self::Pair(first, second) => format!("{};\n{};\n\n", first, second),
        }
    }

    fn into_statements(self) -> Vec<String> {
        match self {
            Self::Single(sql) => vec![sql],
            Self::Pair(first, second) => vec![first, second],
        }
    }
}

/// A graph object of the change set.
#[derive(Clone, Copy)]
enum GraphChange<'a> {
    Table(&'a TableChange),
    View(&'a ViewChange),
    MaterializedView(&'a MaterializedViewChange),
    Function(&'a FunctionChange),
}

/// SQL generator for PostgreSQL migrations.
#[derive(Debug, Clone)]
pub struct MigrationGenerator {
    default_schema: String,
    if_exists: bool,
    cascade_drops: bool,
}

impl Default for MigrationGenerator {
    fn default() -> Self {
        Self::new(&DeltaConfig::default())
    }
}

impl MigrationGenerator {
    /// Create a generator from configuration.
    pub fn new(config: &DeltaConfig) -> Self {
        Self {
            default_schema: config.default_schema().to_string(),
            if_exists: config.generator.if_exists,
            cascade_drops: config.generator.cascade_drops,
        }
    }

    /// Generate the migration script for a change set.
    pub fn generate(&self, changes: &ChangeSet) -> MigrateResult<String> {
        let schedule = Scheduler::new(&self.default_schema).schedule(changes)?;
        self.generate_with(changes, &schedule)
    }

    /// Generate the migration script following an existing schedule.
    pub fn generate_with(&self, changes: &ChangeSet, schedule: &Schedule) -> MigrateResult<String> {
        let steps = self.steps(changes, schedule)?;
        debug!(steps = steps.len(), "Generated migration");
        Ok(steps.iter().map(Step::render).collect())
    }

    /// Generate the migration as individual statements, without terminators.
    pub fn statements(&self, changes: &ChangeSet) -> MigrateResult<Vec<String>> {
        let schedule = Scheduler::new(&self.default_schema).schedule(changes)?;
        Ok(self
            .steps(changes, &schedule)?
            .into_iter()
            .flat_map(Step::into_statements)
            .collect())
    }

    fn steps(&self, changes: &ChangeSet, schedule: &Schedule) -> MigrateResult<Vec<Step>> {
        let mut up = Vec::new();
        let mut deferred = Vec::new();

        // Objects on relations go first so their relations can be dropped
        for trigger in changes.triggers.iter().filter(|t| t.change.action == DiffAction::Drop) {
            let target = on_table_target(&trigger.change.name, &trigger.change.schema, &trigger.relation);
            up.push(Step::Single(self.drop_object(ObjectKind::Trigger, &target)));
        }
        for rule in changes.rules.iter().filter(|r| r.change.action == DiffAction::Drop) {
            let target = on_table_target(&rule.change.name, &rule.change.schema, &rule.relation);
            up.push(Step::Single(format!("DROP RULE {}{}", self.if_exists(), target)));
        }
        for table in changes.tables.iter().filter(|t| is_in_place_alter(t)) {
            for fk in &table.foreign_keys {
                if fk.action != DiffAction::Create {
                    up.push(Step::Single(self.drop_constraint(&table.change, &fk.name)));
                }
            }
        }

        // Drop graph objects, dependents first
        for id in &schedule.drops {
            let target = match id.kind {
                ObjectKind::Function | ObjectKind::Procedure => routine_target(&id.schema, &id.name),
                _ => qualified(&id.schema, &id.name),
            };
            up.push(Step::Single(self.drop_object(id.kind, &target)));
        }

        for sequence in changes.sequences.iter().filter(|s| s.action == DiffAction::Drop) {
            up.push(Step::Single(
                self.drop_object(ObjectKind::Sequence, &qualified(&sequence.schema, &sequence.name)),
            ));
        }

        // Replaced enums are dropped next to their create
        for enum_type in &changes.enums {
            if enum_type.action == DiffAction::Drop && !is_replaced(enum_type, &changes.enums) {
                up.push(Step::Single(
                    self.drop_object(ObjectKind::Type, &qualified(&enum_type.schema, &enum_type.name)),
                ));
            }
        }

        for extension in changes.extensions.iter().filter(|e| e.action == DiffAction::Drop) {
            up.push(Step::Single(
                self.drop_object(ObjectKind::Extension, &quote_ident(&extension.name)),
            ));
        }

        // Create schemas, extensions and types before anything uses them
        for schema in changes.schemas.iter().filter(|s| s.action == DiffAction::Create) {
            up.push(Step::Single(create_schema(&schema.name)));
        }

        for extension in &changes.extensions {
            match extension.action {
                DiffAction::Create => up.extend(singles(new_fragment(extension)?)?),
                DiffAction::Alter => up.extend(self.alter_extension(extension)?),
                DiffAction::Drop => {}
            }
        }

        for (i, enum_type) in changes.enums.iter().enumerate() {
            if enum_type.action != DiffAction::Create {
                continue;
            }
            let create = new_fragment(enum_type)?.to_string();
            let replaced = i > 0 && is_pair(&changes.enums[i - 1], enum_type);
            if replaced {
                let target = qualified(&enum_type.schema, &enum_type.name);
                up.push(Step::Pair(self.drop_object(ObjectKind::Type, &target), create));
            } else {
                up.push(Step::Single(create));
            }
        }

        for sequence in &changes.sequences {
            match sequence.action {
                DiffAction::Create => up.extend(singles(new_fragment(sequence)?)?),
                DiffAction::Alter => up.push(Step::Single(alter_sequence(sequence)?)),
                DiffAction::Drop => {}
            }
        }

        // Graph objects, dependencies first
        let graph = graph_changes(changes);
        for id in &schedule.forward {
            match graph.get(id) {
                Some(GraphChange::Table(table)) => {
                    up.extend(self.table_steps(table, &mut deferred)?);
                }
                Some(GraphChange::View(view)) => up.extend(self.view_steps(view)?),
                Some(GraphChange::MaterializedView(view)) => {
                    up.extend(self.materialized_view_steps(view)?);
                }
                Some(GraphChange::Function(function)) => {
                    up.extend(self.function_steps(function)?);
                }
                None => debug!(object = %id, "Scheduled object has no change"),
            }
        }

        // Foreign keys once every table exists
        up.extend(deferred);
        for owner in &changes.sequence_owners {
            let target = match owner.new_owner.as_deref().and_then(|o| o.rsplit_once('.')) {
                Some((table, column)) => {
                    format!("{}.{}", qualified(&owner.schema, table), quote_ident(column))
                }
                None => "NONE".to_string(),
            };
            up.push(Step::Single(format!(
                "ALTER SEQUENCE {} OWNED BY {}",
                qualified(&owner.schema, &owner.sequence),
                target
            )));
        }

        for trigger in changes.triggers.iter().filter(|t| t.change.action == DiffAction::Create) {
            up.extend(singles(new_fragment(&trigger.change)?)?);
        }
        for rule in changes.rules.iter().filter(|r| r.change.action == DiffAction::Create) {
            up.extend(singles(new_fragment(&rule.change)?)?);
        }

        for comment in &changes.comments {
            up.push(Step::Single(comment_statement(comment)));
        }

        for schema in changes.schemas.iter().filter(|s| s.action == DiffAction::Drop) {
            up.push(Step::Single(self.drop_object(ObjectKind::Schema, &quote_ident(&schema.name))));
        }

        Ok(up)
    }

    // =========================================================================
    // Drops
    // =========================================================================

    fn if_exists(&self) -> &'static str {
        if self.if_exists { "IF EXISTS " } else { "" }
    }

    /// `DROP <kind> [IF EXISTS] target [CASCADE]`.
    fn drop_object(&self, kind: ObjectKind, target: &str) -> String {
        let mut sql = format!("DROP {} {}{}", kind.sql_keyword(), self.if_exists(), target);
        let cascades = matches!(
            kind,
            ObjectKind::Table | ObjectKind::View | ObjectKind::MaterializedView | ObjectKind::Type
        );
        if self.cascade_drops && cascades {
            sql.push_str(" CASCADE");
        }
        sql
    }

    fn drop_constraint<T>(&self, table: &ObjectChange<T>, name: &str) -> String {
        format!(
            "ALTER TABLE {} DROP CONSTRAINT {}{}",
            qualified(&table.schema, &table.name),
            self.if_exists(),
            quote_ident(name)
        )
    }

    // =========================================================================
    // Extensions
    // =========================================================================

    fn alter_extension<T>(&self, change: &ObjectChange<T>) -> MigrateResult<Vec<Step>> {
        let describe = |fragment: Option<&String>| -> MigrateResult<(Option<String>, Option<String>)> {
            let fragment = fragment.ok_or_else(|| missing_fragment(&change.name))?;
            for statement in parse_statements(fragment)? {
                if let StatementKind::CreateExtension(create) = statement.kind {
                    return Ok((create.schema, create.version));
                }
            }
            Err(MigrationError::invalid_fragment(&change.name, "expected CREATE EXTENSION"))
        };
        let (old_schema, old_version) = describe(change.old_fragment.as_ref())?;
        let (new_schema, new_version) = describe(change.new_fragment.as_ref())?;

        let name = quote_ident(&change.name);
        let mut steps = Vec::new();
        if old_version != new_version {
            let mut sql = format!("ALTER EXTENSION {} UPDATE", name);
            if let Some(version) = &new_version {
                sql.push_str(&format!(" TO {}", quote_literal(version)));
            }
            steps.push(Step::Single(sql));
        }
        if old_schema != new_schema {
            if let Some(schema) = &new_schema {
                steps.push(Step::Single(format!(
                    "ALTER EXTENSION {} SET SCHEMA {}",
                    name,
                    quote_ident(schema)
                )));
            }
        }
        Ok(steps)
    }

    // =========================================================================
    // Tables
    // =========================================================================

    fn table_steps(&self, table: &TableChange, deferred: &mut Vec<Step>) -> MigrateResult<Vec<Step>> {
        let change = &table.change;
        let name = qualified(&change.schema, &change.name);

        match change.action {
            DiffAction::Create => Ok(self.create_table(new_fragment(change)?, deferred)?),
            DiffAction::Alter if table.requires_recreation => {
                let mut created = self.create_table(new_fragment(change)?, deferred)?.into_iter();
                let mut steps = Vec::new();
                match created.next() {
                    Some(Step::Single(create)) => {
                        steps.push(Step::Pair(self.drop_object(ObjectKind::Table, &name), create));
                    }
                    Some(other) => steps.push(other),
                    None => {}
                }
                steps.extend(created);
                Ok(steps)
            }
            DiffAction::Alter => self.alter_table(table, deferred),
            DiffAction::Drop => Ok(Vec::new()),
        }
    }

    /// Statements of a table fragment. Foreign keys added by ALTER TABLE
    /// are deferred.
    fn create_table(&self, fragment: &str, deferred: &mut Vec<Step>) -> MigrateResult<Vec<Step>> {
        let mut steps = Vec::new();
        for statement in parse_statements(fragment)? {
            if is_foreign_key(&statement) {
                deferred.push(Step::Single(statement.text));
            } else {
                steps.push(Step::Single(statement.text));
            }
        }
        Ok(steps)
    }

    fn alter_table(&self, table: &TableChange, deferred: &mut Vec<Step>) -> MigrateResult<Vec<Step>> {
        let change = &table.change;
        let name = qualified(&change.schema, &change.name);
        let mut steps = Vec::new();

        // Drop indexes and key constraints
        for index in table.indexes.iter().filter(|i| i.action == DiffAction::Drop) {
            steps.push(Step::Single(self.drop_index(change, index)?));
        }

        // Drop columns
        for column in table.columns.iter().filter(|c| c.action == DiffAction::Drop) {
            steps.push(Step::Single(format!(
                "ALTER TABLE {} DROP COLUMN {}{}",
                name,
                self.if_exists(),
                quote_ident(&column.name)
            )));
        }

        // Add columns
        for column in table.columns.iter().filter(|c| c.action == DiffAction::Create) {
            steps.push(Step::Single(format!(
                "ALTER TABLE {} ADD COLUMN {}",
                name,
                element_new(column)?
            )));
        }

        // Alter columns
        for column in table.columns.iter().filter(|c| c.action == DiffAction::Alter) {
            steps.extend(self.alter_column(&name, column)?);
        }

        // Check constraints: a drop directly followed by its create is a pair
        let checks = &table.check_constraints;
        let mut i = 0;
        while i < checks.len() {
            let check = &checks[i];
            match check.action {
                DiffAction::Drop => {
                    let drop = self.drop_constraint(change, &check.name);
                    match checks.get(i + 1) {
                        Some(next) if next.action == DiffAction::Create && next.name == check.name => {
                            let add = add_constraint(&change.schema, &change.name, element_new(next)?);
                            steps.push(Step::Pair(drop, add));
                            i += 1;
                        }
                        _ => steps.push(Step::Single(drop)),
                    }
                }
                _ => {
                    let add = add_constraint(&change.schema, &change.name, element_new(check)?);
                    steps.push(Step::Single(add));
                }
            }
            i += 1;
        }

        // Add indexes and key constraints
        for index in &table.indexes {
            match index.action {
                DiffAction::Create => {
                    steps.push(Step::Single(index_definition(change, element_new(index)?)));
                }
                DiffAction::Alter => steps.push(Step::Pair(
                    self.drop_index(change, index)?,
                    index_definition(change, element_new(index)?),
                )),
                DiffAction::Drop => {}
            }
        }

        // Foreign keys once every table exists
        for fk in table.foreign_keys.iter().filter(|f| f.action != DiffAction::Drop) {
            deferred.push(Step::Single(add_constraint(
                &change.schema,
                &change.name,
                element_new(fk)?,
            )));
        }

        // Partitions
        for partition in &table.partitions {
            match partition.action {
                DiffAction::Create => steps.extend(singles(element_new(partition)?)?),
                DiffAction::Drop => {
                    let target = partition_name(element_old(partition)?, &change.schema)?;
                    steps.push(Step::Single(self.drop_object(ObjectKind::Table, &target)));
                }
                DiffAction::Alter => {
                    let target = partition_name(element_old(partition)?, &change.schema)?;
                    let mut created = parse_statements(element_new(partition)?)?.into_iter();
                    if let Some(first) = created.next() {
                        steps.push(Step::Pair(self.drop_object(ObjectKind::Table, &target), first.text));
                    }
                    steps.extend(created.map(|s| Step::Single(s.text)));
                }
            }
        }

        Ok(steps)
    }

    fn drop_index(&self, table: &ObjectChange<Table>, index: &IndexChange) -> MigrateResult<String> {
        let fragment = element_old(index)?;
        if is_create_statement(fragment) {
            Ok(self.drop_object(ObjectKind::Index, &qualified(&table.schema, &index.name)))
        } else {
            Ok(self.drop_constraint(table, &index.name))
        }
    }

    fn alter_column(&self, table: &str, column: &ColumnChange) -> MigrateResult<Vec<Step>> {
        let old = ColumnShape::parse(element_old(column)?)?;
        let new = ColumnShape::parse(element_new(column)?)?;
        let alter = |action: String| {
            Step::Single(format!(
                "ALTER TABLE {} ALTER COLUMN {} {}",
                table,
                quote_ident(&column.name),
                action
            ))
        };

        // A new generation expression cannot be added to an existing column
        if old.generated.is_none() && new.generated.is_some() {
            return Ok(vec![Step::Pair(
                format!("ALTER TABLE {} DROP COLUMN {}", table, quote_ident(&column.name)),
                format!("ALTER TABLE {} ADD COLUMN {}", table, element_new(column)?),
            )]);
        }

        let mut steps = Vec::new();
        if old.data_type != new.data_type || old.collation != new.collation {
            let mut action = format!("TYPE {}", new.data_type);
            if let Some(collation) = &new.collation {
                action.push_str(&format!(" COLLATE {}", collation));
            }
            steps.push(alter(action));
        }
        if old.not_null != new.not_null {
            steps.push(alter(
                if new.not_null { "SET NOT NULL" } else { "DROP NOT NULL" }.to_string(),
            ));
        }
        if old.default != new.default {
            steps.push(alter(match &new.default {
                Some(default) => format!("SET DEFAULT {}", default),
                None => "DROP DEFAULT".to_string(),
            }));
        }
        match (old.identity, new.identity) {
            (None, Some(always)) => {
                steps.push(alter(format!("ADD GENERATED {} AS IDENTITY", identity_mode(always))));
            }
            (Some(_), None) => steps.push(alter("DROP IDENTITY IF EXISTS".to_string())),
            (Some(a), Some(b)) if a != b => {
                steps.push(alter(format!("SET GENERATED {}", identity_mode(b))));
            }
            _ => {}
        }
        match (&old.generated, &new.generated) {
            (Some(a), Some(b)) if a != b => {
                steps.push(alter(format!("SET EXPRESSION AS ({})", b)));
            }
            (Some(_), None) => steps.push(alter("DROP EXPRESSION".to_string())),
            _ => {}
        }
        Ok(steps)
    }

    // =========================================================================
    // Views and routines
    // =========================================================================

    fn view_steps(&self, view: &ViewChange) -> MigrateResult<Vec<Step>> {
        let change = &view.change;
        match change.action {
            DiffAction::Create => singles(new_fragment(change)?),
            DiffAction::Alter => self.replace(ObjectKind::View, change),
            DiffAction::Drop => Ok(Vec::new()),
        }
    }

    fn materialized_view_steps(&self, view: &MaterializedViewChange) -> MigrateResult<Vec<Step>> {
        let change = &view.change;
        match change.action {
            DiffAction::Create => singles(new_fragment(change)?),
            DiffAction::Alter if view.definition_changed => {
                self.replace(ObjectKind::MaterializedView, change)
            }
            DiffAction::Alter => {
                let mut steps = Vec::new();
                for index in &view.indexes {
                    let target = qualified(&change.schema, &index.name);
                    match index.action {
                        DiffAction::Create => steps.push(Step::Single(element_new(index)?.to_string())),
                        DiffAction::Drop => {
                            steps.push(Step::Single(self.drop_object(ObjectKind::Index, &target)));
                        }
                        DiffAction::Alter => steps.push(Step::Pair(
                            self.drop_object(ObjectKind::Index, &target),
                            element_new(index)?.to_string(),
                        )),
                    }
                }
                Ok(steps)
            }
            DiffAction::Drop => Ok(Vec::new()),
        }
    }

    fn function_steps(&self, function: &FunctionChange) -> MigrateResult<Vec<Step>> {
        let change = &function.change;
        let fragment = new_fragment(change)?;
        match change.action {
            DiffAction::Create => Ok(vec![Step::Single(fragment.to_string())]),
            DiffAction::Alter => {
                let recreate = function
                    .comparison
                    .as_ref()
                    .is_none_or(|c| c.requires_recreation);
                if recreate {
                    let kind = routine_kind(Some(fragment));
                    let drop = self.drop_object(kind, &routine_target(&change.schema, &change.name));
                    Ok(vec![Step::Pair(drop, fragment.to_string())])
                } else {
                    Ok(vec![Step::Single(or_replace(fragment))])
                }
            }
            DiffAction::Drop => Ok(Vec::new()),
        }
    }

    /// Drop and create again; the first statement of the fragment pairs
    /// with the drop.
    fn replace<T>(&self, kind: ObjectKind, change: &ObjectChange<T>) -> MigrateResult<Vec<Step>> {
        let target = qualified(&change.schema, &change.name);
        let mut statements = parse_statements(new_fragment(change)?)?.into_iter();
        let mut steps = Vec::new();
        if let Some(first) = statements.next() {
            steps.push(Step::Pair(self.drop_object(kind, &target), first.text));
        }
        steps.extend(statements.map(|s| Step::Single(s.text)));
        Ok(steps)
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn graph_changes(changes: &ChangeSet) -> HashMap<ObjectId, GraphChange<'_>> {
    let mut graph = HashMap::new();
    for function in &changes.functions {
        let change = &function.change;
        let kind = routine_kind(change.new_fragment.as_deref().or(change.old_fragment.as_deref()));
        graph.insert(
            ObjectId::new(kind, &change.schema, &change.name),
            GraphChange::Function(function),
        );
    }
    for table in &changes.tables {
        let change = &table.change;
        graph.insert(
            ObjectId::new(ObjectKind::Table, &change.schema, &change.name),
            GraphChange::Table(table),
        );
    }
    for view in &changes.views {
        let change = &view.change;
        graph.insert(
            ObjectId::new(ObjectKind::View, &change.schema, &change.name),
            GraphChange::View(view),
        );
    }
    for view in &changes.materialized_views {
        let change = &view.change;
        graph.insert(
            ObjectId::new(ObjectKind::MaterializedView, &change.schema, &change.name),
            GraphChange::MaterializedView(view),
        );
    }
    graph
}

fn missing_fragment(object: &str) -> MigrationError {
    MigrationError::invalid_fragment(object, "missing definition")
}

fn new_fragment<T>(change: &ObjectChange<T>) -> MigrateResult<&str> {
    change
        .new_fragment
        .as_deref()
        .ok_or_else(|| missing_fragment(&change.name))
}

fn element_new<T>(element: &ElementChange<T>) -> MigrateResult<&str> {
    element
        .new_fragment
        .as_deref()
        .ok_or_else(|| missing_fragment(&element.name))
}

fn element_old<T>(element: &ElementChange<T>) -> MigrateResult<&str> {
    element
        .old_fragment
        .as_deref()
        .ok_or_else(|| missing_fragment(&element.name))
}

/// Every statement of a fragment on its own.
fn singles(fragment: &str) -> MigrateResult<Vec<Step>> {
    Ok(parse_statements(fragment)?
        .into_iter()
        .map(|s| Step::Single(s.text))
        .collect())
}

fn is_in_place_alter(table: &TableChange) -> bool {
    table.change.action == DiffAction::Alter && !table.requires_recreation
}

fn is_pair<T>(drop: &ObjectChange<T>, create: &ObjectChange<T>) -> bool {
    drop.action == DiffAction::Drop
        && create.action == DiffAction::Create
        && drop.schema == create.schema
        && drop.name == create.name
}

fn is_replaced<T>(drop: &ObjectChange<T>, all: &[ObjectChange<T>]) -> bool {
    all.iter().any(|other| is_pair(drop, other))
}

fn is_foreign_key(statement: &Statement) -> bool {
    matches!(
        &statement.kind,
        StatementKind::AddConstraint(add)
            if matches!(add.constraint.kind, TableConstraintKind::ForeignKey { .. })
    )
}

fn is_create_statement(fragment: &str) -> bool {
    fragment
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("create"))
}

/// A CREATE INDEX statement, or a constraint clause added to the table.
fn index_definition<T>(table: &ObjectChange<T>, fragment: &str) -> String {
    if is_create_statement(fragment) {
        fragment.to_string()
    } else {
        add_constraint(&table.schema, &table.name, fragment)
    }
}

/// Qualified name of the partition a fragment creates.
fn partition_name(fragment: &str, default_schema: &str) -> MigrateResult<String> {
    for statement in parse_statements(fragment)? {
        if let StatementKind::CreateTable(create) = statement.kind {
            return Ok(qualified(create.name.schema_or(default_schema), &create.name.name));
        }
    }
    Err(MigrationError::invalid_fragment(fragment, "expected CREATE TABLE"))
}

/// `"schema"."name"(argument types)` from a routine signature.
fn routine_target(schema: &str, signature: &str) -> String {
    match signature.split_once('(') {
        Some((name, arguments)) => format!("{}({}", qualified(schema, name), arguments),
        None => qualified(schema, signature),
    }
}

fn or_replace(fragment: &str) -> String {
    let trimmed = fragment.trim_start();
    let Some(rest) = trimmed
        .get(..6)
        .filter(|head| head.eq_ignore_ascii_case("create"))
        .map(|_| &trimmed[6..])
    else {
        return fragment.to_string();
    };
    let already = rest
        .trim_start()
        .get(..2)
        .is_some_and(|word| word.eq_ignore_ascii_case("or"));
    if already {
        fragment.to_string()
    } else {
        format!("CREATE OR REPLACE{}", rest)
    }
}

fn identity_mode(always: bool) -> &'static str {
    if always { "ALWAYS" } else { "BY DEFAULT" }
}

fn alter_sequence<T>(change: &ObjectChange<T>) -> MigrateResult<String> {
    let fragment = new_fragment(change)?;
    let create = parse_statements(fragment)?
        .into_iter()
        .find_map(|s| match s.kind {
            StatementKind::CreateSequence(create) => Some(create),
            _ => None,
        })
        .ok_or_else(|| MigrationError::invalid_fragment(&change.name, "expected CREATE SEQUENCE"))?;

    let mut data_type = "bigint".to_string();
    let mut increment = 1;
    let (mut min, mut max) = (None, None);
    let mut start = 1;
    let mut cache = 1;
    let mut cycle = false;
    for option in create.options {
        match option {
            SequenceOption::DataType(t) => data_type = normalize_type(&t),
            SequenceOption::Increment(n) => increment = n,
            SequenceOption::MinValue(n) => min = n,
            SequenceOption::MaxValue(n) => max = n,
            SequenceOption::Start(n) => start = n,
            SequenceOption::Cache(n) => cache = n,
            SequenceOption::Cycle(c) => cycle = c,
            SequenceOption::OwnedBy(_) | SequenceOption::Name(_) => {}
        }
    }

    let bound = |keyword: &str, value: Option<i64>| match value {
        Some(n) => format!("{} {}", keyword, n),
        None => format!("NO {}", keyword),
    };
    Ok(format!(
        "ALTER SEQUENCE {} AS {} INCREMENT BY {} {} {} START WITH {} CACHE {} {}",
        qualified(&change.schema, &change.name),
        data_type,
        increment,
        bound("MINVALUE", min),
        bound("MAXVALUE", max),
        start,
        cache,
        if cycle { "CYCLE" } else { "NO CYCLE" }
    ))
}

fn comment_statement(comment: &CommentDiff) -> String {
    let object = &comment.object;
    let sub = comment.sub_object.as_deref().unwrap_or_default();
    let target = match comment.kind {
        ObjectKind::Schema | ObjectKind::Extension => quote_ident(object),
        ObjectKind::Column => format!("{}.{}", qualified(&comment.schema, object), quote_ident(sub)),
        ObjectKind::Constraint | ObjectKind::Trigger => on_table_target(sub, &comment.schema, object),
        ObjectKind::Function | ObjectKind::Procedure => routine_target(&comment.schema, object),
        _ => qualified(&comment.schema, object),
    };
    comment_on(comment.kind, &target, comment.new.as_deref())
}

/// The alterable facets of a column definition.
#[derive(Debug, PartialEq)]
struct ColumnShape {
    data_type: String,
    collation: Option<String>,
    not_null: bool,
    default: Option<String>,
    identity: Option<bool>,
    generated: Option<String>,
}

impl ColumnShape {
    fn parse(fragment: &str) -> MigrateResult<Self> {
        let column: ColumnDef = parse_column_fragment(fragment)?;
        let raw_type = column.data_type.as_deref().unwrap_or_default();
        let serial = serial_base(raw_type);

        let mut shape = Self {
            data_type: serial.map(str::to_string).unwrap_or_else(|| normalize_type(raw_type)),
            collation: None,
            not_null: serial.is_some(),
            default: None,
            identity: None,
            generated: None,
        };
        for constraint in column.constraints {
            match constraint.kind {
                ColumnConstraintKind::NotNull | ColumnConstraintKind::PrimaryKey { .. } => {
                    shape.not_null = true;
                }
                ColumnConstraintKind::Default(expr) => shape.default = Some(expr.trim().to_string()),
                ColumnConstraintKind::Identity { always, .. } => {
                    shape.identity = Some(always);
                    shape.not_null = true;
                }
                ColumnConstraintKind::Generated(expr) => shape.generated = Some(expr.trim().to_string()),
                ColumnConstraintKind::Collate(collation) => shape.collation = Some(collation),
                _ => {}
            }
        }
        Ok(shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiffer;
    use pgdelta_schema::extract;
    use pretty_assertions::assert_eq;

    fn migrate(old: &str, new: &str) -> String {
        let changes = SchemaDiffer::default().diff_sdl(old, new).unwrap();
        MigrationGenerator::default().generate(&changes).unwrap()
    }

    fn migrate_models(old: &str, new: &str) -> String {
        let changes =
            SchemaDiffer::default().diff_models(&extract(old).unwrap(), &extract(new).unwrap());
        MigrationGenerator::default().generate(&changes).unwrap()
    }

    #[test]
    fn test_create_table() {
        assert_eq!(
            migrate("", "CREATE TABLE users(id SERIAL PRIMARY KEY, name TEXT NOT NULL);"),
            "CREATE TABLE users(\n id SERIAL PRIMARY KEY,\n name TEXT NOT NULL\n);\n\n"
        );
    }

    #[test]
    fn test_no_changes_is_empty() {
        let text = "CREATE TABLE t (id integer);";
        assert_eq!(migrate(text, text), "");
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(
            migrate("CREATE TABLE t (id integer);", ""),
            "DROP TABLE IF EXISTS \"public\".\"t\";\n\n"
        );
    }

    #[test]
    fn test_add_and_drop_column() {
        let sql = migrate_models(
            "CREATE TABLE t (id integer, old_name text);",
            "CREATE TABLE t (id integer, email text NOT NULL);",
        );
        assert_eq!(
            sql,
            "ALTER TABLE \"public\".\"t\" DROP COLUMN IF EXISTS \"old_name\";\n\n\
             ALTER TABLE \"public\".\"t\" ADD COLUMN \"email\" text NOT NULL;\n\n"
        );
    }

    #[test]
    fn test_alter_column() {
        let sql = migrate(
            "CREATE TABLE t (id integer, name text);",
            "CREATE TABLE t (id bigint, name text NOT NULL DEFAULT 'x');",
        );
        assert_eq!(
            sql,
            "ALTER TABLE \"public\".\"t\" ALTER COLUMN \"id\" TYPE bigint;\n\n\
             ALTER TABLE \"public\".\"t\" ALTER COLUMN \"name\" SET NOT NULL;\n\n\
             ALTER TABLE \"public\".\"t\" ALTER COLUMN \"name\" SET DEFAULT 'x';\n\n"
        );
    }

    #[test]
    fn test_check_change_is_pair() {
        let sql = migrate(
            "CREATE TABLE p (price integer, CONSTRAINT price_positive CHECK (price > 0));",
            "CREATE TABLE p (price integer, CONSTRAINT price_positive CHECK (price >= 0));",
        );
        assert_eq!(
            sql,
            "ALTER TABLE \"public\".\"p\" DROP CONSTRAINT IF EXISTS \"price_positive\";\n\
             ALTER TABLE \"public\".\"p\" ADD CONSTRAINT \"price_positive\" CHECK (price >= 0);\n\n"
        );
    }

    #[test]
    fn test_enum_before_table_and_drop_after() {
        let schema = "CREATE TYPE mood AS ENUM ('sad', 'happy');
                      CREATE TABLE person (id integer, feeling mood);";
        let up = migrate("", schema);
        let type_at = up.find("CREATE TYPE").unwrap();
        let table_at = up.find("CREATE TABLE").unwrap();
        assert!(type_at < table_at);

        let down = migrate(schema, "");
        let table_at = down.find("DROP TABLE").unwrap();
        let type_at = down.find("DROP TYPE").unwrap();
        assert!(table_at < type_at);
    }

    #[test]
    fn test_enum_change_is_pair() {
        let sql = migrate(
            "CREATE TYPE mood AS ENUM ('sad');",
            "CREATE TYPE mood AS ENUM ('sad', 'happy');",
        );
        assert_eq!(
            sql,
            "DROP TYPE IF EXISTS \"public\".\"mood\";\n\
             CREATE TYPE mood AS ENUM ('sad', 'happy');\n\n"
        );
    }

    #[test]
    fn test_function_body_uses_replace() {
        let sql = migrate(
            "CREATE FUNCTION one() RETURNS integer LANGUAGE sql AS $$ SELECT 1 $$;",
            "CREATE FUNCTION one() RETURNS integer LANGUAGE sql AS $$ SELECT 2 $$;",
        );
        assert_eq!(
            sql,
            "CREATE OR REPLACE FUNCTION one() RETURNS integer LANGUAGE sql AS $$ SELECT 2 $$;\n\n"
        );
    }

    #[test]
    fn test_function_return_type_recreates() {
        let sql = migrate(
            "CREATE FUNCTION one() RETURNS integer LANGUAGE sql AS $$ SELECT 1 $$;",
            "CREATE FUNCTION one() RETURNS bigint LANGUAGE sql AS $$ SELECT 1 $$;",
        );
        assert_eq!(
            sql,
            "DROP FUNCTION IF EXISTS \"public\".\"one\"();\n\
             CREATE FUNCTION one() RETURNS bigint LANGUAGE sql AS $$ SELECT 1 $$;\n\n"
        );
    }

    #[test]
    fn test_comment_only() {
        let sql = migrate(
            "CREATE TABLE t (id integer); COMMENT ON COLUMN t.id IS 'old';",
            "CREATE TABLE t (id integer); COMMENT ON COLUMN t.id IS 'it''s new';",
        );
        assert_eq!(
            sql,
            "COMMENT ON COLUMN \"public\".\"t\".\"id\" IS 'it''s new';\n\n"
        );
    }

    #[test]
    fn test_view_recreated_after_table() {
        let sql = migrate(
            "CREATE TABLE users (id integer, name text);
             CREATE VIEW v AS SELECT id, name FROM users;",
            "CREATE TABLE users (id integer, name text, email text);
             CREATE VIEW v AS SELECT id FROM users;",
        );
        let alter_at = sql.find("ADD COLUMN").unwrap();
        let view_at = sql.find("DROP VIEW IF EXISTS \"public\".\"v\";\nCREATE VIEW v AS SELECT id FROM users;").unwrap();
        assert!(alter_at < view_at);
    }

    #[test]
    fn test_foreign_keys_are_deferred() {
        let sql = migrate_models(
            "",
            "CREATE TABLE a (id integer PRIMARY KEY, b_id integer REFERENCES b (id));
             CREATE TABLE b (id integer PRIMARY KEY);",
        );
        let fk_at = sql.find("FOREIGN KEY").unwrap();
        let b_at = sql.find("CREATE TABLE \"public\".\"b\"").unwrap();
        assert!(b_at < fk_at);
        assert!(sql.trim_end().ends_with("REFERENCES \"public\".\"b\" (\"id\");"));
    }

    #[test]
    fn test_cascade_and_if_exists_config() {
        let config = DeltaConfig::from_str(
            "[generator]\nif_exists = false\ncascade_drops = true\n",
        )
        .unwrap();
        let changes = SchemaDiffer::new(&config)
            .diff_sdl("CREATE TABLE t (id integer);", "")
            .unwrap();
        let sql = MigrationGenerator::new(&config).generate(&changes).unwrap();
        assert_eq!(sql, "DROP TABLE \"public\".\"t\" CASCADE;\n\n");
    }

    #[test]
    fn test_statements_have_no_terminators() {
        let changes = SchemaDiffer::default()
            .diff_sdl("", "CREATE SCHEMA app; CREATE TABLE app.t (id integer);")
            .unwrap();
        let statements = MigrationGenerator::default().statements(&changes).unwrap();
        assert_eq!(
            statements,
            vec![
                "CREATE SCHEMA IF NOT EXISTS \"app\"".to_string(),
                "CREATE TABLE app.t(\n id integer\n)".to_string(),
            ]
        );
    }

    #[test]
    fn test_drop_everything_snapshot() {
        let changes = SchemaDiffer::default()
            .diff_sdl(
                "CREATE TYPE mood AS ENUM ('sad');
                 CREATE TABLE t (id integer, m mood);
                 CREATE VIEW v AS SELECT id FROM t;",
                "",
            )
            .unwrap();
        let statements = MigrationGenerator::default().statements(&changes).unwrap();
        insta::assert_snapshot!(statements.join("\n"), @r#"
        DROP VIEW IF EXISTS "public"."v"
        DROP TABLE IF EXISTS "public"."t"
        DROP TYPE IF EXISTS "public"."mood"
        "#);
    }

    #[test]
    fn test_or_replace() {
        assert_eq!(or_replace("create function f()"), "CREATE OR REPLACE function f()");
        assert_eq!(or_replace("CREATE OR REPLACE FUNCTION f()"), "CREATE OR REPLACE FUNCTION f()");
    }

    #[test]
    fn test_routine_target() {
        assert_eq!(
            routine_target("public", "add(integer, integer)"),
            "\"public\".\"add\"(integer, integer)"
        );
    }
}
