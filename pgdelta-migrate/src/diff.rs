//! Schema diffing.
//!
//! [`SchemaDiffer`] compares two sides, each given as an extracted model or
//! as SDL text, and produces a [`ChangeSet`]: per-kind lists of create, alter
//! and drop entries carrying the DDL fragment of each side. Comments travel
//! separately as [`CommentDiff`]s so that a comment edit never alters its
//! owning object.
//!
//! ```rust,ignore
//! use pgdelta_migrate::SchemaDiffer;
//!
//! let changes = SchemaDiffer::default().diff_sdl(
//!     "CREATE TABLE users (id integer);",
//!     "CREATE TABLE users (id integer, name text);",
//! )?;
//! assert_eq!(changes.summary(), "Alter 1 tables");
//! ```

use std::hash::Hash;

use indexmap::IndexMap;
use pgdelta_schema::DeltaConfig;
use pgdelta_schema::model::{
    CheckConstraint, Column, Database, EnumType, Extension, ForeignKey, Function, Index,
    MaterializedView, ObjectKind, Partition, RewriteRule, Schema, Sequence, Table, Trigger, View,
};
use pgdelta_schema::writer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{Catalog, CommentKey, Entry, Key, RelationKey};
use crate::compare::{
    FunctionComparer, FunctionComparison, ViewComparer, ViewComparison, expressions_equivalent,
    statements_equivalent,
};
use crate::error::MigrateResult;

// =============================================================================
// Change types
// =============================================================================

/// What happens to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffAction {
    /// The object is new.
    Create,
    /// The object exists on both sides and differs.
    Alter,
    /// The object is gone.
    Drop,
}

impl DiffAction {
    fn label(&self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Alter => "Alter",
            Self::Drop => "Drop",
        }
    }
}

/// A top-level object change.
///
/// A create has no old fragment, a drop no new fragment, and an alter has
/// both, distinct. `old` and `new` carry the structured objects when the
/// differ runs with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectChange<T> {
    /// Action.
    pub action: DiffAction,
    /// Schema; empty for extensions.
    pub schema: String,
    /// Object name; the signature for routines.
    pub name: String,
    /// CREATE fragment of the old side.
    pub old_fragment: Option<String>,
    /// CREATE fragment of the new side.
    pub new_fragment: Option<String>,
    /// Old object.
    pub old: Option<T>,
    /// New object.
    pub new: Option<T>,
}

/// A change to something a table or materialized view owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementChange<T> {
    /// Action.
    pub action: DiffAction,
    /// Element name.
    pub name: String,
    /// Old definition fragment.
    pub old_fragment: Option<String>,
    /// New definition fragment.
    pub new_fragment: Option<String>,
    /// Old element, with metadata.
    pub old: Option<T>,
    /// New element, with metadata.
    pub new: Option<T>,
}

/// Column diff entry.
pub type ColumnChange = ElementChange<Column>;
/// Index or key constraint diff entry.
pub type IndexChange = ElementChange<Index>;
/// Foreign key diff entry.
pub type ForeignKeyChange = ElementChange<ForeignKey>;
/// Check constraint diff entry.
pub type CheckConstraintChange = ElementChange<CheckConstraint>;
/// Partition diff entry.
pub type PartitionChange = ElementChange<Partition>;

/// A table change with its child diffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChange {
    /// The table entry.
    pub change: ObjectChange<Table>,
    /// Column changes.
    pub columns: Vec<ColumnChange>,
    /// Index, primary key and unique constraint changes.
    pub indexes: Vec<IndexChange>,
    /// Foreign key changes.
    pub foreign_keys: Vec<ForeignKeyChange>,
    /// Check constraint changes; a modification is a drop then a create.
    pub check_constraints: Vec<CheckConstraintChange>,
    /// Partition changes.
    pub partitions: Vec<PartitionChange>,
    /// The partition key changed, so the table is dropped and created again.
    pub requires_recreation: bool,
}

/// A view change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewChange {
    /// The view entry.
    pub change: ObjectChange<View>,
    /// Comparer verdict for alters.
    pub comparison: Option<ViewComparison>,
}

/// A materialized view change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedViewChange {
    /// The view entry.
    pub change: ObjectChange<MaterializedView>,
    /// Index changes.
    pub indexes: Vec<IndexChange>,
    /// The query, column list or WITH DATA changed.
    pub definition_changed: bool,
}

/// A function or procedure change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionChange {
    /// The routine entry, named by signature.
    pub change: ObjectChange<Function>,
    /// Comparer verdict for alters.
    pub comparison: Option<FunctionComparison>,
}

/// A trigger change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerChange {
    /// Table, view or materialized view the trigger is on.
    pub relation: String,
    /// The trigger entry.
    pub change: ObjectChange<Trigger>,
}

/// A rule change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleChange {
    /// Table the rule is on.
    pub relation: String,
    /// The rule entry.
    pub change: ObjectChange<RewriteRule>,
}

/// A change of `ALTER SEQUENCE ... OWNED BY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipChange {
    /// Sequence schema.
    pub schema: String,
    /// Sequence name.
    pub sequence: String,
    /// Previous owner as `table.column`.
    pub old_owner: Option<String>,
    /// New owner as `table.column`; `None` means OWNED BY NONE.
    pub new_owner: Option<String>,
}

/// A comment change, independent of its object's entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentDiff {
    /// Kind of the commented object.
    pub kind: ObjectKind,
    /// Schema; empty for extensions.
    pub schema: String,
    /// Object name: the table for columns, constraints and triggers, the
    /// signature for routines.
    pub object: String,
    /// Column, constraint or trigger name.
    pub sub_object: Option<String>,
    /// Old comment.
    pub old: Option<String>,
    /// New comment; `None` clears it.
    pub new: Option<String>,
    /// Action.
    pub action: DiffAction,
}

/// Every change between two schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Schema creates and drops.
    pub schemas: Vec<ObjectChange<Schema>>,
    /// Extension changes.
    pub extensions: Vec<ObjectChange<Extension>>,
    /// Enum changes; a modification is a drop then a create.
    pub enums: Vec<ObjectChange<EnumType>>,
    /// Standalone sequence changes.
    pub sequences: Vec<ObjectChange<Sequence>>,
    /// Table changes.
    pub tables: Vec<TableChange>,
    /// View changes.
    pub views: Vec<ViewChange>,
    /// Materialized view changes.
    pub materialized_views: Vec<MaterializedViewChange>,
    /// Function and procedure changes.
    pub functions: Vec<FunctionChange>,
    /// Trigger changes; a modification is a drop then a create.
    pub triggers: Vec<TriggerChange>,
    /// Rule changes; a modification is a drop then a create.
    pub rules: Vec<RuleChange>,
    /// Sequence ownership changes.
    pub sequence_owners: Vec<OwnershipChange>,
    /// Comment changes.
    pub comments: Vec<CommentDiff>,
}

impl ChangeSet {
    /// Check if there are any differences.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.extensions.is_empty()
            && self.enums.is_empty()
            && self.sequences.is_empty()
            && self.tables.is_empty()
            && self.views.is_empty()
            && self.materialized_views.is_empty()
            && self.functions.is_empty()
            && self.triggers.is_empty()
            && self.rules.is_empty()
            && self.sequence_owners.is_empty()
            && self.comments.is_empty()
    }

    /// Get a human-readable summary of the changes.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        let mut count = |label: &str, actions: Vec<DiffAction>| {
            for action in [DiffAction::Create, DiffAction::Alter, DiffAction::Drop] {
                let n = actions.iter().filter(|a| **a == action).count();
                if n > 0 {
                    parts.push(format!("{} {} {}", action.label(), n, label));
                }
            }
        };

        count("schemas", self.schemas.iter().map(|c| c.action).collect());
        count("extensions", self.extensions.iter().map(|c| c.action).collect());
        count("enums", self.enums.iter().map(|c| c.action).collect());
        count("sequences", self.sequences.iter().map(|c| c.action).collect());
        count("tables", self.tables.iter().map(|c| c.change.action).collect());
        count("views", self.views.iter().map(|c| c.change.action).collect());
        count(
            "materialized views",
            self.materialized_views.iter().map(|c| c.change.action).collect(),
        );
        count("functions", self.functions.iter().map(|c| c.change.action).collect());
        count("triggers", self.triggers.iter().map(|c| c.change.action).collect());
        count("rules", self.rules.iter().map(|c| c.change.action).collect());

        if !self.sequence_owners.is_empty() {
            parts.push(format!("Change {} sequence owners", self.sequence_owners.len()));
        }
        if !self.comments.is_empty() {
            parts.push(format!("Change {} comments", self.comments.len()));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

// =============================================================================
// Differ
// =============================================================================

/// Computes a [`ChangeSet`] between two schemas.
#[derive(Debug, Clone)]
pub struct SchemaDiffer {
    config: DeltaConfig,
    with_metadata: bool,
}

impl Default for SchemaDiffer {
    fn default() -> Self {
        Self::new(&DeltaConfig::default())
    }
}

impl SchemaDiffer {
    /// Create a differ from configuration.
    pub fn new(config: &DeltaConfig) -> Self {
        Self {
            config: config.clone(),
            with_metadata: config.diff.with_metadata,
        }
    }

    /// Attach structured objects to every entry.
    pub fn with_metadata(mut self, with_metadata: bool) -> Self {
        self.with_metadata = with_metadata;
        self
    }

    /// Diff two models. A missing side is an empty schema.
    pub fn diff(&self, old: Option<&Database>, new: Option<&Database>) -> ChangeSet {
        let empty = Database::new(self.config.default_schema());
        let old = Catalog::from_database(old.unwrap_or(&empty));
        let new = Catalog::from_database(new.unwrap_or(&empty));
        self.diff_catalogs(&old, &new)
    }

    /// Diff two extracted models.
    pub fn diff_models(&self, old: &Database, new: &Database) -> ChangeSet {
        self.diff(Some(old), Some(new))
    }

    /// Diff two SDL documents without building full models.
    pub fn diff_sdl(&self, old: &str, new: &str) -> MigrateResult<ChangeSet> {
        let old = Catalog::from_sdl(old, self.config.default_schema())?;
        let new = Catalog::from_sdl(new, self.config.default_schema())?;
        Ok(self.diff_catalogs(&old, &new))
    }

    fn diff_catalogs(&self, old: &Catalog, new: &Catalog) -> ChangeSet {
        let changes = ChangeSet {
            schemas: self.diff_schemas(old, new),
            extensions: self.diff_extensions(old, new),
            enums: self.diff_enums(old, new),
            sequences: self.diff_sequences(old, new),
            tables: self.diff_tables(old, new),
            views: self.diff_views(old, new),
            materialized_views: self.diff_materialized_views(old, new),
            functions: self.diff_functions(old, new),
            triggers: self.diff_triggers(old, new),
            rules: self.diff_rules(old, new),
            sequence_owners: diff_owners(old, new),
            comments: self.diff_comments(old, new),
        };

        debug!(summary = %changes.summary(), "Schema diff complete");
        changes
    }

    fn default_schema(&self) -> &str {
        self.config.default_schema()
    }

    // -------------------------------------------------------------------------
    // Entry constructors
    // -------------------------------------------------------------------------

    fn change<T: Clone>(
        &self,
        action: DiffAction,
        (schema, name): (&str, &str),
        old: Option<&Entry<T>>,
        new: Option<&Entry<T>>,
    ) -> ObjectChange<T> {
        ObjectChange {
            action,
            schema: schema.to_string(),
            name: name.to_string(),
            old_fragment: old.map(|e| e.fragment.clone()),
            new_fragment: new.map(|e| e.fragment.clone()),
            old: old.filter(|_| self.with_metadata).map(|e| e.meta.clone()),
            new: new.filter(|_| self.with_metadata).map(|e| e.meta.clone()),
        }
    }

    fn created<T: Clone>(&self, id: (&str, &str), entry: &Entry<T>) -> ObjectChange<T> {
        self.change(DiffAction::Create, id, None, Some(entry))
    }

    fn dropped<T: Clone>(&self, id: (&str, &str), entry: &Entry<T>) -> ObjectChange<T> {
        self.change(DiffAction::Drop, id, Some(entry), None)
    }

    fn altered<T: Clone>(&self, id: (&str, &str), old: &Entry<T>, new: &Entry<T>) -> ObjectChange<T> {
        self.change(DiffAction::Alter, id, Some(old), Some(new))
    }

    /// Drop then create, for objects that cannot be altered in place.
    fn replaced<T: Clone>(&self, id: (&str, &str), old: &Entry<T>, new: &Entry<T>) -> [ObjectChange<T>; 2] {
        [self.dropped(id, old), self.created(id, new)]
    }

    /// Diff a keyed map: creates and alters in new order, then drops in old
    /// order. `modified` returns the entries for an object on both sides.
    fn diff_keyed<T: Clone, C>(
        &self,
        old: &IndexMap<Key, Entry<T>>,
        new: &IndexMap<Key, Entry<T>>,
        wrap: impl Fn(ObjectChange<T>) -> C,
        mut modified: impl FnMut((&str, &str), &Entry<T>, &Entry<T>) -> Vec<C>,
    ) -> Vec<C> {
        let mut out = Vec::new();
        for pairing in pair_up(old, new) {
            match pairing {
                Pairing::Added((schema, name), entry) => {
                    out.push(wrap(self.created((schema.as_str(), name.as_str()), entry)));
                }
                Pairing::Both((schema, name), old_entry, new_entry) => {
                    out.extend(modified((schema.as_str(), name.as_str()), old_entry, new_entry));
                }
                Pairing::Removed((schema, name), entry) => {
                    out.push(wrap(self.dropped((schema.as_str(), name.as_str()), entry)));
                }
            }
        }
        out
    }

    // -------------------------------------------------------------------------
    // Object kinds
    // -------------------------------------------------------------------------

    fn diff_schemas(&self, old: &Catalog, new: &Catalog) -> Vec<ObjectChange<Schema>> {
        let mut out = Vec::new();
        for pairing in pair_up(&old.schemas, &new.schemas) {
            match pairing {
                Pairing::Added(name, entry) if !self.config.is_system_schema(name) => {
                    out.push(self.created((name.as_str(), name.as_str()), entry));
                }
                Pairing::Removed(name, entry) if !self.config.is_system_schema(name) => {
                    out.push(self.dropped((name.as_str(), name.as_str()), entry));
                }
                _ => {}
            }
        }
        out
    }

    fn diff_extensions(&self, old: &Catalog, new: &Catalog) -> Vec<ObjectChange<Extension>> {
        let mut out = Vec::new();
        for pairing in pair_up(&old.extensions, &new.extensions) {
            match pairing {
                Pairing::Added(name, entry) => out.push(self.created(("", name.as_str()), entry)),
                Pairing::Both(name, o, n) => {
                    if o.meta.version != n.meta.version || o.meta.schema != n.meta.schema {
                        out.push(self.altered(("", name.as_str()), o, n));
                    }
                }
                Pairing::Removed(name, entry) => out.push(self.dropped(("", name.as_str()), entry)),
            }
        }
        out
    }

    fn diff_enums(&self, old: &Catalog, new: &Catalog) -> Vec<ObjectChange<EnumType>> {
        self.diff_keyed(&old.enums, &new.enums, |c| c, |id, o, n| {
            if o.meta.values == n.meta.values {
                Vec::new()
            } else {
                self.replaced(id, o, n).into()
            }
        })
    }

    fn diff_sequences(&self, old: &Catalog, new: &Catalog) -> Vec<ObjectChange<Sequence>> {
        self.diff_keyed(&old.sequences, &new.sequences, |c| c, |id, o, n| {
            if o.fragment == n.fragment {
                Vec::new()
            } else {
                vec![self.altered(id, o, n)]
            }
        })
    }

    fn diff_tables(&self, old: &Catalog, new: &Catalog) -> Vec<TableChange> {
        self.diff_keyed(
            &old.tables,
            &new.tables,
            TableChange::new,
            |id, o, n| self.diff_table(id, o, n).into_iter().collect(),
        )
    }

    fn diff_table(
        &self,
        (schema, name): (&str, &str),
        old: &Entry<Table>,
        new: &Entry<Table>,
    ) -> Option<TableChange> {
        let (o, n) = (&old.meta, &new.meta);
        let ds = self.default_schema();

        let columns = self.diff_elements(
            &o.columns,
            &n.columns,
            |c| c.name.clone(),
            |c| writer::column_definition(schema, o, c, ds),
            |c| writer::column_definition(schema, n, c, ds),
        );
        let index_fragment = |i: &Index| {
            writer::constraint_clause(i).unwrap_or_else(|| writer::create_index(schema, name, i))
        };
        let indexes = self.diff_elements(
            &o.indexes,
            &n.indexes,
            |i| i.name.clone(),
            index_fragment,
            index_fragment,
        );
        let foreign_keys = self.diff_elements(
            &o.foreign_keys,
            &n.foreign_keys,
            |f| f.name.clone(),
            writer::foreign_key_clause,
            writer::foreign_key_clause,
        );
        let check_constraints = self.diff_checks(&o.check_constraints, &n.check_constraints);
        let partition_fragment =
            |p: &Partition| writer::create_partition(schema, name, p).join(";\n");
        let partitions = self.diff_elements(
            &o.partitions,
            &n.partitions,
            |p| p.name.clone(),
            partition_fragment,
            partition_fragment,
        );
        let requires_recreation = o.partition_key != n.partition_key;

        let unchanged = columns.is_empty()
            && indexes.is_empty()
            && foreign_keys.is_empty()
            && check_constraints.is_empty()
            && partitions.is_empty()
            && !requires_recreation;
        if unchanged || old.fragment == new.fragment {
            return None;
        }

        debug!(schema = %schema, table = %name, "Table altered");
        Some(TableChange {
            change: self.altered((schema, name), old, new),
            columns,
            indexes,
            foreign_keys,
            check_constraints,
            partitions,
            requires_recreation,
        })
    }

    /// Diff named children by their rendered fragments.
    fn diff_elements<T: Clone>(
        &self,
        old: &[T],
        new: &[T],
        name: impl Fn(&T) -> String,
        old_fragment: impl Fn(&T) -> String,
        new_fragment: impl Fn(&T) -> String,
    ) -> Vec<ElementChange<T>> {
        let index = |items: &[T], fragment: &dyn Fn(&T) -> String| -> IndexMap<String, (T, String)> {
            items
                .iter()
                .map(|item| (name(item), (item.clone(), fragment(item))))
                .collect()
        };
        let old = index(old, &old_fragment);
        let new = index(new, &new_fragment);

        let mut out = Vec::new();
        for pairing in pair_up(&old, &new) {
            match pairing {
                Pairing::Added(name, (item, fragment)) => {
                    out.push(self.element(DiffAction::Create, name, None, Some((item, fragment))));
                }
                Pairing::Both(name, o, n) => {
                    if o.1 != n.1 {
                        out.push(self.element(DiffAction::Alter, name, Some((&o.0, &o.1)), Some((&n.0, &n.1))));
                    }
                }
                Pairing::Removed(name, (item, fragment)) => {
                    out.push(self.element(DiffAction::Drop, name, Some((item, fragment)), None));
                }
            }
        }
        out
    }

    /// Checks are compared by meaning and never altered in place. The output
    /// follows declaration order.
    fn diff_checks(&self, old: &[CheckConstraint], new: &[CheckConstraint]) -> Vec<CheckConstraintChange> {
        let mut out = Vec::new();
        for check in new {
            let fragment = writer::check_clause(check);
            match old.iter().find(|c| c.name == check.name) {
                Some(previous) => {
                    let same = previous.no_inherit == check.no_inherit
                        && expressions_equivalent(
                            &previous.expression,
                            &check.expression,
                            self.default_schema(),
                        );
                    if !same {
                        let old_fragment = writer::check_clause(previous);
                        out.push(self.element(DiffAction::Drop, &check.name, Some((previous, &old_fragment)), None));
                        out.push(self.element(DiffAction::Create, &check.name, None, Some((check, &fragment))));
                    }
                }
                None => {
                    out.push(self.element(DiffAction::Create, &check.name, None, Some((check, &fragment))));
                }
            }
        }
        for check in old.iter().filter(|c| !new.iter().any(|n| n.name == c.name)) {
            let fragment = writer::check_clause(check);
            out.push(self.element(DiffAction::Drop, &check.name, Some((check, &fragment)), None));
        }
        out
    }

    fn element<T: Clone>(
        &self,
        action: DiffAction,
        name: &str,
        old: Option<(&T, &String)>,
        new: Option<(&T, &String)>,
    ) -> ElementChange<T> {
        ElementChange {
            action,
            name: name.to_string(),
            old_fragment: old.map(|(_, f)| f.clone()),
            new_fragment: new.map(|(_, f)| f.clone()),
            old: old.filter(|_| self.with_metadata).map(|(m, _)| m.clone()),
            new: new.filter(|_| self.with_metadata).map(|(m, _)| m.clone()),
        }
    }

    fn diff_views(&self, old: &Catalog, new: &Catalog) -> Vec<ViewChange> {
        let comparer = ViewComparer::new(self.default_schema());
        self.diff_keyed(
            &old.views,
            &new.views,
            |change| ViewChange {
                change,
                comparison: None,
            },
            |id, o, n| {
                let comparison = comparer.compare(&o.fragment, &n.fragment);
                if comparison.equivalent {
                    return Vec::new();
                }
                vec![ViewChange {
                    change: self.altered(id, o, n),
                    comparison: Some(comparison),
                }]
            },
        )
    }

    fn diff_materialized_views(&self, old: &Catalog, new: &Catalog) -> Vec<MaterializedViewChange> {
        let comparer = ViewComparer::new(self.default_schema());
        self.diff_keyed(
            &old.materialized_views,
            &new.materialized_views,
            |change| MaterializedViewChange {
                change,
                indexes: Vec::new(),
                definition_changed: false,
            },
            |(schema, name), o, n| {
                let definition_changed = o.meta.with_data != n.meta.with_data
                    || !comparer.equivalent(&o.fragment, &n.fragment);
                let fragment = |i: &Index| writer::create_index(schema, name, i);
                let indexes = self.diff_elements(
                    &o.meta.indexes,
                    &n.meta.indexes,
                    |i| i.name.clone(),
                    fragment,
                    fragment,
                );
                if !definition_changed && indexes.is_empty() {
                    return Vec::new();
                }
                vec![MaterializedViewChange {
                    change: self.altered((schema, name), o, n),
                    indexes,
                    definition_changed,
                }]
            },
        )
    }

    fn diff_functions(&self, old: &Catalog, new: &Catalog) -> Vec<FunctionChange> {
        let comparer = FunctionComparer::new(self.default_schema());
        self.diff_keyed(
            &old.functions,
            &new.functions,
            |change| FunctionChange {
                change,
                comparison: None,
            },
            |id, o, n| {
                let comparison = comparer.compare(&o.fragment, &n.fragment);
                if !comparison.has_changes() {
                    return Vec::new();
                }
                vec![FunctionChange {
                    change: self.altered(id, o, n),
                    comparison: Some(comparison),
                }]
            },
        )
    }

    fn diff_triggers(&self, old: &Catalog, new: &Catalog) -> Vec<TriggerChange> {
        self.diff_on_relation(&old.triggers, &new.triggers)
            .into_iter()
            .map(|(relation, change)| TriggerChange { relation, change })
            .collect()
    }

    fn diff_rules(&self, old: &Catalog, new: &Catalog) -> Vec<RuleChange> {
        self.diff_on_relation(&old.rules, &new.rules)
            .into_iter()
            .map(|(relation, change)| RuleChange { relation, change })
            .collect()
    }

    /// Objects on a relation: a modification is a drop then a create.
    fn diff_on_relation<T: Clone>(
        &self,
        old: &IndexMap<RelationKey, Entry<T>>,
        new: &IndexMap<RelationKey, Entry<T>>,
    ) -> Vec<(String, ObjectChange<T>)> {
        let mut out = Vec::new();
        for pairing in pair_up(old, new) {
            match pairing {
                Pairing::Added((schema, relation, name), entry) => {
                    out.push((relation.clone(), self.created((schema.as_str(), name.as_str()), entry)));
                }
                Pairing::Both((schema, relation, name), o, n) => {
                    if !statements_equivalent(&o.fragment, &n.fragment, self.default_schema()) {
                        for change in self.replaced((schema.as_str(), name.as_str()), o, n) {
                            out.push((relation.clone(), change));
                        }
                    }
                }
                Pairing::Removed((schema, relation, name), entry) => {
                    out.push((relation.clone(), self.dropped((schema.as_str(), name.as_str()), entry)));
                }
            }
        }
        out
    }

    fn diff_comments(&self, old: &Catalog, new: &Catalog) -> Vec<CommentDiff> {
        if !self.config.diff.compare_comments {
            return Vec::new();
        }

        let diff = |key: &CommentKey,
                    before: Option<&String>,
                    after: Option<&String>,
                    action: DiffAction| CommentDiff {
            kind: key.kind,
            schema: key.schema.clone(),
            object: key.object.clone(),
            sub_object: key.sub.clone(),
            old: before.cloned(),
            new: after.cloned(),
            action,
        };

        let mut out = Vec::new();
        for pairing in pair_up(&old.comments, &new.comments) {
            match pairing {
                Pairing::Added(key, text) => out.push(diff(key, None, Some(text), DiffAction::Create)),
                Pairing::Both(key, o, n) => {
                    if o != n {
                        out.push(diff(key, Some(o), Some(n), DiffAction::Alter));
                    }
                }
                // Comments vanish with their object.
                Pairing::Removed(key, text) => {
                    if new.has_comment_target(key) {
                        out.push(diff(key, Some(text), None, DiffAction::Drop));
                    }
                }
            }
        }
        out
    }
}

impl TableChange {
    fn new(change: ObjectChange<Table>) -> Self {
        Self {
            change,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
            partitions: Vec::new(),
            requires_recreation: false,
        }
    }
}

fn diff_owners(old: &Catalog, new: &Catalog) -> Vec<OwnershipChange> {
    let owner = |s: &Sequence| match (&s.owner_table, &s.owner_column) {
        (Some(table), Some(column)) => Some(format!("{}.{}", table, column)),
        _ => None,
    };

    new.sequences
        .iter()
        .filter_map(|((schema, name), entry)| {
            let old_owner = old.sequences.get(&(schema.clone(), name.clone())).and_then(|e| owner(&e.meta));
            let new_owner = owner(&entry.meta);
            (old_owner != new_owner).then(|| OwnershipChange {
                schema: schema.clone(),
                sequence: name.clone(),
                old_owner,
                new_owner,
            })
        })
        .collect()
}

// =============================================================================
// Pairing
// =============================================================================

/// One key of a two-sided comparison.
enum Pairing<'a, K, T> {
    Added(&'a K, &'a T),
    Both(&'a K, &'a T, &'a T),
    Removed(&'a K, &'a T),
}

/// Pair two ordered maps: keys of `new` in order, then keys only in `old`.
fn pair_up<'a, K: Hash + Eq, T>(
    old: &'a IndexMap<K, T>,
    new: &'a IndexMap<K, T>,
) -> Vec<Pairing<'a, K, T>> {
    let mut out: Vec<Pairing<'a, K, T>> = new
        .iter()
        .map(|(key, n)| match old.get(key) {
            Some(o) => Pairing::Both(key, o, n),
            None => Pairing::Added(key, n),
        })
        .collect();
    out.extend(
        old.iter()
            .filter(|(key, _)| !new.contains_key(*key))
            .map(|(key, o)| Pairing::Removed(key, o)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgdelta_schema::extract;
    use pretty_assertions::assert_eq;

    fn sdl(old: &str, new: &str) -> ChangeSet {
        SchemaDiffer::default().diff_sdl(old, new).unwrap()
    }

    fn models(old: &str, new: &str) -> ChangeSet {
        SchemaDiffer::default().diff_models(&extract(old).unwrap(), &extract(new).unwrap())
    }

    #[test]
    fn test_identical_is_empty() {
        let text = "CREATE TABLE users (id serial PRIMARY KEY, name text NOT NULL);";
        assert!(sdl(text, text).is_empty());
        assert!(models(text, text).is_empty());
        assert_eq!(sdl(text, text).summary(), "No changes");
    }

    #[test]
    fn test_create_table_from_empty() {
        let changes = sdl(
            "",
            "CREATE TABLE users(id SERIAL PRIMARY KEY, name TEXT NOT NULL);",
        );
        assert_eq!(changes.tables.len(), 1);
        let table = &changes.tables[0];
        assert_eq!(table.change.action, DiffAction::Create);
        assert_eq!(table.change.name, "users");
        assert!(table.change.old_fragment.is_none());
        assert_eq!(
            table.change.new_fragment.as_deref(),
            Some("CREATE TABLE users(\n id SERIAL PRIMARY KEY,\n name TEXT NOT NULL\n)")
        );
        assert!(changes.schemas.is_empty());
        assert_eq!(changes.summary(), "Create 1 tables");
    }

    #[test]
    fn test_column_changes() {
        let changes = models(
            "CREATE TABLE t (id integer, a text, b text);",
            "CREATE TABLE t (id bigint, a text, c text);",
        );
        let table = &changes.tables[0];
        assert_eq!(table.change.action, DiffAction::Alter);
        let columns: Vec<(&str, DiffAction)> = table
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.action))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("id", DiffAction::Alter),
                ("c", DiffAction::Create),
                ("b", DiffAction::Drop),
            ]
        );
    }

    #[test]
    fn test_check_change_is_drop_then_create() {
        let changes = sdl(
            "CREATE TABLE p (price integer, CONSTRAINT price_positive CHECK (price > 0));",
            "CREATE TABLE p (price integer, CONSTRAINT price_positive CHECK (price >= 0));",
        );
        let checks = &changes.tables[0].check_constraints;
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].action, DiffAction::Drop);
        assert_eq!(checks[1].action, DiffAction::Create);
    }

    #[test]
    fn test_check_spelling_is_not_a_change() {
        let changes = sdl(
            "CREATE TABLE p (price integer, CONSTRAINT price_positive CHECK (price > 0));",
            "CREATE TABLE p (price integer, CONSTRAINT price_positive CHECK ((price>0)));",
        );
        assert!(changes.tables.is_empty());
    }

    #[test]
    fn test_comment_only_change() {
        let old = "CREATE TABLE t (id integer); COMMENT ON TABLE t IS 'old';";
        let new = "CREATE TABLE t (id integer); COMMENT ON TABLE t IS 'new';";
        for changes in [sdl(old, new), models(old, new)] {
            assert!(changes.tables.is_empty());
            assert_eq!(changes.comments.len(), 1);
            assert_eq!(changes.comments[0].action, DiffAction::Alter);
            assert_eq!(changes.comments[0].new.as_deref(), Some("new"));
        }
    }

    #[test]
    fn test_dropped_table_has_no_comment_diff() {
        let changes = sdl(
            "CREATE TABLE t (id integer); COMMENT ON TABLE t IS 'gone';",
            "",
        );
        assert_eq!(changes.tables.len(), 1);
        assert_eq!(changes.tables[0].change.action, DiffAction::Drop);
        assert!(changes.comments.is_empty());
    }

    #[test]
    fn test_removed_comment_is_dropped() {
        let changes = sdl(
            "CREATE TABLE t (id integer); COMMENT ON COLUMN t.id IS 'key';",
            "CREATE TABLE t (id integer);",
        );
        assert_eq!(changes.comments.len(), 1);
        let comment = &changes.comments[0];
        assert_eq!(comment.action, DiffAction::Drop);
        assert_eq!(comment.kind, ObjectKind::Column);
        assert_eq!(comment.sub_object.as_deref(), Some("id"));
        assert!(comment.new.is_none());
    }

    #[test]
    fn test_created_object_comment() {
        let changes = sdl("", "CREATE TABLE t (id integer); COMMENT ON TABLE t IS 'hi';");
        assert_eq!(changes.tables.len(), 1);
        assert_eq!(changes.comments.len(), 1);
        assert_eq!(changes.comments[0].action, DiffAction::Create);
    }

    #[test]
    fn test_comments_can_be_ignored() {
        let config = DeltaConfig::from_str("[diff]\ncompare_comments = false\n").unwrap();
        let changes = SchemaDiffer::new(&config)
            .diff_sdl("", "CREATE TABLE t (id integer); COMMENT ON TABLE t IS 'hi';")
            .unwrap();
        assert!(changes.comments.is_empty());
    }

    #[test]
    fn test_enum_change_is_drop_then_create() {
        let changes = sdl(
            "CREATE TYPE mood AS ENUM ('sad', 'ok');",
            "CREATE TYPE mood AS ENUM ('sad', 'ok', 'happy');",
        );
        let actions: Vec<DiffAction> = changes.enums.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![DiffAction::Drop, DiffAction::Create]);
    }

    #[test]
    fn test_view_spelling_is_not_a_change() {
        let changes = sdl(
            "CREATE TABLE users (id integer, name text, active boolean);
             CREATE VIEW active_users AS SELECT id, name FROM public.users WHERE active = true;",
            "CREATE TABLE users (id integer, name text, active boolean);
             CREATE VIEW active_users AS SELECT id, name FROM users WHERE (active = true);",
        );
        assert!(changes.views.is_empty());
    }

    #[test]
    fn test_view_column_removal() {
        let changes = sdl(
            "CREATE TABLE users (id integer, name text);
             CREATE VIEW v AS SELECT id, name FROM users;",
            "CREATE TABLE users (id integer, name text);
             CREATE VIEW v AS SELECT id FROM users;",
        );
        assert_eq!(changes.views.len(), 1);
        let comparison = changes.views[0].comparison.as_ref().unwrap();
        assert!(comparison.requires_recreation);
    }

    #[test]
    fn test_function_body_change() {
        let changes = sdl(
            "CREATE FUNCTION one() RETURNS integer LANGUAGE sql AS $$ SELECT 1 $$;",
            "CREATE FUNCTION one() RETURNS integer LANGUAGE sql AS $$ SELECT 1 + 0 $$;",
        );
        assert_eq!(changes.functions.len(), 1);
        assert_eq!(changes.functions[0].change.name, "one()");
        let comparison = changes.functions[0].comparison.as_ref().unwrap();
        assert!(comparison.can_use_alter);
    }

    #[test]
    fn test_trigger_change_is_drop_then_create() {
        let table = "CREATE TABLE t (id integer);
                     CREATE FUNCTION touch() RETURNS trigger LANGUAGE plpgsql AS $$ BEGIN RETURN NEW; END $$;";
        let changes = sdl(
            &format!("{table} CREATE TRIGGER t_touch BEFORE INSERT ON t FOR EACH ROW EXECUTE FUNCTION touch();"),
            &format!("{table} CREATE TRIGGER t_touch BEFORE UPDATE ON t FOR EACH ROW EXECUTE FUNCTION touch();"),
        );
        let actions: Vec<DiffAction> = changes.triggers.iter().map(|t| t.change.action).collect();
        assert_eq!(actions, vec![DiffAction::Drop, DiffAction::Create]);
        assert_eq!(changes.triggers[0].relation, "t");
    }

    #[test]
    fn test_schema_create_skips_system() {
        let changes = sdl("", "CREATE SCHEMA app; CREATE TABLE app.t (id integer);");
        let names: Vec<&str> = changes.schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["app"]);
    }

    #[test]
    fn test_sequence_owner_change() {
        let changes = sdl(
            "CREATE TABLE t (n bigint); CREATE SEQUENCE s;",
            "CREATE TABLE t (n bigint); CREATE SEQUENCE s; ALTER SEQUENCE s OWNED BY t.n;",
        );
        assert!(changes.sequences.is_empty());
        assert_eq!(changes.sequence_owners.len(), 1);
        assert_eq!(changes.sequence_owners[0].new_owner.as_deref(), Some("t.n"));
    }

    #[test]
    fn test_metadata_is_optional() {
        let old = extract("CREATE TABLE t (id integer);").unwrap();
        let new = extract("CREATE TABLE t (id integer, x text);").unwrap();

        let plain = SchemaDiffer::default().diff_models(&old, &new);
        assert!(plain.tables[0].change.new.is_none());
        assert!(plain.tables[0].columns[0].new.is_none());

        let rich = SchemaDiffer::default().with_metadata(true).diff_models(&old, &new);
        assert_eq!(rich.tables[0].change.new.as_ref().unwrap().columns.len(), 2);
        assert_eq!(rich.tables[0].columns[0].new.as_ref().unwrap().name, "x");
    }

    #[test]
    fn test_missing_side_is_empty() {
        let db = extract("CREATE TABLE t (id integer);").unwrap();
        let changes = SchemaDiffer::default().diff(None, Some(&db));
        assert_eq!(changes.tables[0].change.action, DiffAction::Create);
        let changes = SchemaDiffer::default().diff(Some(&db), None);
        assert_eq!(changes.tables[0].change.action, DiffAction::Drop);
    }
}
