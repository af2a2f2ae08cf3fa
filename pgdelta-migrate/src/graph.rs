//! Dependency ordering.
//!
//! Functions, tables, views and materialized views share one graph. An edge
//! `a -> b` means `a` is created before `b`:
//!
//! - a referenced table before the table holding the foreign key;
//! - a table or view before a view or materialized view selecting from it;
//! - a table before a routine whose body reads it.
//!
//! Enums, extensions and schemas are emitted before the graph; triggers,
//! rules and foreign key constraints after it. Drops walk the graph in
//! reverse. A cycle is an error: no order is guessed.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use pgdelta_schema::model::{ObjectKind, RoutineKind};
use pgdelta_schema::parser::{
    ColumnConstraintKind, ForeignKeyTarget, QualifiedName, StatementKind, TableConstraintKind,
    TableElement, parse_statements, referenced_relations,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::diff::{ChangeSet, DiffAction, ObjectChange};
use crate::error::{MigrateResult, MigrationError};

/// Identity of a scheduled object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    /// Object kind.
    pub kind: ObjectKind,
    /// Schema.
    pub schema: String,
    /// Name; the signature for routines.
    pub name: String,
}

impl ObjectId {
    /// Create an identifier.
    pub fn new(kind: ObjectKind, schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            schema: schema.into(),
            name: name.into(),
        }
    }

    fn is_relation(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::Table | ObjectKind::View | ObjectKind::MaterializedView
        )
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

// =============================================================================
// Graph
// =============================================================================

/// A directed graph over objects, ordered by insertion.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: IndexSet<ObjectId>,
    edges: Vec<(usize, usize)>,
}

impl DependencyGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Adding a node twice keeps its first position.
    pub fn add_node(&mut self, id: ObjectId) -> usize {
        self.nodes.insert_full(id).0
    }

    /// Add an edge: `from` is created before `to`. Returns false when
    /// either end is unknown or both are the same node.
    pub fn add_edge(&mut self, from: &ObjectId, to: &ObjectId) -> bool {
        match (self.nodes.get_index_of(from), self.nodes.get_index_of(to)) {
            (Some(a), Some(b)) if a != b => {
                if !self.edges.contains(&(a, b)) {
                    self.edges.push((a, b));
                }
                true
            }
            _ => false,
        }
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topological order. Among ready nodes, the earliest inserted goes
    /// first, so the result is stable for a given input.
    pub fn order(&self) -> MigrateResult<Vec<ObjectId>> {
        let n = self.nodes.len();
        let mut indegree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for &(a, b) in &self.edges {
            successors[a].push(b);
            indegree[b] += 1;
        }

        let mut ready: BinaryHeap<Reverse<usize>> =
            (0..n).filter(|&i| indegree[i] == 0).map(Reverse).collect();
        let mut sorted = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            sorted.push(i);
            for &next in &successors[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if sorted.len() < n {
            let objects: Vec<String> = (0..n)
                .filter(|&i| indegree[i] > 0)
                .filter_map(|i| self.nodes.get_index(i))
                .map(|id| id.to_string())
                .collect();
            return Err(MigrationError::dependency_cycle(objects));
        }

        Ok(sorted
            .into_iter()
            .filter_map(|i| self.nodes.get_index(i).cloned())
            .collect())
    }
}

/// Order `objects` so that for every edge `(a, b)`, `a` precedes `b`.
/// Edges naming unknown objects are ignored.
pub fn order(objects: &[ObjectId], edges: &[(ObjectId, ObjectId)]) -> MigrateResult<Vec<ObjectId>> {
    let mut graph = DependencyGraph::new();
    for id in objects {
        graph.add_node(id.clone());
    }
    for (from, to) in edges {
        graph.add_edge(from, to);
    }
    graph.order()
}

// =============================================================================
// Scheduler
// =============================================================================

/// Ordered graph objects of a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Created and altered objects, dependencies first.
    pub forward: Vec<ObjectId>,
    /// Dropped objects, dependents first.
    pub drops: Vec<ObjectId>,
}

/// Builds the dependency graph of a [`ChangeSet`] and orders it.
#[derive(Debug, Clone)]
pub struct Scheduler {
    default_schema: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Side {
    Old,
    New,
}

impl Scheduler {
    /// Create a scheduler resolving unqualified names in `default_schema`.
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    /// Order the functions, tables, views and materialized views of `changes`.
    pub fn schedule(&self, changes: &ChangeSet) -> MigrateResult<Schedule> {
        let forward = self.order_side(changes, Side::New)?;
        let mut drops = self.order_side(changes, Side::Old)?;
        drops.reverse();

        debug!(forward = forward.len(), drops = drops.len(), "Scheduled changes");
        Ok(Schedule { forward, drops })
    }

    fn order_side(&self, changes: &ChangeSet, side: Side) -> MigrateResult<Vec<ObjectId>> {
        let mut nodes: IndexMap<ObjectId, &str> = IndexMap::new();
        // Routines go first: calls from queries and defaults are not edges.
        for function in &changes.functions {
            let change = &function.change;
            let kind = routine_kind(change.new_fragment.as_deref().or(change.old_fragment.as_deref()));
            push_node(&mut nodes, kind, change, side);
        }
        for table in &changes.tables {
            push_node(&mut nodes, ObjectKind::Table, &table.change, side);
        }
        for view in &changes.views {
            push_node(&mut nodes, ObjectKind::View, &view.change, side);
        }
        for view in &changes.materialized_views {
            push_node(&mut nodes, ObjectKind::MaterializedView, &view.change, side);
        }

        let mut graph = DependencyGraph::new();
        for id in nodes.keys() {
            graph.add_node(id.clone());
        }

        for (id, fragment) in &nodes {
            for dependency in self.dependencies(id, fragment, &nodes)? {
                graph.add_edge(&dependency, id);
            }
        }

        graph.order()
    }

    /// Graph objects `id` depends on, read from its fragment.
    fn dependencies(
        &self,
        id: &ObjectId,
        fragment: &str,
        nodes: &IndexMap<ObjectId, &str>,
    ) -> MigrateResult<Vec<ObjectId>> {
        let statements = parse_statements(fragment)?;
        let mut found = Vec::new();

        for statement in statements {
            match statement.kind {
                StatementKind::CreateTable(create) if id.kind == ObjectKind::Table => {
                    for element in &create.elements {
                        match element {
                            TableElement::Column(column) => {
                                for constraint in &column.constraints {
                                    if let ColumnConstraintKind::References(target) = &constraint.kind {
                                        found.push(self.referenced_table(target));
                                    }
                                }
                            }
                            TableElement::Constraint(constraint) => {
                                if let TableConstraintKind::ForeignKey { target, .. } = &constraint.kind {
                                    found.push(self.referenced_table(target));
                                }
                            }
                            TableElement::Like { .. } => {}
                        }
                    }
                }
                StatementKind::AddConstraint(add) if id.kind == ObjectKind::Table => {
                    if let TableConstraintKind::ForeignKey { target, .. } = &add.constraint.kind {
                        found.push(self.referenced_table(target));
                    }
                }
                StatementKind::CreateView(view) | StatementKind::CreateMaterializedView(view)
                    if id.kind != ObjectKind::Table =>
                {
                    found.extend(self.relations_in(&view.query, nodes));
                }
                StatementKind::CreateFunction(function) => {
                    if let Some(body) = function.body.as_deref() {
                        found.extend(self.relations_in(body, nodes));
                    }
                }
                _ => {}
            }
        }

        Ok(found)
    }

    fn referenced_table(&self, target: &ForeignKeyTarget) -> ObjectId {
        let QualifiedName { schema, name } = &target.table;
        ObjectId::new(
            ObjectKind::Table,
            schema.as_deref().unwrap_or(&self.default_schema),
            name.clone(),
        )
    }

    /// Graph relations read by a query or routine body.
    fn relations_in(&self, text: &str, nodes: &IndexMap<ObjectId, &str>) -> Vec<ObjectId> {
        let relation = |schema: &str, name: &str| {
            nodes
                .keys()
                .find(|id| id.is_relation() && id.schema == schema && id.name == name)
                .cloned()
        };
        match referenced_relations(text, &self.default_schema, |s, n| relation(s, n).is_some()) {
            Ok(refs) => refs
                .iter()
                .filter_map(|r| relation(&r.schema, &r.name))
                .collect(),
            Err(e) => {
                warn!(error = %e, "Could not scan definition for dependencies");
                Vec::new()
            }
        }
    }
}

fn push_node<'a, T>(
    nodes: &mut IndexMap<ObjectId, &'a str>,
    kind: ObjectKind,
    change: &'a ObjectChange<T>,
    side: Side,
) {
    let fragment = match side {
        Side::New if change.action != DiffAction::Drop => change.new_fragment.as_deref(),
        Side::Old if change.action == DiffAction::Drop => change.old_fragment.as_deref(),
        _ => None,
    };
    if let Some(fragment) = fragment {
        nodes.insert(ObjectId::new(kind, &change.schema, &change.name), fragment);
    }
}

/// FUNCTION or PROCEDURE, read from the routine's fragment.
pub(crate) fn routine_kind(fragment: Option<&str>) -> ObjectKind {
    let is_procedure = fragment.is_some_and(|text| {
        parse_statements(text).is_ok_and(|statements| {
            statements.iter().any(|s| {
                matches!(
                    &s.kind,
                    StatementKind::CreateFunction(f)
                        if f.kind == RoutineKind::Procedure
                )
            })
        })
    });
    if is_procedure {
        ObjectKind::Procedure
    } else {
        ObjectKind::Function
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::SchemaDiffer;
    use pretty_assertions::assert_eq;

    fn table(name: &str) -> ObjectId {
        ObjectId::new(ObjectKind::Table, "public", name)
    }

    fn names(ids: &[ObjectId]) -> Vec<&str> {
        ids.iter().map(|id| id.name.as_str()).collect()
    }

    fn schedule(old: &str, new: &str) -> MigrateResult<Schedule> {
        let changes = SchemaDiffer::default().diff_sdl(old, new)?;
        Scheduler::new("public").schedule(&changes)
    }

    #[test]
    fn test_order_respects_edges() {
        let objects = vec![table("c"), table("b"), table("a")];
        let edges = vec![(table("a"), table("b")), (table("b"), table("c"))];
        let sorted = order(&objects, &edges).unwrap();
        assert_eq!(names(&sorted), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_order_is_stable() {
        let objects = vec![table("x"), table("y"), table("z")];
        let sorted = order(&objects, &[]).unwrap();
        assert_eq!(names(&sorted), vec!["x", "y", "z"]);

        let edges = vec![(table("z"), table("x"))];
        let sorted = order(&objects, &edges).unwrap();
        assert_eq!(names(&sorted), vec!["y", "z", "x"]);
    }

    #[test]
    fn test_cycle_is_error() {
        let objects = vec![table("a"), table("b"), table("c")];
        let edges = vec![(table("a"), table("b")), (table("b"), table("a"))];
        let err = order(&objects, &edges).unwrap_err();
        match err {
            MigrationError::DependencyCycle { objects } => {
                assert_eq!(objects, vec!["public.a", "public.b"]);
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_edges_are_ignored() {
        let mut graph = DependencyGraph::new();
        graph.add_node(table("a"));
        assert!(!graph.add_edge(&table("a"), &table("a")));
        assert!(!graph.add_edge(&table("a"), &table("missing")));
        assert_eq!(graph.order().unwrap().len(), 1);
    }

    #[test]
    fn test_foreign_key_target_first() {
        let schedule = schedule(
            "",
            "CREATE TABLE orders (id integer PRIMARY KEY, customer_id integer REFERENCES customers (id));
             CREATE TABLE customers (id integer PRIMARY KEY);",
        )
        .unwrap();
        assert_eq!(names(&schedule.forward), vec!["customers", "orders"]);
    }

    #[test]
    fn test_view_and_function_after_tables() {
        let schedule = schedule(
            "",
            "CREATE FUNCTION user_count() RETURNS bigint LANGUAGE sql AS $$ SELECT count(*) FROM users $$;
             CREATE VIEW recent AS SELECT id FROM active;
             CREATE VIEW active AS SELECT id FROM users;
             CREATE TABLE users (id integer);",
        )
        .unwrap();
        assert_eq!(
            names(&schedule.forward),
            vec!["users", "user_count()", "active", "recent"]
        );
    }

    #[test]
    fn test_drops_are_reversed() {
        let schedule = schedule(
            "CREATE TABLE users (id integer);
             CREATE VIEW active AS SELECT id FROM users;",
            "",
        )
        .unwrap();
        assert!(schedule.forward.is_empty());
        assert_eq!(names(&schedule.drops), vec!["active", "users"]);
    }

    #[test]
    fn test_mutual_foreign_keys_fail() {
        let result = schedule(
            "",
            "CREATE TABLE a (id integer PRIMARY KEY, b_id integer REFERENCES b (id));
             CREATE TABLE b (id integer PRIMARY KEY, a_id integer REFERENCES a (id));",
        );
        assert!(matches!(result, Err(MigrationError::DependencyCycle { .. })));
    }

    #[test]
    fn test_procedure_kind() {
        let schedule = schedule(
            "",
            "CREATE PROCEDURE cleanup() LANGUAGE sql AS $$ DELETE FROM logs $$;",
        )
        .unwrap();
        assert_eq!(schedule.forward[0].kind, ObjectKind::Procedure);
    }
}
