//! SDL writer.
//!
//! Re-serializes model objects as DDL. Statements are returned without a
//! trailing semicolon; [`write_database`] joins them into a document that
//! extracts back to an equal model.

use crate::model::{
    CheckConstraint, Column, ColumnDefault, Database, EnumType, Extension, ForeignKey, Function,
    IdentityGeneration, Index, MatchType, MaterializedView, ObjectKind, Partition,
    ReferentialAction, Sequence, Table, View, serial_for,
};

impl Database {
    /// Render the whole model as an SDL document.
    pub fn to_sdl(&self) -> String {
        write_database(self, &[])
    }
}

/// Render `db` as an SDL document. `system_schemas` and the default schema
/// are assumed to exist and get no `CREATE SCHEMA`.
pub fn write_database(db: &Database, system_schemas: &[String]) -> String {
    let mut statements = Vec::new();

    for name in db.schemas.keys() {
        if name.as_str() != db.default_schema && !system_schemas.iter().any(|s| s == name.as_str())
        {
            statements.push(create_schema(name));
        }
    }
    statements.extend(db.extensions.values().map(create_extension));

    for (name, schema) in &db.schemas {
        statements.extend(schema.enum_types.values().map(|e| create_enum_type(name, e)));
        statements.extend(schema.sequences.values().map(|s| create_sequence(name, s)));
    }

    for (name, schema) in &db.schemas {
        for table in schema.tables.values() {
            statements.push(create_table(name, table, &db.default_schema));
            statements.extend(
                table
                    .partitions
                    .iter()
                    .flat_map(|p| create_partition(name, &table.name, p)),
            );
            statements.extend(
                table
                    .indexes
                    .iter()
                    .filter(|i| !i.is_constraint)
                    .map(|i| create_index(name, &table.name, i)),
            );
        }
        statements.extend(schema.views.values().map(|v| create_view(name, v)));
        for view in schema.materialized_views.values() {
            statements.push(create_materialized_view(name, view));
            statements.extend(view.indexes.iter().map(|i| create_index(name, &view.name, i)));
        }
        statements.extend(schema.functions.values().map(create_function));
    }

    for (name, schema) in &db.schemas {
        for table in schema.tables.values() {
            statements.extend(table.foreign_keys.iter().map(|fk| {
                add_constraint(name, &table.name, &foreign_key_clause(fk))
            }));
        }
        statements.extend(
            schema
                .sequences
                .values()
                .filter_map(|s| sequence_owned_by(name, s)),
        );
    }

    for schema in db.schemas.values() {
        for table in schema.tables.values() {
            statements.extend(table.triggers.iter().map(|t| t.definition.clone()));
            statements.extend(table.rules.iter().map(|r| r.definition.clone()));
        }
        for view in schema.views.values() {
            statements.extend(view.triggers.iter().map(|t| t.definition.clone()));
        }
        for view in schema.materialized_views.values() {
            statements.extend(view.triggers.iter().map(|t| t.definition.clone()));
        }
    }

    statements.extend(comments(db));

    statements.into_iter().map(|s| format!("{s};\n\n")).collect()
}

// =============================================================================
// Quoting
// =============================================================================

/// Quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// `"schema"."name"`.
pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

/// Lay out a CREATE TABLE from its head, element texts and trailing options.
///
/// ```rust,ignore
/// let sql = format_create_table("CREATE TABLE users", &["id serial", "name text"], "");
/// assert_eq!(sql, "CREATE TABLE users(\n id serial,\n name text\n)");
/// ```
pub fn format_create_table(head: &str, elements: &[impl AsRef<str>], tail: &str) -> String {
    let body: Vec<&str> = elements.iter().map(|e| e.as_ref()).collect();
    let mut sql = format!("{}(\n {}\n)", head.trim_end(), body.join(",\n "));
    if !tail.trim().is_empty() {
        sql.push(' ');
        sql.push_str(tail.trim());
    }
    sql
}

// =============================================================================
// Schemas, extensions, types and sequences
// =============================================================================

/// CREATE SCHEMA.
pub fn create_schema(name: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(name))
}

/// CREATE EXTENSION.
pub fn create_extension(extension: &Extension) -> String {
    let mut sql = format!("CREATE EXTENSION IF NOT EXISTS {}", quote_ident(&extension.name));
    if let Some(schema) = &extension.schema {
        sql.push_str(&format!(" WITH SCHEMA {}", quote_ident(schema)));
    }
    if let Some(version) = &extension.version {
        sql.push_str(&format!(" VERSION {}", quote_literal(version)));
    }
    sql
}

/// CREATE TYPE ... AS ENUM.
pub fn create_enum_type(schema: &str, enum_type: &EnumType) -> String {
    let labels: Vec<String> = enum_type.values.iter().map(|v| quote_literal(v)).collect();
    format!(
        "CREATE TYPE {} AS ENUM ({})",
        qualified(schema, &enum_type.name),
        labels.join(", ")
    )
}

/// CREATE SEQUENCE. Ownership is written separately by [`sequence_owned_by`].
pub fn create_sequence(schema: &str, sequence: &Sequence) -> String {
    let mut sql = format!("CREATE SEQUENCE {}", qualified(schema, &sequence.name));
    let options = sequence_options(sequence, "bigint");
    if !options.is_empty() {
        sql.push(' ');
        sql.push_str(&options.join(" "));
    }
    sql
}

/// ALTER SEQUENCE ... OWNED BY, when the sequence has an owner.
pub fn sequence_owned_by(schema: &str, sequence: &Sequence) -> Option<String> {
    let table = sequence.owner_table.as_deref()?;
    let column = sequence.owner_column.as_deref()?;
    Some(format!(
        "ALTER SEQUENCE {} OWNED BY {}.{}",
        qualified(schema, &sequence.name),
        qualified(schema, table),
        quote_ident(column)
    ))
}

/// Non-default sequence options, relative to `default_type`.
fn sequence_options(sequence: &Sequence, default_type: &str) -> Vec<String> {
    let mut options = Vec::new();
    if sequence.data_type != default_type {
        options.push(format!("AS {}", sequence.data_type));
    }
    if sequence.increment != 1 {
        options.push(format!("INCREMENT BY {}", sequence.increment));
    }
    if let Some(min) = sequence.min_value {
        options.push(format!("MINVALUE {}", min));
    }
    if let Some(max) = sequence.max_value {
        options.push(format!("MAXVALUE {}", max));
    }
    if sequence.start != 1 {
        options.push(format!("START WITH {}", sequence.start));
    }
    if sequence.cache != 1 {
        options.push(format!("CACHE {}", sequence.cache));
    }
    if sequence.cycle {
        options.push("CYCLE".to_string());
    }
    options
}

// =============================================================================
// Tables
// =============================================================================

/// CREATE TABLE with columns and inline key and check constraints.
///
/// Foreign keys are left out; they are added with [`add_constraint`] once
/// every table exists.
pub fn create_table(schema: &str, table: &Table, default_schema: &str) -> String {
    let mut elements: Vec<String> = table
        .columns
        .iter()
        .map(|c| column_definition(schema, table, c, default_schema))
        .collect();
    elements.extend(table.indexes.iter().filter_map(constraint_clause));
    elements.extend(table.check_constraints.iter().map(check_clause));

    let tail = match &table.partition_key {
        Some(key) => format!("PARTITION BY {}", key),
        None => String::new(),
    };
    format_create_table(
        &format!("CREATE TABLE {}", qualified(schema, &table.name)),
        &elements,
        &tail,
    )
}

/// Column definition as it appears inside CREATE TABLE.
pub fn column_definition(schema: &str, table: &Table, column: &Column, default_schema: &str) -> String {
    let mut sql = quote_ident(&column.name);

    if let Some(serial) = implied_serial(schema, table, column, default_schema) {
        sql.push(' ');
        sql.push_str(serial);
        return sql;
    }

    sql.push(' ');
    sql.push_str(&column.data_type);
    if let Some(collation) = &column.collation {
        sql.push_str(&format!(" COLLATE {}", collation));
    }
    if let Some(expr) = &column.generated {
        sql.push_str(&format!(" GENERATED ALWAYS AS ({}) STORED", expr));
    }
    if let Some(mode) = column.identity.to_sql() {
        sql.push_str(&format!(" GENERATED {} AS IDENTITY", mode));
        if let Some(sequence) = table.owned_sequence(&column.name) {
            let mut options = Vec::new();
            if sequence.name != format!("{}_{}_seq", table.name, column.name) {
                options.push(format!("SEQUENCE NAME {}", quote_ident(&sequence.name)));
            }
            options.extend(sequence_options(sequence, &column.data_type));
            if !options.is_empty() {
                sql.push_str(&format!(" ({})", options.join(" ")));
            }
        }
    } else if !column.nullable {
        sql.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        sql.push_str(&format!(" DEFAULT {}", default.to_sql()));
    }
    sql
}

/// `serial` / `bigserial` / `smallserial` when the column is exactly what
/// that shorthand expands to.
fn implied_serial(
    schema: &str,
    table: &Table,
    column: &Column,
    default_schema: &str,
) -> Option<&'static str> {
    let serial = serial_for(&column.data_type)?;
    if column.nullable || column.identity != IdentityGeneration::None {
        return None;
    }

    let sequence = table.owned_sequence(&column.name)?;
    let expected = format!("{}_{}_seq", table.name, column.name);
    let regclass = if schema == default_schema {
        expected.clone()
    } else {
        format!("{}.{}", schema, expected)
    };
    let default = ColumnDefault::Expression(format!("nextval('{}'::regclass)", regclass));

    (sequence.name == expected
        && sequence.has_default_options(&column.data_type)
        && column.default.as_ref() == Some(&default))
    .then_some(serial)
}

/// PRIMARY KEY / UNIQUE clause for a constraint-backed index.
pub fn constraint_clause(index: &Index) -> Option<String> {
    if !index.is_constraint {
        return None;
    }
    let kind = if index.primary { "PRIMARY KEY" } else { "UNIQUE" };
    let mut sql = format!(
        "CONSTRAINT {} {} ({})",
        quote_ident(&index.name),
        kind,
        ident_list(&index.expressions)
    );
    if !index.include.is_empty() {
        sql.push_str(&format!(" INCLUDE ({})", ident_list(&index.include)));
    }
    Some(sql)
}

/// CHECK clause.
pub fn check_clause(check: &CheckConstraint) -> String {
    let mut sql = format!("CONSTRAINT {} CHECK ({})", quote_ident(&check.name), check.expression);
    if check.no_inherit {
        sql.push_str(" NO INHERIT");
    }
    sql
}

/// FOREIGN KEY clause.
pub fn foreign_key_clause(fk: &ForeignKey) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote_ident(&fk.name),
        ident_list(&fk.columns),
        qualified(&fk.referenced_schema, &fk.referenced_table),
        ident_list(&fk.referenced_columns)
    );
    if fk.match_type != MatchType::Simple {
        sql.push_str(&format!(" MATCH {}", fk.match_type.to_sql()));
    }
    if fk.on_delete != ReferentialAction::NoAction {
        sql.push_str(&format!(" ON DELETE {}", fk.on_delete.to_sql()));
    }
    if fk.on_update != ReferentialAction::NoAction {
        sql.push_str(&format!(" ON UPDATE {}", fk.on_update.to_sql()));
    }
    sql
}

/// ALTER TABLE ... ADD `clause`.
pub fn add_constraint(schema: &str, table: &str, clause: &str) -> String {
    format!("ALTER TABLE {} ADD {}", qualified(schema, table), clause)
}

/// CREATE INDEX for a plain (non-constraint) index.
pub fn create_index(schema: &str, relation: &str, index: &Index) -> String {
    let keys: Vec<String> = index
        .expressions
        .iter()
        .enumerate()
        .map(|(i, expr)| {
            let mut key = if is_plain_ident(expr) {
                quote_ident(expr)
            } else {
                expr.clone()
            };
            if index.descending.get(i).copied().unwrap_or(false) {
                key.push_str(" DESC");
            }
            key
        })
        .collect();

    let mut sql = format!(
        "CREATE {}INDEX {} ON {} USING {} ({})",
        if index.unique { "UNIQUE " } else { "" },
        quote_ident(&index.name),
        qualified(schema, relation),
        index.method,
        keys.join(", ")
    );
    if !index.include.is_empty() {
        sql.push_str(&format!(" INCLUDE ({})", ident_list(&index.include)));
    }
    if let Some(predicate) = &index.predicate {
        sql.push_str(&format!(" WHERE {}", predicate));
    }
    sql
}

/// CREATE TABLE ... PARTITION OF, followed by its sub-partitions.
pub fn create_partition(schema: &str, parent: &str, partition: &Partition) -> Vec<String> {
    let mut sql = format!(
        "CREATE TABLE {} PARTITION OF {} {}",
        qualified(&partition.schema, &partition.name),
        qualified(schema, parent),
        partition.bound
    );
    if let Some(key) = &partition.partition_key {
        sql.push_str(&format!(" PARTITION BY {}", key));
    }

    let mut statements = vec![sql];
    for child in &partition.partitions {
        statements.extend(create_partition(&partition.schema, &partition.name, child));
    }
    statements
}

// =============================================================================
// Views and routines
// =============================================================================

/// CREATE VIEW.
pub fn create_view(schema: &str, view: &View) -> String {
    format!(
        "CREATE VIEW {}{} AS {}",
        qualified(schema, &view.name),
        column_names(&view.columns),
        view.definition
    )
}

/// CREATE MATERIALIZED VIEW.
pub fn create_materialized_view(schema: &str, view: &MaterializedView) -> String {
    format!(
        "CREATE MATERIALIZED VIEW {}{} AS {} WITH {}DATA",
        qualified(schema, &view.name),
        column_names(&view.columns),
        view.definition,
        if view.with_data { "" } else { "NO " }
    )
}

/// CREATE FUNCTION / PROCEDURE, as written.
pub fn create_function(function: &Function) -> String {
    function.definition.clone()
}

/// `"schema"."name"(argument types)` as used by COMMENT ON and DROP.
pub fn routine_target(schema: &str, function: &Function) -> String {
    format!(
        "{}({})",
        qualified(schema, &function.name),
        function.argument_types()
    )
}

// =============================================================================
// Comments
// =============================================================================

/// COMMENT ON `kind` `target` IS ...; `None` writes `IS NULL`.
pub fn comment_on(kind: ObjectKind, target: &str, comment: Option<&str>) -> String {
    let value = match comment {
        Some(text) => quote_literal(text),
        None => "NULL".to_string(),
    };
    format!("COMMENT ON {} {} IS {}", kind.sql_keyword(), target, value)
}

/// `"name" ON "schema"."table"`, the target form of constraints and triggers.
pub fn on_table_target(name: &str, schema: &str, table: &str) -> String {
    format!("{} ON {}", quote_ident(name), qualified(schema, table))
}

/// COMMENT ON statements for every commented object, in model order.
pub fn comments(db: &Database) -> Vec<String> {
    let mut out = Vec::new();
    let mut push = |kind: ObjectKind, target: String, comment: &Option<String>| {
        if let Some(text) = comment {
            out.push(comment_on(kind, &target, Some(text)));
        }
    };

    for extension in db.extensions.values() {
        push(ObjectKind::Extension, quote_ident(&extension.name), &extension.comment);
    }

    for (name, schema) in &db.schemas {
        push(ObjectKind::Schema, quote_ident(name), &schema.comment);

        for e in schema.enum_types.values() {
            push(ObjectKind::Type, qualified(name, &e.name), &e.comment);
        }
        for s in schema.sequences.values() {
            push(ObjectKind::Sequence, qualified(name, &s.name), &s.comment);
        }
        for table in schema.tables.values() {
            push(ObjectKind::Table, qualified(name, &table.name), &table.comment);
            for column in &table.columns {
                let target = format!("{}.{}", qualified(name, &table.name), quote_ident(&column.name));
                push(ObjectKind::Column, target, &column.comment);
            }
            for index in &table.indexes {
                if index.is_constraint {
                    let target = on_table_target(&index.name, name, &table.name);
                    push(ObjectKind::Constraint, target, &index.comment);
                } else {
                    push(ObjectKind::Index, qualified(name, &index.name), &index.comment);
                }
            }
            for fk in &table.foreign_keys {
                push(ObjectKind::Constraint, on_table_target(&fk.name, name, &table.name), &fk.comment);
            }
            for check in &table.check_constraints {
                push(
                    ObjectKind::Constraint,
                    on_table_target(&check.name, name, &table.name),
                    &check.comment,
                );
            }
            for trigger in &table.triggers {
                push(
                    ObjectKind::Trigger,
                    on_table_target(&trigger.name, name, &table.name),
                    &trigger.comment,
                );
            }
            for sequence in &table.sequences {
                push(ObjectKind::Sequence, qualified(name, &sequence.name), &sequence.comment);
            }
        }
        for view in schema.views.values() {
            push(ObjectKind::View, qualified(name, &view.name), &view.comment);
            for trigger in &view.triggers {
                push(
                    ObjectKind::Trigger,
                    on_table_target(&trigger.name, name, &view.name),
                    &trigger.comment,
                );
            }
        }
        for view in schema.materialized_views.values() {
            push(ObjectKind::MaterializedView, qualified(name, &view.name), &view.comment);
            for index in &view.indexes {
                push(ObjectKind::Index, qualified(name, &index.name), &index.comment);
            }
            for trigger in &view.triggers {
                push(
                    ObjectKind::Trigger,
                    on_table_target(&trigger.name, name, &view.name),
                    &trigger.comment,
                );
            }
        }
        for function in schema.functions.values() {
            push(function.kind.into(), routine_target(name, function), &function.comment);
        }
    }

    out
}

fn ident_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident(n))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_names(columns: &[String]) -> String {
    if columns.is_empty() {
        String::new()
    } else {
        format!(" ({})", ident_list(columns))
    }
}

/// A bare identifier as stored by the extractor, as opposed to an expression.
fn is_plain_ident(text: &str) -> bool {
    let mut chars = text.chars();
    chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quoting() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(qualified("app", "t"), "\"app\".\"t\"");
    }

    #[test]
    fn test_format_create_table() {
        assert_eq!(
            format_create_table("CREATE TABLE users", &["id SERIAL PRIMARY KEY", "name TEXT NOT NULL"], ""),
            "CREATE TABLE users(\n id SERIAL PRIMARY KEY,\n name TEXT NOT NULL\n)"
        );
        assert_eq!(
            format_create_table("CREATE TABLE t ", &["a int"], "PARTITION BY LIST (a)"),
            "CREATE TABLE t(\n a int\n) PARTITION BY LIST (a)"
        );
    }

    #[test]
    fn test_create_table_writes_serial() {
        let db = extract("CREATE TABLE users (id serial PRIMARY KEY, name varchar(40) NOT NULL DEFAULT 'x')")
            .unwrap();
        let users = db.table("public", "users").unwrap();

        assert_eq!(
            create_table("public", users, "public"),
            "CREATE TABLE \"public\".\"users\"(\n \
             \"id\" serial,\n \
             \"name\" character varying(40) NOT NULL DEFAULT 'x',\n \
             CONSTRAINT \"users_pkey\" PRIMARY KEY (\"id\")\n)"
        );
    }

    #[test]
    fn test_identity_options() {
        let db = extract(
            "CREATE TABLE t (id integer GENERATED ALWAYS AS IDENTITY (START WITH 5 SEQUENCE NAME t_ids))",
        )
        .unwrap();
        let t = db.table("public", "t").unwrap();
        assert_eq!(
            column_definition("public", t, &t.columns[0], "public"),
            "\"id\" integer GENERATED ALWAYS AS IDENTITY (SEQUENCE NAME \"t_ids\" START WITH 5)"
        );
    }

    #[test]
    fn test_foreign_key_clause() {
        let db = extract(
            "CREATE TABLE a (b_id integer REFERENCES app.b (id) MATCH FULL ON UPDATE SET NULL)",
        )
        .unwrap();
        let fk = &db.table("public", "a").unwrap().foreign_keys[0];
        assert_eq!(
            foreign_key_clause(fk),
            "CONSTRAINT \"a_b_id_fkey\" FOREIGN KEY (\"b_id\") REFERENCES \"app\".\"b\" (\"id\") \
             MATCH FULL ON UPDATE SET NULL"
        );
    }

    #[test]
    fn test_create_index() {
        let db = extract(
            "CREATE TABLE t (a text, b int);\n\
             CREATE UNIQUE INDEX t_idx ON t (lower(a), b DESC) WHERE b > 0;",
        )
        .unwrap();
        let index = &db.table("public", "t").unwrap().indexes[0];
        assert_eq!(
            create_index("public", "t", index),
            "CREATE UNIQUE INDEX \"t_idx\" ON \"public\".\"t\" USING btree (lower(a), \"b\" DESC) WHERE b > 0"
        );
    }

    #[test]
    fn test_create_types_snapshot() {
        let db = extract(
            "CREATE EXTENSION IF NOT EXISTS hstore WITH SCHEMA ext VERSION '1.8';\n\
             CREATE TYPE app.mood AS ENUM ('sad', 'it''s fine');",
        )
        .unwrap();

        let mood = &db.schema("app").unwrap().enum_types[0];
        insta::assert_snapshot!(
            create_enum_type("app", mood),
            @r#"CREATE TYPE "app"."mood" AS ENUM ('sad', 'it''s fine')"#
        );
        insta::assert_snapshot!(
            create_extension(&db.extensions[0]),
            @r#"CREATE EXTENSION IF NOT EXISTS "hstore" WITH SCHEMA "ext" VERSION '1.8'"#
        );
    }

    #[test]
    fn test_comment_on() {
        assert_eq!(
            comment_on(ObjectKind::Table, "\"public\".\"t\"", Some("it's")),
            "COMMENT ON TABLE \"public\".\"t\" IS 'it''s'"
        );
        assert_eq!(
            comment_on(ObjectKind::Constraint, &on_table_target("c", "public", "t"), None),
            "COMMENT ON CONSTRAINT \"c\" ON \"public\".\"t\" IS NULL"
        );
    }

    #[test]
    fn test_round_trip() {
        let sql = "CREATE SCHEMA app;\n\
             CREATE EXTENSION IF NOT EXISTS citext;\n\
             CREATE TYPE app.status AS ENUM ('new', 'done');\n\
             CREATE SEQUENCE app.counter INCREMENT BY 2 CACHE 10;\n\
             CREATE TABLE app.tasks (\n\
               id bigserial PRIMARY KEY,\n\
               seq bigint GENERATED BY DEFAULT AS IDENTITY,\n\
               state app.status NOT NULL DEFAULT 'new',\n\
               owner_id integer REFERENCES users (id) ON DELETE CASCADE,\n\
               title text COLLATE \"C\" CHECK (length(title) > 0),\n\
               CHECK (seq > 0)\n\
             ) PARTITION BY HASH (id);\n\
             CREATE TABLE app.tasks_0 PARTITION OF app.tasks FOR VALUES WITH (MODULUS 2, REMAINDER 0);\n\
             CREATE TABLE users (id serial PRIMARY KEY, email text UNIQUE);\n\
             CREATE INDEX users_email_lower ON users (lower(email));\n\
             CREATE VIEW app.open_tasks (id) AS SELECT id FROM app.tasks WHERE state = 'new';\n\
             CREATE MATERIALIZED VIEW app.counts AS SELECT count(*) AS n FROM app.tasks WITH NO DATA;\n\
             CREATE INDEX counts_n ON app.counts (n);\n\
             CREATE FUNCTION app.touch() RETURNS trigger LANGUAGE plpgsql AS $$ BEGIN RETURN NEW; END $$;\n\
             CREATE TRIGGER tasks_touch BEFORE UPDATE ON app.tasks FOR EACH ROW EXECUTE FUNCTION app.touch();\n\
             ALTER SEQUENCE app.counter OWNED BY app.tasks.seq;\n\
             COMMENT ON TABLE app.tasks IS 'Work items';\n\
             COMMENT ON COLUMN users.email IS 'Login';\n\
             COMMENT ON FUNCTION app.touch() IS 'Trigger';";

        let db = extract(sql).unwrap();
        let sdl = db.to_sdl();
        let again = extract(&sdl).unwrap();
        assert_eq!(db, again);
        assert_eq!(sdl, again.to_sdl());
    }
}
