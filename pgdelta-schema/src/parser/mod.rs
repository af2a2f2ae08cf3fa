//! SQL DDL parser.
//!
//! [`parse_statements`] splits a schema document into typed [`Statement`]s.
//! Statements outside the supported set are kept as [`StatementKind::Other`]
//! with their text; input the grammar cannot split at all is a
//! [`SchemaError::SyntaxError`].

mod convert;
mod grammar;
mod lexer;
mod syntax;

use std::path::Path;

use pest::Parser;

use crate::error::{SchemaError, SchemaResult};

pub use grammar::{Rule, SqlParser};
pub use lexer::{Token, TokenKind, referenced_relations, tokenize};
pub use syntax::*;

pub(crate) use convert::{squash, strip_parens, unquote_literal};

/// Parse a schema document into statements.
pub fn parse_statements(input: &str) -> SchemaResult<Vec<Statement>> {
    let mut pairs = SqlParser::parse(Rule::sdl, input).map_err(|e| syntax_error(input, e))?;
    let Some(document) = pairs.next() else {
        return Ok(Vec::new());
    };

    document
        .into_inner()
        .filter(|p| p.as_rule() == Rule::statement)
        .map(convert::statement)
        .collect()
}

/// Parse a schema document from a file.
pub fn parse_statements_file(path: impl AsRef<Path>) -> SchemaResult<Vec<Statement>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_statements(&content)
}

/// Parse a single column definition, e.g. `id serial PRIMARY KEY`.
pub fn parse_column_fragment(text: &str) -> SchemaResult<ColumnDef> {
    let fragment = parse_fragment(Rule::column_fragment, text)?;
    let column = fragment
        .into_inner()
        .find(|p| p.as_rule() == Rule::column_def)
        .ok_or_else(|| SchemaError::invalid_statement("column definition", "empty fragment"))?;
    convert::column_def(&column)
}

/// Parse a single table constraint, e.g. `CONSTRAINT c CHECK (x > 0)`.
pub fn parse_constraint_fragment(text: &str) -> SchemaResult<TableConstraint> {
    let fragment = parse_fragment(Rule::constraint_fragment, text)?;
    let constraint = fragment
        .into_inner()
        .find(|p| p.as_rule() == Rule::table_constraint)
        .ok_or_else(|| SchemaError::invalid_statement("table constraint", "empty fragment"))?;
    convert::table_constraint(&constraint)
}

fn parse_fragment(rule: Rule, text: &str) -> SchemaResult<pest::iterators::Pair<'_, Rule>> {
    SqlParser::parse(rule, text)
        .map_err(|e| syntax_error(text, e))?
        .next()
        .ok_or_else(|| SchemaError::syntax(text, 0, text.len(), "empty input"))
}

/// Convert a pest error into a located [`SchemaError::SyntaxError`].
pub(crate) fn syntax_error(input: &str, error: pest::error::Error<Rule>) -> SchemaError {
    let error = error.renamed_rules(rule_label);
    let (offset, len) = match error.location {
        pest::error::InputLocation::Pos(pos) => (pos, 0),
        pest::error::InputLocation::Span((start, end)) => (start, end - start),
    };
    let (line, column) = match error.line_col {
        pest::error::LineColLocation::Pos(pos) => pos,
        pest::error::LineColLocation::Span(start, _) => start,
    };
    SchemaError::syntax(
        input,
        offset,
        len,
        format!("{} at line {}, column {}", error.variant.message(), line, column),
    )
}

fn rule_label(rule: &Rule) -> String {
    let name = format!("{rule:?}");
    match name.strip_prefix("kw_") {
        Some(keyword) => format!("`{}`", keyword.to_ascii_uppercase()),
        None => name.replace('_', " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_empty_document() {
        assert!(parse_statements("").unwrap().is_empty());
        assert!(parse_statements("  -- nothing\n;;").unwrap().is_empty());
    }

    #[test]
    fn test_statement_text_and_span() {
        let input = "CREATE SCHEMA app;\nCREATE TABLE app.users (id integer);";
        let statements = parse_statements(input).unwrap();

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].text, "CREATE TABLE app.users (id integer)");
        assert_eq!(
            &input[statements[1].span.start..statements[1].span.end],
            statements[1].text
        );
    }

    #[test]
    fn test_parse_create_table() {
        let statements = parse_statements(
            "CREATE TABLE IF NOT EXISTS \"App\".orders (\n\
                id bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,\n\
                user_id integer NOT NULL REFERENCES users (id) ON DELETE CASCADE,\n\
                total numeric(10, 2) DEFAULT 0 CHECK (total >= 0),\n\
                CONSTRAINT orders_user_total_key UNIQUE (user_id, total)\n\
            ) PARTITION BY RANGE (id)",
        )
        .unwrap();

        let StatementKind::CreateTable(table) = &statements[0].kind else {
            panic!("expected CREATE TABLE");
        };
        assert_eq!(table.name, QualifiedName::qualified("App", "orders"));
        assert!(table.if_not_exists);
        assert_eq!(table.head, "CREATE TABLE IF NOT EXISTS \"App\".orders");
        assert_eq!(table.tail, "PARTITION BY RANGE (id)");
        assert_eq!(table.partition_by.as_ref().unwrap().to_string(), "RANGE (id)");
        assert_eq!(table.elements.len(), 4);

        let TableElement::Column(user_id) = &table.elements[1] else {
            panic!("expected column");
        };
        assert_eq!(user_id.data_type.as_deref(), Some("integer"));
        assert_eq!(user_id.constraints[0].kind, ColumnConstraintKind::NotNull);
        let ColumnConstraintKind::References(target) = &user_id.constraints[1].kind else {
            panic!("expected REFERENCES");
        };
        assert_eq!(target.table, QualifiedName::bare("users"));
        assert_eq!(target.columns, vec!["id"]);
        assert_eq!(target.on_delete.as_deref(), Some("CASCADE"));

        let TableElement::Column(total) = &table.elements[2] else {
            panic!("expected column");
        };
        assert_eq!(total.data_type.as_deref(), Some("numeric(10, 2)"));
        assert_eq!(
            total.constraints[0].kind,
            ColumnConstraintKind::Default("0".to_string())
        );
    }

    #[test]
    fn test_parse_partition_of() {
        let statements = parse_statements(
            "CREATE TABLE events_2024 PARTITION OF events \
             FOR VALUES FROM ('2024-01-01') TO ('2025-01-01')",
        )
        .unwrap();

        let StatementKind::CreateTable(table) = &statements[0].kind else {
            panic!("expected CREATE TABLE");
        };
        let parent = table.partition_of.as_ref().unwrap();
        assert_eq!(parent.parent, QualifiedName::bare("events"));
        assert_eq!(
            parent.bound,
            "FOR VALUES FROM ('2024-01-01') TO ('2025-01-01')"
        );
    }

    #[test]
    fn test_parse_create_index() {
        let statements = parse_statements(
            "CREATE UNIQUE INDEX users_lower_email_idx ON public.users USING btree \
             (lower(email), created_at DESC NULLS LAST) WHERE deleted_at IS NULL",
        )
        .unwrap();

        let StatementKind::CreateIndex(index) = &statements[0].kind else {
            panic!("expected CREATE INDEX");
        };
        assert!(index.unique);
        assert_eq!(index.name.as_deref(), Some("users_lower_email_idx"));
        assert_eq!(index.table, QualifiedName::qualified("public", "users"));
        assert_eq!(index.method.as_deref(), Some("btree"));
        assert_eq!(index.keys[0].expression, "lower(email)");
        assert_eq!(index.keys[1].expression, "created_at");
        assert!(index.keys[1].descending);
        assert_eq!(index.predicate.as_deref(), Some("deleted_at IS NULL"));
    }

    #[test]
    fn test_parse_function() {
        let statements = parse_statements(
            "CREATE OR REPLACE FUNCTION app.add(a integer, OUT b integer DEFAULT 1) \
             RETURNS integer LANGUAGE plpgsql STABLE SECURITY DEFINER \
             AS $fn$ BEGIN RETURN a + 1; END; $fn$",
        )
        .unwrap();

        let StatementKind::CreateFunction(function) = &statements[0].kind else {
            panic!("expected CREATE FUNCTION");
        };
        assert!(function.or_replace);
        assert_eq!(function.name, QualifiedName::qualified("app", "add"));
        assert_eq!(function.parameters.len(), 2);
        assert_eq!(function.parameters[1].default.as_deref(), Some("1"));
        assert_eq!(function.returns.as_deref(), Some("integer"));
        assert_eq!(function.language.as_deref(), Some("plpgsql"));
        assert_eq!(function.option("VOLATILITY"), Some("STABLE"));
        assert_eq!(function.option("SECURITY"), Some("DEFINER"));
        assert_eq!(function.body.as_deref(), Some(" BEGIN RETURN a + 1; END; "));
    }

    #[test]
    fn test_parse_comment_targets() {
        let statements = parse_statements(
            "COMMENT ON COLUMN public.users.email IS 'Login';\n\
             COMMENT ON FUNCTION add(integer, integer) IS NULL;\n\
             COMMENT ON MATERIALIZED VIEW stats IS E'Daily\\nrollup'",
        )
        .unwrap();

        let StatementKind::Comment(column) = &statements[0].kind else {
            panic!("expected COMMENT");
        };
        assert_eq!(
            column.target,
            CommentTarget::Column(ColumnRef {
                table: QualifiedName::qualified("public", "users"),
                column: "email".to_string(),
            })
        );
        assert_eq!(column.comment.as_deref(), Some("Login"));

        let StatementKind::Comment(function) = &statements[1].kind else {
            panic!("expected COMMENT");
        };
        assert_eq!(function.comment, None);
        assert!(matches!(
            &function.target,
            CommentTarget::Function { arguments: Some(args), .. } if args.len() == 2
        ));

        let StatementKind::Comment(matview) = &statements[2].kind else {
            panic!("expected COMMENT");
        };
        assert_eq!(matview.comment.as_deref(), Some("Daily\nrollup"));
    }

    #[test]
    fn test_unsupported_statements_are_kept() {
        let statements =
            parse_statements("GRANT SELECT ON users TO app; SET search_path = app, public").unwrap();
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| s.kind == StatementKind::Other));
    }

    #[test]
    fn test_syntax_error_position() {
        let input = "CREATE TABLE ok (id integer);\nCREATE TABLE broken (id integer,";
        let err = parse_statements(input).unwrap_err();
        let offset = err.offset().unwrap();
        assert!(offset >= input.find("broken").unwrap());
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_fragments() {
        let column = parse_column_fragment("id SERIAL PRIMARY KEY").unwrap();
        assert_eq!(column.name, "id");
        assert_eq!(column.data_type.as_deref(), Some("SERIAL"));

        let constraint =
            parse_constraint_fragment("CONSTRAINT price_positive CHECK (price > 0) NO INHERIT")
                .unwrap();
        assert_eq!(constraint.name.as_deref(), Some("price_positive"));
        assert_eq!(
            constraint.kind,
            TableConstraintKind::Check {
                expression: "price > 0".to_string(),
                no_inherit: true,
            }
        );

        assert!(parse_column_fragment("id integer,").is_err());
    }
}
