//! Pest grammar parser for PostgreSQL DDL.

use pest_derive::Parser;

/// The PostgreSQL DDL parser.
#[derive(Parser)]
#[grammar = "parser/sql.pest"]
pub struct SqlParser;

#[cfg(test)]
mod tests {
    use super::*;
    use pest::Parser;

    fn full_match(rule: Rule, input: &str) -> bool {
        match SqlParser::parse(rule, input) {
            Ok(mut pairs) => pairs.next().is_some_and(|p| p.as_str() == input),
            Err(_) => false,
        }
    }

    #[test]
    fn test_parse_identifiers() {
        assert!(full_match(Rule::ident, "users"));
        assert!(full_match(Rule::ident, "\"Mixed Case\""));
        assert!(full_match(Rule::qualified_name, "public.users"));
        assert!(!full_match(Rule::ident, "select"));
    }

    #[test]
    fn test_parse_data_types() {
        assert!(full_match(Rule::data_type, "integer"));
        assert!(full_match(Rule::data_type, "character varying(255)"));
        assert!(full_match(Rule::data_type, "double precision"));
        assert!(full_match(Rule::data_type, "numeric(10, 2)"));
        assert!(full_match(Rule::data_type, "timestamp(3) with time zone"));
        assert!(full_match(Rule::data_type, "text[]"));
        assert!(full_match(Rule::data_type, "public.mood"));
    }

    #[test]
    fn test_parse_column_definition() {
        assert!(full_match(Rule::column_def, "id SERIAL PRIMARY KEY"));
        assert!(full_match(Rule::column_def, "name TEXT NOT NULL"));
        assert!(full_match(
            Rule::column_def,
            "created_at timestamptz DEFAULT now() NOT NULL"
        ));
        assert!(full_match(
            Rule::column_def,
            "id bigint GENERATED ALWAYS AS IDENTITY (START WITH 10 INCREMENT BY 5)"
        ));
        assert!(full_match(
            Rule::column_def,
            "author_id integer REFERENCES users (id) ON DELETE CASCADE"
        ));
    }

    #[test]
    fn test_parse_table_constraint() {
        assert!(full_match(
            Rule::table_constraint,
            "CONSTRAINT price_positive CHECK (price > 0)"
        ));
        assert!(full_match(
            Rule::table_constraint,
            "FOREIGN KEY (user_id) REFERENCES public.users (id) ON UPDATE SET NULL"
        ));
        assert!(full_match(Rule::table_constraint, "PRIMARY KEY (a, b)"));
    }

    #[test]
    fn test_parse_strings() {
        assert!(full_match(Rule::plain_string, "'it''s'"));
        assert!(full_match(Rule::escape_string, "E'line\\n'"));
        assert!(full_match(Rule::dollar_string, "$$ SELECT 1; $$"));
        assert!(full_match(Rule::dollar_string, "$body$ SELECT '$$' $body$"));
    }

    #[test]
    fn test_parse_document() {
        let input = r#"
            CREATE TABLE users (id serial PRIMARY KEY, email text);
            -- trailing comment
            CREATE INDEX users_email_idx ON users (lower(email));
            GRANT SELECT, INSERT ON users TO app;
        "#;
        let result = SqlParser::parse(Rule::sdl, input);
        assert!(result.is_ok(), "Failed to parse: {:?}", result.err());
    }

    #[test]
    fn test_parse_function() {
        let input = r#"CREATE OR REPLACE FUNCTION add(a integer, b integer DEFAULT 1)
            RETURNS integer LANGUAGE sql IMMUTABLE AS $$ SELECT a + b $$"#;
        assert!(full_match(Rule::create_function, input));
    }

    #[test]
    fn test_reject_malformed_table() {
        let result = SqlParser::parse(Rule::sdl, "CREATE TABLE broken (id integer,");
        assert!(result.is_err());
    }
}
