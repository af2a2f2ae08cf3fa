//! Integration tests for SQL extraction.
//!
//! These tests verify that schema documents become the expected object model
//! and that the model survives a write/extract round trip.

use pgdelta::schema::{ObjectKind, SchemaError, extract};
use pretty_assertions::assert_eq;

const SHOP: &str = r#"
    CREATE SCHEMA shop;
    CREATE TYPE shop.order_state AS ENUM ('open', 'paid', 'shipped');

    CREATE TABLE shop.customers (
        id serial PRIMARY KEY,
        email text NOT NULL UNIQUE,
        created_at timestamptz NOT NULL DEFAULT now()
    );

    CREATE TABLE shop.orders (
        id bigserial PRIMARY KEY,
        customer_id integer NOT NULL REFERENCES shop.customers (id) ON DELETE CASCADE,
        state shop.order_state NOT NULL DEFAULT 'open',
        total numeric(10, 2) CHECK (total >= 0)
    );

    CREATE INDEX orders_customer_idx ON shop.orders (customer_id);

    CREATE VIEW shop.open_orders AS
        SELECT id, customer_id FROM shop.orders WHERE state = 'open';

    COMMENT ON TABLE shop.orders IS 'Customer orders';
    COMMENT ON COLUMN shop.orders.total IS 'Gross amount';
"#;

/// Test the shape of an extracted model
#[test]
fn test_extract_shop() {
    let db = extract(SHOP).expect("Failed to extract schema");

    let shop = db.schema("shop").expect("schema");
    assert_eq!(shop.tables.len(), 2);
    assert_eq!(shop.enum_types.len(), 1);
    assert_eq!(shop.views.len(), 1);

    let orders = db.table("shop", "orders").expect("orders");
    assert_eq!(orders.comment.as_deref(), Some("Customer orders"));
    assert_eq!(
        orders.column("total").and_then(|c| c.comment.as_deref()),
        Some("Gross amount")
    );
    assert!(orders.primary_key().is_some());
    assert!(orders.index("orders_customer_idx").is_some());

    assert_eq!(orders.foreign_keys.len(), 1);
    let fk = &orders.foreign_keys[0];
    assert_eq!(fk.referenced_schema, "shop");
    assert_eq!(fk.referenced_table, "customers");
    assert_eq!(orders.check_constraints.len(), 1);

    let view = db.view("shop", "open_orders").expect("view");
    assert_eq!(view.dependencies.len(), 1);
    assert_eq!(view.dependencies[0].name, "orders");
}

/// Test that writing and re-extracting gives the same model
#[test]
fn test_round_trip() {
    let db = extract(SHOP).unwrap();
    let sdl = db.to_sdl();
    let again = extract(&sdl).unwrap();

    assert_eq!(db, again);
    assert_eq!(sdl, again.to_sdl());
}

/// Test that unresolvable primary keys are fatal
#[test]
fn test_primary_key_on_unknown_table() {
    let err = extract("ALTER TABLE missing ADD CONSTRAINT missing_pkey PRIMARY KEY (id);")
        .unwrap_err();
    assert!(matches!(err, SchemaError::UnresolvedReference { .. }), "{err:?}");
}

/// Test that soft references are skipped
#[test]
fn test_soft_references_are_skipped() {
    let db = extract(
        "CREATE TABLE t (id integer);
         CREATE INDEX ghost_idx ON ghost (id);
         COMMENT ON TABLE ghost IS 'nobody';",
    )
    .unwrap();
    assert_eq!(db.table_count(), 1);
    assert!(db.table("public", "t").unwrap().indexes.is_empty());
}

/// Test that syntax errors carry a position
#[test]
fn test_syntax_error() {
    let err = extract("CREATE TABLE (").unwrap_err();
    assert!(!err.to_string().is_empty());
}

/// Test object kind keywords used by generated DDL
#[test]
fn test_object_kind_keywords() {
    assert_eq!(ObjectKind::MaterializedView.sql_keyword(), "MATERIALIZED VIEW");
    assert_eq!(ObjectKind::Type.sql_keyword(), "TYPE");
}
