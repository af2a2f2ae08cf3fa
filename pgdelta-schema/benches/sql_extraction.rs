//! Benchmarks for SQL parsing and extraction.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use pgdelta_schema::{extract, parse_statements};
use std::hint::black_box;

/// A single table.
const MINIMAL_SCHEMA: &str = "CREATE TABLE users (id serial PRIMARY KEY, name text NOT NULL);";

/// A few related objects of every common kind.
const SMALL_SCHEMA: &str = r#"
CREATE SCHEMA app;
CREATE TYPE app.status AS ENUM ('draft', 'published', 'archived');

CREATE TABLE app.users (
    id         bigserial PRIMARY KEY,
    email      varchar(255) NOT NULL UNIQUE,
    name       text,
    created_at timestamptz NOT NULL DEFAULT now()
);

CREATE TABLE app.posts (
    id        bigint GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    author_id bigint NOT NULL REFERENCES app.users (id) ON DELETE CASCADE,
    status    app.status NOT NULL DEFAULT 'draft',
    title     text NOT NULL CHECK (length(title) > 0),
    body      text
);

CREATE INDEX posts_author_idx ON app.posts (author_id);

CREATE VIEW app.published AS
    SELECT p.id, p.title, u.name
    FROM app.posts p JOIN app.users u ON u.id = p.author_id
    WHERE p.status = 'published';

CREATE FUNCTION app.post_count(uid bigint) RETURNS bigint
    LANGUAGE sql STABLE
    AS $$ SELECT count(*) FROM app.posts WHERE author_id = uid $$;

COMMENT ON TABLE app.posts IS 'Blog posts';
"#;

/// Generate a document with `table_count` tables, each with an index and a view.
fn generate_large_schema(table_count: usize) -> String {
    let mut schema = String::from("CREATE TYPE kind AS ENUM ('a', 'b', 'c');\n");

    for i in 0..table_count {
        schema.push_str(&format!(
            r#"
CREATE TABLE table_{i} (
    id serial PRIMARY KEY,
    kind kind NOT NULL,
    label varchar(64) NOT NULL DEFAULT 'none',
    amount numeric(12, 2) CHECK (amount >= 0),
    parent_id integer REFERENCES table_{i} (id)
);
CREATE INDEX table_{i}_label_idx ON table_{i} (lower(label));
CREATE VIEW view_{i} AS SELECT id, label FROM table_{i} WHERE amount > 0;
COMMENT ON COLUMN table_{i}.label IS 'Label {i}';
"#
        ));
    }

    schema
}

/// Benchmark parsing a single table.
fn bench_parse_minimal(c: &mut Criterion) {
    c.bench_function("parse_minimal_document", |b| {
        b.iter(|| black_box(parse_statements(MINIMAL_SCHEMA).unwrap()))
    });
}

/// Benchmark extracting a small mixed document.
fn bench_extract_small(c: &mut Criterion) {
    c.bench_function("extract_small_document", |b| {
        b.iter(|| black_box(extract(SMALL_SCHEMA).unwrap()))
    });
}

/// Benchmark extraction throughput with varying table counts.
fn bench_extract_large(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_large_document");

    for table_count in [10, 50, 100].iter() {
        let schema = generate_large_schema(*table_count);
        group.throughput(Throughput::Bytes(schema.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("tables", table_count),
            &schema,
            |b, schema| b.iter(|| black_box(extract(schema).unwrap())),
        );
    }

    group.finish();
}

/// Benchmark writing a model back to SDL.
fn bench_write_sdl(c: &mut Criterion) {
    let db = extract(&generate_large_schema(50)).unwrap();
    c.bench_function("write_sdl_50_tables", |b| b.iter(|| black_box(db.to_sdl())));
}

criterion_group!(
    benches,
    bench_parse_minimal,
    bench_extract_small,
    bench_extract_large,
    bench_write_sdl,
);

criterion_main!(benches);
