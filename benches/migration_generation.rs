//! Benchmarks for diffing and migration generation.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pgdelta::migrate::{MigrationGenerator, SchemaDiffer, Scheduler};
use pgdelta::schema::extract;
use std::hint::black_box;

/// Generate a chain of `table_count` tables, each referencing the previous one.
fn generate_schema(table_count: usize, body: &str) -> String {
    let mut schema = String::new();

    for i in 0..table_count {
        let parent = if i == 0 {
            String::new()
        } else {
            format!(", parent_id integer REFERENCES t_{} (id)", i - 1)
        };
        schema.push_str(&format!(
            "CREATE TABLE t_{i} (id serial PRIMARY KEY, label text NOT NULL{parent});\n\
             CREATE VIEW v_{i} AS SELECT id, label FROM t_{i};\n\
             CREATE FUNCTION f_{i}() RETURNS bigint LANGUAGE sql AS $$ {body} $$;\n"
        ));
    }

    schema
}

/// Benchmark model diffing of two close schemas.
fn bench_diff_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff_models");

    for table_count in [10, 50, 100].iter() {
        let old = extract(&generate_schema(*table_count, "SELECT 1")).unwrap();
        let new = extract(&generate_schema(*table_count, "SELECT 2")).unwrap();

        group.bench_with_input(
            BenchmarkId::new("tables", table_count),
            &(old, new),
            |b, (old, new)| b.iter(|| black_box(SchemaDiffer::default().diff_models(old, new))),
        );
    }

    group.finish();
}

/// Benchmark text-mode diffing.
fn bench_diff_sdl(c: &mut Criterion) {
    let old = generate_schema(50, "SELECT 1");
    let new = generate_schema(50, "SELECT 2");

    c.bench_function("diff_sdl_50_tables", |b| {
        b.iter(|| black_box(SchemaDiffer::default().diff_sdl(&old, &new).unwrap()))
    });
}

/// Benchmark scheduling and rendering a full create.
fn bench_generate(c: &mut Criterion) {
    let db = extract(&generate_schema(100, "SELECT 1")).unwrap();
    let changes = SchemaDiffer::default().diff(None, Some(&db));

    c.bench_function("schedule_100_tables", |b| {
        b.iter(|| black_box(Scheduler::new("public").schedule(&changes).unwrap()))
    });
    c.bench_function("generate_100_tables", |b| {
        b.iter(|| black_box(MigrationGenerator::default().generate(&changes).unwrap()))
    });
}

criterion_group!(benches, bench_diff_models, bench_diff_sdl, bench_generate);

criterion_main!(benches);
