//! Structured fuzzing for extraction, diffing and generation.
//!
//! Generates near-valid DDL with the `arbitrary` crate so that most inputs
//! reach the differ and the scheduler instead of failing in the parser.
//!
//! Run with:
//! ```bash
//! cargo +nightly fuzz run fuzz_schema_structured
//! ```

#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use pgdelta_migrate::{MigrationGenerator, SchemaDiffer};
use pgdelta_schema::extract;

/// A generated column type.
#[derive(Debug, Arbitrary)]
enum FuzzColumnType {
    Integer,
    BigInt,
    Text,
    Boolean,
    Numeric(u8, u8),
    Timestamptz,
    Jsonb,
    Enum(u8),
}

impl FuzzColumnType {
    fn render(&self, enums: usize) -> String {
        match self {
            Self::Integer => "integer".to_string(),
            Self::BigInt => "bigint".to_string(),
            Self::Text => "text".to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Numeric(p, s) => format!("numeric({}, {})", p % 20 + 1, s % 4),
            Self::Timestamptz => "timestamptz".to_string(),
            Self::Jsonb => "jsonb".to_string(),
            Self::Enum(i) if enums > 0 => format!("e_{}", *i as usize % enums),
            Self::Enum(_) => "text".to_string(),
        }
    }
}

/// A generated column constraint.
#[derive(Debug, Arbitrary)]
enum FuzzConstraint {
    None,
    NotNull,
    Unique,
    Default(i32),
    Check(i32),
    References(u8),
}

/// A generated column.
#[derive(Debug, Arbitrary)]
struct FuzzColumn {
    column_type: FuzzColumnType,
    constraint: FuzzConstraint,
}

/// A generated table.
#[derive(Debug, Arbitrary)]
struct FuzzTable {
    columns: Vec<FuzzColumn>,
    comment: Option<String>,
    view: bool,
}

/// A generated schema document.
#[derive(Debug, Arbitrary)]
struct FuzzSchema {
    enums: Vec<Vec<String>>,
    tables: Vec<FuzzTable>,
}

impl FuzzSchema {
    fn render(&self) -> String {
        let mut parts = Vec::new();
        let enums = self.enums.len().min(4);
        let tables = self.tables.len().min(8);

        for (i, labels) in self.enums.iter().take(enums).enumerate() {
            let labels: Vec<String> = labels
                .iter()
                .take(6)
                .map(|l| format!("'{}'", sanitize_string(l)))
                .collect();
            parts.push(format!("CREATE TYPE e_{} AS ENUM ({});", i, labels.join(", ")));
        }

        for (i, table) in self.tables.iter().take(tables).enumerate() {
            let mut columns = vec!["id integer PRIMARY KEY".to_string()];
            for (c, column) in table.columns.iter().take(8).enumerate() {
                let name = format!("c_{}", c);
                let mut line = format!("{} {}", name, column.column_type.render(enums));
                match &column.constraint {
                    FuzzConstraint::None => {}
                    FuzzConstraint::NotNull => line.push_str(" NOT NULL"),
                    FuzzConstraint::Unique => line.push_str(" UNIQUE"),
                    FuzzConstraint::Default(v) => line.push_str(&format!(" DEFAULT {}", v)),
                    FuzzConstraint::Check(v) => {
                        line.push_str(&format!(" CHECK ({} IS NOT NULL OR {} > 0)", name, v))
                    }
                    // Only earlier tables, so the graph stays acyclic
                    FuzzConstraint::References(t) if i > 0 => {
                        line.push_str(&format!(" REFERENCES t_{} (id)", *t as usize % i))
                    }
                    FuzzConstraint::References(_) => {}
                }
                columns.push(line);
            }
            parts.push(format!("CREATE TABLE t_{} ({});", i, columns.join(", ")));

            if let Some(comment) = &table.comment {
                parts.push(format!(
                    "COMMENT ON TABLE t_{} IS '{}';",
                    i,
                    sanitize_string(comment)
                ));
            }
            if table.view {
                parts.push(format!("CREATE VIEW v_{} AS SELECT id FROM t_{};", i, i));
            }
        }

        parts.join("\n")
    }
}

/// Sanitize a string for use in a single-quoted literal.
fn sanitize_string(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '_')
        .take(30)
        .collect()
}

fuzz_target!(|data: &[u8]| {
    let mut unstructured = Unstructured::new(data);

    if let Ok(schema) = FuzzSchema::arbitrary(&mut unstructured) {
        let sdl = schema.render();

        let Ok(db) = extract(&sdl) else {
            return;
        };

        // A schema is always identical to itself, from either side
        let differ = SchemaDiffer::default();
        assert!(differ.diff_models(&db, &db).is_empty());
        if let Ok(changes) = differ.diff_sdl(&sdl, &sdl) {
            assert!(changes.is_empty());
        }

        let changes = differ.diff(None, Some(&db));
        let _ = MigrationGenerator::default().generate(&changes);
    }
});
