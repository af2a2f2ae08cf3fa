//! Function and procedure comparer.
//!
//! Routines are split into three facets: the signature (kind, name,
//! parameters, return type), the body, and the attributes (language,
//! volatility, security, cost and the like). Which facets changed decides
//! whether `CREATE OR REPLACE` is enough or the routine must be dropped.

use pgdelta_schema::model::RoutineKind;
use pgdelta_schema::parser::{CreateFunction, StatementKind, parse_statements};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::normalize_type_in;

/// What changed between two versions of a routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionChangeKind {
    /// Nothing.
    NoChange,
    /// Only the body.
    BodyOnly,
    /// Only attributes or the comment.
    AttributesOnly,
    /// Body and attributes, signature unchanged.
    BodyAndAttributes,
    /// Only the signature.
    Signature,
    /// The signature together with the body or attributes.
    Combined,
}

/// Result of comparing two routine definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionComparison {
    /// Change classification.
    pub kind: FunctionChangeKind,
    /// The routine must be dropped and created again.
    pub requires_recreation: bool,
    /// The change can be applied in place (`CREATE OR REPLACE` or `COMMENT ON`).
    pub can_use_alter: bool,
    /// Names of the attributes that differ, lowercase.
    pub changed_attributes: Vec<String>,
    /// Trimmed-text comparison was used because a side did not parse.
    pub fallback: bool,
}

impl FunctionComparison {
    fn classify(signature: bool, body: bool, changed_attributes: Vec<String>) -> Self {
        let attributes = !changed_attributes.is_empty();
        let kind = match (signature, body, attributes) {
            (false, false, false) => FunctionChangeKind::NoChange,
            (false, true, false) => FunctionChangeKind::BodyOnly,
            (false, false, true) => FunctionChangeKind::AttributesOnly,
            (false, true, true) => FunctionChangeKind::BodyAndAttributes,
            (true, false, false) => FunctionChangeKind::Signature,
            (true, _, _) => FunctionChangeKind::Combined,
        };
        let requires_recreation = signature;
        Self {
            kind,
            requires_recreation,
            can_use_alter: !requires_recreation && kind != FunctionChangeKind::NoChange,
            changed_attributes,
            fallback: false,
        }
    }

    fn fallback(same_text: bool) -> Self {
        let kind = if same_text {
            FunctionChangeKind::NoChange
        } else {
            FunctionChangeKind::Combined
        };
        Self {
            kind,
            requires_recreation: !same_text,
            can_use_alter: false,
            changed_attributes: Vec::new(),
            fallback: true,
        }
    }

    /// Whether anything changed.
    pub fn has_changes(&self) -> bool {
        self.kind != FunctionChangeKind::NoChange
    }
}

/// Compares CREATE FUNCTION / CREATE PROCEDURE statements.
#[derive(Debug, Clone)]
pub struct FunctionComparer {
    default_schema: String,
}

impl FunctionComparer {
    /// Create a comparer resolving unqualified types in `default_schema`.
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    /// Compare two routine definitions.
    pub fn compare(&self, old: &str, new: &str) -> FunctionComparison {
        self.compare_with_comments(old, new, None, None)
    }

    /// Compare two routine definitions together with their comments. A
    /// comment change counts as an attribute change.
    pub fn compare_with_comments(
        &self,
        old: &str,
        new: &str,
        old_comment: Option<&str>,
        new_comment: Option<&str>,
    ) -> FunctionComparison {
        let (Some(old_routine), Some(new_routine)) = (self.routine(old), self.routine(new)) else {
            warn!("Routine definition did not parse, comparing trimmed text");
            return FunctionComparison::fallback(old.trim() == new.trim());
        };

        let signature = old_routine.signature != new_routine.signature;
        let body = old_routine.body != new_routine.body;

        let mut changed: Vec<String> = old_routine
            .attributes
            .iter()
            .filter(|(key, value)| new_routine.attribute(key) != Some(value.as_str()))
            .map(|(key, _)| key.clone())
            .collect();
        changed.extend(
            new_routine
                .attributes
                .iter()
                .filter(|(key, _)| old_routine.attribute(key).is_none())
                .map(|(key, _)| key.clone()),
        );
        if old_comment != new_comment {
            changed.push("comment".to_string());
        }

        FunctionComparison::classify(signature, body, changed)
    }

    /// Like [`compare`](Self::compare), but a missing side means no
    /// comparison is possible and counts as unchanged.
    pub fn compare_opt(&self, old: Option<&str>, new: Option<&str>) -> FunctionComparison {
        match (old, new) {
            (Some(old), Some(new)) => self.compare(old, new),
            _ => FunctionComparison::classify(false, false, Vec::new()),
        }
    }

    fn routine(&self, text: &str) -> Option<RoutineFacets> {
        let statements = parse_statements(text).ok()?;
        statements.into_iter().find_map(|s| match s.kind {
            StatementKind::CreateFunction(create) => {
                Some(RoutineFacets::new(&create, &self.default_schema))
            }
            _ => None,
        })
    }
}

/// The comparable facets of one routine.
#[derive(Debug)]
struct RoutineFacets {
    signature: Signature,
    body: String,
    attributes: Vec<(String, String)>,
}

#[derive(Debug, PartialEq, Eq)]
struct Signature {
    kind: RoutineKind,
    name: String,
    parameters: Vec<String>,
    returns: Option<String>,
}

impl RoutineFacets {
    fn new(create: &CreateFunction, default_schema: &str) -> Self {
        let parameters = create
            .parameters
            .iter()
            .map(|p| {
                let mut text = format!(
                    "{} {} {}",
                    p.mode.sql_keyword(),
                    p.name.as_deref().unwrap_or(""),
                    normalize_type_in(&p.data_type, default_schema)
                );
                if let Some(default) = &p.default {
                    text.push_str(" default ");
                    text.push_str(default.trim());
                }
                text
            })
            .collect();

        let signature = Signature {
            kind: create.kind,
            name: create.name.name.clone(),
            parameters,
            returns: create
                .returns
                .as_deref()
                .map(|r| normalize_return(r, default_schema)),
        };

        let mut attributes = vec![
            (
                "language".to_string(),
                create.language.clone().unwrap_or_else(|| "sql".to_string()),
            ),
            option(create, "volatility", "VOLATILITY", "VOLATILE"),
            option(create, "security", "SECURITY", "INVOKER"),
            option(create, "parallel", "PARALLEL", "UNSAFE"),
            option(create, "leakproof", "LEAKPROOF", "false"),
            option(create, "strict", "STRICT", "false"),
            option(create, "cost", "COST", ""),
            option(create, "rows", "ROWS", ""),
        ];
        for (key, value) in &create.options {
            let known = ["VOLATILITY", "SECURITY", "PARALLEL", "LEAKPROOF", "STRICT", "COST", "ROWS"];
            if !known.contains(&key.as_str()) {
                attributes.push((key.to_ascii_lowercase(), value.clone()));
            }
        }

        Self {
            signature,
            body: create.body.as_deref().unwrap_or("").trim().to_string(),
            attributes,
        }
    }

    fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn option(create: &CreateFunction, name: &str, key: &str, default: &str) -> (String, String) {
    (
        name.to_string(),
        create.option(key).unwrap_or(default).to_string(),
    )
}

/// Normalize a RETURNS clause: `SETOF t` and `TABLE (...)` keep their
/// shape, plain types are normalized.
fn normalize_return(raw: &str, default_schema: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("setof ") {
        return format!("setof {}", normalize_type_in(rest, default_schema));
    }
    if lower.starts_with("table") {
        return lower.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    normalize_type_in(trimmed, default_schema)
}
