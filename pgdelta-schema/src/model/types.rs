//! Data type normalization.
//!
//! Column and parameter types are stored in the canonical spelling the
//! server reports them with, so that `varchar(20)` and
//! `character varying(20)` compare equal.

/// Normalize a type name to its canonical spelling.
///
/// ```rust,ignore
/// assert_eq!(normalize_type("VARCHAR (255)"), "character varying(255)");
/// assert_eq!(normalize_type("timestamptz"), "timestamp with time zone");
/// assert_eq!(normalize_type("int4[]"), "integer[]");
/// ```
pub fn normalize_type(raw: &str) -> String {
    let compact = compact_type(raw);

    let (body, dims) = split_array_suffix(&compact);
    let (base, modifiers, rest) = split_modifiers(body);

    let base = base.strip_prefix("pg_catalog.").unwrap_or(base);
    let key = match rest {
        Some(rest) => format!("{base} {rest}"),
        None => base.to_string(),
    };

    let mut out = String::with_capacity(compact.len());
    match canonical_name(&key, modifiers) {
        ("", _) => {
            out.push_str(base);
            if let Some(modifiers) = modifiers {
                out.push_str(modifiers);
            }
            if let Some(rest) = rest {
                out.push(' ');
                out.push_str(rest);
            }
        }
        (head, tail) => {
            out.push_str(head);
            let keeps_modifiers = !matches!(head, "real" | "double precision");
            if let Some(modifiers) = modifiers.filter(|_| keeps_modifiers) {
                out.push_str(modifiers);
            }
            if let Some(tail) = tail {
                out.push(' ');
                out.push_str(tail);
            }
        }
    }
    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}

/// The underlying integer type of a serial pseudo-type, if `raw` is one.
pub fn serial_base(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "serial" | "serial4" => Some("integer"),
        "bigserial" | "serial8" => Some("bigint"),
        "smallserial" | "serial2" => Some("smallint"),
        _ => None,
    }
}

/// The serial pseudo-type for an integer type, if there is one.
pub fn serial_for(data_type: &str) -> Option<&'static str> {
    match data_type {
        "integer" => Some("serial"),
        "bigint" => Some("bigserial"),
        "smallint" => Some("smallserial"),
        _ => None,
    }
}

/// Whether the normalized type is an array type.
pub fn is_array_type(data_type: &str) -> bool {
    data_type.ends_with("[]")
}

/// Map an alias to `(name, zone suffix)`. Returns an empty name for types
/// that are already canonical.
fn canonical_name(key: &str, modifiers: Option<&str>) -> (&'static str, Option<&'static str>) {
    match key {
        "int" | "int4" | "integer" | "serial" | "serial4" => ("integer", None),
        "int8" | "bigint" | "bigserial" | "serial8" => ("bigint", None),
        "int2" | "smallint" | "smallserial" | "serial2" => ("smallint", None),
        "bool" | "boolean" => ("boolean", None),
        "float4" | "real" => ("real", None),
        "float8" | "double precision" => ("double precision", None),
        "float" => match modifiers.and_then(float_precision) {
            Some(p) if p <= 24 => ("real", None),
            _ => ("double precision", None),
        },
        "varchar" | "character varying" | "char varying" | "national character varying"
        | "national char varying" => ("character varying", None),
        "char" | "bpchar" | "character" | "national character" | "national char" => {
            ("character", None)
        }
        "varbit" | "bit varying" => ("bit varying", None),
        "decimal" | "numeric" => ("numeric", None),
        "timestamp" | "timestamp without time zone" => {
            ("timestamp", Some("without time zone"))
        }
        "timestamptz" | "timestamp with time zone" => ("timestamp", Some("with time zone")),
        "time" | "time without time zone" => ("time", Some("without time zone")),
        "timetz" | "time with time zone" => ("time", Some("with time zone")),
        _ => ("", None),
    }
}

fn float_precision(modifiers: &str) -> Option<u32> {
    modifiers
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .parse()
        .ok()
}

/// Lowercase outside double quotes, collapse whitespace, and tighten
/// punctuation.
fn compact_type(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_quotes = false;
    let mut pending_space = false;

    for c in raw.trim().chars() {
        if in_quotes {
            out.push(c);
            if c == '"' {
                in_quotes = false;
            }
            continue;
        }
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        let tight = matches!(c, '(' | ')' | '[' | ']' | ',' | '.');
        let after_tight = out.ends_with(['(', '[', ',', '.']);
        if pending_space && !tight && !after_tight && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        if c == '"' {
            in_quotes = true;
            out.push(c);
        } else {
            out.push(c.to_ascii_lowercase());
        }
    }

    unquote_simple_idents(&out)
}

/// `"mood"` becomes `mood`; identifiers that need quoting keep them.
fn unquote_simple_idents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('"') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('"') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let inner = &after[..end];
        let simple = !inner.is_empty()
            && inner
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            && !inner.starts_with(|c: char| c.is_ascii_digit());
        if simple {
            out.push_str(inner);
        } else {
            out.push('"');
            out.push_str(inner);
            out.push('"');
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

fn split_array_suffix(text: &str) -> (&str, usize) {
    let mut body = text;
    let mut dims = 0;
    while body.ends_with(']') {
        let Some(open) = body.rfind('[') else {
            break;
        };
        body = &body[..open];
        dims += 1;
    }
    if let Some(stripped) = body.strip_suffix(" array") {
        body = stripped;
        dims = dims.max(1);
    }
    (body.trim_end(), dims)
}

/// Split `timestamp(3) with time zone` into base, `(3)` and trailing words.
fn split_modifiers(text: &str) -> (&str, Option<&str>, Option<&str>) {
    let Some(open) = text.find('(') else {
        return (text, None, None);
    };
    let Some(close) = text[open..].find(')').map(|i| open + i) else {
        return (text, None, None);
    };
    let base = text[..open].trim_end();
    let modifiers = &text[open..=close];
    let rest = text[close + 1..].trim();
    (base, Some(modifiers), (!rest.is_empty()).then_some(rest))
}
