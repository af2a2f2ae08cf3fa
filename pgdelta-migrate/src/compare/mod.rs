//! Semantic comparers.
//!
//! Views and routines are compared by meaning rather than by text: both
//! sides are tokenized with the schema lexer and normalized (keyword case,
//! default-schema qualifiers, operator synonyms) before comparison.

mod expression;
mod function;
mod view;

use pgdelta_schema::model::normalize_type;
use pgdelta_schema::parser::{TokenKind, tokenize};

pub use function::{FunctionChangeKind, FunctionComparer, FunctionComparison};
pub use view::{QueryClause, QueryShape, ViewComparer, ViewComparison};

/// A normalized token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tok {
    /// Token class.
    pub kind: TokenKind,
    /// Normalized text: words lowercased, simple quoted identifiers unquoted.
    pub text: String,
}

impl Tok {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Whether this is the word `word` (already lowercase).
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.text == word
    }

    /// Whether this is the punctuation or operator `symbol`.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self.kind, TokenKind::Punct | TokenKind::Operator) && self.text == symbol
    }

    /// Whether this can name a column or relation.
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::QuotedIdent)
    }
}

/// Tokenize and normalize SQL text. `None` when the text does not lex.
pub fn normalized_tokens(text: &str, default_schema: &str) -> Option<Vec<Tok>> {
    let raw = tokenize(text).ok()?;
    let mut out = Vec::with_capacity(raw.len());

    let mut i = 0;
    while i < raw.len() {
        let token = &raw[i];

        let qualifies_next = raw.get(i + 1).is_some_and(|t| t.is_symbol("."))
            && raw.get(i + 2).is_some_and(|t| t.identifier().is_some());
        let follows_dot = i > 0 && raw[i - 1].is_symbol(".");
        if qualifies_next
            && !follows_dot
            && token.identifier().as_deref() == Some(default_schema)
        {
            i += 2;
            continue;
        }

        out.push(match token.kind {
            TokenKind::Word => Tok::new(TokenKind::Word, token.text.to_ascii_lowercase()),
            TokenKind::QuotedIdent => match token.identifier() {
                Some(ident) if is_folded_ident(&ident) => Tok::new(TokenKind::Word, ident),
                _ => Tok::new(TokenKind::QuotedIdent, token.text.clone()),
            },
            TokenKind::Operator if token.text == "!=" => Tok::new(TokenKind::Operator, "<>"),
            TokenKind::Operator if token.text == "&&" => Tok::new(TokenKind::Word, "and"),
            kind => Tok::new(kind, token.text.clone()),
        });
        i += 1;
    }

    Some(out)
}

/// An identifier that reads the same quoted or bare.
fn is_folded_ident(ident: &str) -> bool {
    let mut chars = ident.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

/// Whether two boolean expressions, such as CHECK bodies, are equivalent.
/// Text that does not lex is compared trimmed.
pub fn expressions_equivalent(a: &str, b: &str, default_schema: &str) -> bool {
    match (
        normalized_tokens(a, default_schema),
        normalized_tokens(b, default_schema),
    ) {
        (Some(a), Some(b)) => expression::equivalent(&a, &b),
        _ => a.trim() == b.trim(),
    }
}

/// Whether two statements differ only in keyword case, spacing, quoting of
/// plain identifiers or default-schema qualifiers.
pub fn statements_equivalent(a: &str, b: &str, default_schema: &str) -> bool {
    match (
        normalized_tokens(a, default_schema),
        normalized_tokens(b, default_schema),
    ) {
        (Some(a), Some(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

/// Normalize a type name, dropping the default-schema qualifier.
pub(crate) fn normalize_type_in(raw: &str, default_schema: &str) -> String {
    let normalized = normalize_type(raw);
    match normalized.strip_prefix(&format!("{}.", default_schema)) {
        Some(rest) => rest.to_string(),
        None => normalized,
    }
}

/// Join token texts with single spaces.
pub(crate) fn token_text(tokens: &[Tok]) -> String {
    tokens
        .iter()
        .map(|t| t.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
