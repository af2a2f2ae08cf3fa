//! Token-level view of SQL text.
//!
//! Used where the statement tree is too coarse: dependency scanning of view
//! queries and routine bodies, and token normalization in the comparers.

use pest::Parser;
use serde::{Deserialize, Serialize};

use super::grammar::{Rule, SqlParser};
use super::convert::unquote_ident;
use crate::error::SchemaResult;
use crate::model::ObjectRef;

/// Token classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// Keyword or bare identifier.
    Word,
    /// Double-quoted identifier.
    QuotedIdent,
    /// String literal of any quoting style.
    String,
    /// Numeric literal.
    Number,
    /// Positional parameter, e.g. `$1`.
    Param,
    /// Operator, e.g. `<>` or `::`.
    Operator,
    /// One of `( ) , ; [ ] .`.
    Punct,
    /// Anything the lexer does not classify.
    Other,
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token class.
    pub kind: TokenKind,
    /// Source text.
    pub text: String,
}

impl Token {
    /// Create a token.
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Whether this is the word `keyword`, ignoring case.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text.eq_ignore_ascii_case(keyword)
    }

    /// Whether this is the punctuation or operator `symbol`.
    pub fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self.kind, TokenKind::Punct | TokenKind::Operator) && self.text == symbol
    }

    /// Identifier value: bare words lowercased, quoted identifiers unquoted.
    pub fn identifier(&self) -> Option<String> {
        match self.kind {
            TokenKind::Word => Some(self.text.to_ascii_lowercase()),
            TokenKind::QuotedIdent => Some(unquote_ident(&self.text)),
            _ => None,
        }
    }
}

/// Split SQL text into tokens. Whitespace and comments are dropped.
pub fn tokenize(text: &str) -> SchemaResult<Vec<Token>> {
    let pairs = SqlParser::parse(Rule::token_stream, text)
        .map_err(|e| super::syntax_error(text, e))?;

    let tokens = pairs
        .flat_map(|p| p.into_inner())
        .filter_map(|p| {
            let kind = match p.as_rule() {
                Rule::word => TokenKind::Word,
                Rule::quoted_ident => TokenKind::QuotedIdent,
                Rule::escape_string | Rule::plain_string | Rule::dollar_string => {
                    TokenKind::String
                }
                Rule::number => TokenKind::Number,
                Rule::param => TokenKind::Param,
                Rule::operator => TokenKind::Operator,
                Rule::punct => TokenKind::Punct,
                Rule::other_char => TokenKind::Other,
                _ => return None,
            };
            Some(Token::new(kind, p.as_str()))
        })
        .collect();

    Ok(tokens)
}

/// Relations referenced by `text`, in first-appearance order.
///
/// Dotted names are tried as `schema.relation` first, then their first part
/// as an unqualified relation in `default_schema`. `is_relation` decides
/// whether a candidate exists.
pub fn referenced_relations(
    text: &str,
    default_schema: &str,
    is_relation: impl Fn(&str, &str) -> bool,
) -> SchemaResult<Vec<ObjectRef>> {
    let tokens = tokenize(text)?;
    let mut found: Vec<ObjectRef> = Vec::new();
    let mut push = |schema: &str, name: &str| {
        if !found.iter().any(|r| r.schema == schema && r.name == name) {
            found.push(ObjectRef::new(schema, name));
        }
    };

    let mut i = 0;
    while i < tokens.len() {
        let Some(first) = tokens[i].identifier() else {
            i += 1;
            continue;
        };

        let mut parts = vec![first];
        let mut j = i + 1;
        while j + 1 < tokens.len() && tokens[j].is_symbol(".") {
            match tokens[j + 1].identifier() {
                Some(part) => parts.push(part),
                None => break,
            }
            j += 2;
        }

        // `name(` is a function call, not a relation.
        let is_call = tokens.get(j).is_some_and(|t| t.is_symbol("("));
        if !is_call {
            if parts.len() >= 2 && is_relation(&parts[0], &parts[1]) {
                push(&parts[0], &parts[1]);
            } else if is_relation(default_schema, &parts[0]) {
                push(default_schema, &parts[0]);
            }
        }
        i = j;
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("SELECT id, \"Name\" FROM public.users -- trailing").unwrap();
        let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["SELECT", "id", ",", "\"Name\"", "FROM", "public", ".", "users"]
        );
    }

    #[test]
    fn test_tokenize_literals() {
        assert_eq!(
            kinds("'a''b' E'x' $$y$$ 42 3.5 $1"),
            vec![
                TokenKind::String,
                TokenKind::String,
                TokenKind::String,
                TokenKind::Number,
                TokenKind::Number,
                TokenKind::Param,
            ]
        );
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("a<>b AND c::text != d").unwrap();
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["<>", "::", "!="]);
    }

    #[test]
    fn test_identifier_folding() {
        let tokens = tokenize("Users \"Users\"").unwrap();
        assert_eq!(tokens[0].identifier().as_deref(), Some("users"));
        assert_eq!(tokens[1].identifier().as_deref(), Some("Users"));
    }

    #[test]
    fn test_referenced_relations() {
        let known = |schema: &str, name: &str| {
            matches!((schema, name), ("public", "users") | ("app", "orders"))
        };
        let refs = referenced_relations(
            "SELECT u.id, count(*) FROM users u JOIN app.orders o ON o.user_id = u.id \
             WHERE users.active GROUP BY u.id",
            "public",
            known,
        )
        .unwrap();

        assert_eq!(
            refs,
            vec![ObjectRef::new("public", "users"), ObjectRef::new("app", "orders")]
        );
    }

    #[test]
    fn test_referenced_relations_skips_calls() {
        let known = |_: &str, name: &str| name == "users";
        let refs = referenced_relations("SELECT users(1)", "public", known).unwrap();
        assert!(refs.is_empty());
    }
}
