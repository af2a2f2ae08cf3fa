//! View query comparer.
//!
//! A SELECT is split into clauses by an explicit state machine and each
//! clause is compared with its own rule:
//!
//! | Clause     | Rule                                   |
//! |------------|----------------------------------------|
//! | SELECT     | order-sensitive, output names checked  |
//! | FROM       | order-insensitive, bijective matching  |
//! | JOIN       | order-sensitive, ON by expression      |
//! | WHERE      | expression equality                    |
//! | GROUP BY   | order-insensitive, bijective matching  |
//! | ORDER BY   | order-sensitive                        |
//!
//! Queries the machine cannot classify (set operations, CTEs, VALUES) are
//! compared as normalized token streams.

use pgdelta_schema::parser::{StatementKind, TokenKind, parse_statements};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{Tok, expression, normalized_tokens};

/// Clauses of a classified query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryClause {
    /// Explicit view column list.
    Columns,
    /// Select list, including DISTINCT.
    Select,
    /// FROM items.
    From,
    /// JOIN clauses.
    Join,
    /// WHERE condition.
    Where,
    /// GROUP BY items.
    GroupBy,
    /// HAVING condition.
    Having,
    /// ORDER BY items.
    OrderBy,
    /// LIMIT, OFFSET, FETCH, FOR and WINDOW.
    Tail,
    /// Whole query, when it could not be classified.
    Query,
}

/// Result of comparing two view definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewComparison {
    /// The definitions mean the same thing.
    pub equivalent: bool,
    /// The view has to be dropped and created again.
    pub requires_recreation: bool,
    /// Clauses that differ.
    pub changed_clauses: Vec<QueryClause>,
    /// Token comparison was used instead of clause comparison.
    pub fallback: bool,
}

impl ViewComparison {
    fn from_clauses(changed_clauses: Vec<QueryClause>, fallback: bool) -> Self {
        let equivalent = changed_clauses.is_empty();
        Self {
            equivalent,
            requires_recreation: !equivalent,
            changed_clauses,
            fallback,
        }
    }
}

/// Compares view and materialized view definitions.
///
/// ```rust,ignore
/// let comparer = ViewComparer::new("public");
/// assert!(comparer.equivalent(
///     "SELECT id FROM public.users WHERE active = true",
///     "select users.id from users where (active = true)",
/// ));
/// ```
#[derive(Debug, Clone)]
pub struct ViewComparer {
    default_schema: String,
}

impl ViewComparer {
    /// Create a comparer resolving unqualified names in `default_schema`.
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
        }
    }

    /// Whether two definitions are equivalent.
    pub fn equivalent(&self, old: &str, new: &str) -> bool {
        self.compare(old, new).equivalent
    }

    /// Like [`equivalent`](Self::equivalent), but a missing side means no
    /// comparison is possible and counts as equal.
    pub fn equivalent_opt(&self, old: Option<&str>, new: Option<&str>) -> bool {
        match (old, new) {
            (Some(old), Some(new)) => self.equivalent(old, new),
            _ => true,
        }
    }

    /// Compare two definitions. Each side may be a bare query or a full
    /// CREATE [MATERIALIZED] VIEW statement.
    pub fn compare(&self, old: &str, new: &str) -> ViewComparison {
        let (old_columns, old_query) = view_parts(old);
        let (new_columns, new_query) = view_parts(new);

        let (Some(old_tokens), Some(new_tokens)) = (
            normalized_tokens(&old_query, &self.default_schema),
            normalized_tokens(&new_query, &self.default_schema),
        ) else {
            debug!("View query does not lex, comparing text");
            let changed = if old_query.trim() == new_query.trim() {
                Vec::new()
            } else {
                vec![QueryClause::Query]
            };
            return ViewComparison::from_clauses(changed, true);
        };

        let mut changed = Vec::new();
        if old_columns != new_columns {
            changed.push(QueryClause::Columns);
        }

        match (
            QueryShape::classify(&old_tokens),
            QueryShape::classify(&new_tokens),
        ) {
            (Some(old_shape), Some(new_shape)) => {
                changed.extend(old_shape.changed_clauses(&new_shape));
                trace!(changed = ?changed, "Compared view queries by clause");
                ViewComparison::from_clauses(changed, false)
            }
            _ => {
                debug!("View query not classifiable, comparing tokens");
                if old_tokens != new_tokens {
                    changed.push(QueryClause::Query);
                }
                ViewComparison::from_clauses(changed, true)
            }
        }
    }
}

/// Column list and query of a CREATE VIEW, or the text itself as the query.
fn view_parts(text: &str) -> (Vec<String>, String) {
    let is_create = text
        .trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("create"));
    if is_create {
        if let Ok(statements) = parse_statements(text) {
            for statement in statements {
                if let StatementKind::CreateView(view) | StatementKind::CreateMaterializedView(view) =
                    statement.kind
                {
                    return (view.columns, view.query);
                }
            }
        }
    }
    (Vec::new(), text.to_string())
}

// =============================================================================
// Clause classification
// =============================================================================

/// A SELECT split into clauses. Items are normalized token runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryShape {
    /// `DISTINCT` / `DISTINCT ON (...)` tokens.
    pub distinct: Vec<Tok>,
    /// Select list items.
    pub select: Vec<Vec<Tok>>,
    /// Comma-separated FROM items.
    pub from: Vec<Vec<Tok>>,
    /// JOIN clauses, each including its ON condition.
    pub joins: Vec<Vec<Tok>>,
    /// WHERE condition.
    pub where_clause: Vec<Tok>,
    /// GROUP BY items.
    pub group_by: Vec<Vec<Tok>>,
    /// HAVING condition.
    pub having: Vec<Tok>,
    /// ORDER BY items.
    pub order_by: Vec<Vec<Tok>>,
    /// Everything from LIMIT, OFFSET, FETCH, FOR or WINDOW on.
    pub tail: Vec<Tok>,
}

impl QueryShape {
    /// Split a single SELECT into clauses. `None` for set operations, CTEs,
    /// VALUES and unbalanced input.
    pub fn classify(tokens: &[Tok]) -> Option<Self> {
        ClauseMachine::default().run(tokens)
    }

    /// Clauses that differ between `self` and `other`.
    pub fn changed_clauses(&self, other: &Self) -> Vec<QueryClause> {
        let mut changed = Vec::new();
        if self.distinct != other.distinct
            || !ordered_match(&self.select, &other.select, select_items_equal)
        {
            changed.push(QueryClause::Select);
        }
        if !bijective_match(&self.from, &other.from, from_items_equal) {
            changed.push(QueryClause::From);
        }
        if !ordered_match(&self.joins, &other.joins, joins_equal) {
            changed.push(QueryClause::Join);
        }
        if !conditions_equal(&self.where_clause, &other.where_clause) {
            changed.push(QueryClause::Where);
        }
        if !bijective_match(&self.group_by, &other.group_by, |a, b| {
            expression::equivalent(a, b)
        }) {
            changed.push(QueryClause::GroupBy);
        }
        if !conditions_equal(&self.having, &other.having) {
            changed.push(QueryClause::Having);
        }
        if !ordered_match(&self.order_by, &other.order_by, order_items_equal) {
            changed.push(QueryClause::OrderBy);
        }
        if self.tail != other.tail {
            changed.push(QueryClause::Tail);
        }
        changed
    }
}

/// Classifier states, one per clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum ClauseState {
    #[default]
    Start,
    Select,
    From,
    Join,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Tail,
}

/// What a token at parenthesis depth zero does to the machine.
enum Step {
    /// The token belongs to the current item.
    Keep,
    /// The transition consumed this many tokens.
    Consumed(usize),
}

#[derive(Debug, Default)]
struct ClauseMachine {
    state: ClauseState,
    shape: QueryShape,
    current: Vec<Tok>,
    depth: usize,
}

impl ClauseMachine {
    fn run(mut self, tokens: &[Tok]) -> Option<QueryShape> {
        let mut i = 0;
        while i < tokens.len() {
            if self.depth == 0 {
                if let Step::Consumed(n) = self.transition(tokens, i)? {
                    i += n;
                    continue;
                }
            }

            let token = &tokens[i];
            if token.is_symbol("(") {
                self.depth += 1;
            } else if token.is_symbol(")") {
                self.depth = self.depth.checked_sub(1)?;
            }
            self.current.push(token.clone());
            i += 1;
        }

        if self.depth != 0 || self.state == ClauseState::Start {
            return None;
        }
        self.flush();
        Some(self.shape)
    }

    /// Handle a depth-zero token. `None` means the query is unsupported.
    fn transition(&mut self, tokens: &[Tok], i: usize) -> Option<Step> {
        use ClauseState as S;

        let token = &tokens[i];
        let next = tokens.get(i + 1);

        if ["union", "intersect", "except"].iter().any(|w| token.is_word(w)) {
            return None;
        }

        if self.state == S::Start {
            return self.enter_select(tokens, i);
        }

        if token.is_symbol(",") {
            return match self.state {
                S::Select | S::From | S::GroupBy | S::OrderBy => {
                    self.flush();
                    Some(Step::Consumed(1))
                }
                S::Join => {
                    self.flush();
                    self.state = S::From;
                    Some(Step::Consumed(1))
                }
                _ => Some(Step::Keep),
            };
        }

        if token.kind != TokenKind::Word {
            return Some(Step::Keep);
        }

        let (target, consumed) = match token.text.as_str() {
            "select" | "with" | "values" => return None,
            "from" if self.state == S::Select => (S::From, 1),
            "join" | "inner" | "left" | "right" | "full" | "cross" | "natural"
                if matches!(self.state, S::From | S::Join)
                    && !next.is_some_and(|t| t.is_symbol("(")) =>
            {
                let continues_clause =
                    self.state == S::Join && !self.current.iter().any(|t| t.is_word("join"));
                if !continues_clause {
                    self.flush();
                    self.state = S::Join;
                }
                return Some(Step::Keep);
            }
            "where" if matches!(self.state, S::Select | S::From | S::Join) => (S::Where, 1),
            "group" if next.is_some_and(|t| t.is_word("by")) && self.state != S::Tail => {
                (S::GroupBy, 2)
            }
            "having" if self.state != S::Tail => (S::Having, 1),
            "order" if next.is_some_and(|t| t.is_word("by")) && self.state != S::Tail => {
                (S::OrderBy, 2)
            }
            "limit" | "offset" | "fetch" | "for" | "window" => {
                if self.state != S::Tail {
                    self.flush();
                    self.state = S::Tail;
                }
                return Some(Step::Keep);
            }
            _ => return Some(Step::Keep),
        };

        self.flush();
        self.state = target;
        Some(Step::Consumed(consumed))
    }

    /// `SELECT [ALL | DISTINCT [ON (...)]]`.
    fn enter_select(&mut self, tokens: &[Tok], i: usize) -> Option<Step> {
        if !tokens[i].is_word("select") {
            return None;
        }
        self.state = ClauseState::Select;

        let mut j = i + 1;
        if tokens.get(j).is_some_and(|t| t.is_word("all")) {
            j += 1;
        } else if tokens.get(j).is_some_and(|t| t.is_word("distinct")) {
            self.shape.distinct.push(tokens[j].clone());
            j += 1;
            if tokens.get(j).is_some_and(|t| t.is_word("on"))
                && tokens.get(j + 1).is_some_and(|t| t.is_symbol("("))
            {
                let close = matching_paren(tokens, j + 1)?;
                self.shape.distinct.extend(tokens[j..=close].iter().cloned());
                j = close + 1;
            }
        }
        Some(Step::Consumed(j - i))
    }

    fn flush(&mut self) {
        let current = std::mem::take(&mut self.current);
        if current.is_empty() {
            return;
        }
        match self.state {
            ClauseState::Start => {}
            ClauseState::Select => self.shape.select.push(current),
            ClauseState::From => self.shape.from.push(current),
            ClauseState::Join => self.shape.joins.push(current),
            ClauseState::Where => self.shape.where_clause.extend(current),
            ClauseState::GroupBy => self.shape.group_by.push(current),
            ClauseState::Having => self.shape.having.extend(current),
            ClauseState::OrderBy => self.shape.order_by.push(current),
            ClauseState::Tail => self.shape.tail.extend(current),
        }
    }
}

fn matching_paren(tokens: &[Tok], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, token) in tokens[open..].iter().enumerate() {
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth -= 1;
            if depth == 0 {
                return Some(open + offset);
            }
        }
    }
    None
}

// =============================================================================
// Item comparison
// =============================================================================

/// Words that end an expression rather than name an output column.
const NOT_ALIASES: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "case", "desc", "distinct", "else", "end",
    "false", "filter", "from", "ilike", "in", "is", "like", "not", "null", "or", "over",
    "precision", "some", "then", "true", "varying", "when", "zone",
];

fn is_alias_candidate(token: &Tok) -> bool {
    match token.kind {
        TokenKind::QuotedIdent => true,
        TokenKind::Word => !NOT_ALIASES.contains(&token.text.as_str()),
        _ => false,
    }
}

/// Split a select item into its expression and explicit or implicit alias.
fn split_alias(item: &[Tok]) -> (&[Tok], Option<&Tok>) {
    let n = item.len();
    if n >= 3 && item[n - 2].is_word("as") && item[n - 1].is_identifier() {
        return (&item[..n - 2], Some(&item[n - 1]));
    }
    if n >= 2 && is_alias_candidate(&item[n - 1]) {
        let prev = &item[n - 2];
        let ends_expression = is_alias_candidate(prev)
            || prev.is_symbol(")")
            || matches!(prev.kind, TokenKind::Number | TokenKind::String);
        if ends_expression {
            return (&item[..n - 1], Some(&item[n - 1]));
        }
    }
    (item, None)
}

/// Name of the output column: the alias, or the column of a bare reference.
fn output_name<'a>(expr: &'a [Tok], alias: Option<&'a Tok>) -> Option<&'a str> {
    if let Some(alias) = alias {
        return Some(&alias.text);
    }
    let is_reference = !expr.is_empty()
        && expr.iter().enumerate().all(|(i, t)| {
            if i % 2 == 0 {
                t.is_identifier()
            } else {
                t.is_symbol(".")
            }
        })
        && expr.len() % 2 == 1;
    is_reference
        .then(|| expr.last().map(|t| t.text.as_str()))
        .flatten()
}

fn select_items_equal(a: &[Tok], b: &[Tok]) -> bool {
    let (a_expr, a_alias) = split_alias(a);
    let (b_expr, b_alias) = split_alias(b);
    expression::equivalent(a_expr, b_expr)
        && output_name(a_expr, a_alias) == output_name(b_expr, b_alias)
}

fn without_as(item: &[Tok]) -> Vec<&Tok> {
    item.iter().filter(|t| !t.is_word("as")).collect()
}

fn from_items_equal(a: &[Tok], b: &[Tok]) -> bool {
    without_as(a) == without_as(b)
}

/// Split a join clause at its depth-zero ON.
fn split_join(clause: &[Tok]) -> (Vec<&Tok>, &[Tok]) {
    let mut depth = 0usize;
    let mut on = clause.len();
    for (i, token) in clause.iter().enumerate() {
        if token.is_symbol("(") {
            depth += 1;
        } else if token.is_symbol(")") {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.is_word("on") {
            on = i;
            break;
        }
    }
    let head = clause[..on]
        .iter()
        .filter(|t| !t.is_word("inner") && !t.is_word("outer") && !t.is_word("as"))
        .collect();
    let condition = clause.get(on + 1..).unwrap_or(&[]);
    (head, condition)
}

fn joins_equal(a: &[Tok], b: &[Tok]) -> bool {
    let (a_head, a_condition) = split_join(a);
    let (b_head, b_condition) = split_join(b);
    a_head == b_head && conditions_equal(a_condition, b_condition)
}

/// Split trailing ASC / DESC / NULLS modifiers off an ORDER BY item. ASC is
/// the default and dropped.
fn order_key(item: &[Tok]) -> (&[Tok], Vec<&str>) {
    const MODIFIERS: [&str; 5] = ["asc", "desc", "nulls", "first", "last"];
    let mut end = item.len();
    while end > 1 && MODIFIERS.iter().any(|m| item[end - 1].is_word(m)) {
        end -= 1;
    }
    let modifiers = item[end..]
        .iter()
        .map(|t| t.text.as_str())
        .filter(|m| *m != "asc")
        .collect();
    (&item[..end], modifiers)
}

fn order_items_equal(a: &[Tok], b: &[Tok]) -> bool {
    let (a_expr, a_modifiers) = order_key(a);
    let (b_expr, b_modifiers) = order_key(b);
    a_modifiers == b_modifiers && expression::equivalent(a_expr, b_expr)
}

fn conditions_equal(a: &[Tok], b: &[Tok]) -> bool {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => true,
        (false, false) => expression::equivalent(a, b),
        _ => false,
    }
}

fn ordered_match(a: &[Vec<Tok>], b: &[Vec<Tok>], eq: impl Fn(&[Tok], &[Tok]) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(x, y))
}

/// Whether every item of `a` pairs with a distinct equal item of `b`.
fn bijective_match(a: &[Vec<Tok>], b: &[Vec<Tok>], eq: impl Fn(&[Tok], &[Tok]) -> bool) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let candidates: Vec<Vec<usize>> = a
        .iter()
        .map(|x| {
            b.iter()
                .enumerate()
                .filter(|(_, y)| eq(x, y))
                .map(|(j, _)| j)
                .collect()
        })
        .collect();

    let mut matched: Vec<Option<usize>> = vec![None; b.len()];
    (0..a.len()).all(|i| {
        let mut seen = vec![false; b.len()];
        augment(i, &candidates, &mut seen, &mut matched)
    })
}

/// Kuhn's augmenting path step.
fn augment(
    i: usize,
    candidates: &[Vec<usize>],
    seen: &mut [bool],
    matched: &mut [Option<usize>],
) -> bool {
    for &j in &candidates[i] {
        if seen[j] {
            continue;
        }
        seen[j] = true;
        let partner = matched[j];
        if partner.is_none_or(|k| augment(k, candidates, seen, matched)) {
            matched[j] = Some(i);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comparer() -> ViewComparer {
        ViewComparer::new("public")
    }

    fn shape(sql: &str) -> QueryShape {
        QueryShape::classify(&normalized_tokens(sql, "public").unwrap()).unwrap()
    }

    #[test]
    fn test_classify_clauses() {
        let shape = shape(
            "SELECT DISTINCT u.id, count(*) AS n FROM users u \
             LEFT OUTER JOIN orders o ON o.user_id = u.id JOIN items i ON i.order_id = o.id \
             WHERE u.active GROUP BY u.id HAVING count(*) > 1 ORDER BY n DESC LIMIT 10",
        );
        assert_eq!(shape.distinct.len(), 1);
        assert_eq!(shape.select.len(), 2);
        assert_eq!(shape.from.len(), 1);
        assert_eq!(shape.joins.len(), 2);
        assert!(!shape.where_clause.is_empty());
        assert_eq!(shape.group_by.len(), 1);
        assert!(!shape.having.is_empty());
        assert_eq!(shape.order_by.len(), 1);
        assert_eq!(shape.tail.len(), 2);
    }

    #[test]
    fn test_subquery_parens_do_not_split() {
        let shape = shape("SELECT (SELECT max(x) FROM t WHERE t.a = b.a), b.c FROM b");
        assert_eq!(shape.select.len(), 2);
        assert_eq!(shape.from.len(), 1);
        assert!(shape.where_clause.is_empty());
    }

    #[test]
    fn test_set_operations_are_not_classified() {
        let tokens = normalized_tokens("SELECT 1 UNION SELECT 2", "public").unwrap();
        assert!(QueryShape::classify(&tokens).is_none());
    }

    #[test]
    fn test_equivalent_with_schema_and_parens() {
        assert!(comparer().equivalent(
            "SELECT id, name FROM public.users WHERE active = true",
            "SELECT id, name FROM users WHERE (active = true)",
        ));
    }

    #[test]
    fn test_dropped_column_requires_recreation() {
        let result = comparer().compare(
            "SELECT id, name FROM users",
            "SELECT id FROM users",
        );
        assert!(!result.equivalent);
        assert!(result.requires_recreation);
        assert_eq!(result.changed_clauses, vec![QueryClause::Select]);
    }

    #[test]
    fn test_qualified_and_case_insensitive() {
        assert!(comparer().equivalent(
            "SELECT users.id FROM users",
            "select ID from USERS",
        ));
    }

    #[test]
    fn test_alias_changes_output() {
        assert!(!comparer().equivalent("SELECT id AS user_id FROM users", "SELECT id FROM users"));
        assert!(comparer().equivalent("SELECT id AS id FROM users", "SELECT users.id FROM users"));
        assert!(comparer().equivalent("SELECT count(*) n FROM t", "SELECT count(*) AS n FROM t"));
    }

    #[test]
    fn test_from_and_group_by_ignore_order() {
        assert!(comparer().equivalent(
            "SELECT a FROM x, y GROUP BY a, b",
            "SELECT a FROM y, x GROUP BY b, a",
        ));
    }

    #[test]
    fn test_select_and_order_by_keep_order() {
        assert!(!comparer().equivalent("SELECT a, b FROM t", "SELECT b, a FROM t"));
        assert!(!comparer().equivalent(
            "SELECT a FROM t ORDER BY a, b",
            "SELECT a FROM t ORDER BY b, a",
        ));
        assert!(comparer().equivalent(
            "SELECT a FROM t ORDER BY a ASC",
            "SELECT a FROM t ORDER BY a",
        ));
    }

    #[test]
    fn test_join_synonyms() {
        assert!(comparer().equivalent(
            "SELECT a.x FROM a JOIN b ON a.id = b.a_id",
            "SELECT a.x FROM a INNER JOIN b ON (a.id = b.a_id)",
        ));
        assert!(comparer().equivalent(
            "SELECT a.x FROM a LEFT OUTER JOIN b ON a.id = b.a_id",
            "SELECT a.x FROM a LEFT JOIN b ON a.id = b.a_id",
        ));
        assert!(!comparer().equivalent(
            "SELECT a.x FROM a LEFT JOIN b ON a.id = b.a_id",
            "SELECT a.x FROM a JOIN b ON a.id = b.a_id",
        ));
    }

    #[test]
    fn test_join_condition_switching_alias_detected() {
        let result = comparer().compare(
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id",
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = o.id",
        );
        assert!(!result.equivalent);
        assert_eq!(result.changed_clauses, vec![QueryClause::Join]);
    }

    #[test]
    fn test_projection_switching_alias_detected() {
        let result = comparer().compare(
            "SELECT u.id FROM users u JOIN orders o ON o.user_id = u.id",
            "SELECT o.id FROM users u JOIN orders o ON o.user_id = u.id",
        );
        assert!(!result.equivalent);
        assert_eq!(result.changed_clauses, vec![QueryClause::Select]);

        assert!(!comparer().equivalent(
            "SELECT id FROM users u JOIN orders o ON o.user_id = u.id WHERE u.active",
            "SELECT id FROM users u JOIN orders o ON o.user_id = u.id WHERE o.active",
        ));
    }

    #[test]
    fn test_where_change_detected() {
        let result = comparer().compare(
            "SELECT id FROM users WHERE active",
            "SELECT id FROM users WHERE NOT active",
        );
        assert_eq!(result.changed_clauses, vec![QueryClause::Where]);
    }

    #[test]
    fn test_fallback_for_set_operations() {
        let result = comparer().compare(
            "SELECT id FROM a UNION SELECT id FROM b",
            "select id from a union select id from public.b",
        );
        assert!(result.equivalent);
        assert!(result.fallback);

        let result = comparer().compare(
            "SELECT id FROM a UNION SELECT id FROM b",
            "SELECT id FROM a UNION ALL SELECT id FROM b",
        );
        assert!(!result.equivalent);
        assert_eq!(result.changed_clauses, vec![QueryClause::Query]);
    }

    #[test]
    fn test_create_statements_accepted() {
        assert!(comparer().equivalent(
            "CREATE VIEW active_users AS SELECT id FROM public.users WHERE active",
            "CREATE OR REPLACE VIEW active_users AS SELECT users.id FROM users WHERE (active)",
        ));

        let result = comparer().compare(
            "CREATE VIEW v (a) AS SELECT id FROM users",
            "CREATE VIEW v (b) AS SELECT id FROM users",
        );
        assert_eq!(result.changed_clauses, vec![QueryClause::Columns]);
    }

    #[test]
    fn test_missing_side_counts_as_equal() {
        assert!(comparer().equivalent_opt(None, Some("SELECT 1")));
        assert!(comparer().equivalent_opt(Some("SELECT 1"), None));
        assert!(!comparer().equivalent_opt(Some("SELECT 1"), Some("SELECT 2")));
    }

    #[test]
    fn test_bijective_match_needs_distinct_partners() {
        let tokens = |s: &str| normalized_tokens(s, "public").unwrap();
        let a = vec![tokens("x"), tokens("x")];
        let b = vec![tokens("x"), tokens("y")];
        assert!(!bijective_match(&a, &b, |p, q| p == q));
        assert!(bijective_match(&a, &a, |p, q| p == q));
    }
}
