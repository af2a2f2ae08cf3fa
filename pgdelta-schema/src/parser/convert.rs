//! Conversion from pest pairs to the typed statement tree.

use pest::iterators::Pair as PestPair;

use super::grammar::Rule;
use super::syntax::*;
use crate::error::{SchemaError, SchemaResult};
use crate::model::{ParameterMode, RoutineKind};

type Pair<'i> = PestPair<'i, Rule>;

// =============================================================================
// Statements
// =============================================================================

/// Convert a `statement` pair.
pub(crate) fn statement(pair: Pair<'_>) -> SchemaResult<Statement> {
    let span = Span::new(pair.as_span().start(), pair.as_span().end());
    let text = pair.as_str().trim().to_string();
    let inner = first(&pair, "statement")?;

    let kind = match inner.as_rule() {
        Rule::create_schema => StatementKind::CreateSchema(create_schema(&inner)?),
        Rule::create_table => StatementKind::CreateTable(create_table(&inner)?),
        Rule::create_index => StatementKind::CreateIndex(create_index(&inner)),
        Rule::create_sequence => StatementKind::CreateSequence(create_sequence(&inner)?),
        Rule::create_view => StatementKind::CreateView(create_view(&inner, Rule::view_query)?),
        Rule::create_materialized_view => {
            StatementKind::CreateMaterializedView(create_view(&inner, Rule::matview_query)?)
        }
        Rule::create_function => StatementKind::CreateFunction(create_function(&inner)?),
        Rule::create_enum_type => StatementKind::CreateEnumType(create_enum_type(&inner)?),
        Rule::create_extension => StatementKind::CreateExtension(create_extension(&inner)?),
        Rule::create_trigger => StatementKind::CreateTrigger(create_trigger(&inner)?),
        Rule::create_rule => StatementKind::CreateRule(create_rule(&inner)?),
        Rule::alter_table => alter_table(&inner)?,
        Rule::alter_sequence => StatementKind::AlterSequenceOwner(alter_sequence(&inner)?),
        Rule::comment_on => StatementKind::Comment(comment_on(&inner)?),
        _ => StatementKind::Other,
    };

    Ok(Statement { kind, text, span })
}

fn create_schema(pair: &Pair<'_>) -> SchemaResult<CreateSchema> {
    let name = find(pair, Rule::ident)
        .or_else(|| find(pair, Rule::schema_authorization).and_then(|a| find(&a, Rule::ident)))
        .map(|p| ident(&p))
        .ok_or_else(|| SchemaError::invalid_statement("CREATE SCHEMA", "missing schema name"))?;

    Ok(CreateSchema {
        name,
        if_not_exists: has(pair, Rule::if_not_exists),
    })
}

fn create_table(pair: &Pair<'_>) -> SchemaResult<CreateTable> {
    const STMT: &str = "CREATE TABLE";
    let start = pair.as_span().start();
    let text = pair.as_str();

    let name = qualified_name(&expect(pair, Rule::qualified_name, STMT)?);
    let mut elements = Vec::new();
    let mut partition_of = None;
    let mut partition_by = None;
    let mut body_range = None;

    for item in pair.clone().into_inner() {
        match item.as_rule() {
            Rule::table_body => {
                body_range = Some((item.as_span().start(), item.as_span().end()));
                for element in children(&item, Rule::table_element) {
                    elements.push(table_element(&element)?);
                }
            }
            Rule::partition_of => {
                body_range = Some((item.as_span().start(), item.as_span().end()));
                for element in children(&item, Rule::table_element) {
                    elements.push(table_element(&element)?);
                }
                partition_of = Some(PartitionOf {
                    parent: qualified_name(&expect(&item, Rule::qualified_name, STMT)?),
                    bound: squash(expect(&item, Rule::partition_bound, STMT)?.as_str()),
                });
            }
            Rule::partition_by => {
                let strategy = expect(&item, Rule::partition_strategy, STMT)?;
                let columns = expect(&item, Rule::paren_group, STMT)?;
                partition_by = Some(PartitionKey {
                    strategy: keywords(strategy.as_str()),
                    columns: squash(strip_parens(columns.as_str())),
                });
            }
            _ => {}
        }
    }

    let (body_start, body_end) = body_range
        .ok_or_else(|| SchemaError::invalid_statement(STMT, "missing table body"))?;
    let head = text[..body_start - start].trim_end().to_string();
    let tail = text[body_end - start..].trim().to_string();

    Ok(CreateTable {
        name,
        if_not_exists: has(pair, Rule::if_not_exists),
        elements,
        partition_of,
        partition_by,
        head,
        tail,
    })
}

fn table_element(pair: &Pair<'_>) -> SchemaResult<TableElement> {
    let inner = first(pair, "table element")?;
    match inner.as_rule() {
        Rule::column_def => Ok(TableElement::Column(column_def(&inner)?)),
        Rule::table_constraint => Ok(TableElement::Constraint(table_constraint(&inner)?)),
        _ => Ok(TableElement::Like {
            text: inner.as_str().trim().to_string(),
        }),
    }
}

/// Convert a `column_def` pair.
pub(crate) fn column_def(pair: &Pair<'_>) -> SchemaResult<ColumnDef> {
    let name = find(pair, Rule::ident)
        .map(|p| ident(&p))
        .ok_or_else(|| SchemaError::invalid_statement("column definition", "missing name"))?;
    let data_type = find(pair, Rule::data_type).map(|p| squash(p.as_str()));

    let mut constraints = Vec::new();
    for item in children(pair, Rule::column_constraint) {
        constraints.push(column_constraint(&item)?);
    }

    Ok(ColumnDef {
        name,
        data_type,
        constraints,
        text: pair.as_str().trim().to_string(),
    })
}

fn column_constraint(pair: &Pair<'_>) -> SchemaResult<ColumnConstraint> {
    const STMT: &str = "column constraint";
    let mut name = None;
    let mut kind = None;

    for item in pair.clone().into_inner() {
        let converted = match item.as_rule() {
            Rule::ident => {
                name = Some(ident(&item));
                continue;
            }
            Rule::not_null => ColumnConstraintKind::NotNull,
            Rule::null_constraint => ColumnConstraintKind::Null,
            Rule::default_clause => {
                let expr = expect(&item, Rule::default_expr, STMT)?;
                ColumnConstraintKind::Default(expr.as_str().trim().to_string())
            }
            Rule::identity_clause => {
                let mode = expect(&item, Rule::identity_mode, STMT)?;
                let mut options = Vec::new();
                for option in item.clone().into_inner() {
                    if let Some(option) = sequence_option(&option)? {
                        options.push(option);
                    }
                }
                ColumnConstraintKind::Identity {
                    always: has(&mode, Rule::kw_always),
                    options,
                }
            }
            Rule::generated_column => {
                let expr = expect(&item, Rule::paren_group, STMT)?;
                ColumnConstraintKind::Generated(squash(strip_parens(expr.as_str())))
            }
            Rule::primary_key_inline => ColumnConstraintKind::PrimaryKey {
                include: include_columns(&item),
            },
            Rule::unique_inline => ColumnConstraintKind::Unique {
                nulls_not_distinct: nulls_not_distinct(&item),
            },
            Rule::check_clause => {
                let (expression, no_inherit) = check_clause(&item)?;
                ColumnConstraintKind::Check {
                    expression,
                    no_inherit,
                }
            }
            Rule::references_clause => ColumnConstraintKind::References(references(&item)?),
            Rule::collate_clause => {
                let collation = expect(&item, Rule::qualified_name, STMT)?;
                ColumnConstraintKind::Collate(collation.as_str().trim().to_string())
            }
            Rule::deferrable_clause => ColumnConstraintKind::Deferrable(keywords(item.as_str())),
            _ => continue,
        };
        kind = Some(converted);
    }

    let kind = kind.ok_or_else(|| SchemaError::invalid_statement(STMT, "missing constraint"))?;
    Ok(ColumnConstraint { name, kind })
}

/// Convert a `table_constraint` pair.
pub(crate) fn table_constraint(pair: &Pair<'_>) -> SchemaResult<TableConstraint> {
    const STMT: &str = "table constraint";
    let mut name = None;
    let mut kind = None;
    let mut no_inherit = false;

    for item in pair.clone().into_inner() {
        let converted = match item.as_rule() {
            Rule::ident => {
                name = Some(ident(&item));
                continue;
            }
            Rule::kw_inherit => {
                no_inherit = true;
                continue;
            }
            Rule::primary_key_constraint => TableConstraintKind::PrimaryKey {
                columns: column_list(&expect(&item, Rule::column_list, STMT)?),
                include: include_columns(&item),
            },
            Rule::unique_constraint => TableConstraintKind::Unique {
                columns: column_list(&expect(&item, Rule::column_list, STMT)?),
                include: include_columns(&item),
                nulls_not_distinct: nulls_not_distinct(&item),
            },
            Rule::check_clause => {
                let (expression, inherit_flag) = check_clause(&item)?;
                no_inherit |= inherit_flag;
                TableConstraintKind::Check {
                    expression,
                    no_inherit: false,
                }
            }
            Rule::foreign_key_constraint => TableConstraintKind::ForeignKey {
                columns: column_list(&expect(&item, Rule::column_list, STMT)?),
                target: references(&expect(&item, Rule::references_clause, STMT)?)?,
            },
            Rule::exclude_constraint => {
                let keyword_end = find(&item, Rule::kw_exclude)
                    .map(|k| k.as_span().end() - item.as_span().start())
                    .unwrap_or(0);
                TableConstraintKind::Exclude {
                    definition: item.as_str()[keyword_end..].trim().to_string(),
                }
            }
            _ => continue,
        };
        kind = Some(converted);
    }

    let mut kind = kind.ok_or_else(|| SchemaError::invalid_statement(STMT, "missing constraint"))?;
    if let TableConstraintKind::Check {
        no_inherit: flag, ..
    } = &mut kind
    {
        *flag = no_inherit;
    }

    Ok(TableConstraint {
        name,
        kind,
        text: pair.as_str().trim().to_string(),
    })
}

fn check_clause(pair: &Pair<'_>) -> SchemaResult<(String, bool)> {
    let expr = expect(pair, Rule::paren_group, "CHECK")?;
    Ok((
        squash(strip_parens(expr.as_str())),
        has(pair, Rule::kw_inherit),
    ))
}

fn references(pair: &Pair<'_>) -> SchemaResult<ForeignKeyTarget> {
    let table = qualified_name(&expect(pair, Rule::qualified_name, "REFERENCES")?);
    let columns = find(pair, Rule::column_list)
        .map(|p| column_list(&p))
        .unwrap_or_default();

    let mut target = ForeignKeyTarget {
        table,
        columns,
        on_delete: None,
        on_update: None,
        match_type: None,
    };
    for item in pair.clone().into_inner() {
        match item.as_rule() {
            Rule::fk_on_delete => {
                target.on_delete = find(&item, Rule::ref_action).map(|a| keywords(a.as_str()));
            }
            Rule::fk_on_update => {
                target.on_update = find(&item, Rule::ref_action).map(|a| keywords(a.as_str()));
            }
            Rule::fk_match => {
                target.match_type = item
                    .clone()
                    .into_inner()
                    .last()
                    .map(|k| keywords(k.as_str()));
            }
            _ => {}
        }
    }
    Ok(target)
}

fn include_columns(pair: &Pair<'_>) -> Vec<String> {
    find(pair, Rule::include_columns)
        .and_then(|p| find(&p, Rule::column_list))
        .map(|p| column_list(&p))
        .unwrap_or_default()
}

fn nulls_not_distinct(pair: &Pair<'_>) -> bool {
    find(pair, Rule::nulls_distinct).is_some_and(|p| has(&p, Rule::kw_not))
}

// =============================================================================
// Indexes and sequences
// =============================================================================

fn create_index(pair: &Pair<'_>) -> CreateIndex {
    let mut index = CreateIndex {
        name: None,
        unique: has(pair, Rule::unique_flag),
        if_not_exists: has(pair, Rule::if_not_exists),
        table: QualifiedName::bare(""),
        method: None,
        keys: Vec::new(),
        include: include_columns(pair),
        predicate: None,
    };

    for item in pair.clone().into_inner() {
        match item.as_rule() {
            Rule::ident => index.name = Some(ident(&item)),
            Rule::qualified_name => index.table = qualified_name(&item),
            Rule::index_method => index.method = find(&item, Rule::ident).map(|m| ident(&m)),
            Rule::index_key => index.keys.push(index_key(&item)),
            Rule::index_where => {
                index.predicate = find(&item, Rule::where_expr).map(|w| squash(w.as_str()));
            }
            _ => {}
        }
    }
    index
}

fn index_key(pair: &Pair<'_>) -> IndexKey {
    let expression = find(pair, Rule::index_expression)
        .and_then(|e| e.into_inner().next())
        .map(|e| match e.as_rule() {
            Rule::ident => ident(&e),
            _ => squash(e.as_str()),
        })
        .unwrap_or_default();
    let descending = find(pair, Rule::sort_direction).is_some_and(|d| has(&d, Rule::kw_desc));

    IndexKey {
        expression,
        descending,
        text: pair.as_str().trim().to_string(),
    }
}

fn create_sequence(pair: &Pair<'_>) -> SchemaResult<CreateSequence> {
    let name = qualified_name(&expect(pair, Rule::qualified_name, "CREATE SEQUENCE")?);
    let mut options = Vec::new();
    for item in pair.clone().into_inner() {
        if let Some(option) = sequence_option(&item)? {
            options.push(option);
        }
    }
    Ok(CreateSequence {
        name,
        if_not_exists: has(pair, Rule::if_not_exists),
        options,
    })
}

fn alter_sequence(pair: &Pair<'_>) -> SchemaResult<AlterSequenceOwner> {
    const STMT: &str = "ALTER SEQUENCE";
    let sequence = qualified_name(&expect(pair, Rule::qualified_name, STMT)?);
    let owner = owned_by(&expect(pair, Rule::seq_owned_by, STMT)?)?;
    Ok(AlterSequenceOwner { sequence, owner })
}

fn sequence_option(pair: &Pair<'_>) -> SchemaResult<Option<SequenceOption>> {
    let option = match pair.as_rule() {
        Rule::seq_as => SequenceOption::DataType(squash(
            expect(pair, Rule::data_type, "sequence option")?.as_str(),
        )),
        Rule::seq_increment => SequenceOption::Increment(signed_number(pair)?),
        Rule::seq_minvalue => SequenceOption::MinValue(Some(signed_number(pair)?)),
        Rule::seq_no_minvalue => SequenceOption::MinValue(None),
        Rule::seq_maxvalue => SequenceOption::MaxValue(Some(signed_number(pair)?)),
        Rule::seq_no_maxvalue => SequenceOption::MaxValue(None),
        Rule::seq_start => SequenceOption::Start(signed_number(pair)?),
        Rule::seq_cache => SequenceOption::Cache(signed_number(pair)?),
        Rule::seq_cycle => SequenceOption::Cycle(true),
        Rule::seq_no_cycle => SequenceOption::Cycle(false),
        Rule::seq_owned_by => SequenceOption::OwnedBy(owned_by(pair)?),
        Rule::seq_name => SequenceOption::Name(qualified_name(&expect(
            pair,
            Rule::qualified_name,
            "sequence option",
        )?)),
        _ => return Ok(None),
    };
    Ok(Some(option))
}

fn owned_by(pair: &Pair<'_>) -> SchemaResult<Option<ColumnRef>> {
    match find(pair, Rule::qualified_name) {
        Some(name) => column_ref(&name, "OWNED BY").map(Some),
        None => Ok(None),
    }
}

fn signed_number(pair: &Pair<'_>) -> SchemaResult<i64> {
    let number = expect(pair, Rule::signed_number, "sequence option")?;
    number.as_str().parse().map_err(|_| {
        SchemaError::invalid_statement(
            "sequence option",
            format!("number `{}` is out of range", number.as_str()),
        )
    })
}

// =============================================================================
// Views and routines
// =============================================================================

fn create_view(pair: &Pair<'_>, query_rule: Rule) -> SchemaResult<CreateView> {
    const STMT: &str = "CREATE VIEW";
    let name = qualified_name(&expect(pair, Rule::qualified_name, STMT)?);
    let columns = find(pair, Rule::column_list)
        .map(|p| column_list(&p))
        .unwrap_or_default();
    let query = expect(pair, query_rule, STMT)?.as_str().trim().to_string();
    let with_data = find(pair, Rule::with_data).is_none_or(|w| !has(&w, Rule::kw_no));

    Ok(CreateView {
        name,
        or_replace: has(pair, Rule::or_replace),
        columns,
        query,
        with_data,
    })
}

fn create_function(pair: &Pair<'_>) -> SchemaResult<CreateFunction> {
    const STMT: &str = "CREATE FUNCTION";
    let kind = match find(pair, Rule::routine_kind) {
        Some(k) if has(&k, Rule::kw_procedure) => RoutineKind::Procedure,
        _ => RoutineKind::Function,
    };

    let mut function = CreateFunction {
        name: qualified_name(&expect(pair, Rule::qualified_name, STMT)?),
        kind,
        or_replace: has(pair, Rule::or_replace),
        parameters: Vec::new(),
        returns: None,
        language: None,
        options: Vec::new(),
        body: None,
    };

    for item in pair.clone().into_inner() {
        let rule = item.as_rule();
        match rule {
            Rule::function_param => function.parameters.push(function_param(&item)?),
            Rule::function_returns => {
                function.returns = find(&item, Rule::return_type).map(|r| squash(r.as_str()));
            }
            Rule::function_language => {
                function.language = item
                    .clone()
                    .into_inner()
                    .find(|p| p.as_rule() != Rule::kw_language)
                    .map(|p| match p.as_rule() {
                        Rule::ident => ident(&p),
                        _ => unquote_literal(p.as_str()).to_ascii_lowercase(),
                    });
            }
            Rule::function_body => {
                let parts: Vec<String> = children(&item, Rule::body_string)
                    .map(|b| unquote_literal(b.as_str()))
                    .collect();
                function.body = Some(parts.join(", "));
            }
            Rule::sql_body => function.body = Some(item.as_str().trim().to_string()),
            Rule::function_volatility => function.push_option("VOLATILITY", keywords(item.as_str())),
            Rule::function_security => {
                let value = last_keyword(&item);
                function.push_option("SECURITY", value);
            }
            Rule::function_parallel => {
                let value = last_keyword(&item);
                function.push_option("PARALLEL", value);
            }
            Rule::function_cost | Rule::function_rows => {
                let key = if rule == Rule::function_cost { "COST" } else { "ROWS" };
                let value = find(&item, Rule::number)
                    .map(|n| n.as_str().to_string())
                    .unwrap_or_default();
                function.push_option(key, value);
            }
            Rule::function_leakproof => {
                let value = if has(&item, Rule::kw_not) { "false" } else { "true" };
                function.push_option("LEAKPROOF", value.to_string());
            }
            Rule::function_strict => function.push_option("STRICT", "true".to_string()),
            Rule::function_called_on_null => function.push_option("STRICT", "false".to_string()),
            Rule::function_window => function.push_option("WINDOW", "true".to_string()),
            Rule::function_set => {
                let setting = find(&item, Rule::ident).map(|i| ident(&i)).unwrap_or_default();
                let values: Vec<String> = children(&item, Rule::set_value)
                    .map(|v| v.as_str().trim().to_string())
                    .collect();
                let value = if values.is_empty() {
                    "FROM CURRENT".to_string()
                } else {
                    values.join(", ")
                };
                function.push_option(&format!("SET {setting}"), value);
            }
            Rule::function_transform => {
                function.push_option("TRANSFORM", squash(item.as_str()));
            }
            Rule::function_support => {
                let value = find(&item, Rule::qualified_name)
                    .map(|q| qualified_name(&q).to_string())
                    .unwrap_or_default();
                function.push_option("SUPPORT", value);
            }
            _ => {}
        }
    }

    Ok(function)
}

impl CreateFunction {
    fn push_option(&mut self, key: &str, value: String) {
        self.options.retain(|(k, _)| k != key);
        self.options.push((key.to_string(), value));
    }
}

fn function_param(pair: &Pair<'_>) -> SchemaResult<FunctionParam> {
    let mode = match find(pair, Rule::param_mode).map(|m| keywords(m.as_str())) {
        Some(m) if m == "OUT" => ParameterMode::Out,
        Some(m) if m == "INOUT" || m == "IN OUT" => ParameterMode::InOut,
        Some(m) if m == "VARIADIC" => ParameterMode::Variadic,
        _ => ParameterMode::In,
    };
    let name = find(pair, Rule::param_name)
        .and_then(|n| find(&n, Rule::ident))
        .map(|n| ident(&n));
    let data_type = find(pair, Rule::data_type)
        .map(|t| squash(t.as_str()))
        .ok_or_else(|| SchemaError::invalid_statement("parameter", "missing type"))?;
    let default = find(pair, Rule::param_default)
        .and_then(|d| find(&d, Rule::param_default_expr))
        .map(|d| squash(d.as_str()));

    Ok(FunctionParam {
        mode,
        name,
        data_type,
        default,
    })
}

fn create_enum_type(pair: &Pair<'_>) -> SchemaResult<CreateEnumType> {
    Ok(CreateEnumType {
        name: qualified_name(&expect(pair, Rule::qualified_name, "CREATE TYPE")?),
        values: children(pair, Rule::enum_label)
            .map(|l| unquote_literal(l.as_str()))
            .collect(),
    })
}

fn create_extension(pair: &Pair<'_>) -> SchemaResult<CreateExtension> {
    let name = ident(&expect(pair, Rule::ident, "CREATE EXTENSION")?);
    let schema = find(pair, Rule::extension_schema)
        .and_then(|s| find(&s, Rule::ident))
        .map(|s| ident(&s));
    let version = find(pair, Rule::extension_version)
        .and_then(|v| v.into_inner().find(|p| p.as_rule() != Rule::kw_version))
        .map(|v| match v.as_rule() {
            Rule::ident => ident(&v),
            _ => unquote_literal(v.as_str()),
        });
    Ok(CreateExtension {
        name,
        schema,
        version,
    })
}

fn create_trigger(pair: &Pair<'_>) -> SchemaResult<CreateTrigger> {
    const STMT: &str = "CREATE TRIGGER";
    let events = find(pair, Rule::trigger_events)
        .map(|events| {
            children(&events, Rule::trigger_event)
                .map(|event| trigger_event(&event))
                .collect()
        })
        .unwrap_or_default();
    let function = find(pair, Rule::function_call)
        .and_then(|call| find(&call, Rule::qualified_name))
        .map(|name| qualified_name(&name))
        .ok_or_else(|| SchemaError::invalid_statement(STMT, "missing trigger function"))?;

    Ok(CreateTrigger {
        name: ident(&expect(pair, Rule::ident, STMT)?),
        table: qualified_name(&expect(pair, Rule::qualified_name, STMT)?),
        timing: keywords(expect(pair, Rule::trigger_timing, STMT)?.as_str()),
        events,
        for_each_row: find(pair, Rule::trigger_for_each).is_some_and(|f| has(&f, Rule::kw_row)),
        function,
        constraint: has(pair, Rule::constraint_flag),
    })
}

fn trigger_event(pair: &Pair<'_>) -> String {
    let mut inner = pair.clone().into_inner();
    let keyword = inner
        .next()
        .map(|k| keywords(k.as_str()))
        .unwrap_or_default();
    let columns: Vec<String> = children(pair, Rule::ident).map(|c| ident(&c)).collect();
    if columns.is_empty() {
        keyword
    } else {
        format!("{} OF {}", keyword, columns.join(", "))
    }
}

fn create_rule(pair: &Pair<'_>) -> SchemaResult<CreateRule> {
    const STMT: &str = "CREATE RULE";
    Ok(CreateRule {
        name: ident(&expect(pair, Rule::ident, STMT)?),
        event: keywords(expect(pair, Rule::rule_event, STMT)?.as_str()),
        table: qualified_name(&expect(pair, Rule::qualified_name, STMT)?),
    })
}

// =============================================================================
// ALTER and COMMENT
// =============================================================================

fn alter_table(pair: &Pair<'_>) -> SchemaResult<StatementKind> {
    const STMT: &str = "ALTER TABLE";
    let table = qualified_name(&expect(pair, Rule::qualified_name, STMT)?);

    if let Some(add) = find(pair, Rule::add_constraint) {
        let constraint = table_constraint(&expect(&add, Rule::table_constraint, STMT)?)?;
        return Ok(StatementKind::AddConstraint(AddConstraint { table, constraint }));
    }

    let attach = expect(pair, Rule::attach_partition, STMT)?;
    Ok(StatementKind::AttachPartition(AttachPartition {
        parent: table,
        partition: qualified_name(&expect(&attach, Rule::qualified_name, STMT)?),
        bound: squash(expect(&attach, Rule::partition_bound, STMT)?.as_str()),
    }))
}

fn comment_on(pair: &Pair<'_>) -> SchemaResult<CommentOn> {
    const STMT: &str = "COMMENT ON";
    let text = expect(pair, Rule::comment_text, STMT)?;
    let comment = match text.clone().into_inner().next() {
        Some(value) if value.as_rule() == Rule::kw_null => None,
        Some(value) => Some(unquote_literal(value.as_str())),
        None => None,
    };

    let target = pair
        .clone()
        .into_inner()
        .find_map(|item| comment_target(&item).transpose())
        .ok_or_else(|| SchemaError::invalid_statement(STMT, "missing comment target"))??;

    Ok(CommentOn { target, comment })
}

fn comment_target(pair: &Pair<'_>) -> SchemaResult<Option<CommentTarget>> {
    const STMT: &str = "COMMENT ON";
    let target = match pair.as_rule() {
        Rule::comment_column => {
            let name = expect(pair, Rule::qualified_name, STMT)?;
            CommentTarget::Column(column_ref(&name, STMT)?)
        }
        Rule::comment_constraint => CommentTarget::Constraint {
            name: ident(&expect(pair, Rule::ident, STMT)?),
            table: qualified_name(&expect(pair, Rule::qualified_name, STMT)?),
        },
        Rule::comment_trigger => CommentTarget::Trigger {
            name: ident(&expect(pair, Rule::ident, STMT)?),
            table: qualified_name(&expect(pair, Rule::qualified_name, STMT)?),
        },
        Rule::comment_routine => {
            let name_pair = expect(pair, Rule::qualified_name, STMT)?;
            let after_name = name_pair.as_span().end() - pair.as_span().start();
            let arguments = pair.as_str()[after_name..].contains('(').then(|| {
                children(pair, Rule::function_param)
                    .filter_map(|p| function_param(&p).ok())
                    .filter(|p| p.mode.is_input())
                    .map(|p| p.data_type)
                    .collect()
            });
            CommentTarget::Function {
                name: qualified_name(&name_pair),
                arguments,
            }
        }
        Rule::comment_object => {
            let kind = expect(pair, Rule::comment_object_kind, STMT)?;
            let name = qualified_name(&expect(pair, Rule::qualified_name, STMT)?);
            match keywords(kind.as_str()).as_str() {
                "TABLE" => CommentTarget::Table(name),
                "VIEW" => CommentTarget::View(name),
                "MATERIALIZED VIEW" => CommentTarget::MaterializedView(name),
                "SEQUENCE" => CommentTarget::Sequence(name),
                "INDEX" => CommentTarget::Index(name),
                "SCHEMA" => CommentTarget::Schema(name.name),
                "EXTENSION" => CommentTarget::Extension(name.name),
                _ => CommentTarget::Type(name),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(target))
}

// =============================================================================
// Pair helpers
// =============================================================================

fn first<'i>(pair: &Pair<'i>, what: &str) -> SchemaResult<Pair<'i>> {
    pair.clone()
        .into_inner()
        .next()
        .ok_or_else(|| SchemaError::invalid_statement(what, "empty node"))
}

fn find<'i>(pair: &Pair<'i>, rule: Rule) -> Option<Pair<'i>> {
    pair.clone().into_inner().find(|p| p.as_rule() == rule)
}

fn has(pair: &Pair<'_>, rule: Rule) -> bool {
    find(pair, rule).is_some()
}

fn children<'i>(pair: &Pair<'i>, rule: Rule) -> impl Iterator<Item = Pair<'i>> {
    pair.clone()
        .into_inner()
        .filter(move |p| p.as_rule() == rule)
}

fn expect<'i>(pair: &Pair<'i>, rule: Rule, statement: &str) -> SchemaResult<Pair<'i>> {
    find(pair, rule)
        .ok_or_else(|| SchemaError::invalid_statement(statement, format!("missing {rule:?}")))
}

fn last_keyword(pair: &Pair<'_>) -> String {
    pair.clone()
        .into_inner()
        .last()
        .map(|k| keywords(k.as_str()))
        .unwrap_or_default()
}

/// Fold an `ident` pair: bare names lowercase, quoted names verbatim.
fn ident(pair: &Pair<'_>) -> String {
    match pair.clone().into_inner().next() {
        Some(inner) if inner.as_rule() == Rule::quoted_ident => unquote_ident(inner.as_str()),
        Some(inner) => inner.as_str().to_ascii_lowercase(),
        None => pair.as_str().to_ascii_lowercase(),
    }
}

fn name_parts(pair: &Pair<'_>) -> Vec<String> {
    children(pair, Rule::ident).map(|p| ident(&p)).collect()
}

fn qualified_name(pair: &Pair<'_>) -> QualifiedName {
    let mut parts = name_parts(pair);
    let name = parts.pop().unwrap_or_default();
    QualifiedName {
        schema: parts.pop(),
        name,
    }
}

fn column_ref(pair: &Pair<'_>, statement: &str) -> SchemaResult<ColumnRef> {
    let mut parts = name_parts(pair);
    let column = parts.pop().unwrap_or_default();
    let table = parts
        .pop()
        .ok_or_else(|| SchemaError::invalid_statement(statement, "expected table.column"))?;
    Ok(ColumnRef {
        table: QualifiedName {
            schema: parts.pop(),
            name: table,
        },
        column,
    })
}

fn column_list(pair: &Pair<'_>) -> Vec<String> {
    name_parts(pair)
}

// =============================================================================
// Text helpers
// =============================================================================

/// Remove the quotes of a quoted identifier.
pub(crate) fn unquote_ident(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .map(|t| t.replace("\"\"", "\""))
        .unwrap_or_else(|| text.to_string())
}

/// Decode a string literal: `'...'`, `E'...'` or `$tag$...$tag$`.
pub(crate) fn unquote_literal(text: &str) -> String {
    let text = text.trim();

    if text.starts_with('$') {
        if let Some(tag_end) = text[1..].find('$') {
            let tag = &text[..tag_end + 2];
            if let Some(inner) = text
                .strip_prefix(tag)
                .and_then(|t| t.strip_suffix(tag))
            {
                return inner.to_string();
            }
        }
        return text.to_string();
    }

    let (escaped, body) = match text.chars().next() {
        Some('e' | 'E') => (true, &text[1..]),
        Some('n' | 'N' | 'b' | 'B' | 'x' | 'X') => (false, &text[1..]),
        _ => (false, text),
    };
    let Some(inner) = body.strip_prefix('\'').and_then(|b| b.strip_suffix('\'')) else {
        return text.to_string();
    };

    if !escaped {
        return inner.replace("''", "'");
    }

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('b') => out.push('\u{8}'),
                Some('f') => out.push('\u{c}'),
                Some(other) => out.push(other),
                None => {}
            },
            '\'' => {
                if chars.clone().next() == Some('\'') {
                    chars.next();
                }
                out.push('\'');
            }
            other => out.push(other),
        }
    }
    out
}

/// Inner text of a parenthesized group.
pub(crate) fn strip_parens(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix('(')
        .and_then(|t| t.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Uppercased keyword text with whitespace collapsed.
fn keywords(text: &str) -> String {
    squash(text).to_ascii_uppercase()
}

/// Collapse whitespace and drop comments outside quoted text.
pub(crate) fn squash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.trim().chars().peekable();
    let mut pending_space = false;

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == c {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                pending_space = true;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut depth = 1;
                let mut prev = ' ';
                for inner in chars.by_ref() {
                    match (prev, inner) {
                        ('/', '*') => depth += 1,
                        ('*', '/') => depth -= 1,
                        _ => {}
                    }
                    if depth == 0 {
                        break;
                    }
                    prev = inner;
                }
                pending_space = true;
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_literal() {
        assert_eq!(unquote_literal("'it''s'"), "it's");
        assert_eq!(unquote_literal("E'line\\none'"), "line\none");
        assert_eq!(unquote_literal("E'it\\'s'"), "it's");
        assert_eq!(unquote_literal("$$ SELECT 1 $$"), " SELECT 1 ");
        assert_eq!(unquote_literal("$body$x$body$"), "x");
        assert_eq!(unquote_literal("N'abc'"), "abc");
    }

    #[test]
    fn test_unquote_ident() {
        assert_eq!(unquote_ident("\"Users\""), "Users");
        assert_eq!(unquote_ident("\"a\"\"b\""), "a\"b");
        assert_eq!(unquote_ident("plain"), "plain");
    }

    #[test]
    fn test_strip_parens() {
        assert_eq!(strip_parens("( price > 0 )"), "price > 0");
        assert_eq!(strip_parens("price"), "price");
    }

    #[test]
    fn test_squash() {
        assert_eq!(squash("  a   >\n  0 "), "a > 0");
        assert_eq!(squash("x = 'a   b'"), "x = 'a   b'");
        assert_eq!(squash("a -- note\n + b"), "a + b");
        assert_eq!(squash("a /* c */ + b"), "a + b");
    }
}
