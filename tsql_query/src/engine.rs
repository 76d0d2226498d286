//!
//! Rendering of a query graph into one T-SQL statement.
//!
//! The outermost query emits pre-query options and the `;WITH` block
//! first. Every query body is then rendered as
//! SELECT, FROM/JOIN, WHERE, GROUP BY, set operations, ORDER BY with
//! OFFSET/FETCH, FOR JSON and trailing query options, with nested queries
//! rendered in place through a new scope.
//!

use crate::build::{expand_scopes, BuildContext, Scope, ScopeSource};
use crate::builder::{quote_ident, SqlWriter};
use crate::column::{Column, ColumnKind, Qualifier, SubqueryColumn};
use crate::cte;
use crate::options::BuildOptions;
use crate::order::{derive_order_by, OrderByClause, OrderItem, OrderTarget};
use crate::predicate::{Predicate, PredicateContext, Selector, SqlOperator};
use crate::query::{derive_group_by, ColumnSlot, QueryGraph, QueryId, QueryNode};
use crate::source::{Join, Source};
use crate::statement::Statement;
use crate::window::WindowFunction;
use crate::{QueryError, QueryResult};

pub(crate) fn build(
    graph: &QueryGraph,
    root: QueryId,
    options: &BuildOptions,
) -> QueryResult<Statement> {
    let span = tracing::debug_span!("build", query = root.index());
    let _entered = span.enter();

    graph.node(root)?;
    let mut ctx = BuildContext::new(graph);
    let mut w = SqlWriter::new();
    {
        let mut scope = ctx.enter(Scope::new(ScopeSource::Query(root), options.clone(), 0));
        scope.mark_rendered(root);
        render_preamble(&mut *scope, &mut w, root)?;
        render_query(&mut *scope, &mut w, root)?;
    }

    let sql = w.finish(&options.indentation);
    let params = ctx.into_params();
    tracing::debug!(len = sql.len(), params = params.len(), "built statement");
    Ok(Statement::new(sql, params))
}

/// Pre-query options and the `;WITH` block.
fn render_preamble(ctx: &mut BuildContext<'_>, w: &mut SqlWriter, root: QueryId) -> QueryResult<()> {
    let hoisted = cte::hoist(ctx.graph, root)?;

    for option in &hoisted.pre_query_options {
        w.line(0, option);
    }
    for table in &hoisted.tables {
        ctx.reserve_name(table);
    }

    let mut first = true;
    for cte in hoisted.ctes {
        if !ctx.mark_rendered(cte) {
            tracing::trace!(query = cte.index(), "CTE already rendered");
            continue;
        }
        let name = ctx.claim_name(cte)?;

        w.push(if first { ";WITH " } else { ", " });
        first = false;
        w.push(&quote_ident(&name));
        w.push(" AS (");
        w.newline();
        {
            let nested = ctx.current()?.options.nested(None, None, None);
            let mut scope = ctx.enter(Scope::new(ScopeSource::Query(cte), nested, 1));
            render_query(&mut *scope, w, cte)?;
        }
        w.line(0, ")");
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OrderPlacement {
    None,
    Emit,
    /// ORDER BY is illegal here; keep it visible as a comment.
    Comment,
    /// OFFSET needs an ORDER BY: `ORDER BY (SELECT NULL)`.
    Placeholder,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Pagination {
    pub top: Option<u64>,
    pub order: OrderPlacement,
    pub offset: Option<u64>,
    pub fetch: Option<u64>,
}

///
/// TOP and OFFSET/FETCH never appear together: TOP is used when only a
/// length is set, OFFSET whenever a skip is set.
///
pub(crate) fn paginate(
    outermost: bool,
    skip: Option<u64>,
    length: Option<u64>,
    for_json: bool,
    has_order: bool,
) -> Pagination {
    let length = length.filter(|length| *length > 0);
    let order = match (has_order, skip) {
        (true, None) if !outermost && length.is_none() && !for_json => OrderPlacement::Comment,
        (true, _) => OrderPlacement::Emit,
        (false, Some(_)) => OrderPlacement::Placeholder,
        (false, None) => OrderPlacement::None,
    };

    Pagination {
        top: if skip.is_none() { length } else { None },
        order,
        offset: skip,
        fetch: skip.and(length),
    }
}

/// Body of the query in the current scope.
fn render_query(ctx: &mut BuildContext<'_>, w: &mut SqlWriter, id: QueryId) -> QueryResult<()> {
    let graph = ctx.graph;
    let node = graph.node(id)?;
    if !node.has_columns() {
        return Err(QueryError::NoColumns {
            alias: ctx.query_alias(id)?,
        });
    }

    let (indent, options) = {
        let scope = ctx.current()?;
        (scope.indent, scope.options.clone())
    };
    let for_json = options.for_json;
    let columns = node.scoped_columns();
    let order_items = derive_order_by(&columns, &node.order_by);
    let page = paginate(
        ctx.is_outermost(),
        options.skip.or(node.skip),
        options.length.or(node.length),
        for_json.is_some(),
        !order_items.is_empty(),
    );
    tracing::trace!(query = id.index(), depth = ctx.depth(), ?page, "render query");

    // Decided before the select list so that nested queries referencing
    // the same source see it as already rendered.
    let from_inline = match &node.source {
        Some(Source::Query(source)) => claim_inline(ctx, *source)?,
        _ => false,
    };
    let mut joins_inline = Vec::with_capacity(node.joins.len());
    for join in &node.joins {
        joins_inline.push(match &join.source {
            Source::Query(joined) => claim_inline(ctx, *joined)?,
            Source::Table(_) => false,
        });
    }

    // SELECT
    w.indent(indent);
    w.push("SELECT");
    if let Some(top) = page.top {
        w.push(&format!(" TOP({})", top));
    }
    w.newline();

    let mut first = true;
    for column in &node.columns {
        select_item(ctx, w, indent, &mut first, column)?;
    }
    for join in &node.joins {
        if join.columns.is_empty() {
            continue;
        }
        let mut scope = ctx.enter(join_scope(join, &options, indent));
        for column in &join.columns {
            select_item(&mut *scope, w, indent, &mut first, column)?;
        }
    }

    // FROM
    match &node.source {
        None => {}
        Some(Source::Table(table)) => w.line(indent, &format!("FROM {}", table.from_sql())),
        Some(Source::Query(source)) => {
            w.indent(indent);
            w.push("FROM ");
            render_derived(ctx, w, *source, from_inline, indent)?;
            w.newline();
        }
    }

    for (join, inline) in node.joins.iter().zip(joins_inline) {
        w.indent(indent);
        w.push("  ");
        w.push(&join.kind.to_string());
        w.push(" ");
        match &join.source {
            Source::Table(table) => w.push(&table.from_sql()),
            Source::Query(joined) => render_derived(ctx, w, *joined, inline, indent + 1)?,
        }
        w.newline();

        if let Some(predicate) = &join.predicate {
            let mut scope = ctx.enter(join_scope(join, &options, indent));
            let condition = render_predicate(&mut *scope, predicate)?;
            if !condition.trim().is_empty() {
                w.line(indent, &format!("    ON {}", condition));
            }
        }
    }

    // WHERE
    let mut first = true;
    for predicate in &node.predicates {
        let condition = render_predicate(ctx, predicate)?;
        if condition.trim().is_empty() {
            continue;
        }
        w.indent(indent);
        w.push(if first { "WHERE " } else { "  AND " });
        first = false;
        w.push(&condition);
        w.newline();
    }

    // GROUP BY
    let grouped = derive_group_by(&columns);
    if !grouped.is_empty() {
        let mut terms = Vec::with_capacity(grouped.len());
        for (slot, column) in grouped {
            terms.push(in_slot(ctx, node, slot, &options, indent, |ctx| {
                column_expression(ctx, column, 0)
            })?);
        }
        w.line(indent, &format!("GROUP BY {}", terms.join(", ")));
    }

    for (operator, other) in &node.set_operations {
        w.line(indent, &operator.to_string());
        render_branch(ctx, w, *other, &options, indent)?;
    }

    // ORDER BY / OFFSET
    match page.order {
        OrderPlacement::None => {}
        OrderPlacement::Placeholder => w.line(indent, "ORDER BY (SELECT NULL)"),
        OrderPlacement::Emit | OrderPlacement::Comment => {
            let mut terms = Vec::with_capacity(order_items.len());
            for item in &order_items {
                terms.push(match item {
                    OrderItem::Explicit(clause) => order_clause(ctx, clause, 0)?,
                    OrderItem::Column {
                        scope: slot,
                        column,
                        direction,
                    } => in_slot(ctx, node, *slot, &options, indent, |ctx| {
                        Ok(format!("{} {}", order_expression(ctx, column)?, direction))
                    })?,
                });
            }
            let clause = format!("ORDER BY {}", terms.join(", "));
            if page.order == OrderPlacement::Comment {
                tracing::trace!(query = id.index(), "ORDER BY suppressed in nested scope");
                w.line(indent, &format!("/* {} */", clause.replace("*/", "* /")));
            } else {
                w.line(indent, &clause);
            }
        }
    }
    if let Some(skip) = page.offset {
        match page.fetch {
            Some(length) => w.line(
                indent,
                &format!("OFFSET {} ROWS FETCH NEXT {} ROWS ONLY", skip, length),
            ),
            None => w.line(indent, &format!("OFFSET {} ROWS", skip)),
        }
    }

    if let Some(for_json) = for_json {
        w.line(indent, &for_json.clause());
    }
    if let Some(query_options) = &node.query_options {
        w.line(indent, query_options);
    }
    Ok(())
}

fn select_item(
    ctx: &mut BuildContext<'_>,
    w: &mut SqlWriter,
    indent: usize,
    first: &mut bool,
    column: &Column,
) -> QueryResult<()> {
    w.indent(indent);
    w.push(if *first { "   " } else { "  ," });
    *first = false;
    render_select_column(ctx, w, column)?;
    w.newline();
    Ok(())
}

fn join_scope(join: &Join, options: &BuildOptions, indent: usize) -> Scope {
    let source = match &join.source {
        Source::Table(table) => ScopeSource::Table(table.alias_name().to_string()),
        Source::Query(joined) => ScopeSource::Derived(*joined),
    };
    Scope::new(source, options.clone(), indent)
}

/// Run `f` in the scope a column slot belongs to.
fn in_slot<'g, F>(
    ctx: &mut BuildContext<'g>,
    node: &QueryNode,
    slot: ColumnSlot,
    options: &BuildOptions,
    indent: usize,
    f: F,
) -> QueryResult<String>
where
    F: FnOnce(&mut BuildContext<'g>) -> QueryResult<String>,
{
    match slot {
        ColumnSlot::Join(index) => match node.joins.get(index) {
            Some(join) => {
                let mut scope = ctx.enter(join_scope(join, options, indent));
                f(&mut *scope)
            }
            None => f(ctx),
        },
        ColumnSlot::Own => f(ctx),
    }
}

/// Mark a query source as rendered here. The first time, it also gets a
/// name no other derived table or CTE of the statement holds.
fn claim_inline(ctx: &mut BuildContext<'_>, id: QueryId) -> QueryResult<bool> {
    if !ctx.mark_rendered(id) {
        return Ok(false);
    }
    ctx.claim_name(id)?;
    Ok(true)
}

///
/// One branch of a set operation.
///
/// A paged branch is wrapped as `SELECT * FROM (..) AS [alias]`, so that
/// its ORDER BY and OFFSET/FETCH stay inside the branch instead of paging
/// the combined result.
///
fn render_branch(
    ctx: &mut BuildContext<'_>,
    w: &mut SqlWriter,
    id: QueryId,
    options: &BuildOptions,
    indent: usize,
) -> QueryResult<()> {
    let branch = ctx.graph.node(id)?;
    let paged = branch.skip.is_some() || branch.length.map_or(false, |length| length > 0);
    let nested = options.nested(None, None, None);
    if !paged {
        let mut scope = ctx.enter(Scope::new(ScopeSource::Query(id), nested, indent));
        return render_query(&mut *scope, w, id);
    }

    let alias = ctx.claim_name(id)?;
    tracing::trace!(query = id.index(), %alias, "wrapped paged branch");
    w.line(indent, "SELECT *");
    w.line(indent, "FROM (");
    {
        let mut scope = ctx.enter(Scope::new(ScopeSource::Query(id), nested, indent + 1));
        render_query(&mut *scope, w, id)?;
    }
    w.line(indent, &format!(") AS {}", quote_ident(&alias)));
    Ok(())
}

/// A query used as a source: its body in parentheses the first time,
/// its alias afterwards.
fn render_derived(
    ctx: &mut BuildContext<'_>,
    w: &mut SqlWriter,
    id: QueryId,
    inline: bool,
    indent: usize,
) -> QueryResult<()> {
    if inline {
        w.push("(");
        w.newline();
        let nested = ctx.current()?.options.nested(None, None, None);
        {
            let mut scope = ctx.enter(Scope::new(ScopeSource::Query(id), nested, indent + 1));
            render_query(&mut *scope, w, id)?;
        }
        w.indent(indent);
        w.push(") AS ");
    }
    w.push(&quote_ident(&ctx.query_alias(id)?));
    Ok(())
}

fn render_subquery(
    ctx: &mut BuildContext<'_>,
    w: &mut SqlWriter,
    subquery: &SubqueryColumn,
) -> QueryResult<()> {
    let (indent, nested) = {
        let scope = ctx.current()?;
        (
            scope.indent,
            scope
                .options
                .nested(subquery.skip, subquery.length, subquery.for_json),
        )
    };

    w.push("(");
    w.newline();
    {
        let mut scope = ctx.enter(Scope::new(
            ScopeSource::Query(subquery.query),
            nested,
            indent + 1,
        ));
        render_query(&mut *scope, w, subquery.query)?;
    }
    w.indent(indent);
    w.push(")");
    Ok(())
}

fn render_select_column(
    ctx: &mut BuildContext<'_>,
    w: &mut SqlWriter,
    column: &Column,
) -> QueryResult<()> {
    match &column.kind {
        ColumnKind::Physical => {
            w.push(&column_expression(ctx, column, 0)?);
            if column.uses_alias() {
                push_alias(w, column)?;
            }
        }
        ColumnKind::Computed(_) | ColumnKind::Window(_) => {
            let expression = column_expression(ctx, column, 0)?;
            w.push(&expression);
            push_alias(w, column)?;
        }
        ColumnKind::Wildcard { .. } => w.push(&column_expression(ctx, column, 0)?),
        ColumnKind::Subquery(subquery) => {
            column.name().ok_or(QueryError::MissingIdentifier)?;
            render_subquery(ctx, w, subquery)?;
            push_alias(w, column)?;
        }
    }
    Ok(())
}

fn push_alias(w: &mut SqlWriter, column: &Column) -> QueryResult<()> {
    let name = column.name().ok_or(QueryError::MissingIdentifier)?;
    w.push(" AS ");
    w.push(&quote_ident(name));
    Ok(())
}

/// Alias that `{0}` and unqualified references of `column` resolve to.
fn owner_alias(ctx: &BuildContext<'_>, column: &Column, base: usize) -> QueryResult<String> {
    match &column.qualifier {
        Some(Qualifier::Alias(alias)) => Ok(alias.clone()),
        Some(Qualifier::Query(query)) => ctx.query_alias(*query),
        None => ctx.alias_at(base),
    }
}

/// The bare expression of a column, resolved `base` scopes out.
fn column_expression(ctx: &mut BuildContext<'_>, column: &Column, base: usize) -> QueryResult<String> {
    match &column.kind {
        ColumnKind::Physical => {
            let raw = column.raw_name().ok_or(QueryError::MissingIdentifier)?;
            let owner = owner_alias(ctx, column, base)?;
            Ok(format!("{}.{}", quote_ident(&owner), quote_ident(raw)))
        }
        ColumnKind::Computed(expression) => {
            let owner = owner_alias(ctx, column, base)?;
            expand(ctx, expression, &owner, base)
        }
        ColumnKind::Wildcard { scoped: false } => Ok("*".to_string()),
        ColumnKind::Wildcard { scoped: true } => {
            let owner = owner_alias(ctx, column, base)?;
            Ok(format!("{}.*", quote_ident(&owner)))
        }
        ColumnKind::Subquery(subquery) => {
            let mut nested = SqlWriter::new();
            render_subquery(ctx, &mut nested, subquery)?;
            Ok(nested.into_raw())
        }
        ColumnKind::Window(function) => {
            let owner = owner_alias(ctx, column, base)?;
            window_expression(ctx, function, &owner, base)
        }
    }
}

/// Expression used when a selected column drives ORDER BY.
fn order_expression(ctx: &mut BuildContext<'_>, column: &Column) -> QueryResult<String> {
    match &column.kind {
        ColumnKind::Computed(_) => column_expression(ctx, column, 0),
        _ => column
            .name()
            .map(quote_ident)
            .ok_or(QueryError::MissingIdentifier),
    }
}

fn order_clause(ctx: &mut BuildContext<'_>, clause: &OrderByClause, base: usize) -> QueryResult<String> {
    let target = match &clause.target {
        OrderTarget::Text(text) => {
            let owner = ctx.alias_at(base)?;
            expand(ctx, text, &owner, base)?
        }
        OrderTarget::Position(position) => position.to_string(),
        OrderTarget::Expression(column) => column_expression(ctx, column, base)?,
    };
    Ok(format!("{} {}", target, clause.direction))
}

fn window_expression(
    ctx: &mut BuildContext<'_>,
    function: &WindowFunction,
    owner: &str,
    base: usize,
) -> QueryResult<String> {
    let arguments = expand(ctx, &function.arguments, owner, base)?;
    let mut over = vec![];

    if !function.partition_by.is_empty() {
        let mut columns = Vec::with_capacity(function.partition_by.len());
        for column in &function.partition_by {
            columns.push(column_expression(ctx, column, base)?);
        }
        over.push(format!("PARTITION BY {}", columns.join(", ")));
    }
    if !function.order_by.is_empty() {
        let mut terms = Vec::with_capacity(function.order_by.len());
        for clause in &function.order_by {
            terms.push(order_clause(ctx, clause, base)?);
        }
        over.push(format!("ORDER BY {}", terms.join(", ")));
    }

    Ok(format!(
        "{}({}) OVER ({})",
        function.function,
        arguments,
        over.join(" ")
    ))
}

/// Expand `{n}`: `{0}` is `owner`, `{n}` the alias `n` scopes beyond `base`.
fn expand(ctx: &BuildContext<'_>, template: &str, owner: &str, base: usize) -> QueryResult<String> {
    expand_scopes(template, |level| {
        let alias = if level == 0 {
            owner.to_string()
        } else {
            ctx.alias_at(base.saturating_add(level))?
        };
        Ok(alias.replace(']', "]]"))
    })
}

fn render_predicate(ctx: &mut BuildContext<'_>, predicate: &Predicate) -> QueryResult<String> {
    match predicate {
        Predicate::Text(text) => {
            let owner = ctx.alias_at(0)?;
            expand(ctx, text, &owner, 0)
        }
        Predicate::Pairs { own, outer } => {
            let own_columns = own.select(&ctx.column_scope(0)?);
            let outer_columns = outer.select(&ctx.column_scope(1)?);
            if own_columns.len() != outer_columns.len() {
                return Err(QueryError::ColumnCountMismatch {
                    left: own_columns.len(),
                    right: outer_columns.len(),
                });
            }

            let mut terms = Vec::with_capacity(own_columns.len());
            for (own, outer) in own_columns.iter().zip(&outer_columns) {
                terms.push(format!(
                    "{} = {}",
                    column_expression(ctx, own, 0)?,
                    column_expression(ctx, outer, 1)?
                ));
            }
            Ok(terms.join(" AND "))
        }
        Predicate::Compare {
            column,
            operator,
            value,
        } => {
            let expression = single_column(ctx, column)?;
            let auto = matches!(operator, SqlOperator::AutoEquals | SqlOperator::AutoDiffers);
            if value.is_null() && auto {
                Ok(format!("{} {} NULL", expression, operator.sql(true)))
            } else {
                let param = ctx.bind(value.clone());
                Ok(format!("{} {} {}", expression, operator.sql(false), param))
            }
        }
        Predicate::In {
            column,
            values,
            negated,
        } => {
            let expression = single_column(ctx, column)?;
            let keyword = if *negated { "NOT IN" } else { "IN" };
            if values.is_empty() {
                // NOT IN needs an empty set to hold for every row
                let empty = if *negated {
                    "(SELECT NULL WHERE 1 = 0)"
                } else {
                    "(SELECT NULL)"
                };
                return Ok(format!("{} {} {}", expression, keyword, empty));
            }
            let params: Vec<String> = values.iter().map(|value| ctx.bind(value.clone())).collect();
            Ok(format!("{} {} ({})", expression, keyword, params.join(", ")))
        }
        Predicate::Null { column, negated } => {
            let expression = single_column(ctx, column)?;
            Ok(format!(
                "{} IS {}NULL",
                expression,
                if *negated { "NOT " } else { "" }
            ))
        }
        Predicate::Custom(render) => render(&PredicateContext { ctx: &*ctx }),
        Predicate::All(predicates) => render_group(ctx, predicates, " AND "),
        Predicate::Any(predicates) => render_group(ctx, predicates, " OR "),
    }
}

fn render_group(
    ctx: &mut BuildContext<'_>,
    predicates: &[Predicate],
    separator: &str,
) -> QueryResult<String> {
    let mut terms = Vec::with_capacity(predicates.len());
    for predicate in predicates {
        let term = render_predicate(ctx, predicate)?;
        if !term.trim().is_empty() {
            terms.push(term);
        }
    }
    Ok(match terms.len() {
        0 => String::new(),
        1 => terms.remove(0),
        _ => format!("({})", terms.join(separator)),
    })
}

fn single_column(ctx: &mut BuildContext<'_>, selector: &Selector) -> QueryResult<String> {
    let columns = selector.select(&ctx.column_scope(0)?);
    match columns.as_slice() {
        [column] => column_expression(ctx, column, 0),
        other => Err(QueryError::ColumnCountMismatch {
            left: other.len(),
            right: 1,
        }),
    }
}
