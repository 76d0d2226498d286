//!
//! The query graph.
//!
//! Queries live in an arena owned by [QueryGraph] and refer to each other
//! through [QueryId]. A query can be the source of another query, a CTE
//! registered on it, a join source, a branch of a set operation or the body
//! of a subquery column, and the same query may be referenced from several
//! places at once.
//!

use std::collections::HashMap;
use std::fmt;

use crate::column::{Column, Qualifier};
use crate::filter::PageRange;
use crate::options::BuildOptions;
use crate::order::{ColumnOrder, Direction, OrderByClause};
use crate::predicate::{Predicate, PredicateContext, Selector, SqlOperator};
use crate::source::{Join, JoinKind, Source, Table};
use crate::statement::Statement;
use crate::table::{ForeignKey, TableDef};
use crate::value::SqlValue;
use crate::{engine, QueryError, QueryResult};

/// Handle to a query inside a [QueryGraph].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryId(pub(crate) usize);

impl QueryId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    UnionAll,
    Except,
    Intersect,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SetOperator::Union => "UNION",
            SetOperator::UnionAll => "UNION ALL",
            SetOperator::Except => "EXCEPT",
            SetOperator::Intersect => "INTERSECT",
        })
    }
}

/// Which part of a query a column comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnSlot {
    Own,
    Join(usize),
}

#[derive(Clone, Debug, Default)]
pub(crate) struct QueryNode {
    pub alias: Option<String>,
    pub source: Option<Source>,
    pub joins: Vec<Join>,
    pub columns: Vec<Column>,
    pub predicates: Vec<Predicate>,
    pub order_by: Vec<OrderByClause>,
    pub set_operations: Vec<(SetOperator, QueryId)>,
    pub skip: Option<u64>,
    pub length: Option<u64>,
    pub ctes: Vec<QueryId>,
    pub pre_query_options: Vec<String>,
    pub query_options: Option<String>,
}

impl QueryNode {
    /// Own columns followed by every join's columns.
    pub fn scoped_columns(&self) -> Vec<(ColumnSlot, &Column)> {
        self.columns
            .iter()
            .map(|column| (ColumnSlot::Own, column))
            .chain(self.joins.iter().enumerate().flat_map(|(index, join)| {
                join.columns
                    .iter()
                    .map(move |column| (ColumnSlot::Join(index), column))
            }))
            .collect()
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty() || self.joins.iter().any(|join| !join.columns.is_empty())
    }
}

///
/// Arena of queries.
///
/// ```
/// use tsql_query::prelude::*;
///
/// let mut graph = QueryGraph::new();
/// let adults = graph
///     .from("Person")
///     .select(["Name"])
///     .filter("Age > 18")
///     .top(10)
///     .id();
///
/// let sql = graph.build(adults, &BuildOptions::default()).unwrap();
/// assert!(sql.sql().starts_with("SELECT TOP(10)"));
/// ```
///
#[derive(Clone, Debug, Default)]
pub struct QueryGraph {
    nodes: Vec<QueryNode>,
}

impl QueryGraph {
    pub fn new() -> Self {
        Self { nodes: vec![] }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Start a new, empty query.
    pub fn query(&mut self) -> QueryMut<'_> {
        let id = self.push(QueryNode::default());
        QueryMut { graph: self, id }
    }

    pub fn from(&mut self, source: impl Into<Source>) -> QueryMut<'_> {
        self.query().from(source)
    }

    pub fn select<I, C>(&mut self, columns: I) -> QueryMut<'_>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.query().select(columns)
    }

    pub fn select_all(&mut self) -> QueryMut<'_> {
        self.query().select_all()
    }

    /// Start a query that carries the given CTEs.
    pub fn with<I>(&mut self, ctes: I) -> QueryMut<'_>
    where
        I: IntoIterator<Item = QueryId>,
    {
        self.query().with(ctes)
    }

    /// Every column of a table known at compile time.
    pub fn select_table<T: TableDef>(&mut self) -> QueryMut<'_> {
        self.from(T::table()).select(T::columns())
    }

    /// Continue building an existing query.
    pub fn edit(&mut self, id: QueryId) -> QueryResult<QueryMut<'_>> {
        self.node(id)?;
        Ok(QueryMut { graph: self, id })
    }

    pub fn build(&self, id: QueryId, options: &BuildOptions) -> QueryResult<Statement> {
        engine::build(self, id, options)
    }

    /// The alias a query is known by: its own alias, else the alias of its
    /// source, else a generated `Query_<index>`.
    pub fn alias(&self, id: QueryId) -> QueryResult<String> {
        self.alias_with(id, &HashMap::new())
    }

    pub fn has_explicit_alias(&self, id: QueryId) -> QueryResult<bool> {
        let node = self.node(id)?;
        Ok(node.alias.is_some()
            || match &node.source {
                Some(Source::Table(table)) => table.has_explicit_alias(),
                Some(Source::Query(source)) if *source != id => self.has_explicit_alias(*source)?,
                _ => false,
            })
    }

    ///
    /// Find a column of `id` by display name.
    ///
    /// Own columns are returned as they are, join columns pinned to their
    /// join source. A column of a source query is found by following the
    /// source chain and comes back as a reference by name to that source,
    /// keeping its aggregate flag. Anything else becomes a plain reference
    /// resolved against the query's source alias.
    ///
    pub fn column(&self, id: QueryId, name: &str) -> QueryResult<Column> {
        Ok(self
            .find_column(id, name, 0)?
            .unwrap_or_else(|| Column::new(name)))
    }

    fn find_column(&self, id: QueryId, name: &str, depth: usize) -> QueryResult<Option<Column>> {
        let node = self.node(id)?;
        if let Some(column) = node.columns.iter().find(|column| column.name() == Some(name)) {
            return Ok(Some(column.clone()));
        }
        for join in &node.joins {
            if let Some(column) = join.columns.iter().find(|column| column.name() == Some(name)) {
                return Ok(Some(column.clone().qualified(join.source.qualifier())));
            }
        }

        match &node.source {
            // Bounded so that a source cycle ends the search.
            Some(Source::Query(source)) if *source != id && depth < self.nodes.len() => {
                let found = self.find_column(*source, name, depth + 1)?;
                Ok(found.map(|column| {
                    let exposed = Column::new(name).qualified(Qualifier::Query(*source));
                    if column.is_aggregate() {
                        exposed.aggregated()
                    } else {
                        exposed
                    }
                }))
            }
            _ => Ok(None),
        }
    }

    /// Every selected column of `id` with the alias of the scope it
    /// resolves against.
    pub fn columns(&self, id: QueryId) -> QueryResult<Vec<(String, Column)>> {
        let node = self.node(id)?;
        let mut columns = vec![];
        for (slot, column) in node.scoped_columns() {
            columns.push((self.slot_alias(id, slot)?, column.clone()));
        }
        Ok(columns)
    }

    pub(crate) fn node(&self, id: QueryId) -> QueryResult<&QueryNode> {
        self.nodes.get(id.0).ok_or(QueryError::UnknownQuery(id.0))
    }

    pub(crate) fn push(&mut self, node: QueryNode) -> QueryId {
        let id = QueryId(self.nodes.len());
        self.nodes.push(node);
        tracing::trace!(query = id.0, "new query");
        id
    }

    fn slot_alias(&self, id: QueryId, slot: ColumnSlot) -> QueryResult<String> {
        let node = self.node(id)?;
        match slot {
            ColumnSlot::Own => self.source_alias_with(id, &HashMap::new()),
            ColumnSlot::Join(index) => match node.joins.get(index).map(|join| &join.source) {
                Some(Source::Table(table)) => Ok(table.alias_name().to_string()),
                Some(Source::Query(query)) => self.alias(*query),
                None => self.alias(id),
            },
        }
    }

    pub(crate) fn alias_with(
        &self,
        id: QueryId,
        renames: &HashMap<QueryId, String>,
    ) -> QueryResult<String> {
        let mut current = id;
        // Bounded so that a source cycle falls back instead of looping.
        for _ in 0..=self.nodes.len() {
            if let Some(renamed) = renames.get(&current) {
                return Ok(renamed.clone());
            }
            let node = self.node(current)?;
            if let Some(alias) = &node.alias {
                return Ok(alias.clone());
            }
            match &node.source {
                Some(Source::Table(table)) => return Ok(table.alias_name().to_string()),
                Some(Source::Query(next)) => current = *next,
                None => break,
            }
        }
        Ok(format!("Query_{}", current.0))
    }

    /// Alias that the body of `id` resolves its own columns against.
    pub(crate) fn source_alias_with(
        &self,
        id: QueryId,
        renames: &HashMap<QueryId, String>,
    ) -> QueryResult<String> {
        match &self.node(id)?.source {
            Some(Source::Table(table)) => Ok(table.alias_name().to_string()),
            Some(Source::Query(source)) => self.alias_with(*source, renames),
            None => self.alias_with(id, renames),
        }
    }
}

/// Columns that belong in GROUP BY: every groupable column, provided at
/// least one aggregate is selected.
pub fn derive_group_by<'c, S: Copy>(columns: &[(S, &'c Column)]) -> Vec<(S, &'c Column)> {
    if !columns.iter().any(|(_, column)| column.is_aggregate()) {
        return vec![];
    }
    columns
        .iter()
        .filter(|(_, column)| column.is_groupable())
        .copied()
        .collect()
}

///
/// Fluent editor for one query of a [QueryGraph].
///
/// Obtained from [QueryGraph::query], [QueryGraph::from] and friends, or
/// [QueryGraph::edit]. Call [QueryMut::id] to get the handle back.
///
pub struct QueryMut<'g> {
    pub(crate) graph: &'g mut QueryGraph,
    pub(crate) id: QueryId,
}

impl<'g> QueryMut<'g> {
    pub fn id(&self) -> QueryId {
        self.id
    }

    pub fn graph(&self) -> &QueryGraph {
        self.graph
    }

    pub(crate) fn node(&self) -> &QueryNode {
        &self.graph.nodes[self.id.0]
    }

    pub(crate) fn node_mut(&mut self) -> &mut QueryNode {
        &mut self.graph.nodes[self.id.0]
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.node_mut().alias = Some(alias.into());
        self
    }

    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.node_mut()
            .columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn select_if<I, C>(self, condition: bool, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        if condition {
            self.select(columns)
        } else {
            self
        }
    }

    /// `SELECT *`
    pub fn select_all(self) -> Self {
        self.select(vec![Column::all()])
    }

    /// `SELECT [source].*`
    pub fn select_all_of_source(self) -> Self {
        self.select(vec![Column::all_of_scope()])
    }

    /// Replace the own columns. Fails when the query is left without any
    /// column at all.
    pub fn clean_select<I, C>(mut self, columns: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        let columns: Vec<Column> = columns.into_iter().map(Into::into).collect();
        self.node_mut().columns = columns;
        self.ensure_columns()?;
        Ok(self)
    }

    /// Keep only the own columns matching `keep`.
    pub fn retain_columns<F>(mut self, keep: F) -> QueryResult<Self>
    where
        F: FnMut(&Column) -> bool,
    {
        self.node_mut().columns.retain(keep);
        self.ensure_columns()?;
        Ok(self)
    }

    pub(crate) fn ensure_columns(&self) -> QueryResult<()> {
        if self.node().has_columns() {
            Ok(())
        } else {
            Err(QueryError::NoColumns {
                alias: self.graph.alias(self.id)?,
            })
        }
    }

    pub fn from(mut self, source: impl Into<Source>) -> Self {
        let source = source.into();
        if source == Source::Query(self.id) {
            tracing::warn!(query = self.id.0, "ignoring a query used as its own source");
            return self;
        }
        self.node_mut().source = Some(source);
        self
    }

    /// Read from an indexed view with `WITH (NOEXPAND)`.
    pub fn from_indexed_view(self, view: impl Into<Table>) -> Self {
        self.from(view.into().no_expand())
    }

    pub fn join(mut self, join: Join) -> Self {
        self.node_mut().joins.push(join);
        self
    }

    /// Join on a fixed condition.
    pub fn join_on<I, C>(
        self,
        kind: JoinKind,
        source: impl Into<Source>,
        on: impl Into<Predicate>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.join(Join::new(kind, source).on(on).select(columns))
    }

    /// Join on equally named columns of both sides.
    pub fn join_using<I, C>(
        self,
        kind: JoinKind,
        source: impl Into<Source>,
        names: impl Into<Selector>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        let names = names.into();
        self.join(
            Join::new(kind, source)
                .on(Predicate::pairs(names.clone(), names))
                .select(columns),
        )
    }

    /// Join on `own[i] = outer[i]`, `own` taken from the joined source and
    /// `outer` from this query.
    pub fn join_columns<I, C>(
        self,
        kind: JoinKind,
        source: impl Into<Source>,
        own: impl Into<Selector>,
        outer: impl Into<Selector>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.join(
            Join::new(kind, source)
                .on(Predicate::pairs(own, outer))
                .select(columns),
        )
    }

    pub fn join_foreign<I, C>(self, kind: JoinKind, foreign: ForeignKey, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.join(
            Join::new(kind, foreign.table().clone())
                .on(foreign.predicate())
                .select(columns),
        )
    }

    pub fn cross_join<I, C>(self, source: impl Into<Source>, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.join(Join::new(JoinKind::Cross, source).select(columns))
    }

    /// Add a WHERE condition; conditions are joined by AND.
    pub fn filter(mut self, predicate: impl Into<Predicate>) -> Self {
        self.node_mut().predicates.push(predicate.into());
        self
    }

    pub fn filter_if(self, condition: bool, predicate: impl Into<Predicate>) -> Self {
        if condition {
            self.filter(predicate)
        } else {
            self
        }
    }

    pub fn filter_value(
        self,
        column: impl Into<Selector>,
        operator: SqlOperator,
        value: impl Into<SqlValue>,
    ) -> Self {
        self.filter(Predicate::compare(column, operator, value))
    }

    pub fn filter_value_if(
        self,
        condition: bool,
        column: impl Into<Selector>,
        operator: SqlOperator,
        value: impl Into<SqlValue>,
    ) -> Self {
        if condition {
            self.filter_value(column, operator, value)
        } else {
            self
        }
    }

    pub fn filter_in<I, V>(self, column: impl Into<Selector>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.filter(Predicate::in_list(column, values))
    }

    pub fn filter_not_in<I, V>(self, column: impl Into<Selector>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.filter(Predicate::not_in(column, values))
    }

    pub fn filter_null(self, column: impl Into<Selector>) -> Self {
        self.filter(Predicate::is_null(column))
    }

    pub fn filter_not_null(self, column: impl Into<Selector>) -> Self {
        self.filter(Predicate::not_null(column))
    }

    /// Correlate with the enclosing scope: `own[i] = outer[i]`.
    pub fn filter_columns(self, own: impl Into<Selector>, outer: impl Into<Selector>) -> Self {
        self.filter(Predicate::pairs(own, outer))
    }

    pub fn filter_with<F>(self, render: F) -> Self
    where
        F: Fn(&PredicateContext<'_, '_>) -> QueryResult<String> + Send + Sync + 'static,
    {
        self.filter(Predicate::custom(render))
    }

    /// Order ascending by the named columns, replacing any previous order.
    pub fn order_by(self, names: &[&str]) -> QueryResult<Self> {
        self.order_by_direction(Direction::Asc, names)
    }

    pub fn order_by_desc(self, names: &[&str]) -> QueryResult<Self> {
        self.order_by_direction(Direction::Desc, names)
    }

    ///
    /// Order by the named columns, replacing any previous order.
    ///
    /// Each name must match exactly one selected column, own or joined;
    /// the position in `names` becomes the column's order index.
    ///
    pub fn order_by_direction(self, direction: Direction, names: &[&str]) -> QueryResult<Self> {
        let mut this = self.clear_order();
        for (index, name) in names.iter().enumerate() {
            let name: &str = name;
            let matches: Vec<(ColumnSlot, usize)> = {
                let node = this.node();
                let own = node
                    .columns
                    .iter()
                    .enumerate()
                    .filter(move |(_, column)| column.name() == Some(name))
                    .map(|(position, _)| (ColumnSlot::Own, position));
                let joined = node.joins.iter().enumerate().flat_map(move |(join, j)| {
                    j.columns
                        .iter()
                        .enumerate()
                        .filter(move |(_, column)| column.name() == Some(name))
                        .map(move |(position, _)| (ColumnSlot::Join(join), position))
                });
                own.chain(joined).collect()
            };

            match matches.as_slice() {
                [] => {
                    return Err(QueryError::ColumnNotFound {
                        name: name.to_string(),
                    })
                }
                [(slot, position)] => {
                    let column = match slot {
                        ColumnSlot::Own => &mut this.node_mut().columns[*position],
                        ColumnSlot::Join(join) => {
                            &mut this.node_mut().joins[*join].columns[*position]
                        }
                    };
                    column.set_order(Some(ColumnOrder { index, direction }));
                }
                candidates => {
                    let candidates = candidates
                        .iter()
                        .map(|(slot, _)| {
                            let alias = this.graph.slot_alias(this.id, *slot).unwrap_or_default();
                            format!("[{}].[{}]", alias, name)
                        })
                        .collect();
                    return Err(QueryError::AmbiguousColumn {
                        name: name.to_string(),
                        candidates,
                    });
                }
            }
        }
        Ok(this)
    }

    /// Order by explicit clauses, replacing any previous order.
    pub fn order_by_clauses<I, O>(self, clauses: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderByClause>,
    {
        self.clear_order().add_order_by_clauses(clauses)
    }

    /// Add explicit ORDER BY clauses ahead of the column orders already set.
    pub fn add_order_by_clauses<I, O>(mut self, clauses: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OrderByClause>,
    {
        self.node_mut()
            .order_by
            .extend(clauses.into_iter().map(Into::into));
        self
    }

    /// Drop explicit clauses and every column order.
    pub fn clear_order(mut self) -> Self {
        let node = self.node_mut();
        node.order_by.clear();
        for column in node.columns.iter_mut() {
            column.set_order(None);
        }
        for join in node.joins.iter_mut() {
            for column in join.columns.iter_mut() {
                column.set_order(None);
            }
        }
        self
    }

    pub fn top(mut self, length: u64) -> Self {
        self.node_mut().length = Some(length);
        self
    }

    pub fn offset(mut self, skip: u64) -> Self {
        self.node_mut().skip = Some(skip);
        self
    }

    pub fn range(mut self, range: impl PageRange) -> Self {
        let (skip, length) = range.page();
        let node = self.node_mut();
        node.skip = skip;
        node.length = length;
        self
    }

    /// Register queries to be emitted as CTEs.
    pub fn with<I>(mut self, ctes: I) -> Self
    where
        I: IntoIterator<Item = QueryId>,
    {
        let id = self.id;
        self.node_mut()
            .ctes
            .extend(ctes.into_iter().filter(|cte| *cte != id));
        self
    }

    pub fn set_operation(mut self, operator: SetOperator, other: QueryId) -> Self {
        self.node_mut().set_operations.push((operator, other));
        self
    }

    pub fn union(self, other: QueryId) -> Self {
        self.set_operation(SetOperator::Union, other)
    }

    pub fn union_all(self, other: QueryId) -> Self {
        self.set_operation(SetOperator::UnionAll, other)
    }

    pub fn except(self, other: QueryId) -> Self {
        self.set_operation(SetOperator::Except, other)
    }

    pub fn intersect(self, other: QueryId) -> Self {
        self.set_operation(SetOperator::Intersect, other)
    }

    /// A statement emitted before the query, such as `SET NOCOUNT ON;`.
    /// Collected from every query in the graph and emitted once.
    pub fn pre_query_option(mut self, option: impl Into<String>) -> Self {
        self.node_mut().pre_query_options.push(option.into());
        self
    }

    /// Text appended after the query, such as `OPTION (RECOMPILE)`.
    pub fn query_options(mut self, options: impl Into<String>) -> Self {
        self.node_mut().query_options = Some(options.into());
        self
    }

    pub fn column(&self, name: &str) -> Column {
        self.graph
            .column(self.id, name)
            .unwrap_or_else(|_| Column::new(name))
    }

    pub fn columns(&self) -> QueryResult<Vec<(String, Column)>> {
        self.graph.columns(self.id)
    }

    pub fn build(&self, options: &BuildOptions) -> QueryResult<Statement> {
        self.graph.build(self.id, options)
    }
}

impl<'g> fmt::Debug for QueryMut<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryMut").field("id", &self.id).finish()
    }
}
