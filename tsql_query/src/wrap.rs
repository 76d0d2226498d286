//!
//! Wrapping a query into something larger: an outer query reading from it,
//! or a column of another query.
//!

use crate::column::{Column, ColumnKind, ColumnOptions};
use crate::func;
use crate::order::{derive_order_by, OrderByClause, OrderItem};
use crate::query::{ColumnSlot, QueryMut, QueryNode};
use crate::source::Source;
use crate::{QueryError, QueryResult};

impl<'g> QueryMut<'g> {
    ///
    /// Wrap this query as the source of a new outer query.
    ///
    /// The outer query selects every column of this one by its display
    /// name and carries the column orders along. The editor returned points
    /// at the new outer query.
    ///
    /// ```
    /// use tsql_query::prelude::*;
    ///
    /// let mut graph = QueryGraph::new();
    /// let outer = graph
    ///     .from("Person")
    ///     .select(["Name"])
    ///     .as_subquery(Some("People"))
    ///     .unwrap()
    ///     .id();
    ///
    /// assert_eq!(graph.alias(outer).unwrap(), "People");
    /// ```
    ///
    pub fn as_subquery(self, alias: Option<&str>) -> QueryResult<QueryMut<'g>> {
        self.as_subquery_with(alias, |_, _| true, |column| column)
    }

    /// Like [QueryMut::as_subquery], re-projecting during the wrap: `keep`
    /// filters the exposed columns by name, `project` rewrites each outer
    /// column.
    pub fn as_subquery_with<K, P>(
        self,
        alias: Option<&str>,
        mut keep: K,
        mut project: P,
    ) -> QueryResult<QueryMut<'g>>
    where
        K: FnMut(&str, &Column) -> bool,
        P: FnMut(Column) -> Column,
    {
        self.ensure_columns()?;

        let mut exposed = vec![];
        for (_, column) in self.node().scoped_columns() {
            let outer = match column.kind() {
                ColumnKind::Wildcard { .. } => Column::all(),
                _ => {
                    let name = column.name().ok_or(QueryError::MissingIdentifier)?;
                    if !keep(name, column) {
                        continue;
                    }
                    let mut outer = Column::new(name);
                    outer.set_order(column.order());
                    outer
                }
            };
            exposed.push(project(outer));
        }

        if exposed.is_empty() {
            return Err(QueryError::NoColumns {
                alias: self.graph.alias(self.id)?,
            });
        }

        let QueryMut { graph, id: inner } = self;
        let id = graph.push(QueryNode {
            alias: alias.map(str::to_string),
            source: Some(Source::Query(inner)),
            columns: exposed,
            ..QueryNode::default()
        });
        tracing::trace!(inner = inner.index(), outer = id.index(), "wrapped as subquery");
        Ok(QueryMut { graph, id })
    }

    /// This query as a subquery column of another query.
    pub fn as_column(&self, alias: &str) -> Column {
        self.as_column_with(alias, ColumnOptions::new())
    }

    /// This query as a subquery column with its own order, page and
    /// FOR JSON shape.
    pub fn as_column_with(&self, alias: &str, options: ColumnOptions) -> Column {
        Column::subquery(self.id, alias, options)
    }

    /// A `Count(*)` over this query, as a column.
    pub fn as_column_count(self, alias: &str) -> QueryResult<Column> {
        let counted = self.as_subquery(None)?.clean_select(vec![func::count()])?;
        Ok(Column::subquery(counted.id, alias, ColumnOptions::new()))
    }

    ///
    /// A scalar column holding `value` from the first row of this query.
    ///
    /// The query is copied with `value` as its only column and a length of
    /// one. Column orders turn into ORDER BY terms on the copy so the
    /// first row stays the same.
    ///
    pub fn as_value_column(mut self, value: impl Into<Column>, alias: &str) -> QueryResult<Column> {
        let mut node = self.node().clone();

        let mut clauses = vec![];
        for item in derive_order_by(&node.scoped_columns(), &node.order_by) {
            clauses.push(match item {
                OrderItem::Explicit(clause) => clause.clone(),
                OrderItem::Column {
                    scope,
                    column,
                    direction,
                } => {
                    let mut column = column.clone();
                    column.set_order(None);
                    if let ColumnSlot::Join(index) = scope {
                        if let Some(join) = node.joins.get(index) {
                            column = column.qualified(join.source.qualifier());
                        }
                    }
                    OrderByClause::expression(column, direction)
                }
            });
        }

        node.order_by = clauses;
        node.columns = vec![value.into()];
        for join in node.joins.iter_mut() {
            join.columns.clear();
        }
        node.skip = None;
        node.length = Some(1);

        let id = self.graph.push(node);
        Ok(Column::subquery(id, alias, ColumnOptions::new()))
    }
}
