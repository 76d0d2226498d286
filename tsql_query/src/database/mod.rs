//!
//! The execution boundary: sending a built [Statement] to a database and
//! reading back a table of JSON values.
//!

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::options::BuildOptions;
use crate::order::OrderByClause;
use crate::predicate::SqlOperator;
use crate::query::{QueryGraph, QueryId, QueryMut};
use crate::source::{Source, Table};
use crate::statement::Statement;
use crate::{QueryError, QueryResult};

#[cfg(feature = "mssql")]
pub mod mssql;

/// Something that runs statements. Cancel by dropping the future.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, statement: &Statement) -> QueryResult<SqlResult>;
}

/// Rows returned by an [Executor], one JSON value per cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SqlResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SqlResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn has_data(&self) -> bool {
        !self.rows.is_empty()
    }

    /// Every value of column `index`, row by row.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Rows keyed by column name.
    pub fn as_maps(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    ///
    /// Parse the output of a `FOR JSON` query.
    ///
    /// SQL Server splits long JSON text over several single-column rows;
    /// they are joined before parsing. No rows at all gives `null`.
    ///
    pub fn json(&self) -> QueryResult<Value> {
        let text: String = self.column(0).filter_map(Value::as_str).collect();
        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

impl QueryGraph {
    /// Build `id` and run it.
    pub async fn run<E>(&self, id: QueryId, executor: &E, options: &BuildOptions) -> QueryResult<SqlResult>
    where
        E: Executor + ?Sized,
    {
        let statement = self.build(id, options)?;
        tracing::debug!(
            query = id.index(),
            len = statement.sql().len(),
            params = statement.params().len(),
            "executing"
        );
        let result = executor.execute(&statement).await?;
        tracing::debug!(query = id.index(), rows = result.rows.len(), "executed");
        Ok(result)
    }
}

impl<'g> QueryMut<'g> {
    pub async fn run<E>(&self, executor: &E, options: &BuildOptions) -> QueryResult<SqlResult>
    where
        E: Executor + ?Sized,
    {
        self.graph.run(self.id, executor, options).await
    }

    ///
    /// Replace the SELECT list with the columns the catalog knows for the
    /// physical table this query reads from, in ordinal order.
    ///
    pub async fn check_columns<E>(self, executor: &E) -> QueryResult<QueryMut<'g>>
    where
        E: Executor + ?Sized,
    {
        let table = match &self.node().source {
            Some(Source::Table(table)) => table.clone(),
            _ => {
                return Err(QueryError::NotATable {
                    alias: self.graph.alias(self.id)?,
                })
            }
        };

        let mut catalog = QueryGraph::new();
        let lookup = catalog
            .from(Table::with_schema("INFORMATION_SCHEMA", "COLUMNS").alias("C"))
            .select(["COLUMN_NAME"])
            .filter_value("TABLE_NAME", SqlOperator::Equals, table.name());
        let lookup = match table.schema() {
            Some(schema) => lookup.filter_value("TABLE_SCHEMA", SqlOperator::Equals, schema),
            None => lookup.filter("[{0}].[TABLE_SCHEMA] = SCHEMA_NAME()"),
        };
        let lookup = lookup
            .order_by_clauses(vec![OrderByClause::asc("[{0}].[ORDINAL_POSITION]")])
            .id();

        let result = catalog.run(lookup, executor, &BuildOptions::default()).await?;
        let names: Vec<String> = result
            .column(0)
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            return Err(QueryError::NoCatalogColumns {
                table: table.to_string(),
            });
        }

        tracing::debug!(table = %table, columns = names.len(), "checked columns");
        self.clean_select(names)
    }
}
