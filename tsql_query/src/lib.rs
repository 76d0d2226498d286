//!
//! `tsql_query` builds SQL Server `SELECT` statements out of a graph of
//! composable queries.
//!
//! A query can read from a table or from another query, join more sources,
//! expose other queries as columns and be combined through set operations.
//! The renderer walks that graph once per [QueryGraph::build] call:
//!
//! ```text
//!        ;WITH [B] AS (...)      <- every query used as a FROM source,
//!        , [C] AS (...)             dependencies first
//!   A    SELECT
//!  / \      [B].[x]
//! B   C    ,(SELECT ... ) AS [y] <- subquery columns render in place,
//!      \   FROM [B]                 one indentation level deeper
//!       D    LEFT JOIN [C] ...
//! ```
//!
//! Every query rendered inside another one opens a scope. Expressions may
//! refer to the alias of the current scope as `{0}` and to enclosing scopes
//! as `{1}`, `{2}` and so on, which is how correlated subqueries are
//! written without knowing the final aliases up front.
//!
//! Filter values are never inlined. They are collected as parameters
//! `@p1..@pn` into the [Statement] that `build` returns.
//!

pub use tsql_query_macros::*;

pub mod column;
pub mod database;
pub mod filter;
pub mod func;
pub mod logic;
pub mod options;
pub mod order;
pub mod predicate;
pub mod prelude;
pub mod query;
pub mod source;
pub mod statement;
pub mod table;
pub mod value;
pub mod window;

mod build;
mod builder;
mod cte;
mod engine;
mod wrap;

pub use builder::INDENT_PLACEHOLDER;

#[derive(thiserror::Error, Debug)]
pub enum QueryError {
    #[error("Query `{alias}` has no columns")]
    NoColumns { alias: String },

    #[error("Column `{name}` not found")]
    ColumnNotFound { name: String },

    #[error("Column `{name}` is ambiguous: {}", .candidates.join(", "))]
    AmbiguousColumn {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Column count mismatch: {left} against {right}")]
    ColumnCountMismatch { left: usize, right: usize },

    #[error("Column has neither a name nor an alias")]
    MissingIdentifier,

    #[error("Scope level {level} is out of range, depth is {depth}")]
    ScopeOutOfRange { level: usize, depth: usize },

    #[error("Unknown query #{0}")]
    UnknownQuery(usize),

    #[error("Query `{alias}` does not read from a table")]
    NotATable { alias: String },

    #[error("No columns found in the catalog for `{table}`")]
    NoCatalogColumns { table: String },

    #[error("Unsupported value in column `{column}`")]
    UnsupportedValue { column: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "mssql")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type QueryResult<T> = Result<T, QueryError>;
