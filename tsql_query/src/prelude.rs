pub use crate::column::{Column, ColumnKind, ColumnOptions};
pub use crate::database::{Executor, SqlResult};
pub use crate::filter::PageRange;
pub use crate::func;
pub use crate::logic::{and, or};
pub use crate::options::{BuildOptions, ForJson, JsonMode};
pub use crate::order::{ColumnOrder, Direction, OrderByClause};
pub use crate::predicate::{Predicate, PredicateContext, Selector, SqlOperator};
pub use crate::query::{QueryGraph, QueryId, QueryMut, SetOperator};
pub use crate::source::{Join, JoinKind, Source, Table};
pub use crate::statement::Statement;
pub use crate::table::{ForeignKey, TableDef};
pub use crate::value::SqlValue;
pub use crate::window::WindowFunction;
pub use crate::{QueryError, QueryResult};

#[cfg(feature = "mssql")]
pub use crate::database::mssql::MssqlExecutor;
