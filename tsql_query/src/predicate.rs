use std::fmt;
use std::sync::Arc;

use crate::build::{BuildContext, ScopeSource};
use crate::column::Column;
use crate::query::{QueryGraph, QueryId};
use crate::value::SqlValue;
use crate::QueryResult;

///
/// Comparison operators for value filters.
///
/// The `Auto` operators adapt to the value: a NULL compares with
/// `IS`/`IS NOT`, everything else with `=`/`!=`.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SqlOperator {
    AutoEquals,
    AutoDiffers,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    NotLessThan,
    NotGreaterThan,
    Like,
    NotLike,
}

impl SqlOperator {
    pub(crate) fn sql(&self, null: bool) -> &'static str {
        match (self, null) {
            (SqlOperator::AutoEquals, true) => "IS",
            (SqlOperator::AutoEquals, false) => "=",
            (SqlOperator::AutoDiffers, true) => "IS NOT",
            (SqlOperator::AutoDiffers, false) => "!=",
            (SqlOperator::Equals, _) => "=",
            (SqlOperator::NotEquals, _) => "<>",
            (SqlOperator::GreaterThan, _) => ">",
            (SqlOperator::GreaterOrEqual, _) => ">=",
            (SqlOperator::LessThan, _) => "<",
            (SqlOperator::LessOrEqual, _) => "<=",
            (SqlOperator::NotLessThan, _) => "!<",
            (SqlOperator::NotGreaterThan, _) => "!>",
            (SqlOperator::Like, _) => "LIKE",
            (SqlOperator::NotLike, _) => "NOT LIKE",
        }
    }
}

/// Columns of one scope, as seen while a predicate is rendered.
pub struct ColumnScope<'a> {
    pub(crate) graph: &'a QueryGraph,
    pub(crate) source: &'a ScopeSource,
}

impl<'a> ColumnScope<'a> {
    /// Look a column up by name. Inside a query's own scope this finds
    /// the query's columns (including those contributed by joins); other
    /// scopes yield a plain reference resolved against the scope alias.
    pub fn column(&self, name: &str) -> Column {
        match self.source {
            ScopeSource::Query(id) => self
                .graph
                .column(*id, name)
                .unwrap_or_else(|_| Column::new(name)),
            ScopeSource::Derived(_) | ScopeSource::Table(_) => Column::new(name),
        }
    }

    pub fn columns(&self, names: &[&str]) -> Vec<Column> {
        names.iter().map(|name| self.column(name)).collect()
    }

    /// The query behind this scope, if any.
    pub fn query(&self) -> Option<QueryId> {
        match self.source {
            ScopeSource::Query(id) | ScopeSource::Derived(id) => Some(*id),
            ScopeSource::Table(_) => None,
        }
    }
}

type SelectFn = dyn Fn(&ColumnScope<'_>) -> Vec<Column> + Send + Sync;

/// Picks columns out of a scope when the predicate is rendered.
#[derive(Clone)]
pub struct Selector(Arc<SelectFn>);

impl Selector {
    pub fn new<F>(select: F) -> Self
    where
        F: Fn(&ColumnScope<'_>) -> Vec<Column> + Send + Sync + 'static,
    {
        Self(Arc::new(select))
    }

    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        Self::new(move |scope| names.iter().map(|name| scope.column(name)).collect())
    }

    /// Fixed columns, independent of the scope.
    pub fn columns(columns: Vec<Column>) -> Self {
        Self::new(move |_| columns.clone())
    }

    pub(crate) fn select(&self, scope: &ColumnScope<'_>) -> Vec<Column> {
        (self.0)(scope)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Selector")
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::names(vec![name])
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::names(vec![name])
    }
}

impl From<Vec<&str>> for Selector {
    fn from(names: Vec<&str>) -> Self {
        Selector::names(names)
    }
}

impl From<Column> for Selector {
    fn from(column: Column) -> Self {
        Selector::columns(vec![column])
    }
}

impl From<Vec<Column>> for Selector {
    fn from(columns: Vec<Column>) -> Self {
        Selector::columns(columns)
    }
}

/// Read-only view of the scope stack handed to custom predicates.
pub struct PredicateContext<'a, 'g> {
    pub(crate) ctx: &'a BuildContext<'g>,
}

impl<'a, 'g> PredicateContext<'a, 'g> {
    /// Alias of the scope `level` steps out from the current one.
    pub fn alias(&self, level: usize) -> QueryResult<String> {
        self.ctx.alias_at(level)
    }

    pub fn depth(&self) -> usize {
        self.ctx.depth()
    }
}

type CustomFn = dyn Fn(&PredicateContext<'_, '_>) -> QueryResult<String> + Send + Sync;

///
/// A WHERE or ON condition, evaluated against the scope stack at render time.
///
#[derive(Clone)]
pub enum Predicate {
    /// Verbatim text, may use `{n}` scope placeholders.
    Text(String),
    /// `own[i] = outer[i]` for every pair, joined by AND. `own` is taken
    /// from the current scope, `outer` from the enclosing one.
    Pairs { own: Selector, outer: Selector },
    Compare {
        column: Selector,
        operator: SqlOperator,
        value: SqlValue,
    },
    In {
        column: Selector,
        values: Vec<SqlValue>,
        negated: bool,
    },
    Null { column: Selector, negated: bool },
    Custom(Arc<CustomFn>),
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn text(text: impl Into<String>) -> Self {
        Predicate::Text(text.into())
    }

    pub fn pairs(own: impl Into<Selector>, outer: impl Into<Selector>) -> Self {
        Predicate::Pairs {
            own: own.into(),
            outer: outer.into(),
        }
    }

    pub fn compare(
        column: impl Into<Selector>,
        operator: SqlOperator,
        value: impl Into<SqlValue>,
    ) -> Self {
        Predicate::Compare {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn in_list<I, V>(column: impl Into<Selector>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<I, V>(column: impl Into<Selector>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Predicate::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(column: impl Into<Selector>) -> Self {
        Predicate::Null {
            column: column.into(),
            negated: false,
        }
    }

    pub fn not_null(column: impl Into<Selector>) -> Self {
        Predicate::Null {
            column: column.into(),
            negated: true,
        }
    }

    pub fn custom<F>(render: F) -> Self
    where
        F: Fn(&PredicateContext<'_, '_>) -> QueryResult<String> + Send + Sync + 'static,
    {
        Predicate::Custom(Arc::new(render))
    }
}

impl From<&str> for Predicate {
    fn from(text: &str) -> Self {
        Predicate::text(text)
    }
}

impl From<String> for Predicate {
    fn from(text: String) -> Self {
        Predicate::Text(text)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Predicate::Pairs { .. } => f.write_str("Pairs"),
            Predicate::Compare {
                operator, value, ..
            } => f
                .debug_struct("Compare")
                .field("operator", operator)
                .field("value", value)
                .finish(),
            Predicate::In {
                values, negated, ..
            } => f
                .debug_struct("In")
                .field("values", values)
                .field("negated", negated)
                .finish(),
            Predicate::Null { negated, .. } => {
                f.debug_struct("Null").field("negated", negated).finish()
            }
            Predicate::Custom(_) => f.write_str("Custom"),
            Predicate::All(all) => f.debug_tuple("All").field(all).finish(),
            Predicate::Any(any) => f.debug_tuple("Any").field(any).finish(),
        }
    }
}
