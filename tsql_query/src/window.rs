use crate::column::Column;
use crate::order::{Direction, OrderByClause};

/// `FUNCTION(args) OVER (PARTITION BY .. ORDER BY ..)`
///
/// ```
/// use tsql_query::prelude::*;
///
/// let row_number = WindowFunction::new("ROW_NUMBER")
///     .partition_by(["CustomerId"])
///     .order_by_column("OrderDate", Direction::Desc)
///     .alias("RowNumber");
/// assert_eq!(row_number.name(), Some("RowNumber"));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct WindowFunction {
    pub(crate) function: String,
    pub(crate) arguments: String,
    pub(crate) partition_by: Vec<Column>,
    pub(crate) order_by: Vec<OrderByClause>,
}

impl WindowFunction {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            arguments: String::new(),
            partition_by: vec![],
            order_by: vec![],
        }
    }

    /// Function arguments, may use `{n}` scope placeholders.
    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = arguments.into();
        self
    }

    pub fn partition_by<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.partition_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, clause: OrderByClause) -> Self {
        self.order_by.push(clause);
        self
    }

    pub fn order_by_column(self, column: impl Into<Column>, direction: Direction) -> Self {
        self.order_by(OrderByClause::expression(column.into(), direction))
    }

    /// Finish as a select-list column.
    pub fn alias(self, alias: impl Into<String>) -> Column {
        Column::window(self, alias)
    }
}

impl From<WindowFunction> for Column {
    fn from(function: WindowFunction) -> Self {
        Column::window(function, "")
    }
}
