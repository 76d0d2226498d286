use serde::{Deserialize, Serialize};
use std::fmt;

use crate::column::Column;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => f.write_str("ASC"),
            Direction::Desc => f.write_str("DESC"),
        }
    }
}

/// Ordering carried by a selected column: its position among the ORDER BY
/// terms and the direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnOrder {
    pub index: usize,
    pub direction: Direction,
}

impl ColumnOrder {
    pub fn asc(index: usize) -> Self {
        Self {
            index,
            direction: Direction::Asc,
        }
    }

    pub fn desc(index: usize) -> Self {
        Self {
            index,
            direction: Direction::Desc,
        }
    }
}

/// An explicit ORDER BY term.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderByClause {
    pub(crate) target: OrderTarget,
    pub(crate) direction: Direction,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum OrderTarget {
    /// Verbatim expression, may use `{n}` scope placeholders.
    Text(String),
    /// 1-based position in the select list.
    Position(usize),
    /// The full expression of a column, resolved in the current scope.
    Expression(Column),
}

impl OrderByClause {
    pub fn new(expression: impl Into<String>, direction: Direction) -> Self {
        Self {
            target: OrderTarget::Text(expression.into()),
            direction,
        }
    }

    pub fn asc(expression: impl Into<String>) -> Self {
        Self::new(expression, Direction::Asc)
    }

    pub fn desc(expression: impl Into<String>) -> Self {
        Self::new(expression, Direction::Desc)
    }

    pub fn position(position: usize, direction: Direction) -> Self {
        Self {
            target: OrderTarget::Position(position),
            direction,
        }
    }

    pub fn expression(column: Column, direction: Direction) -> Self {
        Self {
            target: OrderTarget::Expression(column),
            direction,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl From<&str> for OrderByClause {
    fn from(expression: &str) -> Self {
        Self::asc(expression)
    }
}

/// One term of the effective ORDER BY of a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OrderItem<'c, S> {
    Explicit(&'c OrderByClause),
    Column {
        scope: S,
        column: &'c Column,
        direction: Direction,
    },
}

/// Effective ORDER BY: explicit clauses first, then every column carrying
/// an order, sorted by the order index. `S` tags the scope each column
/// belongs to.
pub fn derive_order_by<'c, S: Copy>(
    columns: &[(S, &'c Column)],
    explicit: &'c [OrderByClause],
) -> Vec<OrderItem<'c, S>> {
    let mut ordered: Vec<(usize, OrderItem<'c, S>)> = columns
        .iter()
        .filter_map(|(scope, column)| {
            column.order().map(|order| {
                (
                    order.index,
                    OrderItem::Column {
                        scope: *scope,
                        column: *column,
                        direction: order.direction,
                    },
                )
            })
        })
        .collect();
    ordered.sort_by_key(|(index, _)| *index);

    explicit
        .iter()
        .map(OrderItem::Explicit)
        .chain(ordered.into_iter().map(|(_, item)| item))
        .collect()
}
