//!
//! Ready-made computed columns for common T-SQL functions.
//!
//! Column arguments are resolved against the scope the column is rendered
//! in, so `func::sum("Total")` inside a query over `[o]` renders
//! `Sum([o].[Total]) AS [Sum_Total]`.
//!

use crate::builder::{quote_ident, quote_literal};
use crate::column::Column;

fn scoped(column: &str) -> String {
    format!("[{{0}}].{}", quote_ident(column))
}

pub fn get_date() -> Column {
    Column::expr("GetDate()", "GetDate")
}

/// `Count(*) AS [Count]`
pub fn count() -> Column {
    Column::aggregate("Count(*)", "Count")
}

pub fn count_of(column: &str) -> Column {
    Column::aggregate(
        format!("Count({})", scoped(column)),
        format!("Count_{}", column),
    )
}

pub fn sum(column: &str) -> Column {
    Column::aggregate(format!("Sum({})", scoped(column)), format!("Sum_{}", column))
}

pub fn min(column: &str) -> Column {
    Column::aggregate(format!("Min({})", scoped(column)), format!("Min_{}", column))
}

pub fn max(column: &str) -> Column {
    Column::aggregate(format!("Max({})", scoped(column)), format!("Max_{}", column))
}

pub fn avg(column: &str) -> Column {
    Column::aggregate(format!("Avg({})", scoped(column)), format!("Avg_{}", column))
}

pub fn round(column: &str, precision: u32) -> Column {
    Column::expr(
        format!("Round({}, {})", scoped(column), precision),
        format!("Round_{}", column),
    )
}

/// `String_agg([col], 'sep')`, aliased `StringAgg_col` unless `alias` is given.
pub fn string_agg(column: &str, separator: &str, alias: Option<&str>) -> Column {
    let alias = alias
        .map(str::to_owned)
        .unwrap_or_else(|| format!("StringAgg_{}", column));
    Column::aggregate(
        format!("String_agg({}, {})", scoped(column), quote_literal(separator)),
        alias,
    )
}

/// `CASE` expression mapping each listed value of `column` to its position.
pub fn case_order_index(column: &str, values: &[&str], alias: &str) -> Column {
    let mut expression = String::from("CASE");
    for (index, value) in values.iter().enumerate() {
        expression.push_str(&format!(
            " WHEN {} = {} THEN {}",
            scoped(column),
            quote_literal(value),
            index
        ));
    }
    expression.push_str(&format!(" ELSE {} END", values.len()));
    Column::expr(expression, alias)
}
