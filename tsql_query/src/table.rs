use crate::column::Column;
use crate::predicate::{Predicate, Selector};
use crate::source::Table;

///
/// A table known at compile time, usually implemented through
/// `#[tsql_query::table("schema.name")]`.
///
pub trait TableDef {
    fn table_schema() -> Option<&'static str>;

    fn table_name() -> &'static str;

    fn column_names() -> &'static [&'static str];

    fn table() -> Table {
        match Self::table_schema() {
            Some(schema) => Table::with_schema(schema, Self::table_name()),
            None => Table::new(Self::table_name()),
        }
    }

    fn columns() -> Vec<Column> {
        Self::column_names()
            .iter()
            .map(|name| Column::new(*name))
            .collect()
    }
}

/// Equality between columns of a foreign table and the current one.
#[derive(Clone, Debug, PartialEq)]
pub struct ForeignKey {
    table: Table,
    local: Vec<Column>,
    foreign: Vec<Column>,
}

impl ForeignKey {
    pub fn new(table: Table, local: Vec<Column>, foreign: Vec<Column>) -> Self {
        Self {
            table,
            local,
            foreign,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Join condition with the foreign table as the current scope and the
    /// local table as the enclosing one.
    pub fn predicate(&self) -> Predicate {
        Predicate::pairs(
            Selector::columns(self.foreign.clone()),
            Selector::columns(self.local.clone()),
        )
    }
}
