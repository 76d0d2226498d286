use std::fmt;

use crate::builder::quote_ident;
use crate::column::{Column, Qualifier};
use crate::predicate::Predicate;
use crate::query::QueryId;

/// A physical table or view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    schema: Option<String>,
    name: String,
    alias: Option<String>,
    no_expand: bool,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            alias: None,
            no_expand: false,
        }
    }

    pub fn with_schema(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Self::new(name)
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Read an indexed view through its index: `WITH (NOEXPAND)`.
    pub fn no_expand(mut self) -> Self {
        self.no_expand = true;
        self
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The alias this table is referenced by; the table name unless set.
    pub fn alias_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn has_explicit_alias(&self) -> bool {
        self.alias.is_some()
    }

    pub fn is_no_expand(&self) -> bool {
        self.no_expand
    }

    /// `[schema].[name] AS [alias] WITH (NOEXPAND)` as used in FROM and JOIN.
    pub(crate) fn from_sql(&self) -> String {
        let mut sql = String::new();
        if let Some(schema) = &self.schema {
            sql.push_str(&quote_ident(schema));
            sql.push('.');
        }
        sql.push_str(&quote_ident(&self.name));
        if let Some(alias) = &self.alias {
            if alias != &self.name {
                sql.push_str(" AS ");
                sql.push_str(&quote_ident(alias));
            }
        }
        if self.no_expand {
            sql.push_str(" WITH (NOEXPAND)");
        }
        sql
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::new(name)
    }
}

/// `(schema, name)`
impl From<(&str, &str)> for Table {
    fn from((schema, name): (&str, &str)) -> Self {
        Table::with_schema(schema, name)
    }
}

/// `(schema, name, alias)`
impl From<(&str, &str, &str)> for Table {
    fn from((schema, name, alias): (&str, &str, &str)) -> Self {
        Table::with_schema(schema, name).alias(alias)
    }
}

/// What a query (or join) reads from.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Table(Table),
    Query(QueryId),
}

impl Source {
    pub(crate) fn qualifier(&self) -> Qualifier {
        match self {
            Source::Table(table) => Qualifier::Alias(table.alias_name().to_string()),
            Source::Query(id) => Qualifier::Query(*id),
        }
    }
}

impl From<Table> for Source {
    fn from(table: Table) -> Self {
        Source::Table(table)
    }
}

impl From<QueryId> for Source {
    fn from(id: QueryId) -> Self {
        Source::Query(id)
    }
}

impl From<&str> for Source {
    fn from(name: &str) -> Self {
        Source::Table(Table::new(name))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::Full => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        })
    }
}

/// A joined source with its join condition and the columns it contributes
/// to the select list.
#[derive(Clone, Debug)]
pub struct Join {
    pub(crate) kind: JoinKind,
    pub(crate) source: Source,
    pub(crate) predicate: Option<Predicate>,
    pub(crate) columns: Vec<Column>,
}

impl Join {
    pub fn new(kind: JoinKind, source: impl Into<Source>) -> Self {
        Self {
            kind,
            source: source.into(),
            predicate: None,
            columns: vec![],
        }
    }

    pub fn on(mut self, predicate: impl Into<Predicate>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn select<I, C>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Column>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }
}
