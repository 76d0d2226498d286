use crate::options::ForJson;
use crate::order::ColumnOrder;
use crate::query::QueryId;
use crate::window::WindowFunction;

///
/// One entry of a select list.
///
/// A column has an optional raw (database) name and an optional display
/// name; the display name falls back to the raw name. Columns without a
/// qualifier resolve against the alias of the scope they are rendered in.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub(crate) raw_name: Option<String>,
    pub(crate) display_name: Option<String>,
    pub(crate) aggregate: bool,
    pub(crate) order: Option<ColumnOrder>,
    pub(crate) qualifier: Option<Qualifier>,
    pub(crate) kind: ColumnKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnKind {
    /// `[scope].[raw]`
    Physical,
    /// Verbatim expression. `{0}` is the column's own scope alias, `{n}`
    /// the alias `n` scopes further out.
    Computed(String),
    /// `*`, or `[scope].*` when scoped.
    Wildcard { scoped: bool },
    /// A nested query rendered in parentheses.
    Subquery(SubqueryColumn),
    Window(WindowFunction),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubqueryColumn {
    pub(crate) query: QueryId,
    pub(crate) skip: Option<u64>,
    pub(crate) length: Option<u64>,
    pub(crate) for_json: Option<ForJson>,
}

impl SubqueryColumn {
    pub fn query(&self) -> QueryId {
        self.query
    }
}

/// Pins a column to a scope other than the one it is rendered in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Qualifier {
    Alias(String),
    Query(QueryId),
}

/// Ordering, pagination and JSON shaping for a query turned into a column.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnOptions {
    pub order: Option<ColumnOrder>,
    pub skip: Option<u64>,
    pub length: Option<u64>,
    pub for_json: Option<ForJson>,
}

impl ColumnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn order(mut self, order: ColumnOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn for_json(mut self, for_json: ForJson) -> Self {
        self.for_json = Some(for_json);
        self
    }
}

impl Column {
    /// A physical column.
    pub fn new(raw_name: impl Into<String>) -> Self {
        Self::with_kind(Some(raw_name.into()), None, ColumnKind::Physical)
    }

    /// A computed expression shown under `alias`.
    pub fn expr(expression: impl Into<String>, alias: impl Into<String>) -> Self {
        Self::with_kind(
            None,
            non_empty(alias.into()),
            ColumnKind::Computed(expression.into()),
        )
    }

    /// A computed expression that forces GROUP BY on the query.
    pub fn aggregate(expression: impl Into<String>, alias: impl Into<String>) -> Self {
        let mut column = Self::expr(expression, alias);
        column.aggregate = true;
        column
    }

    /// Bare `*`.
    pub fn all() -> Self {
        Self::with_kind(None, None, ColumnKind::Wildcard { scoped: false })
    }

    /// `[scope].*`
    pub fn all_of_scope() -> Self {
        Self::with_kind(None, None, ColumnKind::Wildcard { scoped: true })
    }

    pub fn subquery(query: QueryId, alias: impl Into<String>, options: ColumnOptions) -> Self {
        let mut column = Self::with_kind(
            None,
            non_empty(alias.into()),
            ColumnKind::Subquery(SubqueryColumn {
                query,
                skip: options.skip,
                length: options.length,
                for_json: options.for_json,
            }),
        );
        column.order = options.order;
        column
    }

    pub fn window(function: WindowFunction, alias: impl Into<String>) -> Self {
        Self::with_kind(None, non_empty(alias.into()), ColumnKind::Window(function))
    }

    fn with_kind(raw_name: Option<String>, display_name: Option<String>, kind: ColumnKind) -> Self {
        Self {
            raw_name,
            display_name,
            aggregate: false,
            order: None,
            qualifier: None,
            kind,
        }
    }

    /// Set the display name.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.display_name = non_empty(alias.into());
        self
    }

    pub fn aggregated(mut self) -> Self {
        self.aggregate = true;
        self
    }

    pub fn ordered(mut self, order: ColumnOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn asc(self, index: usize) -> Self {
        self.ordered(ColumnOrder::asc(index))
    }

    pub fn desc(self, index: usize) -> Self {
        self.ordered(ColumnOrder::desc(index))
    }

    /// Resolve against the given alias instead of the rendering scope.
    pub fn of(mut self, alias: impl Into<String>) -> Self {
        self.qualifier = Some(Qualifier::Alias(alias.into()));
        self
    }

    pub(crate) fn qualified(mut self, qualifier: Qualifier) -> Self {
        if self.qualifier.is_none() {
            self.qualifier = Some(qualifier);
        }
        self
    }

    pub(crate) fn set_order(&mut self, order: Option<ColumnOrder>) {
        self.order = order;
    }

    pub fn raw_name(&self) -> Option<&str> {
        self.raw_name.as_deref()
    }

    /// Display name, falling back to the raw name.
    pub fn name(&self) -> Option<&str> {
        self.display_name.as_deref().or_else(|| self.raw_name())
    }

    /// Whether SELECT needs an `AS [name]` for this column.
    pub fn uses_alias(&self) -> bool {
        match (&self.display_name, &self.raw_name) {
            (Some(display), Some(raw)) => display != raw,
            (Some(_), None) => true,
            _ => false,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.aggregate
    }

    pub fn order(&self) -> Option<ColumnOrder> {
        self.order
    }

    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Whether the column can appear in a GROUP BY list.
    pub(crate) fn is_groupable(&self) -> bool {
        !self.aggregate
            && matches!(self.kind, ColumnKind::Physical | ColumnKind::Computed(_))
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::new(name)
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::new(name)
    }
}

/// `(raw, alias)`
impl From<(&str, &str)> for Column {
    fn from((raw, alias): (&str, &str)) -> Self {
        Column::new(raw).alias(alias)
    }
}

fn non_empty(name: String) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_only_when_names_differ() {
        assert!(!Column::new("Name").uses_alias());
        assert!(!Column::new("Name").alias("Name").uses_alias());
        assert!(Column::new("Name").alias("Label").uses_alias());
        assert!(Column::expr("GETDATE()", "Now").uses_alias());
    }

    #[test]
    fn empty_alias_leaves_computed_column_unnamed() {
        let column = Column::expr("1", "");
        assert_eq!(column.name(), None);
    }

    #[test]
    fn groupable_excludes_aggregates_and_nested() {
        assert!(Column::new("A").is_groupable());
        assert!(!Column::aggregate("Count(*)", "Count").is_groupable());
        assert!(!Column::all().is_groupable());
    }
}
