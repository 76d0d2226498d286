use indexmap::IndexSet;
use std::collections::HashSet;

use crate::column::ColumnKind;
use crate::query::{QueryGraph, QueryId};
use crate::source::{Source, Table};
use crate::QueryResult;

/// What the outermost query has to emit before its body.
#[derive(Debug, Default)]
pub(crate) struct Hoisted {
    /// CTEs in dependency order: every CTE comes after the ones it uses.
    pub ctes: IndexSet<QueryId>,
    pub pre_query_options: IndexSet<String>,
    /// Unqualified table names read anywhere in the graph. A CTE of the
    /// same name would shadow the table.
    pub tables: IndexSet<String>,
}

///
/// Walk everything reachable from `root`.
///
/// Registered CTEs and every query used as a FROM source are hoisted.
/// Join sources, set-operation branches and subquery columns render in
/// place, but whatever they depend on is hoisted as well.
///
pub(crate) fn hoist(graph: &QueryGraph, root: QueryId) -> QueryResult<Hoisted> {
    let mut walk = Walk {
        graph,
        visited: HashSet::new(),
        hoisted: Hoisted::default(),
    };
    walk.visit(root)?;
    walk.hoisted.ctes.shift_remove(&root);

    tracing::debug!(
        root = root.index(),
        ctes = walk.hoisted.ctes.len(),
        "collected CTEs"
    );
    Ok(walk.hoisted)
}

struct Walk<'g> {
    graph: &'g QueryGraph,
    visited: HashSet<QueryId>,
    hoisted: Hoisted,
}

impl<'g> Walk<'g> {
    fn visit(&mut self, id: QueryId) -> QueryResult<()> {
        if !self.visited.insert(id) {
            return Ok(());
        }
        let graph = self.graph;
        let node = graph.node(id)?;

        for cte in &node.ctes {
            self.visit(*cte)?;
            self.hoisted.ctes.insert(*cte);
        }

        match &node.source {
            Some(Source::Query(source)) => {
                self.visit(*source)?;
                self.hoisted.ctes.insert(*source);
            }
            Some(Source::Table(table)) => self.table(table),
            None => {}
        }

        for join in &node.joins {
            match &join.source {
                Source::Query(joined) => self.visit(*joined)?,
                Source::Table(table) => self.table(table),
            }
        }

        for (_, column) in node.scoped_columns() {
            if let ColumnKind::Subquery(subquery) = column.kind() {
                self.visit(subquery.query())?;
            }
        }

        for (_, other) in &node.set_operations {
            self.visit(*other)?;
        }

        self.hoisted
            .pre_query_options
            .extend(node.pre_query_options.iter().cloned());
        Ok(())
    }

    fn table(&mut self, table: &Table) {
        if table.schema().is_none() {
            self.hoisted.tables.insert(table.name().to_string());
        }
    }
}
