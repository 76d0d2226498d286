use std::collections::{HashMap, HashSet};
use std::ops::{Deref, DerefMut};

use crate::options::BuildOptions;
use crate::predicate::ColumnScope;
use crate::query::{QueryGraph, QueryId};
use crate::value::SqlValue;
use crate::{QueryError, QueryResult};

/// What a scope resolves its alias and columns against.
#[derive(Clone, Debug)]
pub(crate) enum ScopeSource {
    /// The body of a query: its FROM source and joins.
    Query(QueryId),
    /// A query referenced from outside, as a CTE or derived table.
    Derived(QueryId),
    /// A physical table, by alias.
    Table(String),
}

#[derive(Clone, Debug)]
pub(crate) struct Scope {
    pub source: ScopeSource,
    pub options: BuildOptions,
    pub indent: usize,
}

impl Scope {
    pub fn new(source: ScopeSource, options: BuildOptions, indent: usize) -> Self {
        Self {
            source,
            options,
            indent,
        }
    }
}

///
/// State of one build pass.
///
/// Scopes form a stack: level 0 is the innermost scope, level `n` the
/// scope `n` steps further out. Every query rendered inside another one
/// pushes a scope and pops it when its [ScopeGuard] goes away, so the
/// stack is balanced on every exit path.
///
pub(crate) struct BuildContext<'g> {
    pub graph: &'g QueryGraph,
    scopes: Vec<Scope>,
    rendered: HashSet<QueryId>,
    renames: HashMap<QueryId, String>,
    cte_names: HashMap<String, QueryId>,
    reserved: HashSet<String>,
    params: Vec<SqlValue>,
}

impl<'g> BuildContext<'g> {
    pub fn new(graph: &'g QueryGraph) -> Self {
        Self {
            graph,
            scopes: vec![],
            rendered: HashSet::new(),
            renames: HashMap::new(),
            cte_names: HashMap::new(),
            reserved: HashSet::new(),
            params: vec![],
        }
    }

    pub fn enter(&mut self, scope: Scope) -> ScopeGuard<'_, 'g> {
        tracing::trace!(depth = self.scopes.len() + 1, source = ?scope.source, "enter scope");
        self.scopes.push(scope);
        ScopeGuard { ctx: self }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_outermost(&self) -> bool {
        self.scopes.len() == 1
    }

    fn scope_at(&self, level: usize) -> QueryResult<&Scope> {
        let depth = self.scopes.len();
        if level >= depth {
            return Err(QueryError::ScopeOutOfRange { level, depth });
        }
        Ok(&self.scopes[depth - 1 - level])
    }

    pub fn current(&self) -> QueryResult<&Scope> {
        self.scope_at(0)
    }

    pub fn alias_at(&self, level: usize) -> QueryResult<String> {
        let source = self.scope_at(level)?.source.clone();
        self.scope_alias(&source)
    }

    pub fn column_scope(&self, level: usize) -> QueryResult<ColumnScope<'_>> {
        Ok(ColumnScope {
            graph: self.graph,
            source: &self.scope_at(level)?.source,
        })
    }

    pub fn scope_alias(&self, source: &ScopeSource) -> QueryResult<String> {
        match source {
            ScopeSource::Query(id) => self.graph.source_alias_with(*id, &self.renames),
            ScopeSource::Derived(id) => self.query_alias(*id),
            ScopeSource::Table(alias) => Ok(alias.clone()),
        }
    }

    /// Name a query is referenced by in this pass, including renames.
    pub fn query_alias(&self, id: QueryId) -> QueryResult<String> {
        self.graph.alias_with(id, &self.renames)
    }

    /// Records `id` as rendered. Returns whether this was the first time.
    pub fn mark_rendered(&mut self, id: QueryId) -> bool {
        self.rendered.insert(id)
    }

    /// Keep CTEs and derived tables from taking `name`, such as a table that
    /// their bodies read.
    pub fn reserve_name(&mut self, name: &str) {
        self.reserved.insert(name.to_lowercase());
    }

    /// Reserve a statement-wide name for `id` as a CTE or derived table,
    /// renaming it when another query or a reserved table already holds its
    /// alias. Names compare case-insensitively.
    pub fn claim_name(&mut self, id: QueryId) -> QueryResult<String> {
        let alias = self.query_alias(id)?;
        let mut name = alias.clone();
        let mut attempt = 0;
        loop {
            let key = name.to_lowercase();
            match self.cte_names.get(&key) {
                Some(owner) if *owner == id => return Ok(name),
                None if !self.reserved.contains(&key) => break,
                _ => {}
            }
            attempt += 1;
            name = if attempt == 1 {
                format!("{}_{}", alias, id.index())
            } else {
                format!("{}_{}_{}", alias, id.index(), attempt)
            };
        }

        if name != alias {
            tracing::debug!(query = id.index(), from = %alias, to = %name, "renamed colliding statement name");
            self.renames.insert(id, name.clone());
        }
        self.cte_names.insert(name.to_lowercase(), id);
        Ok(name)
    }

    /// Register a parameter value, returning its placeholder.
    pub fn bind(&mut self, value: SqlValue) -> String {
        self.params.push(value);
        format!("@p{}", self.params.len())
    }

    pub fn into_params(self) -> Vec<SqlValue> {
        self.params
    }
}

/// Pops its scope when dropped.
pub(crate) struct ScopeGuard<'c, 'g> {
    ctx: &'c mut BuildContext<'g>,
}

impl<'c, 'g> Deref for ScopeGuard<'c, 'g> {
    type Target = BuildContext<'g>;

    fn deref(&self) -> &Self::Target {
        self.ctx
    }
}

impl<'c, 'g> DerefMut for ScopeGuard<'c, 'g> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.ctx
    }
}

impl<'c, 'g> Drop for ScopeGuard<'c, 'g> {
    fn drop(&mut self) {
        self.ctx.scopes.pop();
    }
}

/// Substitute `{n}` with `resolve(n)`. Any other brace is kept as is.
pub(crate) fn expand_scopes<F>(template: &str, mut resolve: F) -> QueryResult<String>
where
    F: FnMut(usize) -> QueryResult<String>,
{
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with('}') {
            let level = after[..digits].parse().unwrap_or(usize::MAX);
            out.push_str(&resolve(level)?);
            rest = &after[digits + 1..];
        } else {
            out.push('{');
            rest = after;
        }
    }
    out.push_str(rest);
    Ok(out)
}
