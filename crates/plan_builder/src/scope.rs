//! The scope chain: the central attribute carrier for name resolution
//! (spec §4.1).
//!
//! A `Scope` is pushed when entering a relational construct (SELECT,
//! subquery, derived table, join), mutated while that construct is
//! analyzed, and consulted by inner/outer constructs via the `parent`
//! chain. Ownership follows the recursive build traversal: `push` moves the
//! current scope in as the new child's parent, and `pop` hands it back out
//! once the child is done being consulted (spec §3 lifecycle).

use std::collections::HashMap;

use plan_error::Result;
use plan_types::SqlType;

use crate::expr::Expression;
use crate::ids::{ColumnId, IdAllocator, TableId};
use crate::plan::PlanNode;

/// One column visible in a scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeColumn {
    pub db: String,
    pub table: String,
    pub col: String,
    pub id: ColumnId,
    pub sql_type: SqlType,
    /// `None` for a pass-through column (merged in with no computing
    /// expression of its own, glossary "pass-through column"); `Some` for a
    /// projected/aliased expression.
    pub scalar: Option<Expression>,
    pub nullable: bool,
    pub descending: bool,
}

impl ScopeColumn {
    pub fn new(table: impl Into<String>, col: impl Into<String>, id: ColumnId, sql_type: SqlType) -> Self {
        ScopeColumn {
            db: String::new(),
            table: table.into().to_lowercase(),
            col: col.into().to_lowercase(),
            id,
            sql_type,
            scalar: None,
            nullable: true,
            descending: false,
        }
    }

    pub fn qualified_key(&self) -> String {
        if self.table.is_empty() {
            self.col.clone()
        } else {
            format!("{}.{}", self.table, self.col)
        }
    }

    pub fn as_column_ref(&self, index: usize, table_id: Option<TableId>) -> Expression {
        Expression::Column(crate::expr::ColumnRef {
            id: self.id,
            table_id,
            table: self.table.clone(),
            name: self.col.clone(),
            sql_type: self.sql_type.clone(),
            nullable: self.nullable,
            index,
        })
    }
}

/// Aggregation state threaded through a FROM scope while the projection,
/// HAVING, and ORDER BY clauses are analyzed (spec §4.4).
#[derive(Debug, Clone, Default)]
pub struct GroupByState {
    /// Aggregate inputs and grouping expressions, in the order they were
    /// first referenced.
    pub in_cols: Vec<ScopeColumn>,
    /// The aggregation output row shape: one ScopeColumn per grouping key
    /// and per recorded aggregate, in the teacher-idiom lighter form of the
    /// spec's `outScope` (a full nested `Scope` isn't needed here since the
    /// aggregation output never owns its own tables/CTEs).
    pub out_cols: Vec<ScopeColumn>,
    /// Lowercased textual form of an aggregate -> the ColumnId already
    /// assigned to it, used to deduplicate (spec invariant 4 / property
    /// P4) so HAVING/ORDER BY/projection can share one result column.
    pub aggs: HashMap<String, ColumnId>,
    /// The aggregate expressions themselves, keyed by the same ColumnId,
    /// in first-registered order (what the GroupBy plan node emits).
    pub agg_exprs: Vec<(ColumnId, Expression)>,
    /// ColumnIds of the grouping keys.
    pub grouping: Vec<ColumnId>,
}

impl GroupByState {
    /// Register a grouping key, or return the id of an already-registered
    /// one with the same lowered textual form.
    pub fn record_grouping_key(&mut self, key: String, col: ScopeColumn, alloc: &mut IdAllocator) -> ColumnId {
        if let Some(existing) = self.aggs.get(&key) {
            return *existing;
        }
        let id = alloc.new_column_id();
        self.aggs.insert(key, id);
        self.grouping.push(id);
        let mut out = col;
        out.id = id;
        self.out_cols.push(out.clone());
        self.in_cols.push(out);
        id
    }

    /// Register an aggregate call, or return the id of an identical one
    /// already recorded (spec §4.4 point 5).
    pub fn record_aggregate(&mut self, key: String, expr: Expression, sql_type: plan_types::SqlType, alloc: &mut IdAllocator) -> (ColumnId, bool) {
        if let Some(existing) = self.aggs.get(&key) {
            return (*existing, false);
        }
        let id = alloc.new_column_id();
        self.aggs.insert(key.clone(), id);
        self.agg_exprs.push((id, expr));
        self.out_cols.push(ScopeColumn::new("", key, id, sql_type));
        (id, true)
    }
}

/// A lexical scope: visible columns/tables/CTEs, grouping state, and the
/// partially-built plan node for the construct owning this scope.
#[derive(Debug, Clone)]
pub struct Scope {
    parent: Option<Box<Scope>>,
    pub cols: Vec<ScopeColumn>,
    pub extra_cols: Vec<ScopeColumn>,
    pub tables: HashMap<String, TableId>,
    pub ctes: HashMap<String, Scope>,
    pub group_by: Option<GroupByState>,
    pub exprs: HashMap<String, ColumnId>,
    pub node: Option<PlanNode>,
}

impl Default for Scope {
    fn default() -> Self {
        Scope {
            parent: None,
            cols: Vec::new(),
            extra_cols: Vec::new(),
            tables: HashMap::new(),
            ctes: HashMap::new(),
            group_by: None,
            exprs: HashMap::new(),
            node: None,
        }
    }
}

impl Scope {
    pub fn root() -> Scope {
        Scope::default()
    }

    /// Create a child scope sharing the same builder/allocator, with `self`
    /// as its parent.
    pub fn push(self) -> Scope {
        Scope {
            parent: Some(Box::new(self)),
            ..Scope::default()
        }
    }

    /// Hand ownership of the enclosing scope back to the caller, discarding
    /// this scope's own local state (keep the plan node first via `node`
    /// field if it's needed by the caller).
    pub fn pop(self) -> Scope {
        match self.parent {
            Some(parent) => *parent,
            None => Scope::default(),
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Create a sibling scope with the same parent but fresh local state —
    /// used to separate a projection's output namespace from the FROM
    /// namespace feeding it.
    pub fn replace(self) -> Scope {
        Scope {
            parent: self.parent,
            ..Scope::default()
        }
    }

    /// Deep-duplicate this scope and any owned plan node (used when a CTE
    /// body is referenced more than once).
    pub fn copy(&self) -> Scope {
        self.clone()
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.parent.as_deref()
    }

    /// Count of columns across all ancestor scopes (spec §4.1
    /// `outerScopeLen`), used to offset child-local indices when
    /// constructing get-field expressions.
    pub fn outer_scope_len(&self) -> usize {
        match &self.parent {
            Some(parent) => parent.cols.len() + parent.outer_scope_len(),
            None => 0,
        }
    }

    pub fn add_column(&mut self, col: ScopeColumn) {
        let key = col.qualified_key();
        self.exprs.insert(key, col.id);
        self.cols.push(col);
    }

    pub fn add_extra_column(&mut self, col: ScopeColumn) {
        self.extra_cols.push(col);
    }

    /// Allocate a fresh id and add a new column under it, returning the id.
    pub fn new_column(
        &mut self,
        table: impl Into<String>,
        col: impl Into<String>,
        sql_type: SqlType,
        alloc: &mut IdAllocator,
    ) -> ColumnId {
        let id = alloc.new_column_id();
        let sc = ScopeColumn::new(table, col, id, sql_type);
        self.add_column(sc);
        id
    }

    /// Rewrite every column's table to `t` and re-key `exprs`/`tables`
    /// accordingly.
    pub fn set_table_alias(&mut self, alias: &str) {
        let alias = alias.to_lowercase();
        let old_table_id = self.cols.first().and_then(|c| {
            self.tables
                .iter()
                .find(|(name, _)| **name == c.table)
                .map(|(_, id)| *id)
        });

        self.exprs.clear();
        for col in &mut self.cols {
            col.table = alias.clone();
        }
        for col in &self.cols {
            self.exprs.insert(col.qualified_key(), col.id);
        }

        self.tables.clear();
        if let Some(id) = old_table_id {
            self.tables.insert(alias, id);
        }
    }

    /// Rename columns in order; fails when arities differ.
    pub fn set_col_alias(&mut self, names: &[String]) -> Result<()> {
        if names.len() != self.cols.len() {
            return Err(plan_error::PlanError::arity(format!(
                "column alias list has {} names but scope has {} columns",
                names.len(),
                self.cols.len()
            )));
        }
        self.exprs.clear();
        for (col, name) in self.cols.iter_mut().zip(names) {
            col.col = name.to_lowercase();
        }
        for col in &self.cols {
            self.exprs.insert(col.qualified_key(), col.id);
        }
        Ok(())
    }

    /// Merge columns, exprs, and tables of `src` into `self`; the merged
    /// columns are marked pass-through (their `scalar` cleared).
    pub fn append_columns_from_scope(&mut self, src: &Scope) {
        for (name, id) in &src.tables {
            self.tables.insert(name.clone(), *id);
        }
        for col in &src.cols {
            let mut col = col.clone();
            col.scalar = None;
            self.add_column(col);
        }
    }

    /// Resolve `(qualifier, name)` by walking the scope chain from innermost
    /// outward (or just the current scope when `check_parent` is false,
    /// used by ORDER BY to avoid resolving into an enclosing query).
    pub fn resolve_column(
        &self,
        qualifier: &str,
        name: &str,
        check_parent: bool,
    ) -> Option<(&ScopeColumn, usize)> {
        let qualifier = qualifier.to_lowercase();
        let name = name.to_lowercase();

        let mut current = self;
        loop {
            if let Some((col, idx)) = find_in_cols(&current.cols, &qualifier, &name) {
                return Some((col, idx));
            }
            if !check_parent {
                return None;
            }
            match &current.parent {
                Some(parent) => current = parent,
                None => return None,
            }
        }
    }

    /// Resolve restricted to FROM-scope extra columns too (used when ORDER
    /// BY needs to see a column it added as bookkeeping).
    pub fn resolve_in_extras(&self, qualifier: &str, name: &str) -> Option<&ScopeColumn> {
        let qualifier = qualifier.to_lowercase();
        let name = name.to_lowercase();
        find_in_cols(&self.extra_cols, &qualifier, &name).map(|(c, _)| c)
    }
}

fn find_in_cols<'a>(cols: &'a [ScopeColumn], qualifier: &str, name: &str) -> Option<(&'a ScopeColumn, usize)> {
    cols.iter()
        .enumerate()
        .find(|(_, c)| c.col == name && (c.table == qualifier || qualifier.is_empty()))
        .map(|(i, c)| (c, i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::IdAllocator;

    fn mk_col(alloc: &mut IdAllocator, table: &str, name: &str) -> ScopeColumn {
        ScopeColumn::new(table, name, alloc.new_column_id(), SqlType::BigInt)
    }

    #[test]
    fn resolve_prefers_innermost_scope() {
        let mut alloc = IdAllocator::new();
        let mut root = Scope::root();
        root.add_column(mk_col(&mut alloc, "xy", "x"));

        let mut child = root.push();
        child.add_column(mk_col(&mut alloc, "uv", "x"));

        let (found, _) = child.resolve_column("", "x", true).unwrap();
        assert_eq!(found.table, "uv");
    }

    #[test]
    fn resolve_without_check_parent_stays_local() {
        let mut alloc = IdAllocator::new();
        let mut root = Scope::root();
        root.add_column(mk_col(&mut alloc, "xy", "x"));
        let child = root.push();

        assert!(child.resolve_column("", "x", false).is_none());
    }

    #[test]
    fn push_then_pop_restores_parent_columns() {
        let mut alloc = IdAllocator::new();
        let mut root = Scope::root();
        root.add_column(mk_col(&mut alloc, "xy", "x"));

        let child = root.push();
        let restored = child.pop();
        assert_eq!(restored.cols.len(), 1);
    }

    #[test]
    fn set_table_alias_rewrites_every_column() {
        let mut alloc = IdAllocator::new();
        let mut scope = Scope::root();
        scope.add_column(mk_col(&mut alloc, "xy", "x"));
        scope.add_column(mk_col(&mut alloc, "xy", "y"));
        scope.tables.insert("xy".to_string(), TableId(0));

        scope.set_table_alias("s");

        assert!(scope.cols.iter().all(|c| c.table == "s"));
        assert!(scope.exprs.contains_key("s.x"));
        assert!(scope.tables.contains_key("s"));
    }

    #[test]
    fn set_col_alias_requires_matching_arity() {
        let mut alloc = IdAllocator::new();
        let mut scope = Scope::root();
        scope.add_column(mk_col(&mut alloc, "xy", "x"));

        assert!(scope.set_col_alias(&["a".to_string(), "b".to_string()]).is_err());
        assert!(scope.set_col_alias(&["a".to_string()]).is_ok());
        assert_eq!(scope.cols[0].col, "a");
    }

    #[test]
    fn append_columns_marks_pass_through() {
        let mut alloc = IdAllocator::new();
        let mut src = Scope::root();
        let mut col = mk_col(&mut alloc, "xy", "x");
        col.scalar = Some(Expression::Literal(plan_types::Value::I8(1)));
        src.add_column(col);

        let mut dst = Scope::root();
        dst.append_columns_from_scope(&src);

        assert!(dst.cols[0].scalar.is_none());
    }

    #[test]
    fn outer_scope_len_counts_ancestors() {
        let mut alloc = IdAllocator::new();
        let mut root = Scope::root();
        root.add_column(mk_col(&mut alloc, "xy", "x"));
        root.add_column(mk_col(&mut alloc, "xy", "y"));

        let child = root.push();
        assert_eq!(child.outer_scope_len(), 2);
    }
}
