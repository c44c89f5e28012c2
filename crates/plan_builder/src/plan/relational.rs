//! Relational plan node payloads (spec §4.3): table/subquery sources,
//! joins, set operations, and the simple unary operators (project, filter,
//! sort, limit, offset) that sit above them.

use plan_ast as ast;
use plan_ast::{JoinKind, SetOperation};
use plan_error::{PlanError, Result};

use crate::expr::{CompareOp, Expression, LogicalOp, SortField, SortOrder};
use crate::ids::TableId;
use crate::scope::{Scope, ScopeColumn};
use crate::Builder;

use super::PlanNode;

/// `AS OF` qualifier on a table reference: either constant-folded at build
/// time, or deferred to execution because it references a bind parameter
/// (spec §4.3 point 3, "Named table").
#[derive(Debug, Clone, PartialEq)]
pub enum AsOf {
    Evaluated(Expression),
    Deferred(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTable {
    pub database: String,
    pub table: String,
    pub table_id: TableId,
    pub columns: Vec<ScopeColumn>,
    pub as_of: Option<AsOf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAlias {
    pub alias: String,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryAlias {
    pub name: String,
    pub column_renames: Vec<String>,
    pub cacheable: bool,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub exprs: Vec<Expression>,
    pub distinct: bool,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub predicate: Expression,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub order_by: Vec<SortField>,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Limit {
    pub limit: Expression,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Offset {
    pub offset: Expression,
    pub input: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    pub kind: JoinKind,
    /// `None` for NATURAL and CROSS joins, which bypass the `ON` filter
    /// (spec §4.3 point 4).
    pub condition: Option<Expression>,
    pub natural: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    pub op: SetOperation,
    pub distinct: bool,
    pub left: Box<PlanNode>,
    pub right: Box<PlanNode>,
    pub order_by: Vec<SortField>,
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecursiveCte {
    pub name: String,
    pub column_names: Vec<String>,
    pub seed: Box<PlanNode>,
    pub recursive_term: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    pub rows: Vec<Vec<Expression>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueDerivedTable {
    pub alias: String,
    pub column_renames: Vec<String>,
    pub values: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonTableColumnPlan {
    pub name: String,
    pub sql_type: plan_types::SqlType,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonTable {
    pub alias: String,
    pub data: Expression,
    pub columns: Vec<JsonTableColumnPlan>,
}

/// A table-valued function instantiated in a FROM clause, e.g.
/// `SELECT * FROM generate_series(1, 10) AS g`.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFunctionCall {
    pub name: String,
    pub args: Vec<Expression>,
    pub alias: String,
    pub columns: Vec<ScopeColumn>,
}

/// Build a query (spec §4.3): CTE registration, body dispatch, then the
/// trailing `ORDER BY`/`LIMIT`/`OFFSET` that belong to the outermost query
/// rather than any particular set-op arm. `scope` is the already-pushed
/// child scope this query builds within; its parent is the enclosing query
/// (or `None` at the top level).
pub fn build_query(b: &mut Builder, mut scope: Scope, q: &ast::QueryNode) -> Result<(PlanNode, Scope)> {
    if let Some(cte_defs) = &q.ctes {
        build_cte_defs(b, &mut scope, cte_defs)?;
    }

    let (mut node, mut out_scope, sort_fields) = match &q.body {
        // A plain SELECT analyzes its own ORDER BY before aggregation is
        // finalized, so an aggregate introduced only in ORDER BY still
        // folds into the group (spec §4.3 point 7); `build_select` does
        // that internally and hands the already-built sort fields back.
        ast::QueryNodeBody::Select(select) => build_select(b, scope, select, &q.order_by)?,
        other => {
            let (node, mut out_scope) = build_query_body(b, scope, other)?;
            let sort_fields = if q.order_by.is_empty() { Vec::new() } else { build_order_by(b, &mut out_scope, &q.order_by)? };
            (node, out_scope, sort_fields)
        }
    };

    if !sort_fields.is_empty() {
        node = PlanNode::Sort(super::Sort { order_by: sort_fields, input: Box::new(node) });
    }
    if let Some(limit) = &q.limit {
        let limit = crate::expr::builder::lower_expr(b, &mut out_scope, limit)?;
        node = PlanNode::Limit(Limit { limit, input: Box::new(node) });
    }
    if let Some(offset) = &q.offset {
        let offset = crate::expr::builder::lower_expr(b, &mut out_scope, offset)?;
        node = PlanNode::Offset(Offset { offset, input: Box::new(node) });
    }

    out_scope.node = Some(node.clone());
    Ok((node, out_scope))
}

pub fn build_query_body(b: &mut Builder, scope: Scope, body: &ast::QueryNodeBody) -> Result<(PlanNode, Scope)> {
    match body {
        ast::QueryNodeBody::Select(select) => {
            let (node, scope, _sort_fields) = build_select(b, scope, select, &[])?;
            Ok((node, scope))
        }
        ast::QueryNodeBody::SetOp { left, right, op, all } => build_set_op(b, scope, left, right, *op, *all),
        ast::QueryNodeBody::Values(values) => build_values(b, scope, values),
    }
}

/// Build a single SELECT (spec §4.3 points 2-13). `order_by` is the
/// enclosing query's ORDER BY clause, analyzed here — before the group-by
/// state is finalized — rather than by the caller, so that an aggregate
/// appearing only in ORDER BY (e.g. `ORDER BY x - COUNT(y)`) is folded into
/// the same group-by state a projection-level aggregate would use (spec
/// §4.3 point 7).
fn build_select(b: &mut Builder, scope: Scope, select: &ast::SelectNode, order_by: &[ast::OrderByExpr]) -> Result<(PlanNode, Scope, Vec<SortField>)> {
    let (mut node, mut from_scope) = match &select.from {
        Some(from) => build_from(b, scope, from)?,
        None => (PlanNode::ResolvedDual, scope),
    };

    if let Some(filter) = &select.filter {
        let predicate = crate::expr::builder::lower_expr(b, &mut from_scope, filter)?;
        node = PlanNode::Filter(Filter { predicate, input: Box::new(node) });
    }

    if let Some(group_by) = &select.group_by {
        build_group_by_clause(b, &mut from_scope, group_by)?;
    }

    let mut proj_exprs = Vec::with_capacity(select.projections.len());
    for item in &select.projections {
        match item {
            ast::SelectItem::Wildcard => {
                for (idx, col) in from_scope.cols.clone().iter().enumerate() {
                    proj_exprs.push(col.as_column_ref(idx, from_scope.tables.get(&col.table).copied()));
                }
            }
            ast::SelectItem::QualifiedWildcard(obj) => {
                let (_, qualifier) = obj.split();
                for (idx, col) in from_scope.cols.clone().iter().enumerate() {
                    if col.table == qualifier {
                        proj_exprs.push(col.as_column_ref(idx, from_scope.tables.get(&col.table).copied()));
                    }
                }
            }
            ast::SelectItem::Expr(e) => {
                let text = format!("{e:?}");
                proj_exprs.push(crate::expr::builder::lower_projection_item(b, &mut from_scope, e, None, &text)?);
            }
            ast::SelectItem::AliasedExpr(e, alias) => {
                let text = format!("{e:?}");
                proj_exprs.push(crate::expr::builder::lower_projection_item(b, &mut from_scope, e, Some(&alias.normalized()), &text)?);
            }
        }
    }

    // ORDER BY is analyzed here, before the group-by state is finalized
    // below, so an aggregate it introduces (e.g. `ORDER BY x - COUNT(y)`)
    // registers into the same `from_scope.group_by` a projection-level
    // aggregate would use, and is folded into the group instead of being
    // orphaned on a scope nothing downstream reads (spec §4.3 point 7).
    let (sort_fields, order_extra_cols) = build_select_order_by(b, &mut from_scope, &proj_exprs, order_by)?;

    // HAVING is lowered before the group-by state is finalized: it may
    // itself reference an aggregate not used anywhere in the projection
    // (spec §4.4 point 5's dedup still applies across both clauses).
    let having_predicate = select
        .having
        .as_ref()
        .map(|h| crate::expr::builder::lower_expr(b, &mut from_scope, h))
        .transpose()?;

    if let Some(group_by) = super::aggregation::finalize_group_by(node.clone(), &from_scope) {
        node = PlanNode::GroupBy(group_by);
    }

    if let Some(predicate) = having_predicate {
        node = PlanNode::Having(super::Having { predicate, input: Box::new(node) });
    }

    let mut out_scope = from_scope.clone().replace();
    for expr in &proj_exprs {
        let sql_type = expr.sql_type();
        let name = projection_column_name(expr);
        let id = out_scope.new_column(String::new(), name, sql_type, &mut b.alloc);
        if let Some(col) = out_scope.cols.iter_mut().find(|c| c.id == id) {
            col.scalar = Some(expr.clone());
        }
    }
    // An ORDER BY term resolved against the FROM scope (not already part of
    // the select list) is added as a projection-scope column too (spec §4.3
    // point 7), reusing the same ColumnId it was registered under above.
    for col in order_extra_cols {
        out_scope.add_column(col);
    }
    // FROM-only columns stay reachable for an ORDER BY that isn't in the
    // select list, without polluting the projection's own namespace.
    for col in &from_scope.cols {
        out_scope.add_extra_column(col.clone());
    }

    node = PlanNode::Project(Project {
        exprs: proj_exprs,
        distinct: select.distinct,
        input: Box::new(node),
    });

    Ok((node, out_scope, sort_fields))
}

/// ORDER BY term analysis for a plain SELECT (spec §4.3 point 7), run on
/// the FROM scope before aggregation is finalized. Returns the sort fields
/// plus any FROM-resolved columns that should also become projection-scope
/// columns (the ColName case); ordinal and general-expression terms need no
/// such column since they already resolve against the projection list or
/// carry their own expression.
fn build_select_order_by(
    b: &mut Builder,
    from_scope: &mut Scope,
    proj_exprs: &[Expression],
    order_by: &[ast::OrderByExpr],
) -> Result<(Vec<SortField>, Vec<ScopeColumn>)> {
    let mut sort_fields = Vec::with_capacity(order_by.len());
    let mut new_cols = Vec::new();

    for o in order_by {
        let order = if o.descending { SortOrder::Descending } else { SortOrder::Ascending };

        let column = match &o.expr {
            ast::Expr::Literal(ast::Literal::Number(n)) if n.parse::<usize>().is_ok() => {
                let position: usize = n.parse().unwrap();
                let idx = position.checked_sub(1).ok_or_else(|| PlanError::resolution("ORDER BY position must be >= 1"))?;
                proj_exprs
                    .get(idx)
                    .cloned()
                    .ok_or_else(|| PlanError::resolution(format!("ORDER BY position {position} is out of range")))?
            }
            ast::Expr::Ident(ident) => {
                let name = ident.normalized();
                match from_scope.resolve_column("", &name, false) {
                    Some((col, idx)) => {
                        let column_ref = col.as_column_ref(idx, from_scope.tables.get(&col.table).copied());
                        let mut extra = col.clone();
                        extra.descending = o.descending;
                        new_cols.push(extra.clone());
                        from_scope.add_extra_column(extra);
                        column_ref
                    }
                    None => match from_scope.resolve_in_extras("", &name) {
                        Some(col) => col.as_column_ref(0, None),
                        None => crate::expr::builder::lower_expr(b, from_scope, &o.expr)?,
                    },
                }
            }
            other => crate::expr::builder::lower_expr(b, from_scope, other)?,
        };
        sort_fields.push(SortField { column, order });
    }

    Ok((sort_fields, new_cols))
}

/// Name a projection column the way the scope's column list needs: the
/// alias if the expression carries one, else its own debug rendering.
fn projection_column_name(expr: &Expression) -> String {
    match expr {
        Expression::Alias { name, .. } => name.clone(),
        Expression::Column(c) => c.name.clone(),
        other => other.debug_string(),
    }
}

fn build_group_by_clause(b: &mut Builder, scope: &mut Scope, group_by: &ast::GroupByNode) -> Result<()> {
    match group_by {
        ast::GroupByNode::All => {
            plan_error::not_implemented!("GROUP BY ALL");
        }
        ast::GroupByNode::Exprs(ast::GroupByExprs::Exprs(exprs)) => {
            for e in exprs {
                let lowered = crate::expr::builder::lower_expr(b, scope, e)?;
                let key_text = lowered.debug_string();
                super::aggregation::register_grouping_key(b, scope, key_text, lowered);
            }
            Ok(())
        }
        ast::GroupByNode::Exprs(ast::GroupByExprs::Rollup(_)) => {
            plan_error::not_implemented!("GROUP BY ROLLUP");
        }
        ast::GroupByNode::Exprs(ast::GroupByExprs::Cube(_)) => {
            plan_error::not_implemented!("GROUP BY CUBE");
        }
    }
}

pub(crate) fn build_order_by(b: &mut Builder, scope: &mut Scope, order_by: &[ast::OrderByExpr]) -> Result<Vec<SortField>> {
    order_by
        .iter()
        .map(|o| {
            let order = if o.descending { SortOrder::Descending } else { SortOrder::Ascending };
            let column = match &o.expr {
                ast::Expr::Literal(ast::Literal::Number(n)) if n.parse::<usize>().is_ok() => {
                    let position: usize = n.parse().unwrap();
                    let idx = position.checked_sub(1).ok_or_else(|| PlanError::resolution("ORDER BY position must be >= 1"))?;
                    let col = scope
                        .cols
                        .get(idx)
                        .ok_or_else(|| PlanError::resolution(format!("ORDER BY position {position} is out of range")))?;
                    col.as_column_ref(idx, None)
                }
                ast::Expr::Ident(ident) => {
                    let name = ident.normalized();
                    match scope.resolve_column("", &name, false) {
                        Some((col, idx)) => col.as_column_ref(idx, None),
                        None => match scope.resolve_in_extras("", &name) {
                            Some(col) => col.as_column_ref(0, None),
                            None => crate::expr::builder::lower_expr(b, scope, &o.expr)?,
                        },
                    }
                }
                other => crate::expr::builder::lower_expr(b, scope, other)?,
            };
            Ok(SortField { column, order })
        })
        .collect()
}

fn build_set_op(b: &mut Builder, scope: Scope, left: &ast::QueryNodeBody, right: &ast::QueryNodeBody, op: SetOperation, all: bool) -> Result<(PlanNode, Scope)> {
    let (left_node, left_scope) = build_query_body(b, scope.copy().push(), left)?;
    let (right_node, right_scope) = build_query_body(b, scope.copy().push(), right)?;

    if left_scope.cols.len() != right_scope.cols.len() {
        return Err(PlanError::arity(format!(
            "{op:?} operands must have the same number of columns: {} vs {}",
            left_scope.cols.len(),
            right_scope.cols.len()
        )));
    }

    let mut out_scope = scope.replace();
    for col in &left_scope.cols {
        let mut c = col.clone();
        c.table = String::new();
        c.scalar = None;
        out_scope.add_column(c);
    }

    let node = PlanNode::Union(Union {
        op,
        distinct: !all,
        left: Box::new(left_node),
        right: Box::new(right_node),
        order_by: Vec::new(),
        limit: None,
    });

    Ok((node, out_scope))
}

pub(crate) fn build_values(b: &mut Builder, mut scope: Scope, values: &ast::Values) -> Result<(PlanNode, Scope)> {
    let rows = values
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|e| crate::expr::builder::lower_expr(b, &mut scope, e))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let arity = rows.first().map(|r| r.len()).unwrap_or(0);
    if rows.iter().any(|r| r.len() != arity) {
        return Err(PlanError::arity("VALUES rows do not all have the same number of columns"));
    }
    for i in 0..arity {
        let sql_type = rows.first().and_then(|r| r.get(i)).map(Expression::sql_type).unwrap_or(plan_types::SqlType::Null);
        scope.new_column(String::new(), format!("column_{}", i + 1), sql_type, &mut b.alloc);
    }

    Ok((PlanNode::Values(Values { rows }), scope))
}

fn build_cte_defs(b: &mut Builder, scope: &mut Scope, defs: &ast::CteDefs) -> Result<()> {
    for cte in &defs.ctes {
        let cte_name = cte.name.normalized();
        let child = scope.copy().push();
        let (plan, mut cte_scope) = if defs.recursive {
            build_recursive_cte(b, child, &cte_name, &cte.body)?
        } else {
            build_query(b, child, &cte.body)?
        };
        cte_scope.node = Some(plan);
        if let Some(names) = &cte.column_names {
            cte_scope.set_col_alias(&names.iter().map(|i| i.normalized()).collect::<Vec<_>>())?;
        }
        cte_scope.set_table_alias(&cte_name);
        scope.ctes.insert(cte_name, cte_scope);
    }
    Ok(())
}

/// A recursive CTE's body is a `UNION [ALL]` whose left arm is the seed and
/// whose right arm may reference the CTE's own (not-yet-complete) shape by
/// name (spec §4.3's recursive CTE handling).
fn build_recursive_cte(b: &mut Builder, scope: Scope, name: &str, body: &ast::QueryNode) -> Result<(PlanNode, Scope)> {
    match &body.body {
        ast::QueryNodeBody::SetOp { left, right, op: SetOperation::Union, .. } => {
            let (seed_node, seed_scope) = build_query_body(b, scope.copy().push(), left)?;

            let mut self_scope = seed_scope.clone();
            self_scope.node = Some(seed_node.clone());
            self_scope.set_table_alias(name);

            let mut recursive_input = scope.copy().push();
            recursive_input.ctes.insert(name.to_string(), self_scope);
            let (recursive_node, _) = build_query_body(b, recursive_input, right)?;

            let mut out_scope = scope.replace();
            for col in &seed_scope.cols {
                let mut c = col.clone();
                c.table = String::new();
                c.scalar = None;
                out_scope.add_column(c);
            }
            let column_names = out_scope.cols.iter().map(|c| c.col.clone()).collect();

            let node = PlanNode::RecursiveCte(RecursiveCte {
                name: name.to_string(),
                column_names,
                seed: Box::new(seed_node),
                recursive_term: Box::new(recursive_node),
            });
            Ok((node, out_scope))
        }
        _ => Err(PlanError::syntax(format!(
            "recursive CTE '{name}' must be a UNION [ALL] of a seed and a recursive term"
        ))),
    }
}

fn build_from(b: &mut Builder, scope: Scope, from: &ast::FromNode) -> Result<(PlanNode, Scope)> {
    match from {
        ast::FromNode::Table { reference, alias, as_of } => build_table_source(b, scope, reference, alias.as_ref(), as_of.as_ref()),
        ast::FromNode::Derived { query, alias, lateral: _ } => build_derived_table(b, scope, query, alias),
        ast::FromNode::Values { values, alias } => build_value_derived_table(b, scope, values, alias),
        ast::FromNode::TableFunction { name, args, alias } => build_table_function(b, scope, name, args, alias.as_ref()),
        ast::FromNode::JsonTable { data, columns, alias } => build_json_table(b, scope, data, columns, alias),
        ast::FromNode::Join(join) => build_join(b, scope, join),
    }
}

pub(crate) fn build_table_source(
    b: &mut Builder,
    mut scope: Scope,
    reference: &ast::ObjectReference,
    alias: Option<&ast::TableAlias>,
    as_of: Option<&ast::Expr>,
) -> Result<(PlanNode, Scope)> {
    let (db, name) = reference.split();

    if db.is_none() {
        if let Some(mut cte_scope) = scope.ctes.get(&name).cloned() {
            if let Some(a) = alias {
                cte_scope.set_table_alias(&a.name.normalized());
                if let Some(names) = &a.column_aliases {
                    cte_scope.set_col_alias(&names.iter().map(|i| i.normalized()).collect::<Vec<_>>())?;
                }
            }
            let node = cte_scope.node.clone().unwrap_or(PlanNode::ResolvedDual);
            scope.append_columns_from_scope(&cte_scope);
            return Ok((node, scope));
        }
    }

    let as_of_expr = as_of.map(|e| crate::expr::builder::lower_expr(b, &mut scope, e)).transpose()?;
    let (table, database) = b.catalog.lookup_table(db.as_deref(), &name, as_of_expr.as_ref())?;
    let table_id = b.alloc.new_table_id();

    let table_alias = alias.map(|a| a.name.normalized()).unwrap_or_else(|| name.clone());
    let mut columns = Vec::new();
    for col in table.schema() {
        let id = b.alloc.new_column_id();
        columns.push(ScopeColumn {
            db: database.name().to_string(),
            table: table_alias.clone(),
            col: col.name.to_lowercase(),
            id,
            sql_type: col.sql_type.clone(),
            scalar: None,
            nullable: col.nullable,
            descending: false,
        });
    }

    if let Some(a) = alias {
        if let Some(names) = &a.column_aliases {
            if names.len() != columns.len() {
                return Err(PlanError::arity(format!(
                    "column alias list for '{table_alias}' has {} names but the table has {} columns",
                    names.len(),
                    columns.len()
                )));
            }
            for (col, new_name) in columns.iter_mut().zip(names) {
                col.col = new_name.normalized();
            }
        }
    }

    check_duplicate_table(&scope, &table_alias)?;
    for col in &columns {
        scope.add_column(col.clone());
    }
    scope.tables.insert(table_alias.clone(), table_id);

    let as_of_plan = as_of_expr.map(|e| match e {
        Expression::BindVar(_) => AsOf::Deferred(e),
        other => AsOf::Evaluated(other),
    });

    let mut node = PlanNode::ResolvedTable(ResolvedTable {
        database: database.name().to_string(),
        table: name,
        table_id,
        columns,
        as_of: as_of_plan,
    });
    // `AS alias` rewrites every column's table and wraps the node in a
    // table-alias (spec §4.3 point 3, "Named table").
    if alias.is_some() {
        node = PlanNode::TableAlias(TableAlias { alias: table_alias, input: Box::new(node) });
    }
    Ok((node, scope))
}

/// Spec §4.3 point 4's duplicate-alias check, applied to every FROM source
/// (not only joins: `FROM xy, xy` must fail the same way).
fn check_duplicate_table(scope: &Scope, alias: &str) -> Result<()> {
    if scope.tables.contains_key(alias) {
        Err(PlanError::resolution(format!("not unique table/alias: '{alias}'")))
    } else {
        Ok(())
    }
}

fn build_derived_table(b: &mut Builder, mut scope: Scope, query: &ast::QueryNode, alias: &ast::TableAlias) -> Result<(PlanNode, Scope)> {
    let child = scope.copy().push();
    let (plan, mut child_scope) = build_query(b, child, query)?;

    let table_alias = alias.name.normalized();
    child_scope.set_table_alias(&table_alias);
    if let Some(names) = &alias.column_aliases {
        child_scope.set_col_alias(&names.iter().map(|i| i.normalized()).collect::<Vec<_>>())?;
    }

    check_duplicate_table(&scope, &table_alias)?;
    let table_id = b.alloc.new_table_id();
    scope.tables.insert(table_alias.clone(), table_id);
    scope.append_columns_from_scope(&child_scope);

    let node = PlanNode::SubqueryAlias(SubqueryAlias {
        name: table_alias,
        column_renames: alias
            .column_aliases
            .as_ref()
            .map(|v| v.iter().map(|i| i.normalized()).collect())
            .unwrap_or_default(),
        cacheable: true,
        input: Box::new(plan),
    });
    Ok((node, scope))
}

fn build_value_derived_table(b: &mut Builder, mut scope: Scope, values: &ast::Values, alias: &ast::TableAlias) -> Result<(PlanNode, Scope)> {
    let (values_node, mut value_scope) = build_values(b, Scope::root(), values)?;

    let table_alias = alias.name.normalized();
    value_scope.set_table_alias(&table_alias);
    if let Some(names) = &alias.column_aliases {
        value_scope.set_col_alias(&names.iter().map(|i| i.normalized()).collect::<Vec<_>>())?;
    }

    check_duplicate_table(&scope, &table_alias)?;
    let table_id = b.alloc.new_table_id();
    scope.tables.insert(table_alias.clone(), table_id);
    scope.append_columns_from_scope(&value_scope);

    let node = PlanNode::ValueDerivedTable(ValueDerivedTable {
        alias: table_alias,
        column_renames: alias
            .column_aliases
            .as_ref()
            .map(|v| v.iter().map(|i| i.normalized()).collect())
            .unwrap_or_default(),
        values: Box::new(values_node),
    });
    Ok((node, scope))
}

fn build_table_function(
    b: &mut Builder,
    mut scope: Scope,
    name: &ast::ObjectReference,
    args: &[ast::Expr],
    alias: Option<&ast::TableAlias>,
) -> Result<(PlanNode, Scope)> {
    let (_, fn_name) = name.split();
    let lowered_args = args.iter().map(|a| crate::expr::builder::lower_expr(b, &mut scope, a)).collect::<Result<Vec<_>>>()?;
    let table_fn = b.catalog.lookup_table_function(&fn_name)?;
    let schema = table_fn.instantiate(&lowered_args)?;

    let table_alias = alias.map(|a| a.name.normalized()).unwrap_or_else(|| fn_name.clone());
    let mut columns = Vec::new();
    for col in &schema {
        let id = b.alloc.new_column_id();
        columns.push(ScopeColumn {
            db: String::new(),
            table: table_alias.clone(),
            col: col.name.to_lowercase(),
            id,
            sql_type: col.sql_type.clone(),
            scalar: None,
            nullable: col.nullable,
            descending: false,
        });
    }
    if let Some(a) = alias {
        if let Some(names) = &a.column_aliases {
            if names.len() != columns.len() {
                return Err(PlanError::arity(format!(
                    "column alias list for '{table_alias}' has {} names but '{fn_name}' returns {} columns",
                    names.len(),
                    columns.len()
                )));
            }
            for (col, new_name) in columns.iter_mut().zip(names) {
                col.col = new_name.normalized();
            }
        }
    }

    check_duplicate_table(&scope, &table_alias)?;
    let table_id = b.alloc.new_table_id();
    for col in &columns {
        scope.add_column(col.clone());
    }
    scope.tables.insert(table_alias.clone(), table_id);

    let node = PlanNode::TableFunctionCall(TableFunctionCall {
        name: fn_name,
        args: lowered_args,
        alias: table_alias,
        columns,
    });
    Ok((node, scope))
}

fn build_json_table(b: &mut Builder, mut scope: Scope, data: &ast::Expr, columns: &[ast::JsonTableColumn], alias: &ast::TableAlias) -> Result<(PlanNode, Scope)> {
    let data_expr = crate::expr::builder::lower_expr(b, &mut scope, data)?;
    let table_alias = alias.name.normalized();

    let mut plan_columns = Vec::with_capacity(columns.len());
    for col in columns {
        let sql_type = crate::expr::builder::resolve_data_type(&col.data_type)?;
        scope.new_column(table_alias.clone(), col.name.normalized(), sql_type.clone(), &mut b.alloc);
        plan_columns.push(JsonTableColumnPlan {
            name: col.name.normalized(),
            sql_type,
            path: col.path.clone(),
        });
    }

    check_duplicate_table(&scope, &table_alias)?;
    let table_id = b.alloc.new_table_id();
    scope.tables.insert(table_alias.clone(), table_id);

    let node = PlanNode::JsonTable(JsonTable {
        alias: table_alias,
        data: data_expr,
        columns: plan_columns,
    });
    Ok((node, scope))
}

fn build_join(b: &mut Builder, scope: Scope, join: &ast::Join) -> Result<(PlanNode, Scope)> {
    let (left_node, left_scope) = build_from(b, scope, &join.left)?;
    let left_col_ids: std::collections::HashSet<_> = left_scope.cols.iter().map(|c| c.id).collect();
    let (right_node, mut merged_scope) = build_from(b, left_scope, &join.right)?;

    let (condition, natural) = match &join.condition {
        ast::JoinCondition::On(e) => (Some(crate::expr::builder::lower_expr(b, &mut merged_scope, e)?), false),
        ast::JoinCondition::Using(using_cols) => {
            let mut conjuncts = Vec::with_capacity(using_cols.len());
            for c in using_cols {
                let name = c.normalized();
                let mut left_ref = None;
                let mut right_ref = None;
                for (idx, col) in merged_scope.cols.iter().enumerate() {
                    if col.col == name {
                        if left_col_ids.contains(&col.id) {
                            left_ref.get_or_insert_with(|| col.as_column_ref(idx, None));
                        } else {
                            right_ref.get_or_insert_with(|| col.as_column_ref(idx, None));
                        }
                    }
                }
                let (l, r) = match (left_ref, right_ref) {
                    (Some(l), Some(r)) => (l, r),
                    _ => return Err(PlanError::resolution(format!("USING column '{name}' not found on both sides of the join"))),
                };
                conjuncts.push(Expression::Compare {
                    left: Box::new(l),
                    op: CompareOp::Eq,
                    right: Box::new(r),
                });
            }
            let combined = conjuncts.into_iter().reduce(|a, c| Expression::Logical {
                left: Box::new(a),
                op: LogicalOp::And,
                right: Box::new(c),
            });
            (combined, false)
        }
        ast::JoinCondition::Natural => (None, true),
        ast::JoinCondition::None => (None, false),
    };

    let node = PlanNode::Join(Join {
        left: Box::new(left_node),
        right: Box::new(right_node),
        kind: join.kind,
        condition,
        natural,
    });
    Ok((node, merged_scope))
}
