//! Aggregation plan node payloads (spec §4.4): the group-by node produced
//! by the aggregation planner, and the having node that may wrap it.

use plan_ast as ast;
use plan_error::Result;
use plan_types::Value;

use crate::expr::{AggregateExpr, Expression};
use crate::functions::aggregate;
use crate::ids::ColumnId;
use crate::scope::{Scope, ScopeColumn};
use crate::Builder;

use super::PlanNode;

/// Concatenation of (a) aggregate input expressions, (b) the aggregate
/// functions themselves, (c) projection-needed pass-through columns, and
/// (d) ORDER BY/HAVING extras (spec §4.3 point 11).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub input: Box<PlanNode>,
    pub group_exprs: Vec<Expression>,
    pub group_keys: Vec<ColumnId>,
    pub aggregates: Vec<AggregateExpr>,
    pub pass_through: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Having {
    pub predicate: Expression,
    pub input: Box<PlanNode>,
}

/// Lower an aggregate function call encountered anywhere in the projection,
/// HAVING, or ORDER BY clause of the scope currently being analyzed (spec
/// §4.4's exact five-step algorithm).
pub fn build_aggregate_call(b: &mut Builder, scope: &mut Scope, name: &str, call: &ast::FunctionCall) -> Result<Expression> {
    if scope.group_by.is_none() {
        scope.group_by = Some(Default::default());
    }

    if name == "count" && call.args.len() == 1 && matches!(call.args[0].expr, ast::FunctionArgExpr::Wildcard) {
        return register_aggregate(b, scope, "count", vec![Expression::Literal(Value::I8(1))], false);
    }

    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        match &arg.expr {
            ast::FunctionArgExpr::Wildcard => {
                return Err(plan_error::PlanError::syntax(format!(
                    "'*' is only valid as the sole argument to COUNT(*), not {}",
                    name.to_uppercase()
                )));
            }
            ast::FunctionArgExpr::Expr(e) => {
                let lowered = crate::expr::builder::lower_expr(b, scope, e)?;
                note_aggregate_input(scope, &lowered);
                args.push(lowered);
            }
        }
    }

    register_aggregate(b, scope, name, args, call.distinct)
}

/// If a lowered aggregate argument is a plain column reference, record it as
/// an aggregate input column (spec §3's `GroupByState.inCols`) so the group
/// node knows what it must carry through from its input.
fn note_aggregate_input(scope: &mut Scope, lowered: &Expression) {
    if let Expression::Column(c) = lowered {
        let sc = ScopeColumn {
            db: String::new(),
            table: c.table.clone(),
            col: c.name.clone(),
            id: c.id,
            sql_type: c.sql_type.clone(),
            scalar: None,
            nullable: c.nullable,
            descending: false,
        };
        if let Some(gb) = &mut scope.group_by {
            if !gb.in_cols.iter().any(|existing| existing.id == sc.id) {
                gb.in_cols.push(sc);
            }
        }
    }
}

fn register_aggregate(b: &mut Builder, scope: &mut Scope, name: &str, args: Vec<Expression>, distinct: bool) -> Result<Expression> {
    let input_types: Vec<_> = args.iter().map(Expression::sql_type).collect();
    let func = aggregate::lookup(name)?;
    let output_type = func.return_type(&input_types)?;

    let key = format!(
        "{}({}{})",
        name,
        if distinct { "distinct " } else { "" },
        args.iter().map(Expression::debug_string).collect::<Vec<_>>().join(", ")
    );

    let agg_expr = Expression::Aggregate(AggregateExpr {
        func,
        args,
        distinct,
        output_type: output_type.clone(),
    });

    let gb = scope.group_by.as_mut().expect("group-by state initialized above");
    let (id, _is_new) = gb.record_aggregate(key, agg_expr, output_type.clone(), &mut b.alloc);

    Ok(Expression::Column(crate::expr::ColumnRef {
        id,
        table_id: None,
        table: String::new(),
        name: format!("{}(...)", name.to_uppercase()),
        sql_type: output_type,
        nullable: true,
        index: 0,
    }))
}

/// Register a GROUP BY key expression in the scope's aggregation state
/// (spec §4.3 point 8), returning a reference to it the same way an
/// aggregate call does.
pub fn register_grouping_key(b: &mut Builder, scope: &mut Scope, key_text: String, lowered: Expression) -> ColumnId {
    if scope.group_by.is_none() {
        scope.group_by = Some(Default::default());
    }
    let sql_type = lowered.sql_type();
    let col = if let Expression::Column(c) = &lowered {
        ScopeColumn {
            db: String::new(),
            table: c.table.clone(),
            col: c.name.clone(),
            id: c.id,
            sql_type: sql_type.clone(),
            scalar: None,
            nullable: c.nullable,
            descending: false,
        }
    } else {
        let mut sc = ScopeColumn::new("", key_text.clone(), ColumnId(0), sql_type.clone());
        sc.scalar = Some(lowered);
        sc
    };
    let gb = scope.group_by.as_mut().expect("group-by state initialized above");
    gb.record_grouping_key(key_text, col, &mut b.alloc)
}

/// Assemble the `GroupBy` plan node from the scope's accumulated
/// aggregation state, once every projection/HAVING/ORDER BY item that could
/// have registered an aggregate or grouping key has been analyzed (spec §4.3
/// point 11's concatenation order: input columns, aggregate functions,
/// pass-through columns, then ORDER BY/HAVING extras).
pub fn finalize_group_by(input: PlanNode, scope: &Scope) -> Option<GroupBy> {
    let gb = scope.group_by.as_ref()?;

    let group_exprs = gb
        .out_cols
        .iter()
        .filter(|c| gb.grouping.contains(&c.id))
        .map(|c| c.scalar.clone().unwrap_or_else(|| c.as_column_ref(0, None)))
        .collect();

    let aggregates = gb
        .agg_exprs
        .iter()
        .filter_map(|(_, expr)| match expr {
            Expression::Aggregate(a) => Some(a.clone()),
            _ => None,
        })
        .collect();

    let pass_through = scope
        .extra_cols
        .iter()
        .map(|c| c.as_column_ref(0, None))
        .collect();

    Some(GroupBy {
        input: Box::new(input),
        group_exprs,
        group_keys: gb.grouping.clone(),
        aggregates,
        pass_through,
    })
}
