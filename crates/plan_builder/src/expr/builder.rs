//! AST `Expr` → `Expression` lowering (spec §4.2).

use plan_ast as ast;
use plan_error::{PlanError, Result};
use plan_types::{SqlType, Value};

use crate::context::VarScope;
use crate::expr::{
    AggregateExpr, ArithOp, BitOp, CaseExpr, ColumnRef, CompareOp, Expression, IntervalExpr, IntervalUnit, LogicalOp, WindowExpr,
    WindowFunctionKind,
};
use crate::functions::aggregate;
use crate::scope::Scope;
use crate::Builder;

/// Lower one scalar AST expression in `scope`.
pub fn lower_expr(b: &mut Builder, scope: &mut Scope, e: &ast::Expr) -> Result<Expression> {
    b.ctx.cancellation.check()?;
    match e {
        ast::Expr::Ident(ident) => lower_column_ref(scope, "", &ident.normalized()),
        ast::Expr::CompoundIdent(parts) => lower_compound_ident(scope, parts),
        ast::Expr::Literal(lit) => lower_literal(lit),
        ast::Expr::Wildcard(obj) => Ok(Expression::Star {
            qualifier: obj.as_ref().map(|o| o.split().1),
        }),
        ast::Expr::UnaryOp { op, expr } => lower_unary(b, scope, *op, expr),
        ast::Expr::BinaryOp { left, op, right } => lower_binary(b, scope, left, *op, right),
        ast::Expr::IsNull { expr, negated } => Ok(Expression::IsNull {
            expr: Box::new(lower_expr(b, scope, expr)?),
            negated: *negated,
        }),
        ast::Expr::IsBoolean { expr, value, negated } => Ok(Expression::IsBoolean {
            expr: Box::new(lower_expr(b, scope, expr)?),
            value: *value,
            negated: *negated,
        }),
        ast::Expr::Between { expr, low, high, negated } => Ok(Expression::Between {
            expr: Box::new(lower_expr(b, scope, expr)?),
            low: Box::new(lower_expr(b, scope, low)?),
            high: Box::new(lower_expr(b, scope, high)?),
            negated: *negated,
        }),
        ast::Expr::Like { expr, pattern, negated } => Ok(Expression::Like {
            expr: Box::new(lower_expr(b, scope, expr)?),
            pattern: Box::new(lower_expr(b, scope, pattern)?),
            negated: *negated,
        }),
        ast::Expr::Regexp { expr, pattern, negated } => Ok(Expression::Regexp {
            expr: Box::new(lower_expr(b, scope, expr)?),
            pattern: Box::new(lower_expr(b, scope, pattern)?),
            negated: *negated,
        }),
        ast::Expr::InList { expr, list, negated } => Ok(Expression::InTuple {
            expr: Box::new(lower_expr(b, scope, expr)?),
            list: list.iter().map(|x| lower_expr(b, scope, x)).collect::<Result<_>>()?,
            negated: *negated,
        }),
        ast::Expr::InSubquery { expr, subquery, negated } => {
            let lowered = lower_expr(b, scope, expr)?;
            let child = scope.clone().push();
            let (plan, _) = crate::plan::relational::build_query(b, child, subquery)?;
            Ok(Expression::InSubquery {
                expr: Box::new(lowered),
                subquery: Box::new(plan),
                negated: *negated,
            })
        }
        ast::Expr::Exists { subquery, negated } => {
            let child = scope.clone().push();
            let (plan, _) = crate::plan::relational::build_query(b, child, subquery)?;
            Ok(Expression::ExistsSubquery {
                subquery: Box::new(plan),
                negated: *negated,
            })
        }
        ast::Expr::Subquery(q) => {
            let child = scope.clone().push();
            let (plan, _) = crate::plan::relational::build_query(b, child, q)?;
            Ok(Expression::Subquery {
                plan: Box::new(plan),
                text: format!("{q:?}"),
            })
        }
        ast::Expr::Case(c) => lower_case(b, scope, c),
        ast::Expr::Interval(i) => Ok(Expression::Interval(IntervalExpr {
            value: Box::new(lower_expr(b, scope, &i.value)?),
            unit: lower_interval_unit(i.unit.clone()),
        })),
        ast::Expr::Substring { expr, from, len } => Ok(Expression::Substring {
            expr: Box::new(lower_expr(b, scope, expr)?),
            from: from.as_ref().map(|f| lower_expr(b, scope, f)).transpose()?.map(Box::new),
            len: len.as_ref().map(|l| lower_expr(b, scope, l)).transpose()?.map(Box::new),
        }),
        ast::Expr::Trim { expr, trim_chars } => Ok(Expression::Trim {
            expr: Box::new(lower_expr(b, scope, expr)?),
            trim_chars: trim_chars.as_ref().map(|t| lower_expr(b, scope, t)).transpose()?.map(Box::new),
        }),
        ast::Expr::Extract { field, expr } => Ok(Expression::Extract {
            unit: parse_extract_field(field)?,
            expr: Box::new(lower_expr(b, scope, expr)?),
        }),
        ast::Expr::TimestampDiff { unit, start, end } => Ok(Expression::TimestampDiff {
            unit: lower_interval_unit(unit.clone()),
            start: Box::new(lower_expr(b, scope, start)?),
            end: Box::new(lower_expr(b, scope, end)?),
        }),
        ast::Expr::Cast { expr, data_type } => Ok(Expression::Convert {
            expr: Box::new(lower_expr(b, scope, expr)?),
            target: resolve_data_type(data_type)?,
        }),
        ast::Expr::Collate { expr, collation } => Ok(Expression::Collated {
            expr: Box::new(lower_expr(b, scope, expr)?),
            collation: collation.normalized(),
        }),
        ast::Expr::Default => Ok(Expression::Default),
        ast::Expr::BindParameter(name) => Ok(Expression::BindVar(name.clone())),
        ast::Expr::SystemVariable { scope: var_scope, name } => Ok(Expression::SystemVariable {
            scope: lower_var_scope(*var_scope),
            name: name.normalized(),
        }),
        ast::Expr::UserVariable(name) => Ok(Expression::UserVariable(name.normalized())),
        ast::Expr::Function(call) => lower_function_call(b, scope, call),
        ast::Expr::Tuple(items) => Ok(Expression::Tuple(
            items.iter().map(|x| lower_expr(b, scope, x)).collect::<Result<_>>()?,
        )),
        ast::Expr::Alias { expr, alias } => {
            let lowered = lower_expr(b, scope, expr)?;
            Ok(Expression::Alias {
                name: alias.normalized(),
                expr: Box::new(lowered),
                unreferenceable: false,
            })
        }
        ast::Expr::CharsetLiteral { charset, text } => lower_charset_literal(b, charset, text),
    }
}

/// Lower a select-list item, applying spec §4.2's alias/unreferenceable
/// rule: an explicit `AS name` always wins; otherwise a structurally
/// "complex" expression gets wrapped with its own source text as an
/// unreferenceable alias.
pub fn lower_projection_item(b: &mut Builder, scope: &mut Scope, e: &ast::Expr, explicit_alias: Option<&str>, source_text: &str) -> Result<Expression> {
    let lowered = lower_expr(b, scope, e)?;
    if let Some(name) = explicit_alias {
        return Ok(Expression::Alias {
            name: name.to_lowercase(),
            expr: Box::new(lowered),
            unreferenceable: false,
        });
    }
    if is_complex(&lowered) {
        return Ok(Expression::Alias {
            name: source_text.to_string(),
            expr: Box::new(lowered),
            unreferenceable: true,
        });
    }
    Ok(lowered)
}

fn is_complex(e: &Expression) -> bool {
    matches!(
        e,
        Expression::Subquery { .. }
            | Expression::InSubquery { .. }
            | Expression::ExistsSubquery { .. }
            | Expression::Case(_)
            | Expression::InTuple { .. }
    )
}

fn lower_column_ref(scope: &Scope, qualifier: &str, name: &str) -> Result<Expression> {
    match scope.resolve_column(qualifier, name, true) {
        Some((col, idx)) => Ok(col.as_column_ref(idx, scope.tables.get(&col.table).copied())),
        None => Err(PlanError::resolution(format!(
            "unknown column '{}{}{}'",
            qualifier,
            if qualifier.is_empty() { "" } else { "." },
            name
        ))),
    }
}

fn lower_compound_ident(scope: &Scope, parts: &[ast::Ident]) -> Result<Expression> {
    match parts.len() {
        0 => Err(PlanError::syntax("empty compound identifier")),
        1 => lower_column_ref(scope, "", &parts[0].normalized()),
        _ => {
            let name = parts.last().unwrap().normalized();
            let qualifier = parts[parts.len() - 2].normalized();
            lower_column_ref(scope, &qualifier, &name)
        }
    }
}

fn lower_literal(lit: &ast::Literal) -> Result<Expression> {
    let value = match lit {
        ast::Literal::Number(text) => {
            if text.contains('.') || text.contains('e') || text.contains('E') {
                Value::decode_float(text)
            } else {
                Value::decode_integer(text)
            }
            .ok_or_else(|| PlanError::syntax(format!("invalid numeric literal '{text}'")))?
        }
        ast::Literal::SingleQuotedString(s) => Value::String(s.clone()),
        ast::Literal::ByteString(bytes) => Value::Bytes(bytes.clone()),
        ast::Literal::HexString(text) => {
            Value::decode_hex(text).ok_or_else(|| PlanError::syntax(format!("invalid hex literal '{text}'")))?
        }
        ast::Literal::BitString(text) => {
            Value::decode_bit(text).ok_or_else(|| PlanError::syntax(format!("invalid bit literal '{text}'")))?
        }
        ast::Literal::Boolean(b) => Value::Boolean(*b),
        ast::Literal::Null => Value::Null,
    };
    Ok(Expression::Literal(value))
}

fn lower_unary(b: &mut Builder, scope: &mut Scope, op: ast::UnaryOperator, expr: &ast::Expr) -> Result<Expression> {
    let inner = lower_expr(b, scope, expr)?;
    match op {
        ast::UnaryOperator::Plus => Ok(inner),
        ast::UnaryOperator::Minus => Ok(Expression::Arith {
            left: Box::new(Expression::Literal(Value::I8(0))),
            op: ArithOp::Sub,
            right: Box::new(inner),
        }),
        ast::UnaryOperator::Not => Ok(Expression::Not(Box::new(inner))),
    }
}

fn lower_binary(b: &mut Builder, scope: &mut Scope, left: &ast::Expr, op: ast::BinaryOperator, right: &ast::Expr) -> Result<Expression> {
    let left_is_interval = matches!(left, ast::Expr::Interval(_));
    let right_is_interval = matches!(right, ast::Expr::Interval(_));
    if left_is_interval && right_is_interval {
        return Err(PlanError::type_error("cannot combine two intervals"));
    }
    if (left_is_interval || right_is_interval) && !matches!(op, ast::BinaryOperator::Plus | ast::BinaryOperator::Minus) {
        return Err(PlanError::type_error("only +/- are valid with an interval operand"));
    }

    let l = lower_expr(b, scope, left)?;
    let r = lower_expr(b, scope, right)?;

    use ast::BinaryOperator as O;
    Ok(match op {
        O::Plus => Expression::Arith { left: Box::new(l), op: ArithOp::Add, right: Box::new(r) },
        O::Minus => Expression::Arith { left: Box::new(l), op: ArithOp::Sub, right: Box::new(r) },
        O::Multiply => Expression::Arith { left: Box::new(l), op: ArithOp::Mul, right: Box::new(r) },
        O::Divide => Expression::Arith { left: Box::new(l), op: ArithOp::Divide, right: Box::new(r) },
        O::Modulo => Expression::Arith { left: Box::new(l), op: ArithOp::Mod, right: Box::new(r) },
        O::IntDiv => Expression::Arith { left: Box::new(l), op: ArithOp::IntDiv, right: Box::new(r) },
        O::StringConcat => return b.catalog.lookup_function("concat")?.build(vec![l, r]),
        O::Gt => Expression::Compare { left: Box::new(l), op: CompareOp::Gt, right: Box::new(r) },
        O::Lt => Expression::Compare { left: Box::new(l), op: CompareOp::Lt, right: Box::new(r) },
        O::GtEq => Expression::Compare { left: Box::new(l), op: CompareOp::GtEq, right: Box::new(r) },
        O::LtEq => Expression::Compare { left: Box::new(l), op: CompareOp::LtEq, right: Box::new(r) },
        O::NullSafeEq => Expression::Compare { left: Box::new(l), op: CompareOp::NullSafeEq, right: Box::new(r) },
        O::Eq => Expression::Compare { left: Box::new(l), op: CompareOp::Eq, right: Box::new(r) },
        O::NotEq => Expression::Compare { left: Box::new(l), op: CompareOp::NotEq, right: Box::new(r) },
        O::And => Expression::Logical { left: Box::new(l), op: LogicalOp::And, right: Box::new(r) },
        O::Or => Expression::Logical { left: Box::new(l), op: LogicalOp::Or, right: Box::new(r) },
        O::Xor => Expression::Logical { left: Box::new(l), op: LogicalOp::Xor, right: Box::new(r) },
        O::BitwiseOr => Expression::Bitwise { left: Box::new(l), op: BitOp::Or, right: Box::new(r) },
        O::BitwiseAnd => Expression::Bitwise { left: Box::new(l), op: BitOp::And, right: Box::new(r) },
        O::BitwiseXor => Expression::Bitwise { left: Box::new(l), op: BitOp::Xor, right: Box::new(r) },
        O::ShiftLeft => Expression::Bitwise { left: Box::new(l), op: BitOp::ShiftLeft, right: Box::new(r) },
        O::ShiftRight => Expression::Bitwise { left: Box::new(l), op: BitOp::ShiftRight, right: Box::new(r) },
    })
}

fn lower_case(b: &mut Builder, scope: &mut Scope, c: &ast::CaseExpr) -> Result<Expression> {
    let operand = c.operand.as_ref().map(|o| lower_expr(b, scope, o)).transpose()?.map(Box::new);
    let whens = c
        .conditions
        .iter()
        .map(|(cond, then)| Ok((lower_expr(b, scope, cond)?, lower_expr(b, scope, then)?)))
        .collect::<Result<Vec<_>>>()?;
    let else_expr = c.else_expr.as_ref().map(|e| lower_expr(b, scope, e)).transpose()?.map(Box::new);
    Ok(Expression::Case(CaseExpr { operand, whens, else_expr }))
}

fn lower_interval_unit(u: ast::IntervalUnit) -> IntervalUnit {
    match u {
        ast::IntervalUnit::Microsecond => IntervalUnit::Microsecond,
        ast::IntervalUnit::Second => IntervalUnit::Second,
        ast::IntervalUnit::Minute => IntervalUnit::Minute,
        ast::IntervalUnit::Hour => IntervalUnit::Hour,
        ast::IntervalUnit::Day => IntervalUnit::Day,
        ast::IntervalUnit::Week => IntervalUnit::Week,
        ast::IntervalUnit::Month => IntervalUnit::Month,
        ast::IntervalUnit::Quarter => IntervalUnit::Quarter,
        ast::IntervalUnit::Year => IntervalUnit::Year,
    }
}

fn lower_var_scope(s: ast::VarScope) -> VarScope {
    match s {
        ast::VarScope::Session => VarScope::Session,
        ast::VarScope::Global => VarScope::Global,
        ast::VarScope::Persist => VarScope::Persist,
        ast::VarScope::PersistOnly => VarScope::PersistOnly,
        ast::VarScope::User => VarScope::User,
    }
}

fn parse_extract_field(field: &str) -> Result<IntervalUnit> {
    match field.to_lowercase().as_str() {
        "microsecond" => Ok(IntervalUnit::Microsecond),
        "second" => Ok(IntervalUnit::Second),
        "minute" => Ok(IntervalUnit::Minute),
        "hour" => Ok(IntervalUnit::Hour),
        "day" => Ok(IntervalUnit::Day),
        "week" => Ok(IntervalUnit::Week),
        "month" => Ok(IntervalUnit::Month),
        "quarter" => Ok(IntervalUnit::Quarter),
        "year" => Ok(IntervalUnit::Year),
        other => Err(PlanError::syntax(format!("unsupported EXTRACT field '{other}'"))),
    }
}

pub(crate) fn resolve_data_type(dt: &ast::DataTypeName) -> Result<SqlType> {
    let args = &dt.args;
    Ok(match dt.name.to_lowercase().as_str() {
        "signed" | "bigint" => SqlType::BigInt,
        "unsigned" => SqlType::UnsignedBigInt,
        "tinyint" => SqlType::TinyInt,
        "smallint" => SqlType::SmallInt,
        "int" | "integer" => SqlType::Int,
        "float" => SqlType::Float,
        "double" | "real" => SqlType::Double,
        "decimal" | "numeric" => SqlType::Decimal {
            precision: args.first().copied().unwrap_or(10) as u8,
            scale: args.get(1).copied().unwrap_or(0) as u8,
        },
        "date" => SqlType::Date,
        "time" => SqlType::Time,
        "datetime" => SqlType::Datetime,
        "timestamp" => SqlType::Timestamp,
        "year" => SqlType::Year,
        "char" => SqlType::Char(args.first().copied().unwrap_or(1)),
        "varchar" | "nchar" => SqlType::VarChar(args.first().copied().unwrap_or(255)),
        "text" => SqlType::Text,
        "binary" => SqlType::Binary(args.first().copied().unwrap_or(1)),
        "varbinary" => SqlType::VarBinary(args.first().copied().unwrap_or(255)),
        "blob" => SqlType::Blob,
        "bit" => SqlType::Bit(args.first().copied().unwrap_or(1)),
        "json" => SqlType::Json,
        other => return Err(PlanError::unsupported(format!("unsupported CAST target type '{other}'"))),
    })
}

fn lower_charset_literal(_b: &mut Builder, charset: &ast::Ident, text: &str) -> Result<Expression> {
    let charset_name = charset.normalized();
    let charset = plan_types::charset::lookup_charset(&charset_name)?;
    let decoded = charset.decode(text.as_bytes())?;
    Ok(Expression::Collated {
        expr: Box::new(Expression::Literal(Value::String(decoded))),
        collation: charset.default_collation.to_string(),
    })
}

fn lower_function_call(b: &mut Builder, scope: &mut Scope, call: &ast::FunctionCall) -> Result<Expression> {
    let (_, name) = call.name.split();

    if aggregate::is_aggregate_name(&name) {
        return crate::plan::aggregation::build_aggregate_call(b, scope, &name, call);
    }

    if let Some(spec) = &call.over {
        if let Some(kind) = window_kind(&name) {
            return lower_window_call(b, scope, kind, call, spec);
        }
    }

    let args = call
        .args
        .iter()
        .map(|a| match &a.expr {
            ast::FunctionArgExpr::Wildcard => Ok(Expression::Star { qualifier: None }),
            ast::FunctionArgExpr::Expr(e) => lower_expr(b, scope, e),
        })
        .collect::<Result<Vec<_>>>()?;

    let func = b.catalog.lookup_function(&name)?;
    func.build(args)
}

fn window_kind(name: &str) -> Option<WindowFunctionKind> {
    match name.to_lowercase().as_str() {
        "row_number" => Some(WindowFunctionKind::RowNumber),
        "percent_rank" => Some(WindowFunctionKind::PercentRank),
        "lag" => Some(WindowFunctionKind::Lag),
        "first_value" => Some(WindowFunctionKind::FirstValue),
        _ => None,
    }
}

fn lower_window_call(b: &mut Builder, scope: &mut Scope, kind: WindowFunctionKind, call: &ast::FunctionCall, spec: &ast::WindowSpec) -> Result<Expression> {
    let args = call
        .args
        .iter()
        .map(|a| match &a.expr {
            ast::FunctionArgExpr::Wildcard => Err(PlanError::syntax("'*' is not valid as a window function argument")),
            ast::FunctionArgExpr::Expr(e) => lower_expr(b, scope, e),
        })
        .collect::<Result<Vec<_>>>()?;

    if matches!(kind, WindowFunctionKind::Lag) && args.is_empty() {
        return Err(PlanError::arity("LAG requires at least one argument"));
    }
    if matches!(kind, WindowFunctionKind::FirstValue) && args.len() != 1 {
        return Err(PlanError::arity("FIRST_VALUE requires exactly one argument"));
    }

    let partition_by = spec
        .partition_by
        .iter()
        .map(|e| lower_expr(b, scope, e))
        .collect::<Result<Vec<_>>>()?;

    let order_by = spec
        .order_by
        .iter()
        .map(|o| {
            Ok(crate::expr::SortField {
                column: lower_expr(b, scope, &o.expr)?,
                order: if o.descending {
                    crate::expr::SortOrder::Descending
                } else {
                    crate::expr::SortOrder::Ascending
                },
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Expression::Window(WindowExpr {
        kind,
        args,
        partition_by,
        order_by,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::context::Context;
    use crate::ids::IdAllocator;

    struct EmptyCatalog;
    impl Catalog for EmptyCatalog {
        fn lookup_database(&self, name: &str) -> Result<Box<dyn crate::catalog::Database>> {
            Err(PlanError::resolution(format!("no such database: {name}")))
        }
        fn lookup_table(&self, _db: Option<&str>, name: &str, _as_of: Option<&Expression>) -> Result<(Box<dyn crate::catalog::Table>, Box<dyn crate::catalog::Database>)> {
            Err(PlanError::resolution(format!("no such table: {name}")))
        }
        fn lookup_function(&self, name: &str) -> Result<Box<dyn crate::catalog::Function>> {
            Err(PlanError::resolution(format!("no such function: {name}")))
        }
        fn lookup_table_function(&self, name: &str) -> Result<Box<dyn crate::catalog::TableFunction>> {
            Err(PlanError::resolution(format!("no such table function: {name}")))
        }
    }

    fn test_builder(ctx: &Context, catalog: &EmptyCatalog) -> Builder<'_> {
        Builder { ctx, catalog, alloc: IdAllocator::new() }
    }

    #[test]
    fn literal_integer_picks_smallest_width() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let mut b = test_builder(&ctx, &catalog);
        let mut scope = Scope::root();
        let e = lower_expr(&mut b, &mut scope, &ast::Expr::Literal(ast::Literal::Number("5".to_string()))).unwrap();
        assert_eq!(e.sql_type(), SqlType::TinyInt);
    }

    #[test]
    fn unknown_column_is_a_resolution_error() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let mut b = test_builder(&ctx, &catalog);
        let mut scope = Scope::root();
        let err = lower_expr(&mut b, &mut scope, &ast::Expr::Ident(ast::Ident::new("missing"))).unwrap_err();
        assert_eq!(err.kind(), plan_error::ErrorKind::Resolution);
    }

    #[test]
    fn unary_minus_is_zero_minus_expr() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let mut b = test_builder(&ctx, &catalog);
        let mut scope = Scope::root();
        let e = lower_expr(
            &mut b,
            &mut scope,
            &ast::Expr::UnaryOp {
                op: ast::UnaryOperator::Minus,
                expr: Box::new(ast::Expr::Literal(ast::Literal::Number("5".to_string()))),
            },
        )
        .unwrap();
        assert!(matches!(e, Expression::Arith { op: ArithOp::Sub, .. }));
    }

    #[test]
    fn two_intervals_cannot_combine() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let mut b = test_builder(&ctx, &catalog);
        let mut scope = Scope::root();
        let interval = ast::Expr::Interval(ast::IntervalExpr {
            value: Box::new(ast::Expr::Literal(ast::Literal::Number("1".to_string()))),
            unit: ast::IntervalUnit::Day,
        });
        let err = lower_expr(
            &mut b,
            &mut scope,
            &ast::Expr::BinaryOp {
                left: Box::new(interval.clone()),
                op: ast::BinaryOperator::Plus,
                right: Box::new(interval),
            },
        )
        .unwrap_err();
        assert_eq!(err.kind(), plan_error::ErrorKind::Type);
    }
}
