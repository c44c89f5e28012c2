//! Typed scalar expression tree produced by lowering AST expressions (§4.2).
//!
//! Expressions are a closed, tagged-variant sum type (spec §9: "tagged
//! variants over inheritance"); dispatch is structural pattern matching, not
//! virtual dispatch, except where a function/aggregate catalog entry is
//! genuinely open-ended (`Box<dyn ...>`, following the teacher's
//! `functions::aggregate::AggregateFunction` pattern).

pub mod builder;

use std::fmt;

use plan_types::{SqlType, Value};

use crate::functions::aggregate::AggregateFunction;
use crate::ids::{ColumnId, TableId};

/// A resolved, in-scope column reference: "get-field-with-table" in spec
/// terms, carrying `(index, type, table, name, nullable)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
    pub id: ColumnId,
    pub table_id: Option<TableId>,
    pub table: String,
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    /// 0-based index within the scope it was resolved against, used to
    /// build stable execution-time row layouts (`outerScopeLen` offsetting,
    /// spec §4.1).
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Divide,
    Mod,
    IntDiv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
    ShiftLeft,
    ShiftRight,
}

impl BitOp {
    pub fn source_text(self) -> &'static str {
        match self {
            BitOp::And => "&",
            BitOp::Or => "|",
            BitOp::Xor => "^",
            BitOp::ShiftLeft => "<<",
            BitOp::ShiftRight => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    NullSafeEq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Xor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortField {
    pub column: Expression,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub operand: Option<Box<Expression>>,
    pub whens: Vec<(Expression, Expression)>,
    pub else_expr: Option<Box<Expression>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Microsecond,
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntervalExpr {
    pub value: Box<Expression>,
    pub unit: IntervalUnit,
}

/// An aggregate function call recorded in a `GroupByState` (spec §4.4).
#[derive(Debug, Clone)]
pub struct AggregateExpr {
    pub func: Box<dyn AggregateFunction>,
    pub args: Vec<Expression>,
    pub distinct: bool,
    pub output_type: SqlType,
}

impl PartialEq for AggregateExpr {
    fn eq(&self, other: &Self) -> bool {
        self.func.name() == other.func.name()
            && self.args == other.args
            && self.distinct == other.distinct
    }
}

/// The four window functions the kernel implements (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFunctionKind {
    RowNumber,
    PercentRank,
    Lag,
    FirstValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowExpr {
    pub kind: WindowFunctionKind,
    /// Value expression(s): empty for `ROW_NUMBER`/`PERCENT_RANK`, the
    /// target expression for `FIRST_VALUE`, `(expr, offset, default)` args
    /// for `LAG`.
    pub args: Vec<Expression>,
    pub partition_by: Vec<Expression>,
    pub order_by: Vec<SortField>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Column(ColumnRef),
    Arith {
        left: Box<Expression>,
        op: ArithOp,
        right: Box<Expression>,
    },
    Bitwise {
        left: Box<Expression>,
        op: BitOp,
        right: Box<Expression>,
    },
    Compare {
        left: Box<Expression>,
        op: CompareOp,
        right: Box<Expression>,
    },
    Logical {
        left: Box<Expression>,
        op: LogicalOp,
        right: Box<Expression>,
    },
    Not(Box<Expression>),
    IsNull {
        expr: Box<Expression>,
        negated: bool,
    },
    IsBoolean {
        expr: Box<Expression>,
        value: bool,
        negated: bool,
    },
    Like {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        negated: bool,
    },
    Regexp {
        expr: Box<Expression>,
        pattern: Box<Expression>,
        negated: bool,
    },
    Between {
        expr: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    InTuple {
        expr: Box<Expression>,
        list: Vec<Expression>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expression>,
        subquery: Box<crate::plan::PlanNode>,
        negated: bool,
    },
    ExistsSubquery {
        subquery: Box<crate::plan::PlanNode>,
        negated: bool,
    },
    Subquery {
        plan: Box<crate::plan::PlanNode>,
        text: String,
    },
    Case(CaseExpr),
    Interval(IntervalExpr),
    Extract {
        unit: IntervalUnit,
        expr: Box<Expression>,
    },
    TimestampDiff {
        unit: IntervalUnit,
        start: Box<Expression>,
        end: Box<Expression>,
    },
    /// The bare `DEFAULT` keyword in an INSERT/UPDATE value position,
    /// referring to the target column's declared default.
    Default,
    Substring {
        expr: Box<Expression>,
        from: Option<Box<Expression>>,
        len: Option<Box<Expression>>,
    },
    Trim {
        expr: Box<Expression>,
        trim_chars: Option<Box<Expression>>,
    },
    Convert {
        expr: Box<Expression>,
        target: SqlType,
    },
    Collated {
        expr: Box<Expression>,
        collation: String,
    },
    Alias {
        name: String,
        expr: Box<Expression>,
        unreferenceable: bool,
    },
    Star {
        qualifier: Option<String>,
    },
    SetField {
        name: String,
        expr: Box<Expression>,
    },
    BindVar(String),
    SystemVariable {
        scope: crate::context::VarScope,
        name: String,
    },
    UserVariable(String),
    Tuple(Vec<Expression>),
    Aggregate(AggregateExpr),
    Window(WindowExpr),
}

impl Expression {
    /// Best-effort resolved type of this expression. Most variants carry
    /// their type inline (columns, casts); composite variants recurse.
    pub fn sql_type(&self) -> SqlType {
        match self {
            Expression::Literal(v) => v.sql_type(),
            Expression::Column(c) => c.sql_type.clone(),
            Expression::Arith { left, .. } => left.sql_type(),
            Expression::Bitwise { .. } => SqlType::BigInt,
            Expression::Compare { .. }
            | Expression::Logical { .. }
            | Expression::Not(_)
            | Expression::IsNull { .. }
            | Expression::IsBoolean { .. }
            | Expression::Like { .. }
            | Expression::Regexp { .. }
            | Expression::Between { .. }
            | Expression::InTuple { .. }
            | Expression::InSubquery { .. }
            | Expression::ExistsSubquery { .. } => SqlType::Boolean,
            Expression::Subquery { .. } => SqlType::Null,
            Expression::Case(c) => c
                .whens
                .first()
                .map(|(_, then)| then.sql_type())
                .unwrap_or(SqlType::Null),
            Expression::Interval(_) => SqlType::Null,
            Expression::Extract { .. } => SqlType::Int,
            Expression::TimestampDiff { .. } => SqlType::BigInt,
            Expression::Default => SqlType::Null,
            Expression::Substring { expr, .. } | Expression::Trim { expr, .. } => expr.sql_type(),
            Expression::Convert { target, .. } => target.clone(),
            Expression::Collated { expr, .. } => expr.sql_type(),
            Expression::Alias { expr, .. } => expr.sql_type(),
            Expression::Star { .. } => SqlType::Null,
            Expression::SetField { expr, .. } => expr.sql_type(),
            Expression::BindVar(_) => SqlType::Null,
            Expression::SystemVariable { .. } | Expression::UserVariable(_) => SqlType::Text,
            Expression::Tuple(_) => SqlType::Null,
            Expression::Aggregate(a) => a.output_type.clone(),
            Expression::Window(_) => SqlType::Null,
        }
    }

    /// Render this expression the way `debug_string()` needs: a short,
    /// deterministic, single-line rendering (spec §6, "plan node surface").
    pub fn debug_string(&self) -> String {
        match self {
            Expression::Literal(v) => format!("{v} literal {}", v.sql_type()),
            Expression::Column(c) => {
                if c.table.is_empty() {
                    format!("{}:{}", c.name, c.id)
                } else {
                    format!("{}.{}:{}", c.table, c.name, c.id)
                }
            }
            Expression::Arith { left, op, right } => format!(
                "({} {} {})",
                left.debug_string(),
                arith_sym(*op),
                right.debug_string()
            ),
            Expression::Bitwise { left, op, right } => format!(
                "({} {} {})",
                left.debug_string(),
                op.source_text(),
                right.debug_string()
            ),
            Expression::Compare { left, op, right } => format!(
                "{} {} {}",
                left.debug_string(),
                compare_sym(*op),
                right.debug_string()
            ),
            Expression::Logical { left, op, right } => format!(
                "({} {} {})",
                left.debug_string(),
                logical_sym(*op),
                right.debug_string()
            ),
            Expression::Not(e) => format!("NOT({})", e.debug_string()),
            Expression::IsNull { expr, negated } => {
                format!("{} IS{} NULL", expr.debug_string(), if *negated { " NOT" } else { "" })
            }
            Expression::IsBoolean { expr, value, negated } => format!(
                "{} IS{} {}",
                expr.debug_string(),
                if *negated { " NOT" } else { "" },
                value
            ),
            Expression::Like { expr, pattern, negated } => format!(
                "{}{} LIKE {}",
                expr.debug_string(),
                if *negated { " NOT" } else { "" },
                pattern.debug_string()
            ),
            Expression::Regexp { expr, pattern, negated } => format!(
                "{}{} REGEXP {}",
                expr.debug_string(),
                if *negated { " NOT" } else { "" },
                pattern.debug_string()
            ),
            Expression::Between { expr, low, high, negated } => format!(
                "{}{} BETWEEN {} AND {}",
                expr.debug_string(),
                if *negated { " NOT" } else { "" },
                low.debug_string(),
                high.debug_string()
            ),
            Expression::InTuple { expr, list, negated } => format!(
                "{}{} IN ({})",
                expr.debug_string(),
                if *negated { " NOT" } else { "" },
                list.iter().map(Expression::debug_string).collect::<Vec<_>>().join(", ")
            ),
            Expression::InSubquery { expr, negated, .. } => format!(
                "InSubquery(left={}{})",
                expr.debug_string(),
                if *negated { ", negated" } else { "" }
            ),
            Expression::ExistsSubquery { negated, .. } => {
                format!("{}Exists(...)", if *negated { "Not" } else { "" })
            }
            Expression::Subquery { text, .. } => format!("Subquery({text})"),
            Expression::Case(_) => "Case(...)".to_string(),
            Expression::Interval(i) => format!("Interval({}, {:?})", i.value.debug_string(), i.unit),
            Expression::Extract { unit, expr } => format!("Extract({:?}, {})", unit, expr.debug_string()),
            Expression::TimestampDiff { unit, start, end } => {
                format!("TimestampDiff({:?}, {}, {})", unit, start.debug_string(), end.debug_string())
            }
            Expression::Default => "DEFAULT".to_string(),
            Expression::Substring { expr, .. } => format!("Substring({})", expr.debug_string()),
            Expression::Trim { expr, .. } => format!("Trim({})", expr.debug_string()),
            Expression::Convert { expr, target } => format!("Convert({}, {target})", expr.debug_string()),
            Expression::Collated { expr, collation } => {
                format!("{} COLLATE {collation}", expr.debug_string())
            }
            Expression::Alias { name, expr, .. } => format!("{} AS {name}", expr.debug_string()),
            Expression::Star { qualifier } => match qualifier {
                Some(q) => format!("{q}.*"),
                None => "*".to_string(),
            },
            Expression::SetField { name, expr } => format!("{name} = {}", expr.debug_string()),
            Expression::BindVar(name) => format!(":{name}"),
            Expression::SystemVariable { name, .. } => format!("@@{name}"),
            Expression::UserVariable(name) => format!("@{name}"),
            Expression::Tuple(exprs) => format!(
                "({})",
                exprs.iter().map(Expression::debug_string).collect::<Vec<_>>().join(", ")
            ),
            Expression::Aggregate(a) => format!(
                "{}({}{})",
                a.func.name().to_uppercase(),
                if a.distinct { "DISTINCT " } else { "" },
                a.args.iter().map(Expression::debug_string).collect::<Vec<_>>().join(", ")
            ),
            Expression::Window(w) => format!("{:?}(...)", w.kind),
        }
    }
}

fn arith_sym(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "+",
        ArithOp::Sub => "-",
        ArithOp::Mul => "*",
        ArithOp::Divide => "/",
        ArithOp::Mod => "%",
        ArithOp::IntDiv => "DIV",
    }
}

fn compare_sym(op: CompareOp) -> &'static str {
    match op {
        CompareOp::Eq => "=",
        CompareOp::NotEq => "<>",
        CompareOp::Lt => "<",
        CompareOp::LtEq => "<=",
        CompareOp::Gt => ">",
        CompareOp::GtEq => ">=",
        CompareOp::NullSafeEq => "<=>",
    }
}

fn logical_sym(op: LogicalOp) -> &'static str {
    match op {
        LogicalOp::And => "AND",
        LogicalOp::Or => "OR",
        LogicalOp::Xor => "XOR",
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.debug_string())
    }
}
