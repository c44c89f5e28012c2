//! Scalar expression AST node variants, enumerated abstractly: the grammar
//! that produces these nodes is out of scope (see crate docs).

use crate::ident::{Ident, ObjectReference};
use crate::query::QueryNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Plus,
    Minus,
    Multiply,
    Divide,
    IntDiv,
    Modulo,
    StringConcat,
    Gt,
    Lt,
    GtEq,
    LtEq,
    NullSafeEq,
    Eq,
    NotEq,
    And,
    Or,
    Xor,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    ShiftLeft,
    ShiftRight,
}

impl BinaryOperator {
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseXor
                | BinaryOperator::ShiftLeft
                | BinaryOperator::ShiftRight
        )
    }

    pub fn source_text(self) -> &'static str {
        match self {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::IntDiv => "DIV",
            BinaryOperator::Modulo => "%",
            BinaryOperator::StringConcat => "||",
            BinaryOperator::Gt => ">",
            BinaryOperator::Lt => "<",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::NullSafeEq => "<=>",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "<>",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Xor => "XOR",
            BinaryOperator::BitwiseOr => "|",
            BinaryOperator::BitwiseAnd => "&",
            BinaryOperator::BitwiseXor => "^",
            BinaryOperator::ShiftLeft => "<<",
            BinaryOperator::ShiftRight => ">>",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Unparsed number text; the expression builder decides integer vs.
    /// float and the smallest fitting width.
    Number(String),
    SingleQuotedString(String),
    /// `_charset'text'` or `x'..'` style byte literal.
    ByteString(Vec<u8>),
    HexString(String),
    BitString(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionArg {
    pub name: Option<Ident>,
    pub expr: FunctionArgExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionArgExpr {
    Wildcard,
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: ObjectReference,
    pub args: Vec<FunctionArg>,
    pub distinct: bool,
    pub filter: Option<Box<Expr>>,
    pub over: Option<WindowSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub partition_by: Vec<Expr>,
    pub order_by: Vec<OrderByExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub expr: Expr,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub operand: Option<Box<Expr>>,
    pub conditions: Vec<(Expr, Expr)>,
    pub else_expr: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
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
    pub value: Box<Expr>,
    pub unit: IntervalUnit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A single unqualified identifier, resolved as a column reference.
    Ident(Ident),
    /// A dotted `table.col` (or longer) reference.
    CompoundIdent(Vec<Ident>),
    Literal(Literal),
    /// `*` or `table.*`.
    Wildcard(Option<ObjectReference>),
    UnaryOp {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    IsBoolean {
        expr: Box<Expr>,
        value: bool,
        negated: bool,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Regexp {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<QueryNode>,
        negated: bool,
    },
    Exists {
        subquery: Box<QueryNode>,
        negated: bool,
    },
    Subquery(Box<QueryNode>),
    Case(CaseExpr),
    Interval(IntervalExpr),
    Substring {
        expr: Box<Expr>,
        from: Option<Box<Expr>>,
        len: Option<Box<Expr>>,
    },
    Trim {
        expr: Box<Expr>,
        trim_chars: Option<Box<Expr>>,
    },
    Extract {
        field: String,
        expr: Box<Expr>,
    },
    TimestampDiff {
        unit: IntervalUnit,
        start: Box<Expr>,
        end: Box<Expr>,
    },
    Cast {
        expr: Box<Expr>,
        data_type: DataTypeName,
    },
    Collate {
        expr: Box<Expr>,
        collation: Ident,
    },
    Default,
    BindParameter(String),
    SystemVariable {
        scope: VarScope,
        name: Ident,
    },
    UserVariable(Ident),
    Function(FunctionCall),
    Tuple(Vec<Expr>),
    Alias {
        expr: Box<Expr>,
        alias: Ident,
    },
    /// `_charset'text'` — a character-set introducer prefixing a string
    /// literal, e.g. `_utf8mb4'hello'`.
    CharsetLiteral {
        charset: Ident,
        text: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Session,
    Global,
    Persist,
    PersistOnly,
    User,
}

/// Unresolved type name as written in `CAST(x AS <type>)` or a column
/// definition; resolved into `plan_types::SqlType` during lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct DataTypeName {
    pub name: String,
    pub args: Vec<u32>,
}
