//! Relational AST node variants: SELECT, FROM, JOIN, set operations, CTEs,
//! derived tables, table-valued functions, VALUES, and JSON_TABLE.

use crate::expr::{Expr, OrderByExpr};
use crate::ident::{Ident, ObjectReference};

#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub ctes: Option<CteDefs>,
    pub body: QueryNodeBody,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Expr>,
    pub offset: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryNodeBody {
    Select(Box<SelectNode>),
    SetOp {
        left: Box<QueryNodeBody>,
        right: Box<QueryNodeBody>,
        op: SetOperation,
        all: bool,
    },
    Values(Values),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    Union,
    Except,
    Intersect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Values {
    pub rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CteDefs {
    pub recursive: bool,
    pub ctes: Vec<CommonTableExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpr {
    pub name: Ident,
    pub column_names: Option<Vec<Ident>>,
    pub body: QueryNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub distinct: bool,
    pub projections: Vec<SelectItem>,
    pub from: Option<FromNode>,
    pub filter: Option<Expr>,
    pub group_by: Option<GroupByNode>,
    pub having: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    QualifiedWildcard(ObjectReference),
    Expr(Expr),
    AliasedExpr(Expr, Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupByExprs {
    Exprs(Vec<Expr>),
    Rollup(Vec<Expr>),
    Cube(Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum GroupByNode {
    All,
    Exprs(GroupByExprs),
}

/// A single entry in the FROM clause, which may itself be a join tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FromNode {
    /// A named base table, optionally `AS OF <expr>` time-qualified.
    Table {
        reference: ObjectReference,
        alias: Option<TableAlias>,
        as_of: Option<Expr>,
    },
    /// A parenthesized subquery with a mandatory alias.
    Derived {
        query: Box<QueryNode>,
        alias: TableAlias,
        lateral: bool,
    },
    Values {
        values: Values,
        alias: TableAlias,
    },
    TableFunction {
        name: ObjectReference,
        args: Vec<Expr>,
        alias: Option<TableAlias>,
    },
    JsonTable {
        data: Box<Expr>,
        columns: Vec<JsonTableColumn>,
        alias: TableAlias,
    },
    Join(Box<Join>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonTableColumn {
    pub name: Ident,
    pub data_type: crate::expr::DataTypeName,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableAlias {
    pub name: Ident,
    pub column_aliases: Option<Vec<Ident>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<Ident>),
    Natural,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: FromNode,
    pub right: FromNode,
    pub kind: JoinKind,
    pub condition: JoinCondition,
}
