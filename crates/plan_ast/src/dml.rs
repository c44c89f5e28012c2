//! DML AST node variants: INSERT/UPDATE/DELETE.

use crate::expr::{Expr, OrderByExpr};
use crate::ident::{Ident, ObjectReference};
use crate::query::QueryNode;

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Query(Box<QueryNode>),
    Values(Vec<Vec<Expr>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: Ident,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub table: ObjectReference,
    pub columns: Vec<Ident>,
    pub source: InsertSource,
    pub on_duplicate_key_update: Vec<Assignment>,
    pub replace: bool,
    pub ignore: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: ObjectReference,
    pub assignments: Vec<Assignment>,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Expr>,
    pub ignore: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    pub tables: Vec<ObjectReference>,
    pub from: ObjectReference,
    pub filter: Option<Expr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<Expr>,
}
