//! DDL AST node variants: CREATE/ALTER/DROP/RENAME/TRUNCATE.

use crate::expr::{DataTypeName, Expr};
use crate::ident::{Ident, ObjectReference};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: Ident,
    pub data_type: DataTypeName,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<ColumnDefault>,
    pub comment: Option<String>,
    pub srid: Option<u32>,
    pub charset: Option<Ident>,
    pub collation: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefault {
    pub expr: Expr,
    /// Whether the default expression was written with enclosing
    /// parentheses, e.g. `DEFAULT (1 + 1)` vs. `DEFAULT 1`.
    pub parenthesized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMethod {
    BTree,
    Hash,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    pub name: Option<Ident>,
    pub columns: Vec<Ident>,
    pub unique: bool,
    pub primary: bool,
    pub method: IndexMethod,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub name: Option<Ident>,
    pub columns: Vec<Ident>,
    pub referenced_table: ObjectReference,
    pub referenced_columns: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckDef {
    pub name: Option<Ident>,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateTableSource {
    /// Explicit column/index/constraint spec.
    Spec {
        columns: Vec<ColumnDef>,
        indexes: Vec<IndexDef>,
        foreign_keys: Vec<ForeignKeyDef>,
        checks: Vec<CheckDef>,
    },
    /// `LIKE <table>`.
    Like(ObjectReference),
    /// `AS SELECT ...`.
    AsSelect(Box<crate::query::QueryNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: ObjectReference,
    pub if_not_exists: bool,
    pub source: CreateTableSource,
    pub charset: Option<Ident>,
    pub collation: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterIndexAction {
    Create(IndexDef),
    Drop(Ident),
    Rename { from: Ident, to: Ident },
    Enable(Ident),
    Disable(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterColumnAction {
    Add(ColumnDef),
    Drop(Ident),
    Rename { from: Ident, to: Ident },
    Modify(ColumnDef),
    Change { old_name: Ident, new_def: ColumnDef },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterConstraintAction {
    AddForeignKey(ForeignKeyDef),
    DropForeignKey(Ident),
    AddCheck(CheckDef),
    DropCheck(Ident),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableAction {
    Index(AlterIndexAction),
    Column(AlterColumnAction),
    AutoIncrement(u64),
    Default { column: Ident, default: Option<ColumnDefault> },
    Collation(Ident),
    Constraint(AlterConstraintAction),
    /// A syntactically valid but unimplemented clause; the name identifies
    /// the clause for the resulting "unsupported syntax" error.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    pub name: ObjectReference,
    pub action: AlterTableAction,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropObjectKind {
    Table,
    Database,
    View,
    Index,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropStatement {
    pub kind: DropObjectKind,
    pub names: Vec<ObjectReference>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameTable {
    pub pairs: Vec<(ObjectReference, ObjectReference)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateTable {
    pub name: ObjectReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabase {
    pub name: Ident,
    pub if_not_exists: bool,
}
