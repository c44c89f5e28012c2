//! Top-level statement AST, dispatched on by the builder's parse entry point.

use crate::ddl::{AlterTable, CreateDatabase, CreateTable, DropStatement, RenameTable, TruncateTable};
use crate::dml::{Delete, Insert, Update};
use crate::ident::{Ident, ObjectReference};
use crate::query::QueryNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionCharacteristic {
    ReadWrite,
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantOrRevoke {
    pub is_grant: bool,
    pub privileges: Vec<String>,
    pub object: ObjectReference,
    pub to: Vec<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ShowStatement {
    Tables { database: Option<Ident> },
    Databases,
    Columns { table: ObjectReference },
    CreateTable(ObjectReference),
    Variables,
    Warnings,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Query(QueryNode),

    CreateTable(CreateTable),
    CreateDatabase(CreateDatabase),
    CreateRole { name: Ident },
    AlterTable(AlterTable),
    Drop(DropStatement),
    RenameTable(RenameTable),
    TruncateTable(TruncateTable),

    Insert(Insert),
    Update(Update),
    Delete(Delete),

    StartTransaction(TransactionCharacteristic),
    Commit,
    Rollback,
    Savepoint(Ident),

    GrantOrRevoke(GrantOrRevoke),
    Show(ShowStatement),

    /// A statement the builder intentionally does not implement, preserved
    /// here as a tag so the dispatcher can raise a uniform
    /// "unsupported syntax" error naming it.
    Unsupported(String),
}
