//! Catalog interface: the database/table/function discovery collaborator.
//!
//! Described only by its contract (spec §6) — no implementation lives here.
//! A real catalog (backed by a storage engine) implements `Catalog` and is
//! handed to the builder for the duration of one `parse` call.

use std::fmt::Debug;

use plan_error::Result;
use plan_types::SqlType;

use crate::expr::Expression;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
}

/// A resolved database.
pub trait Database: Debug {
    fn name(&self) -> &str;
}

/// A resolved table (or view). `schema` enumerates its columns in
/// declaration order.
pub trait Table: Debug {
    fn name(&self) -> &str;
    fn schema(&self) -> &[Column];
}

/// A resolved scalar or aggregate function. Builds an expression from
/// already-lowered argument expressions.
pub trait Function: Debug {
    fn name(&self) -> &str;
    fn is_aggregate(&self) -> bool;
    fn build(&self, args: Vec<Expression>) -> Result<Expression>;
}

/// A resolved table-valued function, capable of materializing a schema once
/// instantiated with concrete arguments.
pub trait TableFunction: Debug {
    fn name(&self) -> &str;
    fn instantiate(&self, args: &[Expression]) -> Result<Vec<Column>>;
}

/// The catalog contract consumed by the builder.
///
/// Read-only from the builder's perspective (§5): no method here mutates
/// catalog state.
pub trait Catalog {
    fn lookup_database(&self, name: &str) -> Result<Box<dyn Database>>;

    /// `as_of` carries the raw (already-lowered, constant) time-qualifier
    /// expression text for a time-travel read, if any.
    fn lookup_table(
        &self,
        db: Option<&str>,
        name: &str,
        as_of: Option<&Expression>,
    ) -> Result<(Box<dyn Table>, Box<dyn Database>)>;

    fn lookup_function(&self, name: &str) -> Result<Box<dyn Function>>;

    fn lookup_table_function(&self, name: &str) -> Result<Box<dyn TableFunction>>;
}
