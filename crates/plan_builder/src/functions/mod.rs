//! Function catalog support shared by scalar and aggregate resolution.

pub mod aggregate;

use plan_types::SqlType;

/// Common introspection surface for a catalog function entry: its name and
/// the signatures it accepts. Mirrors the teacher's
/// `functions::FunctionInfo` trait, trimmed to what the builder needs
/// (argument-count/type checking, not full implicit-cast scoring, since
/// that belongs to the optimizer/executor which are out of scope).
pub trait FunctionInfo {
    fn name(&self) -> &str;
    fn signatures(&self) -> &[Signature];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub input: Vec<SqlType>,
    pub variadic: bool,
    pub return_type: SqlType,
}
