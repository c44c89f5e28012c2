//! Opaque AST node variants consumed by the logical plan builder.
//!
//! The grammar/parser that produces these trees is an external collaborator
//! and out of scope here: this crate only fixes the shape of the nodes the
//! builder switches on. There is deliberately no tokenizer or recursive
//! descent parser in this crate.

pub mod ddl;
pub mod dml;
pub mod expr;
pub mod ident;
pub mod query;
pub mod statement;

pub use ddl::*;
pub use dml::*;
pub use expr::*;
pub use ident::*;
pub use query::*;
pub use statement::Statement;
