//! Semantic analyzer / logical plan builder: lowers a MySQL-dialect AST
//! (`plan_ast::Statement`) into a typed [`plan::PlanNode`] tree, resolving
//! every column and table reference against a [`catalog::Catalog`]
//! collaborator along the way.
//!
//! This crate does not parse SQL text; it receives already-parsed
//! `plan_ast::Statement` values (the grammar lives outside this workspace,
//! as the teacher's own `rayexec_parser`/binder split keeps lexing and
//! binding in separate crates) and produces plan nodes the optimizer or
//! executor downstream can consume.

pub mod catalog;
pub mod context;
pub mod expr;
pub mod functions;
pub mod ids;
pub mod plan;
pub mod scope;
pub mod window;

use plan_ast as ast;
use plan_error::{PlanError, Result};

use catalog::Catalog;
use context::Context;
use ids::IdAllocator;
use plan::PlanNode;
use scope::Scope;

/// The per-statement builder state: the session context, the catalog
/// collaborator, and this run's id allocator (spec §5 — one `Builder` never
/// outlives the statement it builds, and its allocator is never shared
/// across statements).
pub struct Builder<'a> {
    pub ctx: &'a Context,
    pub catalog: &'a dyn Catalog,
    pub alloc: IdAllocator,
}

impl<'a> Builder<'a> {
    pub fn new(ctx: &'a Context, catalog: &'a dyn Catalog) -> Self {
        Builder {
            ctx,
            catalog,
            alloc: IdAllocator::new(),
        }
    }

    /// Lower one already-parsed statement into a plan node (spec §6's
    /// "parse entry point", minus the text-parsing step this crate does not
    /// own). Every relational/DDL/DML builder is reached from here.
    pub fn build(&mut self, statement: &ast::Statement) -> Result<PlanNode> {
        let span = tracing::info_span!("build_statement");
        let _guard = span.enter();

        let result = self.build_inner(statement);
        if let Err(err) = &result {
            tracing::warn!(error = %err, "statement build failed");
        }
        result
    }

    fn build_inner(&mut self, statement: &ast::Statement) -> Result<PlanNode> {
        match statement {
            ast::Statement::Query(query) => {
                let (node, _scope) = plan::relational::build_query(self, Scope::root(), query)?;
                Ok(node)
            }
            ast::Statement::CreateTable(ct) => plan::ddl::build_create_table(self, ct),
            ast::Statement::CreateDatabase(cd) => Ok(plan::ddl::build_create_database(cd)),
            ast::Statement::CreateRole { name } => Ok(plan::ddl::build_create_role(name)),
            ast::Statement::AlterTable(at) => plan::ddl::build_alter_table(self, at),
            ast::Statement::Drop(drop) => Ok(plan::ddl::build_drop(drop)),
            ast::Statement::RenameTable(rename) => Ok(plan::ddl::build_rename_table(rename)),
            ast::Statement::TruncateTable(truncate) => plan::ddl::build_truncate_table(self, truncate),
            ast::Statement::Insert(insert) => plan::ddl::build_insert(self, insert),
            ast::Statement::Update(update) => plan::ddl::build_update(self, update),
            ast::Statement::Delete(delete) => plan::ddl::build_delete(self, delete),
            ast::Statement::StartTransaction(characteristic) => Ok(plan::ddl::build_start_transaction(*characteristic)),
            ast::Statement::Commit => Ok(PlanNode::Commit),
            ast::Statement::Rollback => Ok(PlanNode::Rollback),
            ast::Statement::Savepoint(name) => Ok(plan::ddl::build_savepoint(name)),
            ast::Statement::GrantOrRevoke(g) => Ok(plan::ddl::build_grant_or_revoke(g)),
            ast::Statement::Show(show) => Ok(plan::ddl::build_show(show.clone())),
            ast::Statement::Unsupported(name) => {
                let allowed = self.ctx.config.unsupported_ddl_forms.iter().any(|f| f.eq_ignore_ascii_case(name));
                if allowed {
                    Err(PlanError::unsupported(format!("statement form not implemented: {name}")))
                } else {
                    Err(PlanError::syntax(format!("unsupported syntax {name}")))
                }
            }
        }
    }
}

/// Spec §6's `parse(ctx, catalog, query) → (plan_node, error?)` entry
/// point, adapted to this crate's scope: `statement` is already parsed (see
/// the module doc comment), so there is no `parsed_text`/`remainder` to
/// report. An empty statement list lowers to [`PlanNode::Empty`] with no
/// error, matching the spec's "parser returns empty" case.
pub fn parse(ctx: &Context, catalog: &dyn Catalog, statements: &[ast::Statement]) -> Result<PlanNode> {
    match statements.first() {
        None => Ok(PlanNode::Empty),
        Some(statement) => {
            let mut builder = Builder::new(ctx, catalog);
            builder.build(statement)
        }
    }
}

/// `parse_one` additionally reports how many statements were not consumed
/// (spec §6), since this crate receives a pre-parsed slice rather than raw
/// text and therefore has no "remainder" substring to return.
pub fn parse_one<'a>(ctx: &Context, catalog: &dyn Catalog, statements: &'a [ast::Statement]) -> Result<(PlanNode, &'a [ast::Statement])> {
    match statements.split_first() {
        None => Ok((PlanNode::Empty, statements)),
        Some((first, rest)) => {
            let mut builder = Builder::new(ctx, catalog);
            let node = builder.build(first)?;
            Ok((node, rest))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, Database, Function, Table, TableFunction};

    #[derive(Debug)]
    struct EmptyCatalog;

    impl Catalog for EmptyCatalog {
        fn lookup_database(&self, name: &str) -> Result<Box<dyn Database>> {
            Err(PlanError::resolution(format!("no such database: {name}")))
        }
        fn lookup_table(&self, _db: Option<&str>, name: &str, _as_of: Option<&expr::Expression>) -> Result<(Box<dyn Table>, Box<dyn Database>)> {
            Err(PlanError::resolution(format!("no such table: {name}")))
        }
        fn lookup_function(&self, name: &str) -> Result<Box<dyn Function>> {
            Err(PlanError::resolution(format!("no such function: {name}")))
        }
        fn lookup_table_function(&self, name: &str) -> Result<Box<dyn TableFunction>> {
            Err(PlanError::resolution(format!("no such table function: {name}")))
        }
    }

    #[test]
    fn empty_statement_list_is_a_no_op_plan() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let node = parse(&ctx, &catalog, &[]).unwrap();
        assert_eq!(node, PlanNode::Empty);
    }

    #[test]
    fn commit_lowers_directly() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let node = parse(&ctx, &catalog, &[ast::Statement::Commit]).unwrap();
        assert_eq!(node, PlanNode::Commit);
    }

    #[test]
    fn unsupported_statement_is_a_named_feature_error() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let err = parse(&ctx, &catalog, &[ast::Statement::Unsupported("FULLTEXT INDEX".to_string())]).unwrap_err();
        assert_eq!(err.kind(), plan_error::ErrorKind::FeatureUnsupported);
    }

    #[test]
    fn parse_one_reports_the_remainder() {
        let ctx = Context::default();
        let catalog = EmptyCatalog;
        let statements = [ast::Statement::Commit, ast::Statement::Rollback];
        let (node, remainder) = parse_one(&ctx, &catalog, &statements).unwrap();
        assert_eq!(node, PlanNode::Commit);
        assert_eq!(remainder, &[ast::Statement::Rollback]);
    }
}
