//! DDL/DML plan node payloads (spec §4.6).

use plan_ast as ast;
use plan_ast::{AlterColumnAction as AstAlterColumnAction, AlterConstraintAction, AlterIndexAction, CheckDef, DropObjectKind, ForeignKeyDef, IndexDef, ShowStatement};
use plan_error::Result;
use plan_types::SqlType;

use crate::context::TransactionCharacteristic;
use crate::expr::{Expression, SortField};
use crate::scope::Scope;
use crate::Builder;

use super::relational;
use super::PlanNode;

/// A literal-or-expression default with the metadata spec §4.6 requires to
/// decide whether it may be applied without re-evaluation per row.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultValue {
    pub expr: Expression,
    pub literal: bool,
    pub parenthesized: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub default: Option<DefaultValue>,
    pub comment: Option<String>,
    pub srid: Option<plan_types::Srid>,
    pub charset: Option<String>,
    pub collation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateTableSource {
    Spec {
        columns: Vec<ColumnSpec>,
        indexes: Vec<IndexDef>,
        foreign_keys: Vec<ForeignKeyDef>,
        checks: Vec<CheckDef>,
    },
    Like(String),
    AsSelect(Box<PlanNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub database: Option<String>,
    pub name: String,
    pub if_not_exists: bool,
    pub source: CreateTableSource,
    pub collation: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabase {
    pub name: String,
    pub if_not_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRole {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterTableAction {
    Index(AlterIndexAction),
    Column {
        action: AstAlterColumnAction,
        spec: Option<ColumnSpec>,
    },
    AutoIncrement(u64),
    Default {
        column: String,
        value: Option<DefaultValue>,
    },
    Collation(String),
    Constraint(AlterConstraintAction),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlterTable {
    /// The resolved target table, built first per spec §4.6 so that every
    /// alter sub-case shares one name-resolution path.
    pub target: Box<PlanNode>,
    pub action: AlterTableAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropObjects {
    pub kind: DropObjectKind,
    pub names: Vec<String>,
    pub if_exists: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenameTable {
    pub pairs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TruncateTable {
    pub target: Box<PlanNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    Query(Box<PlanNode>),
    Values(Box<PlanNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertInto {
    pub table: Box<PlanNode>,
    pub columns: Vec<String>,
    pub source: InsertSource,
    pub on_duplicate_key_update: Vec<(String, Expression)>,
    pub replace: bool,
    pub ignore: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub table: Box<PlanNode>,
    pub assignments: Vec<(String, Expression)>,
    pub filter: Option<Expression>,
    pub order_by: Vec<SortField>,
    pub limit: Option<Expression>,
    pub ignore: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFrom {
    pub target_tables: Vec<String>,
    pub from: Box<PlanNode>,
    pub filter: Option<Expression>,
    pub order_by: Vec<SortField>,
    pub limit: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartTransaction {
    pub characteristic: Option<TransactionCharacteristic>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Savepoint {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GrantOrRevoke {
    pub grant: bool,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Show {
    pub statement: ShowStatement,
}

/// Resolve a `DataTypeName` the way a column definition needs rather than a
/// `CAST` target (spec §4.6): adds GEOMETRY, which `CAST` never targets.
fn resolve_column_type(dt: &ast::DataTypeName) -> Result<SqlType> {
    if dt.name.eq_ignore_ascii_case("geometry") {
        return Ok(SqlType::Geometry(None));
    }
    crate::expr::builder::resolve_data_type(dt)
}

fn build_column_spec(b: &mut Builder, col: &ast::ColumnDef, table_collation: &str) -> Result<ColumnSpec> {
    let sql_type = resolve_column_type(&col.data_type)?;
    let srid = col.srid.map(plan_types::Srid).map(plan_types::Srid::validate).transpose()?;

    let collation = if sql_type.is_string() {
        let current_collation = b.ctx.current_collation.clone();
        Some(
            plan_types::charset::resolve_collation(
                col.charset.as_ref().map(|i| i.normalized()).as_deref(),
                col.collation.as_ref().map(|i| i.normalized()).as_deref(),
                Some(table_collation),
                &current_collation,
            )?
            .name
            .to_string(),
        )
    } else {
        None
    };
    let charset = collation
        .as_deref()
        .map(plan_types::charset::lookup_collation)
        .transpose()?
        .map(|c| c.charset.to_string());

    let default = col
        .default
        .as_ref()
        .map(|d| build_default_value(b, d))
        .transpose()?;

    Ok(ColumnSpec {
        name: col.name.normalized(),
        sql_type,
        nullable: col.nullable,
        primary_key: col.primary_key,
        auto_increment: col.auto_increment,
        default,
        comment: col.comment.clone(),
        srid,
        charset,
        collation,
    })
}

fn build_default_value(b: &mut Builder, d: &ast::ColumnDefault) -> Result<DefaultValue> {
    let expr = crate::expr::builder::lower_expr(b, &mut Scope::root(), &d.expr)?;
    let literal = matches!(expr, Expression::Literal(_));
    Ok(DefaultValue { expr, literal, parenthesized: d.parenthesized })
}

pub fn build_create_table(b: &mut Builder, ct: &ast::CreateTable) -> Result<PlanNode> {
    let (database, name) = ct.name.split();
    let database = database.or_else(|| b.ctx.current_database.clone());

    let current_collation = b.ctx.current_collation.clone();
    let table_collation = plan_types::charset::resolve_collation(
        ct.charset.as_ref().map(|i| i.normalized()).as_deref(),
        ct.collation.as_ref().map(|i| i.normalized()).as_deref(),
        None,
        &current_collation,
    )?
    .name
    .to_string();

    let source = match &ct.source {
        ast::CreateTableSource::Spec { columns, indexes, foreign_keys, checks } => {
            let columns = columns.iter().map(|c| build_column_spec(b, c, &table_collation)).collect::<Result<Vec<_>>>()?;
            CreateTableSource::Spec {
                columns,
                indexes: indexes.clone(),
                foreign_keys: foreign_keys.clone(),
                checks: checks.clone(),
            }
        }
        ast::CreateTableSource::Like(reference) => {
            let (_, like_name) = reference.split();
            CreateTableSource::Like(like_name)
        }
        ast::CreateTableSource::AsSelect(query) => {
            let (plan, _) = relational::build_query(b, Scope::root(), query)?;
            CreateTableSource::AsSelect(Box::new(plan))
        }
    };

    Ok(PlanNode::CreateTable(CreateTable {
        database,
        name,
        if_not_exists: ct.if_not_exists,
        source,
        collation: table_collation,
    }))
}

pub fn build_create_database(cd: &ast::CreateDatabase) -> PlanNode {
    PlanNode::CreateDatabase(CreateDatabase { name: cd.name.normalized(), if_not_exists: cd.if_not_exists })
}

pub fn build_create_role(name: &ast::Ident) -> PlanNode {
    PlanNode::CreateRole(CreateRole { name: name.normalized() })
}

pub fn build_alter_table(b: &mut Builder, at: &ast::AlterTable) -> Result<PlanNode> {
    let (target, _) = relational::build_table_source(b, Scope::root(), &at.name, None, None)?;
    let current_collation = b.ctx.current_collation.clone();

    let action = match &at.action {
        ast::AlterTableAction::Index(a) => AlterTableAction::Index(a.clone()),
        ast::AlterTableAction::Column(a) => {
            let spec = match a {
                AstAlterColumnAction::Add(def) | AstAlterColumnAction::Modify(def) => {
                    Some(build_column_spec(b, def, &current_collation)?)
                }
                AstAlterColumnAction::Change { new_def, .. } => Some(build_column_spec(b, new_def, &current_collation)?),
                AstAlterColumnAction::Drop(_) | AstAlterColumnAction::Rename { .. } => None,
            };
            AlterTableAction::Column { action: a.clone(), spec }
        }
        ast::AlterTableAction::AutoIncrement(n) => AlterTableAction::AutoIncrement(*n),
        ast::AlterTableAction::Default { column, default } => {
            let value = default.as_ref().map(|d| build_default_value(b, d)).transpose()?;
            AlterTableAction::Default { column: column.normalized(), value }
        }
        ast::AlterTableAction::Collation(c) => AlterTableAction::Collation(c.normalized()),
        ast::AlterTableAction::Constraint(c) => AlterTableAction::Constraint(c.clone()),
        ast::AlterTableAction::Unsupported(name) => AlterTableAction::Unsupported(name.clone()),
    };

    Ok(PlanNode::AlterTable(AlterTable { target: Box::new(target), action }))
}

pub fn build_drop(drop: &ast::DropStatement) -> PlanNode {
    PlanNode::Drop(DropObjects {
        kind: drop.kind,
        names: drop.names.iter().map(|r| r.to_string().to_lowercase()).collect(),
        if_exists: drop.if_exists,
    })
}

pub fn build_rename_table(rename: &ast::RenameTable) -> PlanNode {
    PlanNode::RenameTable(RenameTable {
        pairs: rename
            .pairs
            .iter()
            .map(|(from, to)| (from.to_string().to_lowercase(), to.to_string().to_lowercase()))
            .collect(),
    })
}

pub fn build_truncate_table(b: &mut Builder, truncate: &ast::TruncateTable) -> Result<PlanNode> {
    let (target, _) = relational::build_table_source(b, Scope::root(), &truncate.name, None, None)?;
    Ok(PlanNode::TruncateTable(TruncateTable { target: Box::new(target) }))
}

pub fn build_insert(b: &mut Builder, insert: &ast::Insert) -> Result<PlanNode> {
    let (target, scope) = relational::build_table_source(b, Scope::root(), &insert.table, None, None)?;

    let columns: Vec<String> = if insert.columns.is_empty() {
        scope.cols.iter().map(|c| c.col.clone()).collect()
    } else {
        insert.columns.iter().map(|i| i.normalized()).collect()
    };

    let source = match &insert.source {
        ast::InsertSource::Query(query) => {
            let child = Scope::root().push();
            let (plan, _) = relational::build_query(b, child, query)?;
            InsertSource::Query(Box::new(plan))
        }
        ast::InsertSource::Values(rows) => {
            let values = ast::Values { rows: rows.clone() };
            let (plan, _) = relational::build_values(b, Scope::root(), &values)?;
            InsertSource::Values(Box::new(plan))
        }
    };

    let mut value_scope = scope.clone();
    let on_duplicate_key_update = insert
        .on_duplicate_key_update
        .iter()
        .map(|a| Ok((a.column.normalized(), crate::expr::builder::lower_expr(b, &mut value_scope, &a.value)?)))
        .collect::<Result<Vec<_>>>()?;

    Ok(PlanNode::InsertInto(InsertInto {
        table: Box::new(target),
        columns,
        source,
        on_duplicate_key_update,
        replace: insert.replace,
        ignore: insert.ignore,
    }))
}

pub fn build_update(b: &mut Builder, update: &ast::Update) -> Result<PlanNode> {
    let (target, mut scope) = relational::build_table_source(b, Scope::root(), &update.table, None, None)?;

    let assignments = update
        .assignments
        .iter()
        .map(|a| Ok((a.column.normalized(), crate::expr::builder::lower_expr(b, &mut scope, &a.value)?)))
        .collect::<Result<Vec<_>>>()?;

    let filter = update.filter.as_ref().map(|f| crate::expr::builder::lower_expr(b, &mut scope, f)).transpose()?;
    let order_by = relational::build_order_by(b, &mut scope, &update.order_by)?;
    let limit = update.limit.as_ref().map(|l| crate::expr::builder::lower_expr(b, &mut scope, l)).transpose()?;

    Ok(PlanNode::Update(Update {
        table: Box::new(target),
        assignments,
        filter,
        order_by,
        limit,
        ignore: update.ignore,
    }))
}

pub fn build_delete(b: &mut Builder, delete: &ast::Delete) -> Result<PlanNode> {
    let (from, mut scope) = relational::build_table_source(b, Scope::root(), &delete.from, None, None)?;

    let target_tables = if delete.tables.is_empty() {
        vec![delete.from.split().1]
    } else {
        delete.tables.iter().map(|t| t.split().1).collect()
    };

    let filter = delete.filter.as_ref().map(|f| crate::expr::builder::lower_expr(b, &mut scope, f)).transpose()?;
    let order_by = relational::build_order_by(b, &mut scope, &delete.order_by)?;
    let limit = delete.limit.as_ref().map(|l| crate::expr::builder::lower_expr(b, &mut scope, l)).transpose()?;

    Ok(PlanNode::DeleteFrom(DeleteFrom {
        target_tables,
        from: Box::new(from),
        filter,
        order_by,
        limit,
    }))
}

pub fn build_start_transaction(characteristic: ast::TransactionCharacteristic) -> PlanNode {
    let characteristic = match characteristic {
        ast::TransactionCharacteristic::ReadWrite => TransactionCharacteristic::ReadWrite,
        ast::TransactionCharacteristic::ReadOnly => TransactionCharacteristic::ReadOnly,
    };
    PlanNode::StartTransaction(StartTransaction { characteristic: Some(characteristic) })
}

pub fn build_savepoint(name: &ast::Ident) -> PlanNode {
    PlanNode::Savepoint(Savepoint { name: name.normalized() })
}

pub fn build_grant_or_revoke(g: &ast::GrantOrRevoke) -> PlanNode {
    let verb = if g.is_grant { "GRANT" } else { "REVOKE" };
    let text = format!("{verb} {} ON {} TO {}", g.privileges.join(", "), g.object, g.to.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(", "));
    PlanNode::GrantOrRevoke(GrantOrRevoke { grant: g.is_grant, text })
}

pub fn build_show(statement: ShowStatement) -> PlanNode {
    PlanNode::Show(Show { statement })
}
