//! The logical plan tree (spec §3 `PlanNode`, §6 "plan node surface").
//!
//! Like `Expression`, this is a closed tagged-variant sum type: one
//! `PlanNode` enum whose arms hold boxed child nodes directly, rather than
//! the teacher's generic `Node<N> { node, location, children }` wrapper —
//! this builder never needs a uniform `children: Vec<LogicalOperator>`
//! walk independent of variant shape, so the wrapper would only add an
//! indirection with nothing to hang off it.

pub mod aggregation;
pub mod ddl;
pub mod relational;

use aggregation::{GroupBy, Having};
use ddl::{
    AlterTable, CreateDatabase, CreateRole, CreateTable, DeleteFrom, DropObjects, GrantOrRevoke, InsertInto, RenameTable, Savepoint,
    Show, StartTransaction, TruncateTable, Update,
};
use relational::{
    Join, JsonTable, Project, RecursiveCte, ResolvedTable, Sort, SubqueryAlias, TableAlias, TableFunctionCall, Union, ValueDerivedTable, Values,
};

pub use relational::{AsOf, Filter, Limit, Offset};

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    ResolvedTable(ResolvedTable),
    ResolvedDual,
    TableAlias(TableAlias),
    SubqueryAlias(SubqueryAlias),
    Project(Project),
    Filter(relational::Filter),
    GroupBy(GroupBy),
    Having(Having),
    Sort(Sort),
    Limit(relational::Limit),
    Offset(relational::Offset),
    Join(Join),
    Union(Union),
    RecursiveCte(RecursiveCte),
    Values(Values),
    ValueDerivedTable(ValueDerivedTable),
    JsonTable(JsonTable),
    TableFunctionCall(TableFunctionCall),
    InsertInto(InsertInto),
    Update(Update),
    DeleteFrom(DeleteFrom),
    StartTransaction(StartTransaction),
    Commit,
    Rollback,
    Savepoint(Savepoint),
    CreateTable(CreateTable),
    CreateDatabase(CreateDatabase),
    CreateRole(CreateRole),
    AlterTable(AlterTable),
    Drop(DropObjects),
    RenameTable(RenameTable),
    TruncateTable(TruncateTable),
    GrantOrRevoke(GrantOrRevoke),
    Show(Show),
    /// A no-op plan produced for an empty parsed statement (spec §6, "parse
    /// entry point").
    Empty,
}

impl PlanNode {
    /// True iff every sub-expression and child node is resolved (spec §6).
    /// Lowering never leaves an `Expression` unresolved, so the only source
    /// of `false` is a deferred `AS OF` clause (spec §4.3 point 3) anywhere
    /// in the subtree.
    pub fn resolved(&self) -> bool {
        match self {
            PlanNode::ResolvedTable(t) => !matches!(t.as_of, Some(AsOf::Deferred(_))),
            PlanNode::TableAlias(t) => t.input.resolved(),
            PlanNode::SubqueryAlias(s) => s.input.resolved(),
            PlanNode::Project(p) => p.input.resolved(),
            PlanNode::Filter(f) => f.input.resolved(),
            PlanNode::GroupBy(g) => g.input.resolved(),
            PlanNode::Having(h) => h.input.resolved(),
            PlanNode::Sort(s) => s.input.resolved(),
            PlanNode::Limit(l) => l.input.resolved(),
            PlanNode::Offset(o) => o.input.resolved(),
            PlanNode::Join(j) => j.left.resolved() && j.right.resolved(),
            PlanNode::Union(u) => u.left.resolved() && u.right.resolved(),
            PlanNode::RecursiveCte(r) => r.seed.resolved() && r.recursive_term.resolved(),
            PlanNode::ValueDerivedTable(v) => v.values.resolved(),
            PlanNode::InsertInto(i) => i.table.resolved(),
            PlanNode::Update(u) => u.table.resolved(),
            PlanNode::DeleteFrom(d) => d.from.resolved(),
            PlanNode::AlterTable(a) => a.target.resolved(),
            PlanNode::TruncateTable(t) => t.target.resolved(),
            PlanNode::CreateTable(c) => match &c.source {
                ddl::CreateTableSource::AsSelect(p) => p.resolved(),
                _ => true,
            },
            _ => true,
        }
    }

    /// Deterministic multi-line rendering used by tests (spec §6, §8).
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        self.write_debug_string(&mut out, 0);
        out
    }

    fn write_debug_string(&self, out: &mut String, indent: usize) {
        let pad = "  ".repeat(indent);
        match self {
            PlanNode::ResolvedTable(t) => {
                out.push_str(&format!("{pad}ResolvedTable({}.{})\n", t.database, t.table));
            }
            PlanNode::ResolvedDual => out.push_str(&format!("{pad}ResolvedDual\n")),
            PlanNode::TableAlias(t) => {
                out.push_str(&format!("{pad}TableAlias({})\n", t.alias));
                t.input.write_debug_string(out, indent + 1);
            }
            PlanNode::SubqueryAlias(s) => {
                out.push_str(&format!("{pad}SubqueryAlias({})\n", s.name));
                s.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Project(p) => {
                let exprs = p.exprs.iter().map(|e| e.debug_string()).collect::<Vec<_>>().join(", ");
                out.push_str(&format!("{pad}Project[{exprs}]\n"));
                p.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Filter(f) => {
                out.push_str(&format!("{pad}Filter({})\n", f.predicate.debug_string()));
                f.input.write_debug_string(out, indent + 1);
            }
            PlanNode::GroupBy(g) => {
                let keys = g.group_exprs.iter().map(|e| e.debug_string()).collect::<Vec<_>>().join(", ");
                out.push_str(&format!("{pad}GroupBy[{keys}]\n"));
                g.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Having(h) => {
                out.push_str(&format!("{pad}Having({})\n", h.predicate.debug_string()));
                h.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Sort(s) => {
                out.push_str(&format!("{pad}Sort[{} field(s)]\n", s.order_by.len()));
                s.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Limit(l) => {
                out.push_str(&format!("{pad}Limit({})\n", l.limit.debug_string()));
                l.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Offset(o) => {
                out.push_str(&format!("{pad}Offset({})\n", o.offset.debug_string()));
                o.input.write_debug_string(out, indent + 1);
            }
            PlanNode::Join(j) => {
                out.push_str(&format!("{pad}Join({:?}{})\n", j.kind, if j.natural { ", natural" } else { "" }));
                j.left.write_debug_string(out, indent + 1);
                j.right.write_debug_string(out, indent + 1);
            }
            PlanNode::Union(u) => {
                out.push_str(&format!("{pad}Union(distinct={})\n", u.distinct));
                u.left.write_debug_string(out, indent + 1);
                u.right.write_debug_string(out, indent + 1);
            }
            PlanNode::RecursiveCte(r) => {
                out.push_str(&format!("{pad}RecursiveCte({})\n", r.name));
                r.seed.write_debug_string(out, indent + 1);
                r.recursive_term.write_debug_string(out, indent + 1);
            }
            PlanNode::Values(v) => out.push_str(&format!("{pad}Values[{} row(s)]\n", v.rows.len())),
            PlanNode::ValueDerivedTable(v) => {
                out.push_str(&format!("{pad}ValueDerivedTable({})\n", v.alias));
                v.values.write_debug_string(out, indent + 1);
            }
            PlanNode::JsonTable(j) => out.push_str(&format!("{pad}JsonTable({})\n", j.alias)),
            PlanNode::TableFunctionCall(t) => out.push_str(&format!("{pad}TableFunctionCall({}, alias={})\n", t.name, t.alias)),
            PlanNode::InsertInto(i) => {
                out.push_str(&format!("{pad}InsertInto(replace={}, ignore={})\n", i.replace, i.ignore));
                i.table.write_debug_string(out, indent + 1);
            }
            PlanNode::Update(u) => {
                out.push_str(&format!("{pad}Update[{} assignment(s)]\n", u.assignments.len()));
                u.table.write_debug_string(out, indent + 1);
            }
            PlanNode::DeleteFrom(d) => {
                out.push_str(&format!("{pad}DeleteFrom({:?})\n", d.target_tables));
                d.from.write_debug_string(out, indent + 1);
            }
            PlanNode::StartTransaction(_) => out.push_str(&format!("{pad}StartTransaction\n")),
            PlanNode::Commit => out.push_str(&format!("{pad}Commit\n")),
            PlanNode::Rollback => out.push_str(&format!("{pad}Rollback\n")),
            PlanNode::Savepoint(s) => out.push_str(&format!("{pad}Savepoint({})\n", s.name)),
            PlanNode::CreateTable(c) => out.push_str(&format!("{pad}CreateTable({})\n", c.name)),
            PlanNode::CreateDatabase(c) => out.push_str(&format!("{pad}CreateDatabase({})\n", c.name)),
            PlanNode::CreateRole(c) => out.push_str(&format!("{pad}CreateRole({})\n", c.name)),
            PlanNode::AlterTable(a) => {
                out.push_str(&format!("{pad}AlterTable\n"));
                a.target.write_debug_string(out, indent + 1);
            }
            PlanNode::Drop(d) => out.push_str(&format!("{pad}Drop({:?}, {:?})\n", d.kind, d.names)),
            PlanNode::RenameTable(r) => out.push_str(&format!("{pad}RenameTable({:?})\n", r.pairs)),
            PlanNode::TruncateTable(t) => {
                out.push_str(&format!("{pad}TruncateTable\n"));
                t.target.write_debug_string(out, indent + 1);
            }
            PlanNode::GrantOrRevoke(g) => out.push_str(&format!("{pad}GrantOrRevoke(grant={})\n", g.grant)),
            PlanNode::Show(_) => out.push_str(&format!("{pad}Show\n")),
            PlanNode::Empty => out.push_str(&format!("{pad}Empty\n")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolved_dual_and_empty_are_always_resolved() {
        assert!(PlanNode::ResolvedDual.resolved());
        assert!(PlanNode::Empty.resolved());
    }

    #[test]
    fn debug_string_nests_children() {
        let inner = PlanNode::ResolvedDual;
        let node = PlanNode::Filter(relational::Filter {
            predicate: crate::expr::Expression::Literal(plan_types::Value::Boolean(true)),
            input: Box::new(inner),
        });
        let s = node.debug_string();
        assert!(s.starts_with("Filter("));
        assert!(s.contains("ResolvedDual"));
    }
}
