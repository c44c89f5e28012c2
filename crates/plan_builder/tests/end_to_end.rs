//! End-to-end scenarios (spec §8): hand-built AST fragments (this crate
//! consumes `plan_ast::Statement`, not SQL text) driven through `Builder`
//! against an in-memory test catalog, asserting the testable properties the
//! spec enumerates.

use plan_ast::{
    BinaryOperator, CommonTableExpr, CteDefs, Expr, FromNode, FunctionArg, FunctionArgExpr, FunctionCall, GroupByExprs, GroupByNode, Ident,
    Join, JoinCondition, JoinKind, Literal, ObjectReference, OrderByExpr, QueryNode, QueryNodeBody, SelectItem, SelectNode, SetOperation,
    Statement, TableAlias,
};
use plan_builder::catalog::{Catalog, Column, Database, Function, Table, TableFunction};
use plan_builder::context::Context;
use plan_builder::expr::Expression;
use plan_builder::plan::relational;
use plan_builder::plan::PlanNode;
use plan_builder::window::{new_buffer, WindowInputRow};
use plan_builder::Builder;
use plan_error::Result;
use plan_types::{SqlType, Value};

#[derive(Debug)]
struct TestDatabase(String);

impl Database for TestDatabase {
    fn name(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone)]
struct TestTable {
    name: String,
    columns: Vec<Column>,
}

impl Table for TestTable {
    fn name(&self) -> &str {
        &self.name
    }
    fn schema(&self) -> &[Column] {
        &self.columns
    }
}

#[derive(Debug)]
struct TestCatalog {
    tables: Vec<TestTable>,
}

impl TestCatalog {
    fn new() -> Self {
        let bigint_cols = |names: &[&str]| {
            names
                .iter()
                .map(|n| Column { name: n.to_string(), sql_type: SqlType::BigInt, nullable: true })
                .collect()
        };
        TestCatalog {
            tables: vec![
                TestTable { name: "xy".to_string(), columns: bigint_cols(&["x", "y"]) },
                TestTable { name: "uv".to_string(), columns: bigint_cols(&["u", "v"]) },
            ],
        }
    }
}

impl Catalog for TestCatalog {
    fn lookup_database(&self, _name: &str) -> Result<Box<dyn Database>> {
        Ok(Box::new(TestDatabase("mydb".to_string())))
    }

    fn lookup_table(&self, _db: Option<&str>, name: &str, _as_of: Option<&Expression>) -> Result<(Box<dyn Table>, Box<dyn Database>)> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .map(|t| (Box::new(t.clone()) as Box<dyn Table>, Box::new(TestDatabase("mydb".to_string())) as Box<dyn Database>))
            .ok_or_else(|| plan_error::PlanError::resolution(format!("no such table: {name}")))
    }

    fn lookup_function(&self, name: &str) -> Result<Box<dyn Function>> {
        Err(plan_error::PlanError::resolution(format!("no such function: {name}")))
    }

    fn lookup_table_function(&self, name: &str) -> Result<Box<dyn TableFunction>> {
        Err(plan_error::PlanError::resolution(format!("no such table function: {name}")))
    }
}

fn ident(s: &str) -> Ident {
    Ident::new(s)
}

fn col(s: &str) -> Expr {
    Expr::Ident(ident(s))
}

fn compound(parts: &[&str]) -> Expr {
    Expr::CompoundIdent(parts.iter().map(|p| ident(p)).collect())
}

fn number(n: &str) -> Expr {
    Expr::Literal(Literal::Number(n.to_string()))
}

fn eq(left: Expr, right: Expr) -> Expr {
    Expr::BinaryOp { left: Box::new(left), op: BinaryOperator::Eq, right: Box::new(right) }
}

fn table_from(name: &str, alias: Option<&str>) -> FromNode {
    FromNode::Table {
        reference: ObjectReference::bare(name),
        alias: alias.map(|a| TableAlias { name: ident(a), column_aliases: None }),
        as_of: None,
    }
}

fn select(projections: Vec<SelectItem>, from: Option<FromNode>, filter: Option<Expr>) -> SelectNode {
    SelectNode { distinct: false, projections, from, filter, group_by: None, having: None }
}

fn query(body: QueryNodeBody) -> QueryNode {
    QueryNode { ctes: None, body, order_by: Vec::new(), limit: None, offset: None }
}

fn build(catalog: &TestCatalog, statement: &Statement) -> PlanNode {
    let ctx = Context::default();
    let mut builder = Builder::new(&ctx, catalog);
    builder.build(statement).expect("build should succeed")
}

fn try_build(catalog: &TestCatalog, statement: &Statement) -> Result<PlanNode> {
    let ctx = Context::default();
    let mut builder = Builder::new(&ctx, catalog);
    builder.build(statement)
}

/// Scenario 1: `SELECT * FROM xy WHERE x = 2`.
#[test]
fn scenario_1_project_filter_table() {
    let catalog = TestCatalog::new();
    let select = select(vec![SelectItem::Wildcard], Some(table_from("xy", None)), Some(eq(col("x"), number("2"))));
    let stmt = Statement::Query(query(QueryNodeBody::Select(Box::new(select))));

    let node = build(&catalog, &stmt);
    assert!(node.resolved());

    let rendered = node.debug_string();
    assert!(rendered.starts_with("Project"));
    assert!(rendered.contains("Filter("));
    assert!(rendered.contains("ResolvedTable(mydb.xy)"));

    match node {
        PlanNode::Project(p) => assert_eq!(p.exprs.len(), 2),
        other => panic!("expected Project, got {other:?}"),
    }
}

/// Scenario 2: `SELECT x, s.y FROM xy s JOIN uv ON x = u WHERE s.x = 2`.
#[test]
fn scenario_2_join_qualifies_and_resolves_alias() {
    let catalog = TestCatalog::new();
    let from = FromNode::Join(Box::new(Join {
        left: table_from("xy", Some("s")),
        right: table_from("uv", None),
        kind: JoinKind::Inner,
        condition: JoinCondition::On(eq(col("x"), col("u"))),
    }));
    let select = select(
        vec![SelectItem::Expr(col("x")), SelectItem::Expr(compound(&["s", "y"]))],
        Some(from),
        Some(eq(compound(&["s", "x"]), number("2"))),
    );
    let stmt = Statement::Query(query(QueryNodeBody::Select(Box::new(select))));

    let node = build(&catalog, &stmt);
    assert!(node.resolved());

    let rendered = node.debug_string();
    assert!(rendered.contains("Join(Inner"));
    assert!(rendered.contains("TableAlias(s)"));
    assert!(rendered.contains("ResolvedTable(mydb.uv)"));
}

/// Duplicate table/alias names across a join are rejected (spec §4.3 point 4).
#[test]
fn join_rejects_duplicate_alias() {
    let catalog = TestCatalog::new();
    let from = FromNode::Join(Box::new(Join {
        left: table_from("xy", None),
        right: table_from("uv", Some("xy")),
        kind: JoinKind::Inner,
        condition: JoinCondition::None,
    }));
    let select = select(vec![SelectItem::Wildcard], Some(from), None);
    let stmt = Statement::Query(query(QueryNodeBody::Select(Box::new(select))));

    let err = try_build(&catalog, &stmt).unwrap_err();
    assert_eq!(err.kind(), plan_error::ErrorKind::Resolution);
}

/// Scenario 3: `SELECT x, COUNT(y) FROM xy GROUP BY x ORDER BY x - COUNT(y)`
/// — the projection and the ORDER BY clause both call `COUNT(y)`; P4 dedup
/// means the `GroupBy` registers it once and both references carry the same
/// `ColumnId`. Also a regression test for the bug where ORDER BY was
/// analyzed after `GroupBy` was finalized, against a throwaway scope: the
/// aggregate it introduced never reached the real `GroupBy` and the `Sort`
/// term pointed at a column nothing in the plan produced.
#[test]
fn scenario_3_group_by_and_aggregate_dedup_in_order_by() {
    let catalog = TestCatalog::new();
    let count_call = || {
        Expr::Function(FunctionCall {
            name: ObjectReference::bare("count"),
            args: vec![FunctionArg { name: None, expr: FunctionArgExpr::Expr(col("y")) }],
            distinct: false,
            filter: None,
            over: None,
        })
    };

    let mut select = select(vec![SelectItem::Expr(col("x")), SelectItem::Expr(count_call())], Some(table_from("xy", None)), None);
    select.group_by = Some(GroupByNode::Exprs(GroupByExprs::Exprs(vec![col("x")])));

    let mut q = query(QueryNodeBody::Select(Box::new(select)));
    q.order_by = vec![OrderByExpr {
        expr: Expr::BinaryOp { left: Box::new(col("x")), op: BinaryOperator::Minus, right: Box::new(count_call()) },
        descending: false,
    }];
    let stmt = Statement::Query(q);

    let node = build(&catalog, &stmt);
    assert!(node.resolved());
    let rendered = node.debug_string();
    assert!(rendered.starts_with("Sort"));
    assert!(rendered.contains("GroupBy["));

    let sort = match &node {
        PlanNode::Sort(s) => s,
        other => panic!("expected Sort, got {other:?}"),
    };
    let project = match sort.input.as_ref() {
        PlanNode::Project(p) => p,
        other => panic!("expected Project, got {other:?}"),
    };
    let group_by = match project.input.as_ref() {
        PlanNode::GroupBy(g) => g,
        other => panic!("expected GroupBy, got {other:?}"),
    };

    assert_eq!(group_by.aggregates.len(), 1, "COUNT(y) must be registered once, not once per clause it appears in");
    assert_eq!(group_by.aggregates[0].func.name(), "count");

    let proj_count_id = match &project.exprs[1] {
        Expression::Column(c) => c.id,
        other => panic!("expected Column, got {other:?}"),
    };
    let sort_count_id = match &sort.order_by[0].column {
        Expression::Arith { right, .. } => match right.as_ref() {
            Expression::Column(c) => c.id,
            other => panic!("expected Column, got {other:?}"),
        },
        other => panic!("expected Arith, got {other:?}"),
    };
    assert_eq!(
        proj_count_id, sort_count_id,
        "ORDER BY's COUNT(y) must resolve to the same ColumnId the projection's COUNT(y) uses"
    );
}

/// Scenario 4: `SELECT * FROM xy WHERE x IN (SELECT u FROM uv WHERE x = u)`
/// — P3: the subquery's WHERE clause resolves `x` against the outer FROM
/// scope.
#[test]
fn scenario_4_correlated_subquery_resolves_outer_column() {
    let catalog = TestCatalog::new();
    let inner_select = select(vec![SelectItem::Expr(col("u"))], Some(table_from("uv", None)), Some(eq(col("x"), col("u"))));
    let inner_query = Box::new(query(QueryNodeBody::Select(Box::new(inner_select))));

    let outer_select = select(
        vec![SelectItem::Wildcard],
        Some(table_from("xy", None)),
        Some(Expr::InSubquery { expr: Box::new(col("x")), subquery: inner_query, negated: false }),
    );
    let stmt = Statement::Query(query(QueryNodeBody::Select(Box::new(outer_select))));

    let node = build(&catalog, &stmt);
    assert!(node.resolved());
}

/// A sibling in the outer FROM list may not see another sibling's columns
/// (spec P3's negative case): joining `uv` to a derived table correlated
/// against `xy`'s own columns (rather than a WHERE/HAVING/SELECT subquery)
/// fails to resolve.
#[test]
fn scenario_4_negative_sibling_from_cannot_see_sibling_columns() {
    let catalog = TestCatalog::new();
    let derived_select = select(vec![SelectItem::Expr(col("x"))], Some(table_from("uv", None)), None);
    let derived = FromNode::Derived {
        query: Box::new(query(QueryNodeBody::Select(Box::new(derived_select)))),
        alias: TableAlias { name: ident("d"), column_aliases: None },
        lateral: false,
    };
    let from = FromNode::Join(Box::new(Join {
        left: table_from("xy", None),
        right: derived,
        kind: JoinKind::Inner,
        condition: JoinCondition::None,
    }));
    let select = select(vec![SelectItem::Wildcard], Some(from), None);
    let stmt = Statement::Query(query(QueryNodeBody::Select(Box::new(select))));

    let err = try_build(&catalog, &stmt).unwrap_err();
    assert_eq!(err.kind(), plan_error::ErrorKind::Resolution);
}

/// Scenario 5: `WITH RECURSIVE cte(s) AS (SELECT x FROM xy UNION SELECT s
/// FROM cte JOIN xy ON y = s) SELECT * FROM cte` — P8: a recursive-CTE node
/// wrapping a union whose left arm is the seed and whose right arm
/// references the CTE by name.
#[test]
fn scenario_5_recursive_cte_shape() {
    let catalog = TestCatalog::new();

    let seed = QueryNodeBody::Select(Box::new(select(vec![SelectItem::Expr(col("x"))], Some(table_from("xy", None)), None)));

    let recursive_from = FromNode::Join(Box::new(Join {
        left: table_from("cte", None),
        right: table_from("xy", None),
        kind: JoinKind::Inner,
        condition: JoinCondition::On(eq(col("y"), col("s"))),
    }));
    let recursive = QueryNodeBody::Select(Box::new(select(vec![SelectItem::Expr(col("s"))], Some(recursive_from), None)));

    let cte_body = query(QueryNodeBody::SetOp {
        left: Box::new(seed),
        right: Box::new(recursive),
        op: SetOperation::Union,
        all: false,
    });

    let mut outer = query(QueryNodeBody::Select(Box::new(select(vec![SelectItem::Wildcard], Some(table_from("cte", None)), None))));
    outer.ctes = Some(CteDefs {
        recursive: true,
        ctes: vec![CommonTableExpr { name: ident("cte"), column_names: Some(vec![ident("s")]), body: cte_body }],
    });
    let stmt = Statement::Query(outer);

    let node = build(&catalog, &stmt);
    assert!(node.resolved());

    // Drill down past the outer Project to the CTE's own plan subtree.
    let inner = match &node {
        PlanNode::Project(p) => &*p.input,
        other => panic!("expected Project at the top, got {other:?}"),
    };
    match inner {
        PlanNode::RecursiveCte(r) => {
            assert_eq!(r.name, "cte");
            assert!(matches!(*r.seed, PlanNode::Project(_)));
            assert!(matches!(*r.recursive_term, PlanNode::Project(_)));
        }
        other => panic!("expected RecursiveCte, got {other:?}"),
    }
}

/// A non-recursive CTE body must still be a `UNION [ALL]` of a seed and a
/// recursive term (spec §4.3); anything else is a syntax error.
#[test]
fn recursive_cte_rejects_non_union_body() {
    let catalog = TestCatalog::new();
    let cte_body = query(QueryNodeBody::Select(Box::new(select(vec![SelectItem::Expr(col("x"))], Some(table_from("xy", None)), None))));

    let mut outer = query(QueryNodeBody::Select(Box::new(select(vec![SelectItem::Wildcard], Some(table_from("cte", None)), None))));
    outer.ctes = Some(CteDefs {
        recursive: true,
        ctes: vec![CommonTableExpr { name: ident("cte"), column_names: None, body: cte_body }],
    });
    let stmt = Statement::Query(outer);

    let err = try_build(&catalog, &stmt).unwrap_err();
    assert_eq!(err.kind(), plan_error::ErrorKind::Syntax);
}

/// P1/P2: every projected column carries an id the builder itself
/// allocated, and distinct projection sites get distinct ids.
#[test]
fn p1_p2_resolution_closure_and_id_uniqueness() {
    let catalog = TestCatalog::new();
    let select = select(vec![SelectItem::Expr(col("x")), SelectItem::Expr(col("y"))], Some(table_from("xy", None)), None);
    let stmt = Statement::Query(query(QueryNodeBody::Select(Box::new(select))));

    let node = build(&catalog, &stmt);
    let exprs = match node {
        PlanNode::Project(p) => p.exprs,
        other => panic!("expected Project, got {other:?}"),
    };
    let ids: Vec<_> = exprs
        .iter()
        .map(|e| match e {
            Expression::Column(c) => c.id,
            other => panic!("expected Column, got {other:?}"),
        })
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

/// Scenario 6 / P6 / P7: `ROW_NUMBER` and `PERCENT_RANK` over
/// `PARTITION BY p ORDER BY k` on `[(1,10), (1,20), (2,5), (1,20)]`.
#[test]
fn scenario_6_window_kernel_row_number_and_percent_rank() {
    use plan_builder::expr::{SortField, SortOrder, WindowExpr, WindowFunctionKind};

    let ctx = Context::default();
    let order_by = vec![SortField { column: Expression::Literal(Value::Null), order: SortOrder::Ascending }];

    let rows = [(1, 10), (1, 20), (2, 5), (1, 20)];

    let row_number_expr = WindowExpr { kind: WindowFunctionKind::RowNumber, args: Vec::new(), partition_by: Vec::new(), order_by: order_by.clone() };
    let mut row_number_buf = new_buffer(&row_number_expr).unwrap();
    for (p, k) in rows {
        row_number_buf
            .add(&ctx, WindowInputRow { partition_by: vec![Value::I32(p)], order_by: vec![Value::I32(k)], args: Vec::new() })
            .unwrap();
    }
    row_number_buf.finish(&ctx).unwrap();
    let row_numbers: Vec<_> = (0..rows.len()).map(|i| row_number_buf.eval_row(i).unwrap()).collect();
    assert_eq!(row_numbers, vec![Value::U64(1), Value::U64(2), Value::U64(1), Value::U64(3)]);

    let percent_rank_expr = WindowExpr { kind: WindowFunctionKind::PercentRank, args: Vec::new(), partition_by: Vec::new(), order_by };
    let mut percent_rank_buf = new_buffer(&percent_rank_expr).unwrap();
    for (p, k) in rows {
        percent_rank_buf
            .add(&ctx, WindowInputRow { partition_by: vec![Value::I32(p)], order_by: vec![Value::I32(k)], args: Vec::new() })
            .unwrap();
    }
    percent_rank_buf.finish(&ctx).unwrap();
    let percent_ranks: Vec<_> = (0..rows.len()).map(|i| percent_rank_buf.eval_row(i).unwrap()).collect();
    assert_eq!(
        percent_ranks,
        vec![
            Value::Float { value: 0.0, decimal_text: None },
            Value::Float { value: 0.5, decimal_text: None },
            Value::Float { value: 0.0, decimal_text: None },
            Value::Float { value: 0.5, decimal_text: None },
        ]
    );
}

/// P5: `ORDER BY k` resolves the k-th projected column; an out-of-range
/// ordinal fails.
#[test]
fn p5_order_by_ordinal_position() {
    let catalog = TestCatalog::new();
    let select = select(vec![SelectItem::Expr(col("x")), SelectItem::Expr(col("y"))], Some(table_from("xy", None)), None);
    let mut q = query(QueryNodeBody::Select(Box::new(select)));
    q.order_by = vec![OrderByExpr { expr: number("2"), descending: true }];
    let stmt = Statement::Query(q);

    let node = build(&catalog, &stmt);
    match node {
        PlanNode::Sort(s) => {
            assert_eq!(s.order_by.len(), 1);
            match &s.order_by[0].column {
                Expression::Column(c) => assert_eq!(c.name, "y"),
                other => panic!("expected Column, got {other:?}"),
            }
        }
        other => panic!("expected Sort, got {other:?}"),
    }

    let select = select(vec![SelectItem::Expr(col("x"))], Some(table_from("xy", None)), None);
    let mut q = query(QueryNodeBody::Select(Box::new(select)));
    q.order_by = vec![OrderByExpr { expr: number("5"), descending: false }];
    let stmt = Statement::Query(q);
    let err = try_build(&catalog, &stmt).unwrap_err();
    assert_eq!(err.kind(), plan_error::ErrorKind::Resolution);
}

/// Directly exercises `relational::build_query` (rather than
/// `Builder::build`) to confirm the crate's lower-level entry point is
/// itself usable without going through statement dispatch.
#[test]
fn relational_build_query_entry_point() {
    let catalog = TestCatalog::new();
    let ctx = Context::default();
    let mut builder = Builder::new(&ctx, &catalog);
    let select = select(vec![SelectItem::Wildcard], Some(table_from("xy", None)), None);
    let q = query(QueryNodeBody::Select(Box::new(select)));

    let (node, scope) = relational::build_query(&mut builder, plan_builder::scope::Scope::root(), &q).unwrap();
    assert!(node.resolved());
    assert_eq!(scope.cols.len(), 2);
}
