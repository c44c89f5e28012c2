//! Window function execution kernel (spec §4.5, §6 "Window function
//! surface").
//!
//! Unlike the rest of this crate, which only *plans* a statement, this
//! module is a small execution-time collaborator: a buffered,
//! stable-sort-based kernel for the four window functions the builder plans
//! (`ROW_NUMBER`, `PERCENT_RANK`, `LAG`, `FIRST_VALUE`). A caller feeds it
//! one already-evaluated row at a time (`add`), asks it to compute every
//! row's output once the partition is complete (`finish`), then reads
//! results back out in original row order (`eval_row`).
//!
//! `Value` carries no `Ord`/`PartialOrd` (a float payload makes a total
//! order impossible to derive), so sorting here goes through a hand-written,
//! type-aware comparator rather than a derived one.

use std::cmp::Ordering;

use plan_error::{PlanError, Result};
use plan_types::Value;

use crate::context::Context;
use crate::expr::{Expression, SortOrder, WindowExpr, WindowFunctionKind};

/// One row as fed into the kernel: the already-evaluated partition-by
/// values, order-by values, and the window function's own argument values,
/// for a single input row.
#[derive(Debug, Clone)]
pub struct WindowInputRow {
    pub partition_by: Vec<Value>,
    pub order_by: Vec<Value>,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
struct BufferedRow {
    insertion_index: usize,
    partition_by: Vec<Value>,
    order_by: Vec<Value>,
    args: Vec<Value>,
    output: Option<Value>,
}

/// The buffer handle returned by [`new_buffer`]. Holds every row added so
/// far plus the per-instance configuration (`LAG`'s offset/default, the
/// order-by directions) needed at `finish` time.
#[derive(Debug)]
pub struct WindowBuffer {
    kind: WindowFunctionKind,
    order_directions: Vec<SortOrder>,
    lag_offset: i64,
    lag_default: Value,
    rows: Vec<BufferedRow>,
    finished: bool,
}

/// Build a fresh buffer for one window function instance (spec §6,
/// `new_buffer() -> BufferRow`). `LAG`'s offset must be a non-negative
/// integer literal at plan time (spec §4.5); its default, if present, must
/// likewise already be a literal.
pub fn new_buffer(expr: &WindowExpr) -> Result<WindowBuffer> {
    let order_directions = expr.order_by.iter().map(|f| f.order).collect();

    let (lag_offset, lag_default) = if expr.kind == WindowFunctionKind::Lag {
        let offset = match expr.args.get(1) {
            Some(e) => literal_offset(e)?,
            None => 1,
        };
        let default = match expr.args.get(2) {
            Some(Expression::Literal(v)) => v.clone(),
            Some(_) => return Err(PlanError::type_error("LAG default must be a literal value")),
            None => Value::Null,
        };
        (offset, default)
    } else {
        (0, Value::Null)
    };

    Ok(WindowBuffer {
        kind: expr.kind,
        order_directions,
        lag_offset,
        lag_default,
        rows: Vec::new(),
        finished: false,
    })
}

fn literal_offset(expr: &Expression) -> Result<i64> {
    let value = match expr {
        Expression::Literal(v) => v,
        _ => return Err(PlanError::type_error("LAG offset must be a literal integer")),
    };
    let n = match value {
        Value::I8(n) => *n as i64,
        Value::U8(n) => *n as i64,
        Value::I16(n) => *n as i64,
        Value::U16(n) => *n as i64,
        Value::I32(n) => *n as i64,
        Value::U32(n) => *n as i64,
        Value::I64(n) => *n,
        Value::U64(n) => *n as i64,
        _ => return Err(PlanError::type_error("LAG offset must be an integer literal")),
    };
    if n < 0 {
        return Err(PlanError::type_error("LAG offset must not be negative"));
    }
    Ok(n)
}

impl WindowBuffer {
    /// Append one input row (spec §6, `add(ctx, buffer, row)`). Bookkeeping
    /// only: the row's output is computed later, in `finish`.
    pub fn add(&mut self, ctx: &Context, row: WindowInputRow) -> Result<()> {
        ctx.cancellation.check()?;
        self.rows.push(BufferedRow {
            insertion_index: self.rows.len(),
            partition_by: row.partition_by,
            order_by: row.order_by,
            args: row.args,
            output: None,
        });
        Ok(())
    }

    /// Compute every row's output (spec §6, `finish(ctx, buffer)`; spec
    /// §4.5's "Finish" phase). Stable-sorts the buffer by `(partitionBy,
    /// orderBy)`, sweeps partitions computing each function's output, then
    /// restores original insertion order so `eval_row` can index by it.
    pub fn finish(&mut self, ctx: &Context) -> Result<()> {
        ctx.cancellation.check()?;

        let directions = self.order_directions.clone();
        self.rows.sort_by(|a, b| compare_rows(a, b, &directions));

        match self.kind {
            WindowFunctionKind::RowNumber => self.sweep_row_number(),
            WindowFunctionKind::PercentRank => self.sweep_percent_rank(),
            WindowFunctionKind::FirstValue => self.sweep_first_value(),
            WindowFunctionKind::Lag => self.sweep_lag(),
        }

        let partitions = count_partitions(&self.rows);
        self.rows.sort_by_key(|r| r.insertion_index);
        self.finished = true;

        tracing::trace!(rows = self.rows.len(), partitions, kind = ?self.kind, "window buffer finished");
        Ok(())
    }

    /// Read back the `i`-th buffered row's output (spec §6, `eval_row(i,
    /// buffer)`), in original insertion order. Panics if `finish` has not
    /// run yet or `i` is out of range, same as indexing any other buffer the
    /// caller owns.
    pub fn eval_row(&self, i: usize) -> Result<Value> {
        if !self.finished {
            return Err(PlanError::type_error("eval_row called before finish"));
        }
        self.rows
            .get(i)
            .and_then(|r| r.output.clone())
            .ok_or_else(|| PlanError::type_error(format!("row index {i} out of range")))
    }

    fn sweep_row_number(&mut self) {
        let mut position: u64 = 0;
        for i in 0..self.rows.len() {
            if i == 0 || self.rows[i].partition_by != self.rows[i - 1].partition_by {
                position = 0;
            }
            position += 1;
            self.rows[i].output = Some(Value::U64(position));
        }
    }

    /// `RANK`-style position (advances only at a new peer group, i.e. a row
    /// whose order-by values differ from the previous row's), turned into
    /// `PERCENT_RANK = (rank - 1) / (n - 1)` once each partition's size `n`
    /// is known; `n = 1` partitions report `0.0` (spec §4.5).
    fn sweep_percent_rank(&mut self) {
        let len = self.rows.len();
        let mut ranks = vec![0u64; len];
        let mut partition_start = 0usize;
        let mut rank = 0u64;

        for i in 0..len {
            let new_partition = i == 0 || self.rows[i].partition_by != self.rows[i - 1].partition_by;
            if new_partition {
                partition_start = i;
                rank = 1;
            } else if self.rows[i].order_by != self.rows[i - 1].order_by {
                rank = (i - partition_start) as u64 + 1;
            }
            ranks[i] = rank;
        }

        for (start, end) in partition_bounds(&self.rows) {
            let n = (end - start) as f64;
            for k in start..end {
                let r = ranks[k] as f64;
                let pct = if n <= 1.0 { 0.0 } else { (r - 1.0) / (n - 1.0) };
                self.rows[k].output = Some(Value::Float { value: pct, decimal_text: None });
            }
        }
    }

    fn sweep_first_value(&mut self) {
        for (start, end) in partition_bounds(&self.rows) {
            let first = self.rows[start].args.first().cloned().unwrap_or(Value::Null);
            for k in start..end {
                self.rows[k].output = Some(first.clone());
            }
        }
    }

    fn sweep_lag(&mut self) {
        let offset = self.lag_offset;
        let default = self.lag_default.clone();
        for (start, end) in partition_bounds(&self.rows) {
            for k in start..end {
                let source = k as i64 - offset;
                let value = if source >= start as i64 && (source as usize) < end {
                    self.rows[source as usize].args.first().cloned().unwrap_or(Value::Null)
                } else {
                    default.clone()
                };
                self.rows[k].output = Some(value);
            }
        }
    }
}

/// `[start, end)` bounds of each partition in an already sorted buffer,
/// detected by plain equality of the partition-by values (spec §4.5).
fn partition_bounds(rows: &[BufferedRow]) -> Vec<(usize, usize)> {
    let mut bounds = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let mut j = i + 1;
        while j < rows.len() && rows[j].partition_by == rows[i].partition_by {
            j += 1;
        }
        bounds.push((i, j));
        i = j;
    }
    bounds
}

fn count_partitions(rows: &[BufferedRow]) -> usize {
    partition_bounds(rows).len()
}

fn compare_rows(a: &BufferedRow, b: &BufferedRow, directions: &[SortOrder]) -> Ordering {
    for (x, y) in a.partition_by.iter().zip(&b.partition_by) {
        match compare_values(x, y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    for (i, (x, y)) in a.order_by.iter().zip(&b.order_by).enumerate() {
        let ord = compare_values(x, y);
        let ord = match directions.get(i) {
            Some(SortOrder::Descending) => ord.reverse(),
            _ => ord,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Type-aware comparison used by the sort in `finish` (spec §4.5). `NULL`
/// sorts low; numeric variants compare as `f64`; strings and byte strings
/// compare lexically.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bytes(x), Value::Bytes(y)) => x.cmp(y),
        _ => numeric(a).partial_cmp(&numeric(b)).unwrap_or(Ordering::Equal),
    }
}

fn numeric(value: &Value) -> f64 {
    match value {
        Value::I8(n) => *n as f64,
        Value::U8(n) => *n as f64,
        Value::I16(n) => *n as f64,
        Value::U16(n) => *n as f64,
        Value::I32(n) => *n as f64,
        Value::U32(n) => *n as f64,
        Value::I64(n) => *n as f64,
        Value::U64(n) => *n as f64,
        Value::Float { value, .. } => *value,
        Value::Bit { value, .. } => *value as f64,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(partition: i32, order: i32, arg: i32) -> WindowInputRow {
        WindowInputRow {
            partition_by: vec![Value::I32(partition)],
            order_by: vec![Value::I32(order)],
            args: vec![Value::I32(arg)],
        }
    }

    fn expr(kind: WindowFunctionKind, args: Vec<Expression>) -> WindowExpr {
        WindowExpr {
            kind,
            args,
            partition_by: Vec::new(),
            order_by: vec![crate::expr::SortField {
                column: Expression::Literal(Value::Null),
                order: SortOrder::Ascending,
            }],
        }
    }

    #[test]
    fn row_number_resets_per_partition() {
        let ctx = Context::default();
        let mut buf = new_buffer(&expr(WindowFunctionKind::RowNumber, Vec::new())).unwrap();
        buf.add(&ctx, row(1, 1, 10)).unwrap();
        buf.add(&ctx, row(1, 2, 20)).unwrap();
        buf.add(&ctx, row(2, 1, 30)).unwrap();
        buf.finish(&ctx).unwrap();

        assert_eq!(buf.eval_row(0).unwrap(), Value::U64(1));
        assert_eq!(buf.eval_row(1).unwrap(), Value::U64(2));
        assert_eq!(buf.eval_row(2).unwrap(), Value::U64(1));
    }

    #[test]
    fn percent_rank_handles_ties_and_singleton_partitions() {
        let ctx = Context::default();
        let mut buf = new_buffer(&expr(WindowFunctionKind::PercentRank, Vec::new())).unwrap();
        buf.add(&ctx, row(1, 1, 0)).unwrap();
        buf.add(&ctx, row(1, 1, 0)).unwrap();
        buf.add(&ctx, row(1, 2, 0)).unwrap();
        buf.add(&ctx, row(2, 1, 0)).unwrap();
        buf.finish(&ctx).unwrap();

        assert_eq!(buf.eval_row(0).unwrap(), Value::Float { value: 0.0, decimal_text: None });
        assert_eq!(buf.eval_row(1).unwrap(), Value::Float { value: 0.0, decimal_text: None });
        assert_eq!(buf.eval_row(2).unwrap(), Value::Float { value: 1.0, decimal_text: None });
        assert_eq!(buf.eval_row(3).unwrap(), Value::Float { value: 0.0, decimal_text: None });
    }

    #[test]
    fn first_value_propagates_across_partition() {
        let ctx = Context::default();
        let mut buf = new_buffer(&expr(WindowFunctionKind::FirstValue, vec![Expression::Literal(Value::Null)])).unwrap();
        buf.add(&ctx, row(1, 2, 99)).unwrap();
        buf.add(&ctx, row(1, 1, 11)).unwrap();
        buf.finish(&ctx).unwrap();

        assert_eq!(buf.eval_row(0).unwrap(), Value::I32(11));
        assert_eq!(buf.eval_row(1).unwrap(), Value::I32(11));
    }

    #[test]
    fn lag_uses_default_before_offset_reaches_a_row() {
        let ctx = Context::default();
        let lag_expr = expr(
            WindowFunctionKind::Lag,
            vec![Expression::Literal(Value::Null), Expression::Literal(Value::I32(1)), Expression::Literal(Value::I32(-1))],
        );
        let mut buf = new_buffer(&lag_expr).unwrap();
        buf.add(&ctx, row(1, 1, 10)).unwrap();
        buf.add(&ctx, row(1, 2, 20)).unwrap();
        buf.add(&ctx, row(1, 3, 30)).unwrap();
        buf.finish(&ctx).unwrap();

        assert_eq!(buf.eval_row(0).unwrap(), Value::I32(-1));
        assert_eq!(buf.eval_row(1).unwrap(), Value::I32(10));
        assert_eq!(buf.eval_row(2).unwrap(), Value::I32(20));
    }

    #[test]
    fn rejects_negative_lag_offset() {
        let lag_expr = expr(WindowFunctionKind::Lag, vec![Expression::Literal(Value::Null), Expression::Literal(Value::I32(-1))]);
        assert!(new_buffer(&lag_expr).is_err());
    }
}
