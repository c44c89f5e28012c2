//! Builtin aggregate function catalog.
//!
//! Spec §4.4 fixes the aggregate name list precisely:
//! `avg, bit_and, bit_or, bit_xor, count, group_concat, json_arrayagg,
//! json_objectagg, max, min, std, stddev_pop, stddev_samp, stddev, sum,
//! var_pop, var_samp, variance`.

mod minmax;
mod numeric;
mod variance;

use std::fmt::Debug;

use dyn_clone::DynClone;
use once_cell::sync::Lazy;
use plan_error::{PlanError, Result};
use plan_types::SqlType;

pub use minmax::{Max, Min};
pub use numeric::{Avg, BitAnd, BitOr, BitXor, Count, GroupConcat, JsonArrayAgg, JsonObjectAgg, Sum};
pub use variance::{Std, StddevPop, StddevSamp, Stddev, VarPop, VarSamp, Variance};

/// A catalog-resolvable aggregate function. Trait objects are what
/// `Expression::Aggregate` carries, mirroring the teacher's
/// `AggregateFunction`/`PlannedAggregateFunction` split collapsed into one
/// trait since this builder does not execute aggregates, only plans them.
pub trait AggregateFunction: Debug + DynClone + Send + Sync {
    fn name(&self) -> &str;

    /// Compute the return type given already-lowered argument types, or fail
    /// with `ErrorKind::Arity`/`ErrorKind::Type` if the inputs don't fit any
    /// signature.
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType>;
}

dyn_clone::clone_trait_object!(AggregateFunction);

/// Exactly the aggregate names spec §4.4 enumerates.
pub const AGGREGATE_NAMES: &[&str] = &[
    "avg",
    "bit_and",
    "bit_or",
    "bit_xor",
    "count",
    "group_concat",
    "json_arrayagg",
    "json_objectagg",
    "max",
    "min",
    "std",
    "stddev_pop",
    "stddev_samp",
    "stddev",
    "sum",
    "var_pop",
    "var_samp",
    "variance",
];

pub fn is_aggregate_name(name: &str) -> bool {
    AGGREGATE_NAMES.contains(&name.to_lowercase().as_str())
}

static BUILTINS: Lazy<Vec<Box<dyn AggregateFunction>>> = Lazy::new(|| {
    vec![
        Box::new(Sum),
        Box::new(Avg),
        Box::new(Count),
        Box::new(Min),
        Box::new(Max),
        Box::new(BitAnd),
        Box::new(BitOr),
        Box::new(BitXor),
        Box::new(GroupConcat),
        Box::new(JsonArrayAgg),
        Box::new(JsonObjectAgg),
        Box::new(Std),
        Box::new(StddevPop),
        Box::new(StddevSamp),
        Box::new(Stddev),
        Box::new(VarPop),
        Box::new(VarSamp),
        Box::new(Variance),
    ]
});

/// Resolve a lowercased aggregate function name to its catalog entry.
pub fn lookup(name: &str) -> Result<Box<dyn AggregateFunction>> {
    let lower = name.to_lowercase();
    BUILTINS
        .iter()
        .find(|f| f.name() == lower)
        .map(|f| dyn_clone::clone_box(&**f))
        .ok_or_else(|| PlanError::resolution(format!("no such aggregate function: {name}")))
}

pub(crate) fn check_arity(name: &str, input_types: &[SqlType], expected: usize) -> Result<()> {
    if input_types.len() != expected {
        return Err(PlanError::arity(format!(
            "{name} expects {expected} argument(s), got {}",
            input_types.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_spec_name_resolves() {
        for name in AGGREGATE_NAMES {
            lookup(name).unwrap_or_else(|e| panic!("{name} should resolve: {e}"));
        }
    }

    #[test]
    fn unknown_name_fails() {
        assert!(lookup("not_a_real_agg").is_err());
    }
}
