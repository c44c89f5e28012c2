use plan_error::{PlanError, Result};
use plan_types::SqlType;

use super::{check_arity, AggregateFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Std;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StddevPop;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StddevSamp;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stddev;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarPop;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarSamp;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variance;

fn numeric_to_double(name: &'static str, input_types: &[SqlType]) -> Result<SqlType> {
    check_arity(name, input_types, 1)?;
    if !input_types[0].is_numeric() {
        return Err(PlanError::type_error(format!(
            "{name} requires a numeric argument, got {}",
            input_types[0]
        )));
    }
    Ok(SqlType::Double)
}

macro_rules! impl_stat_aggregate {
    ($ty:ident, $name:literal) => {
        impl AggregateFunction for $ty {
            fn name(&self) -> &str {
                $name
            }
            fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
                numeric_to_double($name, input_types)
            }
        }
    };
}

impl_stat_aggregate!(Std, "std");
impl_stat_aggregate!(StddevPop, "stddev_pop");
impl_stat_aggregate!(StddevSamp, "stddev_samp");
impl_stat_aggregate!(Stddev, "stddev");
impl_stat_aggregate!(VarPop, "var_pop");
impl_stat_aggregate!(VarSamp, "var_samp");
impl_stat_aggregate!(Variance, "variance");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_aggregates_return_double() {
        assert_eq!(Std.return_type(&[SqlType::Int]).unwrap(), SqlType::Double);
        assert_eq!(Variance.return_type(&[SqlType::Double]).unwrap(), SqlType::Double);
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(StddevPop.return_type(&[SqlType::Text]).is_err());
    }
}
