use plan_error::{PlanError, Result};
use plan_types::SqlType;

use super::{check_arity, AggregateFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sum;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Avg;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitAnd;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitOr;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitXor;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupConcat;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonArrayAgg;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JsonObjectAgg;

impl AggregateFunction for Sum {
    fn name(&self) -> &str {
        "sum"
    }

    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("sum", input_types, 1)?;
        if !input_types[0].is_numeric() {
            return Err(PlanError::type_error(format!(
                "sum requires a numeric argument, got {}",
                input_types[0]
            )));
        }
        Ok(match &input_types[0] {
            SqlType::Float | SqlType::Double => SqlType::Double,
            SqlType::Decimal { precision, scale } => SqlType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            _ => SqlType::BigInt,
        })
    }
}

impl AggregateFunction for Avg {
    fn name(&self) -> &str {
        "avg"
    }

    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("avg", input_types, 1)?;
        if !input_types[0].is_numeric() {
            return Err(PlanError::type_error(format!(
                "avg requires a numeric argument, got {}",
                input_types[0]
            )));
        }
        Ok(match &input_types[0] {
            SqlType::Decimal { precision, scale } => SqlType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            _ => SqlType::Double,
        })
    }
}

impl AggregateFunction for Count {
    fn name(&self) -> &str {
        "count"
    }

    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("count", input_types, 1)?;
        Ok(SqlType::BigInt)
    }
}

fn bitwise_return_type(name: &'static str, input_types: &[SqlType]) -> Result<SqlType> {
    check_arity(name, input_types, 1)?;
    if !input_types[0].is_numeric() {
        return Err(PlanError::type_error(format!(
            "{name} requires an integer argument, got {}",
            input_types[0]
        )));
    }
    Ok(SqlType::UnsignedBigInt)
}

impl AggregateFunction for BitAnd {
    fn name(&self) -> &str {
        "bit_and"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        bitwise_return_type("bit_and", input_types)
    }
}

impl AggregateFunction for BitOr {
    fn name(&self) -> &str {
        "bit_or"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        bitwise_return_type("bit_or", input_types)
    }
}

impl AggregateFunction for BitXor {
    fn name(&self) -> &str {
        "bit_xor"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        bitwise_return_type("bit_xor", input_types)
    }
}

impl AggregateFunction for GroupConcat {
    fn name(&self) -> &str {
        "group_concat"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("group_concat", input_types, 1)?;
        Ok(SqlType::Text)
    }
}

impl AggregateFunction for JsonArrayAgg {
    fn name(&self) -> &str {
        "json_arrayagg"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("json_arrayagg", input_types, 1)?;
        Ok(SqlType::Json)
    }
}

impl AggregateFunction for JsonObjectAgg {
    fn name(&self) -> &str {
        "json_objectagg"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("json_objectagg", input_types, 2)?;
        Ok(SqlType::Json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_widens_small_ints_to_bigint() {
        assert_eq!(Sum.return_type(&[SqlType::TinyInt]).unwrap(), SqlType::BigInt);
    }

    #[test]
    fn sum_rejects_text() {
        assert!(Sum.return_type(&[SqlType::Text]).is_err());
    }

    #[test]
    fn count_accepts_any_type() {
        assert_eq!(Count.return_type(&[SqlType::Text]).unwrap(), SqlType::BigInt);
    }

    #[test]
    fn wrong_arity_is_an_arity_error() {
        let err = Sum.return_type(&[]).unwrap_err();
        assert_eq!(err.kind(), plan_error::ErrorKind::Arity);
    }
}
