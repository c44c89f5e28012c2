use plan_error::Result;
use plan_types::SqlType;

use super::{check_arity, AggregateFunction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Min;
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Max;

impl AggregateFunction for Min {
    fn name(&self) -> &str {
        "min"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("min", input_types, 1)?;
        Ok(input_types[0].clone())
    }
}

impl AggregateFunction for Max {
    fn name(&self) -> &str {
        "max"
    }
    fn return_type(&self, input_types: &[SqlType]) -> Result<SqlType> {
        check_arity("max", input_types, 1)?;
        Ok(input_types[0].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_max_pass_through_the_input_type() {
        assert_eq!(Min.return_type(&[SqlType::Int]).unwrap(), SqlType::Int);
        assert_eq!(Max.return_type(&[SqlType::Text]).unwrap(), SqlType::Text);
    }
}
