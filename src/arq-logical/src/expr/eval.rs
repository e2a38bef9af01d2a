//! In-process evaluation of declarative expressions.

use std::cmp::Ordering;

use arq_core::{DataType, Value};
use common_error::{ArqError, ArqResult};

use super::{AggFunc, BinaryOp, Expr, UnaryOp};

/// Evaluates an [`Expr`] against a single element.
///
/// Operands of binary operators must have the same type; there is no
/// implicit widening. Integer arithmetic is checked. `Null` operands yield
/// `Null`, except for the three-valued `AND`/`OR` and `IS NULL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExprEvaluator;

macro_rules! checked_int {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        let result = match $op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Subtract => a.checked_sub(b),
            BinaryOp::Multiply => a.checked_mul(b),
            BinaryOp::Divide => a.checked_div(b),
            BinaryOp::Modulo => a.checked_rem(b),
            _ => return Err(ArqError::internal(format!("{} is not arithmetic", $op))),
        };
        result.map(Value::$variant).ok_or_else(|| {
            ArqError::execution(format!(
                "{} {} {} overflows or divides by zero",
                a, $op, b
            ))
        })
    }};
}

macro_rules! float_op {
    ($op:expr, $a:expr, $b:expr, $variant:ident) => {{
        let (a, b) = ($a, $b);
        let result = match $op {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            BinaryOp::Modulo => a % b,
            _ => return Err(ArqError::internal(format!("{} is not arithmetic", $op))),
        };
        Ok(Value::$variant(result))
    }};
}

impl ExprEvaluator {
    /// Create a new expression evaluator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Evaluate an expression against `element`.
    pub fn evaluate(&self, expr: &Expr, element: &Value) -> ArqResult<Value> {
        match expr {
            Expr::Element => Ok(element.clone()),
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field { expr, index } => match self.evaluate(expr, element)? {
                Value::Tuple(mut fields) if *index < fields.len() => {
                    Ok(fields.swap_remove(*index))
                }
                Value::Null => Ok(Value::Null),
                other => Err(ArqError::type_error(format!(
                    "cannot access field {index} of {}",
                    other.type_name()
                ))),
            },
            Expr::Binary { left, op, right } => {
                let l = self.evaluate(left, element)?;
                // The right operand is not evaluated once the result is decided.
                match (op, &l) {
                    (BinaryOp::And, Value::Bool(false)) | (BinaryOp::Or, Value::Bool(true)) => {
                        return Ok(l);
                    }
                    _ => {}
                }
                let r = self.evaluate(right, element)?;
                Self::binary(*op, l, r)
            }
            Expr::Unary { op, expr } => Self::unary(*op, self.evaluate(expr, element)?),
            Expr::Aggregate { func, expr } => match self.evaluate(expr, element)? {
                Value::List(items) => Self::aggregate(*func, items),
                other => Err(ArqError::type_error(format!(
                    "{func} expects a group, got {}",
                    other.type_name()
                ))),
            },
            Expr::Cast { expr, to } => Self::cast(self.evaluate(expr, element)?, *to),
            Expr::Tuple(items) => items
                .iter()
                .map(|item| self.evaluate(item, element))
                .collect::<ArqResult<Vec<_>>>()
                .map(Value::Tuple),
        }
    }

    /// Evaluate a predicate. `Null` counts as false.
    pub fn evaluate_predicate(&self, expr: &Expr, element: &Value) -> ArqResult<bool> {
        match self.evaluate(expr, element)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            other => Err(ArqError::type_error(format!(
                "predicate must evaluate to Bool, got {}",
                other.type_name()
            ))),
        }
    }

    fn binary(op: BinaryOp, left: Value, right: Value) -> ArqResult<Value> {
        if op.is_logical() {
            return Self::logical(op, &left, &right);
        }
        if left.is_null() || right.is_null() {
            return Ok(Value::Null);
        }
        if op.is_arithmetic() {
            return Self::arithmetic(op, left, right);
        }

        let ordering = Self::compare(&left, &right)?;
        let result = match op {
            BinaryOp::Eq => ordering == Some(Ordering::Equal),
            BinaryOp::NotEq => ordering != Some(Ordering::Equal),
            BinaryOp::Lt => ordering == Some(Ordering::Less),
            BinaryOp::LtEq => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            BinaryOp::Gt => ordering == Some(Ordering::Greater),
            BinaryOp::GtEq => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            _ => return Err(ArqError::internal(format!("{op} is not a comparison"))),
        };
        Ok(Value::Bool(result))
    }

    fn arithmetic(op: BinaryOp, left: Value, right: Value) -> ArqResult<Value> {
        match (left, right) {
            (Value::Int8(a), Value::Int8(b)) => checked_int!(op, a, b, Int8),
            (Value::Int16(a), Value::Int16(b)) => checked_int!(op, a, b, Int16),
            (Value::Int32(a), Value::Int32(b)) => checked_int!(op, a, b, Int32),
            (Value::Int64(a), Value::Int64(b)) => checked_int!(op, a, b, Int64),
            (Value::UInt8(a), Value::UInt8(b)) => checked_int!(op, a, b, UInt8),
            (Value::UInt16(a), Value::UInt16(b)) => checked_int!(op, a, b, UInt16),
            (Value::UInt32(a), Value::UInt32(b)) => checked_int!(op, a, b, UInt32),
            (Value::UInt64(a), Value::UInt64(b)) => checked_int!(op, a, b, UInt64),
            (Value::Float32(a), Value::Float32(b)) => float_op!(op, a, b, Float32),
            (Value::Float64(a), Value::Float64(b)) => float_op!(op, a, b, Float64),
            (l, r) => Err(ArqError::type_error(format!(
                "cannot apply {op} to {} and {}",
                l.type_name(),
                r.type_name()
            ))),
        }
    }

    fn compare(left: &Value, right: &Value) -> ArqResult<Option<Ordering>> {
        let ordering = match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int8(a), Value::Int8(b)) => a.partial_cmp(b),
            (Value::Int16(a), Value::Int16(b)) => a.partial_cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.partial_cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.partial_cmp(b),
            (Value::UInt8(a), Value::UInt8(b)) => a.partial_cmp(b),
            (Value::UInt16(a), Value::UInt16(b)) => a.partial_cmp(b),
            (Value::UInt32(a), Value::UInt32(b)) => a.partial_cmp(b),
            (Value::UInt64(a), Value::UInt64(b)) => a.partial_cmp(b),
            (Value::Float32(a), Value::Float32(b)) => a.partial_cmp(b),
            (Value::Float64(a), Value::Float64(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                if a == b {
                    Some(Ordering::Equal)
                } else {
                    None
                }
            }
            (l, r) => {
                return Err(ArqError::type_error(format!(
                    "cannot compare {} with {}",
                    l.type_name(),
                    r.type_name()
                )));
            }
        };
        Ok(ordering)
    }

    fn logical(op: BinaryOp, left: &Value, right: &Value) -> ArqResult<Value> {
        let as_logical = |v: &Value| -> ArqResult<Option<bool>> {
            match v {
                Value::Bool(b) => Ok(Some(*b)),
                Value::Null => Ok(None),
                other => Err(ArqError::type_error(format!(
                    "{op} expects Bool operands, got {}",
                    other.type_name()
                ))),
            }
        };

        let result = match (op, as_logical(left)?, as_logical(right)?) {
            (BinaryOp::And, Some(false), _) | (BinaryOp::And, _, Some(false)) => Some(false),
            (BinaryOp::And, Some(true), Some(true)) => Some(true),
            (BinaryOp::Or, Some(true), _) | (BinaryOp::Or, _, Some(true)) => Some(true),
            (BinaryOp::Or, Some(false), Some(false)) => Some(false),
            _ => None,
        };
        Ok(result.map_or(Value::Null, Value::Bool))
    }

    fn unary(op: UnaryOp, value: Value) -> ArqResult<Value> {
        match (op, value) {
            (UnaryOp::IsNull, v) => Ok(Value::Bool(v.is_null())),
            (_, Value::Null) => Ok(Value::Null),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
            (UnaryOp::Neg, Value::Int8(v)) => v.checked_neg().map(Value::Int8).ok_or_else(overflow),
            (UnaryOp::Neg, Value::Int16(v)) => {
                v.checked_neg().map(Value::Int16).ok_or_else(overflow)
            }
            (UnaryOp::Neg, Value::Int32(v)) => {
                v.checked_neg().map(Value::Int32).ok_or_else(overflow)
            }
            (UnaryOp::Neg, Value::Int64(v)) => {
                v.checked_neg().map(Value::Int64).ok_or_else(overflow)
            }
            (UnaryOp::Neg, Value::Float32(v)) => Ok(Value::Float32(-v)),
            (UnaryOp::Neg, Value::Float64(v)) => Ok(Value::Float64(-v)),
            (op, v) => Err(ArqError::type_error(format!(
                "cannot apply {op} to {}",
                v.type_name()
            ))),
        }
    }

    fn aggregate(func: AggFunc, items: Vec<Value>) -> ArqResult<Value> {
        if func == AggFunc::Count {
            let count = i64::try_from(items.len())
                .map_err(|_| ArqError::execution("group too large to count"))?;
            return Ok(Value::Int64(count));
        }

        let mut acc: Option<Value> = None;
        for item in items.into_iter().filter(|v| !v.is_null()) {
            acc = Some(match acc {
                None => item,
                Some(current) => match func {
                    AggFunc::Sum => Self::arithmetic(BinaryOp::Add, current, item)?,
                    AggFunc::Min if Self::compare(&item, &current)? == Some(Ordering::Less) => {
                        item
                    }
                    AggFunc::Max
                        if Self::compare(&item, &current)? == Some(Ordering::Greater) =>
                    {
                        item
                    }
                    _ => current,
                },
            });
        }
        Ok(acc.unwrap_or(Value::Null))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn cast(value: Value, to: DataType) -> ArqResult<Value> {
        if value.is_null() || value.data_type() == to {
            return Ok(value);
        }
        if !value.data_type().is_numeric() || !to.is_numeric() {
            return Err(ArqError::type_error(format!(
                "cannot cast {} to {to}",
                value.type_name()
            )));
        }

        let out_of_range = || ArqError::type_error(format!("{value} is out of range for {to}"));
        let wide = || -> ArqResult<i128> {
            if let Some(i) = value.as_i128() {
                return Ok(i);
            }
            match value.as_f64() {
                Some(f) if f.is_finite() => Ok(f.trunc() as i128),
                _ => Err(out_of_range()),
            }
        };

        macro_rules! to_int {
            ($ty:ty, $variant:ident) => {
                <$ty>::try_from(wide()?)
                    .map(Value::$variant)
                    .map_err(|_| out_of_range())
            };
        }

        match to {
            DataType::Int8 => to_int!(i8, Int8),
            DataType::Int16 => to_int!(i16, Int16),
            DataType::Int32 => to_int!(i32, Int32),
            DataType::Int64 => to_int!(i64, Int64),
            DataType::UInt8 => to_int!(u8, UInt8),
            DataType::UInt16 => to_int!(u16, UInt16),
            DataType::UInt32 => to_int!(u32, UInt32),
            DataType::UInt64 => to_int!(u64, UInt64),
            DataType::Float32 => value
                .as_f64()
                .map(|f| Value::Float32(f as f32))
                .ok_or_else(out_of_range),
            DataType::Float64 => value.as_f64().map(Value::Float64).ok_or_else(out_of_range),
            _ => Err(out_of_range()),
        }
    }
}

fn overflow() -> ArqError {
    ArqError::execution("negation overflows")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{arg, elem, lit};

    fn eval(expr: &Expr, element: Value) -> ArqResult<Value> {
        ExprEvaluator::new().evaluate(expr, &element)
    }

    #[test]
    fn test_group_join_result_expression() {
        let pair = Value::pair(
            Value::UInt8(2),
            Value::List(vec![Value::UInt8(2), Value::UInt8(2)]),
        );
        let expr = arg(0).add(arg(1).count().cast(DataType::UInt8));
        assert_eq!(eval(&expr, pair).unwrap(), Value::UInt8(4));
    }

    #[test]
    fn test_arithmetic_is_checked() {
        let err = eval(&elem().add(lit(1i8)), Value::Int8(i8::MAX)).unwrap_err();
        assert!(matches!(err, ArqError::ExecutionError(_)));

        let err = eval(&elem().div(lit(0u32)), Value::UInt32(4)).unwrap_err();
        assert!(matches!(err, ArqError::ExecutionError(_)));

        assert_eq!(
            eval(&elem().mul(lit(0.5f32)), Value::Float32(3.0)).unwrap(),
            Value::Float32(1.5)
        );
    }

    #[test]
    fn test_mixed_types_rejected() {
        let err = eval(&elem().add(lit(1i64)), Value::Int32(1)).unwrap_err();
        assert!(matches!(err, ArqError::TypeError(_)));
    }

    #[test]
    fn test_comparisons_and_nulls() {
        let evaluator = ExprEvaluator::new();
        let predicate = elem().gt_eq(lit(2u16));
        assert!(evaluator.evaluate_predicate(&predicate, &Value::UInt16(2)).unwrap());
        assert!(!evaluator.evaluate_predicate(&predicate, &Value::UInt16(1)).unwrap());
        assert!(!evaluator.evaluate_predicate(&predicate, &Value::Null).unwrap());

        assert_eq!(
            eval(&elem().is_null(), Value::Null).unwrap(),
            Value::Bool(true)
        );
    }

    #[test]
    fn test_three_valued_logic() {
        let expr = elem().and(lit(false));
        assert_eq!(eval(&expr, Value::Null).unwrap(), Value::Bool(false));

        let expr = elem().or(lit(false));
        assert_eq!(eval(&expr, Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_and_short_circuits() {
        let guarded = elem().not_eq(lit(0i32)).and(lit(10i32).div(elem()).gt(lit(1i32)));
        assert_eq!(eval(&guarded, Value::Int32(0)).unwrap(), Value::Bool(false));
        assert_eq!(eval(&guarded, Value::Int32(5)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_aggregates() {
        let group = Value::List(vec![Value::Int64(3), Value::Null, Value::Int64(-1)]);
        assert_eq!(eval(&elem().count(), group.clone()).unwrap(), Value::Int64(3));
        assert_eq!(eval(&elem().sum(), group.clone()).unwrap(), Value::Int64(2));
        assert_eq!(eval(&elem().min(), group.clone()).unwrap(), Value::Int64(-1));
        assert_eq!(eval(&elem().max(), group).unwrap(), Value::Int64(3));
        assert_eq!(eval(&elem().sum(), Value::List(vec![])).unwrap(), Value::Null);
    }

    #[test]
    fn test_casts() {
        assert_eq!(
            eval(&elem().cast(DataType::Int8), Value::Int64(-5)).unwrap(),
            Value::Int8(-5)
        );
        assert_eq!(
            eval(&elem().cast(DataType::UInt16), Value::Float64(7.9)).unwrap(),
            Value::UInt16(7)
        );
        assert!(eval(&elem().cast(DataType::UInt8), Value::Int32(300)).is_err());
        assert!(eval(&elem().cast(DataType::Int32), Value::Float32(f32::NAN)).is_err());
        assert!(eval(&elem().cast(DataType::String), Value::Int32(1)).is_err());
    }

    #[test]
    fn test_tuple_construction() {
        let expr = Expr::Tuple(vec![elem(), elem().mul(lit(2i16))]);
        assert_eq!(
            eval(&expr, Value::Int16(4)).unwrap(),
            Value::Tuple(vec![Value::Int16(4), Value::Int16(8)])
        );
        assert!(eval(&arg(3), Value::pair(Value::Null, Value::Null)).is_err());
    }
}
