//! Key equality used by joins and grouping.

use std::collections::hash_map::DefaultHasher;
use std::fmt::Debug;
use std::hash::{Hash, Hasher};

use common_error::ArqResult;

use crate::types::Value;

/// Equality and hashing over key values.
///
/// Implementations must keep `hash_value` consistent with `equals`: keys that
/// compare equal hash equally. Host comparers may fail; the error surfaces as
/// a selector fault at the element being processed.
pub trait ValueComparer: Send + Sync + Debug {
    /// Whether two keys are equal.
    fn equals(&self, left: &Value, right: &Value) -> ArqResult<bool>;

    /// Hash a key.
    fn hash_value(&self, value: &Value) -> ArqResult<u64>;

    /// Name used in explain output and logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// Structural equality over [`Value`].
///
/// Values of different variants never compare equal. Floats compare by value
/// except that `NaN` equals `NaN`, matching the reference operators' behavior
/// of grouping all `NaN` keys together.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparer;

impl DefaultComparer {
    fn eq(left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Float32(a), Value::Float32(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Float64(a), Value::Float64(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Self::eq(x, y))
            }
            _ => left == right,
        }
    }

    fn hash_into<H: Hasher>(value: &Value, state: &mut H) {
        std::mem::discriminant(value).hash(state);
        match value {
            Value::Null => {}
            Value::Bool(v) => v.hash(state),
            Value::Int8(v) => v.hash(state),
            Value::Int16(v) => v.hash(state),
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::UInt8(v) => v.hash(state),
            Value::UInt16(v) => v.hash(state),
            Value::UInt32(v) => v.hash(state),
            Value::UInt64(v) => v.hash(state),
            Value::Float32(v) => Self::float_bits(f64::from(*v)).hash(state),
            Value::Float64(v) => Self::float_bits(*v).hash(state),
            Value::String(v) => v.hash(state),
            Value::List(items) | Value::Tuple(items) => {
                items.len().hash(state);
                for item in items {
                    Self::hash_into(item, state);
                }
            }
        }
    }

    // -0.0 and 0.0 compare equal, and every NaN is one key.
    fn float_bits(v: f64) -> u64 {
        if v.is_nan() {
            f64::NAN.to_bits()
        } else if v == 0.0 {
            0
        } else {
            v.to_bits()
        }
    }
}

impl ValueComparer for DefaultComparer {
    fn equals(&self, left: &Value, right: &Value) -> ArqResult<bool> {
        Ok(Self::eq(left, right))
    }

    fn hash_value(&self, value: &Value) -> ArqResult<u64> {
        let mut hasher = DefaultHasher::new();
        Self::hash_into(value, &mut hasher);
        Ok(hasher.finish())
    }

    fn name(&self) -> &str {
        "default"
    }
}
