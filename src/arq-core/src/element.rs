//! Conversions between typed Rust values and [`Value`].

use common_error::{ArqError, ArqResult};

use crate::types::Value;

/// A Rust type that can flow through a query as a [`Value`].
///
/// The typed query surface is written once over this trait, so adding an
/// element type only needs an implementation here.
pub trait Element: Sized + Send + Sync + 'static {
    /// Convert into the runtime representation.
    fn into_value(self) -> Value;

    /// Convert back from the runtime representation.
    fn from_value(value: Value) -> ArqResult<Self>;
}

fn mismatch(expected: &str, got: &Value) -> ArqError {
    ArqError::type_error(format!("expected {expected}, got {}", got.type_name()))
}

macro_rules! impl_primitive_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Element for $ty {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }

                fn from_value(value: Value) -> ArqResult<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => Err(mismatch(stringify!($variant), &other)),
                    }
                }
            }
        )*
    };
}

impl_primitive_element!(
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
);

impl Element for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> ArqResult<Self> {
        Ok(value)
    }
}

impl<T: Element> Element for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, Element::into_value)
    }

    fn from_value(value: Value) -> ArqResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: Element> Element for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(Element::into_value).collect())
    }

    fn from_value(value: Value) -> ArqResult<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch("List", &other)),
        }
    }
}

impl<A: Element, B: Element> Element for (A, B) {
    fn into_value(self) -> Value {
        Value::pair(self.0.into_value(), self.1.into_value())
    }

    fn from_value(value: Value) -> ArqResult<Self> {
        match value {
            Value::Tuple(fields) if fields.len() == 2 => {
                let mut fields = fields.into_iter();
                match (fields.next(), fields.next()) {
                    (Some(a), Some(b)) => Ok((A::from_value(a)?, B::from_value(b)?)),
                    _ => Err(ArqError::internal("tuple arity changed during conversion")),
                }
            }
            other => Err(mismatch("Tuple of 2", &other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_roundtrip() {
        assert_eq!(u16::from_value(7u16.into_value()).unwrap(), 7);
        assert_eq!(f64::from_value(Value::Float64(0.5)).unwrap(), 0.5);
        assert!(i32::from_value(Value::Int64(1)).is_err());
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(None::<i8>.into_value(), Value::Null);
        assert_eq!(Option::<i8>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i8>::from_value(Value::Int8(3)).unwrap(), Some(3));
    }

    #[test]
    fn test_nested_group_pair() {
        let pair = (1i32, vec![1i32, 1]).into_value();
        assert_eq!(
            pair,
            Value::pair(
                Value::Int32(1),
                Value::List(vec![Value::Int32(1), Value::Int32(1)])
            )
        );
        let back = <(i32, Vec<i32>)>::from_value(pair).unwrap();
        assert_eq!(back, (1, vec![1, 1]));
    }

    #[test]
    fn test_type_error_message() {
        let err = u8::from_value(Value::String("x".into())).unwrap_err();
        assert_eq!(err.to_string(), "TypeError: expected UInt8, got String");
    }
}
