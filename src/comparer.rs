//! Typed key comparers.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use arq_core::{DefaultComparer, Element, Value, ValueComparer};
use common_error::{ArqError, ArqResult, GenericError};

/// Equality and hashing over typed keys.
///
/// Keys that compare equal must hash equally. Failures surface as a
/// `SelectorFault` at the element being matched.
pub trait EqualityComparer<K>: Send + Sync + 'static {
    /// Whether two keys are equal.
    fn equals(&self, left: &K, right: &K) -> Result<bool, GenericError>;

    /// Hash a key.
    fn hash(&self, key: &K) -> Result<u64, GenericError>;

    /// Name used in explain output and logs.
    fn name(&self) -> &str {
        "custom"
    }
}

/// A key comparer accepted by the `*_with_comparer` operators.
pub struct Comparer<K> {
    inner: Arc<dyn ValueComparer>,
    _key: PhantomData<fn(&K)>,
}

impl<K: Element> Comparer<K> {
    /// Wrap a typed equality comparer.
    pub fn new(comparer: impl EqualityComparer<K>) -> Self {
        Self {
            inner: KeyComparer::erase(comparer),
            _key: PhantomData,
        }
    }

    /// A comparer from an equality and a hash closure.
    pub fn from_fns<E, H>(name: impl Into<String>, equals: E, hash: H) -> Self
    where
        E: Fn(&K, &K) -> bool + Send + Sync + 'static,
        H: Fn(&K) -> u64 + Send + Sync + 'static,
    {
        Self::new(FnComparer::new(name, equals, hash))
    }

    /// Structural equality, the comparer used when none is given.
    pub fn structural() -> Self {
        Self {
            inner: Arc::new(DefaultComparer),
            _key: PhantomData,
        }
    }

    /// Name shown in explain output.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub(crate) fn into_value_comparer(self) -> Arc<dyn ValueComparer> {
        self.inner
    }
}

impl<K> Clone for Comparer<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _key: PhantomData,
        }
    }
}

impl<K> fmt::Debug for Comparer<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Comparer").field(&self.inner.name()).finish()
    }
}

/// A comparer built from two closures.
pub struct FnComparer<K, E, H> {
    name: String,
    equals: E,
    hash: H,
    _key: PhantomData<fn(&K)>,
}

impl<K, E, H> FnComparer<K, E, H>
where
    E: Fn(&K, &K) -> bool + Send + Sync + 'static,
    H: Fn(&K) -> u64 + Send + Sync + 'static,
{
    /// Build from an equality and a hash closure.
    pub fn new(name: impl Into<String>, equals: E, hash: H) -> Self {
        Self {
            name: name.into(),
            equals,
            hash,
            _key: PhantomData,
        }
    }
}

impl<K, E, H> EqualityComparer<K> for FnComparer<K, E, H>
where
    K: 'static,
    E: Fn(&K, &K) -> bool + Send + Sync + 'static,
    H: Fn(&K) -> u64 + Send + Sync + 'static,
{
    fn equals(&self, left: &K, right: &K) -> Result<bool, GenericError> {
        Ok((self.equals)(left, right))
    }

    fn hash(&self, key: &K) -> Result<u64, GenericError> {
        Ok((self.hash)(key))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Bridges an [`EqualityComparer`] over `K` to the runtime [`ValueComparer`].
pub(crate) struct KeyComparer<K, C> {
    comparer: C,
    _key: PhantomData<fn(&K)>,
}

impl<K: Element, C: EqualityComparer<K>> KeyComparer<K, C> {
    pub(crate) fn erase(comparer: C) -> Arc<dyn ValueComparer> {
        Arc::new(Self {
            comparer,
            _key: PhantomData,
        })
    }

    fn key(value: &Value) -> ArqResult<K> {
        K::from_value(value.clone()).map_err(|err| ArqError::selector_fault("comparer", err))
    }
}

impl<K: Element, C: EqualityComparer<K>> ValueComparer for KeyComparer<K, C> {
    fn equals(&self, left: &Value, right: &Value) -> ArqResult<bool> {
        let (left, right) = (Self::key(left)?, Self::key(right)?);
        self.comparer
            .equals(&left, &right)
            .map_err(|err| ArqError::selector_fault("comparer", err))
    }

    fn hash_value(&self, value: &Value) -> ArqResult<u64> {
        self.comparer
            .hash(&Self::key(value)?)
            .map_err(|err| ArqError::selector_fault("comparer", err))
    }

    fn name(&self) -> &str {
        self.comparer.name()
    }
}

impl<K, C: EqualityComparer<K>> fmt::Debug for KeyComparer<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyComparer")
            .field("name", &self.comparer.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use common_error::ErrorKind;

    use super::*;

    fn case_insensitive() -> Arc<dyn ValueComparer> {
        Comparer::<String>::from_fns(
            "case_insensitive",
            |a, b| a.eq_ignore_ascii_case(b),
            |k| k.to_ascii_lowercase().len() as u64,
        )
        .into_value_comparer()
    }

    #[test]
    fn test_typed_comparer_through_values() {
        let comparer = case_insensitive();
        assert_eq!(comparer.name(), "case_insensitive");
        assert!(comparer.equals(&Value::from("Ab"), &Value::from("aB")).unwrap());
        assert_eq!(
            comparer.hash_value(&Value::from("Ab")).unwrap(),
            comparer.hash_value(&Value::from("aB")).unwrap()
        );
    }

    #[test]
    fn test_key_of_wrong_type_is_selector_fault() {
        let comparer = case_insensitive();
        let err = comparer.hash_value(&Value::Int32(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SelectorFault);
        assert!(err.to_string().starts_with("SelectorFault: comparer failed"));
    }
}
