//! Keyed grouping shared by join and grouping operators.

use std::collections::HashMap;
use std::sync::Arc;

use common_error::ArqResult;

use crate::comparer::ValueComparer;
use crate::types::Value;

/// Values grouped by key under a [`ValueComparer`].
///
/// Groups keep first-appearance key order and, within a group, insertion
/// order. Lookups return an empty slice for absent keys.
#[derive(Debug)]
pub struct Lookup {
    comparer: Arc<dyn ValueComparer>,
    buckets: HashMap<u64, Vec<usize>>,
    groups: Vec<(Value, Vec<Value>)>,
}

impl Lookup {
    /// Create an empty lookup.
    pub fn new(comparer: Arc<dyn ValueComparer>) -> Self {
        Self {
            comparer,
            buckets: HashMap::new(),
            groups: Vec::new(),
        }
    }

    fn find(&self, hash: u64, key: &Value) -> ArqResult<Option<usize>> {
        if let Some(slots) = self.buckets.get(&hash) {
            for &slot in slots {
                if self.comparer.equals(&self.groups[slot].0, key)? {
                    return Ok(Some(slot));
                }
            }
        }
        Ok(None)
    }

    /// Add `value` to the group of `key`, creating the group if needed.
    pub fn insert(&mut self, key: Value, value: Value) -> ArqResult<()> {
        let hash = self.comparer.hash_value(&key)?;
        match self.find(hash, &key)? {
            Some(slot) => self.groups[slot].1.push(value),
            None => {
                self.buckets.entry(hash).or_default().push(self.groups.len());
                self.groups.push((key, vec![value]));
            }
        }
        Ok(())
    }

    /// Like [`insert`](Self::insert), but drops values with a `Null` key.
    ///
    /// Join keys that are null never match anything.
    pub fn insert_for_join(&mut self, key: Value, value: Value) -> ArqResult<()> {
        if key.is_null() {
            return Ok(());
        }
        self.insert(key, value)
    }

    /// Members of the group matching `key`.
    ///
    /// A `Null` probe key matches nothing.
    pub fn get(&self, key: &Value) -> ArqResult<&[Value]> {
        if key.is_null() {
            return Ok(&[]);
        }
        let hash = self.comparer.hash_value(key)?;
        Ok(self
            .find(hash, key)?
            .map_or(&[][..], |slot| self.groups[slot].1.as_slice()))
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the lookup has no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Consume into `(key, members)` pairs in first-appearance order.
    pub fn into_groups(self) -> Vec<(Value, Vec<Value>)> {
        self.groups
    }
}

#[cfg(test)]
mod tests {
    use common_error::ArqError;

    use super::*;
    use crate::comparer::DefaultComparer;

    fn default_lookup() -> Lookup {
        Lookup::new(Arc::new(DefaultComparer))
    }

    #[test]
    fn test_grouping_order() {
        let mut lookup = default_lookup();
        for (k, v) in [(2, 20), (1, 10), (2, 21), (3, 30), (1, 11)] {
            lookup.insert(Value::Int32(k), Value::Int32(v)).unwrap();
        }

        assert_eq!(lookup.len(), 3);
        assert_eq!(
            lookup.get(&Value::Int32(2)).unwrap(),
            &[Value::Int32(20), Value::Int32(21)]
        );
        assert!(lookup.get(&Value::Int32(9)).unwrap().is_empty());

        let keys: Vec<_> = lookup.into_groups().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![Value::Int32(2), Value::Int32(1), Value::Int32(3)]);
    }

    #[test]
    fn test_null_keys_skipped_for_join() {
        let mut lookup = default_lookup();
        lookup.insert_for_join(Value::Null, Value::Int32(1)).unwrap();
        lookup.insert_for_join(Value::Int32(1), Value::Int32(2)).unwrap();

        assert_eq!(lookup.len(), 1);
        assert!(lookup.get(&Value::Null).unwrap().is_empty());
    }

    #[derive(Debug)]
    struct AllEqual;

    impl ValueComparer for AllEqual {
        fn equals(&self, _: &Value, _: &Value) -> ArqResult<bool> {
            Ok(true)
        }

        fn hash_value(&self, _: &Value) -> ArqResult<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_custom_comparer_merges_groups() {
        let mut lookup = Lookup::new(Arc::new(AllEqual));
        for v in [1, 2, 3] {
            lookup.insert(Value::Int32(v), Value::Int32(v)).unwrap();
        }
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get(&Value::Int32(42)).unwrap().len(), 3);
    }

    #[derive(Debug)]
    struct Failing;

    impl ValueComparer for Failing {
        fn equals(&self, _: &Value, _: &Value) -> ArqResult<bool> {
            Err(ArqError::execution("comparer failed"))
        }

        fn hash_value(&self, _: &Value) -> ArqResult<u64> {
            Ok(1)
        }
    }

    #[test]
    fn test_comparer_errors_propagate() {
        let mut lookup = Lookup::new(Arc::new(Failing));
        lookup.insert(Value::Int32(1), Value::Int32(1)).unwrap();
        assert!(lookup.insert(Value::Int32(2), Value::Int32(2)).is_err());
    }
}
