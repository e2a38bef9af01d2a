use arq_core::{Element, Value};
use common_error::{ArqError, ArqResult};

/// One group produced by `group_by`: a key and its members in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grouping<K, T> {
    pub key: K,
    pub items: Vec<T>,
}

impl<K, T> Grouping<K, T> {
    /// Number of elements in the group.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<K: Element, T: Element> Element for Grouping<K, T> {
    fn into_value(self) -> Value {
        (self.key, self.items).into_value()
    }

    fn from_value(value: Value) -> ArqResult<Self> {
        <(K, Vec<T>)>::from_value(value)
            .map(|(key, items)| Self { key, items })
            .map_err(|err| ArqError::type_error(format!("grouping: {err}")))
    }
}
