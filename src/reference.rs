//! Synchronous reference operators.
//!
//! Straightforward in-memory versions of the keyed operators with the same
//! observable semantics as the asynchronous ones: outer order is kept, inner
//! elements appear in source order, null join keys never match, and groups
//! are ordered by first occurrence. They exist as an oracle for tests and
//! for callers that already hold their data in memory.
//!
//! ```rust
//! use arq::reference;
//!
//! let counts = reference::group_join(&[1, 2, 3], &[1, 2, 3], |o| *o, |i| *i, |o, m| o + m.len() as i32);
//! assert_eq!(counts, vec![2, 3, 4]);
//! ```

use arq_core::{DefaultComparer, Element, ValueComparer};

fn structural<K: Element + Clone>(left: &K, right: &K) -> bool {
    DefaultComparer
        .equals(&left.clone().into_value(), &right.clone().into_value())
        .unwrap_or(false)
}

fn is_null<K: Element + Clone>(key: &K) -> bool {
    key.clone().into_value().is_null()
}

/// Matching inner elements for each outer element, under `eq`.
fn matches<'a, U, K, E>(inner_keys: &'a [(K, &'a U)], key: &K, eq: &E) -> Vec<&'a U>
where
    K: Element + Clone,
    E: Fn(&K, &K) -> bool,
{
    if is_null(key) {
        return Vec::new();
    }
    inner_keys
        .iter()
        .filter(|(k, _)| !is_null(k) && eq(key, k))
        .map(|(_, u)| *u)
        .collect()
}

/// Group join using structural key equality.
pub fn group_join<T, U, K, R>(
    outer: &[T],
    inner: &[U],
    outer_key: impl Fn(&T) -> K,
    inner_key: impl Fn(&U) -> K,
    result: impl Fn(T, Vec<U>) -> R,
) -> Vec<R>
where
    T: Clone,
    U: Clone,
    K: Element + Clone,
{
    group_join_with(outer, inner, outer_key, inner_key, result, structural::<K>)
}

/// Group join using `eq` as key equality.
pub fn group_join_with<T, U, K, R>(
    outer: &[T],
    inner: &[U],
    outer_key: impl Fn(&T) -> K,
    inner_key: impl Fn(&U) -> K,
    result: impl Fn(T, Vec<U>) -> R,
    eq: impl Fn(&K, &K) -> bool,
) -> Vec<R>
where
    T: Clone,
    U: Clone,
    K: Element + Clone,
{
    let inner_keys: Vec<(K, &U)> = inner.iter().map(|u| (inner_key(u), u)).collect();
    outer
        .iter()
        .map(|o| {
            let found = matches(&inner_keys, &outer_key(o), &eq);
            result(o.clone(), found.into_iter().cloned().collect())
        })
        .collect()
}

/// Inner join using structural key equality.
pub fn join<T, U, K, R>(
    outer: &[T],
    inner: &[U],
    outer_key: impl Fn(&T) -> K,
    inner_key: impl Fn(&U) -> K,
    result: impl Fn(T, U) -> R,
) -> Vec<R>
where
    T: Clone,
    U: Clone,
    K: Element + Clone,
{
    join_with(outer, inner, outer_key, inner_key, result, structural::<K>)
}

/// Inner join using `eq` as key equality.
pub fn join_with<T, U, K, R>(
    outer: &[T],
    inner: &[U],
    outer_key: impl Fn(&T) -> K,
    inner_key: impl Fn(&U) -> K,
    result: impl Fn(T, U) -> R,
    eq: impl Fn(&K, &K) -> bool,
) -> Vec<R>
where
    T: Clone,
    U: Clone,
    K: Element + Clone,
{
    let inner_keys: Vec<(K, &U)> = inner.iter().map(|u| (inner_key(u), u)).collect();
    let mut out = Vec::new();
    for o in outer {
        for u in matches(&inner_keys, &outer_key(o), &eq) {
            out.push(result(o.clone(), u.clone()));
        }
    }
    out
}

/// Grouping using structural key equality. Null keys form their own group.
pub fn group_by<T, K>(source: &[T], key: impl Fn(&T) -> K) -> Vec<(K, Vec<T>)>
where
    T: Clone,
    K: Element + Clone,
{
    group_by_with(source, key, structural::<K>)
}

/// Grouping using `eq` as key equality.
pub fn group_by_with<T, K>(
    source: &[T],
    key: impl Fn(&T) -> K,
    eq: impl Fn(&K, &K) -> bool,
) -> Vec<(K, Vec<T>)>
where
    T: Clone,
    K: Element + Clone,
{
    let mut groups: Vec<(K, Vec<T>)> = Vec::new();
    for item in source {
        let k = key(item);
        match groups.iter_mut().find(|(existing, _)| eq(existing, &k)) {
            Some((_, members)) => members.push(item.clone()),
            None => groups.push((k, vec![item.clone()])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_join_keeps_unmatched_outer() {
        let out = group_join(&[1, 5], &[1, 1, 2], |o| *o, |i| *i, |o, m| (o, m.len()));
        assert_eq!(out, vec![(1, 2), (5, 0)]);
    }

    #[test]
    fn test_null_keys_never_join() {
        let outer = [None, Some(1)];
        let inner = [None, Some(1)];
        let out = join(&outer, &inner, |o| *o, |i| *i, |o, i| (o, i));
        assert_eq!(out, vec![(Some(1), Some(1))]);
    }

    #[test]
    fn test_nan_keys_group_together() {
        let groups = group_by(&[f64::NAN, 1.0, f64::NAN], |v| *v);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_custom_equality() {
        let out = group_join_with(&[1, 2], &[10, 20, 30], |o| *o, |i| *i, |o, m| (o, m), |_, _| true);
        assert_eq!(out, vec![(1, vec![10, 20, 30]), (2, vec![10, 20, 30])]);
    }
}
