//! Native execution of provider queries over in-memory collections.
//!
//! Scans, filters, maps and limits stream. Joins and grouping drain their
//! inputs before producing the first row.

use std::sync::Arc;

use arq_core::{DefaultComparer, Lookup, Value};
use arq_logical::{Expr, ExprEvaluator, ProviderQuery};
use common_error::GenericError;

use super::provider::{MemoryError, MemoryProvider};
use crate::provider::RowSet;

pub(super) struct Interpreter<'a> {
    provider: &'a MemoryProvider,
}

impl<'a> Interpreter<'a> {
    pub(super) fn new(provider: &'a MemoryProvider) -> Self {
        Self { provider }
    }

    pub(super) fn rows(&self, query: &ProviderQuery) -> Result<RowSet, MemoryError> {
        match query {
            ProviderQuery::Scan { collection } => self.provider.scan(collection),
            ProviderQuery::Filter { input, predicate } => {
                let input = self.rows(input)?;
                let predicate = predicate.clone();
                Ok(Box::new(input.filter_map(move |row| {
                    let row = match row {
                        Ok(row) => row,
                        Err(err) => return Some(Err(err)),
                    };
                    match ExprEvaluator::new().evaluate_predicate(&predicate, &row) {
                        Ok(true) => Some(Ok(row)),
                        Ok(false) => None,
                        Err(err) => Some(Err(GenericError::from(MemoryError::from(err)))),
                    }
                })))
            }
            ProviderQuery::Map { input, projection } => {
                let input = self.rows(input)?;
                let projection = projection.clone();
                Ok(Box::new(input.map(move |row| {
                    let row = row?;
                    ExprEvaluator::new()
                        .evaluate(&projection, &row)
                        .map_err(|err| GenericError::from(MemoryError::from(err)))
                })))
            }
            ProviderQuery::Take { input, count } => Ok(Box::new(self.rows(input)?.take(*count))),
            ProviderQuery::GroupJoin {
                outer,
                inner,
                outer_key,
                inner_key,
            } => {
                let rows = self.match_keys(outer, inner, outer_key, inner_key, |o, matches| {
                    vec![Value::pair(o, Value::List(matches.to_vec()))]
                })?;
                Ok(materialized(rows))
            }
            ProviderQuery::Join {
                outer,
                inner,
                outer_key,
                inner_key,
            } => {
                let rows = self.match_keys(outer, inner, outer_key, inner_key, |o, matches| {
                    matches
                        .iter()
                        .map(|i| Value::pair(o.clone(), i.clone()))
                        .collect()
                })?;
                Ok(materialized(rows))
            }
            ProviderQuery::GroupBy { input, key } => {
                let evaluator = ExprEvaluator::new();
                let mut lookup = Lookup::new(Arc::new(DefaultComparer));
                for row in self.drain(input)? {
                    let k = evaluator.evaluate(key, &row)?;
                    lookup.insert(k, row)?;
                }
                let groups = lookup
                    .into_groups()
                    .into_iter()
                    .map(|(k, members)| Value::pair(k, Value::List(members)))
                    .collect();
                Ok(materialized(groups))
            }
        }
    }

    fn drain(&self, query: &ProviderQuery) -> Result<Vec<Value>, MemoryError> {
        self.rows(query)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| match err.downcast::<MemoryError>() {
                Ok(err) => *err,
                Err(err) => MemoryError::Injected(err.to_string()),
            })
    }

    /// Drains `outer`; the inner side is only read when the outer side has rows.
    fn match_keys<F>(
        &self,
        outer: &ProviderQuery,
        inner: &ProviderQuery,
        outer_key: &Expr,
        inner_key: &Expr,
        emit: F,
    ) -> Result<Vec<Value>, MemoryError>
    where
        F: Fn(Value, &[Value]) -> Vec<Value>,
    {
        let outer_rows = self.drain(outer)?;
        if outer_rows.is_empty() {
            return Ok(Vec::new());
        }

        let evaluator = ExprEvaluator::new();
        let mut lookup = Lookup::new(Arc::new(DefaultComparer));
        for row in self.drain(inner)? {
            let k = evaluator.evaluate(inner_key, &row)?;
            lookup.insert_for_join(k, row)?;
        }

        let mut out = Vec::with_capacity(outer_rows.len());
        for row in outer_rows {
            let k = evaluator.evaluate(outer_key, &row)?;
            let matches = lookup.get(&k)?;
            out.extend(emit(row, matches));
        }
        Ok(out)
    }
}

fn materialized(rows: Vec<Value>) -> RowSet {
    Box::new(rows.into_iter().map(Ok::<_, GenericError>))
}
