//! Behavior of the typed surface: push-down, laziness, cancellation, faults.

mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use arq::config::{ArqConfig, CapabilityDescriptor, ExecutionConfig, PushdownMode};
use arq::core::{DataType, Value};
use arq::error::GenericError;
use arq::logical::{arg, elem, lit};
use arq::provider::{MemoryProvider, ProviderFailure};
use arq::{
    CancellationHandle, Comparer, ErrorKind, Grouping, QueryAdapter, Selector, SequenceState,
    reference,
};
use futures::StreamExt;

fn plus_count() -> Selector<(i32, Vec<i32>), i32> {
    Selector::expr(arg(0).add(arg(1).count().cast(DataType::Int32)))
}

fn slow_plus_count() -> Selector<(i32, Vec<i32>), i32> {
    Selector::asynchronous(|(o, m): (i32, Vec<i32>)| async move {
        tokio::time::sleep(Duration::from_millis(1)).await;
        Ok::<_, GenericError>(o + i32::try_from(m.len())?)
    })
}

fn numbers() -> (Arc<MemoryProvider>, QueryAdapter) {
    let provider = common::provider(&[1i32, 2, 3], &[1i32, 2, 3]);
    let adapter = common::adapter(&provider, ArqConfig::default());
    (provider, adapter)
}

#[tokio::test]
async fn test_declarative_group_join_runs_in_one_submission() {
    common::init_logging();
    let (provider, adapter) = numbers();
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();

    let query = outer
        .group_join(&inner, Selector::identity(), Selector::identity(), plus_count())
        .unwrap();
    assert_eq!(provider.submissions(), 0);
    assert_eq!(query.to_vec().await.unwrap(), vec![2, 3, 4]);
    assert_eq!(provider.submissions(), 1);
    assert_eq!(provider.last_query().unwrap().name(), "Map");
}

#[tokio::test]
async fn test_async_result_keeps_keyed_matching_in_provider() {
    let (provider, adapter) = numbers();
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();

    let query = outer
        .group_join(&inner, Selector::identity(), Selector::identity(), slow_plus_count())
        .unwrap();
    assert_eq!(query.to_vec().await.unwrap(), vec![2, 3, 4]);
    assert_eq!(provider.submissions(), 1);
    assert_eq!(provider.last_query().unwrap().name(), "GroupJoin");
}

#[tokio::test]
async fn test_host_keys_scan_each_side_once() {
    let (provider, adapter) = numbers();
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();

    let query = outer
        .group_join(
            &inner,
            Selector::sync(|v: i32| v),
            Selector::sync(|v: i32| v),
            plus_count(),
        )
        .unwrap();
    assert_eq!(query.to_vec().await.unwrap(), vec![2, 3, 4]);
    let names: Vec<_> = provider.queries().iter().map(|q| q.name()).collect();
    assert_eq!(names, vec!["Scan", "Scan"]);
    assert_eq!(adapter.stats().submissions(), 2);
    assert_eq!(adapter.stats().open_handles(), 0);
}

#[tokio::test]
async fn test_config_file_disables_pushdown() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"execution": {{"fetch_size": 1, "pushdown": "disabled"}}}}"#
    )
    .unwrap();
    let config = ArqConfig::from_file(file.path()).unwrap();
    assert_eq!(config.execution.pushdown, PushdownMode::Disabled);

    let provider = common::provider(&[1i32, 2, 3], &[1i32, 2, 3]);
    let adapter = common::adapter(&provider, config);
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();

    let rows = outer
        .filter(Selector::expr(elem().gt(lit(1i32))))
        .unwrap()
        .group_join(&inner, Selector::identity(), Selector::identity(), plus_count())
        .unwrap()
        .to_vec()
        .await
        .unwrap();
    assert_eq!(rows, vec![3, 4]);
    assert!(provider.queries().iter().all(|q| q.name() == "Scan"));
    assert!(adapter.stats().rows_fetched() >= 5);
}

#[tokio::test]
async fn test_explain_names_both_sides_of_the_split() {
    let provider = common::provider(&[1i32], &[1i32]);
    let adapter = common::adapter(
        &provider,
        ArqConfig::default().with_capabilities(CapabilityDescriptor::scan_only()),
    );
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();
    let explain = outer
        .group_join(&inner, Selector::identity(), Selector::identity(), slow_plus_count())
        .unwrap()
        .explain()
        .unwrap();

    assert!(explain.contains("Fragment #0:"));
    assert!(explain.contains("Fragment #1:"));
    assert!(explain.contains("GroupJoinExec"));
    assert_eq!(provider.submissions(), 0);
}

#[tokio::test]
async fn test_cancelled_before_start_yields_nothing() {
    let (provider, adapter) = numbers();
    let handle = CancellationHandle::new();
    handle.cancel();

    let query = adapter.source::<i32>("outer").unwrap();
    let err = query
        .to_vec_with_cancellation(handle.token())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationCancelled);
    assert_eq!(provider.submissions(), 0);
}

#[tokio::test]
async fn test_cancel_mid_enumeration_is_terminal() {
    let provider = common::provider(&[1i32, 2, 3], &[1i32, 2, 3]);
    let adapter = common::adapter(
        &provider,
        ArqConfig::default()
            .with_capabilities(CapabilityDescriptor::scan_only())
            .with_execution(ExecutionConfig::default().with_fetch_size(1)),
    );
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();
    let handle = CancellationHandle::new();

    let mut sequence = outer
        .group_join(&inner, Selector::identity(), Selector::identity(), slow_plus_count())
        .unwrap()
        .sequence_with_cancellation(handle.token());
    assert!(sequence.move_next().await.unwrap());
    assert_eq!(sequence.current(), Some(&2));

    handle.cancel();
    assert!(sequence.move_next().await.unwrap_err().is_cancelled());
    assert_eq!(sequence.state(), SequenceState::Cancelled);
    assert!(!sequence.move_next().await.unwrap());
    assert_eq!(adapter.stats().open_handles(), 0);
}

#[tokio::test]
async fn test_cancellable_selector_sees_the_token() {
    let (_, adapter) = numbers();
    let handle = CancellationHandle::new();
    let trigger = handle.clone();

    let query = adapter
        .source::<i32>("outer")
        .unwrap()
        .select(Selector::cancellable(move |v: i32, token| {
            if v == 2 {
                trigger.cancel();
            }
            async move {
                token.ensure_not_cancelled("selector")?;
                Ok::<_, GenericError>(v * 10)
            }
        }))
        .unwrap();

    let err = query
        .to_vec_with_cancellation(handle.token())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OperationCancelled);
}

#[tokio::test]
async fn test_provider_failure_surfaces_on_enumeration_only() {
    let provider = Arc::new(
        MemoryProvider::new()
            .with_collection("outer", common::values(&[1i32, 2]))
            .with_failure("outer", ProviderFailure::on_submit("replica offline")),
    );
    let adapter = common::adapter(&provider, ArqConfig::default());

    let query = adapter
        .source::<i32>("outer")
        .unwrap()
        .select(Selector::sync(|v: i32| v + 1))
        .unwrap();
    assert_eq!(provider.submissions(), 0);

    let mut sequence = query.sequence();
    let err = sequence.move_next().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ProviderExecution);
    assert!(err.to_string().ends_with("replica offline"));
    assert_eq!(sequence.state(), SequenceState::Faulted);
    assert!(!sequence.move_next().await.unwrap());
}

#[tokio::test]
async fn test_selector_fault_stops_at_the_element() {
    let (_, adapter) = numbers();
    let query = adapter
        .source::<i32>("outer")
        .unwrap()
        .select(Selector::try_sync(|v: i32| {
            if v == 2 {
                Err("two is not allowed".into())
            } else {
                Ok(v)
            }
        }))
        .unwrap();

    let results: Vec<_> = query.stream().collect().await;
    assert_eq!(results.len(), 2);
    assert_eq!(*results[0].as_ref().unwrap(), 1);
    let err = results[1].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SelectorFault);
    assert!(err.to_string().contains("two is not allowed"));
}

#[tokio::test]
async fn test_wrong_element_type_faults_sequence() {
    let (_, adapter) = numbers();
    let mut sequence = adapter.source::<String>("outer").unwrap().sequence();

    let err = sequence.move_next().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert_eq!(sequence.state(), SequenceState::Faulted);
    assert_eq!(adapter.stats().open_handles(), 0);
}

#[tokio::test]
async fn test_enumerating_twice_gives_same_rows() {
    let (provider, adapter) = numbers();
    let outer = adapter.source::<i32>("outer").unwrap();
    let inner = adapter.source::<i32>("inner").unwrap();
    let query = outer
        .group_join(&inner, Selector::identity(), Selector::identity(), slow_plus_count())
        .unwrap();

    let first = query.to_vec().await.unwrap();
    let second = query.to_vec().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.submissions(), 2);
}

#[tokio::test]
async fn test_join_and_group_by_match_reference() {
    let orders = [(1i32, 10i64), (3, 30), (1, 11), (2, 20), (1, 12)];
    let provider = common::provider(&[1i32, 2, 4], &orders);
    let adapter = common::adapter(&provider, ArqConfig::default());
    let customers = adapter.source::<i32>("outer").unwrap();
    let order_rows = adapter.source::<(i32, i64)>("inner").unwrap();

    let joined = customers
        .join(
            &order_rows,
            Selector::identity(),
            Selector::sync(|(customer, _): (i32, i64)| customer),
            Selector::sync(|(c, (_, amount)): (i32, (i32, i64))| (c, amount)),
        )
        .unwrap()
        .to_vec()
        .await
        .unwrap();
    let expected = reference::join(&[1, 2, 4], &orders, |c| *c, |o| o.0, |c, o| (c, o.1));
    assert_eq!(joined, expected);

    let grouped = order_rows
        .group_by(Selector::expr(elem().field(0)))
        .unwrap()
        .to_vec()
        .await
        .unwrap();
    let expected: Vec<_> = reference::group_by(&orders, |o| o.0)
        .into_iter()
        .map(|(key, items)| Grouping { key, items })
        .collect();
    assert_eq!(grouped, expected);
    assert_eq!(grouped[0].len(), 3);
}

#[tokio::test]
async fn test_group_by_with_comparer_merges_keys() {
    let words = ["Apple", "avocado", "Banana", "blueberry", "cherry"].map(String::from);
    let provider = common::provider(&words, &[0i32]);
    let adapter = common::adapter(&provider, ArqConfig::default());

    let first_letter = |word: &String| word.chars().next().map(|c| c.to_ascii_lowercase());
    let by_letter = Comparer::<String>::from_fns(
        "first_letter",
        move |a, b| first_letter(a) == first_letter(b),
        move |k| first_letter(k).map_or(0, u64::from),
    );
    let groups = adapter
        .source::<String>("outer")
        .unwrap()
        .group_by_with_comparer(Selector::identity(), by_letter)
        .unwrap()
        .to_vec()
        .await
        .unwrap();

    let keys: Vec<_> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(keys, vec!["Apple", "Banana", "cherry"]);
    assert_eq!(groups[1].items, vec!["Banana".to_string(), "blueberry".to_string()]);
}

#[tokio::test]
async fn test_take_stops_pulling() {
    let (_, adapter) = numbers();
    let rows = adapter
        .source::<i32>("outer")
        .unwrap()
        .select(Selector::asynchronous(|v: i32| async move { Ok::<_, GenericError>(v * 2) }))
        .unwrap()
        .take(2)
        .unwrap()
        .to_vec()
        .await
        .unwrap();
    assert_eq!(rows, vec![2, 4]);
}

#[test]
fn test_blocking_collect() {
    let (_, adapter) = numbers();
    let rows = adapter
        .source::<i32>("outer")
        .unwrap()
        .filter(Selector::sync(|v: i32| v != 2))
        .unwrap()
        .to_vec_blocking()
        .unwrap();
    assert_eq!(rows, vec![1, 3]);
}

#[test]
fn test_value_elements_pass_through() {
    let provider = Arc::new(MemoryProvider::new().with_collection(
        "mixed",
        vec![Value::Int32(1), Value::from("two"), Value::Null],
    ));
    let adapter = common::adapter(&provider, ArqConfig::default());
    let rows = adapter
        .source::<Value>("mixed")
        .unwrap()
        .filter(Selector::expr(elem().is_null().not()))
        .unwrap()
        .to_vec_blocking()
        .unwrap();
    assert_eq!(rows, vec![Value::Int32(1), Value::from("two")]);
}
