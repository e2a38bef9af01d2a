//! `group_join` across every numeric element type, every selector shape and
//! both key comparison modes, checked against the synchronous reference.

mod common;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Sync,
    Async,
    Cancellable,
}

const SHAPES: [Shape; 3] = [Shape::Sync, Shape::Async, Shape::Cancellable];

macro_rules! group_join_conformance {
    ($($module:ident => $t:ty),* $(,)?) => {
        $(
            mod $module {
                use arq::config::ArqConfig;
                use arq::error::GenericError;
                use arq::queryable::group_join;
                use arq::{Comparer, ErrorKind, Selector, SequenceState, reference};

                use super::common;
                use super::{SHAPES, Shape};

                fn numbers(raw: &[u8]) -> Vec<$t> {
                    raw.iter().map(|v| *v as $t).collect()
                }

                fn key(shape: Shape) -> Selector<$t, $t> {
                    match shape {
                        Shape::Sync => Selector::sync(|v| v),
                        Shape::Async => Selector::asynchronous(|v| async move { Ok::<_, GenericError>(v) }),
                        Shape::Cancellable => {
                            Selector::cancellable(|v, _token| async move { Ok::<_, GenericError>(v) })
                        }
                    }
                }

                fn plus_count(o: $t, matches: Vec<$t>) -> $t {
                    o + matches.len() as $t
                }

                fn result(shape: Shape) -> Selector<($t, Vec<$t>), $t> {
                    match shape {
                        Shape::Sync => Selector::sync(|(o, m)| plus_count(o, m)),
                        Shape::Async => {
                            Selector::asynchronous(|(o, m)| async move {
                                Ok::<_, GenericError>(plus_count(o, m))
                            })
                        }
                        Shape::Cancellable => Selector::cancellable(|(o, m), token| async move {
                            token.ensure_not_cancelled("result_selector")?;
                            Ok::<_, GenericError>(plus_count(o, m))
                        }),
                    }
                }

                fn all_equal() -> Comparer<$t> {
                    Comparer::from_fns("all_equal", |_, _| true, |_| 0)
                }

                #[tokio::test]
                async fn scenario_counts_matches() {
                    common::init_logging();
                    let data = numbers(&[1, 2, 3]);
                    let provider = common::provider(&data, &data);
                    let adapter = common::adapter(&provider, ArqConfig::default());
                    let outer = adapter.source::<$t>("outer").unwrap();
                    let inner = adapter.source::<$t>("inner").unwrap();

                    for shape in SHAPES {
                        let rows = outer
                            .group_join(&inner, key(shape), key(shape), result(shape))
                            .unwrap()
                            .to_vec()
                            .await
                            .unwrap();
                        assert_eq!(rows, numbers(&[2, 3, 4]), "{shape:?}");
                    }
                    assert_eq!(adapter.stats().open_handles(), 0);
                }

                #[tokio::test]
                async fn default_comparer_matches_reference() {
                    let outer_data = numbers(&[4, 1, 2, 9, 2, 3]);
                    let inner_data = numbers(&[2, 3, 3, 1, 7, 2, 2]);
                    let expected = reference::group_join(
                        &outer_data,
                        &inner_data,
                        |o| *o,
                        |i| *i,
                        plus_count,
                    );
                    let provider = common::provider(&outer_data, &inner_data);
                    let adapter = common::adapter(&provider, ArqConfig::default());
                    let outer = adapter.source::<$t>("outer").unwrap();
                    let inner = adapter.source::<$t>("inner").unwrap();

                    for shape in SHAPES {
                        let query = outer
                            .group_join(&inner, key(shape), key(shape), result(shape))
                            .unwrap();
                        assert_eq!(query.to_vec().await.unwrap(), expected, "{shape:?}");
                    }
                }

                #[tokio::test]
                async fn explicit_comparer_matches_reference() {
                    let outer_data = numbers(&[5, 1, 8]);
                    let inner_data = numbers(&[1, 2, 3, 4]);
                    let expected = reference::group_join_with(
                        &outer_data,
                        &inner_data,
                        |o| *o,
                        |i| *i,
                        plus_count,
                        |_, _| true,
                    );
                    assert_eq!(expected, numbers(&[9, 5, 12]));

                    let provider = common::provider(&outer_data, &inner_data);
                    let adapter = common::adapter(&provider, ArqConfig::default());
                    let outer = adapter.source::<$t>("outer").unwrap();
                    let inner = adapter.source::<$t>("inner").unwrap();

                    for shape in SHAPES {
                        let query = outer
                            .group_join_with_comparer(
                                &inner,
                                key(shape),
                                key(shape),
                                result(shape),
                                all_equal(),
                            )
                            .unwrap();
                        assert_eq!(query.to_vec().await.unwrap(), expected, "{shape:?}");
                    }
                }

                #[tokio::test]
                async fn empty_outer_yields_nothing() {
                    let provider = common::provider(&numbers(&[]), &numbers(&[1, 2]));
                    let adapter = common::adapter(&provider, ArqConfig::default());
                    let outer = adapter.source::<$t>("empty").unwrap();
                    let inner = adapter.source::<$t>("inner").unwrap();

                    for shape in SHAPES {
                        let mut sequence = outer
                            .group_join(&inner, key(shape), key(shape), result(shape))
                            .unwrap()
                            .sequence();
                        assert!(!sequence.move_next().await.unwrap());
                        assert_eq!(sequence.state(), SequenceState::Completed);
                    }
                }

                #[test]
                fn absent_arguments_rejected_before_enumeration() {
                    let data = numbers(&[1, 2, 3]);
                    let provider = common::provider(&data, &data);
                    let adapter = common::adapter(&provider, ArqConfig::default());
                    let outer = adapter.source::<$t>("outer").unwrap();
                    let inner = adapter.source::<$t>("inner").unwrap();

                    for shape in SHAPES {
                        let attempts = [
                            (
                                "outer",
                                group_join(
                                    None,
                                    Some(&inner),
                                    Some(key(shape)),
                                    Some(key(shape)),
                                    Some(result(shape)),
                                    None,
                                ),
                            ),
                            (
                                "inner",
                                group_join(
                                    Some(&outer),
                                    None::<&arq::AsyncQueryable<$t>>,
                                    Some(key(shape)),
                                    Some(key(shape)),
                                    Some(result(shape)),
                                    None,
                                ),
                            ),
                            (
                                "outer_key_selector",
                                group_join(
                                    Some(&outer),
                                    Some(&inner),
                                    None,
                                    Some(key(shape)),
                                    Some(result(shape)),
                                    None,
                                ),
                            ),
                            (
                                "inner_key_selector",
                                group_join(
                                    Some(&outer),
                                    Some(&inner),
                                    Some(key(shape)),
                                    None,
                                    Some(result(shape)),
                                    Some(all_equal()),
                                ),
                            ),
                            (
                                "result_selector",
                                group_join::<$t, $t, $t, $t>(
                                    Some(&outer),
                                    Some(&inner),
                                    Some(key(shape)),
                                    Some(key(shape)),
                                    None,
                                    None,
                                ),
                            ),
                        ];

                        for (argument, attempt) in attempts {
                            let err = attempt.unwrap_err();
                            assert_eq!(err.kind(), ErrorKind::ArgumentRejected);
                            assert_eq!(
                                err.to_string(),
                                format!("ArgumentRejected: GroupJoin requires `{argument}`")
                            );
                        }
                    }
                    assert_eq!(provider.submissions(), 0);
                }
            }
        )*
    };
}

group_join_conformance!(
    int8 => i8,
    int16 => i16,
    int32 => i32,
    int64 => i64,
    uint8 => u8,
    uint16 => u16,
    uint32 => u32,
    uint64 => u64,
    float32 => f32,
    float64 => f64,
);
