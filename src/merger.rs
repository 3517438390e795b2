//! Pairwise merge stage.

use std::iter::Peekable;

use log;

use crate::chunk::ExternalChunk;
use crate::error::SortError;
use crate::store::UnitStore;
use crate::unit::{self, UnitId, UnitIdGenerator, WorkChannel, WorkResult};

/// Two-way merger implementation.
/// Merges two sorted inputs into a single sorted output, taking from the left input on ties.
/// Inputs should be sorted in ascending order otherwise the result is undefined.
pub struct TwoWayMerger<L: Iterator, R: Iterator> {
    left: Peekable<L>,
    right: Peekable<R>,
}

impl<L: Iterator, R: Iterator> TwoWayMerger<L, R> {
    /// Creates an instance of a two-way merger.
    ///
    /// # Arguments
    /// * `left` - First sorted input
    /// * `right` - Second sorted input
    pub fn new<A, B>(left: A, right: B) -> Self
    where
        A: IntoIterator<IntoIter = L>,
        B: IntoIterator<IntoIter = R>,
    {
        TwoWayMerger {
            left: left.into_iter().peekable(),
            right: right.into_iter().peekable(),
        }
    }
}

impl<T, E, L, R> Iterator for TwoWayMerger<L, R>
where
    T: Ord,
    L: Iterator<Item = Result<T, E>>,
    R: Iterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    /// Returns the next item from the inputs in ascending order.
    /// Errors are passed through as soon as they reach the head of an input.
    fn next(&mut self) -> Option<Self::Item> {
        let take_left = match (self.left.peek(), self.right.peek()) {
            (None, None) => return None,
            (Some(Err(_)), _) | (Some(_), None) => true,
            (_, Some(Err(_))) | (None, Some(_)) => false,
            (Some(Ok(left)), Some(Ok(right))) => left <= right,
        };

        if take_left {
            self.left.next()
        } else {
            self.right.next()
        }
    }
}

/// Merge worker task.
#[derive(Debug, Clone, Copy)]
pub struct MergeTask {
    pub left: UnitId,
    pub right: UnitId,
    pub output: UnitId,
}

/// Launches `units_number - 1` merge rounds, reducing the sorted units in the channel to a single one.
/// Each round takes two results from the channel and spawns a worker pushing the merged unit back.
/// The remaining unit is left in the channel for the caller to take.
///
/// Stops at the first failed result and returns its error. Rounds launched before the failure keep running.
///
/// # Arguments
/// * `scope` - Scope the workers are spawned in
/// * `channel` - Channel holding sorted unit results
/// * `units_number` - Number of results that will eventually appear in the channel
/// * `store` - Sorted unit storage
/// * `ids` - Merged unit identifier generator
pub fn merge_units<'scope, C>(
    scope: &rayon::Scope<'scope>,
    channel: &'scope WorkChannel,
    units_number: usize,
    store: &'scope UnitStore,
    ids: &UnitIdGenerator,
) -> Result<(), SortError>
where
    C: ExternalChunk,
{
    let rounds = units_number.saturating_sub(1);
    log::info!("merging {} units in {} rounds", units_number, rounds);

    for round in 0..rounds {
        let left = unit::receive(channel)?;
        let right = unit::receive(channel)?;
        let task = MergeTask {
            left,
            right,
            output: ids.next_merged(),
        };

        log::debug!("launching merge round {} ({} + {} -> {})", round + 1, left, right, task.output);
        scope.spawn(move |_| unit::report(channel, || merge_pair::<C>(store, task)));
    }

    return Ok(());
}

/// Merges two sorted units into a new one and removes the inputs.
pub fn merge_pair<C: ExternalChunk>(store: &UnitStore, task: MergeTask) -> WorkResult {
    log::debug!("merging units {} and {} ...", task.left, task.right);

    let left = store.open::<C>(task.left)?;
    let right = store.open::<C>(task.right)?;
    store.create::<C, _>(task.output, TwoWayMerger::new(left, right))?;

    store.remove(task.left).map_err(SortError::IO)?;
    store.remove(task.right).map_err(SortError::IO)?;

    log::debug!("unit {} saved", task.output);

    return Ok(task.output);
}

#[cfg(test)]
mod test {
    use std::error::Error;
    use std::io::{self, ErrorKind};

    use rand::seq::SliceRandom;
    use rand::Rng;
    use rstest::*;

    use super::{merge_pair, merge_units, MergeTask, TwoWayMerger};
    use crate::chunk::{ChunkError, TextExternalChunk};
    use crate::error::SortError;
    use crate::store::UnitStore;
    use crate::unit::{self, UnitId, UnitIdGenerator, WorkChannel};

    #[fixture]
    fn store() -> UnitStore {
        UnitStore::new(None, None).unwrap()
    }

    #[rstest]
    #[case(vec![], vec![], vec![])]
    #[case(vec![Ok(1), Ok(4)], vec![], vec![Ok(1), Ok(4)])]
    #[case(vec![], vec![Ok(2), Ok(3)], vec![Ok(2), Ok(3)])]
    #[case(
        vec![Ok(3), Ok(5)],
        vec![Ok(1), Ok(8)],
        vec![Ok(1), Ok(3), Ok(5), Ok(8)],
    )]
    #[case(
        vec![Ok(1), Ok(2), Ok(2), Ok(9)],
        vec![Ok(2), Ok(4)],
        vec![Ok(1), Ok(2), Ok(2), Ok(2), Ok(4), Ok(9)],
    )]
    #[case(
        vec![Ok(3), Result::Err(io::Error::new(ErrorKind::Other, "test error"))],
        vec![Ok(1), Ok(2), Ok(4)],
        vec![
            Ok(1),
            Ok(2),
            Ok(3),
            Result::Err(io::Error::new(ErrorKind::Other, "test error")),
        ],
    )]
    fn test_merger(
        #[case] left: Vec<Result<i32, io::Error>>,
        #[case] right: Vec<Result<i32, io::Error>>,
        #[case] expected_result: Vec<Result<i32, io::Error>>,
    ) {
        let merger = TwoWayMerger::new(left, right);
        let actual_result = Vec::from_iter(merger.take(expected_result.len()));
        assert!(
            compare_vectors_of_result::<_, io::Error>(&actual_result, &expected_result),
            "actual={:?}, expected={:?}",
            actual_result,
            expected_result
        );
    }

    fn compare_vectors_of_result<T: PartialEq, E: Error + 'static>(
        actual: &Vec<Result<T, E>>,
        expected: &Vec<Result<T, E>>,
    ) -> bool {
        actual.len() == expected.len()
            && actual
                .into_iter()
                .zip(expected)
                .all(
                    |(actual_result, expected_result)| match (actual_result, expected_result) {
                        (Ok(actual_result), Ok(expected_result)) if actual_result == expected_result => true,
                        (Err(actual_err), Err(expected_err)) => actual_err.to_string() == expected_err.to_string(),
                        _ => false,
                    },
                )
    }

    fn read_unit(store: &UnitStore, id: UnitId) -> Vec<i64> {
        let items: Result<Vec<i64>, ChunkError> = store.open::<TextExternalChunk>(id).unwrap().collect();
        items.unwrap()
    }

    #[rstest]
    fn test_merge_pair(store: UnitStore) {
        let left = UnitId::Chunk { offset: 0 };
        let right = UnitId::Chunk { offset: 16 };
        store.create::<TextExternalChunk, _>(left, vec![Ok(3), Ok(5)]).unwrap();
        store.create::<TextExternalChunk, _>(right, vec![Ok(1), Ok(8)]).unwrap();

        let output = UnitId::Merged { seq: 1 };
        let result = merge_pair::<TextExternalChunk>(&store, MergeTask { left, right, output });

        assert_eq!(result.unwrap(), output);
        assert_eq!(read_unit(&store, output), vec![1, 3, 5, 8]);
        assert!(!store.path(left).exists());
        assert!(!store.path(right).exists());
    }

    #[rstest]
    fn test_merge_pair_missing_unit(store: UnitStore) {
        let left = UnitId::Chunk { offset: 0 };
        store.create::<TextExternalChunk, _>(left, vec![Ok(1)]).unwrap();

        let task = MergeTask {
            left,
            right: UnitId::Chunk { offset: 8 },
            output: UnitId::Merged { seq: 1 },
        };

        assert!(matches!(
            merge_pair::<TextExternalChunk>(&store, task),
            Err(SortError::Chunk(ChunkError::IO(_)))
        ));
    }

    #[rstest]
    #[case(1, 1)]
    #[case(2, 1)]
    #[case(5, 2)]
    #[case(16, 4)]
    #[case(33, 1)]
    fn test_merge_reduction(store: UnitStore, #[case] units_number: usize, #[case] threads: usize) {
        let mut rng = rand::thread_rng();
        let channel = WorkChannel::new();
        let ids = UnitIdGenerator::new();

        let mut expected = Vec::new();
        for idx in 0..units_number {
            let len = rng.gen_range(0..50);
            let mut items: Vec<i64> = Vec::from_iter((0..len).map(|_| rng.gen_range(-100..100)));
            items.sort();
            expected.extend_from_slice(&items);

            let id = UnitId::Chunk { offset: idx as u64 * 1024 };
            store.create::<TextExternalChunk, _>(id, items.into_iter().map(Ok)).unwrap();
            assert!(channel.put(Ok(id)));
        }
        expected.sort();

        let thread_pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build().unwrap();
        thread_pool
            .in_place_scope(|scope| merge_units::<TextExternalChunk>(scope, &channel, units_number, &store, &ids))
            .unwrap();

        let last = unit::receive(&channel).unwrap();
        assert!(channel.is_empty());
        assert_eq!(read_unit(&store, last), expected);
    }

    #[rstest]
    fn test_merge_units_in_any_order(store: UnitStore) {
        let mut ids = vec![
            (UnitId::Chunk { offset: 0 }, vec![3, 5]),
            (UnitId::Chunk { offset: 16 }, vec![1, 8]),
            (UnitId::Chunk { offset: 32 }, vec![2, 9]),
            (UnitId::Chunk { offset: 48 }, vec![4, 7]),
        ];
        ids.shuffle(&mut rand::thread_rng());

        let channel = WorkChannel::new();
        for (id, items) in ids {
            store.create::<TextExternalChunk, _>(id, items.into_iter().map(Ok)).unwrap();
            assert!(channel.put(Ok(id)));
        }

        let generator = UnitIdGenerator::new();
        rayon::in_place_scope(|scope| merge_units::<TextExternalChunk>(scope, &channel, 4, &store, &generator)).unwrap();

        let last = unit::receive(&channel).unwrap();
        assert_eq!(last, UnitId::Merged { seq: 3 });
        assert_eq!(read_unit(&store, last), vec![1, 2, 3, 4, 5, 7, 8, 9]);
    }

    #[rstest]
    fn test_merge_units_stops_on_failure(store: UnitStore) {
        let channel = WorkChannel::new();
        let id = UnitId::Chunk { offset: 0 };
        store.create::<TextExternalChunk, _>(id, vec![Ok(1)]).unwrap();
        assert!(channel.put(Ok(id)));
        assert!(channel.put(Err(SortError::EmptyChunk { offset: 8 })));

        let generator = UnitIdGenerator::new();
        let result =
            rayon::in_place_scope(|scope| merge_units::<TextExternalChunk>(scope, &channel, 3, &store, &generator));

        assert!(matches!(result, Err(SortError::EmptyChunk { offset: 8 })));
        assert!(store.path(id).exists());
    }
}
