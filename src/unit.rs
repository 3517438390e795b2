//! Sorted unit identifiers and worker result hand-off.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use log;

use crate::channel::BlockingChannel;
use crate::error::SortError;

/// Opaque handle of a sorted unit stored outside of the channel.
///
/// Chunk units are named by their nonnegative source byte offset, merged units by a strictly
/// decreasing negative sequence, so the two namespaces never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitId {
    /// Unit produced by the chunk sort stage.
    Chunk { offset: u64 },
    /// Unit produced by a merge round.
    Merged { seq: u64 },
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitId::Chunk { offset } => write!(f, "{}", offset),
            UnitId::Merged { seq } => write!(f, "-{}", seq),
        }
    }
}

/// Merged unit identifier generator scoped to a single pipeline run.
pub struct UnitIdGenerator {
    next_seq: AtomicU64,
}

impl UnitIdGenerator {
    pub fn new() -> Self {
        UnitIdGenerator {
            next_seq: AtomicU64::new(1),
        }
    }

    /// Mints a fresh merged unit identifier.
    pub fn next_merged(&self) -> UnitId {
        UnitId::Merged {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for UnitIdGenerator {
    fn default() -> Self {
        UnitIdGenerator::new()
    }
}

/// Outcome of a single sort or merge worker.
pub type WorkResult = Result<UnitId, SortError>;

/// Channel shared by the sort and merge stages.
pub type WorkChannel = BlockingChannel<WorkResult>;

/// Runs a worker body and reports its outcome, a panic included, to the channel.
pub(crate) fn report<F>(channel: &WorkChannel, work: F)
where
    F: FnOnce() -> WorkResult,
{
    let result = panic::catch_unwind(AssertUnwindSafe(work))
        .unwrap_or_else(|payload| Err(SortError::WorkerPanicked(panic_message(payload.as_ref()))));

    if !channel.put(result) {
        log::debug!("result channel closed, worker result dropped");
    }
}

/// Takes the next worker result, failing if the channel closed before one arrived.
pub(crate) fn receive(channel: &WorkChannel) -> WorkResult {
    channel.take().unwrap_or_else(|| Err(SortError::ChannelClosed))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use rstest::*;

    use super::{receive, report, UnitId, UnitIdGenerator, WorkChannel};
    use crate::error::SortError;

    #[rstest]
    #[case(UnitId::Chunk { offset: 0 }, "0")]
    #[case(UnitId::Chunk { offset: 4096 }, "4096")]
    #[case(UnitId::Merged { seq: 1 }, "-1")]
    #[case(UnitId::Merged { seq: 17 }, "-17")]
    fn test_unit_name(#[case] id: UnitId, #[case] expected: &str) {
        assert_eq!(id.to_string(), expected);
    }

    #[test]
    fn test_generator_mints_distinct_ids() {
        let generator = UnitIdGenerator::new();

        let ids = Vec::from_iter((0..100).map(|_| generator.next_merged()));
        let unique: HashSet<UnitId> = HashSet::from_iter(ids.iter().copied());

        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids[0], UnitId::Merged { seq: 1 });
        assert_eq!(ids[99], UnitId::Merged { seq: 100 });
    }

    #[test]
    fn test_report_captures_panic() {
        let channel = WorkChannel::new();

        report(&channel, || panic!("boom"));

        match receive(&channel) {
            Err(SortError::WorkerPanicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_receive_from_closed_channel() {
        let channel = WorkChannel::new();
        report(&channel, || Ok(UnitId::Chunk { offset: 8 }));
        channel.close();

        assert_eq!(receive(&channel).unwrap(), UnitId::Chunk { offset: 8 });
        assert!(matches!(receive(&channel), Err(SortError::ChannelClosed)));
    }
}
