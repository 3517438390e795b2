//! Chunk sort stage.

use std::cmp;

use log;
use rayon::prelude::*;

use crate::chunk::ExternalChunk;
use crate::error::SortError;
use crate::input::{BinaryInput, ELEMENT_SIZE};
use crate::store::UnitStore;
use crate::unit::{self, UnitId, WorkChannel, WorkResult};

/// Sort worker task.
#[derive(Debug, Clone, Copy)]
pub struct SortTask {
    /// Byte offset of the first chunk element.
    pub offset: u64,
    /// Number of elements in the chunk.
    pub items: usize,
}

/// Splits the input into chunks of `chunk_size` elements and launches one sort worker per chunk.
/// Every worker pushes exactly one result to the channel: the sorted unit identifier or the failure.
/// Returns the number of launched workers.
///
/// # Arguments
/// * `scope` - Scope the workers are spawned in
/// * `input` - Input to be sorted
/// * `chunk_size` - Maximum number of elements per chunk
/// * `store` - Sorted unit storage
/// * `channel` - Channel the results are pushed to
pub fn sort_chunks<'scope, C>(
    scope: &rayon::Scope<'scope>,
    input: &'scope BinaryInput,
    chunk_size: usize,
    store: &'scope UnitStore,
    channel: &'scope WorkChannel,
) -> Result<usize, SortError>
where
    C: ExternalChunk,
{
    if chunk_size == 0 {
        return Err(SortError::InvalidChunkSize);
    }

    let total_items = input.element_count();
    if input.trailing_bytes() > 0 {
        log::warn!(
            "ignoring {} trailing bytes of {}",
            input.trailing_bytes(),
            input.path().display()
        );
    }

    let chunk_items = chunk_size as u64;
    let chunks_number = count_chunks(total_items, chunk_size)?;

    log::info!(
        "sorting {} items in {} chunks (chunk size: {})",
        total_items,
        chunks_number,
        chunk_size
    );

    for chunk_idx in 0..chunks_number as u64 {
        let first_item = chunk_idx * chunk_items;
        let task = SortTask {
            offset: first_item * ELEMENT_SIZE as u64,
            items: cmp::min(chunk_items, total_items - first_item) as usize,
        };

        scope.spawn(move |_| unit::report(channel, || sort_chunk::<C>(input, store, task)));
    }

    return Ok(chunks_number);
}

/// Returns the number of chunks `total_items` elements are split into.
/// The last chunk is short, never empty.
pub fn count_chunks(total_items: u64, chunk_size: usize) -> Result<usize, SortError> {
    if chunk_size == 0 {
        return Err(SortError::InvalidChunkSize);
    }

    let chunk_items = chunk_size as u64;
    let chunks = total_items / chunk_items + u64::from(total_items % chunk_items != 0);

    return usize::try_from(chunks).map_err(|_| SortError::TooManyChunks { chunks });
}

/// Reads, sorts and saves a single chunk.
pub fn sort_chunk<C: ExternalChunk>(input: &BinaryInput, store: &UnitStore, task: SortTask) -> WorkResult {
    log::debug!("sorting chunk (offset: {}, items: {}) ...", task.offset, task.items);

    let mut buffer = input
        .read_chunk(task.offset, task.items, store.rw_buf_size())
        .map_err(SortError::IO)?;

    // an empty chunk must never reach the merge stage
    if buffer.is_empty() {
        return Err(SortError::EmptyChunk { offset: task.offset });
    }

    buffer.par_sort_unstable();

    let id = UnitId::Chunk { offset: task.offset };
    store.create::<C, _>(id, buffer.into_iter().map(Ok))?;

    log::debug!("chunk {} saved", id);

    return Ok(id);
}
