//! Sorting pipeline driver.

use std::fs;
use std::io;
use std::iter;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log;

use crate::chunk::{ChunkError, ExternalChunk, TextExternalChunk};
use crate::error::SortError;
use crate::input::BinaryInput;
use crate::merger;
use crate::sort;
use crate::store::UnitStore;
use crate::unit::{self, UnitId, UnitIdGenerator, WorkChannel, WorkResult};
use crate::verify;

/// Default number of elements sorted in memory by a single worker.
pub const DEFAULT_CHUNK_SIZE: usize = 1 << 20;

/// Pipeline builder. Provides methods for [`Pipeline`] initialization.
pub struct PipelineBuilder<C = TextExternalChunk>
where
    C: ExternalChunk,
{
    /// Number of threads to be used to sort and merge data in parallel.
    threads_number: Option<usize>,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Unit file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Number of elements per chunk.
    chunk_size: usize,

    /// External chunk type.
    external_chunk_type: PhantomData<C>,
}

impl<C> PipelineBuilder<C>
where
    C: ExternalChunk,
{
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        PipelineBuilder::default()
    }

    /// Builds a [`Pipeline`] instance using provided configuration.
    pub fn build(self) -> Result<Pipeline<C>, SortError> {
        Pipeline::new(
            self.threads_number,
            self.tmp_dir.as_deref(),
            self.chunk_size,
            self.rw_buf_size,
        )
    }

    /// Sets number of threads to be used to sort and merge data in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> PipelineBuilder<C> {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> PipelineBuilder<C> {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets number of elements sorted in memory by a single worker.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> PipelineBuilder<C> {
        self.chunk_size = chunk_size;
        return self;
    }

    /// Sets unit read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> PipelineBuilder<C> {
        self.rw_buf_size = Some(buf_size);
        return self;
    }
}

impl<C> Default for PipelineBuilder<C>
where
    C: ExternalChunk,
{
    fn default() -> Self {
        PipelineBuilder {
            threads_number: None,
            tmp_dir: None,
            rw_buf_size: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            external_chunk_type: PhantomData,
        }
    }
}

/// Two-phase external sorter of binary integer files.
///
/// The input is split into chunks that are sorted in parallel, then the sorted units are merged
/// pairwise until one remains. Both phases share a single [`WorkChannel`]: sort workers push their
/// units into it, the driver takes units out of it two at a time and launches merge workers that
/// push the merged unit back. No barrier separates the phases, merging starts as soon as any two
/// units are available.
pub struct Pipeline<C = TextExternalChunk>
where
    C: ExternalChunk,
{
    /// Worker thread pool.
    thread_pool: rayon::ThreadPool,
    /// Directory the per-run temporary directories are created in.
    tmp_dir: Option<Box<Path>>,
    /// Number of elements per chunk.
    chunk_size: usize,
    /// Unit file read/write buffer size.
    rw_buf_size: Option<usize>,

    /// External chunk type.
    external_chunk_type: PhantomData<C>,
}

impl<C> Pipeline<C>
where
    C: ExternalChunk,
{
    /// Creates a new pipeline instance.
    ///
    /// # Arguments
    /// * `threads_number` - Number of threads to be used to sort and merge data in parallel. If the parameter
    ///   is [`None`] threads number will be selected based on available CPU core number.
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `chunk_size` - Number of elements sorted in memory by a single worker.
    /// * `rw_buf_size` - Unit file read/write buffer size.
    pub fn new(
        threads_number: Option<usize>,
        tmp_path: Option<&Path>,
        chunk_size: usize,
        rw_buf_size: Option<usize>,
    ) -> Result<Self, SortError> {
        if chunk_size == 0 {
            return Err(SortError::InvalidChunkSize);
        }

        return Ok(Pipeline {
            thread_pool: Self::init_thread_pool(threads_number)?,
            tmp_dir: tmp_path.map(Into::into),
            chunk_size,
            rw_buf_size,
            external_chunk_type: PhantomData,
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder =
            rayon::ThreadPoolBuilder::new().thread_name(|idx| format!("pairwise-sort-worker-{}", idx));

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    /// Returns the number of elements sorted in memory by a single worker.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Sorts an input file.
    /// Returns the sorted output unit. The unit lives in a temporary directory owned by the output.
    ///
    /// Returns only after every launched worker has finished. On the first worker failure the result
    /// channel is cancelled, in-flight workers run to completion and the failure is returned.
    ///
    /// # Arguments
    /// * `input` - File of little-endian `i64` values
    pub fn run(&self, input: &Path) -> Result<SortedOutput<C>, SortError> {
        let input = BinaryInput::open(input).map_err(SortError::IO)?;
        let store = UnitStore::new(self.tmp_dir.as_deref(), self.rw_buf_size).map_err(SortError::TempDir)?;
        let channel = WorkChannel::new();
        let ids = UnitIdGenerator::new();

        log::info!("sorting {} ({} bytes)", input.path().display(), input.len());

        let result = self.thread_pool.in_place_scope(|scope| {
            let result = Self::drive(scope, &input, self.chunk_size, &store, &channel, &ids);
            if let Err(err) = &result {
                log::debug!("sorting failed, cancelling workers: {}", err);
                channel.cancel();
            }
            result
        });
        let id = result?;

        log::info!("sorting done, result unit: {}", id);

        return Ok(SortedOutput {
            id,
            store,
            external_chunk_type: PhantomData,
        });
    }

    fn drive<'scope>(
        scope: &rayon::Scope<'scope>,
        input: &'scope BinaryInput,
        chunk_size: usize,
        store: &'scope UnitStore,
        channel: &'scope WorkChannel,
        ids: &UnitIdGenerator,
    ) -> WorkResult {
        let units_number = sort::sort_chunks::<C>(scope, input, chunk_size, store, channel)?;

        if units_number == 0 {
            let id = ids.next_merged();
            store.create::<C, _>(id, iter::empty::<Result<i64, ChunkError>>())?;
            return Ok(id);
        }

        merger::merge_units::<C>(scope, channel, units_number, store, ids)?;

        // merges reduce the count by one, so this is the last result to arrive
        unit::receive(channel)
    }
}

/// Sorted pipeline output.
/// The underlying unit is removed together with its temporary directory when the output is dropped
/// unless it was persisted.
pub struct SortedOutput<C = TextExternalChunk>
where
    C: ExternalChunk,
{
    id: UnitId,
    store: UnitStore,

    external_chunk_type: PhantomData<C>,
}

impl<C> SortedOutput<C>
where
    C: ExternalChunk,
{
    /// Returns the identifier of the final unit.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Returns the path of the final unit.
    pub fn path(&self) -> PathBuf {
        self.store.path(self.id)
    }

    /// Opens the final unit for reading.
    pub fn reader(&self) -> Result<C, ChunkError> {
        self.store.open::<C>(self.id)
    }

    /// Checks that the final unit is in nondecreasing order.
    pub fn is_sorted(&self) -> Result<bool, ChunkError> {
        verify::check_sorted(self.reader()?)
    }

    /// Moves the final unit to `dest`.
    pub fn persist(self, dest: &Path) -> io::Result<()> {
        let src = self.path();
        if let Err(err) = fs::rename(&src, dest) {
            log::debug!("rename to {} failed ({}), copying", dest.display(), err);
            fs::copy(&src, dest)?;
        }

        log::info!("sorted data saved to {}", dest.display());

        return Ok(());
    }
}
