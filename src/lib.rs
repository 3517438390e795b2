//! `pairwise-sort` is an external sort implementation for large binary files of fixed-width integers.
//!
//! Sorting is achieved in two phases. During the first phase the input is split into chunks that fit in RAM,
//! every chunk is sorted by its own worker and saved to a temporary unit. During the second phase the sorted
//! units are merged pairwise by parallel workers until a single sorted unit remains.
//!
//! # Overview
//!
//! * **Channel driven:**
//!   both phases communicate through a single closable blocking channel of unit identifiers
//!   ([`BlockingChannel`]). Merging starts as soon as any two sorted units are available, there is no
//!   barrier between the phases.
//! * **Explicit failures:**
//!   every worker reports either the produced unit or its failure, so a failed worker stops the pipeline
//!   instead of leaving it waiting for a unit that never comes.
//! * **Bounded workers:**
//!   workers run on a [`rayon`] thread pool and a run returns only once all of them have finished.
//! * **Unit format agnostic:**
//!   sorted units are stored as whitespace separated decimal text by default ([`TextExternalChunk`]),
//!   a raw binary format ([`BinaryExternalChunk`]) is available and custom formats can be plugged in
//!   by implementing [`ExternalChunk`].
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use pairwise_sort::{Pipeline, PipelineBuilder};
//!
//! fn main() {
//!     let pipeline: Pipeline = PipelineBuilder::new()
//!         .with_tmp_dir(Path::new("./"))
//!         .with_chunk_size(1_000_000)
//!         .build()
//!         .unwrap();
//!
//!     let sorted = pipeline.run(Path::new("input.bin")).unwrap();
//!     sorted.persist(Path::new("output.txt")).unwrap();
//! }
//! ```

pub mod channel;
pub mod chunk;
pub mod error;
pub mod input;
pub mod merger;
pub mod pipeline;
pub mod sort;
pub mod store;
pub mod unit;
pub mod verify;

pub use channel::BlockingChannel;
pub use chunk::{BinaryExternalChunk, ChunkError, ExternalChunk, TextExternalChunk};
pub use error::SortError;
pub use merger::TwoWayMerger;
pub use pipeline::{Pipeline, PipelineBuilder, SortedOutput};
pub use unit::{UnitId, UnitIdGenerator, WorkChannel};
