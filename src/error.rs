//! Pipeline errors.

use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::io;

use crate::chunk::ChunkError;

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// Common I/O error.
    IO(io::Error),
    /// Sorted unit read/write error.
    Chunk(ChunkError),
    /// Chunk size must be at least one element.
    InvalidChunkSize,
    /// The chunk count does not fit the platform's address space.
    TooManyChunks { chunks: u64 },
    /// A sort worker found no data at its offset.
    EmptyChunk { offset: u64 },
    /// A worker panicked before reporting its result.
    WorkerPanicked(String),
    /// The result channel was closed while a result was still expected.
    ChannelClosed,
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self {
            SortError::TempDir(err) => Some(err),
            SortError::ThreadPoolBuildError(err) => Some(err),
            SortError::IO(err) => Some(err),
            SortError::Chunk(err) => Some(err),
            SortError::InvalidChunkSize
            | SortError::TooManyChunks { .. }
            | SortError::EmptyChunk { .. }
            | SortError::WorkerPanicked(_)
            | SortError::ChannelClosed => None,
        }
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
            SortError::Chunk(err) => write!(f, "sorted unit error: {}", err),
            SortError::InvalidChunkSize => write!(f, "chunk size must be greater than zero"),
            SortError::TooManyChunks { chunks } => write!(f, "too many chunks for this platform: {}", chunks),
            SortError::EmptyChunk { offset } => write!(f, "no data found at offset {}", offset),
            SortError::WorkerPanicked(msg) => write!(f, "worker panicked: {}", msg),
            SortError::ChannelClosed => write!(f, "result channel closed unexpectedly"),
        }
    }
}

impl From<ChunkError> for SortError {
    fn from(err: ChunkError) -> Self {
        SortError::Chunk(err)
    }
}
