use std::error::Error;
use std::fmt;
use std::fs;
use std::io;
use std::io::prelude::*;
use std::num::ParseIntError;
use std::path::Path;

use crate::input;

/// Sorted unit read/write error.
#[derive(Debug)]
pub enum ChunkError {
    /// Common I/O error.
    IO(io::Error),
    /// Unit contains a token that is not a decimal integer.
    Parse { token: String, source: ParseIntError },
}

impl Error for ChunkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            ChunkError::IO(err) => err,
            ChunkError::Parse { source, .. } => source,
        })
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            ChunkError::IO(err) => write!(f, "I/O operation failed: {}", err),
            ChunkError::Parse { token, source } => write!(f, "malformed value {:?}: {}", token, source),
        }
    }
}

impl From<io::Error> for ChunkError {
    fn from(err: io::Error) -> Self {
        ChunkError::IO(err)
    }
}

/// External chunk interface. Provides methods for creating a sorted unit stored on file system and reading
/// data from it.
pub trait ExternalChunk: Sized + Send + 'static + Iterator<Item = Result<i64, ChunkError>> {
    /// Writes items to a new unit file.
    /// Stops at the first item error, leaving the file incomplete.
    fn build<I>(path: &Path, items: I, buf_size: Option<usize>) -> Result<(), ChunkError>
    where
        I: IntoIterator<Item = Result<i64, ChunkError>>,
    {
        let file = fs::File::create(path)?;

        let mut chunk_writer = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        Self::dump(&mut chunk_writer, items)?;

        chunk_writer.flush()?;

        return Ok(());
    }

    /// Opens an existing unit file for reading.
    fn open(path: &Path, buf_size: Option<usize>) -> Result<Self, ChunkError> {
        let file = fs::File::open(path)?;

        let chunk_reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(Self::new(chunk_reader));
    }

    /// Creates an instance of an external chunk.
    fn new(reader: io::BufReader<fs::File>) -> Self;

    /// Dumps items to an external file.
    fn dump<I>(chunk_writer: &mut io::BufWriter<fs::File>, items: I) -> Result<(), ChunkError>
    where
        I: IntoIterator<Item = Result<i64, ChunkError>>;
}

/// Text external chunk implementation.
/// Stores items as whitespace separated decimal integers.
pub struct TextExternalChunk {
    reader: io::BufReader<fs::File>,
    token: Vec<u8>,
}

impl TextExternalChunk {
    /// Reads the next whitespace delimited token into `self.token`.
    fn read_token(&mut self) -> io::Result<bool> {
        self.token.clear();

        loop {
            let buf = self.reader.fill_buf()?;
            if buf.is_empty() {
                break;
            }

            let mut consumed = 0;
            let mut complete = false;
            for &byte in buf {
                consumed += 1;
                if byte.is_ascii_whitespace() {
                    if !self.token.is_empty() {
                        complete = true;
                        break;
                    }
                } else {
                    self.token.push(byte);
                }
            }
            self.reader.consume(consumed);

            if complete {
                break;
            }
        }

        Ok(!self.token.is_empty())
    }
}

impl ExternalChunk for TextExternalChunk {
    fn new(reader: io::BufReader<fs::File>) -> Self {
        TextExternalChunk {
            reader,
            token: Vec::new(),
        }
    }

    fn dump<I>(chunk_writer: &mut io::BufWriter<fs::File>, items: I) -> Result<(), ChunkError>
    where
        I: IntoIterator<Item = Result<i64, ChunkError>>,
    {
        for item in items.into_iter() {
            write!(chunk_writer, "{} ", item?)?;
        }
        writeln!(chunk_writer)?;

        return Ok(());
    }
}

impl Iterator for TextExternalChunk {
    type Item = Result<i64, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_token() {
            Ok(false) => None,
            Ok(true) => {
                let token = String::from_utf8_lossy(&self.token);
                Some(token.parse().map_err(|err| ChunkError::Parse {
                    token: token.to_string(),
                    source: err,
                }))
            }
            Err(err) => Some(Err(ChunkError::IO(err))),
        }
    }
}

/// Binary external chunk implementation.
/// Stores items as little-endian `i64`, the same layout as the sorted input.
pub struct BinaryExternalChunk {
    reader: io::BufReader<fs::File>,
}

impl ExternalChunk for BinaryExternalChunk {
    fn new(reader: io::BufReader<fs::File>) -> Self {
        BinaryExternalChunk { reader }
    }

    fn dump<I>(chunk_writer: &mut io::BufWriter<fs::File>, items: I) -> Result<(), ChunkError>
    where
        I: IntoIterator<Item = Result<i64, ChunkError>>,
    {
        for item in items.into_iter() {
            chunk_writer.write_all(&item?.to_le_bytes())?;
        }

        return Ok(());
    }
}

impl Iterator for BinaryExternalChunk {
    type Item = Result<i64, ChunkError>;

    fn next(&mut self) -> Option<Self::Item> {
        input::read_element(&mut self.reader).map_err(ChunkError::IO).transpose()
    }
}
