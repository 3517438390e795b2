//! Fixed-width binary integer input.
//!
//! The input is a headerless sequence of little-endian `i64` values.

use std::fs;
use std::io;
use std::io::prelude::*;
use std::path::{Path, PathBuf};

/// Size of a single input element in bytes.
pub const ELEMENT_SIZE: usize = std::mem::size_of::<i64>();

/// Input file to be sorted.
pub struct BinaryInput {
    path: PathBuf,
    len: u64,
}

impl BinaryInput {
    /// Opens an input file and captures its size.
    pub fn open(path: &Path) -> io::Result<Self> {
        let len = fs::metadata(path)?.len();

        return Ok(BinaryInput {
            path: path.to_path_buf(),
            len,
        });
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the input size in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.element_count() == 0
    }

    /// Returns the number of whole elements in the input.
    pub fn element_count(&self) -> u64 {
        self.len / ELEMENT_SIZE as u64
    }

    /// Returns the number of trailing bytes that do not form a whole element.
    pub fn trailing_bytes(&self) -> u64 {
        self.len % ELEMENT_SIZE as u64
    }

    /// Reads up to `max_items` elements starting at byte `offset`.
    /// Reading stops early at the end of the input.
    ///
    /// # Arguments
    /// * `offset` - Byte offset of the first element
    /// * `max_items` - Maximum number of elements to read
    /// * `buf_size` - Read buffer size
    pub fn read_chunk(&self, offset: u64, max_items: usize, buf_size: Option<usize>) -> io::Result<Vec<i64>> {
        let mut file = fs::File::open(&self.path)?;
        file.seek(io::SeekFrom::Start(offset))?;

        let mut reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        let mut items = Vec::with_capacity(max_items);
        while items.len() < max_items {
            match read_element(&mut reader)? {
                Some(item) => items.push(item),
                None => break,
            }
        }

        return Ok(items);
    }
}

/// Reads a single element. Returns [`None`] at a clean end of input and an
/// [`io::ErrorKind::UnexpectedEof`] error if the input ends inside an element.
pub fn read_element<R: Read>(reader: &mut R) -> io::Result<Option<i64>> {
    let mut bytes = [0u8; ELEMENT_SIZE];
    let mut filled = 0;

    while filled < ELEMENT_SIZE {
        match reader.read(&mut bytes[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    match filled {
        0 => Ok(None),
        ELEMENT_SIZE => Ok(Some(i64::from_le_bytes(bytes))),
        _ => Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated element")),
    }
}

/// Writes elements in the input format.
pub fn write_numbers<I>(path: &Path, items: I) -> io::Result<()>
where
    I: IntoIterator<Item = i64>,
{
    let mut writer = io::BufWriter::new(fs::File::create(path)?);
    for item in items {
        writer.write_all(&item.to_le_bytes())?;
    }

    writer.flush()
}

#[cfg(test)]
mod test {
    use std::fs;
    use std::io;

    use rstest::*;

    use super::{read_element, write_numbers, BinaryInput, ELEMENT_SIZE};

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    fn test_input_sizing(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input");
        write_numbers(&path, vec![5, -3, 8]).unwrap();

        let input = BinaryInput::open(&path).unwrap();

        assert_eq!(input.len(), 3 * ELEMENT_SIZE as u64);
        assert_eq!(input.element_count(), 3);
        assert_eq!(input.trailing_bytes(), 0);
        assert!(!input.is_empty());
    }

    #[rstest]
    fn test_trailing_bytes(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input");
        let mut data = Vec::from_iter(7i64.to_le_bytes());
        data.extend_from_slice(&[1, 2, 3]);
        fs::write(&path, data).unwrap();

        let input = BinaryInput::open(&path).unwrap();

        assert_eq!(input.element_count(), 1);
        assert_eq!(input.trailing_bytes(), 3);
        assert_eq!(input.read_chunk(0, 1, None).unwrap(), vec![7]);
    }

    #[rstest]
    #[case(0, 2, vec![5, 3])]
    #[case(16, 2, vec![8, 1])]
    #[case(32, 4, vec![9])]
    #[case(40, 4, vec![])]
    fn test_read_chunk(
        tmp_dir: tempfile::TempDir,
        #[case] offset: u64,
        #[case] max_items: usize,
        #[case] expected: Vec<i64>,
    ) {
        let path = tmp_dir.path().join("input");
        write_numbers(&path, vec![5, 3, 8, 1, 9]).unwrap();

        let input = BinaryInput::open(&path).unwrap();

        assert_eq!(input.read_chunk(offset, max_items, Some(16)).unwrap(), expected);
    }

    #[test]
    fn test_read_truncated_element() {
        let mut reader = io::Cursor::new(vec![1u8, 2, 3]);

        let err = read_element(&mut reader).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
