//! Random access over the dump file
//!
//! The snapshot keeps reading from the dump long after parsing (instance
//! fields are decoded lazily), so the buffer lives inside the snapshot.
//! Memory-mapping is preferred; if mapping fails the whole file is read
//! into memory instead.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;
use tracing::debug;

use crate::errors::{LobsterError, Result};
use lobster_utils::bytes::BeReader;

/// Backing storage for dump data
pub enum ReadBuffer {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl ReadBuffer {
    /// Open a dump file, memory-mapping when possible
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            LobsterError::io(format!("cannot open {}: {}", path.display(), e)).with_source(e)
        })?;
        // Safety: the mapping is read-only and the file is a dump nobody
        // should be writing to while we analyze it.
        match unsafe { Mmap::map(&file) } {
            Ok(mmap) => {
                debug!(len = mmap.len(), "memory-mapped dump file");
                Ok(ReadBuffer::Mapped(mmap))
            }
            Err(e) => {
                debug!("mmap failed ({}), reading file into memory", e);
                let data = std::fs::read(path)?;
                Ok(ReadBuffer::Owned(data))
            }
        }
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        ReadBuffer::Owned(data)
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            ReadBuffer::Mapped(m) => m,
            ReadBuffer::Owned(v) => v,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cursor positioned at `offset`
    pub fn reader_at(&self, offset: u64) -> BeReader<'_> {
        BeReader::at(self.as_slice(), offset as usize)
    }

    /// Exact slice of dump data
    pub fn slice(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let start = offset as usize;
        let data = self.as_slice();
        let end = start
            .checked_add(len)
            .filter(|&end| end <= data.len())
            .ok_or_else(|| {
                LobsterError::parse(format!("{} byte read past end of dump", len))
                    .with_offset(offset)
            })?;
        Ok(&data[start..end])
    }
}

impl std::fmt::Debug for ReadBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadBuffer::Mapped(m) => write!(f, "ReadBuffer::Mapped({} bytes)", m.len()),
            ReadBuffer::Owned(v) => write!(f, "ReadBuffer::Owned({} bytes)", v.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_bounds() {
        let buf = ReadBuffer::from_vec(vec![1, 2, 3, 4]);
        assert_eq!(buf.slice(1, 2).unwrap(), &[2, 3]);
        assert!(buf.slice(3, 2).is_err());
        assert!(buf.slice(u64::MAX, 1).is_err());
    }

    #[test]
    fn test_open_falls_back_for_real_files() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        tmp.write_all(&[0xca, 0xfe]).unwrap();
        let buf = ReadBuffer::open(tmp.path()).unwrap();
        assert_eq!(buf.as_slice(), &[0xca, 0xfe]);
    }
}
