use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only access to the input corpus.
///
/// `read_range` must be self-contained: concurrent calls for different ranges
/// of the same path must not share a read position.
pub trait FileSource: Send + Sync + 'static {
    fn stat(&self, path: &Path) -> io::Result<u64>;

    /// Returns exactly `length` bytes starting at `offset`, or an
    /// `UnexpectedEof` error if fewer are available.
    fn read_range(&self, path: &Path, offset: u64, length: u64) -> io::Result<Vec<u8>>;
}

/// Reads from the local filesystem, opening a fresh handle per read.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSource;

impl FileSource for LocalFileSource {
    /// Opens the file, so an unreadable input fails here rather than in a map task.
    fn stat(&self, path: &Path) -> io::Result<u64> {
        let metadata = File::open(path)?.metadata()?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        Ok(metadata.len())
    }

    fn read_range(&self, path: &Path, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(length as usize);
        file.take(length).read_to_end(&mut buf)?;
        check_length(buf, offset, length)
    }
}

/// Named in-memory buffers.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }

    fn contents(&self, path: &Path) -> io::Result<&[u8]> {
        self.files.get(path).map(Vec::as_slice).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}

impl FileSource for MemorySource {
    fn stat(&self, path: &Path) -> io::Result<u64> {
        Ok(self.contents(path)?.len() as u64)
    }

    fn read_range(&self, path: &Path, offset: u64, length: u64) -> io::Result<Vec<u8>> {
        let contents = self.contents(path)?;
        let start = (offset as usize).min(contents.len());
        let end = offset.saturating_add(length).min(contents.len() as u64) as usize;
        check_length(contents[start..end].to_vec(), offset, length)
    }
}

fn check_length(buf: Vec<u8>, offset: u64, length: u64) -> io::Result<Vec<u8>> {
    if buf.len() as u64 != length {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "short read at offset {offset}: wanted {length} bytes, got {}",
                buf.len()
            ),
        ));
    }
    Ok(buf)
}
