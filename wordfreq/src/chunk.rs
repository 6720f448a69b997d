use crate::error::JobError;

/// A contiguous byte range of the input, owned by exactly one map task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    index: usize,
    offset: u64,
    length: u64,
}

impl Chunk {
    pub fn new(index: usize, offset: u64, length: u64) -> Chunk {
        Chunk {
            index,
            offset,
            length,
        }
    }

    /// Also the partition index of the intermediate record this chunk produces.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Splits `file_size` bytes into `ceil(file_size / chunk_size)` chunks.
/// Only the last chunk may be shorter than `chunk_size`.
pub fn plan(file_size: u64, chunk_size: u64) -> Result<Vec<Chunk>, JobError> {
    if chunk_size == 0 {
        return Err(JobError::configuration("chunk size must be positive"));
    }

    let n_chunks = file_size.div_ceil(chunk_size);
    let chunks = (0..n_chunks)
        .map(|i| {
            let offset = i * chunk_size;
            let length = chunk_size.min(file_size - offset);
            Chunk::new(i as usize, offset, length)
        })
        .collect();
    Ok(chunks)
}
