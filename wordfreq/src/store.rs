use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::frequency::FrequencyTable;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no intermediate record for partition {0}")]
    NotFound(usize),

    #[error("failed to encode partition {partition}")]
    Encode {
        partition: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode partition {partition}")]
    Decode {
        partition: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage i/o failed for partition {partition}")]
    Io {
        partition: usize,
        #[source]
        source: io::Error,
    },
}

/// Keyed holder of partition-local tables between the map and reduce phases.
///
/// Each partition key has one writer (its map task) and one reader (its reduce
/// task).
pub trait IntermediateStore: Send + Sync + 'static {
    fn put(&self, partition: usize, table: &FrequencyTable) -> Result<(), StoreError>;

    fn get(&self, partition: usize) -> Result<FrequencyTable, StoreError>;

    /// Removing an absent partition is not an error.
    fn remove(&self, partition: usize) -> Result<(), StoreError>;
}

fn encode(partition: usize, table: &FrequencyTable) -> Result<Vec<u8>, StoreError> {
    table
        .encode()
        .map_err(|source| StoreError::Encode { partition, source })
}

fn decode(partition: usize, bytes: &[u8]) -> Result<FrequencyTable, StoreError> {
    FrequencyTable::decode(bytes).map_err(|source| StoreError::Decode { partition, source })
}

/// Keeps encoded records in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<usize, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<usize, Vec<u8>>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IntermediateStore for MemoryStore {
    fn put(&self, partition: usize, table: &FrequencyTable) -> Result<(), StoreError> {
        let bytes = encode(partition, table)?;
        self.lock().insert(partition, bytes);
        Ok(())
    }

    fn get(&self, partition: usize) -> Result<FrequencyTable, StoreError> {
        let bytes = self
            .lock()
            .get(&partition)
            .cloned()
            .ok_or(StoreError::NotFound(partition))?;
        decode(partition, &bytes)
    }

    fn remove(&self, partition: usize) -> Result<(), StoreError> {
        self.lock().remove(&partition);
        Ok(())
    }
}

/// One JSON file per partition, named `mrtmp.-<partition>.json`.
#[derive(Debug, Clone)]
pub struct DirStore {
    dir: PathBuf,
}

impl DirStore {
    /// Creates `dir` if it does not exist yet.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(DirStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn record_path(&self, partition: usize) -> PathBuf {
        self.dir.join(format!("mrtmp.-{partition}.json"))
    }
}

impl IntermediateStore for DirStore {
    fn put(&self, partition: usize, table: &FrequencyTable) -> Result<(), StoreError> {
        let bytes = encode(partition, table)?;
        let path = self.record_path(partition);
        // rename keeps a half-written record from ever being visible under `path`
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, bytes)
            .and_then(|_| fs::rename(&tmp, &path))
            .map_err(|source| {
                let _ = fs::remove_file(&tmp);
                StoreError::Io { partition, source }
            })
    }

    fn get(&self, partition: usize) -> Result<FrequencyTable, StoreError> {
        let bytes = fs::read(self.record_path(partition)).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(partition)
            } else {
                StoreError::Io { partition, source }
            }
        })?;
        decode(partition, &bytes)
    }

    fn remove(&self, partition: usize) -> Result<(), StoreError> {
        match fs::remove_file(self.record_path(partition)) {
            Err(source) if source.kind() != io::ErrorKind::NotFound => {
                Err(StoreError::Io { partition, source })
            }
            _ => Ok(()),
        }
    }
}
