use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::chunk::Chunk;
use crate::error::JobError;
use crate::frequency::FrequencyTable;
use crate::source::FileSource;
use crate::store::{IntermediateStore, StoreError};
use crate::tokenizer;

/// Counts the words of one chunk and publishes the table to the store.
pub struct MapWorker<F, S> {
    path: PathBuf,
    source: Arc<F>,
    store: Arc<S>,
}

impl<F: FileSource, S: IntermediateStore> MapWorker<F, S> {
    pub fn new(path: PathBuf, source: Arc<F>, store: Arc<S>) -> Self {
        MapWorker {
            path,
            source,
            store,
        }
    }

    pub fn run(&self, chunk: Chunk) -> Result<FrequencyTable, JobError> {
        let bytes = self
            .source
            .read_range(&self.path, chunk.offset(), chunk.length())
            .map_err(|source| JobError::Io {
                chunk: chunk.index(),
                source,
            })?;

        let table: FrequencyTable = tokenizer::normalize(&bytes).into_iter().collect();

        self.store
            .put(chunk.index(), &table)
            .map_err(|err| match err {
                StoreError::Io { source, .. } => JobError::Io {
                    chunk: chunk.index(),
                    source,
                },
                err => JobError::serialization(chunk.index(), err),
            })?;

        debug!(
            chunk = chunk.index(),
            offset = chunk.offset(),
            length = chunk.length(),
            tokens = table.total(),
            distinct = table.len(),
            "map task done"
        );
        Ok(table)
    }
}

/// Loads one partition's intermediate record.
pub struct ReduceWorker<S> {
    store: Arc<S>,
}

impl<S: IntermediateStore> ReduceWorker<S> {
    pub fn new(store: Arc<S>) -> Self {
        ReduceWorker { store }
    }

    pub fn run(&self, partition: usize) -> Result<FrequencyTable, JobError> {
        let table = self
            .store
            .get(partition)
            .map_err(|err| JobError::serialization(partition, err))?;

        debug!(partition, distinct = table.len(), "reduce task done");
        Ok(table)
    }
}
