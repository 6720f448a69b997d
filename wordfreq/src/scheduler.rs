use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::task::{self, JoinError};
use tracing::{info, warn};

use crate::aggregator::{Aggregator, FinalResult};
use crate::chunk::{self, Chunk};
use crate::config::JobConfig;
use crate::error::JobError;
use crate::source::{FileSource, LocalFileSource};
use crate::store::{IntermediateStore, MemoryStore};
use crate::worker::{MapWorker, ReduceWorker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Map,
    Reduce,
}

impl Phase {
    fn task_failed(self, index: usize, err: JoinError) -> JobError {
        let source = io::Error::other(format!("{self} task {index} did not complete: {err}"));
        match self {
            Phase::Map => JobError::Io {
                chunk: index,
                source,
            },
            Phase::Reduce => JobError::serialization(index, source),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Map => write!(f, "map"),
            Phase::Reduce => write!(f, "reduce"),
        }
    }
}

/// Runs a word count job: plan, map phase, barrier, reduce phase, merge.
pub struct Scheduler<F, S> {
    config: JobConfig,
    source: Arc<F>,
    store: Arc<S>,
}

impl<F: FileSource, S: IntermediateStore> Scheduler<F, S> {
    pub fn new(config: JobConfig, source: F, store: S) -> Self {
        Scheduler {
            config,
            source: Arc::new(source),
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn run(&self, path: impl AsRef<Path>) -> Result<FinalResult, JobError> {
        let path = path.as_ref();
        let chunks = self.prepare(path)?;
        self.map_phase(path, &chunks).await?;
        let result = self.reduce_phase(chunks.len()).await?;

        if !self.config.retain_intermediate {
            self.retire(chunks.len()).await;
        }
        info!(
            distinct = result.len(),
            tokens = result.total(),
            "job complete"
        );
        Ok(result)
    }

    /// Validates the configuration and splits the input into chunks.
    /// Nothing has been started when this fails.
    pub fn prepare(&self, path: &Path) -> Result<Vec<Chunk>, JobError> {
        self.config.validate()?;
        let file_size = self
            .source
            .stat(path)
            .map_err(|source| JobError::Configuration {
                message: format!("cannot read input {}", path.display()),
                source: Some(source),
            })?;
        let chunks = chunk::plan(file_size, self.config.chunk_size)?;

        info!(
            path = %path.display(),
            file_size,
            chunk_size = self.config.chunk_size,
            chunks = chunks.len(),
            "planned job"
        );
        Ok(chunks)
    }

    /// Runs one map task per chunk. Returns once every started task has
    /// finished, so all records are in the store when this returns `Ok`.
    pub async fn map_phase(&self, path: &Path, chunks: &[Chunk]) -> Result<(), JobError> {
        let worker = Arc::new(MapWorker::new(
            path.to_path_buf(),
            Arc::clone(&self.source),
            Arc::clone(&self.store),
        ));
        let tasks = chunks.iter().map(|chunk| (chunk.index(), *chunk));

        let mut mapped = 0;
        self.run_phase(
            Phase::Map,
            tasks,
            move |chunk| worker.run(chunk),
            |_, _| {
                mapped += 1;
                Ok(())
            },
        )
        .await?;

        info!(chunks = mapped, "map phase complete");
        Ok(())
    }

    /// Loads every partition and merges it into the global table.
    pub async fn reduce_phase(&self, partitions: usize) -> Result<FinalResult, JobError> {
        let worker = Arc::new(ReduceWorker::new(Arc::clone(&self.store)));
        let mut aggregator = Aggregator::new(partitions);

        self.run_phase(
            Phase::Reduce,
            (0..partitions).map(|partition| (partition, partition)),
            move |partition| worker.run(partition),
            |partition, table| aggregator.merge(partition, table),
        )
        .await?;

        info!(partitions, "reduce phase complete");
        aggregator.finish()
    }

    async fn run_phase<T, R, W, D>(
        &self,
        phase: Phase,
        tasks: impl Iterator<Item = (usize, T)>,
        work: W,
        mut on_done: D,
    ) -> Result<(), JobError>
    where
        T: Send + 'static,
        R: Send + 'static,
        W: Fn(T) -> Result<R, JobError> + Send + Sync + 'static,
        D: FnMut(usize, R) -> Result<(), JobError>,
    {
        let work = Arc::new(work);
        let aborted = AtomicBool::new(false);

        let mut outcomes = stream::iter(tasks)
            .map(|(index, item)| {
                // checked when the task is pulled, so nothing new starts after a failure
                let skip = aborted.load(Ordering::Acquire);
                let work = Arc::clone(&work);
                async move {
                    if skip {
                        return (index, None);
                    }
                    let outcome = task::spawn_blocking(move || (*work)(item))
                        .await
                        .unwrap_or_else(|err| Err(phase.task_failed(index, err)));
                    (index, Some(outcome))
                }
            })
            .buffer_unordered(self.config.workers.max(1));

        let mut first_error = None;
        let mut skipped = 0;
        while let Some((index, outcome)) = outcomes.next().await {
            let Some(outcome) = outcome else {
                skipped += 1;
                continue;
            };
            if let Err(err) = outcome.and_then(|value| on_done(index, value)) {
                if first_error.is_none() {
                    warn!(%phase, index, error = %err, "task failed, aborting job");
                    aborted.store(true, Ordering::Release);
                    first_error = Some(err);
                }
            }
        }

        match first_error {
            Some(err) => {
                warn!(%phase, skipped, "phase aborted");
                Err(err)
            }
            None => Ok(()),
        }
    }

    async fn retire(&self, partitions: usize) {
        let store = Arc::clone(&self.store);
        let removed = task::spawn_blocking(move || {
            for partition in 0..partitions {
                if let Err(err) = store.remove(partition) {
                    warn!(partition, error = %err, "failed to remove intermediate record");
                }
            }
        })
        .await;
        if let Err(err) = removed {
            warn!(error = %err, "intermediate cleanup did not complete");
        }
    }
}

/// Counts the words of a local file, keeping intermediate records in memory.
pub async fn run(config: JobConfig, path: impl AsRef<Path>) -> Result<FinalResult, JobError> {
    Scheduler::new(config, LocalFileSource, MemoryStore::new())
        .run(path)
        .await
}
