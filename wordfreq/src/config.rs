use std::num::NonZeroUsize;
use std::thread;

use serde::Deserialize;

use crate::error::JobError;

pub const DEFAULT_CHUNK_SIZE: u64 = 1 << 10;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Bytes per map task.
    pub chunk_size: u64,
    /// Upper bound on tasks in flight within a phase.
    pub workers: usize,
    /// Keep intermediate records after a successful job.
    pub retain_intermediate: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4),
            retain_intermediate: true,
        }
    }
}

impl JobConfig {
    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_retain_intermediate(mut self, retain: bool) -> Self {
        self.retain_intermediate = retain;
        self
    }

    pub fn validate(&self) -> Result<(), JobError> {
        if self.chunk_size == 0 {
            return Err(JobError::configuration("chunk size must be positive"));
        }
        if self.workers == 0 {
            return Err(JobError::configuration("worker count must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_is_valid() {
        let config = JobConfig::default();
        assert_eq!(config.chunk_size, 1024);
        assert!(config.workers > 0);
        assert!(config.retain_intermediate);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_zero() {
        let err = JobConfig::default().with_chunk_size(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = JobConfig::default().with_workers(0).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: JobConfig = serde_json::from_str(r#"{"chunk_size": 4096}"#).unwrap();
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.workers, JobConfig::default().workers);
        assert!(config.retain_intermediate);

        assert!(serde_json::from_str::<JobConfig>(r#"{"chunksize": 1}"#).is_err());
    }
}
