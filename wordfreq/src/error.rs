use std::io;

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The three ways a job can fail. A job reports exactly one of these.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<io::Error>,
    },

    #[error("i/o error in chunk {chunk}")]
    Io {
        chunk: usize,
        #[source]
        source: io::Error,
    },

    #[error("serialization error in partition {partition}")]
    Serialization {
        partition: usize,
        #[source]
        source: BoxError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Io,
    Serialization,
}

impl JobError {
    pub fn configuration(message: impl Into<String>) -> Self {
        JobError::Configuration {
            message: message.into(),
            source: None,
        }
    }

    pub fn serialization(partition: usize, source: impl Into<BoxError>) -> Self {
        JobError::Serialization {
            partition,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::Configuration { .. } => ErrorKind::Configuration,
            JobError::Io { .. } => ErrorKind::Io,
            JobError::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    /// The chunk or partition the error is attributed to, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            JobError::Configuration { .. } => None,
            JobError::Io { chunk, .. } => Some(*chunk),
            JobError::Serialization { partition, .. } => Some(*partition),
        }
    }
}
