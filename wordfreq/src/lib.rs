//! Single-node map/reduce word counting.
//!
//! The input is cut into fixed-size byte chunks, each chunk is counted by its
//! own map task and parked in an [`IntermediateStore`], and once every map task
//! has finished the per-partition tables are loaded and merged into one sorted
//! [`FinalResult`].

pub mod aggregator;
pub mod chunk;
pub mod config;
pub mod error;
pub mod frequency;
pub mod scheduler;
pub mod source;
pub mod store;
pub mod tokenizer;
pub mod worker;

pub use aggregator::{Aggregator, FinalResult};
pub use chunk::Chunk;
pub use config::JobConfig;
pub use error::{ErrorKind, JobError};
pub use frequency::FrequencyTable;
pub use scheduler::{run, Scheduler};
pub use source::{FileSource, LocalFileSource, MemorySource};
pub use store::{DirStore, IntermediateStore, MemoryStore, StoreError};
