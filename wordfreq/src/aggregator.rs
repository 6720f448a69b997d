use std::fmt;
use std::io::{self, Write};

use thiserror::Error;

use crate::error::JobError;
use crate::frequency::FrequencyTable;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    #[error("partition {0} was merged twice")]
    Duplicate(usize),
    #[error("partition {partition} is outside the {expected} planned partitions")]
    OutOfRange { partition: usize, expected: usize },
    #[error("partition {0} was never merged")]
    Missing(usize),
}

/// Single owner of the global table. Partition tables are moved in one at a
/// time, in any order.
#[derive(Debug)]
pub struct Aggregator {
    global: FrequencyTable,
    arrived: Vec<bool>,
}

impl Aggregator {
    pub fn new(expected: usize) -> Self {
        Aggregator {
            global: FrequencyTable::new(),
            arrived: vec![false; expected],
        }
    }

    pub fn expected(&self) -> usize {
        self.arrived.len()
    }

    pub fn merged(&self) -> usize {
        self.arrived.iter().filter(|arrived| **arrived).count()
    }

    pub fn merge(&mut self, partition: usize, table: FrequencyTable) -> Result<(), JobError> {
        let expected = self.expected();
        let slot = self.arrived.get_mut(partition).ok_or_else(|| {
            JobError::serialization(partition, MergeError::OutOfRange { partition, expected })
        })?;
        if *slot {
            return Err(JobError::serialization(
                partition,
                MergeError::Duplicate(partition),
            ));
        }
        *slot = true;
        self.global.merge(table);
        Ok(())
    }

    /// Fails unless every planned partition has been merged.
    pub fn finish(self) -> Result<FinalResult, JobError> {
        if let Some(missing) = self.arrived.iter().position(|arrived| !arrived) {
            return Err(JobError::serialization(missing, MergeError::Missing(missing)));
        }

        let mut entries: Vec<(String, u64)> = self.global.into_iter().collect();
        entries.sort();
        Ok(FinalResult { entries })
    }
}

/// Every distinct word with its global count, in byte order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalResult {
    entries: Vec<(String, u64)>,
}

impl FinalResult {
    pub fn entries(&self) -> &[(String, u64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, word: &str) -> Option<u64> {
        self.entries
            .binary_search_by(|(w, _)| w.as_str().cmp(word))
            .ok()
            .map(|i| self.entries[i].1)
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    /// Writes one `word:count` line per entry.
    pub fn write_to<W: Write>(&self, mut out: W) -> io::Result<()> {
        for (word, count) in &self.entries {
            writeln!(out, "{word}:{count}")?;
        }
        out.flush()
    }
}

impl fmt::Display for FinalResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (word, count) in &self.entries {
            writeln!(f, "{word}:{count}")?;
        }
        Ok(())
    }
}
