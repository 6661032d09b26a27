//! The output of a stage, kept in memory or spilled to disk.
//!
//! A [`Dataset`] is the handle the runner returns when a stage completes. It is the only way the
//! records of a stage reach the following one: it implements [`Source`] and it yields exactly one
//! partition for every reducing unit that produced it.

use std::path::{Path, PathBuf};

use crate::config::SpillConfig;
use crate::error::Error;
use crate::operator::source::Source;
use crate::operator::{Emit, ExchangeData};

pub use self::bincode::BincodeReplayer;
use self::bincode::BincodeCacher;

mod bincode;

/// The records produced by a single reducing unit.
#[derive(Debug, Clone)]
pub(crate) enum Part<T> {
    Memory(Vec<T>),
    Spilled { path: PathBuf, records: usize },
}

/// Typed handle to the complete output of a stage.
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    stage: String,
    parts: Vec<Part<T>>,
    /// Directory holding the spilled partitions, if any.
    dir: Option<PathBuf>,
}

impl<T> Part<T> {
    fn len(&self) -> usize {
        match self {
            Part::Memory(items) => items.len(),
            Part::Spilled { records, .. } => *records,
        }
    }
}

impl<T> Dataset<T> {
    pub(crate) fn new(stage: String, parts: Vec<Part<T>>, dir: Option<PathBuf>) -> Self {
        Self { stage, parts, dir }
    }

    /// Name of the stage that produced this dataset.
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn num_partitions(&self) -> usize {
        self.parts.len()
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.parts.iter().map(Part::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The directory of the spilled partitions, `None` if the dataset is in memory.
    pub fn spill_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }
}

impl<T: ExchangeData> Dataset<T> {
    /// Read all the records, partition after partition.
    pub fn collect_vec(self) -> Result<Vec<T>, Error> {
        let mut result = Vec::with_capacity(self.len());
        for part in self.partitions(1)? {
            for item in part {
                result.push(item?);
            }
        }
        Ok(result)
    }
}

/// Reader of a single partition of a [`Dataset`].
#[derive(Debug)]
pub enum PartReader<T> {
    Memory(std::vec::IntoIter<T>),
    Spilled(BincodeReplayer<T>),
}

impl<T: ExchangeData> Iterator for PartReader<T> {
    type Item = Result<T, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            PartReader::Memory(items) => items.next().map(Ok),
            PartReader::Spilled(replayer) => replayer.next(),
        }
    }
}

impl<T: ExchangeData> Source<T> for Dataset<T> {
    type Partition = PartReader<T>;

    /// The partitioning of a dataset is the one of the stage that produced it, `parallelism` is
    /// ignored.
    fn partitions(self, _parallelism: usize) -> Result<Vec<PartReader<T>>, Error> {
        self.parts
            .into_iter()
            .map(|part| match part {
                Part::Memory(items) => Ok(PartReader::Memory(items.into_iter())),
                Part::Spilled { path, .. } => BincodeReplayer::open(&path).map(PartReader::Spilled),
            })
            .collect()
    }
}

/// Collects the records emitted by a reducing unit.
#[derive(Debug)]
pub(crate) enum PartWriter<T> {
    Memory(Vec<T>),
    Spilled(BincodeCacher<T>),
}

impl<T: ExchangeData> PartWriter<T> {
    /// A writer for the partition of `unit`, inside `dir` if the stage is spilled.
    pub(crate) fn new(
        spill: Option<(&SpillConfig, &Path)>,
        unit: usize,
    ) -> Result<Self, Error> {
        match spill {
            None => Ok(PartWriter::Memory(Vec::new())),
            Some((config, dir)) => {
                let path = dir.join(format!("{unit:04}.rnbc"));
                BincodeCacher::create(path, config.batch_size).map(PartWriter::Spilled)
            }
        }
    }

    fn append(&mut self, item: T) -> Result<(), Error> {
        match self {
            PartWriter::Memory(items) => {
                items.push(item);
                Ok(())
            }
            PartWriter::Spilled(cacher) => cacher.append(item),
        }
    }

    pub(crate) fn finalize(self) -> Result<Part<T>, Error> {
        match self {
            PartWriter::Memory(items) => Ok(Part::Memory(items)),
            PartWriter::Spilled(cacher) => {
                let (path, records) = cacher.finalize()?;
                Ok(Part::Spilled { path, records })
            }
        }
    }
}

impl<K: ExchangeData, V: ExchangeData> Emit<K, V> for PartWriter<(K, V)> {
    fn emit(&mut self, key: K, value: V) -> Result<(), Error> {
        self.append((key, value))
    }
}
