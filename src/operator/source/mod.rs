//! Utility traits and structures related to the source of a stage.

pub use file::*;
pub use iterator::*;

use crate::error::Error;

mod file;
mod iterator;

/// The input of a stage.
///
/// A source is split into partitions before the map phase starts, each of them is consumed by a
/// different map task. Every item must belong to exactly one partition.
pub trait Source<T>: Send {
    type Partition: Iterator<Item = Result<T, Error>> + Send;

    /// Split the source in at most `parallelism` partitions.
    ///
    /// Returning fewer partitions is allowed, for example when the source is not splittable.
    fn partitions(self, parallelism: usize) -> Result<Vec<Self::Partition>, Error>;
}

/// A vector is split in contiguous chunks of (almost) the same length.
impl<T: Send> Source<T> for Vec<T> {
    type Partition = std::iter::Map<std::vec::IntoIter<T>, fn(T) -> Result<T, Error>>;

    fn partitions(mut self, parallelism: usize) -> Result<Vec<Self::Partition>, Error> {
        let parallelism = parallelism.max(1);
        let chunk = self.len().div_ceil(parallelism).max(1);
        let mut parts = Vec::with_capacity(parallelism);
        while self.len() > chunk {
            let tail = self.split_off(chunk);
            parts.push(std::mem::replace(&mut self, tail));
        }
        parts.push(self);
        Ok(parts
            .into_iter()
            .map(|part| part.into_iter().map(Ok as fn(T) -> Result<T, Error>))
            .collect())
    }
}
