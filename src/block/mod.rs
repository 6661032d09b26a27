use std::hash::{BuildHasher, BuildHasherDefault, Hash};

use serde::{Deserialize, Serialize};

mod batcher;

pub(crate) use batcher::*;

/// Hasher used to partition the keys between the reducing units and to group them inside a unit.
pub type GroupHasherBuilder = BuildHasherDefault<wyhash::WyHash>;

/// Hash of a key, stable across the tasks of the same run.
#[inline]
pub fn group_by_hash<T: Hash>(item: &T) -> u64 {
    GroupHasherBuilder::default().hash_one(item)
}

/// Index of the reducing unit, out of `units`, responsible for `key`.
#[inline]
pub fn partition_of<K: Hash>(key: &K, units: usize) -> usize {
    (group_by_hash(key) % units as u64) as usize
}

/// How many reducing units a stage is allowed to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Replication {
    /// As many units as the environment is configured with.
    #[default]
    Unlimited,
    /// At most this many units.
    Limited(usize),
    /// A single unit receives every key.
    One,
}

impl Replication {
    /// Apply the restriction to the number of units offered by the environment.
    pub fn clamp(&self, units: usize) -> usize {
        let units = units.max(1);
        match self {
            Replication::Unlimited => units,
            Replication::Limited(n) => units.min((*n).max(1)),
            Replication::One => 1,
        }
    }
}
