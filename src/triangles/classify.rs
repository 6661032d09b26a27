//! Second stage: tell the closed triads from the open ones.

use crate::error::Error;
use crate::operator::{Emit, Reducer};

use super::record::{PairKey, Tag};
use super::SENTINEL;

/// Number of triangles closed by the records of a single pair.
///
/// With `n` records of which `s` are candidates, the pair closes `s` triads if it is also an edge
/// (`s < n`), none otherwise.
pub fn closed_triads<I: IntoIterator<Item = Tag>>(tags: I) -> u64 {
    let (records, candidates) = tags
        .into_iter()
        .fold((0u64, 0u64), |(n, s), tag| (n + 1, s + tag.weight()));
    if candidates < records {
        candidates
    } else {
        0
    }
}

/// Sums the closed triads of all the pairs of a unit and emits the sum once, when the unit is
/// done.
#[derive(Debug, Clone, Default)]
pub struct ClassifyReducer {
    local_sum: u64,
}

impl ClassifyReducer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reducer for ClassifyReducer {
    type Key = PairKey;
    type Value = Tag;
    type OutKey = u64;
    type OutValue = u64;

    fn reduce<I, E>(&mut self, key: PairKey, values: I, _out: &mut E) -> Result<(), Error>
    where
        I: Iterator<Item = Tag>,
        E: Emit<u64, u64>,
    {
        let closed = closed_triads(values);
        if closed > 0 {
            trace!("pair {key} closes {closed} triangles");
        }
        self.local_sum = self.local_sum.checked_add(closed).ok_or_else(|| {
            Error::InternalConsistency(format!("triangle count overflow at pair {key}"))
        })?;
        Ok(())
    }

    fn cleanup<E>(&mut self, out: &mut E) -> Result<(), Error>
    where
        E: Emit<u64, u64>,
    {
        if self.local_sum > 0 {
            out.emit(SENTINEL, std::mem::take(&mut self.local_sum))?;
        }
        Ok(())
    }
}
