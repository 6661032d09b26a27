//! Third stage: the partial counts summed into the total.

use crate::error::Error;
use crate::operator::{Emit, Reducer};

use super::SENTINEL;

/// Sums every partial count. It only accepts the sentinel key.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateReducer;

impl Reducer for AggregateReducer {
    type Key = u64;
    type Value = u64;
    type OutKey = u64;
    type OutValue = u64;

    fn reduce<I, E>(&mut self, key: u64, values: I, out: &mut E) -> Result<(), Error>
    where
        I: Iterator<Item = u64>,
        E: Emit<u64, u64>,
    {
        if key != SENTINEL {
            return Err(Error::InternalConsistency(format!(
                "unexpected key {key} in the partial counts"
            )));
        }
        let mut total = 0u64;
        for partial in values {
            total = total.checked_add(partial).ok_or_else(|| {
                Error::InternalConsistency("triangle count overflow".to_string())
            })?;
        }
        out.emit(SENTINEL, total)
    }
}
