use std::hash::Hash;

use crate::channel::Sender;
use crate::error::Error;
use crate::operator::Emit;

use super::partition_of;

/// A batch of records directed to a single reducing unit.
pub(crate) type Batch<K, V> = Vec<(K, V)>;

/// A `Batcher` is the emitter given to a map task: it routes every record to the reducing unit
/// that owns its key and sends the records in batches to reduce the channel overhead.
///
/// A batch is flushed when it reaches `batch_size` records, the remaining records are flushed by
/// `finish`.
#[derive(Derivative)]
#[derivative(Debug)]
pub(crate) struct Batcher<K: Send + 'static, V: Send + 'static> {
    /// One sender per reducing unit, indexed by unit.
    #[derivative(Debug = "ignore")]
    senders: Vec<Sender<Batch<K, V>>>,
    /// Records waiting to be sent, one buffer per reducing unit.
    #[derivative(Debug = "ignore")]
    buffers: Vec<Batch<K, V>>,
    batch_size: usize,
    /// Number of records emitted so far.
    emitted: usize,
}

impl<K: Hash + Send + 'static, V: Send + 'static> Batcher<K, V> {
    pub(crate) fn new(senders: Vec<Sender<Batch<K, V>>>, batch_size: usize) -> Self {
        let buffers = (0..senders.len())
            .map(|_| Vec::with_capacity(batch_size))
            .collect();
        Self {
            senders,
            buffers,
            batch_size,
            emitted: 0,
        }
    }

    /// Send the buffer of a unit, if it's not empty.
    fn flush(&mut self, unit: usize) -> Result<(), Error> {
        if self.buffers[unit].is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(
            &mut self.buffers[unit],
            Vec::with_capacity(self.batch_size),
        );
        self.senders[unit]
            .send(batch)
            .map_err(|_| Error::Shuffle(unit))
    }

    /// Flush every pending record and close the connections to the units.
    ///
    /// Returns the number of emitted records.
    pub(crate) fn finish(mut self) -> Result<usize, Error> {
        for unit in 0..self.buffers.len() {
            self.flush(unit)?;
        }
        Ok(self.emitted)
    }
}

impl<K: Hash + Send + 'static, V: Send + 'static> Emit<K, V> for Batcher<K, V> {
    fn emit(&mut self, key: K, value: V) -> Result<(), Error> {
        let unit = partition_of(&key, self.senders.len());
        self.buffers[unit].push((key, value));
        self.emitted += 1;
        if self.buffers[unit].len() >= self.batch_size {
            self.flush(unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::partition_of;
    use crate::channel;

    #[test]
    fn records_reach_the_owner_of_their_key() {
        let units = 3;
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..units).map(|_| channel::bounded(100)).unzip();
        let mut batcher = Batcher::new(senders, 4);
        for i in 0..50u32 {
            batcher.emit(i % 7, i).unwrap();
        }
        assert_eq!(batcher.finish().unwrap(), 50);

        let mut total = 0;
        for (unit, receiver) in receivers.iter().enumerate() {
            for batch in receiver.iter() {
                assert!(batch.len() <= 4);
                for (key, value) in batch {
                    assert_eq!(partition_of(&key, units), unit);
                    assert_eq!(value % 7, key);
                    total += 1;
                }
            }
        }
        assert_eq!(total, 50);
    }

    #[test]
    fn closed_unit_is_an_error() {
        let (sender, receiver) = channel::bounded(1);
        drop(receiver);
        let mut batcher = Batcher::new(vec![sender], 1);
        assert!(matches!(batcher.emit(1, 1), Err(Error::Shuffle(0))));
    }
}
