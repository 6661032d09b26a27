use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::block::{Batch, Batcher, GroupHasherBuilder};
use crate::channel::{self, Receiver};
use crate::config::{EnvironmentConfig, Grouping};
use crate::error::Error;
use crate::operator::cache::{Dataset, Part, PartWriter};
use crate::operator::source::Source;
use crate::operator::{Emit, Mapper, Reducer, Stage};
use crate::profiler::{MapMetrics, StageMetrics, UnitMetrics};
use crate::worker::{join_worker, spawn_worker, Coord, Phase};

/// Records emitted by the reducer of a stage.
type StageOutput<R> = Dataset<(<R as Reducer>::OutKey, <R as Reducer>::OutValue)>;
type UnitResult<R> = (
    Part<(<R as Reducer>::OutKey, <R as Reducer>::OutValue)>,
    UnitMetrics,
);

/// Execute a single stage to completion.
///
/// The source is split in map tasks, each running in its own thread, that emit records towards
/// the reducing units. A unit starts grouping only after every map task has finished, and this
/// function returns only after every unit has finished, so the returned dataset is the complete
/// output of the stage.
///
/// If any task fails, the other tasks are stopped as soon as possible, the partial output is
/// discarded and the first error is returned.
pub(crate) fn run_stage<S, M, F, R>(
    config: &EnvironmentConfig,
    index: usize,
    stage: &Stage<M, F>,
    source: S,
) -> Result<(StageOutput<R>, StageMetrics), Error>
where
    S: Source<M::In>,
    M: Mapper,
    F: Fn() -> R + Send + Sync,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    let start = Instant::now();
    let partitions = source.partitions(config.parallelism())?;
    let units = stage.replication.clamp(config.reducers());
    let dir = spill_dir(config, index, &stage.name)?;
    info!(
        "starting stage {} ({}): {} map tasks, {} reducing units, {}",
        index,
        stage.name,
        partitions.len(),
        units,
        match &dir {
            Some(dir) => format!("spilling to {}", dir.display()),
            None => "in memory".to_string(),
        }
    );

    let abort = AtomicBool::new(false);
    let (senders, receivers): (Vec<_>, Vec<_>) = (0..units)
        .map(|_| channel::bounded(config.shuffle.channel_capacity))
        .unzip();

    let abort = &abort;
    let (map_results, unit_results) = std::thread::scope(|scope| {
        let mut unit_handles = Vec::with_capacity(units);
        for (unit, receiver) in receivers.into_iter().enumerate() {
            let coord = Coord::new(index, Phase::Reduce, unit);
            let spill = config.spill.as_ref().zip(dir.as_deref());
            let grouping = config.shuffle.grouping;
            let handle = spawn_worker(scope, coord, move || {
                let writer = PartWriter::new(spill, unit)?;
                let reducer = (stage.make_reducer)();
                run_unit(receiver, reducer, writer, grouping, abort)
            });
            unit_handles.push((coord, handle));
        }

        let mut map_handles = Vec::with_capacity(partitions.len());
        for (task, partition) in partitions.into_iter().enumerate() {
            let coord = Coord::new(index, Phase::Map, task);
            let batcher = Batcher::new(senders.clone(), config.shuffle.batch_size);
            let mapper = &stage.mapper;
            let handle = spawn_worker(scope, coord, move || {
                run_map(partition, mapper, batcher, abort)
            });
            map_handles.push((coord, handle));
        }
        // the units stop receiving when all the map tasks have dropped their senders
        drop(senders);

        let map_results = map_handles
            .into_iter()
            .map(|(coord, handle)| {
                let result = handle.and_then(|handle| join_worker(coord, handle));
                if result.is_err() {
                    abort.store(true, Ordering::SeqCst);
                }
                result
            })
            .collect::<Vec<_>>();
        let unit_results = unit_handles
            .into_iter()
            .map(|(coord, handle)| handle.and_then(|handle| join_worker(coord, handle)))
            .collect::<Vec<_>>();
        (map_results, unit_results)
    });

    let mut metrics = StageMetrics::new(&stage.name, index);
    let mut errors = Vec::new();
    for result in map_results {
        match result {
            Ok(map) => metrics.add_map(map),
            Err(e) => errors.push(e),
        }
    }
    let mut parts = Vec::with_capacity(units);
    for result in unit_results {
        match result {
            Ok((part, unit)) => {
                metrics.add_unit(unit);
                parts.push(part);
            }
            Err(e) => errors.push(e),
        }
    }

    if let Some(error) = first_error(errors) {
        error!("stage {} ({}) failed: {}", index, stage.name, error);
        if let Some(dir) = dir {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                warn!("cannot remove {}: {}", dir.display(), e);
            }
        }
        return Err(error);
    }

    metrics.elapsed = start.elapsed();
    info!(
        "stage {} ({}) completed in {:?}: {} records in, {} shuffled, {} groups, {} records out",
        index,
        stage.name,
        metrics.elapsed,
        metrics.records_in,
        metrics.records_shuffled,
        metrics.groups,
        metrics.records_out
    );
    Ok((Dataset::new(stage.name.clone(), parts, dir), metrics))
}

/// Create the directory for the output of the stage, if it's spilled.
fn spill_dir(
    config: &EnvironmentConfig,
    index: usize,
    name: &str,
) -> Result<Option<PathBuf>, Error> {
    let dir = config
        .spill
        .as_ref()
        .map(|spill| spill.path.join(format!("{index:02}-{name}")));
    if let Some(dir) = &dir {
        std::fs::create_dir_all(dir)?;
    }
    Ok(dir)
}

/// The error that caused the failure.
///
/// `Aborted` and `Shuffle` are only the consequence of the failure of another task, they are
/// returned if nothing else is found.
fn first_error(errors: Vec<Error>) -> Option<Error> {
    let mut consequence = None;
    for error in errors {
        match error {
            Error::Aborted | Error::Shuffle(_) => {
                consequence.get_or_insert(error);
            }
            error => return Some(error),
        }
    }
    consequence
}

/// Body of a map task.
fn run_map<P, M>(
    partition: P,
    mapper: &M,
    mut batcher: Batcher<M::Key, M::Value>,
    abort: &AtomicBool,
) -> Result<MapMetrics, Error>
where
    P: Iterator<Item = Result<M::In, Error>>,
    M: Mapper,
{
    let mut records_in = 0;
    for item in partition {
        if abort.load(Ordering::Relaxed) {
            return Err(Error::Aborted);
        }
        if let Err(e) = item.and_then(|item| mapper.map(item, &mut batcher)) {
            abort.store(true, Ordering::SeqCst);
            return Err(e);
        }
        records_in += 1;
    }
    let emitted = batcher.finish()?;
    Ok(MapMetrics {
        records_in,
        emitted,
    })
}

/// Emitter that counts the records passing through it.
struct Counted<'a, E> {
    inner: &'a mut E,
    count: usize,
}

impl<K, V, E: Emit<K, V>> Emit<K, V> for Counted<'_, E> {
    fn emit(&mut self, key: K, value: V) -> Result<(), Error> {
        self.count += 1;
        self.inner.emit(key, value)
    }
}

/// Body of a reducing unit: receive everything, group by key, reduce every group.
fn run_unit<R>(
    receiver: Receiver<Batch<R::Key, R::Value>>,
    mut reducer: R,
    mut writer: PartWriter<(R::OutKey, R::OutValue)>,
    grouping: Grouping,
    abort: &AtomicBool,
) -> Result<UnitResult<R>, Error>
where
    R: Reducer,
{
    let mut metrics = UnitMetrics::default();
    let mut out = Counted {
        inner: &mut writer,
        count: 0,
    };

    match grouping {
        Grouping::SortMerge => {
            let mut records = Vec::new();
            for mut batch in receiver.iter() {
                records.append(&mut batch);
            }
            if abort.load(Ordering::SeqCst) {
                return Err(Error::Aborted);
            }
            metrics.records_in = records.len();
            glidesort::sort_by(&mut records, |a, b| a.0.cmp(&b.0));

            let mut records = records.into_iter().peekable();
            while let Some((key, first)) = records.next() {
                metrics.groups += 1;
                let current = key.clone();
                let rest = std::iter::from_fn(|| {
                    records
                        .next_if(|(k, _)| *k == current)
                        .map(|(_, value)| value)
                });
                reducer.reduce(key, std::iter::once(first).chain(rest), &mut out)?;
                // skip what the reducer did not consume
                while records.next_if(|(k, _)| *k == current).is_some() {}
            }
        }
        Grouping::Hash => {
            let mut groups: HashMap<R::Key, Vec<R::Value>, GroupHasherBuilder> =
                HashMap::default();
            for batch in receiver.iter() {
                metrics.records_in += batch.len();
                for (key, value) in batch {
                    groups.entry(key).or_default().push(value);
                }
            }
            if abort.load(Ordering::SeqCst) {
                return Err(Error::Aborted);
            }
            metrics.groups = groups.len();
            for (key, values) in groups {
                reducer.reduce(key, values.into_iter(), &mut out)?;
            }
        }
    }

    reducer.cleanup(&mut out)?;
    metrics.records_out = out.count;
    Ok((writer.finalize()?, metrics))
}
