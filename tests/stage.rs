use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;

use triad::prelude::*;
use utils::TestHelper;

mod utils;

/// Keys every number by its remainder.
struct ModuloMapper(u64);

impl Mapper for ModuloMapper {
    type In = u64;
    type Key = u64;
    type Value = u64;

    fn map<E: Emit<u64, u64>>(&self, item: u64, out: &mut E) -> Result<(), Error> {
        if item == u64::MAX {
            return Err(Error::InternalConsistency("poisoned item".into()));
        }
        out.emit(item % self.0, item)
    }
}

/// Sums the values of every key and, when the unit is done, tells how many keys it saw.
#[derive(Default)]
struct SumReducer {
    keys: u64,
    fail_on: Option<u64>,
}

impl Reducer for SumReducer {
    type Key = u64;
    type Value = u64;
    type OutKey = String;
    type OutValue = u64;

    fn reduce<I, E>(&mut self, key: u64, values: I, out: &mut E) -> Result<(), Error>
    where
        I: Iterator<Item = u64>,
        E: Emit<String, u64>,
    {
        if self.fail_on == Some(key) {
            return Err(Error::InternalConsistency(format!("key {key}")));
        }
        self.keys += 1;
        out.emit(format!("key-{key}"), values.sum())
    }

    fn cleanup<E: Emit<String, u64>>(&mut self, out: &mut E) -> Result<(), Error> {
        out.emit("cleanup".to_string(), self.keys)
    }
}

fn sum_stage(modulo: u64) -> Stage<ModuloMapper, impl Fn() -> SumReducer + Send + Sync> {
    Stage::new("sum", ModuloMapper(modulo), SumReducer::default)
}

#[test]
fn every_key_reduced_once() {
    TestHelper::local_env(Arc::new(|config| {
        let units = config.reducers();
        let mut env = BatchEnvironment::new(config);
        let items = (0..1000u64).collect::<Vec<_>>();
        let output = env.run_stage(&sum_stage(17), items).unwrap();
        assert_eq!(output.num_partitions(), units);
        let records = env.collect(output).unwrap();

        let (cleanups, sums): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|(key, _)| key == "cleanup");
        assert_eq!(cleanups.len(), units);
        assert_eq!(cleanups.iter().map(|(_, n)| n).sum::<u64>(), 17);

        let sums = sums.into_iter().collect::<HashMap<_, _>>();
        assert_eq!(sums.len(), 17);
        for r in 0..17 {
            let expected = (0..1000u64).filter(|i| i % 17 == r).sum::<u64>();
            assert_eq!(sums[&format!("key-{r}")], expected);
        }

        let metrics = env.last_stage().unwrap();
        assert_eq!(metrics.records_in, 1000);
        assert_eq!(metrics.records_shuffled, 1000);
        assert_eq!(metrics.groups, 17);
        assert_eq!(metrics.records_out, 17 + units);
    }));
}

#[test]
fn replication_limits_the_units() {
    TestHelper::local_env(Arc::new(|config| {
        let mut env = BatchEnvironment::new(config);
        let items = (0..100u64).collect::<Vec<_>>();
        let stage = sum_stage(5).replication(Replication::One);
        let output = env.run_stage(&stage, items.clone()).unwrap();
        assert_eq!(output.num_partitions(), 1);
        env.collect(output).unwrap();

        let stage = sum_stage(5).replication(Replication::Limited(2));
        let output = env.run_stage(&stage, items).unwrap();
        assert!(output.num_partitions() <= 2);
        let records = env.collect(output).unwrap();
        let cleanups = records.iter().filter(|(k, _)| k == "cleanup").count();
        assert_eq!(cleanups, env.last_stage().unwrap().reduce_units);
    }));
}

#[test]
fn chained_stages() {
    TestHelper::local_env(Arc::new(|config| {
        let mut env = BatchEnvironment::new(config);
        let first = env
            .run_stage(&sum_stage(10), (0..100u64).collect::<Vec<_>>())
            .unwrap();
        // count the records of the previous stage by the length of their key
        let relabel = Stage::new("relabel", LengthMapper, SumReducer::default);
        let lengths = env.chain(&relabel, first).unwrap();
        let records = env
            .collect(lengths)
            .unwrap()
            .into_iter()
            .filter(|(k, _)| k != "cleanup")
            .sorted()
            .collect::<Vec<_>>();
        // "key-0".."key-9" have length 5, "cleanup" has length 7
        assert_eq!(records[0].0, "key-5");
        assert_eq!(records[0].1, 10);
        assert_eq!(records[1].0, "key-7");
        assert_eq!(env.report().stages.len(), 2);
    }));
}

/// Keys the records of [`SumReducer`] by the length of their key.
struct LengthMapper;

impl Mapper for LengthMapper {
    type In = (String, u64);
    type Key = u64;
    type Value = u64;

    fn map<E: Emit<u64, u64>>(&self, (key, _): (String, u64), out: &mut E) -> Result<(), Error> {
        out.emit(key.len() as u64, 1)
    }
}

#[test]
fn mapper_error_is_returned() {
    TestHelper::local_env(Arc::new(|config| {
        let mut env = BatchEnvironment::new(config);
        let mut items = (0..500u64).collect::<Vec<_>>();
        items[321] = u64::MAX;
        let res = env.run_stage(&sum_stage(3), items);
        assert!(
            matches!(&res, Err(Error::InternalConsistency(msg)) if msg == "poisoned item"),
            "{res:?}"
        );
        assert!(env.report().stages.is_empty());
    }));
}

#[test]
fn reducer_error_is_returned() {
    TestHelper::local_env(Arc::new(|config| {
        let mut env = BatchEnvironment::new(config);
        let stage = Stage::new("failing", ModuloMapper(4), || SumReducer {
            fail_on: Some(2),
            ..Default::default()
        });
        let res = env.run_stage(&stage, (0..100u64).collect::<Vec<_>>());
        assert!(
            matches!(&res, Err(Error::InternalConsistency(msg)) if msg == "key 2"),
            "{res:?}"
        );
    }));
}

/// Panics on the first group.
struct PanickingReducer;

impl Reducer for PanickingReducer {
    type Key = u64;
    type Value = u64;
    type OutKey = u64;
    type OutValue = u64;

    fn reduce<I, E>(&mut self, _key: u64, _values: I, _out: &mut E) -> Result<(), Error>
    where
        I: Iterator<Item = u64>,
        E: Emit<u64, u64>,
    {
        panic!("reducer crashed");
    }
}

#[test]
fn panic_is_an_error() {
    let config = TestHelper::local_config(2, Grouping::SortMerge);
    let mut env = BatchEnvironment::new(config);
    let stage = Stage::new("panicking", ModuloMapper(2), || PanickingReducer);
    let res = env.run_stage(&stage, vec![1u64, 2, 3]);
    assert!(matches!(res, Err(Error::WorkerPanicked(_))), "{res:?}");
}

#[test]
fn iterator_source_is_a_single_partition() {
    let config = TestHelper::local_config(4, Grouping::Hash);
    let mut env = BatchEnvironment::new(config);
    let output = env
        .run_stage(&sum_stage(2), IteratorSource::new(0..10u64))
        .unwrap();
    assert_eq!(env.last_stage().unwrap().map_tasks, 1);
    let records = env.collect(output).unwrap();
    let sums = records
        .into_iter()
        .filter(|(k, _)| k != "cleanup")
        .collect::<HashMap<_, _>>();
    assert_eq!(sums["key-0"], 20);
    assert_eq!(sums["key-1"], 25);
}
