//! The building blocks of a stage.
//!
//! A stage is made of a [`Mapper`], applied to every input item, and of a [`Reducer`], applied to
//! every group of values sharing the same key. Both of them produce records through an [`Emit`]
//! collaborator provided by the runner.

use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::block::Replication;
use crate::error::Error;

pub mod cache;
pub mod sink;
pub mod source;

/// Marker trait that all the types inside a stage should implement.
pub trait Data: Clone + Send + 'static {}
impl<T: Clone + Send + 'static> Data for T {}

/// Marker trait for data types that are moved between tasks and possibly written to disk.
pub trait ExchangeData: Data + Serialize + DeserializeOwned {}
impl<T: Data + Serialize + DeserializeOwned> ExchangeData for T {}

/// Marker trait for the keys used for grouping.
pub trait DataKey: ExchangeData + Hash + Eq + Ord + Debug {}
impl<T: ExchangeData + Hash + Eq + Ord + Debug> DataKey for T {}

/// Receives the records produced by a mapper or by a reducer.
pub trait Emit<K, V> {
    fn emit(&mut self, key: K, value: V) -> Result<(), Error>;
}

impl<K, V> Emit<K, V> for Vec<(K, V)> {
    fn emit(&mut self, key: K, value: V) -> Result<(), Error> {
        self.push((key, value));
        Ok(())
    }
}

/// Turns every input item into zero or more keyed records.
///
/// The same mapper is shared by all the map tasks of a stage, hence it cannot hold mutable state.
pub trait Mapper: Send + Sync {
    type In: Send;
    type Key: DataKey;
    type Value: ExchangeData;

    fn map<E>(&self, item: Self::In, out: &mut E) -> Result<(), Error>
    where
        E: Emit<Self::Key, Self::Value>;
}

/// Processes the groups of a reducing unit.
///
/// A new reducer is built for every unit. `reduce` is called exactly once per key received by the
/// unit, with all the values of that key, and `cleanup` once after the last key. The order of the
/// values inside a group is not specified.
pub trait Reducer: Send {
    type Key: DataKey;
    type Value: ExchangeData;
    type OutKey: DataKey;
    type OutValue: ExchangeData;

    fn reduce<I, E>(&mut self, key: Self::Key, values: I, out: &mut E) -> Result<(), Error>
    where
        I: Iterator<Item = Self::Value>,
        E: Emit<Self::OutKey, Self::OutValue>;

    fn cleanup<E>(&mut self, _out: &mut E) -> Result<(), Error>
    where
        E: Emit<Self::OutKey, Self::OutValue>,
    {
        Ok(())
    }
}

/// A single map/group/reduce round.
///
/// `make_reducer` is called once for every reducing unit.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Stage<M, F> {
    pub(crate) name: String,
    #[derivative(Debug = "ignore")]
    pub(crate) mapper: M,
    #[derivative(Debug = "ignore")]
    pub(crate) make_reducer: F,
    pub(crate) replication: Replication,
}

impl<M, F, R> Stage<M, F>
where
    M: Mapper,
    F: Fn() -> R + Send + Sync,
    R: Reducer<Key = M::Key, Value = M::Value>,
{
    pub fn new<S: Into<String>>(name: S, mapper: M, make_reducer: F) -> Self {
        Self {
            name: name.into(),
            mapper,
            make_reducer,
            replication: Replication::Unlimited,
        }
    }

    /// Limit the number of reducing units of this stage.
    pub fn replication(mut self, replication: Replication) -> Self {
        self.replication = replication;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Mapper that forwards records that are already keyed.
#[derive(Derivative)]
#[derivative(
    Debug(bound = ""),
    Clone(bound = ""),
    Copy(bound = ""),
    Default(bound = "")
)]
pub struct IdentityMapper<K, V> {
    #[derivative(Debug = "ignore")]
    _k: PhantomData<fn() -> (K, V)>,
}

impl<K, V> IdentityMapper<K, V> {
    pub fn new() -> Self {
        Self { _k: PhantomData }
    }
}

impl<K: DataKey, V: ExchangeData> Mapper for IdentityMapper<K, V> {
    type In = (K, V);
    type Key = K;
    type Value = V;

    fn map<E>(&self, (key, value): (K, V), out: &mut E) -> Result<(), Error>
    where
        E: Emit<K, V>,
    {
        out.emit(key, value)
    }
}
