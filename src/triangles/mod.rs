//! Triangle counting as three chained stages.
//!
//! A triangle `{a < b < c}` is found exactly once: while processing the forward neighbors of `a`
//! the pair `(b, c)` is proposed as a candidate, and the `triangles` stage confirms it because
//! `(b, c)` is also an edge.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::block::Replication;
use crate::config::{EnvironmentConfig, TriangleConfig};
use crate::environment::BatchEnvironment;
use crate::error::Error;
use crate::operator::source::Source;
use crate::operator::{IdentityMapper, Stage};

pub use self::aggregate::AggregateReducer;
pub use self::classify::{closed_triads, ClassifyReducer};
pub use self::record::{parse_edge, PairKey, Tag, Vertex};
pub use self::triads::{CanonicalizeMapper, Endpoint, TriadReducer};

mod aggregate;
mod classify;
mod record;
mod triads;

/// Key of the partial counts and of the final record.
pub const SENTINEL: u64 = 0;

/// The output of the pipeline: a single record `SENTINEL<TAB>total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriangleCount {
    pub key: u64,
    pub total: u64,
}

impl TriangleCount {
    pub fn new(total: u64) -> Self {
        Self {
            key: SENTINEL,
            total,
        }
    }
}

impl Display for TriangleCount {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.key, self.total)
    }
}

/// The three stages that count the triangles of a graph given as reciprocal edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrianglePipeline {
    config: TriangleConfig,
}

impl TrianglePipeline {
    pub fn new(config: TriangleConfig) -> Self {
        Self { config }
    }

    /// Canonical edges grouped by their lower endpoint, emitting edges and candidate pairs.
    pub fn triads(&self) -> Stage<CanonicalizeMapper, impl Fn() -> TriadReducer + Send + Sync> {
        let config = self.config;
        Stage::new("triads", CanonicalizeMapper::new(&config), move || {
            TriadReducer::new(&config)
        })
    }

    /// Pairs grouped together, one partial count per reducing unit.
    pub fn triangles(
        &self,
    ) -> Stage<IdentityMapper<PairKey, Tag>, impl Fn() -> ClassifyReducer + Send + Sync> {
        Stage::new("triangles", IdentityMapper::new(), ClassifyReducer::new)
    }

    /// All the partial counts in a single unit.
    pub fn count(
        &self,
    ) -> Stage<IdentityMapper<u64, u64>, impl Fn() -> AggregateReducer + Send + Sync> {
        Stage::new("count", IdentityMapper::new(), || AggregateReducer)
            .replication(Replication::One)
    }

    /// Run the stages one after the other, each one reading the complete output of the previous
    /// one.
    pub fn run<S>(&self, env: &mut BatchEnvironment, source: S) -> Result<TriangleCount, Error>
    where
        S: Source<String>,
    {
        let triads = env.run_stage(&self.triads(), source)?;
        let partials = env.chain(&self.triangles(), triads)?;
        let totals = env.chain(&self.count(), partials)?;

        let count = match env.collect(totals)?.as_slice() {
            // no unit found a triangle
            [] => TriangleCount::new(0),
            [(SENTINEL, total)] => TriangleCount::new(*total),
            records => {
                return Err(Error::InternalConsistency(format!(
                    "expected a single total, got {records:?}"
                )))
            }
        };
        info!("counted {} triangles", count.total);
        Ok(count)
    }
}

/// Count the triangles of the edges read from `source` in a new environment.
pub fn count_triangles<S>(config: EnvironmentConfig, source: S) -> Result<TriangleCount, Error>
where
    S: Source<String>,
{
    let pipeline = TrianglePipeline::new(config.triangles);
    let mut env = BatchEnvironment::new(config);
    let count = pipeline.run(&mut env, source)?;
    env.finish()?;
    Ok(count)
}
