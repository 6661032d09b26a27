//! Count the triangles of an undirected graph with a chain of map/group/reduce stages.
//!
//! The graph is read as a list of edges, one `<u> <v>` pair per line, where every edge is present
//! in both directions. Three stages run one after the other:
//!
//! 1. `triads`: edges are canonicalized as `(lo, hi)`, grouped by `lo`, and for every vertex its
//!    edges and all the pairs of its forward neighbors are emitted;
//! 2. `triangles`: pairs are grouped and a pair that is also an edge closes one triangle for each
//!    candidate record;
//! 3. `count`: the partial counts are summed into the total.
//!
//! ```
//! use triad::prelude::*;
//!
//! let edges = vec!["1 2", "2 1", "2 3", "3 2", "1 3", "3 1"];
//! let lines = edges.into_iter().map(String::from).collect::<Vec<_>>();
//! let count = count_triangles(EnvironmentConfig::local(2), lines).unwrap();
//! assert_eq!(count.total, 1);
//! assert_eq!(count.to_string(), "0\t1");
//! ```
#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub use config::EnvironmentConfig;
pub use environment::BatchEnvironment;
pub use error::Error;

pub mod block;
pub(crate) mod channel;
pub mod config;
pub mod environment;
pub mod error;
pub mod operator;
pub mod profiler;
pub(crate) mod scheduler;
pub mod triangles;
pub mod worker;

pub mod prelude {
    pub use crate::block::Replication;
    pub use crate::config::{EnvironmentConfig, Grouping, SpillConfig, TriangleConfig};
    pub use crate::environment::BatchEnvironment;
    pub use crate::error::Error;
    pub use crate::operator::cache::Dataset;
    pub use crate::operator::sink::write_count;
    pub use crate::operator::source::{FileSource, IteratorSource, Source};
    pub use crate::operator::{Emit, IdentityMapper, Mapper, Reducer, Stage};
    pub use crate::triangles::{count_triangles, TriangleCount, TrianglePipeline};
}
