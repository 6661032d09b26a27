use thiserror::Error;

use crate::triangles::Vertex;
use crate::worker::Coord;

/// Every failure that can abort a pipeline run.
///
/// None of them is recovered from: the first error of a stage is returned to the caller and the
/// following stages are never started.
#[derive(Debug, Error)]
pub enum Error {
    /// An input record could not be parsed into two integers.
    #[error("invalid edge line {line:?}: {reason}")]
    InputFormat { line: String, reason: String },

    /// A stage observed data that the previous stage must never produce.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    /// The neighbor set of a vertex could not be held by its reducing unit.
    #[error("neighbor set of vertex {vertex} exhausted the available resources at degree {degree}")]
    ResourceExhaustion { vertex: Vertex, degree: usize },

    /// The edge `from -> to` has no matching `to -> from` record in the input.
    #[error("edge ({from}, {to}) is not reciprocal in the input")]
    NonReciprocal { from: Vertex, to: Vertex },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot write spilled partition: {0}")]
    SpillEncode(#[from] bincode::error::EncodeError),

    #[error("cannot read spilled partition: {0}")]
    SpillDecode(#[from] bincode::error::DecodeError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// A reducing unit hung up before the shuffle was complete.
    #[error("shuffle channel to unit {0} closed")]
    Shuffle(usize),

    #[error("worker {0} panicked")]
    WorkerPanicked(Coord),

    /// The unit stopped because another task of the same stage failed.
    #[error("stage aborted")]
    Aborted,
}

impl Error {
    pub(crate) fn input_format(line: &str, reason: impl ToString) -> Self {
        Error::InputFormat {
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Io(e.into())
    }
}
