use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifier of a vertex of the graph.
pub type Vertex = i64;

/// A canonical pair of vertices, `lo < hi` for every pair built by the pipeline.
///
/// It's the grouping key of the `triangles` stage. As text it is `lo,hi`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct PairKey {
    pub lo: Vertex,
    pub hi: Vertex,
}

impl PairKey {
    pub fn new(lo: Vertex, hi: Vertex) -> Self {
        Self { lo, hi }
    }
}

impl Display for PairKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.lo, self.hi)
    }
}

impl FromStr for PairKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lo, hi) = s
            .split_once(',')
            .ok_or_else(|| Error::input_format(s, "missing ',' in pair"))?;
        let lo = lo.trim().parse().map_err(|e| Error::input_format(s, e))?;
        let hi = hi.trim().parse().map_err(|e| Error::input_format(s, e))?;
        Ok(Self { lo, hi })
    }
}

/// Marks a record of the `triangles` stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// The pair is an edge of the graph.
    Original,
    /// The pair would close a triad of the vertex that emitted it.
    Candidate,
}

impl Tag {
    /// How much a record contributes to the candidates of its key.
    #[inline]
    pub fn weight(self) -> u64 {
        match self {
            Tag::Original => 0,
            Tag::Candidate => 1,
        }
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.weight())
    }
}

/// Parse a line of the input in the form `<u> <v>`.
///
/// Blank lines are not edges and return `None`. Tokens after the second are ignored.
pub fn parse_edge(line: &str) -> Result<Option<(Vertex, Vertex)>, Error> {
    let mut tokens = line.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(None);
    };
    let second = tokens
        .next()
        .ok_or_else(|| Error::input_format(line, "missing second vertex"))?;
    let u = first
        .parse()
        .map_err(|e| Error::input_format(line, format!("{first:?}: {e}")))?;
    let v = second
        .parse()
        .map_err(|e| Error::input_format(line, format!("{second:?}: {e}")))?;
    Ok(Some((u, v)))
}
