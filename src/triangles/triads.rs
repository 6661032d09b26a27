//! First stage: canonical edges grouped by their lower endpoint, and the triads of every vertex.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::TriangleConfig;
use crate::error::Error;
use crate::operator::{Emit, Mapper, Reducer};

use super::record::{parse_edge, PairKey, Tag, Vertex};

/// The other endpoint of an edge, as seen from the vertex used as key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endpoint {
    /// Canonical edge `(key, v)` with `key < v`.
    Forward(Vertex),
    /// Input record `(v, key)` with `v > key`, only used to check that the input is reciprocal.
    Backward(Vertex),
}

/// Parses the input lines and keys every canonical edge by its lower endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalizeMapper {
    check_reciprocal: bool,
}

impl CanonicalizeMapper {
    pub fn new(config: &TriangleConfig) -> Self {
        Self {
            check_reciprocal: config.check_reciprocal,
        }
    }
}

impl Mapper for CanonicalizeMapper {
    type In = String;
    type Key = Vertex;
    type Value = Endpoint;

    fn map<E>(&self, line: String, out: &mut E) -> Result<(), Error>
    where
        E: Emit<Vertex, Endpoint>,
    {
        let Some((e1, e2)) = parse_edge(&line)? else {
            return Ok(());
        };
        match e1.cmp(&e2) {
            Ordering::Less => out.emit(e1, Endpoint::Forward(e2)),
            Ordering::Greater if self.check_reciprocal => out.emit(e2, Endpoint::Backward(e1)),
            // the reciprocal record produces the canonical form, self-loops are dropped
            _ => Ok(()),
        }
    }
}

/// Builds the forward neighbor set of every vertex, then emits its edges and all the pairs of
/// its neighbors.
///
/// Work and output are quadratic in the degree of the vertex.
#[derive(Debug, Clone, Default)]
pub struct TriadReducer {
    check_reciprocal: bool,
    max_degree: Option<usize>,
    /// Forward neighbors of the current vertex, reused across groups.
    neighbors: Vec<Vertex>,
    /// Vertices that declared an edge towards the current vertex.
    mirrored: Vec<Vertex>,
}

impl TriadReducer {
    pub fn new(config: &TriangleConfig) -> Self {
        Self {
            check_reciprocal: config.check_reciprocal,
            max_degree: config.max_degree,
            ..Default::default()
        }
    }

    /// Buffer a neighbor of `vertex`, failing when it would exceed the degree limit or the
    /// memory cannot be reserved.
    fn push_bounded(
        buffer: &mut Vec<Vertex>,
        max_degree: Option<usize>,
        vertex: Vertex,
        neighbor: Vertex,
    ) -> Result<(), Error> {
        let degree = buffer.len() + 1;
        let exhausted = Error::ResourceExhaustion { vertex, degree };
        if max_degree.is_some_and(|max| degree > max) {
            return Err(exhausted);
        }
        if buffer.try_reserve(1).is_err() {
            return Err(exhausted);
        }
        buffer.push(neighbor);
        Ok(())
    }

    /// Check that the forward edges of `vertex` are also present in the other direction.
    ///
    /// Both buffers must be sorted.
    fn check_reciprocal(&self, vertex: Vertex) -> Result<(), Error> {
        let mut forward = self.neighbors.iter().peekable();
        let mut backward = self.mirrored.iter().peekable();
        loop {
            match (forward.peek(), backward.peek()) {
                (None, None) => return Ok(()),
                (Some(&&f), Some(&&b)) if f == b => {
                    forward.next();
                    backward.next();
                }
                (Some(&&f), Some(&&b)) if f < b => {
                    return Err(Error::NonReciprocal {
                        from: vertex,
                        to: f,
                    })
                }
                (Some(&&f), None) => {
                    return Err(Error::NonReciprocal {
                        from: vertex,
                        to: f,
                    })
                }
                (_, Some(&&b)) => {
                    return Err(Error::NonReciprocal {
                        from: b,
                        to: vertex,
                    })
                }
            }
        }
    }
}

impl Reducer for TriadReducer {
    type Key = Vertex;
    type Value = Endpoint;
    type OutKey = PairKey;
    type OutValue = Tag;

    fn reduce<I, E>(&mut self, vertex: Vertex, values: I, out: &mut E) -> Result<(), Error>
    where
        I: Iterator<Item = Endpoint>,
        E: Emit<PairKey, Tag>,
    {
        self.neighbors.clear();
        self.mirrored.clear();
        for endpoint in values {
            match endpoint {
                Endpoint::Forward(neighbor) => {
                    Self::push_bounded(&mut self.neighbors, self.max_degree, vertex, neighbor)?;
                    out.emit(PairKey::new(vertex, neighbor), Tag::Original)?;
                }
                Endpoint::Backward(neighbor) => {
                    Self::push_bounded(&mut self.mirrored, self.max_degree, vertex, neighbor)?;
                }
            }
        }

        self.neighbors.sort_unstable();
        if self.check_reciprocal {
            self.mirrored.sort_unstable();
            self.check_reciprocal(vertex)?;
        }

        for (i, &a) in self.neighbors.iter().enumerate() {
            for &b in &self.neighbors[i + 1..] {
                out.emit(PairKey::new(a, b), Tag::Candidate)?;
            }
        }
        Ok(())
    }
}
