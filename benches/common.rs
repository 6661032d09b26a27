#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use triad::config::Grouping;
use triad::triangles::Vertex;
use triad::EnvironmentConfig;

pub fn max_cpu_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub fn local_config(parallelism: usize, grouping: Grouping) -> EnvironmentConfig {
    let mut config = EnvironmentConfig::local(parallelism);
    config.shuffle.grouping = grouping;
    config
}

/// Edges of a random graph with `n` vertices where every edge exists with probability `p`.
pub fn random_edges(n: Vertex, p: f64, seed: u64) -> Vec<(Vertex, Vertex)> {
    let rng = &mut SmallRng::seed_from_u64(seed);
    let mut edges = Vec::new();
    for u in 0..n {
        for v in u + 1..n {
            if rng.random_bool(p) {
                edges.push((u, v));
            }
        }
    }
    edges
}

/// Edges of a graph with a single vertex connected to all the others, plus a ring among them.
pub fn hub_edges(n: Vertex) -> Vec<(Vertex, Vertex)> {
    let mut edges = (1..n).map(|v| (0, v)).collect::<Vec<_>>();
    edges.extend((1..n).map(|v| (v, v % (n - 1) + 1)));
    edges
}

/// Input lines with both the directions of every edge.
pub fn edge_lines(edges: &[(Vertex, Vertex)]) -> Vec<String> {
    edges
        .iter()
        .flat_map(|&(u, v)| [format!("{u} {v}"), format!("{v} {u}")])
        .collect()
}

pub fn write_edges(path: &Path, edges: &[(Vertex, Vertex)]) -> std::io::Result<u64> {
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
    for line in edge_lines(edges) {
        writeln!(file, "{line}")?;
    }
    file.flush()?;
    Ok(path.metadata()?.len())
}
