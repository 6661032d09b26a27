//! Counters collected while the stages run.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Counters of a map task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MapMetrics {
    /// Items read from the source partition.
    pub records_in: usize,
    /// Records emitted towards the reducing units.
    pub emitted: usize,
}

/// Counters of a reducing unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UnitMetrics {
    pub records_in: usize,
    pub groups: usize,
    pub records_out: usize,
}

/// What happened during the execution of a stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub stage: String,
    /// Position of the stage in the pipeline, starting from 0.
    pub index: usize,
    pub map_tasks: usize,
    pub reduce_units: usize,
    /// Items read by the map tasks.
    pub records_in: usize,
    /// Records moved from the map tasks to the reducing units.
    pub records_shuffled: usize,
    /// Number of distinct keys.
    pub groups: usize,
    /// Records emitted by the reducing units.
    pub records_out: usize,
    pub elapsed: Duration,
}

impl StageMetrics {
    pub(crate) fn new(stage: &str, index: usize) -> Self {
        Self {
            stage: stage.to_string(),
            index,
            ..Default::default()
        }
    }

    pub(crate) fn add_map(&mut self, metrics: MapMetrics) {
        self.map_tasks += 1;
        self.records_in += metrics.records_in;
        self.records_shuffled += metrics.emitted;
    }

    pub(crate) fn add_unit(&mut self, metrics: UnitMetrics) {
        self.reduce_units += 1;
        self.groups += metrics.groups;
        self.records_out += metrics.records_out;
    }
}

/// The metrics of all the stages executed by an environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub stages: Vec<StageMetrics>,
}

impl PipelineReport {
    pub fn elapsed(&self) -> Duration {
        self.stages.iter().map(|s| s.elapsed).sum()
    }

    pub fn stage(&self, name: &str) -> Option<&StageMetrics> {
        self.stages.iter().find(|s| s.stage == name)
    }

    /// Write the report as pretty printed JSON.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        info!("report written to {}", path.display());
        Ok(())
    }
}
