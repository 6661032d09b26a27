use std::path::{Path, PathBuf};

#[cfg(feature = "clap")]
use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Environment variable that, when set, contains the whole configuration in TOML format.
pub const CONFIG_ENV_VAR: &str = "TRIAD_CONFIG";

/// The configuration of the environment the stages are executed in.
///
/// It can be built for a local run with [`EnvironmentConfig::local`], read from a TOML file with
/// [`EnvironmentConfig::from_file`], from [`CONFIG_ENV_VAR`] with [`EnvironmentConfig::from_env`]
/// or from the command line arguments with `EnvironmentConfig::from_args`.
///
/// ```toml
/// report_path = "report.json"
///
/// [runtime.local]
/// num_cores = 8
/// reducers = 16
///
/// [shuffle]
/// batch_size = 1024
/// grouping = "hash"
///
/// [spill]
/// path = "/tmp/triad"
///
/// [triangles]
/// check_reciprocal = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Which runtime to use for the execution.
    pub runtime: ExecutionRuntime,
    /// How the emitted records are moved from the map tasks to the reducing units.
    pub shuffle: ShuffleConfig,
    /// Where the output of every stage is materialized. `None` keeps it in memory.
    pub spill: Option<SpillConfig>,
    /// Where to write the JSON report with the counters of every stage.
    pub report_path: Option<PathBuf>,
    /// Options of the triangle counting pipeline.
    pub triangles: TriangleConfig,
}

/// Which kind of environment to use for the execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionRuntime {
    /// Use only local threads.
    Local(LocalRuntimeConfig),
}

/// Configuration of the local runtime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalRuntimeConfig {
    /// The maximum number of map tasks running at the same time.
    pub num_cores: usize,
    /// Number of reducing units of every stage. Defaults to `num_cores`.
    #[serde(default)]
    pub reducers: Option<usize>,
}

/// Strategy used by a reducing unit to bring together the values of the same key.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Stable sort of the received records by key, then each run of equal keys is a group.
    #[default]
    SortMerge,
    /// Values are appended to a per-key vector inside an hash map.
    Hash,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShuffleConfig {
    /// Number of records sent together to a reducing unit.
    pub batch_size: usize,
    /// Number of batches that can be in flight towards a single reducing unit.
    pub channel_capacity: usize,
    pub grouping: Grouping,
}

/// Materialize the stage outputs on disk instead of keeping them in memory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpillConfig {
    /// Directory that will contain one subdirectory per stage.
    pub path: PathBuf,
    /// Number of records encoded together.
    #[serde(default = "default_spill_batch")]
    pub batch_size: usize,
    /// Keep the files of a stage after the following stage consumed them.
    #[serde(default)]
    pub keep: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TriangleConfig {
    /// Fail the run if an edge is not present in both directions.
    pub check_reciprocal: bool,
    /// Upper bound to the number of forward neighbors of a single vertex.
    pub max_degree: Option<usize>,
}

fn default_spill_batch() -> usize {
    4096
}

impl Default for ExecutionRuntime {
    fn default() -> Self {
        let num_cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        ExecutionRuntime::Local(LocalRuntimeConfig {
            num_cores,
            reducers: None,
        })
    }
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            batch_size: 1024,
            channel_capacity: 64,
            grouping: Grouping::SortMerge,
        }
    }
}

impl SpillConfig {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            batch_size: default_spill_batch(),
            keep: false,
        }
    }
}

impl Default for TriangleConfig {
    fn default() -> Self {
        Self {
            check_reciprocal: true,
            max_degree: None,
        }
    }
}

#[cfg(feature = "clap")]
#[derive(Debug, Parser)]
#[command(name = "triad", about = "Count the triangles of an undirected graph")]
pub struct CommandLineOptions {
    /// Number of local worker threads per stage.
    #[arg(short, long)]
    local: Option<usize>,

    /// Number of reducing units per stage.
    #[arg(short, long)]
    reducers: Option<usize>,

    /// Path of a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory where the intermediate stage outputs are spilled.
    #[arg(long)]
    spill: Option<PathBuf>,

    /// The rest of the arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

impl EnvironmentConfig {
    /// Local environment that avoids using the network and runs concurrently using only threads.
    pub fn local(num_cores: usize) -> EnvironmentConfig {
        EnvironmentConfig {
            runtime: ExecutionRuntime::Local(LocalRuntimeConfig {
                num_cores,
                reducers: None,
            }),
            ..Default::default()
        }
    }

    /// Read the configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<EnvironmentConfig, Error> {
        let path = path.as_ref();
        info!("reading config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Read the configuration from the [`CONFIG_ENV_VAR`] environment variable, if set.
    pub fn from_env() -> Result<Option<EnvironmentConfig>, Error> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(content) => Self::from_toml(&content).map(Some),
            Err(std::env::VarError::NotPresent) => Ok(None),
            Err(e) => Err(Error::Config(format!("{CONFIG_ENV_VAR}: {e}"))),
        }
    }

    pub fn from_toml(content: &str) -> Result<EnvironmentConfig, Error> {
        let config: EnvironmentConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Build the configuration from the command line arguments.
    ///
    /// The arguments that are not consumed are returned, so that the caller can use them.
    #[cfg(feature = "clap")]
    pub fn from_args() -> Result<(EnvironmentConfig, Vec<String>), Error> {
        let opt = CommandLineOptions::parse();
        let mut config = match (&opt.config, Self::from_env()?) {
            (Some(path), _) => Self::from_file(path)?,
            (None, Some(config)) => config,
            (None, None) => Self::default(),
        };
        let ExecutionRuntime::Local(local) = &mut config.runtime;
        if let Some(num_cores) = opt.local {
            local.num_cores = num_cores;
        }
        if let Some(reducers) = opt.reducers {
            local.reducers = Some(reducers);
        }
        if let Some(path) = opt.spill {
            config.spill = Some(SpillConfig::new(path));
        }
        config.validate()?;
        Ok((config, opt.args))
    }

    /// Check that the values are usable.
    pub fn validate(&self) -> Result<(), Error> {
        let ExecutionRuntime::Local(local) = &self.runtime;
        if local.num_cores == 0 {
            return Err(Error::Config("num_cores must be positive".into()));
        }
        if local.reducers == Some(0) {
            return Err(Error::Config("reducers must be positive".into()));
        }
        if self.shuffle.batch_size == 0 || self.shuffle.channel_capacity == 0 {
            return Err(Error::Config(
                "shuffle batch_size and channel_capacity must be positive".into(),
            ));
        }
        if matches!(&self.spill, Some(spill) if spill.batch_size == 0) {
            return Err(Error::Config("spill batch_size must be positive".into()));
        }
        Ok(())
    }

    /// Number of map tasks a source is split into.
    pub fn parallelism(&self) -> usize {
        match self.runtime {
            ExecutionRuntime::Local(local) => local.num_cores,
        }
    }

    /// Number of reducing units of a stage without replication limits.
    pub fn reducers(&self) -> usize {
        self.reducers_override().unwrap_or_else(|| self.parallelism())
    }

    fn reducers_override(&self) -> Option<usize> {
        match self.runtime {
            ExecutionRuntime::Local(local) => local.reducers,
        }
    }
}
