#![allow(dead_code)] // not all tests use all the members

use std::str::FromStr;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use log::*;
use tempfile::TempDir;

use triad::config::{ExecutionRuntime, Grouping, LocalRuntimeConfig, SpillConfig};
use triad::triangles::Vertex;
use triad::EnvironmentConfig;

/// Helper functions for running the integration tests.
pub struct TestHelper;

impl TestHelper {
    fn setup() {
        let _ = env_logger::Builder::new()
            .filter(None, log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    }

    /// Run the test body with the specified config, failing if it takes too long.
    pub fn env_with_config(
        config: EnvironmentConfig,
        body: Arc<dyn Fn(EnvironmentConfig) + Send + Sync>,
    ) {
        let timeout_sec = Self::parse_int_from_env("TRIAD_TEST_TIMEOUT").unwrap_or(10);
        let timeout = Duration::from_secs(timeout_sec);
        let (sender, receiver) = std::sync::mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("Worker".into())
            .spawn(move || {
                body(config);
                sender.send(()).unwrap();
            })
            .unwrap();
        match receiver.recv_timeout(timeout) {
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => {
                panic!(
                    "Worker thread didn't complete before the timeout of {:?}",
                    timeout
                );
            }
            Err(RecvTimeoutError::Disconnected) => {
                panic!("Worker thread has panicked!");
            }
        }
        worker.join().expect("Worker thread has panicked!");
    }

    /// A local configuration with `num_cores` threads and three reducing units more than the
    /// cores, so that the units are not aligned with the map tasks.
    pub fn local_config(num_cores: usize, grouping: Grouping) -> EnvironmentConfig {
        let mut config = EnvironmentConfig::local(num_cores);
        config.runtime = ExecutionRuntime::Local(LocalRuntimeConfig {
            num_cores,
            reducers: Some(num_cores + 3),
        });
        config.shuffle.grouping = grouping;
        // small batches make the shuffle actually interleave
        config.shuffle.batch_size = 7;
        config.shuffle.channel_capacity = 2;
        config
    }

    /// Run the test body under a local environment, for every configured number of cores, with
    /// both grouping strategies, in memory and spilling to disk.
    pub fn local_env(body: Arc<dyn Fn(EnvironmentConfig) + Send + Sync>) {
        Self::setup();
        for num_cores in Self::local_cores() {
            for grouping in [Grouping::SortMerge, Grouping::Hash] {
                let config = Self::local_config(num_cores, grouping);
                debug!("Running test with env: {:?}", config);
                Self::env_with_config(config.clone(), body.clone());

                let dir = TempDir::new().unwrap();
                let config = EnvironmentConfig {
                    spill: Some(SpillConfig {
                        batch_size: 5,
                        ..SpillConfig::new(dir.path())
                    }),
                    ..config
                };
                debug!("Running test with env: {:?}", config);
                Self::env_with_config(config, body.clone());
                let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
                assert_eq!(leftovers, 0, "spill directory not cleaned up");
            }
        }
    }

    /// The core counts to test, from `TRIAD_TEST_LOCAL_CORES` as a comma separated list.
    fn local_cores() -> Vec<usize> {
        match std::env::var("TRIAD_TEST_LOCAL_CORES") {
            Ok(list) => list
                .split(',')
                .map(|n| n.trim().parse().expect("invalid TRIAD_TEST_LOCAL_CORES"))
                .collect(),
            Err(_) => vec![1, 4],
        }
    }

    pub fn parse_int_from_env<N: FromStr>(key: &str) -> Option<N> {
        let content = std::env::var(key).ok()?;
        let err = format!("{key} is not an integer");
        Some(content.parse().map_err(|_| err).unwrap())
    }
}

/// Both directions of every edge, as input lines.
pub fn reciprocal(edges: &[(Vertex, Vertex)]) -> Vec<String> {
    edges
        .iter()
        .flat_map(|&(u, v)| [format!("{u} {v}"), format!("{v} {u}")])
        .collect()
}

/// `n` choose 3.
pub fn choose3(n: u64) -> u64 {
    if n < 3 {
        0
    } else {
        n * (n - 1) * (n - 2) / 6
    }
}
