use std::path::PathBuf;

use crate::config::EnvironmentConfig;
use crate::error::Error;
use crate::operator::cache::Dataset;
use crate::operator::source::Source;
use crate::operator::{ExchangeData, Mapper, Reducer, Stage};
use crate::profiler::{PipelineReport, StageMetrics};
use crate::scheduler;

/// Runs stages one after the other, keeping track of what they did.
///
/// Every call to [`run_stage`](BatchEnvironment::run_stage) or [`chain`](BatchEnvironment::chain)
/// blocks until the stage is complete: the dataset it returns holds the whole output of the stage.
#[derive(Debug)]
pub struct BatchEnvironment {
    config: EnvironmentConfig,
    report: PipelineReport,
    stage_count: usize,
}

impl BatchEnvironment {
    pub fn new(config: EnvironmentConfig) -> Self {
        info!("Constructing environment");
        Self {
            config,
            report: PipelineReport::default(),
            stage_count: 0,
        }
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Execute `stage` reading from `source`.
    pub fn run_stage<S, M, F, R>(
        &mut self,
        stage: &Stage<M, F>,
        source: S,
    ) -> Result<Dataset<(R::OutKey, R::OutValue)>, Error>
    where
        S: Source<M::In>,
        M: Mapper,
        F: Fn() -> R + Send + Sync,
        R: Reducer<Key = M::Key, Value = M::Value>,
    {
        self.config.validate()?;
        let index = self.stage_count;
        self.stage_count += 1;
        let span = tracing::info_span!("stage", index, name = stage.name());
        let _enter = span.enter();

        let (dataset, metrics) = scheduler::run_stage(&self.config, index, stage, source)?;
        self.report.stages.push(metrics);
        Ok(dataset)
    }

    /// Execute `stage` reading the output of a previous stage.
    ///
    /// Once the stage is over the spilled files of `input` are deleted, unless the spill is
    /// configured to keep them. An error of the stage is returned before an error deleting them.
    pub fn chain<M, F, R>(
        &mut self,
        stage: &Stage<M, F>,
        input: Dataset<M::In>,
    ) -> Result<Dataset<(R::OutKey, R::OutValue)>, Error>
    where
        M: Mapper,
        M::In: ExchangeData,
        F: Fn() -> R + Send + Sync,
        R: Reducer<Key = M::Key, Value = M::Value>,
    {
        let input_dir = input.spill_dir().map(PathBuf::from);
        let result = self.run_stage(stage, input);
        let released = self.release(input_dir);
        let output = result?;
        released?;
        Ok(output)
    }

    /// Read the whole output of a stage, deleting its spilled files unless configured to keep
    /// them.
    pub fn collect<T: ExchangeData>(&self, dataset: Dataset<T>) -> Result<Vec<T>, Error> {
        let dir = dataset.spill_dir().map(PathBuf::from);
        let result = dataset.collect_vec();
        let released = self.release(dir);
        let records = result?;
        released?;
        Ok(records)
    }

    fn release(&self, dir: Option<PathBuf>) -> Result<(), Error> {
        let keep = self.config.spill.as_ref().is_some_and(|s| s.keep);
        match dir {
            Some(dir) if !keep => {
                debug!("removing consumed stage output {}", dir.display());
                std::fs::remove_dir_all(&dir)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Counters of the stages executed so far.
    pub fn report(&self) -> &PipelineReport {
        &self.report
    }

    /// Metrics of the last executed stage.
    pub fn last_stage(&self) -> Option<&StageMetrics> {
        self.report.stages.last()
    }

    /// Close the environment, writing the report if a path is configured.
    pub fn finish(self) -> Result<PipelineReport, Error> {
        info!(
            "executed {} stages in {:?}",
            self.stage_count,
            self.report.elapsed()
        );
        if let Some(path) = &self.config.report_path {
            self.report.write_json(path)?;
        }
        Ok(self.report)
    }
}
