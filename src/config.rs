use crate::error::{AnalysisError, Result};
use crate::models::{generate_rings, MetricSet, Ring};
use crate::utils::constants::{DEFAULT_COMPRESSION, DEFAULT_THREAD_COUNT, ENV_PREFIX};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Settings of one analysis run
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalysisConfig {
    /// Directory holding one reference grid file per calendar month
    pub reference_path: PathBuf,

    /// Directory the per-station result tables are written to
    pub result_path: PathBuf,

    /// Station description file
    pub station_description: PathBuf,

    /// Observation files, one per station
    #[validate(length(min = 1))]
    pub station_files: Vec<PathBuf>,

    /// Maximum length of one time window in days
    #[validate(range(min = 1))]
    pub max_days: u32,

    #[serde(default = "default_thread_count")]
    #[validate(range(min = 1))]
    pub thread_count: usize,

    #[validate(range(min = 0.0))]
    pub radius_start: f64,

    pub radius_end: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub radius_step: f64,

    /// Metric names, compiled by [`AnalysisConfig::metric_set`]
    #[validate(length(min = 1))]
    pub metrics: Vec<String>,

    #[serde(default = "default_compression")]
    pub compression: String,
}

fn default_thread_count() -> usize {
    DEFAULT_THREAD_COUNT
}

fn default_compression() -> String {
    DEFAULT_COMPRESSION.to_string()
}

impl AnalysisConfig {
    /// Load from a YAML/TOML/JSON file with `RING_*` environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        Self::from_settings(settings)
    }

    pub fn from_settings(settings: ::config::Config) -> Result<Self> {
        let config: AnalysisConfig = settings.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Field validation, metric compilation and the cross-field radius checks
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AnalysisError::Config(e.to_string()))?;
        self.metric_set()?;
        self.rings()?;
        Ok(())
    }

    pub fn rings(&self) -> Result<Vec<Ring>> {
        generate_rings(self.radius_start, self.radius_end, self.radius_step)
    }

    pub fn metric_set(&self) -> Result<MetricSet> {
        MetricSet::compile(&self.metrics)
    }

    pub fn max_window_seconds(&self) -> i64 {
        i64::from(self.max_days) * 86_400
    }
}
