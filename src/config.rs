//! Runtime configuration, read from `LOOKUP_*` environment variables.

use anyhow::{Context, bail};
use std::path::PathBuf;

use crate::search::engine::DEFAULT_MAX_PHONE_SUBJECTS;

pub const ENV_DATA_DIR: &str = "LOOKUP_DATA_DIR";
pub const ENV_REFERENCE_FILE: &str = "LOOKUP_REFERENCE_FILE";
pub const ENV_POOL_SIZE: &str = "LOOKUP_POOL_SIZE";
pub const ENV_MAX_PHONE_SUBJECTS: &str = "LOOKUP_MAX_PHONE_SUBJECTS";
pub const ENV_LOG: &str = "LOOKUP_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the dataset files.
    pub data_dir: PathBuf,
    /// JSON reference snapshot; no enrichment when unset.
    pub reference_file: Option<PathBuf>,
    pub pool_size: usize,
    pub max_phone_subjects: usize,
    /// `tracing_subscriber::EnvFilter` directive.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            reference_file: None,
            pool_size: num_cpus::get().max(1),
            max_phone_subjects: DEFAULT_MAX_PHONE_SUBJECTS,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key/value source; unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(dir) = get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = get(ENV_REFERENCE_FILE) {
            config.reference_file = Some(PathBuf::from(file));
        }
        if let Some(size) = get(ENV_POOL_SIZE) {
            config.pool_size = parse_positive(ENV_POOL_SIZE, &size)?;
        }
        if let Some(max) = get(ENV_MAX_PHONE_SUBJECTS) {
            config.max_phone_subjects = parse_positive(ENV_MAX_PHONE_SUBJECTS, &max)?;
        }
        if let Some(filter) = get(ENV_LOG) {
            config.log_filter = filter;
        }

        Ok(config)
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_reference_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.reference_file = Some(file.into());
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size.max(1);
        self
    }

    pub fn with_max_phone_subjects(mut self, max: usize) -> Self {
        self.max_phone_subjects = max.max(1);
        self
    }
}

fn parse_positive(key: &str, raw: &str) -> anyhow::Result<usize> {
    let value: usize = raw
        .trim()
        .parse()
        .with_context(|| format!("{} must be a positive integer, got {:?}", key, raw))?;
    if value == 0 {
        bail!("{} must be at least 1", key);
    }
    Ok(value)
}
