//! Run parameter record written next to the logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::OutputError;
use crate::config::Config;
use crate::source::DateWindow;

pub const MANIFEST_FILE: &str = "run_parameters.toml";

/// Parameters a run was started with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub date_bgn: String,
    pub date_end: String,
    pub workers: usize,
    pub call_timeout_secs: u64,
    pub llm_provider: String,
    pub llm_model: String,
}

impl RunManifest {
    pub fn new(config: &Config, window: &DateWindow, provider: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            date_bgn: window.begin().format("%Y/%m/%d").to_string(),
            date_end: window.end().format("%Y/%m/%d").to_string(),
            workers: config.enrichment.workers,
            call_timeout_secs: config.enrichment.timeout_secs,
            llm_provider: provider.to_string(),
            llm_model: config.llm.model.clone(),
        }
    }

    /// Write to `<dir>/run_parameters.toml`, replacing any previous run's file.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(dir).map_err(|source| OutputError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let content =
            toml::to_string_pretty(self).map_err(|e| OutputError::Serialize(e.to_string()))?;
        let path = dir.join(MANIFEST_FILE);
        fs::write(&path, content).map_err(|source| OutputError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
