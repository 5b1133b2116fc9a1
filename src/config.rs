/// Engine tuning knobs.
///
/// Defaults reproduce the thresholds the worker has always used: 30k-row
/// filter chunks, and early results once more than 50 matches are known on
/// a dataset over 70k rows after the scan passed row 30k.
use crate::error::{Result, ViewError};
use log::debug;
use serde::Deserialize;
use std::str::FromStr;

pub const DEFAULT_CHUNK_SIZE: usize = 30_000;
pub const DEFAULT_EARLY_MIN_MATCHES: usize = 50;
pub const DEFAULT_EARLY_MIN_ROWS: usize = 70_000;
pub const DEFAULT_EARLY_MIN_PROGRESS: usize = 30_000;
pub const DEFAULT_MIN_RUN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows scanned by the filter between two checkpoints.
    pub chunk_size: usize,
    /// Early results need strictly more matches than this.
    pub early_min_matches: usize,
    /// Early results need a dataset strictly larger than this.
    pub early_min_rows: usize,
    /// Early results need a chunk start index strictly past this.
    pub early_min_progress: usize,
    /// Length of the insertion-sorted runs the merge sort starts from.
    pub min_run: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            chunk_size: DEFAULT_CHUNK_SIZE,
            early_min_matches: DEFAULT_EARLY_MIN_MATCHES,
            early_min_rows: DEFAULT_EARLY_MIN_ROWS,
            early_min_progress: DEFAULT_EARLY_MIN_PROGRESS,
            min_run: DEFAULT_MIN_RUN,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `GRIDVIEW_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();
        override_from(&lookup, "GRIDVIEW_CHUNK_SIZE", &mut config.chunk_size)?;
        override_from(&lookup, "GRIDVIEW_EARLY_MIN_MATCHES", &mut config.early_min_matches)?;
        override_from(&lookup, "GRIDVIEW_EARLY_MIN_ROWS", &mut config.early_min_rows)?;
        override_from(&lookup, "GRIDVIEW_EARLY_MIN_PROGRESS", &mut config.early_min_progress)?;
        override_from(&lookup, "GRIDVIEW_MIN_RUN", &mut config.min_run)?;
        config.validate()?;
        Ok(config)
    }

    /// Chunk size and run length must be positive or no progress is made.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ViewError::InvalidConfig {
                key: "chunk_size",
                value: "0".to_string(),
            });
        }
        if self.min_run == 0 {
            return Err(ViewError::InvalidConfig {
                key: "min_run",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn override_from<F, T>(lookup: &F, key: &'static str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .map_err(|_| ViewError::InvalidConfig { key, value: raw.clone() })?;
        debug!("{} overridden from environment: {}", key, raw.trim());
    }
    Ok(())
}
